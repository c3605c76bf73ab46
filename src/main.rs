//! mobidump - dump MOBI ebooks into linked HTML

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use mobidump::{DirStorage, DumpOptions, MobiBook, dump_with_options};

#[derive(Parser)]
#[command(name = "mobidump")]
#[command(version, about = "Dump MOBI ebooks into linked HTML, images and info.json", long_about = None)]
#[command(after_help = "EXAMPLES:
    mobidump book.mobi             Dump into ./book/
    mobidump book.mobi out/        Dump into ./out/
    RUST_LOG=mobidump=debug mobidump book.mobi")]
struct Cli {
    /// Input file (MOBI or PalmDOC)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output directory (defaults to the input file name without extension)
    #[arg(value_name = "OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Indent info.json
    #[arg(long)]
    pretty: bool,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,

    /// Log more (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> mobidump::Result<()> {
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_dir(&cli.input));

    let book = MobiBook::open(&cli.input)?;
    let mut storage = DirStorage::create(&output)?;
    let options = DumpOptions {
        pretty_metadata: cli.pretty,
    };
    let info = dump_with_options(&book, &mut storage, options)?;

    if !cli.quiet {
        println!("Title: {}", info.title);
        if !info.author.is_empty() {
            println!("Author: {}", info.author);
        }
        if !info.publisher.is_empty() {
            println!("Publisher: {}", info.publisher);
        }
        if let Some(ref cover) = info.cover {
            println!("Cover: {cover}");
        }
        println!("Documents: {}", info.items.len());
        println!("Images: {}", info.res.len());
        println!("TOC entries: {}", info.toc.len());
        println!("Output: {}", output.display());
    }

    Ok(())
}

fn default_output_dir(input: &Path) -> PathBuf {
    // An input without extension would collide with its own output.
    match input.extension() {
        Some(_) => input.with_extension(""),
        None => input.with_extension("dump"),
    }
}
