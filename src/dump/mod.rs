//! The dump pipeline: one book in, linked HTML fragments, images and an
//! `info.json` sidecar out.
//!
//! ```text
//! text ──scan──> offsets ──split──> fragments ──rewrite──> text*.html
//!                   │                               ▲
//!                   └──> link table ────────────────┤
//! images ──name──> image names ─────────────────────┘
//!        ──export──> img_NNN.ext
//! text.html ──> contents page ──> toc ──> info.json
//! ```

mod filepos;
mod images;
mod links;
mod metadata;
mod split;
mod toc;

pub use filepos::{FILEPOS_MARK, FILEPOS_WIDTH, FilePos, LinkTable, scan_split_offsets};
pub use images::{export_images, image_file_name, scan_images};
pub use links::LinkRewriter;
pub use metadata::{BookInfo, INFO_FILE, ResourceRef, cover_name};
pub use split::{
    BASE_FRAGMENT, CHARSET_META, Fragment, HTML_EPILOG, HTML_PROLOG, split_fragments, wrap_base,
    wrap_split,
};
pub use toc::{NOT_FOUND, Toc, TocEntry, build_toc, fragment_position};

use crate::error::Result;
use crate::source::BookSource;
use crate::storage::Storage;

/// Knobs for [`dump_with_options`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpOptions {
    /// Indent `info.json` for human readers.
    pub pretty_metadata: bool,
}

/// Dump `source` into `storage` with default options.
pub fn dump<S, W>(source: &S, storage: &mut W) -> Result<BookInfo>
where
    S: BookSource,
    W: Storage + ?Sized,
{
    dump_with_options(source, storage, DumpOptions::default())
}

/// Dump `source` into `storage`.
///
/// Writes one HTML document per fragment, one file per image and the
/// `info.json` sidecar, and returns the sidecar record. Any write failure
/// aborts the dump.
pub fn dump_with_options<S, W>(source: &S, storage: &mut W, options: DumpOptions) -> Result<BookInfo>
where
    S: BookSource,
    W: Storage + ?Sized,
{
    let text = source.text()?;

    let offsets = scan_split_offsets(&text.bytes);
    let links = LinkTable::new(&offsets);
    let image_names = scan_images(source);
    let rewriter = LinkRewriter::new(&links, &image_names);

    let fragments = split_fragments(text.len(), &offsets);
    // Cut order: from the end of the text back to the base fragment.
    for fragment in fragments.iter().rev() {
        let body = rewriter.rewrite(fragment.slice(&text.bytes));
        let html = fragment.envelope(&text.decode(&body));
        tracing::debug!(
            name = %fragment.name,
            start = fragment.range.start,
            end = fragment.range.end,
            "writing fragment"
        );
        storage.write(&fragment.name, html.as_bytes())?;
    }
    let fragment_names: Vec<String> = fragments.into_iter().map(|f| f.name).collect();

    let images_written = export_images(source, &image_names, storage)?;

    let toc = build_toc(&fragment_names, storage);
    let info = BookInfo::assemble(source, &image_names, &fragment_names, toc);
    storage.write(INFO_FILE, &info.to_json(options.pretty_metadata)?)?;

    tracing::info!(
        title = %info.title,
        text_bytes = text.len(),
        fragments = info.items.len(),
        images = images_written,
        toc_entries = info.toc.len(),
        "dumped book"
    );

    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemoryBook, RawText};
    use crate::storage::MemoryStorage;

    #[test]
    fn test_dump_without_markers() {
        let book = MemoryBook::new(RawText::utf8("<html><head></head><body>Hi</body></html>"));
        let mut storage = MemoryStorage::new();
        let info = dump(&book, &mut storage).unwrap();

        assert_eq!(info.items, vec![BASE_FRAGMENT]);
        let html = storage.get_str(BASE_FRAGMENT).unwrap();
        assert_eq!(
            html,
            format!("<html><head>{CHARSET_META}</head><body>Hi</body></html>{HTML_EPILOG}")
        );
        assert!(storage.get(INFO_FILE).is_some());
    }

    #[test]
    fn test_dump_splits_and_links() {
        let prefix = r#"AAA<a href="filepos="#;
        let target = format!("{prefix}0000000000\">x</a>").len();
        let text = format!("{prefix}{target:010}\">x</a>BBB");
        assert_eq!(&text[target..], "BBB");

        let book = MemoryBook::new(RawText::utf8(text));
        let mut storage = MemoryStorage::new();
        let info = dump(&book, &mut storage).unwrap();

        let split_name = format!("text_{target:010}.html");
        assert_eq!(info.items, vec![BASE_FRAGMENT.to_string(), split_name.clone()]);
        assert_eq!(
            storage.get_str(BASE_FRAGMENT).unwrap(),
            format!(r#"{HTML_PROLOG}AAA<a href="{split_name}">x</a>{HTML_EPILOG}"#)
        );
        assert_eq!(
            storage.get_str(&split_name).unwrap(),
            format!("{HTML_PROLOG}BBB{HTML_EPILOG}")
        );
    }

    #[test]
    fn test_dump_transcodes_cp1252() {
        let book = MemoryBook::new(RawText::new(b"caf\xe9".to_vec(), encoding_rs::WINDOWS_1252));
        let mut storage = MemoryStorage::new();
        dump(&book, &mut storage).unwrap();
        assert!(storage.get_str(BASE_FRAGMENT).unwrap().contains("café"));
    }

    #[test]
    fn test_dump_pretty_metadata() {
        let book = MemoryBook::new(RawText::utf8("x")).with_title("T");
        let mut storage = MemoryStorage::new();
        dump_with_options(&book, &mut storage, DumpOptions { pretty_metadata: true }).unwrap();
        assert!(storage.get_str(INFO_FILE).unwrap().contains("\n  \"title\": \"T\""));
    }
}
