//! # mobidump
//!
//! Dump MOBI ebooks into a directory of linked HTML documents, their
//! embedded images and an `info.json` sidecar describing the book.
//!
//! MOBI text is a single HTML stream whose internal links are byte offsets
//! (`filepos=0000012345`). The dumper cuts the stream at every linked offset,
//! turns each piece into its own document, rewrites links and image
//! references so they keep working across files, and rebuilds the table of
//! contents from the book's contents page.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mobidump::{DirStorage, MobiBook, dump};
//!
//! let book = MobiBook::open("input.mobi").unwrap();
//! let mut out = DirStorage::create("input").unwrap();
//! let info = dump(&book, &mut out).unwrap();
//! println!("{} fragments", info.items.len());
//! ```
//!
//! ## In-memory books
//!
//! ```
//! use mobidump::{MemoryBook, MemoryStorage, RawText, dump};
//!
//! let book = MemoryBook::new(RawText::utf8("<p>Go <a filepos=0000000038>on</a></p><p>Next</p>"))
//!     .with_title("Tiny");
//! let mut out = MemoryStorage::new();
//! let info = dump(&book, &mut out).unwrap();
//!
//! assert_eq!(info.items, ["text.html", "text_0000000038.html"]);
//! assert!(out.get_str("text.html").unwrap().contains(r#"href="text_0000000038.html""#));
//! ```

pub mod dump;
pub mod error;
pub mod markup;
pub mod mobi;
pub mod source;
pub mod storage;

pub use dump::{BookInfo, DumpOptions, Toc, TocEntry, dump, dump_with_options};
pub use error::{Error, Result};
pub use mobi::MobiBook;
pub use source::{BookSource, ImageRecord, MemoryBook, RawText};
pub use storage::{DirStorage, MemoryStorage, Storage};
