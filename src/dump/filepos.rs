//! Positional markers (`filepos=NNNNNNNNNN`).
//!
//! MOBI text refers to locations inside itself by byte offset:
//! `<a filepos=0000012345>` links to byte 12345 of the decompressed text
//! stream. Every referenced offset becomes a split point, and every marker
//! is later rewritten into a link to the fragment that starts there.

use std::collections::{BTreeMap, BTreeSet};

use memchr::memmem;

/// Marker token preceding the offset digits.
pub const FILEPOS_MARK: &[u8] = b"filepos=";

/// Width of the offset field in well-formed markers and in fragment names.
pub const FILEPOS_WIDTH: usize = 10;

/// A byte offset into the raw text that some marker points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilePos(pub u64);

impl FilePos {
    /// Name of the fragment document that starts at this offset.
    pub fn file_name(self) -> String {
        format!("text_{:010}.html", self.0)
    }

    pub fn offset(self) -> usize {
        self.0 as usize
    }
}

/// A parsed marker value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Marker {
    pub pos: FilePos,
    /// Bytes after [`FILEPOS_MARK`] that belong to the marker, including
    /// any quotes around the digits.
    pub value_len: usize,
    /// The quote character wrapping the digits, if any.
    pub quote: Option<u8>,
}

/// Parse the marker value that follows [`FILEPOS_MARK`].
///
/// Accepts an optional quote and up to [`FILEPOS_WIDTH`] digits. Returns
/// `None` when there are no digits at all.
pub(crate) fn parse_marker(value: &[u8]) -> Option<Marker> {
    let quote = value
        .first()
        .copied()
        .filter(|&b| b == b'"' || b == b'\'');
    let digits_start = usize::from(quote.is_some());

    let digits: &[u8] = {
        let rest = &value[digits_start..];
        let n = rest
            .iter()
            .take(FILEPOS_WIDTH)
            .take_while(|b| b.is_ascii_digit())
            .count();
        &rest[..n]
    };
    if digits.is_empty() {
        return None;
    }

    let offset = digits
        .iter()
        .fold(0u64, |acc, &d| acc * 10 + u64::from(d - b'0'));

    let mut value_len = digits_start + digits.len();
    if let Some(q) = quote
        && value.get(value_len) == Some(&q)
    {
        value_len += 1;
    }

    Some(Marker {
        pos: FilePos(offset),
        value_len,
        quote,
    })
}

/// Collect the distinct offsets referenced by markers in `text`.
///
/// The result is sorted in strictly descending order, which is the order in
/// which fragments have to be cut. Markers without digits are skipped.
pub fn scan_split_offsets(text: &[u8]) -> Vec<FilePos> {
    let mut seen = BTreeSet::new();

    for start in memmem::find_iter(text, FILEPOS_MARK) {
        let value = &text[start + FILEPOS_MARK.len()..];
        match parse_marker(value) {
            Some(marker) => {
                seen.insert(marker.pos);
            }
            None => tracing::warn!(offset = start, "skipping filepos marker without digits"),
        }
    }

    seen.into_iter().rev().collect()
}

/// Offsets resolved to fragment file names, computed once before any
/// rewriting happens.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    names: BTreeMap<FilePos, String>,
}

impl LinkTable {
    pub fn new(offsets: &[FilePos]) -> Self {
        Self {
            names: offsets.iter().map(|&pos| (pos, pos.file_name())).collect(),
        }
    }

    /// File name for a link target, if the offset was scanned.
    pub fn get(&self, pos: FilePos) -> Option<&str> {
        self.names.get(&pos).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
