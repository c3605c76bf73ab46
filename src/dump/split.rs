//! Cutting the text stream into fragment documents.
//!
//! Split points are applied from the end of the text backwards, so each cut
//! only ever shortens the part that is still unprocessed. Instead of
//! shrinking a buffer, the cuts are computed up front as byte ranges and the
//! fragments are sliced out of the untouched text afterwards.

use std::ops::Range;

use super::filepos::FilePos;

/// File name of the fragment holding everything before the first split.
pub const BASE_FRAGMENT: &str = "text.html";

macro_rules! charset_meta {
    () => {
        r#"<meta http-equiv="Content-Type" content="text/html; charset=utf-8" />"#
    };
}

pub const CHARSET_META: &str = charset_meta!();
pub const HTML_PROLOG: &str = concat!("<html><head>", charset_meta!(), "</head><body>");
pub const HTML_EPILOG: &str = "</body></html>";

/// One output document's share of the raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    /// Output file name.
    pub name: String,
    /// Split offset this fragment starts at; `None` for the base fragment.
    pub start: Option<FilePos>,
    /// Byte range within the raw text.
    pub range: Range<usize>,
}

impl Fragment {
    pub fn is_base(&self) -> bool {
        self.start.is_none()
    }

    pub fn slice<'a>(&self, text: &'a [u8]) -> &'a [u8] {
        &text[self.range.clone()]
    }

    /// Wrap rewritten fragment content in its HTML envelope.
    pub fn envelope(&self, body: &str) -> String {
        if self.is_base() {
            wrap_base(body)
        } else {
            wrap_split(body)
        }
    }
}

/// Compute the fragments for a text of `text_len` bytes.
///
/// `offsets` must be sorted in descending order (as produced by
/// [`scan_split_offsets`](super::filepos::scan_split_offsets)). The result
/// is in reading order: the base fragment first, then one fragment per
/// usable offset. Offsets past the end of the text are dropped.
pub fn split_fragments(text_len: usize, offsets: &[FilePos]) -> Vec<Fragment> {
    debug_assert!(offsets.windows(2).all(|w| w[0] > w[1]));

    let mut fragments = Vec::with_capacity(offsets.len() + 1);
    let mut end = text_len;

    for &pos in offsets {
        let start = pos.offset();
        if start > end {
            tracing::warn!(
                offset = start,
                text_len,
                "split offset lies beyond the end of the text"
            );
            continue;
        }
        fragments.push(Fragment {
            name: pos.file_name(),
            start: Some(pos),
            range: start..end,
        });
        end = start;
    }

    fragments.push(Fragment {
        name: BASE_FRAGMENT.to_string(),
        start: None,
        range: 0..end,
    });

    fragments.reverse();
    fragments
}

/// Envelope for fragments cut out of the middle of the text.
pub fn wrap_split(body: &str) -> String {
    let mut html = String::with_capacity(HTML_PROLOG.len() + body.len() + HTML_EPILOG.len());
    html.push_str(HTML_PROLOG);
    html.push_str(body);
    html.push_str(HTML_EPILOG);
    html
}

/// Envelope for the base fragment.
///
/// The base fragment normally carries the book's own `<html><head>`, so the
/// charset meta goes in front of its `</head`. Without a head it gets the
/// full prolog like any other fragment.
pub fn wrap_base(body: &str) -> String {
    match body.to_ascii_lowercase().find("</head") {
        Some(idx) => {
            let mut html =
                String::with_capacity(body.len() + CHARSET_META.len() + HTML_EPILOG.len());
            html.push_str(&body[..idx]);
            html.push_str(CHARSET_META);
            html.push_str(&body[idx..]);
            html.push_str(HTML_EPILOG);
            html
        }
        None => wrap_split(body),
    }
}
