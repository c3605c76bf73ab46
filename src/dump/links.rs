//! Rewriting MOBI-internal references into links between dumped files.
//!
//! Converts:
//! - `filepos=0000012345` → `href="text_0000012345.html"`
//! - `href="filepos=0000012345"` → `href="text_0000012345.html"`
//! - `recindex="00007"` → `src="img_007.jpg"`
//! - removes `<mbp:pagebreak/>`
//!
//! The rewrite is purely textual. None of the replacement strings contain a
//! pattern that is rewritten, so running it twice changes nothing.

use bstr::ByteSlice;
use memchr::memmem;

use super::filepos::{FILEPOS_MARK, LinkTable, parse_marker};

const RECINDEX_MARK: &[u8] = b"recindex=\"";
const RECINDEX_WIDTH: usize = 5;
const HREF_ATTR: &[u8] = b"href=";

/// Mobipocket page break markers.
const PAGE_BREAKS: &[&[u8]] = &[b"<mbp:pagebreak/>", b"<mbp:pagebreak />"];

/// Rewrites one fragment's content against the link table and image names.
#[derive(Debug, Clone, Copy)]
pub struct LinkRewriter<'a> {
    links: &'a LinkTable,
    images: &'a [String],
}

impl<'a> LinkRewriter<'a> {
    /// `images[i]` is the file name of image number `i + 1`.
    pub fn new(links: &'a LinkTable, images: &'a [String]) -> Self {
        Self { links, images }
    }

    /// Apply all rewrites to `content`.
    pub fn rewrite(&self, content: &[u8]) -> Vec<u8> {
        let linked = self.rewrite_filepos(content);
        let linked = self.rewrite_recindex(&linked);
        strip_page_breaks(&linked)
    }

    /// Turn positional markers into hrefs to fragment files.
    fn rewrite_filepos(&self, content: &[u8]) -> Vec<u8> {
        let mut output = Vec::with_capacity(content.len() + content.len() / 16);
        let mut pos = 0;

        for start in memmem::find_iter(content, FILEPOS_MARK) {
            if start < pos {
                continue;
            }
            let value_start = start + FILEPOS_MARK.len();
            let Some(marker) = parse_marker(&content[value_start..]) else {
                continue;
            };
            let Some(name) = self.links.get(marker.pos) else {
                tracing::debug!(target_pos = marker.pos.0, "filepos target not in link table");
                continue;
            };

            let mut end = value_start + marker.value_len;
            output.extend_from_slice(&content[pos..start]);

            // The marker may already be an attribute value: href="filepos=N".
            if marker.quote.is_none()
                && let Some(quote) = href_value_quote(&content[pos..start])
                && content.get(end) == Some(&quote)
            {
                output.truncate(output.len() - HREF_ATTR.len() - 1);
                end += 1;
            }

            output.extend_from_slice(b"href=\"");
            output.extend_from_slice(name.as_bytes());
            output.push(b'"');
            pos = end;
        }

        output.extend_from_slice(&content[pos..]);
        output
    }

    /// Turn `recindex="NNNNN"` image references into `src` attributes.
    fn rewrite_recindex(&self, content: &[u8]) -> Vec<u8> {
        let mut output = Vec::with_capacity(content.len());
        let mut pos = 0;

        for start in memmem::find_iter(content, RECINDEX_MARK) {
            if start < pos {
                continue;
            }
            let value_start = start + RECINDEX_MARK.len();
            let Some(name) = self.image_for(&content[value_start..]) else {
                continue;
            };

            output.extend_from_slice(&content[pos..start]);
            output.extend_from_slice(b"src=\"");
            output.extend_from_slice(name.as_bytes());
            output.push(b'"');
            pos = value_start + RECINDEX_WIDTH + 1;
        }

        output.extend_from_slice(&content[pos..]);
        output
    }

    /// Image name for a `NNNNN"` recindex value.
    fn image_for(&self, value: &[u8]) -> Option<&'a str> {
        let digits = value.get(..RECINDEX_WIDTH)?;
        if !digits.iter().all(u8::is_ascii_digit) || value.get(RECINDEX_WIDTH) != Some(&b'"') {
            return None;
        }
        let index: usize = digits
            .iter()
            .fold(0, |acc, &d| acc * 10 + usize::from(d - b'0'));
        let name = self.images.get(index.checked_sub(1)?);
        if name.is_none() {
            tracing::debug!(index, "recindex refers to an unknown image");
        }
        name.map(String::as_str)
    }
}

/// Quote character if `prefix` ends inside an opening `href=` value.
fn href_value_quote(prefix: &[u8]) -> Option<u8> {
    let (&quote, rest) = prefix.split_last()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let attr = rest.get(rest.len().checked_sub(HREF_ATTR.len())?..)?;
    attr.eq_ignore_ascii_case(HREF_ATTR).then_some(quote)
}

fn strip_page_breaks(content: &[u8]) -> Vec<u8> {
    let mut output = content.to_vec();
    for marker in PAGE_BREAKS {
        if output.find(marker).is_some() {
            output = output.replace(marker, b"");
        }
    }
    output
}
