//! Table of contents reconstruction.
//!
//! MOBI books point at their contents page from the `<guide>` in the head of
//! the text: `<reference type="toc" filepos=...>`. After splitting and link
//! rewriting, that reference names one of the dumped fragments. Each anchor
//! on the contents page becomes a TOC entry mapped back to the index of the
//! fragment it links to.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::markup::Document;
use crate::storage::Storage;

/// Position recorded for anchors that match no fragment.
pub const NOT_FOUND: i64 = -1;

/// One contents entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TocEntry {
    /// Index into the fragment list, or [`NOT_FOUND`].
    #[serde(serialize_with = "serialize_pos")]
    pub pos: i64,
    /// Display text of the anchor.
    pub name: String,
}

/// Contents entries keyed by anchor href, in contents-page order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Toc {
    entries: Vec<(String, TocEntry)>,
}

impl Toc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. A repeated href keeps its first entry and position.
    pub fn insert(&mut self, href: impl Into<String>, entry: TocEntry) {
        let href = href.into();
        if self.get(&href).is_none() {
            self.entries.push((href, entry));
        }
    }

    pub fn get(&self, href: &str) -> Option<&TocEntry> {
        self.entries
            .iter()
            .find(|(h, _)| h == href)
            .map(|(_, entry)| entry)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TocEntry)> {
        self.entries.iter().map(|(h, entry)| (h.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for Toc {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (href, entry) in &self.entries {
            map.serialize_entry(href, entry)?;
        }
        map.end()
    }
}

// The sidecar has always carried positions as strings.
fn serialize_pos<S: Serializer>(pos: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(pos)
}

/// Index of the last fragment named `href`, scanning from the end.
pub fn fragment_position(fragments: &[String], href: &str) -> i64 {
    fragments
        .iter()
        .rposition(|name| name == href)
        .map_or(NOT_FOUND, |idx| idx as i64)
}

/// Build the TOC from the dumped fragments.
///
/// `fragments` is the fragment list in reading order; the first one is read
/// back from `storage` to find the contents page. Any missing piece (no
/// fragments, no toc reference, unreadable contents page) yields an empty
/// TOC rather than an error.
pub fn build_toc<W: Storage + ?Sized>(fragments: &[String], storage: &W) -> Toc {
    let mut toc = Toc::new();

    let Some(first) = fragments.first() else {
        return toc;
    };
    let Some(head) = read_document(storage, first) else {
        return toc;
    };
    let Some(href) = head.reference_href("toc") else {
        tracing::debug!(fragment = %first, "no toc reference in first fragment");
        return toc;
    };
    let Some(nav) = read_document(storage, href) else {
        return toc;
    };

    for link in nav.anchor_hrefs() {
        let entry = TocEntry {
            pos: fragment_position(fragments, link),
            name: nav.anchor_text(link).to_string(),
        };
        if entry.pos == NOT_FOUND {
            tracing::debug!(href = %link, "toc entry matches no fragment");
        }
        toc.insert(link, entry);
    }

    tracing::debug!(contents = %href, entries = toc.len(), "built toc");
    toc
}

fn read_document<W: Storage + ?Sized>(storage: &W, name: &str) -> Option<Document> {
    match storage.read(name) {
        Ok(bytes) => Some(Document::parse(&String::from_utf8_lossy(&bytes))),
        Err(e) => {
            tracing::warn!(name, error = %e, "cannot read navigation document");
            None
        }
    }
}
