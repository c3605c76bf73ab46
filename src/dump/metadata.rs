//! The `info.json` sidecar.

use serde::Serialize;

use super::toc::Toc;
use crate::error::Result;
use crate::source::BookSource;

/// File name of the sidecar record.
pub const INFO_FILE: &str = "info.json";

/// An exported image as listed in the sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRef {
    pub path: String,
}

/// Everything a reader needs to present the dumped book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookInfo {
    pub author: String,
    pub title: String,
    pub publisher: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
    /// Fragment file names in reading order.
    pub items: Vec<String>,
    /// Exported images.
    pub res: Vec<ResourceRef>,
    #[serde(skip_serializing_if = "Toc::is_empty")]
    pub toc: Toc,
}

impl BookInfo {
    pub fn assemble<S: BookSource>(
        source: &S,
        images: &[String],
        fragments: &[String],
        toc: Toc,
    ) -> Self {
        Self {
            author: source.author().to_string(),
            title: source.title().to_string(),
            publisher: source.publisher().to_string(),
            cover: cover_name(source.cover_index(), images),
            items: fragments.to_vec(),
            res: images
                .iter()
                .map(|path| ResourceRef { path: path.clone() })
                .collect(),
            toc,
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<Vec<u8>> {
        let json = if pretty {
            serde_json::to_vec_pretty(self)?
        } else {
            serde_json::to_vec(self)?
        };
        Ok(json)
    }
}

/// Image name for a 1-based cover index; `None` when there is no cover.
pub fn cover_name(cover_index: i32, images: &[String]) -> Option<String> {
    let idx = usize::try_from(cover_index).ok()?.checked_sub(1)?;
    let name = images.get(idx).cloned();
    if name.is_none() {
        tracing::warn!(cover_index, images = images.len(), "cover index has no image");
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::toc::TocEntry;
    use crate::source::{MemoryBook, RawText};

    fn images() -> Vec<String> {
        vec!["img_001.jpg".to_string(), "img_002.jpg".to_string()]
    }

    #[test]
    fn test_cover_name() {
        assert_eq!(cover_name(0, &images()), None);
        assert_eq!(cover_name(-1, &images()), None);
        assert_eq!(cover_name(2, &images()).as_deref(), Some("img_002.jpg"));
        assert_eq!(cover_name(3, &images()), None);
    }

    #[test]
    fn test_json_without_cover_or_toc() {
        let book = MemoryBook::new(RawText::utf8(""))
            .with_author("A. Writer")
            .with_title("A Book")
            .with_publisher("Press");
        let info = BookInfo::assemble(&book, &images(), &["text.html".to_string()], Toc::new());

        let json: serde_json::Value = serde_json::from_slice(&info.to_json(false).unwrap()).unwrap();
        assert_eq!(json["author"], "A. Writer");
        assert_eq!(json["title"], "A Book");
        assert_eq!(json["publisher"], "Press");
        assert!(json.get("cover").is_none());
        assert!(json.get("toc").is_none());
        assert_eq!(json["items"], serde_json::json!(["text.html"]));
        assert_eq!(
            json["res"],
            serde_json::json!([{"path": "img_001.jpg"}, {"path": "img_002.jpg"}])
        );
    }

    #[test]
    fn test_json_with_cover_and_toc() {
        let book = MemoryBook::new(RawText::utf8("")).with_cover_index(2);
        let mut toc = Toc::new();
        toc.insert("text.html", TocEntry { pos: 0, name: "Start".into() });
        let info = BookInfo::assemble(&book, &images(), &["text.html".to_string()], toc);

        let json: serde_json::Value = serde_json::from_slice(&info.to_json(true).unwrap()).unwrap();
        assert_eq!(json["cover"], "img_002.jpg");
        assert_eq!(json["toc"]["text.html"]["pos"], "0");
        assert_eq!(json["toc"]["text.html"]["name"], "Start");
    }

    #[test]
    fn test_field_order() {
        let book = MemoryBook::new(RawText::utf8("")).with_cover_index(1);
        let info = BookInfo::assemble(&book, &images(), &[], Toc::new());
        let json = String::from_utf8(info.to_json(false).unwrap()).unwrap();
        assert!(json.starts_with(r#"{"author":"","title":"","publisher":"","cover":"img_001.jpg","items":[],"res":"#));
    }
}
