//! Lenient markup queries over produced HTML documents.
//!
//! The TOC builder only needs three questions answered about a document:
//! where its `<reference type="toc">` points, which hrefs its anchors carry,
//! and what text a given anchor shows. [`Document::parse`] answers all three
//! in a single quick-xml pass. MOBI markup is rarely well-formed XML, so the
//! scan tolerates unquoted attributes, mismatched end tags, bare `&` and
//! HTML named entities, and skips past syntax errors instead of giving up.

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

/// A `<reference>` element (MOBI `<guide>` entry).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reference {
    kind: String,
    href: String,
}

/// An `<a href="...">` element with its text content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    pub href: String,
    pub text: String,
}

/// Queryable summary of one markup document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    references: Vec<Reference>,
    anchors: Vec<Anchor>,
}

impl Document {
    /// Scan `content` for references and anchors.
    pub fn parse(content: &str) -> Self {
        let content = escape_bare_ampersands(content);
        let mut reader = Reader::from_str(&content);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        let mut doc = Document::default();
        // One slot per open <a>; `None` for anchors without an href.
        let mut open: Vec<Option<usize>> = Vec::new();
        let mut last_error = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    if is_element(&e, b"a") {
                        open.push(doc.push_anchor(&e));
                    } else if is_element(&e, b"reference") {
                        doc.push_reference(&e);
                    }
                }
                Ok(Event::Empty(e)) => {
                    if is_element(&e, b"a") {
                        doc.push_anchor(&e);
                    } else if is_element(&e, b"reference") {
                        doc.push_reference(&e);
                    }
                }
                Ok(Event::End(e)) => {
                    if e.name().local_name().as_ref().eq_ignore_ascii_case(b"a") {
                        open.pop();
                    }
                }
                Ok(Event::Text(e)) => {
                    doc.append_text(&open, &String::from_utf8_lossy(e.as_ref()));
                }
                Ok(Event::CData(e)) => {
                    doc.append_text(&open, &String::from_utf8_lossy(&e.into_inner()));
                }
                Ok(Event::GeneralRef(e)) => {
                    let entity = String::from_utf8_lossy(e.as_ref());
                    match resolve_entity(&entity) {
                        Some(resolved) => doc.append_text(&open, &resolved),
                        None => doc.append_text(&open, &format!("&{entity};")),
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    let position = reader.buffer_position();
                    // The reader resumes after the bad token; stop only if it is stuck.
                    if last_error == Some(position) {
                        tracing::debug!(position, error = %e, "stopped scanning malformed markup");
                        break;
                    }
                    tracing::debug!(position, error = %e, "skipping malformed markup");
                    last_error = Some(position);
                }
                _ => {}
            }
        }

        for anchor in &mut doc.anchors {
            let trimmed = anchor.text.trim();
            if trimmed.len() != anchor.text.len() {
                anchor.text = trimmed.to_string();
            }
        }

        doc
    }

    /// The `href` of the first `<reference>` whose `type` is `kind`.
    pub fn reference_href(&self, kind: &str) -> Option<&str> {
        self.references
            .iter()
            .find(|r| r.kind.eq_ignore_ascii_case(kind))
            .map(|r| r.href.as_str())
    }

    /// The `href` of every anchor that has one, in document order.
    pub fn anchor_hrefs(&self) -> impl Iterator<Item = &str> {
        self.anchors.iter().map(|a| a.href.as_str())
    }

    /// Text of the first anchor pointing at `href`, or `""` if none does.
    pub fn anchor_text(&self, href: &str) -> &str {
        self.anchors
            .iter()
            .find(|a| a.href == href)
            .map(|a| a.text.as_str())
            .unwrap_or("")
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    fn push_anchor(&mut self, e: &BytesStart) -> Option<usize> {
        let href = attribute(e, b"href")?;
        self.anchors.push(Anchor {
            href,
            text: String::new(),
        });
        Some(self.anchors.len() - 1)
    }

    fn push_reference(&mut self, e: &BytesStart) {
        if let (Some(kind), Some(href)) = (attribute(e, b"type"), attribute(e, b"href")) {
            self.references.push(Reference { kind, href });
        }
    }

    fn append_text(&mut self, open: &[Option<usize>], text: &str) {
        for &idx in open.iter().flatten() {
            self.anchors[idx].text.push_str(text);
        }
    }
}

fn is_element(e: &BytesStart, name: &[u8]) -> bool {
    e.name().local_name().as_ref().eq_ignore_ascii_case(name)
}

/// Value of the named attribute, entity-decoded when possible.
fn attribute(e: &BytesStart, name: &[u8]) -> Option<String> {
    e.html_attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref().eq_ignore_ascii_case(name))
        .map(|attr| {
            let raw = String::from_utf8_lossy(&attr.value);
            unescape(&raw)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| raw.into_owned())
        })
}

/// Replace every `&` that does not start a reference (`&name;`, `&#NN;`)
/// with `&amp;`.
fn escape_bare_ampersands(content: &str) -> Cow<'_, str> {
    if !content.contains('&') {
        return Cow::Borrowed(content);
    }

    let mut escaped = String::with_capacity(content.len() + 16);
    let mut rest = content;
    while let Some(idx) = rest.find('&') {
        escaped.push_str(&rest[..idx]);
        rest = &rest[idx + 1..];
        if starts_reference(rest) {
            escaped.push('&');
        } else {
            escaped.push_str("&amp;");
        }
    }
    escaped.push_str(rest);
    Cow::Owned(escaped)
}

fn starts_reference(after_amp: &str) -> bool {
    let name_len = after_amp
        .bytes()
        .take(32)
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'#')
        .count();
    name_len > 0 && after_amp.as_bytes().get(name_len) == Some(&b';')
}

/// Resolve XML and the common HTML entity references.
fn resolve_entity(entity: &str) -> Option<String> {
    let named = match entity {
        "apos" => Some("'"),
        "quot" => Some("\""),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "nbsp" => Some("\u{a0}"),
        "shy" => Some("\u{ad}"),
        "mdash" => Some("\u{2014}"),
        "ndash" => Some("\u{2013}"),
        "lsquo" => Some("\u{2018}"),
        "rsquo" => Some("\u{2019}"),
        "ldquo" => Some("\u{201c}"),
        "rdquo" => Some("\u{201d}"),
        "laquo" => Some("\u{ab}"),
        "raquo" => Some("\u{bb}"),
        "hellip" => Some("\u{2026}"),
        "bull" => Some("\u{2022}"),
        "middot" => Some("\u{b7}"),
        "copy" => Some("\u{a9}"),
        "reg" => Some("\u{ae}"),
        "trade" => Some("\u{2122}"),
        "sect" => Some("\u{a7}"),
        "para" => Some("\u{b6}"),
        _ => None,
    };
    if let Some(text) = named {
        return Some(text.to_string());
    }

    let code = if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok()
    } else {
        None
    };

    code.and_then(char::from_u32).map(|c| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_href() {
        let doc = Document::parse(
            r#"<html><head><guide><reference type="toc" title="Contents" href="text_0000000100.html" /></guide></head><body></body></html>"#,
        );
        assert_eq!(doc.reference_href("toc"), Some("text_0000000100.html"));
        assert_eq!(doc.reference_href("cover"), None);
    }

    #[test]
    fn test_reference_without_href_is_ignored() {
        let doc = Document::parse(
            r#"<guide><reference type="toc" title="x"/><reference type="toc" href="b.html"/></guide>"#,
        );
        assert_eq!(doc.reference_href("toc"), Some("b.html"));
    }

    #[test]
    fn test_anchor_hrefs_in_document_order() {
        let doc = Document::parse(
            r#"<body><a href="b.html">B</a><a name="x">no href</a><p><a href="a.html">A</a></p></body>"#,
        );
        let hrefs: Vec<&str> = doc.anchor_hrefs().collect();
        assert_eq!(hrefs, vec!["b.html", "a.html"]);
    }

    #[test]
    fn test_anchor_text_includes_nested_markup_and_entities() {
        let doc = Document::parse(
            r#"<body><a href="c1.html"> <b>Chapter</b> One &amp; Two </a></body>"#,
        );
        assert_eq!(doc.anchor_text("c1.html"), "Chapter One & Two");
        assert_eq!(doc.anchor_text("missing.html"), "");
    }

    #[test]
    fn test_anchor_text_first_match_wins() {
        let doc = Document::parse(r#"<a href="x.html">First</a><a href="x.html">Second</a>"#);
        assert_eq!(doc.anchor_text("x.html"), "First");
        assert_eq!(doc.anchors().len(), 2);
    }

    #[test]
    fn test_tolerates_html_markup() {
        let doc = Document::parse(
            "<HTML><BODY><P align=center><A HREF=\"one.html\">One</A><BR><p>text</P></BODY></HTML>",
        );
        assert_eq!(doc.anchor_hrefs().collect::<Vec<_>>(), vec!["one.html"]);
        assert_eq!(doc.anchor_text("one.html"), "One");
    }

    #[test]
    fn test_resolve_entity() {
        assert_eq!(resolve_entity("#65").as_deref(), Some("A"));
        assert_eq!(resolve_entity("#x41").as_deref(), Some("A"));
        assert_eq!(resolve_entity("nbsp").as_deref(), Some("\u{a0}"));
        assert_eq!(resolve_entity("rsquo").as_deref(), Some("\u{2019}"));
        assert_eq!(resolve_entity("bogus"), None);
    }

    #[test]
    fn test_bare_ampersand_keeps_scanning() {
        let doc = Document::parse(
            r#"<p><a href="one.html">Tom & Jerry</a></p><p><a href="two.html">Two</a></p>"#,
        );
        assert_eq!(doc.anchor_hrefs().collect::<Vec<_>>(), vec!["one.html", "two.html"]);
        assert_eq!(doc.anchor_text("one.html"), "Tom & Jerry");
        assert_eq!(doc.anchor_text("two.html"), "Two");
    }

    #[test]
    fn test_html_named_entities_in_anchor_text() {
        let doc = Document::parse(
            r#"<a href="one.html">A&mdash;B</a><a href="two.html">It&rsquo;s &foo; here</a>"#,
        );
        assert_eq!(doc.anchor_text("one.html"), "A\u{2014}B");
        assert_eq!(doc.anchor_text("two.html"), "It\u{2019}s &foo; here");
    }

    #[test]
    fn test_escape_bare_ampersands() {
        assert_eq!(escape_bare_ampersands("no refs"), "no refs");
        assert_eq!(escape_bare_ampersands("a & b"), "a &amp; b");
        assert_eq!(escape_bare_ampersands("&amp; &#65; &mdash;"), "&amp; &#65; &mdash;");
        assert_eq!(escape_bare_ampersands("x&y"), "x&amp;y");
        assert_eq!(escape_bare_ampersands("tail &"), "tail &amp;");
    }

    #[test]
    fn test_bare_ampersand_in_href_value() {
        let doc = Document::parse(r#"<a href="page.html?a=1&b=2">Q</a>"#);
        assert_eq!(doc.anchor_hrefs().collect::<Vec<_>>(), vec!["page.html?a=1&b=2"]);
    }
}
