//! Read-only view over a parsed page.
//!
//! Wraps `scraper::Html` with the handful of queries the locator strategies
//! need: tag/class search, text flattening, attribute and parent lookup.
//! Nodes are plain `ElementRef`s borrowed from the document, so they cannot
//! outlive the cycle that parsed it.

use regex::Regex;
use scraper::{ElementRef, Html};

use crate::error::ParseError;

/// Elements whose text is never page content.
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

pub struct Document {
    html: Html,
}

impl Document {
    /// Parses raw bytes leniently. Only empty or obviously binary input fails.
    pub fn parse(bytes: &[u8]) -> Result<Self, ParseError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(ParseError::Empty);
        }
        let nuls = bytes.iter().filter(|b| **b == 0).count();
        if nuls > bytes.len() / 10 {
            return Err(ParseError::Binary(nuls));
        }

        let source = String::from_utf8_lossy(bytes);
        Ok(Self { html: Html::parse_document(&source) })
    }

    pub fn root(&self) -> ElementRef<'_> {
        self.html.root_element()
    }

    /// All elements named in `tags` (any tag when empty) whose class
    /// attribute matches `class_pattern`, in document order.
    pub fn find_all(&self, tags: &[&str], class_pattern: Option<&Regex>) -> Vec<ElementRef<'_>> {
        find_all_within(self.root(), tags, class_pattern)
    }

    /// Every non-blank text chunk with its enclosing element, in document order.
    pub fn text_nodes(&self) -> Vec<(ElementRef<'_>, &str)> {
        self.root()
            .descendants()
            .filter_map(|node| {
                let text: &str = node.value().as_text()?;
                let parent = node.parent().and_then(ElementRef::wrap)?;
                if is_non_content(parent) || text.trim().is_empty() {
                    return None;
                }
                Some((parent, text))
            })
            .collect()
    }

    /// Flattened text of the whole page.
    pub fn full_text(&self, separator: &str) -> String {
        text(self.root(), separator)
    }
}

/// Descendants of `scope` (excluding `scope` itself) matching tag and class.
pub fn find_all_within<'a>(
    scope: ElementRef<'a>,
    tags: &[&str],
    class_pattern: Option<&Regex>,
) -> Vec<ElementRef<'a>> {
    scope
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|el| matches_tag(*el, tags))
        .filter(|el| match class_pattern {
            Some(re) => attr(*el, "class").is_some_and(|class| re.is_match(class)),
            None => true,
        })
        .collect()
}

/// Direct element children of `node` named in `tags`.
pub fn child_elements<'a>(node: ElementRef<'a>, tags: &[&str]) -> Vec<ElementRef<'a>> {
    node.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches_tag(*el, tags))
        .collect()
}

/// Trimmed text chunks under `node` joined by `separator`; script and style
/// bodies are skipped.
pub fn text(node: ElementRef<'_>, separator: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for desc in node.descendants() {
        let Some(chunk) = desc.value().as_text() else { continue };
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        let hidden = desc
            .parent()
            .and_then(ElementRef::wrap)
            .is_some_and(is_non_content);
        if !hidden {
            parts.push(chunk);
        }
    }
    parts.join(separator)
}

pub fn attr<'a>(node: ElementRef<'a>, name: &str) -> Option<&'a str> {
    node.value().attr(name)
}

pub fn parent(node: ElementRef<'_>) -> Option<ElementRef<'_>> {
    node.parent().and_then(ElementRef::wrap)
}

pub fn tag_name<'a>(node: ElementRef<'a>) -> &'a str {
    node.value().name()
}

/// True when `node` lies strictly inside `ancestor`.
pub fn is_inside(node: ElementRef<'_>, ancestor: ElementRef<'_>) -> bool {
    node.ancestors().any(|a| a.id() == ancestor.id())
}

fn matches_tag(el: ElementRef<'_>, tags: &[&str]) -> bool {
    tags.is_empty() || tags.iter().any(|t| el.value().name().eq_ignore_ascii_case(t))
}

fn is_non_content(el: ElementRef<'_>) -> bool {
    NON_CONTENT_TAGS.contains(&el.value().name())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><head><style>.x { color: red }</style></head>
        <body>
          <div class="wrap game-list">
            <p id="first">Hello <b>big</b> world</p>
            <script>var pct = "99%";</script>
            <p class="note">Second</p>
          </div>
        </body></html>"#;

    #[test]
    fn empty_or_whitespace_body_is_rejected() {
        assert!(matches!(Document::parse(b""), Err(ParseError::Empty)));
        assert!(matches!(Document::parse(b"  \n\t "), Err(ParseError::Empty)));
        assert!(matches!(Document::parse(&[0u8; 64]), Err(ParseError::Binary(64))));
    }

    #[test]
    fn broken_markup_still_parses() {
        let doc = Document::parse(b"<div><p>unclosed <td>cell").unwrap();
        assert!(doc.full_text(" ").contains("unclosed"));
    }

    #[test]
    fn find_all_filters_by_tag_and_class() {
        let doc = Document::parse(PAGE.as_bytes()).unwrap();
        assert_eq!(doc.find_all(&["p"], None).len(), 2);

        let re = Regex::new("game").unwrap();
        let found = doc.find_all(&["div", "section"], Some(&re));
        assert_eq!(found.len(), 1);
        assert_eq!(attr(found[0], "class"), Some("wrap game-list"));
    }

    #[test]
    fn text_joins_chunks_and_skips_scripts() {
        let doc = Document::parse(PAGE.as_bytes()).unwrap();
        let div = doc.find_all(&["div"], None)[0];
        assert_eq!(text(div, " "), "Hello big world Second");
        assert!(!doc.full_text(" ").contains("99%"));
        assert!(!doc.full_text(" ").contains("color"));
    }

    #[test]
    fn parent_and_containment() {
        let doc = Document::parse(PAGE.as_bytes()).unwrap();
        let p = doc.find_all(&["p"], None)[0];
        let div = parent(p).unwrap();
        assert_eq!(tag_name(div), "div");
        assert!(is_inside(p, div));
        assert!(!is_inside(div, p));
    }

    #[test]
    fn text_nodes_report_enclosing_element() {
        let doc = Document::parse(PAGE.as_bytes()).unwrap();
        let nodes = doc.text_nodes();
        let (el, chunk) = nodes.iter().find(|(_, t)| t.contains("big")).unwrap();
        assert_eq!(tag_name(*el), "b");
        assert_eq!(chunk.trim(), "big");
    }
}
