//! Owned XML element tree
//!
//! roxmltree gives us a borrowed, read-only DOM. The timewise reshaper needs
//! to move subtrees around, so the document is copied once into this small
//! owned tree: tag name, attributes in document order, text, children.

use crate::converters::errors::ImportError;
use roxmltree::{Document, Node, ParsingOptions};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing any earlier value
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Text content, or "" when the element has none
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// First child element with the given tag
    pub fn child(&self, tag: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == tag)
    }

    /// All child elements with the given tag
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == tag)
    }

    /// Text of the first child with the given tag
    pub fn child_text(&self, tag: &str) -> Option<&str> {
        self.child(tag).map(XmlElement::text)
    }

    /// First descendant (depth-first, document order) with the given tag
    pub fn descendant(&self, tag: &str) -> Option<&XmlElement> {
        for child in &self.children {
            if child.name == tag {
                return Some(child);
            }
            if let Some(found) = child.descendant(tag) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the given tag, in document order
    pub fn descendants_named<'a>(&'a self, tag: &str) -> Vec<&'a XmlElement> {
        let mut out = Vec::new();
        collect_descendants(self, tag, &mut out);
        out
    }
}

fn collect_descendants<'a>(element: &'a XmlElement, tag: &str, out: &mut Vec<&'a XmlElement>) {
    for child in &element.children {
        if child.name == tag {
            out.push(child);
        }
        collect_descendants(child, tag, out);
    }
}

/// Parse XML text into an owned element tree rooted at the document element.
///
/// A DOCTYPE declaration is accepted; its external subset is never loaded.
pub fn parse_xml(xml: &str) -> Result<XmlElement, ImportError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(xml, options)
        .map_err(|e| ImportError::Syntax(e.to_string()))?;
    Ok(copy_element(doc.root_element()))
}

fn copy_element(node: Node) -> XmlElement {
    XmlElement {
        name: node.tag_name().name().to_string(),
        attributes: node
            .attributes()
            .map(|attr| (attr.name().to_string(), attr.value().to_string()))
            .collect(),
        text: node.text().map(|t| t.to_string()),
        children: node
            .children()
            .filter(|n| n.is_element())
            .map(copy_element)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_tree() {
        let xml = r#"<?xml version="1.0"?>
<score-partwise version="3.1">
  <part-list>
    <score-part id="P1"><part-name>Flute</part-name></score-part>
  </part-list>
</score-partwise>"#;

        let root = parse_xml(xml).unwrap();
        assert_eq!(root.name, "score-partwise");
        assert_eq!(root.attribute("version"), Some("3.1"));

        let score_part = root.descendant("score-part").unwrap();
        assert_eq!(score_part.attribute("id"), Some("P1"));
        assert_eq!(score_part.child_text("part-name"), Some("Flute"));
    }

    #[test]
    fn test_parse_accepts_doctype() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE score-partwise PUBLIC "-//Recordare//DTD MusicXML 3.1 Partwise//EN"
  "http://www.musicxml.org/dtds/partwise.dtd">
<score-partwise version="3.1"><part-list/></score-partwise>"#;

        let root = parse_xml(xml).unwrap();
        assert_eq!(root.name, "score-partwise");
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn test_malformed_xml_is_syntax_error() {
        let err = parse_xml("<score-partwise><part></score-partwise>").unwrap_err();
        assert!(matches!(err, ImportError::Syntax(_)));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let root = parse_xml("<a><m n=\"1\"><m n=\"2\"/></m><m n=\"3\"/></a>").unwrap();
        let numbers: Vec<_> = root
            .descendants_named("m")
            .iter()
            .map(|m| m.attribute("n").unwrap_or(""))
            .collect();
        assert_eq!(numbers, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_set_attribute_replaces() {
        let mut el = XmlElement::new("part");
        el.set_attribute("id", "P1");
        el.set_attribute("id", "P2");
        assert_eq!(el.attributes.len(), 1);
        assert_eq!(el.attribute("id"), Some("P2"));
    }
}
