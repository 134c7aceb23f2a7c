//! Minimal element tree built on `quick-xml`, plus output helpers.
//!
//! The data schema and the geocode feed are both small, fixed shapes, so the
//! readers walk an owned tree instead of driving the pull parser directly.

use std::io::{self, Write};

use quick_xml::{
    Reader,
    escape::escape,
    events::{BytesStart, Event},
};

/// An XML element with its attributes, text and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Element {
    /// Qualified name as written, e.g. `xs:element`.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    /// Name without any namespace prefix.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Attribute value by local name, ignoring case and prefixes.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| local_part(key).eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// First child with the given local name, ignoring case.
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children
            .iter()
            .find(|child| child.local_name().eq_ignore_ascii_case(name))
    }

    /// All children with the given local name, ignoring case.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Self> + 'a {
        self.children
            .iter()
            .filter(move |child| child.local_name().eq_ignore_ascii_case(name))
    }

    /// Depth-first search for the first descendant with the given local name.
    pub fn descendant(&self, name: &str) -> Option<&Self> {
        self.children.iter().find_map(|child| {
            if child.local_name().eq_ignore_ascii_case(name) {
                Some(child)
            } else {
                child.descendant(name)
            }
        })
    }

    /// Text of the named child, if present.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|child| child.text.as_str())
    }
}

fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// Parse `text` into its root element.
///
/// Leaf text is kept exactly as written. Text inside an element that has
/// child elements is indentation and is dropped.
pub(crate) fn parse_document(text: &str) -> Result<Element, quick_xml::Error> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;
    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(open_element(&start)?),
            Event::Empty(start) => {
                let element = open_element(&start)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    attach(&mut stack, &mut root, element);
                }
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current
                        .text
                        .push_str(&String::from_utf8_lossy(data.as_ref()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    while let Some(element) = stack.pop() {
        attach(&mut stack, &mut root, element);
    }
    root.ok_or_else(|| {
        quick_xml::Error::Io(std::sync::Arc::new(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "document has no root element",
        )))
    })
}

fn open_element(start: &BytesStart<'_>) -> Result<Element, quick_xml::Error> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        ..Element::default()
    })
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, mut element: Element) {
    if !element.children.is_empty() {
        element.text.clear();
    }
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

/// Tiny indenting writer used by the XML serialisers.
pub(crate) struct XmlWriter<W: Write> {
    inner: W,
    depth: usize,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, depth: 0 }
    }

    pub fn declaration(&mut self) -> io::Result<()> {
        writeln!(self.inner, r#"<?xml version="1.0" encoding="utf-8"?>"#)
    }

    pub fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> io::Result<()> {
        self.indent()?;
        writeln!(self.inner, "<{name}{}>", render_attributes(attributes))?;
        self.depth += 1;
        Ok(())
    }

    pub fn close(&mut self, name: &str) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.indent()?;
        writeln!(self.inner, "</{name}>")
    }

    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> io::Result<()> {
        self.indent()?;
        writeln!(self.inner, "<{name}{} />", render_attributes(attributes))
    }

    pub fn text_element(&mut self, name: &str, text: &str) -> io::Result<()> {
        self.indent()?;
        writeln!(self.inner, "<{name}>{}</{name}>", escape(text))
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    fn indent(&mut self) -> io::Result<()> {
        for _ in 0..self.depth {
            self.inner.write_all(b"  ")?;
        }
        Ok(())
    }
}

fn render_attributes(attributes: &[(&str, &str)]) -> String {
    attributes
        .iter()
        .map(|(key, value)| format!(r#" {key}="{}""#, escape(*value)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn builds_nested_tree() {
        let doc = r#"<?xml version="1.0"?>
            <Root xmlns:xs="urn:x">
                <xs:element name="A" type="xs:string" />
                <Row><A>one &amp; two</A><B><![CDATA[<raw>]]></B></Row>
            </Root>"#;
        let root = parse_document(doc).expect("document should parse");
        assert_eq!(root.local_name(), "Root");
        let element = root.child("element").expect("schema element");
        assert_eq!(element.name, "xs:element");
        assert_eq!(element.attribute("NAME"), Some("A"));
        let row = root.child("row").expect("row element");
        assert_eq!(row.child_text("a"), Some("one & two"));
        assert_eq!(row.child_text("B"), Some("<raw>"));
    }

    #[rstest]
    fn keeps_leaf_whitespace_and_drops_indentation() {
        let doc = concat!(
            "<Root>\n  <Row>\n",
            "    <Name>  Suite 4 </Name>\n    <Blank>   </Blank>\n",
            "  </Row>\n</Root>\n",
        );
        let root = parse_document(doc).expect("document should parse");
        assert!(root.text.is_empty());
        let row = root.child("Row").expect("row element");
        assert!(row.text.is_empty());
        assert_eq!(row.child_text("Name"), Some("  Suite 4 "));
        assert_eq!(row.child_text("Blank"), Some("   "));
    }

    #[rstest]
    fn finds_descendants_depth_first() {
        let root = parse_document("<a><b><c>deep</c></b><c>shallow</c></a>")
            .expect("document should parse");
        assert_eq!(root.descendant("c").map(|c| c.text.as_str()), Some("deep"));
    }

    #[rstest]
    fn rejects_documents_without_root() {
        assert!(parse_document("   ").is_err());
    }

    #[rstest]
    fn writer_escapes_text_and_attributes() {
        let mut writer = XmlWriter::new(Vec::new());
        writer.open("Root", &[("Name", "a\"b")]).expect("write");
        writer.text_element("Value", "x < y").expect("write");
        writer.close("Root").expect("write");
        let output = String::from_utf8(writer.into_inner()).expect("utf-8 output");
        assert_eq!(
            output,
            "<Root Name=\"a&quot;b\">\n  <Value>x &lt; y</Value>\n</Root>\n"
        );
        let root = parse_document(&output).expect("writer output should parse");
        assert_eq!(root.attribute("Name"), Some("a\"b"));
        assert_eq!(root.child_text("Value"), Some("x < y"));
    }
}
