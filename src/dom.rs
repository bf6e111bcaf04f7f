//! Submission XML cleaning, parsing and abbreviated XPath computation.
//!
//! The document is built once from `quick-xml` events into a small owned
//! tree. Node kinds are a closed enum so the conversion rules match on
//! variants instead of node-type constants.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{ParseError, Result};

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// A child node of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    /// Entity-decoded character data.
    Text(String),
    CData(String),
    /// Comments count as children but never carry data.
    Comment(String),
    /// A processing instruction inside the root, kept for the same reason.
    Instruction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Qualified name as written, e.g. `orx:meta`.
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    /// Every element below this one, in document order.
    pub fn descendants(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        let mut stack: Vec<&Element> = self.child_elements().collect();
        stack.reverse();
        while let Some(el) = stack.pop() {
            out.push(el);
            let mut kids: Vec<&Element> = el.child_elements().collect();
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// Text of the first child node, when that node is text or CDATA.
    pub fn first_text(&self) -> Option<&str> {
        match self.children.first()? {
            Node::Text(t) | Node::CData(t) => Some(t),
            _ => None,
        }
    }

    fn from_start(e: &BytesStart) -> Result<Self> {
        let name = std::str::from_utf8(e.name().as_ref())?.to_string();
        let mut attributes = Vec::new();
        for attr in e.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Element {
            name,
            attributes,
            children: Vec::new(),
        })
    }
}

/// A parsed submission: the single root element.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn into_root(self) -> Element {
        self.root
    }
}

// ---------------------------------------------------------------------------
// Cleaning
// ---------------------------------------------------------------------------

/// Strips surrounding whitespace and removes whitespace between tags.
///
/// Equivalent to replacing every `>\s+<` with `><` in the trimmed input, so
/// whitespace-only text between elements never reaches the tree.
pub fn clean_xml(xml_str: &str) -> String {
    let trimmed = xml_str.trim();
    let mut result = String::with_capacity(trimmed.len());
    let mut chars = trimmed.chars().peekable();
    while let Some(c) = chars.next() {
        result.push(c);
        if c != '>' {
            continue;
        }
        let mut ws_buf = String::new();
        while let Some(&next) = chars.peek() {
            if !next.is_whitespace() {
                break;
            }
            ws_buf.push(next);
            chars.next();
        }
        if chars.peek() != Some(&'<') {
            result.push_str(&ws_buf);
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Clean and parse a submission.
pub fn parse_document(xml_str: &str) -> Result<Document> {
    let cleaned = clean_xml(xml_str);
    build_dom(&cleaned)
}

/// Same as [`parse_document`] for a raw byte buffer.
pub fn parse_document_bytes(xml_bytes: &[u8]) -> Result<Document> {
    parse_document(std::str::from_utf8(xml_bytes)?)
}

/// Deepest element nesting accepted in a submission. Conversion recurses
/// once per level.
pub const MAX_DEPTH: usize = 1024;

fn build_dom(xml: &str) -> Result<Document> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text_start = false;
    reader.config_mut().trim_text_end = false;
    reader.config_mut().check_end_names = true;

    // Open elements, innermost last.
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(ParseError::MalformedXml(format!(
                        "nesting too deep: more than {MAX_DEPTH} levels"
                    )));
                }
                stack.push(Element::from_start(&e)?)
            }
            Event::Empty(e) => {
                let element = Element::from_start(&e)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(e) => {
                let element = stack.pop().ok_or_else(|| {
                    ParseError::MalformedXml(format!(
                        "unexpected end tag </{}>",
                        String::from_utf8_lossy(e.name().as_ref())
                    ))
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(e) => {
                let text = e.unescape()?.into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Text(text)),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(ParseError::MalformedXml(
                            "text outside the root element".to_string(),
                        ))
                    }
                }
            }
            Event::CData(e) => {
                let text = std::str::from_utf8(&e)?.to_string();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::CData(text)),
                    None => {
                        return Err(ParseError::MalformedXml(
                            "CDATA outside the root element".to_string(),
                        ))
                    }
                }
            }
            Event::Comment(e) => {
                if let Some(parent) = stack.last_mut() {
                    let text = String::from_utf8_lossy(&e).into_owned();
                    parent.children.push(Node::Comment(text));
                }
            }
            Event::PI(_) => {
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Node::Instruction);
                }
            }
            Event::Decl(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::MalformedXml(format!(
            "unclosed element <{}>",
            open.name
        )));
    }
    root.map(|root| Document { root })
        .ok_or(ParseError::EmptyDocument)
}

/// Attach a closed element to its parent, or make it the document root.
fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Element(element));
        return Ok(());
    }
    if root.is_some() {
        return Err(ParseError::MalformedXml(format!(
            "junk after document element: <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

// ---------------------------------------------------------------------------
// XPath
// ---------------------------------------------------------------------------

/// Abbreviated XPath of a node relative to the submission root.
///
/// `ancestors` runs from the root element down to the node's parent. The root
/// itself is not part of the path: for `data > meta > instanceID` the
/// ancestors are `["data", "meta"]` and the xpath is `meta/instanceID`.
pub fn abbreviated_xpath(ancestors: &[&str], node_name: &str) -> String {
    let mut parts: Vec<&str> = ancestors.iter().skip(1).copied().collect();
    parts.push(node_name);
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_xml() {
        let input = "  <?xml version='1.0' ?><root>  \n  <child>text</child>  \n  </root>  ";
        assert_eq!(
            clean_xml(input),
            "<?xml version='1.0' ?><root><child>text</child></root>"
        );
    }

    #[test]
    fn test_clean_xml_preserves_inner_text() {
        let input = "<root><name>Larry\n        Again\n  </name></root>";
        assert_eq!(clean_xml(input), input);
    }

    #[test]
    fn test_clean_xml_is_idempotent() {
        let input = "<root>\n  <a>1</a>\t<b> x </b>\n</root>";
        let once = clean_xml(input);
        assert_eq!(clean_xml(&once), once);
        assert_eq!(clean_xml("<a><b>1</b></a>"), "<a><b>1</b></a>");
    }

    #[test]
    fn test_parse_tree_shape() {
        let doc = parse_document(
            r#"<data id="f"><name>Larry</name><note/><c><![CDATA[<b>x</b>]]></c><!-- hi --></data>"#,
        )
        .unwrap();
        let root = doc.root();
        assert_eq!(root.name(), "data");
        assert_eq!(root.attribute("id"), Some("f"));
        assert_eq!(root.children().len(), 4);

        let kids: Vec<&Element> = root.child_elements().collect();
        assert_eq!(kids[0].children(), &[Node::Text("Larry".to_string())]);
        assert!(kids[1].children().is_empty());
        assert_eq!(kids[2].children(), &[Node::CData("<b>x</b>".to_string())]);
        assert!(matches!(root.children()[3], Node::Comment(_)));
    }

    #[test]
    fn test_entities_are_decoded() {
        let doc = parse_document(r#"<data title="a &amp; b"><x>1 &lt; 2</x></data>"#).unwrap();
        assert_eq!(doc.root().attribute("title"), Some("a & b"));
        let x = doc.root().child_elements().next().unwrap();
        assert_eq!(x.first_text(), Some("1 < 2"));
    }

    #[test]
    fn test_local_name() {
        let doc = parse_document(r#"<h:html xmlns:h="x"><h:head/></h:html>"#).unwrap();
        assert_eq!(doc.root().name(), "h:html");
        assert_eq!(doc.root().local_name(), "html");
    }

    #[test]
    fn test_mismatched_tags_rejected() {
        let err = parse_document(r#"<data id="f"><foo></data>"#).unwrap_err();
        assert!(matches!(err, ParseError::MalformedXml(_)));
    }

    #[test]
    fn test_unclosed_element_rejected() {
        let err = parse_document("<data><foo>bar</foo>").unwrap_err();
        assert!(matches!(err, ParseError::MalformedXml(_)));
    }

    #[test]
    fn test_second_root_rejected() {
        let err = parse_document("<a>1</a><b>2</b>").unwrap_err();
        assert!(matches!(err, ParseError::MalformedXml(_)));
    }

    #[test]
    fn test_text_outside_root_rejected() {
        let err = parse_document("<a>1</a>trailing").unwrap_err();
        assert!(matches!(err, ParseError::MalformedXml(_)));
    }

    #[test]
    fn test_duplicate_attribute_rejected() {
        let err = parse_document(r#"<a id="1" id="2">x</a>"#).unwrap_err();
        assert!(matches!(err, ParseError::MalformedXml(_)));
    }

    #[test]
    fn test_undefined_entity_rejected() {
        let err = parse_document("<a>&nope;</a>").unwrap_err();
        assert!(matches!(err, ParseError::MalformedXml(_)));
    }

    #[test]
    fn test_nesting_depth_is_limited() {
        let nested = |depth: usize| {
            format!("<data>{}x{}</data>", "<g>".repeat(depth), "</g>".repeat(depth))
        };

        assert!(parse_document(&nested(MAX_DEPTH - 1)).is_ok());
        let err = parse_document(&nested(MAX_DEPTH)).unwrap_err();
        assert!(matches!(err, ParseError::MalformedXml(msg) if msg.contains("nesting too deep")));
        assert!(parse_document(&nested(10_000)).is_err());
    }

    #[test]
    fn test_empty_document() {
        assert!(matches!(
            parse_document("   ").unwrap_err(),
            ParseError::EmptyDocument
        ));
        assert!(matches!(
            parse_document("<?xml version='1.0' ?><!-- nothing -->").unwrap_err(),
            ParseError::EmptyDocument
        ));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = parse_document_bytes(&[b'<', b'a', b'>', 0xff, b'<', b'/', b'a', b'>']).unwrap_err();
        assert!(matches!(err, ParseError::MalformedXml(_)));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let doc = parse_document("<r><a><b/></a><c/></r>").unwrap();
        let names: Vec<&str> = doc.root().descendants().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_xpath_computation() {
        assert_eq!(abbreviated_xpath(&["tutorial"], "age"), "age");
        assert_eq!(
            abbreviated_xpath(&["tutorial", "meta"], "instanceID"),
            "meta/instanceID"
        );
        assert_eq!(abbreviated_xpath(&["root", "a", "b"], "c"), "a/b/c");
    }
}
