use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use std::fmt::Write as _;
use std::sync::LazyLock;

pub const TEI_NAMESPACE: &str = "http://www.tei-c.org/ns/1.0";

/// Elements whose element-only content is laid out one child per line.
const BLOCK_ELEMENTS: [&str; 9] = [
    "TEI",
    "teiHeader",
    "fileDesc",
    "titleStmt",
    "publicationStmt",
    "sourceDesc",
    "facsimile",
    "sourceDoc",
    "surface",
];

const INDENT: &str = "  ";

static ENTITY_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#x[0-9a-fA-F]+|#[0-9]+|[A-Za-z][A-Za-z0-9]*);").expect("valid entity pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text(value.into())
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Node::Element(el)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Sets an attribute, replacing an existing one of the same name in place.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| *key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    pub fn with_child(mut self, child: impl Into<Node>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Node>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(Node::Text(text.into()))
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// First element named `name` in document order, including `self`.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find(name))
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    fn is_block(&self) -> bool {
        BLOCK_ELEMENTS.contains(&self.name.as_str())
            && !self.children.is_empty()
            && self.children.iter().all(|c| !matches!(c, Node::Text(_)))
    }
}

fn collect_text(el: &Element, out: &mut String) {
    for child in &el.children {
        match child {
            Node::Text(t) => out.push_str(t),
            Node::Element(e) => collect_text(e, out),
            Node::Comment(_) => {}
        }
    }
}

/// Serializes a document with an XML declaration. Output depends only on the tree.
pub fn to_xml_string(root: &Element) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write_element(&mut out, root, 0);
    out.push('\n');
    out
}

/// Serializes a subtree without a declaration or trailing newline.
pub fn fragment_to_string(el: &Element) -> String {
    let mut out = String::new();
    write_element(&mut out, el, 0);
    out
}

fn write_element(out: &mut String, el: &Element, depth: usize) {
    out.push('<');
    out.push_str(&el.name);
    for (key, value) in &el.attributes {
        let _ = write!(out, " {}=\"{}\"", key, escape(value.as_str()));
    }

    if el.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    if el.is_block() {
        for child in &el.children {
            out.push('\n');
            out.push_str(&INDENT.repeat(depth + 1));
            write_node(out, child, depth + 1);
        }
        out.push('\n');
        out.push_str(&INDENT.repeat(depth));
    } else {
        for child in &el.children {
            write_node(out, child, depth + 1);
        }
    }

    let _ = write!(out, "</{}>", el.name);
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    match node {
        Node::Element(el) => write_element(out, el, depth),
        Node::Text(text) => out.push_str(&partial_escape(text.as_str())),
        Node::Comment(text) => {
            let _ = write!(out, "<!--{}-->", comment_text(text));
        }
    }
}

/// Comment bodies may not contain `--` or end with `-`.
fn comment_text(text: &str) -> String {
    let mut body = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '-' && body.ends_with('-') {
            body.push(' ');
        }
        body.push(c);
    }
    if body.ends_with('-') {
        body.push(' ');
    }
    body
}

/// Parses a sequence of sibling nodes (text allowed at the top level).
pub fn parse_fragment(markup: &str) -> Result<Vec<Node>, String> {
    const WRAPPER: &str = "fragment-root";
    let wrapped = format!("<{0}>{1}</{0}>", WRAPPER, markup);

    let mut reader = Reader::from_str(&wrapped);
    let mut stack: Vec<Element> = Vec::new();
    let mut finished: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let el = start_element(e.name().as_ref(), e.attributes())?;
                stack.push(el);
            }
            Ok(Event::Empty(e)) => {
                let el = start_element(e.name().as_ref(), e.attributes())?;
                append(&mut stack, Node::Element(el))?;
            }
            Ok(Event::End(_)) => {
                let el = stack.pop().ok_or("unexpected closing tag")?;
                if stack.is_empty() {
                    finished = Some(el);
                } else {
                    append(&mut stack, Node::Element(el))?;
                }
            }
            Ok(Event::Text(e)) => {
                append_text(&mut stack, &String::from_utf8_lossy(e.as_ref()))?;
            }
            Ok(Event::CData(e)) => {
                append_text(&mut stack, &String::from_utf8_lossy(e.as_ref()))?;
            }
            Ok(Event::GeneralRef(e)) => {
                let entity = String::from_utf8_lossy(e.as_ref()).into_owned();
                let resolved = resolve_entity(&entity)
                    .ok_or_else(|| format!("unknown entity &{};", entity))?;
                append_text(&mut stack, &resolved)?;
            }
            Ok(Event::Comment(e)) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                append(&mut stack, Node::Comment(text))?;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "{} at position {}",
                    e,
                    reader.buffer_position()
                ))
            }
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("unclosed element at end of input".to_string());
    }

    finished
        .map(|root| root.children)
        .ok_or_else(|| "empty input".to_string())
}

/// Parses a complete document and returns its root element.
pub fn parse_document(markup: &str) -> Result<Element, String> {
    let without_decl = match markup.trim_start().strip_prefix("<?xml") {
        Some(rest) => rest.split_once("?>").map(|(_, body)| body).unwrap_or(rest),
        None => markup,
    };
    parse_fragment(without_decl)?
        .into_iter()
        .find_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
        .ok_or_else(|| "document has no root element".to_string())
}

fn start_element(
    name: &[u8],
    attributes: quick_xml::events::attributes::Attributes<'_>,
) -> Result<Element, String> {
    let mut el = Element::new(String::from_utf8_lossy(name).into_owned());
    for attr in attributes {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = unescape(&String::from_utf8_lossy(&attr.value))?;
        el = el.with_attr(key, value);
    }
    Ok(el)
}

fn append(stack: &mut [Element], node: Node) -> Result<(), String> {
    let parent = stack.last_mut().ok_or("content outside of the root element")?;
    parent.children.push(node);
    Ok(())
}

fn append_text(stack: &mut [Element], text: &str) -> Result<(), String> {
    if text.is_empty() {
        return Ok(());
    }
    let parent = stack.last_mut().ok_or("text outside of the root element")?;
    match parent.children.last_mut() {
        Some(Node::Text(existing)) => existing.push_str(text),
        _ => parent.children.push(Node::Text(text.to_string())),
    }
    Ok(())
}

fn unescape(raw: &str) -> Result<String, String> {
    let mut failure = None;
    let out = ENTITY_REF.replace_all(raw, |caps: &regex::Captures| {
        resolve_entity(&caps[1]).unwrap_or_else(|| {
            failure = Some(caps[0].to_string());
            String::new()
        })
    });
    match failure {
        Some(entity) => Err(format!("unknown entity {}", entity)),
        None => Ok(out.into_owned()),
    }
}

fn resolve_entity(entity: &str) -> Option<String> {
    match entity {
        "apos" => return Some("'".to_string()),
        "quot" => return Some("\"".to_string()),
        "lt" => return Some("<".to_string()),
        "gt" => return Some(">".to_string()),
        "amp" => return Some("&".to_string()),
        "nbsp" => return Some('\u{a0}'.to_string()),
        _ => {}
    }

    let code = if let Some(hex) = entity.strip_prefix("#x") {
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
    fn test_block_elements_are_indented() {
        let doc = Element::new("TEI")
            .with_attr("xmlns", TEI_NAMESPACE)
            .with_child(Element::new("facsimile").with_child(Element::new("surface").with_attr("xml:id", "f000")));

        assert_eq!(
            to_xml_string(&doc),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <TEI xmlns=\"http://www.tei-c.org/ns/1.0\">\n  \
             <facsimile>\n    <surface xml:id=\"f000\"/>\n  </facsimile>\n</TEI>\n"
        );
    }

    #[test]
    fn test_mixed_content_stays_inline() {
        let line = Element::new("line")
            .with_text("Dear ")
            .with_child(Element::new("hi").with_attr("rend", "strong").with_text("Jane"))
            .with_text(" & co");
        assert_eq!(
            fragment_to_string(&line),
            "<line>Dear <hi rend=\"strong\">Jane</hi> &amp; co</line>"
        );
    }

    #[test]
    fn test_attributes_are_escaped() {
        let el = Element::new("ref").with_attr("target", "https://x.org/?a=1&b=\"2\"");
        assert_eq!(
            fragment_to_string(&el),
            "<ref target=\"https://x.org/?a=1&amp;b=&quot;2&quot;\"/>"
        );
    }

    #[test]
    fn test_comment_never_contains_double_hyphen() {
        let el = Element::new("title").with_child(Node::Comment(" draft --- v2 -".to_string()));
        let xml = fragment_to_string(&el);
        assert_eq!(xml, "<title><!-- draft - - - v2 - --></title>");
        assert!(!xml["<title><!--".len()..xml.len() - "--></title>".len()].contains("--"));
        assert!(parse_fragment(&xml).is_ok());
    }

    #[test]
    fn test_with_attr_replaces_existing() {
        let el = Element::new("a").with_attr("x", "1").with_attr("x", "2");
        assert_eq!(el.attributes, vec![("x".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_parse_fragment_keeps_nesting_and_text() {
        let nodes = parse_fragment("Intro <line>one <hi rend=\"sub\">2</hi></line><line/>").unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], Node::text("Intro "));

        let line = nodes[1].as_element().unwrap();
        assert_eq!(line.name, "line");
        assert_eq!(line.text_content(), "one 2");
        assert_eq!(line.find("hi").unwrap().attr("rend"), Some("sub"));
    }

    #[test]
    fn test_parse_fragment_resolves_entities() {
        let nodes = parse_fragment("<p title=\"a &amp; b\">x &lt; y &#233;</p>").unwrap();
        let p = nodes[0].as_element().unwrap();
        assert_eq!(p.attr("title"), Some("a & b"));
        assert_eq!(p.text_content(), "x < y \u{e9}");
    }

    #[test]
    fn test_parse_fragment_rejects_unbalanced_markup() {
        assert!(parse_fragment("<line>open").is_err());
        assert!(parse_fragment("<hi>a</line>").is_err());
        assert!(parse_fragment("&bogus;").is_err());
    }

    #[test]
    fn test_parse_document_round_trip() {
        let doc = Element::new("TEI").with_child(
            Element::new("facsimile").with_attr("sameAs", "m").with_children(vec![
                Element::new("surface").with_attr("xml:id", "f000"),
                Element::new("surface").with_attr("xml:id", "f001"),
            ]),
        );
        let parsed = parse_document(&to_xml_string(&doc)).unwrap();
        let facsimile = parsed.find("facsimile").unwrap();
        let ids: Vec<&str> = facsimile
            .child_elements()
            .filter_map(|s| s.attr("xml:id"))
            .collect();
        assert_eq!(ids, vec!["f000", "f001"]);
    }
}
