use crate::core::tei::{self, Element, Node};
use crate::utils::error::{Result, TeiError};
use regex::Regex;
use std::sync::LazyLock;

pub const PAGE_BREAK_MARKER_DEFAULT: &str =
    "<p>──────────────────────────────────────────────────────────────────────</p>";

pub const SOURCE_DOC_ID: &str = "transcription";

/// Heading the transcription tool adds above every page.
const ARTIFACT_HEADING: &str = "Transcript:";

static UNSUPPORTED_MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(table|ol|ul)[\s>/]").expect("valid markup pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRewrite {
    /// Renames the element; fixed attributes come first, then the originals (some renamed).
    Rename {
        tag: String,
        attributes: Vec<(String, String)>,
        renamed_attributes: Vec<(String, String)>,
    },
    /// Paragraph becomes an empty `<line/>` followed by one `<line>` per break-separated run.
    Lines,
    /// A break that is not a direct child of a paragraph.
    LineBreak,
}

impl TagRewrite {
    pub fn hi(rend: &str) -> Self {
        TagRewrite::Rename {
            tag: "hi".to_string(),
            attributes: vec![("rend".to_string(), rend.to_string())],
            renamed_attributes: Vec::new(),
        }
    }
}

/// Ordered HTML-tag to TEI rewrites. The first rule naming a tag wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionTable {
    rules: Vec<(String, TagRewrite)>,
}

impl SubstitutionTable {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn with_rule(mut self, html_tag: &str, rewrite: TagRewrite) -> Self {
        self.rules.push((html_tag.to_string(), rewrite));
        self
    }

    pub fn rule_for(&self, html_tag: &str) -> Option<&TagRewrite> {
        self.rules
            .iter()
            .find(|(tag, _)| tag == html_tag)
            .map(|(_, rewrite)| rewrite)
    }

    fn breaks_lines(&self, html_tag: &str) -> bool {
        matches!(self.rule_for(html_tag), Some(TagRewrite::LineBreak))
    }
}

impl Default for SubstitutionTable {
    fn default() -> Self {
        Self::empty()
            .with_rule("strong", TagRewrite::hi("strong"))
            .with_rule("sup", TagRewrite::hi("super"))
            .with_rule(
                "a",
                TagRewrite::Rename {
                    tag: "ref".to_string(),
                    attributes: Vec::new(),
                    renamed_attributes: vec![
                        ("href".to_string(), "target".to_string()),
                        ("id".to_string(), "xml:id".to_string()),
                    ],
                },
            )
            .with_rule("br", TagRewrite::LineBreak)
            .with_rule("sub", TagRewrite::hi("sub"))
            .with_rule("s", TagRewrite::hi("line-through"))
            .with_rule("em", TagRewrite::hi("bold"))
            .with_rule("p", TagRewrite::Lines)
    }
}

/// Builds one `<surface facs="#fNNN">` per non-empty page.
///
/// Fails with [`TeiError::UnsupportedMarkup`] before producing anything when
/// the HTML contains tables or lists, and with [`TeiError::MalformedFragment`]
/// when a page is not well-formed once cleaned.
pub fn build_source_doc(
    html: &str,
    page_break_marker: &str,
    table: &SubstitutionTable,
) -> Result<Vec<Element>> {
    if let Some(caps) = UNSUPPORTED_MARKUP.captures(html) {
        let markup = match &caps[1] {
            "table" => "tables",
            "ol" => "ordered lists",
            _ => "unordered lists",
        };
        return Err(TeiError::UnsupportedMarkup {
            markup: markup.to_string(),
        });
    }

    let mut pages = Vec::new();
    for (index, chunk) in html.split(page_break_marker).enumerate() {
        let nodes = tei::parse_fragment(chunk).map_err(|reason| TeiError::MalformedFragment {
            page: index,
            reason,
        })?;
        let cleaned = clean_page(rewrite_nodes(nodes, table));
        if is_blank(&cleaned) {
            tracing::debug!("Dropping empty transcription chunk {}", index);
            continue;
        }
        pages.push(cleaned);
    }

    let digits = if pages.len() < 1000 { 3 } else { 4 };
    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(ordinal, nodes)| {
            Element::new("surface")
                .with_attr("facs", format!("#f{:0width$}", ordinal, width = digits))
                .with_children(nodes)
        })
        .collect())
}

/// Returns `document` with `<sourceDoc xml:id="transcription">` appended after its children.
pub fn with_source_doc(document: Element, surfaces: Vec<Element>) -> Element {
    document.with_child(
        Element::new("sourceDoc")
            .with_attr("xml:id", SOURCE_DOC_ID)
            .with_children(surfaces),
    )
}

/// Checks that every transcription page points at the facsimile surface in the same position.
pub fn check_alignment(facsimile_ids: &[&str], surfaces: &[Element]) -> Result<()> {
    if facsimile_ids.len() != surfaces.len() {
        return Err(TeiError::PageAlignment {
            reason: format!(
                "{} transcription pages for {} facsimile surfaces",
                surfaces.len(),
                facsimile_ids.len()
            ),
        });
    }

    for (position, (id, surface)) in facsimile_ids.iter().zip(surfaces).enumerate() {
        let target = surface.attr("facs").unwrap_or_default();
        if target.strip_prefix('#') != Some(*id) {
            return Err(TeiError::PageAlignment {
                reason: format!(
                    "page {} points at '{}' but the facsimile surface is '{}'",
                    position, target, id
                ),
            });
        }
    }

    Ok(())
}

fn rewrite_nodes(nodes: Vec<Node>, table: &SubstitutionTable) -> Vec<Node> {
    nodes
        .into_iter()
        .flat_map(|node| match node {
            Node::Element(el) => rewrite_element(el, table),
            other => vec![other],
        })
        .collect()
}

fn rewrite_element(el: Element, table: &SubstitutionTable) -> Vec<Node> {
    match table.rule_for(&el.name) {
        Some(TagRewrite::Rename {
            tag,
            attributes,
            renamed_attributes,
        }) => {
            let mut out = Element::new(tag.as_str());
            for (key, value) in attributes {
                out = out.with_attr(key.as_str(), value.as_str());
            }
            for (key, value) in el.attributes {
                let key = renamed_attributes
                    .iter()
                    .find(|(from, _)| *from == key)
                    .map(|(_, to)| to.clone())
                    .unwrap_or(key);
                out = out.with_attr(key, value);
            }
            vec![Node::Element(
                out.with_children(rewrite_nodes(el.children, table)),
            )]
        }
        Some(TagRewrite::Lines) => paragraph_lines(el.children, table),
        Some(TagRewrite::LineBreak) => vec![Node::Element(Element::new("lb"))],
        None => {
            let children = rewrite_nodes(el.children, table);
            vec![Node::Element(Element {
                children,
                ..el
            })]
        }
    }
}

fn paragraph_lines(children: Vec<Node>, table: &SubstitutionTable) -> Vec<Node> {
    let mut lines = vec![Node::Element(Element::new("line"))];
    let mut current = Element::new("line");

    for child in children {
        match child {
            Node::Element(el) if table.breaks_lines(&el.name) => {
                let finished = std::mem::replace(&mut current, Element::new("line"));
                lines.push(Node::Element(finished));
            }
            Node::Element(el) => current.children.extend(rewrite_element(el, table)),
            other => current.children.push(other),
        }
    }

    lines.push(Node::Element(current));
    lines
}

/// Drops the tool's `Transcript:` headings and the page's first `<h2>`.
fn clean_page(nodes: Vec<Node>) -> Vec<Node> {
    let mut seen_h2 = false;
    nodes
        .into_iter()
        .filter(|node| match node {
            Node::Element(el) if is_artifact_heading(el) => false,
            Node::Element(el) if el.name == "h2" && !seen_h2 => {
                seen_h2 = true;
                false
            }
            _ => true,
        })
        .collect()
}

fn is_artifact_heading(el: &Element) -> bool {
    el.name == "h3"
        && el.attributes.is_empty()
        && el.children.len() == 1
        && el.text_content() == ARTIFACT_HEADING
}

fn is_blank(nodes: &[Node]) -> bool {
    nodes.iter().all(|node| match node {
        Node::Text(text) => text.trim().is_empty(),
        _ => false,
    })
}
