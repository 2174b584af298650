//! `.docx` to HTML conversion covering the subset the transcription builder understands.

use crate::core::tei::{parse_document, Element};
use crate::domain::ports::{Conversion, DocumentConverter};
use crate::utils::error::{Result, TeiError};
use quick_xml::escape::{escape, partial_escape};
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";
const RELATIONSHIPS_PART: &str = "word/_rels/document.xml.rels";

#[derive(Debug, Clone, Copy, Default)]
pub struct DocxConverter;

impl DocxConverter {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentConverter for DocxConverter {
    fn convert_to_html(&self, document: &[u8]) -> Result<Conversion> {
        let mut archive = ZipArchive::new(Cursor::new(document))?;

        let body_xml = read_part(&mut archive, DOCUMENT_PART)?.ok_or_else(|| {
            TeiError::DocumentConversion {
                reason: format!("{} is missing", DOCUMENT_PART),
            }
        })?;
        let links = match read_part(&mut archive, RELATIONSHIPS_PART)? {
            Some(xml) => hyperlink_targets(&xml)?,
            None => HashMap::new(),
        };

        let root = parse_part(&body_xml)?;
        let body = root
            .child_elements()
            .find(|el| el.name == "w:body")
            .ok_or_else(|| TeiError::DocumentConversion {
                reason: "document has no body".to_string(),
            })?;

        let mut writer = HtmlWriter {
            links: &links,
            html: String::new(),
            messages: Vec::new(),
        };
        writer.block_children(body);

        Ok(Conversion {
            html: writer.html,
            messages: writer.messages,
        })
    }
}

fn read_part<R: Read + std::io::Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(Some(content))
}

fn parse_part(xml: &str) -> Result<Element> {
    parse_document(xml.trim_start_matches('\u{feff}'))
        .map_err(|reason| TeiError::DocumentConversion { reason })
}

/// Relationship id to external target, for `w:hyperlink r:id`.
fn hyperlink_targets(rels_xml: &str) -> Result<HashMap<String, String>> {
    let root = parse_part(rels_xml)?;
    Ok(root
        .child_elements()
        .filter_map(|rel| Some((rel.attr("Id")?.to_string(), rel.attr("Target")?.to_string())))
        .collect())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RunFormat {
    bold: bool,
    italic: bool,
    strike: bool,
    superscript: bool,
    subscript: bool,
}

impl RunFormat {
    fn from_properties(rpr: Option<&Element>) -> Self {
        let Some(rpr) = rpr else {
            return Self::default();
        };
        let toggled = |name: &str| {
            rpr.child_elements()
                .find(|el| el.name == name)
                .is_some_and(|el| !matches!(el.attr("w:val"), Some("0" | "false" | "off")))
        };
        let vertical = rpr
            .child_elements()
            .find(|el| el.name == "w:vertAlign")
            .and_then(|el| el.attr("w:val"));

        Self {
            bold: toggled("w:b"),
            italic: toggled("w:i"),
            strike: toggled("w:strike"),
            superscript: vertical == Some("superscript"),
            subscript: vertical == Some("subscript"),
        }
    }

    /// Innermost first; bold ends up outermost.
    fn tags(&self) -> Vec<&'static str> {
        let mut tags = Vec::new();
        if self.strike {
            tags.push("s");
        }
        if self.subscript {
            tags.push("sub");
        }
        if self.superscript {
            tags.push("sup");
        }
        if self.italic {
            tags.push("em");
        }
        if self.bold {
            tags.push("strong");
        }
        tags
    }

    fn wrap(&self, inner: &str) -> String {
        self.tags().iter().fold(inner.to_string(), |acc, tag| {
            format!("<{0}>{1}</{0}>", tag, acc)
        })
    }
}

/// Consecutive runs with the same formatting share one set of tags.
#[derive(Default)]
struct InlineBuffer {
    html: String,
    pending: Option<(RunFormat, String)>,
}

impl InlineBuffer {
    fn push(&mut self, format: RunFormat, content: &str) {
        match &mut self.pending {
            Some((current, text)) if *current == format => text.push_str(content),
            _ => {
                self.flush();
                self.pending = Some((format, content.to_string()));
            }
        }
    }

    fn push_raw(&mut self, html: &str) {
        self.flush();
        self.html.push_str(html);
    }

    fn flush(&mut self) {
        if let Some((format, text)) = self.pending.take() {
            self.html.push_str(&format.wrap(&text));
        }
    }

    fn finish(mut self) -> String {
        self.flush();
        self.html
    }
}

struct HtmlWriter<'a> {
    links: &'a HashMap<String, String>,
    html: String,
    messages: Vec<String>,
}

impl HtmlWriter<'_> {
    fn block_children(&mut self, container: &Element) {
        let mut in_list = false;

        for el in container.child_elements() {
            let is_list_item = el.name == "w:p" && numbered(el);
            if in_list && !is_list_item {
                self.html.push_str("</ul>");
                in_list = false;
            }

            match el.name.as_str() {
                "w:p" => {
                    let content = self.paragraph_content(el);
                    if content.is_empty() {
                        continue;
                    }
                    if is_list_item {
                        if !in_list {
                            self.html.push_str("<ul>");
                            in_list = true;
                        }
                        self.html.push_str(&format!("<li>{}</li>", content));
                    } else {
                        let tag = heading_level(el)
                            .map(|level| format!("h{}", level))
                            .unwrap_or_else(|| "p".to_string());
                        self.html.push_str(&format!("<{0}>{1}</{0}>", tag, content));
                    }
                }
                "w:tbl" => self.table(el),
                "w:sdt" => {
                    if let Some(content) = el.child_elements().find(|c| c.name == "w:sdtContent") {
                        self.block_children(content);
                    }
                }
                _ => {}
            }
        }

        if in_list {
            self.html.push_str("</ul>");
        }
    }

    fn table(&mut self, table: &Element) {
        self.html.push_str("<table>");
        for row in table.child_elements().filter(|el| el.name == "w:tr") {
            self.html.push_str("<tr>");
            for cell in row.child_elements().filter(|el| el.name == "w:tc") {
                self.html.push_str("<td>");
                self.block_children(cell);
                self.html.push_str("</td>");
            }
            self.html.push_str("</tr>");
        }
        self.html.push_str("</table>");
    }

    fn paragraph_content(&mut self, paragraph: &Element) -> String {
        let mut buffer = InlineBuffer::default();
        self.inline_children(paragraph, &mut buffer);
        buffer.finish()
    }

    fn inline_children(&mut self, parent: &Element, buffer: &mut InlineBuffer) {
        for el in parent.child_elements() {
            match el.name.as_str() {
                "w:r" => self.run(el, buffer),
                "w:hyperlink" => {
                    let mut inner = InlineBuffer::default();
                    self.inline_children(el, &mut inner);
                    let inner = inner.finish();
                    if inner.is_empty() {
                        continue;
                    }
                    match self.hyperlink_target(el) {
                        Some(href) => buffer.push_raw(&format!(
                            "<a href=\"{}\">{}</a>",
                            escape(href.as_str()),
                            inner
                        )),
                        None => buffer.push_raw(&inner),
                    }
                }
                "w:ins" | "w:smartTag" | "w:customXml" => self.inline_children(el, buffer),
                "w:sdt" => {
                    if let Some(content) = el.child_elements().find(|c| c.name == "w:sdtContent") {
                        self.inline_children(content, buffer);
                    }
                }
                _ => {}
            }
        }
    }

    fn hyperlink_target(&self, link: &Element) -> Option<String> {
        if let Some(target) = link.attr("r:id").and_then(|id| self.links.get(id)) {
            return Some(target.clone());
        }
        link.attr("w:anchor").map(|anchor| format!("#{}", anchor))
    }

    fn run(&mut self, run: &Element, buffer: &mut InlineBuffer) {
        let format = RunFormat::from_properties(run.child_elements().find(|el| el.name == "w:rPr"));
        let mut content = String::new();

        for el in run.child_elements() {
            match el.name.as_str() {
                "w:t" => content.push_str(&partial_escape(el.text_content().as_str())),
                "w:tab" => content.push('\t'),
                "w:br" | "w:cr" => {
                    if matches!(el.attr("w:type"), None | Some("textWrapping")) {
                        content.push_str("<br />");
                    }
                }
                "w:noBreakHyphen" => content.push('\u{2011}'),
                "w:drawing" | "w:pict" | "w:object" => self
                    .messages
                    .push("An embedded drawing or image was not converted".to_string()),
                _ => {}
            }
        }

        if !content.is_empty() {
            buffer.push(format, &content);
        }
    }
}

fn paragraph_properties(paragraph: &Element) -> Option<&Element> {
    paragraph.child_elements().find(|el| el.name == "w:pPr")
}

fn numbered(paragraph: &Element) -> bool {
    paragraph_properties(paragraph)
        .is_some_and(|ppr| ppr.child_elements().any(|el| el.name == "w:numPr"))
}

/// `Heading1`..`Heading6` (style ids vary in case and spacing).
fn heading_level(paragraph: &Element) -> Option<u8> {
    let style = paragraph_properties(paragraph)?
        .child_elements()
        .find(|el| el.name == "w:pStyle")?
        .attr("w:val")?
        .to_ascii_lowercase()
        .replace(' ', "");
    let level: u8 = style.strip_prefix("heading")?.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}
