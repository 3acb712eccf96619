//! DOCX converter (WordprocessingML).

use super::archive::{parse_xml, resolve_path, Archive, LocalName};
use super::{ConvertOptions, DocumentConverter};
use crate::detect::SourceFormat;
use crate::error::Result;
use crate::input::InputFile;
use crate::model::{Block, Content};
use roxmltree::Node;
use std::collections::HashMap;

const DOCUMENT_PART: &str = "word/document.xml";

/// DOCX converter.
#[derive(Debug, Clone, Default)]
pub struct DocxConverter {
    _private: (),
}

impl DocxConverter {
    /// Create a new DOCX converter.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl DocumentConverter for DocxConverter {
    fn name(&self) -> &str {
        "docx"
    }

    fn formats(&self) -> &[SourceFormat] {
        &[SourceFormat::Docx]
    }

    fn extract(&self, file: &InputFile, options: &ConvertOptions) -> Result<Content> {
        let mut archive = Archive::open(&file.data)?;
        let document = archive.require_string(DOCUMENT_PART)?;
        let numbering = match archive.read_string("word/numbering.xml")? {
            Some(xml) => Numbering::parse(&xml)?,
            None => Numbering::default(),
        };
        let relationships = match archive.read_string("word/_rels/document.xml.rels")? {
            Some(xml) => read_relationships(&xml, DOCUMENT_PART)?,
            None => HashMap::new(),
        };

        let mut reader = BodyReader {
            archive: &mut archive,
            relationships,
            numbering,
            counters: HashMap::new(),
            embed_images: options.embed_images,
            content: Content::new(),
        };
        let doc = parse_xml(&document)?;
        if let Some(body) = doc.descendants().find(|n| n.has_tag_name_local("body")) {
            reader.read_container(body);
        }
        let mut content = reader.content;

        if let Some(core) = archive.read_string("docProps/core.xml")? {
            read_core_properties(&core, &mut content)?;
        }
        log::debug!("DOCX: {} blocks, {} images", content.blocks.len(), content.image_count());
        Ok(content)
    }
}

/// Paragraph-level state while walking `w:body`.
struct BodyReader<'r, 'a> {
    archive: &'r mut Archive<'a>,
    relationships: HashMap<String, String>,
    numbering: Numbering,
    counters: HashMap<(String, u8), u32>,
    embed_images: bool,
    content: Content,
}

impl BodyReader<'_, '_> {
    fn read_container(&mut self, node: Node) {
        for child in node.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "p" => self.read_paragraph(child),
                "tbl" => self.read_table(child),
                "sdt" => {
                    if let Some(inner) = child.child("sdtContent") {
                        self.read_container(inner);
                    }
                }
                _ => {}
            }
        }
    }

    fn read_paragraph(&mut self, p: Node) {
        let props = p.child("pPr");
        if props.and_then(|pr| pr.child("pageBreakBefore")).is_some() {
            self.content.page_break();
        }

        let mut runs = Runs::default();
        collect_runs(p, &mut runs);

        let text = runs.text.trim_end().to_string();
        let style = props
            .and_then(|pr| pr.child("pStyle"))
            .and_then(|s| s.local_attr("val"))
            .unwrap_or_default();

        if !text.trim().is_empty() {
            let block = if let Some(level) = heading_level(style) {
                Block::heading(level, text.trim())
            } else if let Some((num_id, level)) = props.and_then(list_info) {
                self.list_item(num_id, level, text.trim())
            } else if style.to_ascii_lowercase().starts_with("quote")
                || style.eq_ignore_ascii_case("IntenseQuote")
            {
                Block::quote(text.trim())
            } else {
                Block::paragraph(text)
            };
            self.content.push(block);
        }

        for rel_id in &runs.images {
            self.push_image(rel_id);
        }
        for _ in 0..runs.page_breaks {
            self.content.page_break();
        }
    }

    fn list_item(&mut self, num_id: String, level: u8, text: &str) -> Block {
        let depth = level.min(5);
        if !self.numbering.is_ordered(&num_id, level) {
            return Block::bullet(depth, text);
        }
        // Restart deeper levels when a shallower item appears.
        self.counters
            .retain(|(id, lvl), _| id != &num_id || *lvl <= level);
        let counter = self.counters.entry((num_id, level)).or_insert(0);
        *counter += 1;
        Block::numbered(depth, *counter, text)
    }

    fn read_table(&mut self, table: Node) {
        let mut rows = Vec::new();
        for row in table.children().filter(|n| n.has_tag_name_local("tr")) {
            let cells: Vec<String> = row
                .children()
                .filter(|n| n.has_tag_name_local("tc"))
                .map(|cell| {
                    cell.children()
                        .filter(|n| n.has_tag_name_local("p"))
                        .map(|p| {
                            let mut runs = Runs::default();
                            collect_runs(p, &mut runs);
                            runs.text.trim().to_string()
                        })
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect();
            if cells.iter().any(|c| !c.is_empty()) {
                rows.push(cells.join("\t"));
            }
        }
        self.content.push(Block::paragraph(rows.join("\n")));
    }

    fn push_image(&mut self, rel_id: &str) {
        if !self.embed_images {
            return;
        }
        let Some(target) = self.relationships.get(rel_id) else {
            log::warn!("DOCX image relationship {rel_id} not found");
            return;
        };
        if let Some(image) = self.archive.read_image(target) {
            self.content.push(Block::Image(image));
        }
    }
}

#[derive(Default)]
struct Runs {
    text: String,
    images: Vec<String>,
    page_breaks: usize,
}

fn collect_runs(node: Node, runs: &mut Runs) {
    for child in node.children().filter(Node::is_element) {
        match child.tag_name().name() {
            "t" => runs.text.push_str(child.text().unwrap_or_default()),
            "tab" | "ptab" => runs.text.push('\t'),
            "cr" => runs.text.push('\n'),
            "noBreakHyphen" => runs.text.push('-'),
            "br" => {
                if child.local_attr("type") == Some("page") {
                    runs.page_breaks += 1;
                } else {
                    runs.text.push('\n');
                }
            }
            "blip" => {
                if let Some(id) = child.local_attr("embed") {
                    runs.images.push(id.to_string());
                }
            }
            "imagedata" => {
                if let Some(id) = child.local_attr("id") {
                    runs.images.push(id.to_string());
                }
            }
            // Deleted revisions, field codes and paragraph properties carry no body text.
            "del" | "instrText" | "pPr" | "rPr" => {}
            _ => collect_runs(child, runs),
        }
    }
}

fn heading_level(style: &str) -> Option<u8> {
    let lower = style.to_ascii_lowercase().replace(' ', "");
    match lower.as_str() {
        "title" => Some(1),
        "subtitle" => Some(2),
        _ => lower
            .strip_prefix("heading")
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=6).contains(n)),
    }
}

fn list_info(props: Node) -> Option<(String, u8)> {
    let num = props.child("numPr")?;
    let num_id = num.child("numId")?.local_attr("val")?.to_string();
    if num_id == "0" {
        return None;
    }
    let level = num
        .child("ilvl")
        .and_then(|l| l.local_attr("val"))
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    Some((num_id, level))
}

/// Numbering definitions from `word/numbering.xml`.
#[derive(Debug, Default)]
struct Numbering {
    /// numId -> abstractNumId
    instances: HashMap<String, String>,
    /// (abstractNumId, level) -> numFmt
    formats: HashMap<(String, u8), String>,
}

impl Numbering {
    fn parse(xml: &str) -> Result<Self> {
        let doc = parse_xml(xml)?;
        let mut numbering = Numbering::default();
        for node in doc.root_element().children().filter(Node::is_element) {
            match node.tag_name().name() {
                "abstractNum" => {
                    let Some(id) = node.local_attr("abstractNumId") else { continue };
                    for lvl in node.children().filter(|n| n.has_tag_name_local("lvl")) {
                        let level = lvl.local_attr("ilvl").and_then(|v| v.parse().ok());
                        let format = lvl.child("numFmt").and_then(|f| f.local_attr("val"));
                        if let (Some(level), Some(format)) = (level, format) {
                            numbering
                                .formats
                                .insert((id.to_string(), level), format.to_string());
                        }
                    }
                }
                "num" => {
                    let id = node.local_attr("numId");
                    let abstract_id = node.child("abstractNumId").and_then(|a| a.local_attr("val"));
                    if let (Some(id), Some(abstract_id)) = (id, abstract_id) {
                        numbering
                            .instances
                            .insert(id.to_string(), abstract_id.to_string());
                    }
                }
                _ => {}
            }
        }
        Ok(numbering)
    }

    fn is_ordered(&self, num_id: &str, level: u8) -> bool {
        self.instances
            .get(num_id)
            .and_then(|abstract_id| self.formats.get(&(abstract_id.clone(), level)))
            .is_some_and(|format| format != "bullet" && format != "none")
    }
}

/// Map relationship ids to package paths.
pub(crate) fn read_relationships(xml: &str, source_part: &str) -> Result<HashMap<String, String>> {
    let doc = parse_xml(xml)?;
    Ok(doc
        .descendants()
        .filter(|n| n.has_tag_name_local("Relationship"))
        .filter(|n| n.local_attr("TargetMode") != Some("External"))
        .filter_map(|n| {
            let id = n.local_attr("Id")?;
            let target = n.local_attr("Target")?;
            Some((id.to_string(), resolve_path(source_part, target)))
        })
        .collect())
}

/// Title and author from `docProps/core.xml`.
pub(crate) fn read_core_properties(xml: &str, content: &mut Content) -> Result<()> {
    let doc = parse_xml(xml)?;
    let text_of = |name: &str| {
        doc.descendants()
            .find(|n| n.has_tag_name_local(name))
            .and_then(|n| n.text())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    };
    if content.title.is_none() {
        content.title = text_of("title");
    }
    if content.author.is_none() {
        content.author = text_of("creator");
    }
    Ok(())
}
