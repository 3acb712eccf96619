//! ODT converter (OpenDocument text).

use super::archive::{parse_xml, Archive, LocalName};
use super::{ConvertOptions, DocumentConverter};
use crate::detect::SourceFormat;
use crate::error::{Error, Result};
use crate::input::InputFile;
use crate::model::{Block, Content};
use roxmltree::{Document, Node};
use std::collections::HashSet;

/// ODT converter.
#[derive(Debug, Clone, Default)]
pub struct OdtConverter {
    _private: (),
}

impl OdtConverter {
    /// Create a new ODT converter.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl DocumentConverter for OdtConverter {
    fn name(&self) -> &str {
        "odt"
    }

    fn formats(&self) -> &[SourceFormat] {
        &[SourceFormat::Odt]
    }

    fn extract(&self, file: &InputFile, options: &ConvertOptions) -> Result<Content> {
        let mut archive = Archive::open(&file.data)?;
        let xml = archive.require_string("content.xml")?;
        let doc = parse_xml(&xml)?;
        let text = doc
            .descendants()
            .find(|n| {
                n.has_tag_name_local("text")
                    && n.parent_element().is_some_and(|p| p.has_tag_name_local("body"))
            })
            .ok_or_else(|| Error::InvalidDocument("content.xml has no office:text body".into()))?;

        let mut reader = OdfReader {
            archive: &mut archive,
            styles: OdfStyles::parse(&doc),
            embed_images: options.embed_images,
            content: Content::new(),
        };
        reader.read_container(text, &mut Vec::new());
        let mut content = reader.content;

        if let Some(meta) = archive.read_string("meta.xml")? {
            read_meta(&meta, &mut content)?;
        }
        Ok(content)
    }
}

/// Automatic style facts needed for block mapping.
#[derive(Debug, Default)]
pub(crate) struct OdfStyles {
    /// Paragraph styles that start a new page.
    page_break_before: HashSet<String>,
    /// List styles whose first level is numbered.
    numbered_lists: HashSet<String>,
}

impl OdfStyles {
    pub(crate) fn parse(doc: &Document) -> Self {
        let mut styles = OdfStyles::default();
        for node in doc.descendants().filter(|n| n.is_element()) {
            match node.tag_name().name() {
                "style" => {
                    let breaks = node
                        .children()
                        .filter(|c| c.has_tag_name_local("paragraph-properties"))
                        .any(|c| c.local_attr("break-before") == Some("page"));
                    if let (true, Some(name)) = (breaks, node.local_attr("name")) {
                        styles.page_break_before.insert(name.to_string());
                    }
                }
                "list-style" => {
                    let numbered = node
                        .children()
                        .find(|c| c.is_element() && c.local_attr("level") == Some("1"))
                        .is_some_and(|c| c.has_tag_name_local("list-level-style-number"));
                    if let (true, Some(name)) = (numbered, node.local_attr("name")) {
                        styles.numbered_lists.insert(name.to_string());
                    }
                }
                _ => {}
            }
        }
        styles
    }
}

/// One open `text:list`: whether it is numbered and its running counter.
pub(crate) struct ListFrame {
    numbered: bool,
    counter: u32,
}

pub(crate) struct OdfReader<'r, 'a> {
    pub(crate) archive: &'r mut Archive<'a>,
    pub(crate) styles: OdfStyles,
    pub(crate) embed_images: bool,
    pub(crate) content: Content,
}

impl OdfReader<'_, '_> {
    pub(crate) fn read_container(&mut self, node: Node, lists: &mut Vec<ListFrame>) {
        for child in node.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "h" => {
                    self.break_before(child);
                    let level = child
                        .local_attr("outline-level")
                        .and_then(|l| l.parse().ok())
                        .unwrap_or(1);
                    let text = self.inline_text(child);
                    self.content.push(Block::heading(level, text.trim()));
                }
                "p" => {
                    self.break_before(child);
                    let text = self.inline_text(child);
                    self.content.push(Block::paragraph(text.trim()));
                }
                "list" => {
                    let numbered = match (lists.first(), child.local_attr("style-name")) {
                        (Some(outer), _) => outer.numbered,
                        (None, Some(style)) => self.styles.numbered_lists.contains(style),
                        (None, None) => false,
                    };
                    lists.push(ListFrame {
                        numbered,
                        counter: 0,
                    });
                    for item in child.children().filter(|n| n.has_tag_name_local("list-item")) {
                        self.read_list_item(item, lists);
                    }
                    lists.pop();
                }
                "table" => self.read_table(child),
                "section" | "index-body" | "table-of-content" => {
                    self.read_container(child, lists)
                }
                "frame" => self.read_frame(child),
                _ => {}
            }
        }
    }

    fn read_list_item(&mut self, item: Node, lists: &mut Vec<ListFrame>) {
        let depth = lists.len().saturating_sub(1).min(5) as u8;
        let mut first = true;
        for child in item.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "p" | "h" if first => {
                    first = false;
                    let text = self.inline_text(child);
                    let Some(frame) = lists.last_mut() else { continue };
                    let ordered = frame.numbered.then(|| {
                        frame.counter += 1;
                        frame.counter
                    });
                    self.content.push(Block::ListItem {
                        depth,
                        ordered,
                        text: text.trim().to_string(),
                    });
                }
                "p" | "h" => {
                    let text = self.inline_text(child);
                    self.content.push(Block::paragraph(text.trim()));
                }
                "list" => self.read_nested_list(child, lists),
                _ => {}
            }
        }
    }

    fn read_nested_list(&mut self, list: Node, lists: &mut Vec<ListFrame>) {
        let numbered = lists.first().is_some_and(|outer| outer.numbered);
        lists.push(ListFrame {
            numbered,
            counter: 0,
        });
        for item in list.children().filter(|n| n.has_tag_name_local("list-item")) {
            self.read_list_item(item, lists);
        }
        lists.pop();
    }

    fn read_table(&mut self, table: Node) {
        let rows: Vec<String> = table
            .descendants()
            .filter(|n| n.has_tag_name_local("table-row"))
            .map(|row| {
                row.children()
                    .filter(|n| n.has_tag_name_local("table-cell"))
                    .map(|cell| {
                        cell.children()
                            .filter(|n| n.has_tag_name_local("p"))
                            .map(|p| self.inline_text(p).trim().to_string())
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect::<Vec<_>>()
                    .join("\t")
            })
            .filter(|row| !row.trim().is_empty())
            .collect();
        self.content.push(Block::paragraph(rows.join("\n")));
    }

    pub(crate) fn read_frame(&mut self, frame: Node) {
        for child in frame.children().filter(Node::is_element) {
            match child.tag_name().name() {
                "image" if self.embed_images => {
                    if let Some(href) = child.local_attr("href") {
                        if let Some(image) = self.archive.read_image(href.trim_start_matches("./")) {
                            self.content.push(Block::Image(image));
                        }
                    }
                }
                "text-box" => self.read_container(child, &mut Vec::new()),
                _ => {}
            }
        }
    }

    fn break_before(&mut self, node: Node) {
        if node
            .local_attr("style-name")
            .is_some_and(|s| self.styles.page_break_before.contains(s))
        {
            self.content.page_break();
        }
    }

    /// Text of a paragraph, expanding ODF whitespace elements. Frames anchored
    /// inside the paragraph are emitted as blocks.
    pub(crate) fn inline_text(&mut self, node: Node) -> String {
        let mut out = String::new();
        self.collect_inline(node, &mut out);
        out
    }

    fn collect_inline(&mut self, node: Node, out: &mut String) {
        for child in node.children() {
            if child.is_text() {
                // Runs of whitespace in ODF text collapse to one space.
                let text = child.text().unwrap_or_default();
                let mut last_space = out.ends_with(' ');
                for c in text.chars() {
                    if c.is_whitespace() {
                        if !last_space {
                            out.push(' ');
                        }
                        last_space = true;
                    } else {
                        out.push(c);
                        last_space = false;
                    }
                }
                continue;
            }
            if !child.is_element() {
                continue;
            }
            match child.tag_name().name() {
                "s" => {
                    let count = child
                        .local_attr("c")
                        .and_then(|c| c.parse().ok())
                        .unwrap_or(1usize);
                    out.push_str(&" ".repeat(count));
                }
                "tab" => out.push('\t'),
                "line-break" => out.push('\n'),
                "frame" => self.read_frame(child),
                // Footnote bodies and annotations are not inline text.
                "note" | "annotation" | "bookmark" | "bookmark-start" | "bookmark-end" => {}
                _ => self.collect_inline(child, out),
            }
        }
    }
}

/// Title and author from `meta.xml`.
pub(crate) fn read_meta(xml: &str, content: &mut Content) -> Result<()> {
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
        content.author = text_of("creator").or_else(|| text_of("initial-creator"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::archive::tests::build_zip;

    const NS: &str = r#"xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0" xmlns:fo="urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0""#;

    fn odt(body: &str, styles: &str) -> Vec<u8> {
        let content = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><office:document-content {NS}><office:automatic-styles>{styles}</office:automatic-styles><office:body><office:text>{body}</office:text></office:body></office:document-content>"#
        );
        let meta = r#"<office:document-meta xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:dc="http://purl.org/dc/elements/1.1/"><office:meta><dc:title>Minutes</dc:title><dc:creator>Lee</dc:creator></office:meta></office:document-meta>"#;
        build_zip(&[
            ("mimetype", b"application/vnd.oasis.opendocument.text"),
            ("content.xml", content.as_bytes()),
            ("meta.xml", meta.as_bytes()),
        ])
    }

    fn extract(data: Vec<u8>) -> Content {
        let file = InputFile::from_bytes("test.odt", data);
        OdtConverter::new()
            .extract(&file, &ConvertOptions::default())
            .unwrap()
    }

    #[test]
    fn test_headings_paragraphs_and_spaces() {
        let content = extract(odt(
            r#"<text:h text:outline-level="2">Agenda</text:h>
               <text:p>a<text:s text:c="2"/>b<text:tab/>c<text:line-break/>d <text:span>span</text:span></text:p>"#,
            "",
        ));
        assert_eq!(content.title.as_deref(), Some("Minutes"));
        assert_eq!(content.author.as_deref(), Some("Lee"));
        assert_eq!(
            content.blocks,
            vec![
                Block::heading(2, "Agenda"),
                Block::paragraph("a  b\tc\nd span"),
            ]
        );
    }

    #[test]
    fn test_lists_and_page_breaks() {
        let styles = r#"<style:style style:name="P2" style:family="paragraph"><style:paragraph-properties fo:break-before="page"/></style:style>
            <text:list-style style:name="L1"><text:list-level-style-number text:level="1"/></text:list-style>"#;
        let content = extract(odt(
            r#"<text:list text:style-name="L1">
                 <text:list-item><text:p>one</text:p></text:list-item>
                 <text:list-item><text:p>two</text:p>
                   <text:list><text:list-item><text:p>nested</text:p></text:list-item></text:list>
                 </text:list-item>
               </text:list>
               <text:list><text:list-item><text:p>dot</text:p></text:list-item></text:list>
               <text:p text:style-name="P2">Next</text:p>"#,
            styles,
        ));
        assert_eq!(
            content.blocks,
            vec![
                Block::numbered(0, 1, "one"),
                Block::numbered(0, 2, "two"),
                Block::numbered(1, 1, "nested"),
                Block::bullet(0, "dot"),
                Block::PageBreak,
                Block::paragraph("Next"),
            ]
        );
    }

    #[test]
    fn test_table() {
        let content = extract(odt(
            r#"<table:table><table:table-row><table:table-cell><text:p>a</text:p></table:table-cell><table:table-cell><text:p>b</text:p></table:table-cell></table:table-row></table:table>"#,
            "",
        ));
        assert_eq!(content.blocks, vec![Block::paragraph("a\tb")]);
    }

    #[test]
    fn test_missing_content() {
        let file = InputFile::from_bytes("x.odt", build_zip(&[("mimetype", b"application/vnd.oasis.opendocument.text")]));
        assert!(OdtConverter::new()
            .extract(&file, &ConvertOptions::default())
            .is_err());
    }
}
