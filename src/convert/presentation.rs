//! Presentation converter: PPTX, ODP and legacy PPT, one page per slide.

use super::archive::{parse_xml, Archive, LocalName};
use super::doc::{decode_ansi, decode_utf16le, extract_binary_text};
use super::docx::{read_core_properties, read_relationships};
use super::odt::{read_meta, OdfReader, OdfStyles};
use super::{ConvertOptions, DocumentConverter};
use crate::detect::{detect_format, detect_from_bytes, SourceFormat};
use crate::error::{Error, Result};
use crate::input::InputFile;
use crate::model::{Block, Content, Slide};
use roxmltree::Node;
use std::collections::HashMap;

/// Presentation converter.
#[derive(Debug, Clone, Default)]
pub struct PresentationConverter {
    _private: (),
}

impl PresentationConverter {
    /// Create a new presentation converter.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl DocumentConverter for PresentationConverter {
    fn name(&self) -> &str {
        "presentation"
    }

    fn formats(&self) -> &[SourceFormat] {
        &[SourceFormat::Pptx, SourceFormat::Odp, SourceFormat::Ppt]
    }

    fn extract(&self, file: &InputFile, options: &ConvertOptions) -> Result<Content> {
        let format = match detect_from_bytes(&file.data, Some(&file.name)) {
            Some(format) if self.supports(format) => format,
            _ => detect_format(file)?,
        };
        match format {
            SourceFormat::Pptx => extract_pptx(&file.data, options),
            SourceFormat::Odp => extract_odp(&file.data, options),
            SourceFormat::Ppt => extract_ppt(&file.data),
            other => Err(Error::UnsupportedFormat(other.name().to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// PPTX
// ---------------------------------------------------------------------------

fn extract_pptx(data: &[u8], options: &ConvertOptions) -> Result<Content> {
    let mut archive = Archive::open(data)?;
    let slide_parts = pptx_slide_order(&mut archive)?;
    if slide_parts.is_empty() {
        return Err(Error::InvalidDocument("missing ppt/slides".into()));
    }

    let mut slides = Vec::with_capacity(slide_parts.len());
    for (index, part) in slide_parts.iter().enumerate() {
        let xml = archive.require_string(part)?;
        let rels_part = match part.rsplit_once('/') {
            Some((dir, name)) => format!("{dir}/_rels/{name}.rels"),
            None => format!("_rels/{part}.rels"),
        };
        let relationships = match archive.read_string(&rels_part)? {
            Some(rels) => read_relationships(&rels, part)?,
            None => HashMap::new(),
        };
        let mut slide = Slide::new(index as u32 + 1);
        let doc = parse_xml(&xml)?;
        if let Some(tree) = doc.descendants().find(|n| n.has_tag_name_local("spTree")) {
            read_shape_tree(tree, &mut slide, &mut |rel_id| {
                if !options.embed_images {
                    return None;
                }
                let target = relationships.get(rel_id)?;
                archive.read_image(target)
            });
        }
        slides.push(slide);
    }

    let mut content = Content::from_slides(slides);
    if let Some(core) = archive.read_string("docProps/core.xml")? {
        read_core_properties(&core, &mut content)?;
    }
    Ok(content)
}

/// Slide parts in presentation order.
///
/// Uses the slide id list of `ppt/presentation.xml` when present and falls
/// back to the numeric order of `ppt/slides/slideN.xml`.
fn pptx_slide_order(archive: &mut Archive) -> Result<Vec<String>> {
    let presentation = archive.read_string("ppt/presentation.xml")?;
    let rels = archive.read_string("ppt/_rels/presentation.xml.rels")?;
    if let (Some(presentation), Some(rels)) = (presentation, rels) {
        let targets = read_relationships(&rels, "ppt/presentation.xml")?;
        let doc = parse_xml(&presentation)?;
        let ordered: Vec<String> = doc
            .descendants()
            .filter(|n| n.has_tag_name_local("sldId"))
            .filter_map(|n| {
                // The relationship id is the namespaced `r:id`, not the numeric `id`.
                n.attributes()
                    .find(|a| a.name() == "id" && a.namespace().is_some())
                    .map(|a| a.value())
            })
            .filter_map(|rel_id| targets.get(rel_id).cloned())
            .filter(|part| archive.contains(part))
            .collect();
        if !ordered.is_empty() {
            return Ok(ordered);
        }
    }

    let mut numbered: Vec<(u32, String)> = archive
        .names()
        .into_iter()
        .filter_map(|name| {
            let number = name
                .strip_prefix("ppt/slides/slide")?
                .strip_suffix(".xml")?
                .parse()
                .ok()?;
            Some((number, name))
        })
        .collect();
    numbered.sort();
    Ok(numbered.into_iter().map(|(_, name)| name).collect())
}

fn read_shape_tree(
    tree: Node,
    slide: &mut Slide,
    images: &mut dyn FnMut(&str) -> Option<crate::model::ImageData>,
) {
    for shape in tree.children().filter(Node::is_element) {
        match shape.tag_name().name() {
            "sp" => read_shape(shape, slide),
            "grpSp" => read_shape_tree(shape, slide, images),
            "graphicFrame" => {
                if let Some(table) = shape.descendants().find(|n| n.has_tag_name_local("tbl")) {
                    slide.body.push(Block::paragraph(table_text(table)));
                }
            }
            "pic" => {
                let blip = shape.descendants().find(|n| n.has_tag_name_local("blip"));
                if let Some(image) = blip.and_then(|b| b.local_attr("embed")).and_then(|id| images(id)) {
                    slide.body.push(Block::Image(image));
                }
            }
            _ => {}
        }
    }
}

fn read_shape(shape: Node, slide: &mut Slide) {
    let placeholder = shape
        .descendants()
        .find(|n| n.has_tag_name_local("ph"));
    let ph_type = placeholder.map(|ph| ph.local_attr("type").unwrap_or("body"));
    let Some(body) = shape.children().find(|n| n.has_tag_name_local("txBody")) else {
        return;
    };
    let paragraphs: Vec<(u8, String)> = body
        .children()
        .filter(|n| n.has_tag_name_local("p"))
        .map(|p| {
            let level = p
                .child("pPr")
                .and_then(|pr| pr.local_attr("lvl"))
                .and_then(|l| l.parse().ok())
                .unwrap_or(0);
            (level, drawing_paragraph_text(p))
        })
        .filter(|(_, text)| !text.trim().is_empty())
        .collect();

    match ph_type {
        Some("title" | "ctrTitle") if slide.title.is_none() => {
            let title = paragraphs
                .iter()
                .map(|(_, t)| t.trim())
                .collect::<Vec<_>>()
                .join(" ");
            slide.title = Some(title);
        }
        Some("body" | "obj") => {
            for (level, text) in paragraphs {
                slide.body.push(Block::bullet(level.min(5), text.trim()));
            }
        }
        // Slide numbers, dates and footers repeat on every slide.
        Some("sldNum" | "dt" | "ftr" | "hdr") => {}
        _ => {
            for (_, text) in paragraphs {
                slide.body.push(Block::paragraph(text.trim()));
            }
        }
    }
}

/// Text of a DrawingML `a:p`.
fn drawing_paragraph_text(p: Node) -> String {
    let mut out = String::new();
    for node in p.descendants().filter(Node::is_element) {
        match node.tag_name().name() {
            "t" => out.push_str(node.text().unwrap_or_default()),
            "br" => out.push('\n'),
            "tab" => out.push('\t'),
            _ => {}
        }
    }
    out
}

fn table_text(table: Node) -> String {
    table
        .children()
        .filter(|n| n.has_tag_name_local("tr"))
        .map(|row| {
            row.children()
                .filter(|n| n.has_tag_name_local("tc"))
                .map(|cell| {
                    cell.descendants()
                        .filter(|n| n.has_tag_name_local("p"))
                        .map(|p| drawing_paragraph_text(p).trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join("\t")
        })
        .filter(|row| !row.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// ODP
// ---------------------------------------------------------------------------

fn extract_odp(data: &[u8], options: &ConvertOptions) -> Result<Content> {
    let mut archive = Archive::open(data)?;
    let xml = archive.require_string("content.xml")?;
    let doc = parse_xml(&xml)?;
    let presentation = doc
        .descendants()
        .find(|n| n.has_tag_name_local("presentation"))
        .ok_or_else(|| Error::InvalidDocument("content.xml has no office:presentation body".into()))?;

    let mut reader = OdfReader {
        archive: &mut archive,
        styles: OdfStyles::parse(&doc),
        embed_images: options.embed_images,
        content: Content::new(),
    };
    let mut slides = Vec::new();
    for (index, page) in presentation
        .children()
        .filter(|n| n.has_tag_name_local("page"))
        .enumerate()
    {
        let mut slide = Slide::new(index as u32 + 1);
        for frame in page.children().filter(Node::is_element) {
            let class = frame.local_attr("class");
            if matches!(class, Some("page-number" | "footer" | "date-time" | "header")) {
                continue;
            }
            match frame.tag_name().name() {
                "frame" => {
                    reader.read_frame(frame);
                }
                "custom-shape" | "rect" | "ellipse" => {
                    reader.read_container(frame, &mut Vec::new());
                }
                _ => continue,
            }
            let blocks = std::mem::take(&mut reader.content).blocks;
            if matches!(class, Some("title")) && slide.title.is_none() {
                let title = blocks
                    .iter()
                    .filter_map(Block::text)
                    .collect::<Vec<_>>()
                    .join(" ");
                slide.title = Some(title);
            } else {
                slide.body.extend(blocks);
            }
        }
        slides.push(slide);
    }

    let mut content = Content::from_slides(slides);
    if let Some(meta) = archive.read_string("meta.xml")? {
        read_meta(&meta, &mut content)?;
    }
    Ok(content)
}

// ---------------------------------------------------------------------------
// PPT
// ---------------------------------------------------------------------------

const RT_SLIDE: u16 = 0x03EE;
const RT_NOTES: u16 = 0x03F0;
const RT_MAIN_MASTER: u16 = 0x03F8;
const RT_SLIDE_LIST_WITH_TEXT: u16 = 0x0FF0;
const RT_SLIDE_PERSIST_ATOM: u16 = 0x03F3;
const RT_TEXT_HEADER_ATOM: u16 = 0x0F9F;
const RT_TEXT_CHARS_ATOM: u16 = 0x0FA0;
const RT_TEXT_BYTES_ATOM: u16 = 0x0FA8;

/// Text types in a TextHeaderAtom that hold slide titles.
const TITLE_TEXT_TYPES: [u32; 2] = [0, 6];

fn extract_ppt(data: &[u8]) -> Result<Content> {
    let slides = ppt_slides(data);
    if !slides.is_empty() {
        return Ok(Content::from_slides(slides));
    }

    // No slide records found: fall back to all readable text on one page.
    let paragraphs = extract_binary_text(data);
    if paragraphs.is_empty() {
        return Err(Error::InvalidDocument("no readable text found".into()));
    }
    let mut slide = Slide::new(1);
    slide.body = paragraphs.into_iter().map(Block::paragraph).collect();
    Ok(Content::from_slides(vec![slide]))
}

/// Scan the record stream for slide text.
///
/// Records are found by their 8-byte headers (version/instance, type,
/// length). Containers are descended into. A slide starts at each slide
/// container and at each SlidePersistAtom of the slide list; text inside
/// masters and notes is dropped. Slides that end up empty are removed.
fn ppt_slides(data: &[u8]) -> Vec<Slide> {
    let mut slides: Vec<Slide> = Vec::new();
    let mut collecting = false;
    let mut list_instance = 0u16;
    let mut text_type: Option<u32> = None;
    let mut i = 0;

    while i + 8 <= data.len() {
        let ver_instance = u16::from_le_bytes([data[i], data[i + 1]]);
        let record_type = u16::from_le_bytes([data[i + 2], data[i + 3]]);
        let len = u32::from_le_bytes([data[i + 4], data[i + 5], data[i + 6], data[i + 7]]) as usize;
        let body_start = i + 8;
        let fits = len <= data.len() - body_start;
        let container = ver_instance & 0x000F == 0x000F && fits;
        let atom = ver_instance & 0x000F == 0 && fits;

        match record_type {
            RT_SLIDE if container => {
                slides.push(Slide::default());
                collecting = true;
                i = body_start;
                continue;
            }
            RT_NOTES | RT_MAIN_MASTER if container => {
                collecting = false;
                i = body_start;
                continue;
            }
            RT_SLIDE_LIST_WITH_TEXT if container => {
                list_instance = ver_instance >> 4;
                collecting = false;
                i = body_start;
                continue;
            }
            RT_SLIDE_PERSIST_ATOM if atom && (len == 20 || len == 24) => {
                collecting = list_instance == 0;
                if collecting {
                    slides.push(Slide::default());
                }
                text_type = None;
                i = body_start + len;
                continue;
            }
            RT_TEXT_HEADER_ATOM if atom && len == 4 => {
                let b = &data[body_start..body_start + 4];
                text_type = Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]));
                i = body_start + 4;
                continue;
            }
            RT_TEXT_CHARS_ATOM | RT_TEXT_BYTES_ATOM if atom && len > 0 => {
                let body = &data[body_start..body_start + len];
                if collecting {
                    let text = if record_type == RT_TEXT_CHARS_ATOM {
                        decode_utf16le(body)
                    } else {
                        decode_ansi(body)
                    };
                    let text = text.replace(['\r', '\u{b}'], "\n");
                    if let Some(slide) = slides.last_mut() {
                        push_ppt_text(slide, text_type, text.trim());
                    }
                }
                text_type = None;
                i = body_start + len;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    let mut slides: Vec<Slide> = slides.into_iter().filter(|s| !s.is_empty()).collect();
    for (index, slide) in slides.iter_mut().enumerate() {
        slide.number = index as u32 + 1;
    }
    slides
}

fn push_ppt_text(slide: &mut Slide, text_type: Option<u32>, text: &str) {
    if text.is_empty() || text.starts_with("Click to edit") || text == "*" {
        return;
    }
    let is_title = text_type.is_some_and(|t| TITLE_TEXT_TYPES.contains(&t));
    if is_title && slide.title.is_none() {
        slide.title = Some(text.replace('\n', " "));
        return;
    }
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        slide.body.push(Block::paragraph(line));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::archive::tests::build_zip;

    const PML: &str = r#"xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#;

    fn shape(placeholder: &str, paragraphs: &str) -> String {
        format!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="s"/><p:cNvSpPr/><p:nvPr>{placeholder}</p:nvPr></p:nvSpPr><p:txBody><a:bodyPr/>{paragraphs}</p:txBody></p:sp>"#
        )
    }

    fn slide(shapes: &[String]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:sld {PML}><p:cSld><p:spTree>{}</p:spTree></p:cSld></p:sld>"#,
            shapes.concat()
        )
    }

    fn extract(name: &str, data: Vec<u8>) -> Content {
        let file = InputFile::from_bytes(name, data);
        PresentationConverter::new()
            .extract(&file, &ConvertOptions::default())
            .unwrap()
    }

    #[test]
    fn test_pptx_slides_in_numeric_order() {
        let first = slide(&[
            shape(r#"<p:ph type="title"/>"#, "<a:p><a:r><a:t>Hello</a:t></a:r></a:p>"),
            shape(
                r#"<p:ph idx="1"/>"#,
                r#"<a:p><a:r><a:t>Point</a:t></a:r></a:p><a:p><a:pPr lvl="1"/><a:r><a:t>Sub</a:t></a:r></a:p>"#,
            ),
            shape("", "<a:p><a:r><a:t>Free</a:t></a:r><a:r><a:t> text</a:t></a:r></a:p>"),
            shape(r#"<p:ph type="sldNum"/>"#, "<a:p><a:r><a:t>1</a:t></a:r></a:p>"),
        ]);
        let second = slide(&[shape("", "<a:p><a:r><a:t>Second</a:t></a:r></a:p>")]);
        let content = extract(
            "deck.pptx",
            build_zip(&[
                ("[Content_Types].xml", b"<Types/>"),
                ("ppt/slides/slide10.xml", second.as_bytes()),
                ("ppt/slides/slide2.xml", first.as_bytes()),
            ]),
        );
        assert_eq!(
            content.blocks,
            vec![
                Block::heading(1, "Hello"),
                Block::bullet(0, "Point"),
                Block::bullet(1, "Sub"),
                Block::paragraph("Free text"),
                Block::PageBreak,
                Block::heading(1, "Slide 2"),
                Block::paragraph("Second"),
            ]
        );
    }

    #[test]
    fn test_pptx_uses_presentation_order() {
        let a = slide(&[shape("", "<a:p><a:r><a:t>A</a:t></a:r></a:p>")]);
        let b = slide(&[shape("", "<a:p><a:r><a:t>B</a:t></a:r></a:p>")]);
        let presentation = format!(
            r#"<p:presentation {PML}><p:sldIdLst><p:sldId id="256" r:id="rId3"/><p:sldId id="257" r:id="rId2"/></p:sldIdLst></p:presentation>"#
        );
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId2" Type="slide" Target="slides/slide1.xml"/>
            <Relationship Id="rId3" Type="slide" Target="slides/slide2.xml"/>
        </Relationships>"#;
        let content = extract(
            "deck.pptx",
            build_zip(&[
                ("ppt/presentation.xml", presentation.as_bytes()),
                ("ppt/_rels/presentation.xml.rels", rels.as_bytes()),
                ("ppt/slides/slide1.xml", a.as_bytes()),
                ("ppt/slides/slide2.xml", b.as_bytes()),
            ]),
        );
        let texts: Vec<_> = content.blocks.iter().filter_map(Block::text).collect();
        assert_eq!(texts, vec!["Slide 1", "B", "Slide 2", "A"]);
    }

    #[test]
    fn test_pptx_without_slides_fails() {
        let file = InputFile::from_bytes("empty.pptx", build_zip(&[("ppt/presentation.xml", b"<p/>")]));
        assert!(PresentationConverter::new()
            .extract(&file, &ConvertOptions::default())
            .is_err());
    }

    #[test]
    fn test_odp_title_frames() {
        let content_xml = r#"<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:draw="urn:oasis:names:tc:opendocument:xmlns:drawing:1.0" xmlns:presentation="urn:oasis:names:tc:opendocument:xmlns:presentation:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0">
            <office:body><office:presentation>
              <draw:page draw:name="p1">
                <draw:frame presentation:class="title"><draw:text-box><text:p>Roadmap</text:p></draw:text-box></draw:frame>
                <draw:frame presentation:class="outline"><draw:text-box><text:list><text:list-item><text:p>Ship it</text:p></text:list-item></text:list></draw:text-box></draw:frame>
              </draw:page>
              <draw:page draw:name="p2">
                <draw:frame><draw:text-box><text:p>Thanks</text:p></draw:text-box></draw:frame>
              </draw:page>
            </office:presentation></office:body></office:document-content>"#;
        let content = extract(
            "talk.odp",
            build_zip(&[
                ("mimetype", b"application/vnd.oasis.opendocument.presentation"),
                ("content.xml", content_xml.as_bytes()),
            ]),
        );
        assert_eq!(
            content.blocks,
            vec![
                Block::heading(1, "Roadmap"),
                Block::bullet(0, "Ship it"),
                Block::PageBreak,
                Block::heading(1, "Slide 2"),
                Block::paragraph("Thanks"),
            ]
        );
    }

    fn record(ver_instance: u16, record_type: u16, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend(ver_instance.to_le_bytes());
        out.extend(record_type.to_le_bytes());
        out.extend((body.len() as u32).to_le_bytes());
        out.extend(body);
        out
    }

    fn utf16(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    #[test]
    fn test_ppt_slide_list_text() {
        let mut list = Vec::new();
        list.extend(record(0, RT_SLIDE_PERSIST_ATOM, &[0; 20]));
        list.extend(record(0, RT_TEXT_HEADER_ATOM, &0u32.to_le_bytes()));
        list.extend(record(0, RT_TEXT_CHARS_ATOM, &utf16("Title one")));
        list.extend(record(0, RT_TEXT_HEADER_ATOM, &1u32.to_le_bytes()));
        list.extend(record(0, RT_TEXT_BYTES_ATOM, b"Body line\rSecond"));
        list.extend(record(0, RT_SLIDE_PERSIST_ATOM, &[0; 20]));
        list.extend(record(0, RT_TEXT_HEADER_ATOM, &0u32.to_le_bytes()));
        list.extend(record(0, RT_TEXT_CHARS_ATOM, &utf16("Two")));
        let mut data = vec![0u8; 16];
        data.extend(record(0x000F, RT_SLIDE_LIST_WITH_TEXT, &list));

        let content = extract("deck.ppt", data);
        assert_eq!(
            content.blocks,
            vec![
                Block::heading(1, "Title one"),
                Block::paragraph("Body line"),
                Block::paragraph("Second"),
                Block::PageBreak,
                Block::heading(1, "Two"),
            ]
        );
    }

    #[test]
    fn test_ppt_master_text_ignored() {
        let mut master = Vec::new();
        master.extend(record(0, RT_TEXT_HEADER_ATOM, &0u32.to_le_bytes()));
        master.extend(record(0, RT_TEXT_CHARS_ATOM, &utf16("Master only")));
        let mut slide_body = Vec::new();
        slide_body.extend(record(0, RT_TEXT_HEADER_ATOM, &1u32.to_le_bytes()));
        slide_body.extend(record(0, RT_TEXT_CHARS_ATOM, &utf16("Real text")));

        let mut data = record(0x000F, RT_MAIN_MASTER, &master);
        data.extend(record(0x000F, RT_SLIDE, &slide_body));

        let slides = ppt_slides(&data);
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].number, 1);
        assert_eq!(slides[0].body, vec![Block::paragraph("Real text")]);
    }
}
