//! EPUB converter.

use super::archive::{parse_xml, resolve_path, Archive, LocalName};
use super::html::HtmlExtractor;
use super::{ConvertOptions, DocumentConverter};
use crate::detect::SourceFormat;
use crate::error::{Error, Result};
use crate::input::InputFile;
use crate::model::Content;
use std::collections::HashMap;

/// EPUB converter. Each spine item starts on a new page.
#[derive(Debug, Clone)]
pub struct EpubConverter {
    extractor: HtmlExtractor,
}

impl EpubConverter {
    /// Create a new EPUB converter.
    pub fn new() -> Self {
        Self {
            extractor: HtmlExtractor::new(),
        }
    }
}

impl Default for EpubConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter for EpubConverter {
    fn name(&self) -> &str {
        "epub"
    }

    fn formats(&self) -> &[SourceFormat] {
        &[SourceFormat::Epub]
    }

    fn extract(&self, file: &InputFile, options: &ConvertOptions) -> Result<Content> {
        let mut archive = Archive::open(&file.data)?;
        let opf_path = find_opf_path(&mut archive)?;
        let package = Package::parse(&archive.require_string(&opf_path)?, &opf_path)?;

        let mut content = Content::new();
        content.title = package.title.clone();
        content.author = package.creator.clone();

        for chapter_path in &package.spine {
            let Some(html) = archive.read_string(chapter_path)? else {
                log::warn!("EPUB spine item {chapter_path} missing from package");
                continue;
            };
            let chapter = self.extractor.extract(&html, &mut |src, alt| {
                if !options.embed_images {
                    return None;
                }
                let image = archive.read_image(&resolve_path(chapter_path, src))?;
                Some(match alt {
                    Some(alt) => image.with_alt(alt),
                    None => image,
                })
            });
            if content.title.is_none() {
                content.title = chapter.title.clone();
            }
            content.page_break();
            content.extend(chapter);
        }
        log::debug!(
            "EPUB: {} spine items, {} blocks",
            package.spine.len(),
            content.blocks.len()
        );
        Ok(content)
    }
}

/// Path of the OPF package document from `META-INF/container.xml`.
fn find_opf_path(archive: &mut Archive) -> Result<String> {
    let container = archive.require_string("META-INF/container.xml")?;
    let doc = parse_xml(&container)?;
    doc.descendants()
        .filter(|n| n.has_tag_name_local("rootfile"))
        .find_map(|n| n.local_attr("full-path"))
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidDocument("container.xml has no rootfile".into()))
}

/// The parts of an OPF package document needed for conversion.
#[derive(Debug, Default)]
struct Package {
    title: Option<String>,
    creator: Option<String>,
    /// Spine items as package paths, in reading order.
    spine: Vec<String>,
}

impl Package {
    fn parse(xml: &str, opf_path: &str) -> Result<Self> {
        let doc = parse_xml(xml)?;
        let text_of = |name: &str| {
            doc.descendants()
                .find(|n| n.has_tag_name_local(name))
                .and_then(|n| n.text())
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
        };

        let manifest: HashMap<&str, &str> = doc
            .descendants()
            .filter(|n| n.has_tag_name_local("item"))
            .filter_map(|n| Some((n.local_attr("id")?, n.local_attr("href")?)))
            .collect();

        let spine: Vec<String> = doc
            .descendants()
            .filter(|n| n.has_tag_name_local("itemref"))
            .filter(|n| n.local_attr("linear") != Some("no"))
            .filter_map(|n| manifest.get(n.local_attr("idref")?))
            .map(|href| resolve_path(opf_path, href))
            .collect();
        if spine.is_empty() {
            return Err(Error::InvalidDocument("package has an empty spine".into()));
        }

        Ok(Self {
            title: text_of("title"),
            creator: text_of("creator"),
            spine,
        })
    }
}
