//! ZIP container access shared by the office, ODF and EPUB converters.

use crate::error::{Error, Result};
use crate::model::ImageData;
use roxmltree::Node;
use std::io::{Cursor, Read};
use zip::result::ZipError;
use zip::ZipArchive;

/// Read-only view of a ZIP package held in memory.
pub(crate) struct Archive<'a> {
    zip: ZipArchive<Cursor<&'a [u8]>>,
}

impl<'a> Archive<'a> {
    /// Open a package.
    pub(crate) fn open(data: &'a [u8]) -> Result<Self> {
        Ok(Self {
            zip: ZipArchive::new(Cursor::new(data))?,
        })
    }

    /// Whether the package has an entry with this exact name.
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.zip.file_names().any(|n| n == name)
    }

    /// All entry names.
    pub(crate) fn names(&self) -> Vec<String> {
        self.zip.file_names().map(str::to_string).collect()
    }

    /// Read an entry. Returns `Ok(None)` if it does not exist.
    pub(crate) fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut file = match self.zip.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        Ok(Some(data))
    }

    /// Read an embedded raster image. Missing or unsupported images are
    /// logged and skipped.
    pub(crate) fn read_image(&mut self, name: &str) -> Option<ImageData> {
        match self.read_bytes(name) {
            Ok(Some(bytes)) => {
                let image = ImageData::sniff(bytes);
                if image.is_none() {
                    log::warn!("Skipping unsupported image {name}");
                }
                image
            }
            Ok(None) => {
                log::warn!("Image {name} missing from package");
                None
            }
            Err(e) => {
                log::warn!("Failed to read image {name}: {e}");
                None
            }
        }
    }

    /// Read an entry as UTF-8 text.
    pub(crate) fn read_string(&mut self, name: &str) -> Result<Option<String>> {
        Ok(self
            .read_bytes(name)?
            .map(|bytes| crate::input::decode_text(&bytes)))
    }

    /// Read an entry that must exist.
    pub(crate) fn require_string(&mut self, name: &str) -> Result<String> {
        self.read_string(name)?
            .ok_or_else(|| Error::InvalidDocument(format!("missing {name}")))
    }
}

/// Resolve `href` relative to the directory of the entry `base`.
///
/// Fragments are dropped, `%20` escapes decoded and `.`/`..` segments folded.
pub(crate) fn resolve_path(base: &str, href: &str) -> String {
    let href = href.split('#').next().unwrap_or_default();
    let href = percent_decode(href);
    if let Some(absolute) = href.strip_prefix('/') {
        return normalize(absolute.split('/').collect());
    }
    let mut segments: Vec<&str> = base
        .rsplit_once('/')
        .map(|(dir, _)| dir.split('/').collect())
        .unwrap_or_default();
    segments.extend(href.split('/'));
    normalize(segments)
}

fn normalize(segments: Vec<&str>) -> String {
    let mut out: Vec<&str> = Vec::new();
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => {
                out.pop();
            }
            s => out.push(s),
        }
    }
    out.join("/")
}

fn percent_decode(text: &str) -> String {
    if !text.contains('%') {
        return text.to_string();
    }
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(byte) = hex {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse an XML part, tolerating a DOCTYPE declaration.
pub(crate) fn parse_xml(text: &str) -> Result<roxmltree::Document<'_>> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    Ok(roxmltree::Document::parse_with_options(text, options)?)
}

/// Namespace-agnostic element and attribute lookup.
pub(crate) trait LocalName<'a>: Sized {
    fn has_tag_name_local(&self, name: &str) -> bool;
    fn local_attr(&self, name: &str) -> Option<&'a str>;
    fn child(&self, name: &str) -> Option<Self>;
}

impl<'a, 'input: 'a> LocalName<'a> for Node<'a, 'input> {
    fn has_tag_name_local(&self, name: &str) -> bool {
        self.is_element() && self.tag_name().name() == name
    }

    fn local_attr(&self, name: &str) -> Option<&'a str> {
        self.attributes()
            .find(|a| a.name() == name)
            .map(|a| a.value())
    }

    fn child(&self, name: &str) -> Option<Self> {
        self.children().find(|n| n.has_tag_name_local(name))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    /// Build an in-memory package from (name, content) pairs.
    pub(crate) fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_read_entries() {
        let data = build_zip(&[("a/b.xml", b"<x/>"), ("mimetype", b"application/epub+zip")]);
        let mut archive = Archive::open(&data).unwrap();
        assert!(archive.contains("a/b.xml"));
        assert_eq!(archive.names().len(), 2);
        assert_eq!(archive.read_string("mimetype").unwrap().as_deref(), Some("application/epub+zip"));
        assert_eq!(archive.read_bytes("missing").unwrap(), None);

        let err = archive.require_string("word/document.xml").unwrap_err();
        assert_eq!(err.to_string(), "Invalid document: missing word/document.xml");
    }

    #[test]
    fn test_open_rejects_garbage() {
        assert!(matches!(Archive::open(b"not a zip"), Err(Error::Archive(_))));
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("OEBPS/content.opf", "text/ch1.xhtml"), "OEBPS/text/ch1.xhtml");
        assert_eq!(resolve_path("OEBPS/text/ch1.xhtml", "../images/a%20b.png"), "OEBPS/images/a b.png");
        assert_eq!(resolve_path("content.opf", "ch1.xhtml#sec"), "ch1.xhtml");
        assert_eq!(resolve_path("word/document.xml", "/word/media/x.png"), "word/media/x.png");
        assert_eq!(resolve_path("word/document.xml", "media/./x.png"), "word/media/x.png");
    }

    #[test]
    fn test_parse_xml_with_doctype() {
        let doc = parse_xml("<?xml version=\"1.0\"?><!DOCTYPE html><html><p>x</p></html>").unwrap();
        assert_eq!(doc.root_element().tag_name().name(), "html");
    }
}
