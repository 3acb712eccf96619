//! Source format detection.
//!
//! Formats are identified from the MIME type first, then the file extension,
//! and finally by sniffing magic bytes.

use crate::error::{Error, Result};
use crate::input::InputFile;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};

/// A document format that can be converted to PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Webp,
    Tiff,
    Text,
    Markdown,
    Html,
    Rtf,
    Docx,
    Doc,
    Odt,
    Pptx,
    Ppt,
    Odp,
    Epub,
}

/// Broad grouping of source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatCategory {
    Image,
    Text,
    Document,
    Presentation,
    Ebook,
}

impl SourceFormat {
    /// Every supported source format.
    pub const ALL: [SourceFormat; 17] = [
        SourceFormat::Jpeg,
        SourceFormat::Png,
        SourceFormat::Gif,
        SourceFormat::Bmp,
        SourceFormat::Webp,
        SourceFormat::Tiff,
        SourceFormat::Text,
        SourceFormat::Markdown,
        SourceFormat::Html,
        SourceFormat::Rtf,
        SourceFormat::Docx,
        SourceFormat::Doc,
        SourceFormat::Odt,
        SourceFormat::Pptx,
        SourceFormat::Ppt,
        SourceFormat::Odp,
        SourceFormat::Epub,
    ];

    /// Short display name (e.g., "DOCX").
    pub fn name(&self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "JPEG",
            SourceFormat::Png => "PNG",
            SourceFormat::Gif => "GIF",
            SourceFormat::Bmp => "BMP",
            SourceFormat::Webp => "WebP",
            SourceFormat::Tiff => "TIFF",
            SourceFormat::Text => "text",
            SourceFormat::Markdown => "Markdown",
            SourceFormat::Html => "HTML",
            SourceFormat::Rtf => "RTF",
            SourceFormat::Docx => "DOCX",
            SourceFormat::Doc => "DOC",
            SourceFormat::Odt => "ODT",
            SourceFormat::Pptx => "PPTX",
            SourceFormat::Ppt => "PPT",
            SourceFormat::Odp => "ODP",
            SourceFormat::Epub => "EPUB",
        }
    }

    /// File extensions, lowercase without the leading dot. The first is canonical.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            SourceFormat::Jpeg => &["jpg", "jpeg", "jpe", "jfif"],
            SourceFormat::Png => &["png"],
            SourceFormat::Gif => &["gif"],
            SourceFormat::Bmp => &["bmp", "dib"],
            SourceFormat::Webp => &["webp"],
            SourceFormat::Tiff => &["tif", "tiff"],
            SourceFormat::Text => &["txt", "text", "log", "csv", "tsv", "ini", "cfg", "conf"],
            SourceFormat::Markdown => &["md", "markdown", "mdown", "mkd"],
            SourceFormat::Html => &["html", "htm", "xhtml"],
            SourceFormat::Rtf => &["rtf"],
            SourceFormat::Docx => &["docx"],
            SourceFormat::Doc => &["doc"],
            SourceFormat::Odt => &["odt"],
            SourceFormat::Pptx => &["pptx"],
            SourceFormat::Ppt => &["ppt"],
            SourceFormat::Odp => &["odp"],
            SourceFormat::Epub => &["epub"],
        }
    }

    /// MIME types that identify this format.
    pub fn mime_types(&self) -> &'static [&'static str] {
        match self {
            SourceFormat::Jpeg => &["image/jpeg", "image/jpg", "image/pjpeg"],
            SourceFormat::Png => &["image/png"],
            SourceFormat::Gif => &["image/gif"],
            SourceFormat::Bmp => &["image/bmp", "image/x-ms-bmp"],
            SourceFormat::Webp => &["image/webp"],
            SourceFormat::Tiff => &["image/tiff"],
            SourceFormat::Text => &["text/plain", "text/csv", "text/tab-separated-values"],
            SourceFormat::Markdown => &["text/markdown", "text/x-markdown"],
            SourceFormat::Html => &["text/html", "application/xhtml+xml"],
            SourceFormat::Rtf => &["application/rtf", "text/rtf"],
            SourceFormat::Docx => {
                &["application/vnd.openxmlformats-officedocument.wordprocessingml.document"]
            }
            SourceFormat::Doc => &["application/msword"],
            SourceFormat::Odt => &["application/vnd.oasis.opendocument.text"],
            SourceFormat::Pptx => {
                &["application/vnd.openxmlformats-officedocument.presentationml.presentation"]
            }
            SourceFormat::Ppt => &["application/vnd.ms-powerpoint"],
            SourceFormat::Odp => &["application/vnd.oasis.opendocument.presentation"],
            SourceFormat::Epub => &["application/epub+zip"],
        }
    }

    /// Canonical MIME type.
    pub fn mime_type(&self) -> &'static str {
        self.mime_types()[0]
    }

    /// Broad category of this format.
    pub fn category(&self) -> FormatCategory {
        match self {
            SourceFormat::Jpeg
            | SourceFormat::Png
            | SourceFormat::Gif
            | SourceFormat::Bmp
            | SourceFormat::Webp
            | SourceFormat::Tiff => FormatCategory::Image,
            SourceFormat::Text | SourceFormat::Markdown | SourceFormat::Html | SourceFormat::Rtf => {
                FormatCategory::Text
            }
            SourceFormat::Docx | SourceFormat::Doc | SourceFormat::Odt => FormatCategory::Document,
            SourceFormat::Pptx | SourceFormat::Ppt | SourceFormat::Odp => {
                FormatCategory::Presentation
            }
            SourceFormat::Epub => FormatCategory::Ebook,
        }
    }

    /// Whether this format is a raster image.
    pub fn is_image(&self) -> bool {
        self.category() == FormatCategory::Image
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for SourceFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        SourceFormat::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(&lower) || f.extensions().contains(&lower.as_str()))
            .ok_or_else(|| Error::UnsupportedFormat(s.to_string()))
    }
}

/// Detect a format from a MIME type. Parameters after `;` are ignored.
pub fn detect_from_mime(mime: &str) -> Option<SourceFormat> {
    let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    if essence.is_empty() {
        return None;
    }
    SourceFormat::ALL
        .iter()
        .copied()
        .find(|f| f.mime_types().contains(&essence.as_str()))
}

/// Detect a format from a file extension (leading dot tolerated).
pub fn detect_from_extension(ext: &str) -> Option<SourceFormat> {
    let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() {
        return None;
    }
    SourceFormat::ALL
        .iter()
        .copied()
        .find(|f| f.extensions().contains(&ext.as_str()))
}

const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Detect a format by sniffing magic bytes.
///
/// `name_hint` is used only to break ties the bytes cannot resolve.
pub fn detect_from_bytes(data: &[u8], name_hint: Option<&str>) -> Option<SourceFormat> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(SourceFormat::Jpeg);
    }
    if data.starts_with(PNG_MAGIC) {
        return Some(SourceFormat::Png);
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some(SourceFormat::Gif);
    }
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some(SourceFormat::Webp);
    }
    if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
        return Some(SourceFormat::Tiff);
    }
    if data.len() >= 18 && data.starts_with(b"BM") {
        let dib_header = u32::from_le_bytes([data[14], data[15], data[16], data[17]]);
        if matches!(dib_header, 12 | 40 | 52 | 56 | 64 | 108 | 124) {
            return Some(SourceFormat::Bmp);
        }
    }
    if data.starts_with(b"{\\rtf") {
        return Some(SourceFormat::Rtf);
    }
    if data.starts_with(ZIP_MAGIC) {
        return sniff_zip(data);
    }
    if data.starts_with(OLE_MAGIC) {
        return Some(sniff_ole(data, name_hint));
    }
    if is_pdf_bytes(data) {
        return None;
    }
    sniff_text(data, name_hint)
}

/// Detect the format of an input file.
///
/// Precedence: a specific MIME type, then the extension, then magic bytes.
pub fn detect_format(file: &InputFile) -> Result<SourceFormat> {
    if let Some(mime) = file.mime_type.as_deref() {
        if !mime.starts_with("application/octet-stream") {
            if let Some(format) = detect_from_mime(mime) {
                return Ok(format);
            }
        }
    }

    if let Some(format) = file.extension().as_deref().and_then(detect_from_extension) {
        return Ok(format);
    }

    detect_from_bytes(&file.data, Some(&file.name))
        .ok_or_else(|| Error::UnsupportedFormat(file.name.clone()))
}

/// Check whether a file name has a supported extension.
pub fn is_supported(name: &str) -> bool {
    std::path::Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(detect_from_extension)
        .is_some()
}

/// Check if bytes start with a PDF header.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    pdf_version(data).is_some()
}

/// Extract the version from a `%PDF-x.y` header.
pub fn pdf_version(data: &[u8]) -> Option<String> {
    let rest = data.strip_prefix(b"%PDF-")?;
    let version = rest.get(..3)?;
    if version[0].is_ascii_digit() && version[1] == b'.' && version[2].is_ascii_digit() {
        Some(String::from_utf8_lossy(version).into_owned())
    } else {
        None
    }
}

fn sniff_zip(data: &[u8]) -> Option<SourceFormat> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).ok()?;

    // ODF and EPUB packages carry an uncompressed `mimetype` entry.
    let mimetype = archive.by_name("mimetype").ok().and_then(|mut entry| {
        let mut s = String::new();
        entry.read_to_string(&mut s).ok().map(|_| s)
    });
    if let Some(mime) = mimetype {
        return detect_from_mime(mime.trim());
    }

    let names: Vec<String> = archive.file_names().map(str::to_string).collect();
    if names.iter().any(|n| n == "[Content_Types].xml") {
        if names.iter().any(|n| n.starts_with("word/")) {
            return Some(SourceFormat::Docx);
        }
        if names.iter().any(|n| n.starts_with("ppt/")) {
            return Some(SourceFormat::Pptx);
        }
    }
    if names.iter().any(|n| n == "META-INF/container.xml") {
        return Some(SourceFormat::Epub);
    }
    None
}

fn sniff_ole(data: &[u8], name_hint: Option<&str>) -> SourceFormat {
    // Directory entry names are UTF-16LE.
    let needle: Vec<u8> = "PowerPoint Document"
        .encode_utf16()
        .flat_map(|u| u.to_le_bytes())
        .collect();
    if data.windows(needle.len()).any(|w| w == needle.as_slice()) {
        return SourceFormat::Ppt;
    }
    let hinted = name_hint
        .and_then(|n| std::path::Path::new(n).extension()?.to_str().map(str::to_string))
        .and_then(|e| detect_from_extension(&e));
    match hinted {
        Some(SourceFormat::Ppt) => SourceFormat::Ppt,
        _ => SourceFormat::Doc,
    }
}

fn sniff_text(data: &[u8], name_hint: Option<&str>) -> Option<SourceFormat> {
    let head = &data[..data.len().min(1024)];
    let text = match std::str::from_utf8(head) {
        Ok(s) => s,
        // The 1 KiB cut may split a multi-byte character.
        Err(e) if e.error_len().is_none() => std::str::from_utf8(&head[..e.valid_up_to()]).ok()?,
        Err(_) => return None,
    };
    if text.contains('\0') {
        return None;
    }

    let lower = text.trim_start_matches('\u{feff}').trim_start().to_ascii_lowercase();
    if lower.starts_with("<!doctype html") || lower.starts_with("<html") {
        return Some(SourceFormat::Html);
    }
    if lower.starts_with("<?xml") && lower.contains("<html") {
        return Some(SourceFormat::Html);
    }
    let hinted = name_hint
        .and_then(|n| std::path::Path::new(n).extension()?.to_str().map(str::to_string))
        .and_then(|e| detect_from_extension(&e));
    if hinted == Some(SourceFormat::Markdown) {
        return hinted;
    }
    Some(SourceFormat::Text)
}
