//! Input and output file types.

use crate::detect::detect_from_extension;
use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// A named blob of bytes to convert, with an optional MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// File name including extension (no directory).
    pub name: String,

    /// MIME type reported by the caller, if any.
    pub mime_type: Option<String>,

    /// Raw file content.
    pub data: Vec<u8>,
}

impl InputFile {
    /// Read a file from disk. The MIME type is derived from the extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        let mime_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(detect_from_extension)
            .map(|f| f.mime_type().to_string());
        Ok(Self {
            name,
            mime_type,
            data,
        })
    }

    /// Create an input from in-memory bytes.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: None,
            data,
        }
    }

    /// Set the MIME type.
    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }

    /// Lowercase extension without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    /// File name without extension.
    pub fn stem(&self) -> String {
        Path::new(&self.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "document".to_string())
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the file is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode the content as text.
    ///
    /// Honours UTF-8 and UTF-16 byte order marks; anything else is decoded
    /// as UTF-8 with invalid sequences replaced.
    pub fn text(&self) -> String {
        decode_text(&self.data)
    }
}

/// Decode bytes as text, honouring byte order marks.
pub(crate) fn decode_text(data: &[u8]) -> String {
    if let Some(rest) = data.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if let Some(rest) = data.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = data.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, u16::from_be_bytes);
    }
    String::from_utf8_lossy(data).into_owned()
}

fn decode_utf16(data: &[u8], read: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = data.chunks_exact(2).map(|c| read([c[0], c[1]])).collect();
    String::from_utf16_lossy(&units)
}

/// A converted PDF document.
#[derive(Debug, Clone)]
pub struct PdfFile {
    /// Output file name (source stem + `.pdf`).
    pub name: String,

    /// Serialized PDF bytes.
    pub data: Vec<u8>,

    /// Number of pages.
    pub page_count: u32,
}

impl PdfFile {
    /// MIME type of the output.
    pub fn mime_type(&self) -> &'static str {
        "application/pdf"
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the output is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write the PDF to the given path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, &self.data)?;
        Ok(())
    }

    /// Write the PDF into a directory under its own name. Returns the path written.
    pub fn save_in<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let path = dir.as_ref().join(&self.name);
        self.save(&path)?;
        Ok(path)
    }
}
