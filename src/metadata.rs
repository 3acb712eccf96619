//! PDF document information (metadata) reading and writing.
//!
//! Operates on the trailer's `/Info` dictionary. Text strings are decoded
//! from UTF-16BE (with byte order mark) or PDFDocEncoding, and written back
//! as plain literals when ASCII or UTF-16BE otherwise.

use crate::detect::is_pdf_bytes;
use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, TimeZone, Timelike};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const STANDARD_KEYS: [&str; 8] = [
    "Title",
    "Author",
    "Subject",
    "Keywords",
    "Creator",
    "Producer",
    "CreationDate",
    "ModDate",
];

/// Document information dictionary contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfMetadata {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Keywords
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// Application that created the source document
    pub creator: Option<String>,

    /// Application that produced the PDF
    pub producer: Option<String>,

    /// Creation date
    pub creation_date: Option<DateTime<FixedOffset>>,

    /// Last modification date
    pub modification_date: Option<DateTime<FixedOffset>>,

    /// Non-standard Info entries
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom: BTreeMap<String, String>,

    /// Custom keys whose values are PDF names (`/Trapped /False`) rather than text
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub custom_names: BTreeSet<String>,
}

impl PdfMetadata {
    /// Create empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the subject.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set the keywords.
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    /// Set a custom entry.
    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }

    /// Set a custom entry written as a PDF name.
    pub fn with_custom_name(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        self.custom_names.insert(key.clone());
        self.custom.insert(key, value.into());
        self
    }

    /// Returns `true` if no field is set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.keywords.is_empty()
            && self.creator.is_none()
            && self.producer.is_none()
            && self.creation_date.is_none()
            && self.modification_date.is_none()
            && self.custom.is_empty()
    }

    /// Serialize to JSON, pretty-printed or compact.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let result = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };

        result.map_err(|e| Error::Other(format!("JSON serialization error: {}", e)))
    }

    /// Apply the set fields of this value onto an Info dictionary.
    pub(crate) fn apply_to(&self, info: &mut Dictionary) {
        let text_fields = [
            ("Title", &self.title),
            ("Author", &self.author),
            ("Subject", &self.subject),
            ("Creator", &self.creator),
            ("Producer", &self.producer),
        ];
        for (key, value) in text_fields {
            if let Some(value) = value {
                info.set(key, encode_text_string(value));
            }
        }
        if !self.keywords.is_empty() {
            info.set("Keywords", encode_text_string(&self.keywords.join(", ")));
        }
        if let Some(date) = &self.creation_date {
            info.set("CreationDate", encode_text_string(&format_pdf_date(date)));
        }
        if let Some(date) = &self.modification_date {
            info.set("ModDate", encode_text_string(&format_pdf_date(date)));
        }
        for (key, value) in &self.custom {
            if STANDARD_KEYS.contains(&key.as_str()) || key.is_empty() {
                continue;
            }
            let as_name = self.custom_names.contains(key)
                || matches!(info.get(key.as_bytes()), Ok(Object::Name(_)));
            if as_name {
                info.set(key.as_str(), Object::Name(value.as_bytes().to_vec()));
            } else {
                info.set(key.as_str(), encode_text_string(value));
            }
        }
    }

    /// Build metadata from an Info dictionary.
    fn from_info(doc: &Document, info: &Dictionary) -> Self {
        let mut meta = PdfMetadata::new();
        for (key, value) in info.iter() {
            let key = String::from_utf8_lossy(key).into_owned();
            let Some(text) = resolve_text(doc, value) else {
                continue;
            };
            match key.as_str() {
                "Title" => meta.title = non_empty(text),
                "Author" => meta.author = non_empty(text),
                "Subject" => meta.subject = non_empty(text),
                "Creator" => meta.creator = non_empty(text),
                "Producer" => meta.producer = non_empty(text),
                "Keywords" => meta.keywords = split_keywords(&text),
                "CreationDate" => meta.creation_date = parse_date_lenient(&text),
                "ModDate" => meta.modification_date = parse_date_lenient(&text),
                _ => {
                    if is_name(doc, value) {
                        meta.custom_names.insert(key.clone());
                    }
                    meta.custom.insert(key, text);
                }
            }
        }
        meta
    }
}

/// Read metadata from PDF bytes. A PDF without an Info dictionary yields empty metadata.
pub fn read_metadata(pdf: &[u8]) -> Result<PdfMetadata> {
    let doc = load(pdf)?;
    match info_dictionary(&doc) {
        Some(info) => Ok(PdfMetadata::from_info(&doc, info)),
        None => Ok(PdfMetadata::new()),
    }
}

/// Write metadata into PDF bytes and return the updated PDF.
///
/// Only fields that are set are written; existing entries for unset fields
/// are left untouched.
pub fn write_metadata(pdf: &[u8], metadata: &PdfMetadata) -> Result<Vec<u8>> {
    let mut doc = load(pdf)?;
    let mut info = info_dictionary(&doc).cloned().unwrap_or_default();
    metadata.apply_to(&mut info);
    set_info_dictionary(&mut doc, info);
    save(&mut doc)
}

/// Remove all document information and the XMP metadata stream.
pub fn remove_metadata(pdf: &[u8]) -> Result<Vec<u8>> {
    let mut doc = load(pdf)?;
    if let Some(id) = info_reference(&doc) {
        doc.objects.remove(&id);
    }
    doc.trailer.remove(b"Info");

    if let Ok(root_id) = doc.trailer.get(b"Root").and_then(Object::as_reference) {
        if let Ok(catalog) = doc.get_object_mut(root_id).and_then(Object::as_dict_mut) {
            catalog.remove(b"Metadata");
        }
    }
    doc.prune_objects();
    log::debug!("Removed document information and XMP metadata");
    save(&mut doc)
}

/// Copy all metadata from `source` into `target`, returning the updated target.
pub fn copy_metadata(source: &[u8], target: &[u8]) -> Result<Vec<u8>> {
    let metadata = read_metadata(source)?;
    write_metadata(target, &metadata)
}

fn load(pdf: &[u8]) -> Result<Document> {
    if !is_pdf_bytes(pdf) {
        return Err(Error::NotPdf);
    }
    Ok(Document::load_mem(pdf)?)
}

fn save(doc: &mut Document) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    doc.save_to(&mut buf)?;
    Ok(buf)
}

fn info_reference(doc: &Document) -> Option<ObjectId> {
    doc.trailer.get(b"Info").and_then(Object::as_reference).ok()
}

fn info_dictionary(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_dictionary(*id).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn set_info_dictionary(doc: &mut Document, info: Dictionary) {
    match info_reference(doc) {
        Some(id) => {
            doc.objects.insert(id, Object::Dictionary(info));
        }
        None => {
            let id = doc.add_object(Object::Dictionary(info));
            doc.trailer.set("Info", id);
        }
    }
}

fn resolve_text(doc: &Document, value: &Object) -> Option<String> {
    match value {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        Object::Reference(id) => resolve_text(doc, doc.get_object(*id).ok()?),
        Object::Integer(i) => Some(i.to_string()),
        Object::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn is_name(doc: &Document, value: &Object) -> bool {
    match value {
        Object::Name(_) => true,
        Object::Reference(id) => matches!(doc.get_object(*id), Ok(Object::Name(_))),
        _ => false,
    }
}

fn non_empty(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn split_keywords(text: &str) -> Vec<String> {
    text.split([',', ';'])
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_date_lenient(text: &str) -> Option<DateTime<FixedOffset>> {
    match parse_pdf_date(text) {
        Ok(date) => Some(date),
        Err(e) => {
            log::warn!("Ignoring unparseable date: {}", e);
            None
        }
    }
}

/// Encode a text string: ASCII literal, or UTF-16BE with byte order mark.
pub fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        Object::String(text.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        bytes.extend(text.encode_utf16().flat_map(|u| u.to_be_bytes()));
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, UTF-8 with BOM, or PDFDocEncoding).
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| pdf_doc_char(b)).collect()
}

/// PDFDocEncoding differs from Latin-1 only in 0x18..0x1F and 0x80..0xA0.
fn pdf_doc_char(b: u8) -> char {
    const HIGH: [char; 33] = [
        '•', '†', '‡', '…', '—', '–', 'ƒ', '⁄', '‹', '›', '−', '‰', '„', '“', '”', '‘', '’',
        '‚', '™', 'ﬁ', 'ﬂ', 'Ł', 'Œ', 'Š', 'Ÿ', 'Ž', 'ı', 'ł', 'œ', 'š', 'ž', '\u{fffd}', '€',
    ];
    const LOW: [char; 8] = ['˘', 'ˇ', 'ˆ', '˙', '˝', '˛', '˚', '˜'];
    match b {
        0x18..=0x1F => LOW[(b - 0x18) as usize],
        0x80..=0xA0 => HIGH[(b - 0x80) as usize],
        _ => b as char,
    }
}

/// Format a date as a PDF date string (`D:YYYYMMDDHHmmSS+HH'mm'`).
pub fn format_pdf_date(date: &DateTime<FixedOffset>) -> String {
    let offset = date.offset().fix().local_minus_utc();
    let tz = if offset == 0 {
        "Z".to_string()
    } else {
        let sign = if offset < 0 { '-' } else { '+' };
        let abs = offset.abs();
        format!("{}{:02}'{:02}'", sign, abs / 3600, (abs % 3600) / 60)
    };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{}",
        date.year(),
        date.month(),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        tz
    )
}

/// Parse a PDF date string. Trailing components may be omitted
/// (`D:2024` is 1 January 2024, 00:00 UTC); a missing zone means UTC.
pub fn parse_pdf_date(text: &str) -> Result<DateTime<FixedOffset>> {
    let invalid = || Error::InvalidDate(text.to_string());
    let s = text.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);

    let digits_len = s.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits_len < 4 {
        return Err(invalid());
    }
    let (digits, zone) = s.split_at(digits_len.min(14));
    let field = |start: usize, len: usize, default: u32| -> Result<u32> {
        match digits.get(start..start + len) {
            Some(part) => part.parse().map_err(|_| invalid()),
            None => Ok(default),
        }
    };
    let year = field(0, 4, 0)? as i32;
    let month = field(4, 2, 1)?;
    let day = field(6, 2, 1)?;
    let hour = field(8, 2, 0)?;
    let minute = field(10, 2, 0)?;
    let second = field(12, 2, 0)?;

    let offset = parse_zone(zone).ok_or_else(invalid)?;
    let naive = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second.min(59)))
        .ok_or_else(invalid)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(invalid)
}

fn parse_zone(zone: &str) -> Option<FixedOffset> {
    let zone = zone.trim();
    let mut chars = zone.chars();
    let sign = match chars.next() {
        None | Some('Z') | Some('z') => return FixedOffset::east_opt(0),
        Some('+') => 1,
        Some('-') => -1,
        Some(_) => return None,
    };
    let rest: String = chars.filter(|c| c.is_ascii_digit()).collect();
    let hours: i32 = rest.get(0..2).unwrap_or("0").parse().ok()?;
    let minutes: i32 = rest.get(2..4).unwrap_or("0").parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
