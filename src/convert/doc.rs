//! Legacy Word (`.doc`) converter.
//!
//! Binary Word files are not parsed structurally. Text is recovered by
//! scanning for UTF-16LE runs (how Word 97+ stores Unicode text) and
//! Windows-1252 runs ("compressed" text), merged in file order.

use super::{ConvertOptions, DocumentConverter};
use crate::detect::SourceFormat;
use crate::error::{Error, Result};
use crate::input::InputFile;
use crate::layout::win_ansi_char;
use crate::model::{Block, Content};

/// Minimum number of alphanumeric characters for a run to count as text.
const MIN_RUN_ALNUM: usize = 4;

/// Stream and property names of the OLE container, not document text.
const CONTAINER_NOISE: &[&str] = &[
    "Root Entry",
    "WordDocument",
    "SummaryInformation",
    "DocumentSummaryInformation",
    "CompObj",
    "ObjectPool",
    "PowerPoint Document",
    "Current User",
    "Pictures",
    "1Table",
    "0Table",
    "Normal.dot",
    "Normal.dotm",
    "Microsoft Word",
    "Microsoft Office Word",
    "MSWordDoc",
    "Word.Document.8",
    "Times New Roman",
    "Symbol",
    "Arial",
    "Calibri",
    "Cambria Math",
    "Courier New",
    "Wingdings",
    "Default Paragraph Font",
    "Table Normal",
    "Normal Table",
    "No List",
    "Normal",
    "Normal (Web)",
    "Heading 1",
    "Heading 2",
    "Heading 3",
    "Header",
    "Footer",
    "Hyperlink",
    "Balloon Text",
    "Body Text",
    "List Paragraph",
    "Page Number",
    "Table Grid",
];

/// Legacy Word converter.
#[derive(Debug, Clone, Default)]
pub struct DocConverter {
    _private: (),
}

impl DocConverter {
    /// Create a new DOC converter.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl DocumentConverter for DocConverter {
    fn name(&self) -> &str {
        "doc"
    }

    fn formats(&self) -> &[SourceFormat] {
        &[SourceFormat::Doc]
    }

    fn extract(&self, file: &InputFile, _options: &ConvertOptions) -> Result<Content> {
        let paragraphs = extract_binary_text(&file.data);
        if paragraphs.is_empty() {
            return Err(Error::InvalidDocument("no readable text found".into()));
        }
        let mut content = Content::new();
        for paragraph in paragraphs {
            content.push(Block::paragraph(paragraph));
        }
        Ok(content)
    }
}

/// Recover paragraphs of readable text from a binary office file.
pub(crate) fn extract_binary_text(data: &[u8]) -> Vec<String> {
    let mut runs = utf16_runs(data);
    runs.extend(ansi_runs(data));
    runs.sort_by_key(|(offset, _)| *offset);
    runs.iter()
        .flat_map(|(_, run)| run.split(['\r', '\n', '\u{b}', '\u{c}']))
        .map(clean_paragraph)
        .filter(|p| is_text(p))
        .collect()
}

/// Decode UTF-16LE text from `data`, stopping at invalid units.
pub(crate) fn decode_utf16le(data: &[u8]) -> String {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Decode Windows-1252 text.
pub(crate) fn decode_ansi(data: &[u8]) -> String {
    data.iter().map(|&b| win_ansi_char(b)).collect()
}

fn is_text_char(c: char) -> bool {
    matches!(c, '\r' | '\n' | '\t' | '\u{b}' | '\u{c}') || (!c.is_control() && c != '\u{fffd}')
}

/// A recovered run and the byte offset it starts at.
type Run = (usize, String);

/// Runs of UTF-16LE text, aligned on either byte boundary.
fn utf16_runs(data: &[u8]) -> Vec<Run> {
    let mut runs = Vec::new();
    for offset in 0..2 {
        let mut current = String::new();
        let mut start = offset;
        let mut i = offset;
        while i + 1 < data.len() {
            let unit = u16::from_le_bytes([data[i], data[i + 1]]);
            match char::from_u32(u32::from(unit)).filter(|c| is_text_char(*c)) {
                // Private-use and surrogate ranges rarely hold real text.
                Some(c) if !(0xD800..=0xF8FF).contains(&unit) => {
                    if current.is_empty() {
                        start = i;
                    }
                    current.push(c);
                }
                _ => push_run(&mut runs, start, &mut current, true),
            }
            i += 2;
        }
        push_run(&mut runs, start, &mut current, true);
    }
    runs
}

/// Runs of Windows-1252 text.
fn ansi_runs(data: &[u8]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut current = String::new();
    let mut start = 0;
    for (i, &b) in data.iter().enumerate() {
        let c = win_ansi_char(b);
        if (b >= 0x20 || matches!(b, b'\r' | b'\n' | b'\t')) && is_text_char(c) {
            if current.is_empty() {
                start = i;
            }
            current.push(c);
        } else {
            push_run(&mut runs, start, &mut current, false);
        }
    }
    push_run(&mut runs, start, &mut current, false);
    runs
}

fn push_run(runs: &mut Vec<Run>, start: usize, current: &mut String, wide: bool) {
    let run = std::mem::take(current);
    if run.chars().filter(|c| c.is_alphanumeric()).count() < MIN_RUN_ALNUM {
        return;
    }
    if wide && looks_misaligned(&run) {
        return;
    }
    runs.push((start, run));
}

/// Whether a UTF-16 run is really single-byte text read two bytes at a time.
///
/// Such units have both bytes in the printable ASCII range, or a zero low
/// byte when the scan is off by one. CJK text also matches and is dropped.
fn looks_misaligned(run: &str) -> bool {
    let total = run.chars().count();
    let suspicious = run
        .chars()
        .map(|c| c as u32)
        .filter(|&u| {
            let (high, low) = (u >> 8, u & 0xFF);
            high > 0 && (low == 0 || ((0x20..=0x7E).contains(&high) && (0x20..=0x7E).contains(&low)))
        })
        .count();
    suspicious * 2 > total
}

fn clean_paragraph(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Heuristic filter for recovered runs.
fn is_text(paragraph: &str) -> bool {
    if CONTAINER_NOISE.contains(&paragraph) {
        return false;
    }
    let total = paragraph.chars().count();
    let alnum = paragraph.chars().filter(|c| c.is_alphanumeric()).count();
    let spaced = paragraph.chars().filter(|c| c.is_alphanumeric() || *c == ' ').count();
    alnum >= MIN_RUN_ALNUM && spaced * 10 >= total * 7
}
