//! Plain text converter.

use super::{ConvertOptions, DocumentConverter};
use crate::detect::SourceFormat;
use crate::error::Result;
use crate::input::InputFile;
use crate::model::{Block, Content};

/// Plain text converter.
///
/// Blank lines separate paragraphs, line breaks inside a paragraph are kept
/// and form feeds start a new page.
#[derive(Debug, Clone, Default)]
pub struct TextConverter {
    _private: (),
}

impl TextConverter {
    /// Create a new text converter.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl DocumentConverter for TextConverter {
    fn name(&self) -> &str {
        "text"
    }

    fn formats(&self) -> &[SourceFormat] {
        &[SourceFormat::Text]
    }

    fn extract(&self, file: &InputFile, _options: &ConvertOptions) -> Result<Content> {
        Ok(extract_text(&file.text()))
    }
}

pub(crate) fn extract_text(text: &str) -> Content {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut content = Content::new();

    for (i, page) in normalized.split('\u{c}').enumerate() {
        if i > 0 {
            content.page_break();
        }
        let mut paragraph: Vec<&str> = Vec::new();
        for line in page.split('\n') {
            if line.trim().is_empty() {
                flush(&mut content, &mut paragraph);
            } else {
                paragraph.push(line.trim_end());
            }
        }
        flush(&mut content, &mut paragraph);
    }
    content
}

fn flush(content: &mut Content, lines: &mut Vec<&str>) {
    if !lines.is_empty() {
        content.push(Block::paragraph(lines.join("\n")));
        lines.clear();
    }
}
