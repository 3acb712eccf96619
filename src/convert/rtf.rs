//! RTF converter.
//!
//! Walks the control-word stream, dropping destination groups that carry no
//! body text (font and colour tables, stylesheets, pictures, ...).

use super::{ConvertOptions, DocumentConverter};
use crate::detect::SourceFormat;
use crate::error::{Error, Result};
use crate::input::InputFile;
use crate::layout::win_ansi_char;
use crate::model::{Block, Content};

/// RTF converter.
#[derive(Debug, Clone, Default)]
pub struct RtfConverter {
    _private: (),
}

impl RtfConverter {
    /// Create a new RTF converter.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl DocumentConverter for RtfConverter {
    fn name(&self) -> &str {
        "rtf"
    }

    fn formats(&self) -> &[SourceFormat] {
        &[SourceFormat::Rtf]
    }

    fn extract(&self, file: &InputFile, _options: &ConvertOptions) -> Result<Content> {
        if !file.data.starts_with(b"{\\rtf") {
            return Err(Error::InvalidDocument("missing {\\rtf header".into()));
        }
        Ok(parse_rtf(&file.data))
    }
}

/// Destinations whose content is not body text.
const SKIPPED_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "object",
    "header",
    "headerl",
    "headerr",
    "headerf",
    "footer",
    "footerl",
    "footerr",
    "footerf",
    "footnote",
    "fldinst",
    "listtable",
    "listoverridetable",
    "revtbl",
    "rsidtbl",
    "latentstyles",
    "themedata",
    "colorschememapping",
    "datastore",
    "xmlnstbl",
    "generator",
    "bkmkstart",
    "bkmkend",
    "filetbl",
];

#[derive(Debug, Clone, Copy)]
struct GroupState {
    skip: bool,
    unicode_skip: usize,
}

impl Default for GroupState {
    fn default() -> Self {
        Self {
            skip: false,
            unicode_skip: 1,
        }
    }
}

struct Output {
    content: Content,
    current: String,
    // High half of a UTF-16 pair written as two \uN escapes.
    high_surrogate: Option<u32>,
}

impl Output {
    fn push(&mut self, c: char) {
        if self.high_surrogate.take().is_some() {
            self.current.push('\u{fffd}');
        }
        self.current.push(c);
    }

    fn push_unit(&mut self, unit: u32) {
        match unit {
            0xD800..=0xDBFF => {
                if self.high_surrogate.replace(unit).is_some() {
                    self.current.push('\u{fffd}');
                }
            }
            0xDC00..=0xDFFF => {
                let c = self.high_surrogate.take().and_then(|high| {
                    char::from_u32(0x10000 + ((high - 0xD800) << 10) + (unit - 0xDC00))
                });
                self.current.push(c.unwrap_or('\u{fffd}'));
            }
            _ => self.push(char::from_u32(unit).unwrap_or('\u{fffd}')),
        }
    }

    fn end_paragraph(&mut self) {
        if self.high_surrogate.take().is_some() {
            self.current.push('\u{fffd}');
        }
        let text = std::mem::take(&mut self.current);
        let text = text
            .split('\n')
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");
        self.content.push(Block::paragraph(text.trim()));
    }
}

/// Parse an RTF byte stream into paragraphs.
pub(crate) fn parse_rtf(data: &[u8]) -> Content {
    let mut out = Output {
        content: Content::new(),
        current: String::new(),
        high_surrogate: None,
    };
    let mut stack: Vec<GroupState> = Vec::new();
    let mut state = GroupState::default();
    // Fallback characters still to drop after a \uN escape.
    let mut pending_skip = 0usize;
    let mut i = 0;

    while i < data.len() {
        let b = data[i];
        match b {
            b'{' => {
                stack.push(state);
                pending_skip = 0;
                i += 1;
            }
            b'}' => {
                state = stack.pop().unwrap_or_default();
                pending_skip = 0;
                i += 1;
            }
            b'\\' => {
                i += 1;
                let Some(&next) = data.get(i) else { break };
                if next.is_ascii_alphabetic() {
                    let start = i;
                    while i < data.len() && data[i].is_ascii_alphabetic() {
                        i += 1;
                    }
                    let word = String::from_utf8_lossy(&data[start..i]).into_owned();
                    let num_start = i;
                    if i < data.len() && data[i] == b'-' {
                        i += 1;
                    }
                    while i < data.len() && data[i].is_ascii_digit() {
                        i += 1;
                    }
                    let param = std::str::from_utf8(&data[num_start..i])
                        .ok()
                        .and_then(|s| s.parse::<i32>().ok());
                    if i < data.len() && data[i] == b' ' {
                        i += 1;
                    }
                    if word == "bin" {
                        let len = param.unwrap_or(0).max(0) as usize;
                        i += len.min(data.len() - i);
                        continue;
                    }
                    control_word(&word, param, &mut state, &mut out, &mut pending_skip);
                } else {
                    i += 1;
                    match next {
                        b'\'' => {
                            let hex = data.get(i..i + 2).and_then(|h| std::str::from_utf8(h).ok());
                            let byte = hex.and_then(|h| u8::from_str_radix(h, 16).ok());
                            i += 2.min(data.len() - i);
                            if pending_skip > 0 {
                                pending_skip -= 1;
                            } else if let (Some(byte), false) = (byte, state.skip) {
                                out.push(win_ansi_char(byte));
                            }
                        }
                        b'*' => state.skip = true,
                        b'\\' | b'{' | b'}' => text_char(next as char, &state, &mut out, &mut pending_skip),
                        b'~' => text_char('\u{a0}', &state, &mut out, &mut pending_skip),
                        b'_' => text_char('-', &state, &mut out, &mut pending_skip),
                        b'\n' | b'\r' => {
                            if !state.skip {
                                out.end_paragraph();
                            }
                        }
                        _ => {}
                    }
                }
            }
            b'\r' | b'\n' => i += 1,
            _ => {
                text_char(win_ansi_char(b), &state, &mut out, &mut pending_skip);
                i += 1;
            }
        }
    }
    out.end_paragraph();
    out.content
}

fn text_char(c: char, state: &GroupState, out: &mut Output, pending_skip: &mut usize) {
    if *pending_skip > 0 {
        *pending_skip -= 1;
    } else if !state.skip {
        out.push(c);
    }
}

fn control_word(
    word: &str,
    param: Option<i32>,
    state: &mut GroupState,
    out: &mut Output,
    pending_skip: &mut usize,
) {
    if SKIPPED_DESTINATIONS.contains(&word) {
        state.skip = true;
        return;
    }
    if word == "uc" {
        state.unicode_skip = param.unwrap_or(1).max(0) as usize;
        return;
    }
    if state.skip {
        return;
    }
    match word {
        "par" | "sect" | "row" => out.end_paragraph(),
        "page" => {
            out.end_paragraph();
            out.content.page_break();
        }
        "line" => out.push('\n'),
        "tab" => out.push('\t'),
        "cell" => out.current.push_str("  |  "),
        "emdash" => out.push('—'),
        "endash" => out.push('–'),
        "bullet" => out.push('•'),
        "lquote" => out.push('‘'),
        "rquote" => out.push('’'),
        "ldblquote" => out.push('“'),
        "rdblquote" => out.push('”'),
        "emspace" | "enspace" | "qmspace" => out.push(' '),
        "u" => {
            if let Some(code) = param {
                out.push_unit((if code < 0 { code + 65536 } else { code }) as u32);
                *pending_skip = state.unicode_skip;
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_paragraphs() {
        let rtf = br"{\rtf1\ansi\deff0{\fonttbl{\f0 Times New Roman;}}{\colortbl;\red0\green0\blue0;}
\f0\fs24 Hello \b World\b0 .\par
Second\line line\par}";
        let content = parse_rtf(rtf);
        assert_eq!(
            content.blocks,
            vec![
                Block::paragraph("Hello World ."),
                Block::paragraph("Second\nline"),
            ]
        );
    }

    #[test]
    fn test_escapes() {
        let rtf = br"{\rtf1 caf\'e9 \u8364? \{x\} \emdash\par}";
        let content = parse_rtf(rtf);
        assert_eq!(content.blocks, vec![Block::paragraph("café € {x} —")]);
    }

    #[test]
    fn test_ignorable_destination_and_page() {
        let rtf = br"{\rtf1{\*\generator Writer;}{\info{\title T}}One\page Two\par}";
        let content = parse_rtf(rtf);
        assert_eq!(
            content.blocks,
            vec![
                Block::paragraph("One"),
                Block::PageBreak,
                Block::paragraph("Two"),
            ]
        );
    }

    #[test]
    fn test_binary_payload_skipped() {
        let rtf = b"{\\rtf1 a{\\*\\blipuid x}\\bin4 \x00}{\xffb\\par}";
        let content = parse_rtf(rtf);
        assert_eq!(content.blocks, vec![Block::paragraph("ab")]);
    }

    #[test]
    fn test_surrogate_pair_escape() {
        let rtf = br"{\rtf1 smile \u-10179?\u-8704? done\par}";
        let content = parse_rtf(rtf);
        assert_eq!(content.blocks, vec![Block::paragraph("smile \u{1F600} done")]);
    }

    #[test]
    fn test_rejects_non_rtf() {
        let file = InputFile::from_bytes("a.rtf", b"plain".to_vec());
        assert!(RtfConverter::new()
            .extract(&file, &ConvertOptions::default())
            .is_err());
    }
}
