//! Standard-14 fonts, WinAnsi encoding and text metrics.

use unicode_normalization::UnicodeNormalization;

/// A standard PDF Type 1 font. These need no embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Font {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    Courier,
}

impl Font {
    /// All fonts registered in every generated document.
    pub const ALL: [Font; 4] = [
        Font::Helvetica,
        Font::HelveticaBold,
        Font::HelveticaOblique,
        Font::Courier,
    ];

    /// PostScript base font name.
    pub fn base_font(&self) -> &'static str {
        match self {
            Font::Helvetica => "Helvetica",
            Font::HelveticaBold => "Helvetica-Bold",
            Font::HelveticaOblique => "Helvetica-Oblique",
            Font::Courier => "Courier",
        }
    }

    /// Resource name used in content streams.
    pub fn resource_name(&self) -> &'static str {
        match self {
            Font::Helvetica => "F1",
            Font::HelveticaBold => "F2",
            Font::HelveticaOblique => "F3",
            Font::Courier => "F4",
        }
    }

    /// Advance width of a character in 1/1000 em.
    ///
    /// The character must already be WinAnsi-representable (see [`to_win_ansi`]).
    pub fn char_width(&self, c: char) -> u16 {
        let code = c as u32;
        match self {
            Font::Courier => 600,
            Font::Helvetica | Font::HelveticaOblique => match code {
                32..=126 => HELVETICA_WIDTHS[(code - 32) as usize],
                _ => 556,
            },
            Font::HelveticaBold => match code {
                32..=126 => HELVETICA_BOLD_WIDTHS[(code - 32) as usize],
                _ => 611,
            },
        }
    }

    /// Width of a string in points at the given size.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        units as f32 * size / 1000.0
    }
}

// AFM advance widths for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// WinAnsi code points 0x80..=0x9F that differ from Latin-1.
const WIN_ANSI_EXTRAS: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

/// Decode a single WinAnsi (Windows-1252) byte.
///
/// Bytes unassigned in the code page map to U+FFFD.
pub fn win_ansi_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => WIN_ANSI_EXTRAS
            .iter()
            .find(|(_, b)| *b == byte)
            .map_or('\u{fffd}', |(c, _)| *c),
        _ => char::from(byte),
    }
}

/// Map a character to its WinAnsi byte.
pub fn win_ansi_byte(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => WIN_ANSI_EXTRAS
            .iter()
            .find(|(ch, _)| *ch == c)
            .map(|(_, b)| *b),
    }
}

/// Reduce text to characters the standard fonts can show.
///
/// Text is NFC-normalised; characters outside WinAnsi are replaced by their
/// decomposed base letters when that helps (e.g. `ő` → `o`), a few common
/// symbols get ASCII stand-ins, and anything else becomes `?`. Tabs expand to
/// four spaces and other control characters are dropped, except `\n`.
pub fn to_win_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfc() {
        match c {
            '\n' => out.push('\n'),
            '\t' => out.push_str("    "),
            '\r' | '\u{feff}' | '\u{200b}' | '\u{00ad}' => {}
            c if c.is_control() => {}
            c if win_ansi_byte(c).is_some() => out.push(c),
            '\u{2002}'..='\u{200a}' | '\u{202f}' | '\u{3000}' => out.push(' '),
            '\u{2010}' | '\u{2011}' | '\u{2212}' => out.push('-'),
            '\u{2022}' | '\u{25cf}' | '\u{25aa}' | '\u{25e6}' => out.push('•'),
            '\u{2190}' => out.push_str("<-"),
            '\u{2192}' => out.push_str("->"),
            '\u{2713}' | '\u{2714}' => out.push('v'),
            c => {
                let base: String = c
                    .to_string()
                    .nfkd()
                    .filter(|d| win_ansi_byte(*d).is_some())
                    .collect();
                if base.is_empty() {
                    out.push('?');
                } else {
                    out.push_str(&base);
                }
            }
        }
    }
    out
}

/// Encode already-sanitised text as WinAnsi bytes. Unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| *c != '\n')
        .map(|c| win_ansi_byte(c).unwrap_or(b'?'))
        .collect()
}
