//! Greedy word wrapping.

use super::Font;

/// Wrap text into lines no wider than `max_width` points.
///
/// Explicit newlines are kept as line breaks. Words wider than a whole line
/// are split between characters. An empty input yields a single empty line.
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        wrap_line(raw_line, font, size, max_width, &mut lines);
    }
    lines
}

fn wrap_line(text: &str, font: Font, size: f32, max_width: f32, lines: &mut Vec<String>) {
    let space = font.text_width(" ", size);
    let mut current = String::new();
    let mut current_width = 0.0;

    for word in text.split_whitespace() {
        let word_width = font.text_width(word, size);

        if !current.is_empty() && current_width + space + word_width <= max_width {
            current.push(' ');
            current.push_str(word);
            current_width += space + word_width;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            current_width = 0.0;
        }

        if word_width <= max_width {
            current.push_str(word);
            current_width = word_width;
        } else {
            // Hard-split the oversized word; the remainder stays open.
            for piece in split_word(word, font, size, max_width) {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current_width = font.text_width(&piece, size);
                current = piece;
            }
        }
    }

    lines.push(current);
}

/// Split a word into pieces that each fit `max_width` (at least one character each).
fn split_word(word: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut width = 0.0;
    for c in word.chars() {
        let w = font.char_width(c) as f32 * size / 1000.0;
        if !piece.is_empty() && width + w > max_width {
            pieces.push(std::mem::take(&mut piece));
            width = 0.0;
        }
        piece.push(c);
        width += w;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

/// Hard-wrap a monospace line at `max_chars` characters, without reflow.
pub fn wrap_fixed(line: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
