//! Format-neutral content extracted from a source document.

use super::ImageData;
use serde::{Deserialize, Serialize};

/// A block-level element of extracted content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Section heading (level 1-6).
    Heading { level: u8, text: String },

    /// Body paragraph. Embedded newlines are hard line breaks.
    Paragraph { text: String },

    /// List item. `ordered` holds the item number for numbered lists.
    ListItem {
        depth: u8,
        ordered: Option<u32>,
        text: String,
    },

    /// Preformatted text laid out in a monospace font without reflow.
    Preformatted { text: String },

    /// Block quotation.
    Quote { text: String },

    /// Horizontal rule.
    Rule,

    /// Forced page break.
    PageBreak,

    /// Raster image.
    Image(ImageData),
}

impl Block {
    /// Create a heading, clamping the level to 1-6.
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            level: level.clamp(1, 6),
            text: text.into(),
        }
    }

    /// Create a paragraph.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph { text: text.into() }
    }

    /// Create a bulleted list item.
    pub fn bullet(depth: u8, text: impl Into<String>) -> Self {
        Block::ListItem {
            depth,
            ordered: None,
            text: text.into(),
        }
    }

    /// Create a numbered list item.
    pub fn numbered(depth: u8, number: u32, text: impl Into<String>) -> Self {
        Block::ListItem {
            depth,
            ordered: Some(number),
            text: text.into(),
        }
    }

    /// Create a preformatted block.
    pub fn preformatted(text: impl Into<String>) -> Self {
        Block::Preformatted { text: text.into() }
    }

    /// Create a quote.
    pub fn quote(text: impl Into<String>) -> Self {
        Block::Quote { text: text.into() }
    }

    /// Text carried by this block, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Block::Heading { text, .. }
            | Block::Paragraph { text }
            | Block::ListItem { text, .. }
            | Block::Preformatted { text }
            | Block::Quote { text } => Some(text),
            Block::Rule | Block::PageBreak | Block::Image(_) => None,
        }
    }
}

/// Extracted document content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Title found in the source (HTML `<title>`, DOCX core properties, ...).
    pub title: Option<String>,

    /// Author found in the source.
    pub author: Option<String>,

    /// Blocks in reading order.
    pub blocks: Vec<Block>,
}

impl Content {
    /// Create empty content.
    pub fn new() -> Self {
        Self::default()
    }

    /// Content holding a single block.
    pub fn single(block: Block) -> Self {
        Self {
            blocks: vec![block],
            ..Self::default()
        }
    }

    /// Append a block. Text blocks that are blank are dropped.
    pub fn push(&mut self, block: Block) {
        if let Some(text) = block.text() {
            if text.trim().is_empty() && !matches!(block, Block::Preformatted { .. }) {
                return;
            }
        }
        self.blocks.push(block);
    }

    /// Append a page break unless the content is empty or already ends with one.
    pub fn page_break(&mut self) {
        if !self.blocks.is_empty() && self.blocks.last() != Some(&Block::PageBreak) {
            self.blocks.push(Block::PageBreak);
        }
    }

    /// Append all blocks of another content value.
    pub fn extend(&mut self, other: Content) {
        for block in other.blocks {
            self.push(block);
        }
    }

    /// Check if there are no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of image blocks.
    pub fn image_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Image(_)))
            .count()
    }

    /// Plain text of all blocks, one block per line group.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(Block::text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Number of whitespace-separated words.
    pub fn word_count(&self) -> usize {
        self.blocks
            .iter()
            .filter_map(Block::text)
            .map(|t| t.split_whitespace().count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_skips_blank_text() {
        let mut content = Content::new();
        content.push(Block::paragraph("   "));
        content.push(Block::heading(9, "Title"));
        content.push(Block::preformatted(""));
        assert_eq!(content.blocks.len(), 2);
        assert_eq!(content.blocks[0], Block::heading(6, "Title"));
    }

    #[test]
    fn test_page_break_not_duplicated() {
        let mut content = Content::new();
        content.page_break();
        assert!(content.is_empty());

        content.push(Block::paragraph("one"));
        content.page_break();
        content.page_break();
        assert_eq!(content.blocks.len(), 2);
    }

    #[test]
    fn test_plain_text_and_word_count() {
        let mut content = Content::new();
        content.push(Block::heading(1, "Hello world"));
        content.push(Block::bullet(0, "first item"));
        content.push(Block::Rule);
        assert_eq!(content.plain_text(), "Hello world\n\nfirst item");
        assert_eq!(content.word_count(), 4);
    }
}
