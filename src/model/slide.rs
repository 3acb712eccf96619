//! Presentation slides.

use super::{Block, Content};

/// A single presentation slide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Slide {
    /// 1-based slide number.
    pub number: u32,

    /// Title placeholder text.
    pub title: Option<String>,

    /// Remaining text frames in reading order.
    pub body: Vec<Block>,
}

impl Slide {
    /// Create an empty slide.
    pub fn new(number: u32) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }

    /// Whether the slide has no text at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_empty()
    }
}

impl Content {
    /// Lay slides out one per page. Untitled slides get a "Slide N" heading.
    pub fn from_slides(slides: Vec<Slide>) -> Self {
        let mut content = Content::new();
        for slide in slides {
            content.page_break();
            let title = slide
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format!("Slide {}", slide.number));
            content.push(Block::heading(1, title));
            for block in slide.body {
                content.push(block);
            }
        }
        content
    }
}
