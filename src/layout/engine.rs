//! Flows content blocks onto fixed-size pages.

use super::{to_win_ansi, wrap_fixed, wrap_text, Font, ImageFit};
use crate::convert::ConvertOptions;
use crate::error::Result;
use crate::model::{Block, Content, ImageData};
use crate::raster::EmbeddedImage;

/// Heading sizes relative to a 12pt body, by level.
const HEADING_SCALE: [f32; 6] = [2.0, 1.667, 1.333, 1.167, 1.083, 1.0];
const LIST_INDENT: f32 = 18.0;
const QUOTE_INDENT: f32 = 20.0;
const MONO_SCALE: f32 = 0.9;

/// A drawing operation on a page. Coordinates are PDF user space (origin bottom-left).
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    /// A single line of WinAnsi-safe text with its baseline at `y`.
    Text {
        font: Font,
        size: f32,
        x: f32,
        y: f32,
        text: String,
    },
    /// An image XObject; `image` indexes [`LaidOutDocument::images`].
    Image {
        image: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    /// A stroked horizontal line.
    Rule { x1: f32, x2: f32, y: f32, width: f32 },
}

/// One laid-out page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub width: f32,
    pub height: f32,
    pub ops: Vec<DrawOp>,
}

impl PageLayout {
    fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    /// Whether nothing is drawn on the page.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Text of all text operations, one per line.
    pub fn text(&self) -> String {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Result of laying out a document.
#[derive(Debug, Clone)]
pub struct LaidOutDocument {
    pub pages: Vec<PageLayout>,
    pub images: Vec<EmbeddedImage>,
}

impl LaidOutDocument {
    /// Number of pages.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }
}

/// Layout engine state.
pub struct Layout<'a> {
    options: &'a ConvertOptions,
    page_width: f32,
    page_height: f32,
    pages: Vec<PageLayout>,
    current: PageLayout,
    cursor: f32,
    images: Vec<EmbeddedImage>,
}

impl<'a> Layout<'a> {
    /// Create a layout engine for the given options.
    pub fn new(options: &'a ConvertOptions) -> Self {
        let (page_width, page_height) = options.page_size.oriented(options.orientation);
        Self {
            options,
            page_width,
            page_height,
            pages: Vec::new(),
            current: PageLayout::new(page_width, page_height),
            cursor: page_height - options.margins.top,
            images: Vec::new(),
        }
    }

    /// Lay out extracted content.
    ///
    /// Content consisting of a single image is placed on its own page
    /// according to [`ImageFit`]; image errors are fatal in that case. Inline
    /// images that fail to decode are skipped with a warning.
    pub fn run(options: &'a ConvertOptions, content: &Content) -> Result<LaidOutDocument> {
        let mut layout = Self::new(options);

        if let [Block::Image(image)] = content.blocks.as_slice() {
            layout.standalone_image(image)?;
            return Ok(layout.finish());
        }

        for block in &content.blocks {
            layout.add_block(block);
        }
        Ok(layout.finish())
    }

    fn content_width(&self) -> f32 {
        (self.page_width - self.options.margins.left - self.options.margins.right).max(1.0)
    }

    fn content_height(&self) -> f32 {
        (self.page_height - self.options.margins.top - self.options.margins.bottom).max(1.0)
    }

    fn top(&self) -> f32 {
        self.page_height - self.options.margins.top
    }

    fn at_page_top(&self) -> bool {
        self.current.is_empty()
    }

    fn new_page(&mut self) {
        let next = PageLayout::new(self.page_width, self.page_height);
        let done = std::mem::replace(&mut self.current, next);
        self.pages.push(done);
        self.cursor = self.top();
    }

    /// Start a new page unless `needed` points fit above the bottom margin.
    fn ensure_space(&mut self, needed: f32) {
        if !self.at_page_top() && self.cursor - needed < self.options.margins.bottom {
            self.new_page();
        }
    }

    fn gap(&mut self, amount: f32) {
        if !self.at_page_top() {
            self.cursor -= amount;
        }
    }

    fn line_advance(&self, size: f32) -> f32 {
        size * self.options.line_height
    }

    fn draw_lines(&mut self, lines: &[String], font: Font, size: f32, x: f32) {
        let advance = self.line_advance(size);
        for line in lines {
            self.ensure_space(advance);
            let baseline = self.cursor - size;
            if !line.is_empty() {
                self.current.ops.push(DrawOp::Text {
                    font,
                    size,
                    x,
                    y: baseline,
                    text: line.clone(),
                });
            } else if self.at_page_top() {
                // Keep leading blank lines from vanishing at a page top.
                self.current.ops.push(DrawOp::Text {
                    font,
                    size,
                    x,
                    y: baseline,
                    text: String::new(),
                });
            }
            self.cursor -= advance;
        }
    }

    fn add_block(&mut self, block: &Block) {
        let base = self.options.font_size;
        let left = self.options.margins.left;
        let width = self.content_width();

        match block {
            Block::Heading { level, text } => {
                let index = (*level).clamp(1, 6) as usize - 1;
                let size = base * HEADING_SCALE[index];
                let lines = wrap_text(&to_win_ansi(text), Font::HelveticaBold, size, width);
                self.gap(size * 0.6);
                // Keep a heading with at least one following body line.
                let needed = self.line_advance(size) * lines.len() as f32 + self.line_advance(base);
                self.ensure_space(needed.min(self.content_height()));
                self.draw_lines(&lines, Font::HelveticaBold, size, left);
                self.cursor -= size * 0.3;
            }
            Block::Paragraph { text } => {
                let lines = wrap_text(&to_win_ansi(text), Font::Helvetica, base, width);
                self.draw_lines(&lines, Font::Helvetica, base, left);
                self.cursor -= base * 0.5;
            }
            Block::ListItem {
                depth,
                ordered,
                text,
            } => {
                let indent = LIST_INDENT * (*depth as f32 + 1.0);
                let marker = match ordered {
                    Some(n) => format!("{}.", n),
                    None => "•".to_string(),
                };
                let text_width = (width - indent).max(base);
                let lines = wrap_text(&to_win_ansi(text), Font::Helvetica, base, text_width);
                self.ensure_space(self.line_advance(base));
                let marker_width = Font::Helvetica.text_width(&marker, base);
                let marker_x = (left + indent - marker_width - base * 0.4).max(left);
                self.current.ops.push(DrawOp::Text {
                    font: Font::Helvetica,
                    size: base,
                    x: marker_x,
                    y: self.cursor - base,
                    text: marker,
                });
                self.draw_lines(&lines, Font::Helvetica, base, left + indent);
                self.cursor -= base * 0.25;
            }
            Block::Preformatted { text } => {
                let size = base * MONO_SCALE;
                let max_chars = (width / (Font::Courier.char_width(' ') as f32 * size / 1000.0))
                    .floor() as usize;
                let sanitized = to_win_ansi(text);
                let lines: Vec<String> = sanitized
                    .split('\n')
                    .flat_map(|line| wrap_fixed(line, max_chars))
                    .collect();
                self.draw_lines(&lines, Font::Courier, size, left);
                self.cursor -= base * 0.5;
            }
            Block::Quote { text } => {
                let lines = wrap_text(
                    &to_win_ansi(text),
                    Font::HelveticaOblique,
                    base,
                    (width - QUOTE_INDENT).max(base),
                );
                self.draw_lines(&lines, Font::HelveticaOblique, base, left + QUOTE_INDENT);
                self.cursor -= base * 0.5;
            }
            Block::Rule => {
                self.ensure_space(base);
                let y = self.cursor - base * 0.5;
                self.current.ops.push(DrawOp::Rule {
                    x1: left,
                    x2: left + width,
                    y,
                    width: 0.75,
                });
                self.cursor -= base;
            }
            Block::PageBreak => {
                if !self.at_page_top() {
                    self.new_page();
                }
            }
            Block::Image(image) => self.inline_image(image),
        }
    }

    fn inline_image(&mut self, image: &ImageData) {
        let embedded = match EmbeddedImage::from_image_data(image) {
            Ok(embedded) => embedded,
            Err(e) => {
                log::warn!("Skipping {} image: {}", image.format, e);
                return;
            }
        };
        let (width, height) = embedded.fit_within(self.content_width(), self.content_height());
        let spacing = self.options.font_size * 0.5;
        self.ensure_space(height + spacing);

        let x = self.options.margins.left + (self.content_width() - width) / 2.0;
        let y = self.cursor - height;
        let index = self.push_image(embedded);
        self.current.ops.push(DrawOp::Image {
            image: index,
            x,
            y,
            width,
            height,
        });
        self.cursor = y - spacing;
    }

    fn standalone_image(&mut self, image: &ImageData) -> Result<()> {
        let embedded = EmbeddedImage::from_image_data(image)?;
        let op = match self.options.image_fit {
            ImageFit::ImageSize => {
                let (width, height) = embedded.natural_size();
                self.page_width = width;
                self.page_height = height;
                self.current = PageLayout::new(width, height);
                (0.0, 0.0, width, height)
            }
            ImageFit::FitPage => {
                let (width, height) =
                    embedded.fit_within(self.content_width(), self.content_height());
                let x = self.options.margins.left + (self.content_width() - width) / 2.0;
                let y = self.options.margins.bottom + (self.content_height() - height) / 2.0;
                (x, y, width, height)
            }
        };
        let index = self.push_image(embedded);
        self.current.ops.push(DrawOp::Image {
            image: index,
            x: op.0,
            y: op.1,
            width: op.2,
            height: op.3,
        });
        Ok(())
    }

    fn push_image(&mut self, image: EmbeddedImage) -> usize {
        self.images.push(image);
        self.images.len() - 1
    }

    /// Close the current page and return the finished document. An empty
    /// document still has one (blank) page.
    pub fn finish(mut self) -> LaidOutDocument {
        if !self.current.is_empty() || self.pages.is_empty() {
            let last = PageLayout::new(self.page_width, self.page_height);
            self.pages.push(std::mem::replace(&mut self.current, last));
        }
        LaidOutDocument {
            pages: self.pages,
            images: self.images,
        }
    }
}
