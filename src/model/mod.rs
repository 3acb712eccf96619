//! Content model shared by all converters.
//!
//! Leaf converters extract a source document into [`Content`], a flat list of
//! [`Block`]s that the layout engine turns into PDF pages.

mod content;
mod image;
mod slide;

pub use content::{Block, Content};
pub use image::ImageData;
pub use slide::Slide;
