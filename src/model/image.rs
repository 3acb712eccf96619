//! Raster images carried through the content model.

use crate::detect::SourceFormat;
use serde::{Deserialize, Serialize};

/// An encoded raster image (JPEG, PNG, ...).
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageData {
    /// Encoded format.
    pub format: SourceFormat,

    /// Encoded bytes.
    #[serde(skip)]
    pub bytes: Vec<u8>,

    /// Alternative text, if the source provided one.
    pub alt: Option<String>,
}

impl ImageData {
    /// Wrap encoded image bytes.
    pub fn new(format: SourceFormat, bytes: Vec<u8>) -> Self {
        Self {
            format,
            bytes,
            alt: None,
        }
    }

    /// Sniff the format from the bytes. Returns `None` for non-image data.
    pub fn sniff(bytes: Vec<u8>) -> Option<Self> {
        let format = crate::detect::detect_from_bytes(&bytes, None)?;
        format.is_image().then(|| Self::new(format, bytes))
    }

    /// Set the alternative text.
    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        let alt = alt.into();
        if !alt.trim().is_empty() {
            self.alt = Some(alt);
        }
        self
    }
}

impl std::fmt::Debug for ImageData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageData")
            .field("format", &self.format)
            .field("len", &self.bytes.len())
            .field("alt", &self.alt)
            .finish()
    }
}
