//! Page geometry and the block layout engine.

mod engine;
mod font;
mod wrap;

pub use engine::{DrawOp, LaidOutDocument, Layout, PageLayout};
pub use font::{encode_win_ansi, to_win_ansi, win_ansi_byte, win_ansi_char, Font};
pub use wrap::{wrap_fixed, wrap_text};

use serde::{Deserialize, Serialize};

/// Page size in points.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// ISO A4 (210 x 297 mm).
    #[default]
    A4,
    /// US Letter (8.5 x 11 in).
    Letter,
    /// Arbitrary width and height in points.
    Custom(f32, f32),
}

impl PageSize {
    /// Portrait width and height in points.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Custom(w, h) => (*w, *h),
        }
    }

    /// Width and height for the given orientation.
    pub fn oriented(&self, orientation: Orientation) -> (f32, f32) {
        let (w, h) = self.dimensions();
        match orientation {
            Orientation::Portrait => (w.min(h), w.max(h)),
            Orientation::Landscape => (w.max(h), w.min(h)),
        }
    }
}

impl std::str::FromStr for PageSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a4" => Ok(PageSize::A4),
            "letter" => Ok(PageSize::Letter),
            other => {
                let (w, h) = other
                    .split_once('x')
                    .ok_or_else(|| format!("unknown page size: {}", s))?;
                let w: f32 = w.trim().parse().map_err(|_| format!("invalid width: {}", w))?;
                let h: f32 = h.trim().parse().map_err(|_| format!("invalid height: {}", h))?;
                if w <= 0.0 || h <= 0.0 {
                    return Err(format!("page size must be positive: {}", s));
                }
                Ok(PageSize::Custom(w, h))
            }
        }
    }
}

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page margins in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    /// Same margin on all four sides.
    pub fn uniform(value: f32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(50.0)
    }
}

/// How a standalone image is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFit {
    /// Standard page, image scaled down to fit the margins and centred.
    #[default]
    FitPage,
    /// Page sized exactly to the image.
    ImageSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_orientation() {
        assert_eq!(PageSize::A4.oriented(Orientation::Portrait), (595.28, 841.89));
        assert_eq!(PageSize::A4.oriented(Orientation::Landscape), (841.89, 595.28));
        assert_eq!(
            PageSize::Custom(300.0, 200.0).oriented(Orientation::Portrait),
            (200.0, 300.0)
        );
    }

    #[test]
    fn test_page_size_parse() {
        assert_eq!("A4".parse::<PageSize>().unwrap(), PageSize::A4);
        assert_eq!("letter".parse::<PageSize>().unwrap(), PageSize::Letter);
        assert_eq!(
            "400x600".parse::<PageSize>().unwrap(),
            PageSize::Custom(400.0, 600.0)
        );
        assert!("huge".parse::<PageSize>().is_err());
        assert!("0x10".parse::<PageSize>().is_err());
    }
}
