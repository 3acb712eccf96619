//! Raster image preparation for PDF embedding.
//!
//! JPEG data is passed through untouched (`/DCTDecode`). Every other format is
//! decoded and stored as zlib-compressed 8-bit samples (`/FlateDecode`), with
//! any alpha channel split out into a soft mask.

use crate::detect::SourceFormat;
use crate::error::{Error, Result};
use crate::model::ImageData;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::{DynamicImage, ImageFormat};
use std::io::Write;

/// Points per pixel, assuming 96 dpi.
pub const POINTS_PER_PIXEL: f32 = 0.75;

/// Device colour space of embedded samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
}

impl ColorSpace {
    /// PDF colour space name.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::Gray => "DeviceGray",
            ColorSpace::Rgb => "DeviceRGB",
        }
    }
}

/// Stream filter applied to embedded samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFilter {
    Dct,
    Flate,
}

impl ImageFilter {
    /// PDF filter name.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ImageFilter::Dct => "DCTDecode",
            ImageFilter::Flate => "FlateDecode",
        }
    }
}

/// An image ready to be written as a PDF image XObject.
#[derive(Clone)]
pub struct EmbeddedImage {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    pub filter: ImageFilter,
    /// Encoded sample data.
    pub data: Vec<u8>,
    /// Zlib-compressed 8-bit alpha samples, if the image is not fully opaque.
    pub alpha: Option<Vec<u8>>,
}

impl std::fmt::Debug for EmbeddedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("color_space", &self.color_space)
            .field("filter", &self.filter)
            .field("len", &self.data.len())
            .field("alpha", &self.alpha.is_some())
            .finish()
    }
}

impl EmbeddedImage {
    /// Prepare an image from the content model.
    pub fn from_image_data(image: &ImageData) -> Result<Self> {
        Self::from_bytes(image.format, &image.bytes)
    }

    /// Prepare encoded image bytes of the given format.
    pub fn from_bytes(format: SourceFormat, bytes: &[u8]) -> Result<Self> {
        if format == SourceFormat::Jpeg {
            if let Some(image) = Self::from_jpeg(bytes) {
                return Ok(image);
            }
            log::debug!("JPEG is not embeddable as-is, re-encoding");
        }
        let image_format = image_format(format)
            .ok_or_else(|| Error::UnsupportedFormat(format!("{} is not an image", format)))?;
        let decoded = image::load_from_memory_with_format(bytes, image_format)?;
        Self::from_decoded(&decoded)
    }

    /// Pass-through embedding for baseline/progressive Gray or RGB JPEGs.
    fn from_jpeg(bytes: &[u8]) -> Option<Self> {
        let header = read_jpeg_header(bytes)?;
        let color_space = match header.components {
            1 => ColorSpace::Gray,
            3 => ColorSpace::Rgb,
            // CMYK and friends need an inverted decode array; re-encode instead.
            _ => return None,
        };
        if header.width == 0 || header.height == 0 {
            return None;
        }
        Some(Self {
            width: header.width as u32,
            height: header.height as u32,
            color_space,
            filter: ImageFilter::Dct,
            data: bytes.to_vec(),
            alpha: None,
        })
    }

    /// Embed decoded pixels.
    pub fn from_decoded(image: &DynamicImage) -> Result<Self> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(Error::Other("image has zero size".into()));
        }

        let color = image.color();
        let (color_space, samples) = if color.has_color() {
            (ColorSpace::Rgb, image.to_rgb8().into_raw())
        } else {
            (ColorSpace::Gray, image.to_luma8().into_raw())
        };

        let alpha = if color.has_alpha() {
            let alpha: Vec<u8> = image.to_rgba8().pixels().map(|p| p.0[3]).collect();
            if alpha.iter().all(|a| *a == u8::MAX) {
                None
            } else {
                Some(deflate(&alpha)?)
            }
        } else {
            None
        };

        Ok(Self {
            width,
            height,
            color_space,
            filter: ImageFilter::Flate,
            data: deflate(&samples)?,
            alpha,
        })
    }

    /// Natural size in points.
    pub fn natural_size(&self) -> (f32, f32) {
        (
            self.width as f32 * POINTS_PER_PIXEL,
            self.height as f32 * POINTS_PER_PIXEL,
        )
    }

    /// Size in points that fits inside `max_width` x `max_height`, preserving
    /// aspect ratio and never enlarging beyond the natural size.
    pub fn fit_within(&self, max_width: f32, max_height: f32) -> (f32, f32) {
        let (width, height) = self.natural_size();
        let scale = (max_width / width).min(max_height / height).min(1.0);
        (width * scale, height * scale)
    }
}

fn image_format(format: SourceFormat) -> Option<ImageFormat> {
    match format {
        SourceFormat::Jpeg => Some(ImageFormat::Jpeg),
        SourceFormat::Png => Some(ImageFormat::Png),
        SourceFormat::Gif => Some(ImageFormat::Gif),
        SourceFormat::Bmp => Some(ImageFormat::Bmp),
        SourceFormat::Webp => Some(ImageFormat::WebP),
        SourceFormat::Tiff => Some(ImageFormat::Tiff),
        _ => None,
    }
}

/// Zlib-compress bytes.
pub(crate) fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Frame header fields of a JPEG stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct JpegHeader {
    width: u16,
    height: u16,
    components: u8,
}

/// Scan JPEG markers up to the first start-of-frame segment.
fn read_jpeg_header(data: &[u8]) -> Option<JpegHeader> {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut pos = 2;
    loop {
        // Skip to the next marker, tolerating fill bytes.
        while *data.get(pos)? != 0xFF {
            pos += 1;
        }
        while *data.get(pos)? == 0xFF {
            pos += 1;
        }
        let marker = *data.get(pos)?;
        pos += 1;

        match marker {
            0x01 | 0xD0..=0xD7 => continue,
            0xD9 | 0xDA => return None,
            _ => {}
        }

        let len = u16::from_be_bytes([*data.get(pos)?, *data.get(pos + 1)?]) as usize;
        let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            let segment = data.get(pos + 2..pos + 8)?;
            return Some(JpegHeader {
                height: u16::from_be_bytes([segment[1], segment[2]]),
                width: u16::from_be_bytes([segment[3], segment[4]]),
                components: segment[5],
            });
        }
        if len < 2 {
            return None;
        }
        pos += len;
    }
}
