//! Raster image converter. The image becomes a single page.

use super::{ConvertOptions, DocumentConverter};
use crate::detect::{detect_format, SourceFormat};
use crate::error::{Error, Result};
use crate::input::InputFile;
use crate::model::{Block, Content, ImageData};

/// Image converter for JPEG, PNG, GIF, BMP, WebP and TIFF.
#[derive(Debug, Clone, Default)]
pub struct ImageConverter {
    _private: (),
}

impl ImageConverter {
    /// Create a new image converter.
    pub fn new() -> Self {
        Self { _private: () }
    }
}

impl DocumentConverter for ImageConverter {
    fn name(&self) -> &str {
        "image"
    }

    fn formats(&self) -> &[SourceFormat] {
        &[
            SourceFormat::Jpeg,
            SourceFormat::Png,
            SourceFormat::Gif,
            SourceFormat::Bmp,
            SourceFormat::Webp,
            SourceFormat::Tiff,
        ]
    }

    fn extract(&self, file: &InputFile, _options: &ConvertOptions) -> Result<Content> {
        if file.is_empty() {
            return Err(Error::InvalidDocument("empty image".into()));
        }
        // Trust the bytes over the name when they disagree.
        let image = match ImageData::sniff(file.data.clone()) {
            Some(image) => image,
            None => {
                let format = detect_format(file)?;
                if !format.is_image() {
                    return Err(Error::UnsupportedFormat(format!(
                        "{} is not an image",
                        file.name
                    )));
                }
                ImageData::new(format, file.data.clone())
            }
        };
        Ok(Content::single(Block::Image(image)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_image_block() {
        let mut png = Vec::new();
        image::DynamicImage::ImageLuma8(image::GrayImage::new(4, 4))
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        // Misleading extension: the bytes decide.
        let file = InputFile::from_bytes("photo.jpg", png);
        let content = ImageConverter::new()
            .extract(&file, &ConvertOptions::default())
            .unwrap();
        match content.blocks.as_slice() {
            [Block::Image(image)] => assert_eq!(image.format, SourceFormat::Png),
            other => panic!("unexpected blocks: {other:?}"),
        }
    }

    #[test]
    fn test_empty_image_rejected() {
        let file = InputFile::from_bytes("empty.png", Vec::new());
        assert!(ImageConverter::new()
            .extract(&file, &ConvertOptions::default())
            .is_err());
    }

    #[test]
    fn test_text_is_not_an_image() {
        let file = InputFile::from_bytes("notes.txt", b"hello".to_vec());
        let err = ImageConverter::new()
            .extract(&file, &ConvertOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }
}
