//! PDF assembly from laid-out pages.

use crate::error::Result;
use crate::layout::{encode_win_ansi, DrawOp, Font, LaidOutDocument, PageLayout};
use crate::metadata::{encode_text_string, format_pdf_date, PdfMetadata};
use crate::raster::{EmbeddedImage, ImageFilter};
use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

/// Default `/Producer` entry.
pub const PRODUCER: &str = concat!("docpdf ", env!("CARGO_PKG_VERSION"));

/// Builds a PDF document page by page.
pub struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    fonts: Dictionary,
    images: Vec<ObjectId>,
}

impl PdfWriter {
    /// Create a writer with the standard fonts registered.
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for font in Font::ALL {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource_name(), font_id);
        }

        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            fonts,
            images: Vec::new(),
        }
    }

    /// Add an image XObject and return its index for [`DrawOp::Image`].
    pub fn add_image(&mut self, image: &EmbeddedImage) -> usize {
        let color_space = image.color_space.pdf_name();
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8,
            "Filter" => image.filter.pdf_name(),
        };

        if let Some(alpha) = &image.alpha {
            let mask = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => image.width as i64,
                    "Height" => image.height as i64,
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                    "Filter" => ImageFilter::Flate.pdf_name(),
                },
                alpha.clone(),
            )
            .with_compression(false);
            let mask_id = self.doc.add_object(mask);
            dict.set("SMask", mask_id);
        }

        let stream = Stream::new(dict, image.data.clone()).with_compression(false);
        let id = self.doc.add_object(stream);
        self.images.push(id);
        self.images.len() - 1
    }

    /// Render a laid-out page.
    pub fn add_page(&mut self, page: &PageLayout) -> Result<()> {
        let mut operations = Vec::new();
        let mut xobjects = Dictionary::new();

        for op in &page.ops {
            match op {
                DrawOp::Text {
                    font,
                    size,
                    x,
                    y,
                    text,
                } => {
                    if text.is_empty() {
                        continue;
                    }
                    operations.push(Operation::new("BT", vec![]));
                    operations.push(Operation::new(
                        "Tf",
                        vec![font.resource_name().into(), (*size).into()],
                    ));
                    operations.push(Operation::new("Td", vec![(*x).into(), (*y).into()]));
                    operations.push(Operation::new(
                        "Tj",
                        vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                    ));
                    operations.push(Operation::new("ET", vec![]));
                }
                DrawOp::Image {
                    image,
                    x,
                    y,
                    width,
                    height,
                } => {
                    let Some(id) = self.images.get(*image) else {
                        log::warn!("Page references unknown image {}", image);
                        continue;
                    };
                    let name = format!("Im{}", image + 1);
                    xobjects.set(name.as_str(), *id);
                    operations.push(Operation::new("q", vec![]));
                    operations.push(Operation::new(
                        "cm",
                        vec![
                            (*width).into(),
                            0.into(),
                            0.into(),
                            (*height).into(),
                            (*x).into(),
                            (*y).into(),
                        ],
                    ));
                    operations.push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
                    operations.push(Operation::new("Q", vec![]));
                }
                DrawOp::Rule { x1, x2, y, width } => {
                    operations.push(Operation::new("q", vec![]));
                    operations.push(Operation::new("w", vec![(*width).into()]));
                    operations.push(Operation::new("m", vec![(*x1).into(), (*y).into()]));
                    operations.push(Operation::new("l", vec![(*x2).into(), (*y).into()]));
                    operations.push(Operation::new("S", vec![]));
                    operations.push(Operation::new("Q", vec![]));
                }
            }
        }

        let content = Content { operations };
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));

        let mut resources = dictionary! {
            "Font" => self.fonts.clone(),
        };
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), page.width.into(), page.height.into()],
            "Contents" => content_id,
            "Resources" => resources,
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    /// Number of pages added so far.
    pub fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    /// Write the page tree, catalog and Info dictionary, and serialise.
    ///
    /// The producer defaults to [`PRODUCER`]; creation and modification dates
    /// default to now.
    pub fn finish(mut self, metadata: &PdfMetadata) -> Result<Vec<u8>> {
        let kids: Vec<Object> = self.page_ids.iter().map(|id| (*id).into()).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let now = Utc::now().fixed_offset();
        let mut info = dictionary! {
            "Producer" => encode_text_string(PRODUCER),
            "CreationDate" => encode_text_string(&format_pdf_date(&now)),
            "ModDate" => encode_text_string(&format_pdf_date(&now)),
        };
        metadata.apply_to(&mut info);
        let info_id = self.doc.add_object(info);
        self.doc.trailer.set("Info", info_id);

        self.doc.compress();
        let mut buf = Vec::new();
        self.doc.save_to(&mut buf)?;
        Ok(buf)
    }
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a laid-out document to PDF bytes.
pub fn write_document(layout: &LaidOutDocument, metadata: &PdfMetadata) -> Result<Vec<u8>> {
    let mut writer = PdfWriter::new();
    for image in &layout.images {
        writer.add_image(image);
    }
    for page in &layout.pages {
        writer.add_page(page)?;
    }
    writer.finish(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PageLayout;
    use crate::raster::ColorSpace;

    fn text_page() -> PageLayout {
        PageLayout {
            width: 595.28,
            height: 841.89,
            ops: vec![DrawOp::Text {
                font: Font::Helvetica,
                size: 12.0,
                x: 50.0,
                y: 780.0,
                text: "Hello".to_string(),
            }],
        }
    }

    #[test]
    fn test_writes_loadable_pdf() {
        let mut writer = PdfWriter::new();
        writer.add_page(&text_page()).unwrap();
        writer.add_page(&text_page()).unwrap();
        assert_eq!(writer.page_count(), 2);

        let bytes = writer.finish(&PdfMetadata::new().with_title("T")).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
    }

    #[test]
    fn test_default_producer_and_dates() {
        let mut writer = PdfWriter::new();
        writer.add_page(&text_page()).unwrap();
        let bytes = writer.finish(&PdfMetadata::new()).unwrap();

        let meta = crate::metadata::read_metadata(&bytes).unwrap();
        assert_eq!(meta.producer.as_deref(), Some(PRODUCER));
        assert!(meta.creation_date.is_some());
        assert!(meta.modification_date.is_some());
    }

    #[test]
    fn test_alpha_image_emits_smask() {
        let image = EmbeddedImage {
            width: 2,
            height: 1,
            color_space: ColorSpace::Rgb,
            filter: ImageFilter::Flate,
            data: crate::raster::deflate(&[255, 0, 0, 0, 255, 0]).unwrap(),
            alpha: Some(crate::raster::deflate(&[0, 255]).unwrap()),
        };
        let mut writer = PdfWriter::new();
        let index = writer.add_image(&image);
        let page = PageLayout {
            width: 100.0,
            height: 100.0,
            ops: vec![DrawOp::Image {
                image: index,
                x: 0.0,
                y: 0.0,
                width: 1.5,
                height: 0.75,
            }],
        };
        writer.add_page(&page).unwrap();
        let bytes = writer.finish(&PdfMetadata::new()).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let mask_id = doc
            .objects
            .values()
            .find_map(|obj| match obj {
                Object::Stream(s) if s.dict.has(b"SMask") => {
                    s.dict.get(b"SMask").and_then(Object::as_reference).ok()
                }
                _ => None,
            })
            .expect("image with /SMask");
        let mask = doc.get_object(mask_id).unwrap().as_stream().unwrap();
        assert_eq!(mask.dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceGray");
        assert_eq!(mask.dict.get(b"Width").unwrap().as_i64().unwrap(), 2);
    }

    #[test]
    fn test_producer_override() {
        let mut writer = PdfWriter::new();
        writer.add_page(&text_page()).unwrap();
        let meta = PdfMetadata {
            producer: Some("Acme".into()),
            ..Default::default()
        };
        let bytes = writer.finish(&meta).unwrap();
        let read = crate::metadata::read_metadata(&bytes).unwrap();
        assert_eq!(read.producer.as_deref(), Some("Acme"));
    }
}
