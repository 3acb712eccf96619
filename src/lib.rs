//! # docpdf
//!
//! Convert documents to PDF and edit PDF metadata.
//!
//! Images, plain text, Markdown, HTML, RTF, Word (DOCX/DOC), OpenDocument
//! text and presentations (ODT/ODP), PowerPoint (PPTX/PPT) and EPUB are
//! converted into paginated PDFs. Existing PDFs can have their document
//! information read, written, stripped or copied.
//!
//! ## Quick Start
//!
//! ```no_run
//! use docpdf::{convert_to_pdf, InputFile};
//!
//! fn main() -> docpdf::Result<()> {
//!     let input = InputFile::from_path("report.docx")?;
//!     let pdf = convert_to_pdf(&input, None, Some(&|p: u8| println!("{p}%")))?;
//!     pdf.save(&pdf.name)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Metadata
//!
//! ```no_run
//! use docpdf::{read_metadata, write_metadata, PdfMetadata};
//!
//! fn main() -> docpdf::Result<()> {
//!     let pdf = std::fs::read("report.pdf")?;
//!     let updated = write_metadata(&pdf, &PdfMetadata::new().with_title("Q3 Report"))?;
//!     assert_eq!(read_metadata(&updated)?.title.as_deref(), Some("Q3 Report"));
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Format detection**: MIME type, extension and magic bytes
//! - **Layout**: A4/Letter/custom pages, margins, word wrap, headings, lists
//! - **Images**: JPEG passthrough, lossless embedding for other rasters
//! - **Parallel processing**: Batch conversion with Rayon
//! - **Async**: `convert_file_async` behind the `async` feature

pub mod convert;
pub mod detect;
pub mod error;
pub mod input;
pub mod layout;
pub mod metadata;
pub mod model;
pub mod raster;
pub mod writer;

// Re-export commonly used types
pub use convert::{
    convert_batch, convert_to_pdf, ConvertOptions, Converter, ConverterRegistry,
    DocumentConverter, ProgressFn,
};
pub use detect::{detect_format, is_supported, FormatCategory, SourceFormat};
pub use error::{Error, Result};
pub use input::{InputFile, PdfFile};
pub use layout::{ImageFit, Margins, Orientation, PageSize};
pub use metadata::{copy_metadata, read_metadata, remove_metadata, write_metadata, PdfMetadata};
pub use model::{Block, Content, ImageData};

use std::path::Path;

/// Convert a file on disk with default options.
///
/// # Example
///
/// ```no_run
/// let pdf = docpdf::convert_file("slides.pptx").unwrap();
/// println!("{} pages", pdf.page_count);
/// ```
pub fn convert_file<P: AsRef<Path>>(path: P) -> Result<PdfFile> {
    Converter::new().convert_file(path)
}

/// Convert a file on disk without blocking the async runtime.
///
/// The file is read with `tokio::fs` and converted on the blocking pool.
#[cfg(feature = "async")]
pub async fn convert_file_async<P: AsRef<Path>>(
    path: P,
    options: ConvertOptions,
) -> Result<PdfFile> {
    let path = path.as_ref();
    let data = tokio::fs::read(path).await?;
    let mut file = InputFile::from_bytes(
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string()),
        data,
    );
    if let Some(format) = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(detect::detect_from_extension)
    {
        file = file.with_mime_type(format.mime_type());
    }

    tokio::task::spawn_blocking(move || {
        Converter::new()
            .with_options(options)
            .convert(&file, None, None)
    })
    .await
    .map_err(|e| Error::Other(format!("Conversion task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_file_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.md");
        std::fs::write(&path, "# Notes\n\nSome *text*.").unwrap();

        let pdf = convert_file(&path).unwrap();
        assert_eq!(pdf.name, "notes.pdf");
        assert_eq!(pdf.page_count, 1);
        assert!(pdf.data.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_convert_file_missing() {
        let result = convert_file("/nonexistent/file.md");
        assert!(matches!(result, Err(Error::Io(_))));
    }

    // ==================== Edge Case Tests ====================

    #[test]
    fn test_unknown_format_rejected() {
        let file = InputFile::from_bytes("archive.xyz", vec![0x00, 0x01, 0x02, 0xFF]);
        let result = convert_to_pdf(&file, None, None);
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_pdf_input_is_not_convertible() {
        let file = InputFile::from_bytes("already.pdf", b"%PDF-1.4\n%%EOF".to_vec());
        assert!(convert_to_pdf(&file, None, None).is_err());
    }

    #[test]
    fn test_converted_pdf_carries_metadata() {
        let file = InputFile::from_bytes("a.txt", b"hello".to_vec());
        let options = ConvertOptions::new().with_title("Greeting").with_author("Ana");
        let pdf = Converter::new()
            .with_options(options)
            .convert(&file, None, None)
            .unwrap();

        let meta = read_metadata(&pdf.data).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Greeting"));
        assert_eq!(meta.author.as_deref(), Some("Ana"));
        assert!(meta.producer.unwrap().starts_with("docpdf"));
        assert!(meta.creation_date.is_some());
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_convert_file_async() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.html");
        std::fs::write(&path, "<h1>Hi</h1><p>there</p>").unwrap();

        let pdf = convert_file_async(&path, ConvertOptions::default()).await.unwrap();
        assert_eq!(pdf.name, "page.pdf");
        assert_eq!(pdf.page_count, 1);
    }
}
