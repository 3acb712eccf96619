//! Error types for docpdf library.

use std::io;
use thiserror::Error;

/// Result type alias for docpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during conversion and metadata editing.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input format could not be detected or has no converter.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The input is expected to be a PDF but is not.
    #[error("Not a PDF document")]
    NotPdf,

    /// Error from the PDF object model.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Error decoding a raster image.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Error reading a ZIP container (DOCX, ODT, PPTX, ODP, EPUB).
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Error parsing an XML part.
    #[error("XML parse error: {0}")]
    Xml(String),

    /// The document is structurally invalid (missing required part, etc.).
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A PDF date string could not be parsed.
    #[error("Invalid PDF date: {0}")]
    InvalidDate(String),

    /// A leaf converter failed.
    #[error("Failed to convert {format} to PDF: {source}")]
    Conversion {
        /// Name of the source format.
        format: &'static str,
        /// Underlying failure.
        #[source]
        source: Box<Error>,
    },

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap an error raised while converting the given format.
    pub fn conversion(format: &'static str, source: Error) -> Self {
        match source {
            // Never double-wrap.
            Error::Conversion { .. } => source,
            other => Error::Conversion {
                format,
                source: Box::new(other),
            },
        }
    }
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            _ => Error::Pdf(err.to_string()),
        }
    }
}

impl From<roxmltree::Error> for Error {
    fn from(err: roxmltree::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotPdf;
        assert_eq!(err.to_string(), "Not a PDF document");

        let err = Error::UnsupportedFormat("report.xyz".into());
        assert_eq!(err.to_string(), "Unsupported file format: report.xyz");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_conversion_wraps_once() {
        let inner = Error::InvalidDocument("missing word/document.xml".into());
        let err = Error::conversion("DOCX", inner);
        assert_eq!(
            err.to_string(),
            "Failed to convert DOCX to PDF: Invalid document: missing word/document.xml"
        );

        let rewrapped = Error::conversion("EPUB", err);
        assert!(matches!(rewrapped, Error::Conversion { format: "DOCX", .. }));
    }
}
