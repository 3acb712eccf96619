//! Tests for the converter registry and the conversion dispatcher.

use docpdf::convert::{ConvertOptions, Converter, ConverterRegistry, DocumentConverter};
use docpdf::{Block, Content, Error, InputFile, Result, SourceFormat};
use std::sync::{Arc, Mutex};

/// A mock converter for testing.
struct MockConverter {
    formats: Vec<SourceFormat>,
    name: String,
}

impl MockConverter {
    fn new(formats: Vec<SourceFormat>, name: &str) -> Self {
        Self {
            formats,
            name: name.to_string(),
        }
    }
}

impl DocumentConverter for MockConverter {
    fn name(&self) -> &str {
        &self.name
    }

    fn formats(&self) -> &[SourceFormat] {
        &self.formats
    }

    fn extract(&self, file: &InputFile, _options: &ConvertOptions) -> Result<Content> {
        let mut content = Content::new();
        content.push(Block::heading(1, format!("Converted by {}", self.name)));
        content.push(Block::paragraph(file.name.clone()));
        Ok(content)
    }
}

/// A converter that always fails.
struct FailingConverter;

impl DocumentConverter for FailingConverter {
    fn name(&self) -> &str {
        "failing"
    }

    fn formats(&self) -> &[SourceFormat] {
        &[SourceFormat::Docx]
    }

    fn extract(&self, _file: &InputFile, _options: &ConvertOptions) -> Result<Content> {
        Err(Error::InvalidDocument("missing word/document.xml".into()))
    }
}

#[test]
fn test_converter_registry_new() {
    let registry = ConverterRegistry::new();
    assert!(!registry.supports(SourceFormat::Png));
    assert!(registry.supported_formats().is_empty());
}

#[test]
fn test_converter_registry_with_defaults() {
    let registry = ConverterRegistry::with_defaults();

    assert!(registry.supports(SourceFormat::Png));
    assert!(registry.supports(SourceFormat::Markdown));
    assert!(registry.supports(SourceFormat::Docx));
    assert!(registry.supports(SourceFormat::Ppt));
    assert!(registry.supports(SourceFormat::Epub));
    assert!(registry.get_by_name("image").is_some());
}

#[test]
fn test_converter_registry_register() {
    let mut registry = ConverterRegistry::new();
    registry.register(Arc::new(MockConverter::new(
        vec![SourceFormat::Text],
        "mock",
    )));

    assert!(registry.supports(SourceFormat::Text));
    assert!(!registry.supports(SourceFormat::Html));
    assert_eq!(registry.supported_formats(), vec![SourceFormat::Text]);
}

#[test]
fn test_converter_registry_get_by_name() {
    let registry = ConverterRegistry::with_defaults();

    let converter = registry.get_by_name("markdown");
    assert!(converter.is_some());
    assert_eq!(converter.unwrap().name(), "markdown");

    assert!(registry.get_by_name("nonexistent").is_none());
}

#[test]
fn test_multiple_converters() {
    let mut registry = ConverterRegistry::with_defaults();
    registry.register(Arc::new(MockConverter::new(
        vec![SourceFormat::Doc, SourceFormat::Docx],
        "word",
    )));

    assert!(registry.supports(SourceFormat::Doc));
    assert!(registry.supports(SourceFormat::Docx));
    assert_eq!(registry.get(SourceFormat::Docx).unwrap().name(), "word");
    assert_eq!(registry.get(SourceFormat::Odt).unwrap().name(), "odt");

    let converter = registry.get_by_name("word");
    assert!(converter.is_some());
    assert!(converter.unwrap().supports_extension("docx"));
}

#[test]
fn test_supports_extension() {
    let converter = MockConverter::new(vec![SourceFormat::Markdown], "md");

    assert!(converter.supports_extension("md"));
    assert!(converter.supports_extension("MARKDOWN"));
    assert!(!converter.supports_extension("txt"));
    assert!(!converter.supports_extension(""));
}

#[test]
fn test_custom_converter_used_for_conversion() {
    let mut registry = ConverterRegistry::new();
    registry.register(Arc::new(MockConverter::new(
        vec![SourceFormat::Text],
        "mock",
    )));
    let converter = Converter::new().with_registry(registry);

    let file = InputFile::from_bytes("notes.txt", b"ignored".to_vec());
    let pdf = converter.convert(&file, None, None).unwrap();
    assert_eq!(pdf.name, "notes.pdf");
    assert_eq!(pdf.page_count, 1);
}

#[test]
fn test_missing_converter_is_unsupported() {
    let converter = Converter::new().with_registry(ConverterRegistry::new());
    let file = InputFile::from_bytes("notes.txt", b"hello".to_vec());

    let err = converter.convert(&file, None, None).unwrap_err();
    assert!(matches!(err, Error::UnsupportedFormat(_)));
}

#[test]
fn test_converter_failure_is_wrapped() {
    let mut registry = ConverterRegistry::new();
    registry.register(Arc::new(FailingConverter));
    let converter = Converter::new().with_registry(registry);
    let file = InputFile::from_bytes("report.docx", vec![1, 2, 3]);

    let err = converter.convert(&file, None, None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Failed to convert DOCX to PDF: Invalid document: missing word/document.xml"
    );
    match err {
        Error::Conversion { format, source } => {
            assert_eq!(format, "DOCX");
            assert!(matches!(*source, Error::InvalidDocument(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_progress_is_monotonic() {
    let seen = Mutex::new(Vec::new());
    let on_progress = |p: u8| seen.lock().unwrap().push(p);

    let file = InputFile::from_bytes("a.md", b"# Title\n\nBody".to_vec());
    Converter::new()
        .convert(&file, None, Some(&on_progress))
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![10, 30, 60, 90, 100]);
}

#[test]
fn test_progress_stops_on_failure() {
    let seen = Mutex::new(Vec::new());
    let on_progress = |p: u8| seen.lock().unwrap().push(p);

    let file = InputFile::from_bytes("broken.docx", b"PK\x03\x04junk".to_vec());
    assert!(Converter::new()
        .convert(&file, None, Some(&on_progress))
        .is_err());

    let seen = seen.lock().unwrap();
    assert_eq!(*seen, vec![10, 30]);
}

#[test]
fn test_explicit_format_overrides_detection() {
    let file = InputFile::from_bytes("readme.txt", b"# Heading\n\n* item".to_vec());
    let pdf = Converter::new()
        .convert(&file, Some(SourceFormat::Markdown), None)
        .unwrap();
    assert_eq!(pdf.page_count, 1);
    assert!(pdf.data.starts_with(b"%PDF-"));
}

#[test]
fn test_batch_preserves_order() {
    let files = vec![
        InputFile::from_bytes("one.txt", b"first".to_vec()),
        InputFile::from_bytes("two.xyz", vec![0x00, 0xFF, 0x00]),
        InputFile::from_bytes("three.html", b"<p>third</p>".to_vec()),
    ];

    let results = docpdf::convert_batch(&files, ConvertOptions::default());
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().name, "one.pdf");
    assert!(results[1].is_err());
    assert_eq!(results[2].as_ref().unwrap().name, "three.pdf");

    let sequential = docpdf::convert_batch(&files, ConvertOptions::new().sequential());
    assert_eq!(sequential[0].as_ref().unwrap().name, "one.pdf");
    assert!(sequential[1].is_err());
}
