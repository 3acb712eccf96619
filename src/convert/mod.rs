//! Conversion dispatcher and per-format converters.
//!
//! Each supported source format is handled by a [`DocumentConverter`] that
//! extracts the document into the [`Content`] model. The dispatcher detects
//! the format, runs the matching converter, lays the content out on pages and
//! writes the PDF.
//!
//! # Example
//!
//! ```no_run
//! use docpdf::convert::{ConvertOptions, Converter};
//! use docpdf::InputFile;
//!
//! fn main() -> docpdf::Result<()> {
//!     let converter = Converter::new().with_options(ConvertOptions::new().with_font_size(11.0));
//!     let input = InputFile::from_path("notes.md")?;
//!     let pdf = converter.convert(&input, None, None)?;
//!     pdf.save("notes.pdf")?;
//!     Ok(())
//! }
//! ```

mod archive;
mod doc;
mod docx;
mod epub;
mod html;
mod image;
mod markdown;
mod odt;
mod presentation;
mod rtf;
mod text;

pub use self::doc::DocConverter;
pub use self::docx::DocxConverter;
pub use self::epub::EpubConverter;
pub use self::html::HtmlConverter;
pub use self::image::ImageConverter;
pub use self::markdown::MarkdownConverter;
pub use self::odt::OdtConverter;
pub use self::presentation::PresentationConverter;
pub use self::rtf::RtfConverter;
pub use self::text::TextConverter;

use crate::detect::{detect_format, SourceFormat};
use crate::error::{Error, Result};
use crate::input::{InputFile, PdfFile};
use crate::layout::{ImageFit, Layout, Margins, Orientation, PageSize};
use crate::metadata::PdfMetadata;
use crate::model::Content;
use crate::writer::write_document;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Progress callback receiving a percentage (0-100).
pub type ProgressFn<'a> = dyn Fn(u8) + Send + Sync + 'a;

/// Options for document conversion.
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Page size for generated pages
    pub page_size: PageSize,

    /// Page orientation
    pub orientation: Orientation,

    /// Page margins in points
    pub margins: Margins,

    /// Body font size in points
    pub font_size: f32,

    /// Line height as a multiple of the font size
    pub line_height: f32,

    /// Placement of standalone images
    pub image_fit: ImageFit,

    /// Document title (overrides any title found in the source)
    pub title: Option<String>,

    /// Document author (overrides any author found in the source)
    pub author: Option<String>,

    /// `/Producer` entry (defaults to the library name and version)
    pub producer: Option<String>,

    /// Embed images found inside documents (DOCX media, EPUB images)
    pub embed_images: bool,

    /// Convert batches in parallel
    pub parallel: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            orientation: Orientation::Portrait,
            margins: Margins::default(),
            font_size: 12.0,
            line_height: 1.4,
            image_fit: ImageFit::FitPage,
            title: None,
            author: None,
            producer: None,
            embed_images: true,
            parallel: true,
        }
    }
}

impl ConvertOptions {
    /// Create default conversion options (A4 portrait, 50pt margins, 12pt text).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set page size.
    pub fn with_page_size(mut self, page_size: PageSize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set orientation.
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Use landscape orientation.
    pub fn landscape(self) -> Self {
        self.with_orientation(Orientation::Landscape)
    }

    /// Set margins.
    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    /// Set body font size in points (minimum 1pt).
    pub fn with_font_size(mut self, size: f32) -> Self {
        self.font_size = size.max(1.0);
        self
    }

    /// Set line height multiplier (minimum 1.0).
    pub fn with_line_height(mut self, line_height: f32) -> Self {
        self.line_height = line_height.max(1.0);
        self
    }

    /// Set standalone image placement.
    pub fn with_image_fit(mut self, fit: ImageFit) -> Self {
        self.image_fit = fit;
        self
    }

    /// Set document title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set document author.
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    /// Set the `/Producer` entry.
    pub fn with_producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = Some(producer.into());
        self
    }

    /// Enable or disable embedding of images found inside documents.
    pub fn with_embedded_images(mut self, embed: bool) -> Self {
        self.embed_images = embed;
        self
    }

    /// Disable parallel batch conversion.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Metadata written into converted PDFs.
    fn metadata_for(&self, content: &Content) -> PdfMetadata {
        PdfMetadata {
            title: self.title.clone().or_else(|| content.title.clone()),
            author: self.author.clone().or_else(|| content.author.clone()),
            producer: self.producer.clone(),
            ..Default::default()
        }
    }
}

/// Trait for source format converters.
///
/// Implement this trait to add support for a new document format.
pub trait DocumentConverter: Send + Sync {
    /// Get the name of this converter.
    fn name(&self) -> &str;

    /// Source formats handled by this converter.
    fn formats(&self) -> &[SourceFormat];

    /// Extract a file into the content model.
    fn extract(&self, file: &InputFile, options: &ConvertOptions) -> Result<Content>;

    /// Check if this converter handles the given format.
    fn supports(&self, format: SourceFormat) -> bool {
        self.formats().contains(&format)
    }

    /// Check if this converter handles the given file extension.
    fn supports_extension(&self, ext: &str) -> bool {
        crate::detect::detect_from_extension(ext).is_some_and(|f| self.supports(f))
    }
}

/// Registry for document converters.
///
/// The registry maps source formats to converters.
pub struct ConverterRegistry {
    converters: HashMap<SourceFormat, Arc<dyn DocumentConverter>>,
    by_name: HashMap<String, Arc<dyn DocumentConverter>>,
}

impl ConverterRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            converters: HashMap::new(),
            by_name: HashMap::new(),
        }
    }

    /// Create a registry with every built-in converter.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ImageConverter::new()));
        registry.register(Arc::new(TextConverter::new()));
        registry.register(Arc::new(MarkdownConverter::new()));
        registry.register(Arc::new(HtmlConverter::new()));
        registry.register(Arc::new(RtfConverter::new()));
        registry.register(Arc::new(DocxConverter::new()));
        registry.register(Arc::new(DocConverter::new()));
        registry.register(Arc::new(OdtConverter::new()));
        registry.register(Arc::new(PresentationConverter::new()));
        registry.register(Arc::new(EpubConverter::new()));
        registry
    }

    /// Register a converter for all its formats. Later registrations win.
    pub fn register(&mut self, converter: Arc<dyn DocumentConverter>) {
        for format in converter.formats() {
            self.converters.insert(*format, converter.clone());
        }
        self.by_name
            .insert(converter.name().to_lowercase(), converter);
    }

    /// Get the converter for a format.
    pub fn get(&self, format: SourceFormat) -> Option<Arc<dyn DocumentConverter>> {
        self.converters.get(&format).cloned()
    }

    /// Get a converter by name.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<dyn DocumentConverter>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    /// Check if a format is supported.
    pub fn supports(&self, format: SourceFormat) -> bool {
        self.converters.contains_key(&format)
    }

    /// Supported formats in declaration order.
    pub fn supported_formats(&self) -> Vec<SourceFormat> {
        SourceFormat::ALL
            .iter()
            .copied()
            .filter(|f| self.supports(*f))
            .collect()
    }
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Detects, extracts, lays out and writes.
pub struct Converter {
    registry: ConverterRegistry,
    options: ConvertOptions,
}

impl Converter {
    /// Create a converter with the default registry and options.
    pub fn new() -> Self {
        Self {
            registry: ConverterRegistry::with_defaults(),
            options: ConvertOptions::default(),
        }
    }

    /// Set conversion options.
    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    /// Use a custom registry.
    pub fn with_registry(mut self, registry: ConverterRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Current options.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Current registry.
    pub fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }

    /// Convert a file to PDF.
    ///
    /// The format is detected when `format` is `None`. Progress is reported as
    /// 10 (input read), 30 (format known), 60 (extracted), 90 (laid out) and
    /// 100 (written). Failures inside a converter are wrapped in
    /// [`Error::Conversion`].
    pub fn convert(
        &self,
        file: &InputFile,
        format: Option<SourceFormat>,
        on_progress: Option<&ProgressFn>,
    ) -> Result<PdfFile> {
        let report = |percent: u8| {
            if let Some(callback) = on_progress {
                callback(percent);
            }
        };
        report(10);

        let format = match format {
            Some(format) => format,
            None => detect_format(file)?,
        };
        let converter = self
            .registry
            .get(format)
            .ok_or_else(|| Error::UnsupportedFormat(format.to_string()))?;
        log::debug!(
            "Converting {} ({} bytes) as {} with '{}'",
            file.name,
            file.len(),
            format,
            converter.name()
        );
        report(30);

        let content = converter
            .extract(file, &self.options)
            .map_err(|e| Error::conversion(format.name(), e))?;
        log::debug!(
            "Extracted {} blocks, {} words, {} images",
            content.blocks.len(),
            content.word_count(),
            content.image_count()
        );
        report(60);

        let layout =
            Layout::run(&self.options, &content).map_err(|e| Error::conversion(format.name(), e))?;
        report(90);

        let metadata = self.options.metadata_for(&content);
        let data = write_document(&layout, &metadata).map_err(|e| Error::conversion(format.name(), e))?;
        report(100);

        Ok(PdfFile {
            name: format!("{}.pdf", file.stem()),
            data,
            page_count: layout.page_count(),
        })
    }

    /// Read and convert a file from disk.
    pub fn convert_file<P: AsRef<Path>>(&self, path: P) -> Result<PdfFile> {
        let file = InputFile::from_path(path)?;
        self.convert(&file, None, None)
    }

    /// Convert many files. Results are returned in input order.
    pub fn convert_batch(&self, files: &[InputFile]) -> Vec<Result<PdfFile>> {
        if self.options.parallel && files.len() > 1 {
            files
                .par_iter()
                .map(|file| self.convert(file, None, None))
                .collect()
        } else {
            files.iter().map(|file| self.convert(file, None, None)).collect()
        }
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a file to PDF with default options.
///
/// ```no_run
/// use docpdf::{convert_to_pdf, InputFile};
///
/// let input = InputFile::from_path("photo.png").unwrap();
/// let pdf = convert_to_pdf(&input, None, Some(&|p: u8| println!("{}%", p))).unwrap();
/// assert_eq!(pdf.page_count, 1);
/// ```
pub fn convert_to_pdf(
    file: &InputFile,
    file_type: Option<SourceFormat>,
    on_progress: Option<&ProgressFn>,
) -> Result<PdfFile> {
    Converter::new().convert(file, file_type, on_progress)
}

/// Convert many files with the given options.
pub fn convert_batch(files: &[InputFile], options: ConvertOptions) -> Vec<Result<PdfFile>> {
    Converter::new().with_options(options).convert_batch(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_options_builder() {
        let options = ConvertOptions::new()
            .with_page_size(PageSize::Letter)
            .landscape()
            .with_font_size(0.0)
            .with_title("Report")
            .sequential();

        assert_eq!(options.page_size, PageSize::Letter);
        assert_eq!(options.orientation, Orientation::Landscape);
        assert_eq!(options.font_size, 1.0);
        assert_eq!(options.title.as_deref(), Some("Report"));
        assert!(!options.parallel);
        assert!(options.embed_images);
    }

    #[test]
    fn test_registry_with_defaults_covers_all_formats() {
        let registry = ConverterRegistry::with_defaults();
        for format in SourceFormat::ALL {
            assert!(registry.supports(format), "{} unsupported", format);
        }
        assert_eq!(registry.supported_formats().len(), SourceFormat::ALL.len());
    }

    #[test]
    fn test_registry_get_by_name() {
        let registry = ConverterRegistry::with_defaults();
        assert!(registry.get_by_name("DOCX").is_some());
        assert!(registry.get_by_name("presentation").is_some());
        assert!(registry.get_by_name("unknown").is_none());
    }

    #[test]
    fn test_metadata_prefers_options() {
        let options = ConvertOptions::new().with_author("Override");
        let content = Content {
            title: Some("From source".into()),
            author: Some("Source author".into()),
            blocks: vec![],
        };
        let meta = options.metadata_for(&content);
        assert_eq!(meta.title.as_deref(), Some("From source"));
        assert_eq!(meta.author.as_deref(), Some("Override"));
    }
}
