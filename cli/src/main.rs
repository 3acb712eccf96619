//! docpdf CLI - document to PDF conversion and PDF metadata tool

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use docpdf::{
    copy_metadata, read_metadata, remove_metadata, write_metadata, ConvertOptions, Converter,
    ImageFit, InputFile, Margins, PageSize, PdfMetadata, SourceFormat,
};

#[derive(Parser)]
#[command(name = "docpdf")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Convert documents to PDF and edit PDF metadata", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one or more files to PDF
    Convert {
        /// Input files
        #[arg(value_name = "FILES", required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory (defaults to each input's directory)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Page size: a4, letter or WIDTHxHEIGHT in points
        #[arg(long, env = "DOCPDF_PAGE_SIZE", default_value = "a4")]
        page_size: PageSize,

        /// Landscape orientation
        #[arg(long)]
        landscape: bool,

        /// Page margin in points
        #[arg(long, env = "DOCPDF_MARGIN", default_value_t = 50.0)]
        margin: f32,

        /// Body font size in points
        #[arg(long, env = "DOCPDF_FONT_SIZE", default_value_t = 12.0)]
        font_size: f32,

        /// Placement of standalone images
        #[arg(long, value_enum, default_value = "page")]
        fit: FitMode,

        /// Document title
        #[arg(long)]
        title: Option<String>,

        /// Document author
        #[arg(long)]
        author: Option<String>,

        /// Producer written into the PDF
        #[arg(long, env = "DOCPDF_PRODUCER")]
        producer: Option<String>,

        /// Skip images embedded in documents
        #[arg(long)]
        no_images: bool,

        /// Force the source format instead of detecting it
        #[arg(long, value_name = "FMT")]
        format: Option<SourceFormat>,
    },

    /// Show PDF metadata
    Info {
        /// Input PDF file
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Set PDF metadata fields
    #[command(name = "set-meta")]
    SetMeta {
        /// Input PDF file
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// Output file (overwrites the input if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        author: Option<String>,

        #[arg(long)]
        subject: Option<String>,

        /// Comma-separated keywords
        #[arg(long, value_delimiter = ',')]
        keywords: Option<Vec<String>>,

        #[arg(long)]
        creator: Option<String>,

        #[arg(long)]
        producer: Option<String>,

        /// Custom entry as KEY=VALUE (repeatable)
        #[arg(long, value_name = "KEY=VALUE", value_parser = parse_key_value)]
        custom: Vec<(String, String)>,
    },

    /// Remove all document metadata
    #[command(name = "strip-meta")]
    StripMeta {
        /// Input PDF file
        #[arg(value_name = "PDF")]
        input: PathBuf,

        /// Output file (overwrites the input if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Copy metadata from one PDF to another
    #[command(name = "copy-meta")]
    CopyMeta {
        /// PDF to copy metadata from
        #[arg(value_name = "SRC")]
        source: PathBuf,

        /// PDF to copy metadata to
        #[arg(value_name = "DST")]
        target: PathBuf,

        /// Output file (overwrites DST if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// List supported input formats
    Formats,

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum FitMode {
    /// Scale the image into the page margins
    Page,
    /// Size the page to the image
    Image,
}

impl From<FitMode> for ImageFit {
    fn from(mode: FitMode) -> Self {
        match mode {
            FitMode::Page => ImageFit::FitPage,
            FitMode::Image => ImageFit::ImageSize,
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("empty key".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = match cli.command {
        Commands::Convert {
            inputs,
            output,
            page_size,
            landscape,
            margin,
            font_size,
            fit,
            title,
            author,
            producer,
            no_images,
            format,
        } => {
            let mut options = ConvertOptions::new()
                .with_page_size(page_size)
                .with_margins(Margins::uniform(margin))
                .with_font_size(font_size)
                .with_image_fit(fit.into())
                .with_embedded_images(!no_images);
            if landscape {
                options = options.landscape();
            }
            if let Some(title) = title {
                options = options.with_title(title);
            }
            if let Some(author) = author {
                options = options.with_author(author);
            }
            if let Some(producer) = producer {
                options = options.with_producer(producer);
            }
            cmd_convert(&inputs, output.as_deref(), options, format)
        }
        Commands::Info { input, json } => cmd_info(&input, json),
        Commands::SetMeta {
            input,
            output,
            title,
            author,
            subject,
            keywords,
            creator,
            producer,
            custom,
        } => {
            let metadata = PdfMetadata {
                title,
                author,
                subject,
                keywords: keywords.unwrap_or_default(),
                creator,
                producer,
                custom: custom.into_iter().collect(),
                ..Default::default()
            };
            cmd_set_meta(&input, output.as_deref(), &metadata)
        }
        Commands::StripMeta { input, output } => cmd_strip_meta(&input, output.as_deref()),
        Commands::CopyMeta {
            source,
            target,
            output,
        } => cmd_copy_meta(&source, &target, output.as_deref()),
        Commands::Formats => {
            cmd_formats();
            Ok(())
        }
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn cmd_convert(
    inputs: &[PathBuf],
    output: Option<&Path>,
    options: ConvertOptions,
    format: Option<SourceFormat>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(dir) = output {
        fs::create_dir_all(dir)?;
    }
    let converter = Converter::new().with_options(options);

    let pb = Arc::new(ProgressBar::new(100));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );

    let mut failures = 0;
    for input in inputs {
        pb.reset();
        pb.set_message(input.display().to_string());

        let result = InputFile::from_path(input).and_then(|file| {
            let bar = Arc::clone(&pb);
            let on_progress = move |percent: u8| bar.set_position(u64::from(percent));
            converter.convert(&file, format, Some(&on_progress))
        });

        match result {
            Ok(pdf) => {
                let dir = output
                    .map(Path::to_path_buf)
                    .or_else(|| input.parent().map(Path::to_path_buf))
                    .unwrap_or_else(|| PathBuf::from("."));
                let path = pdf.save_in(&dir)?;
                pb.println(format!(
                    "{} {} -> {} ({} pages)",
                    "Converted".green(),
                    input.display(),
                    path.display(),
                    pdf.page_count
                ));
            }
            Err(e) => {
                failures += 1;
                pb.println(format!("{} {}: {}", "Failed".red(), input.display(), e));
            }
        }
    }
    pb.finish_and_clear();

    let converted = inputs.len() - failures;
    println!(
        "\n{} {} of {} files converted",
        "Done!".green().bold(),
        converted,
        inputs.len()
    );
    if failures > 0 {
        return Err(format!("{} file(s) failed to convert", failures).into());
    }
    Ok(())
}

fn cmd_info(input: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let metadata = read_metadata(&data)?;

    if json {
        println!("{}", metadata.to_json(true)?);
        return Ok(());
    }

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    if let Some(version) = docpdf::detect::pdf_version(&data) {
        println!("{}: PDF {}", "Format".bold(), version);
    }

    let fields = [
        ("Title", metadata.title.clone()),
        ("Author", metadata.author.clone()),
        ("Subject", metadata.subject.clone()),
        (
            "Keywords",
            (!metadata.keywords.is_empty()).then(|| metadata.keywords.join(", ")),
        ),
        ("Creator", metadata.creator.clone()),
        ("Producer", metadata.producer.clone()),
        ("Created", metadata.creation_date.map(|d| d.to_rfc3339())),
        ("Modified", metadata.modification_date.map(|d| d.to_rfc3339())),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            println!("{}: {}", label.bold(), value);
        }
    }

    if !metadata.custom.is_empty() {
        println!();
        println!("{}", "Custom Entries".cyan().bold());
        println!("{}", "─".repeat(40).dimmed());
        for (key, value) in &metadata.custom {
            println!("{}: {}", key.bold(), value);
        }
    }

    Ok(())
}

fn cmd_set_meta(
    input: &Path,
    output: Option<&Path>,
    metadata: &PdfMetadata,
) -> Result<(), Box<dyn std::error::Error>> {
    if metadata.is_empty() {
        return Err("no metadata fields given".into());
    }
    let data = fs::read(input)?;
    let updated = write_metadata(&data, metadata)?;
    save(input, output, &updated)
}

fn cmd_strip_meta(input: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let data = fs::read(input)?;
    let stripped = remove_metadata(&data)?;
    save(input, output, &stripped)
}

fn cmd_copy_meta(
    source: &Path,
    target: &Path,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let source_data = fs::read(source)?;
    let target_data = fs::read(target)?;
    let updated = copy_metadata(&source_data, &target_data)?;
    save(target, output, &updated)
}

fn save(input: &Path, output: Option<&Path>, data: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
    let path = output.unwrap_or(input);
    fs::write(path, data)?;
    println!("{} {}", "Saved to".green(), path.display());
    Ok(())
}

fn cmd_formats() {
    println!("{}", "Supported Formats".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    for format in SourceFormat::ALL {
        println!(
            "{:<10} {:<12} {}",
            format.name().bold(),
            format!("{:?}", format.category()).dimmed(),
            format.extensions().join(", ")
        );
    }
}

fn cmd_version() {
    println!("{} {}", "docpdf".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Document to PDF conversion tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/docpdf".dimmed());
    println!("License: MIT");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("Department=Finance").unwrap(),
            ("Department".to_string(), "Finance".to_string())
        );
        assert_eq!(
            parse_key_value("Note=a=b").unwrap(),
            ("Note".to_string(), "a=b".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_cli_parses_convert() {
        let cli = Cli::try_parse_from([
            "docpdf",
            "convert",
            "a.md",
            "b.docx",
            "--page-size",
            "letter",
            "--fit",
            "image",
            "--format",
            "markdown",
        ])
        .unwrap();
        match cli.command {
            Commands::Convert {
                inputs,
                page_size,
                fit,
                format,
                ..
            } => {
                assert_eq!(inputs.len(), 2);
                assert_eq!(page_size, PageSize::Letter);
                assert!(fit == FitMode::Image);
                assert_eq!(format, Some(SourceFormat::Markdown));
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn test_set_and_strip_meta_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = Converter::new()
            .convert(&InputFile::from_bytes("a.txt", b"hello".to_vec()), None, None)
            .unwrap();
        let path = pdf.save_in(dir.path()).unwrap();

        let metadata = PdfMetadata::new()
            .with_title("Set")
            .with_custom("Department", "Finance");
        cmd_set_meta(&path, None, &metadata).unwrap();
        let read = read_metadata(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(read.title.as_deref(), Some("Set"));
        assert_eq!(read.custom.get("Department").map(String::as_str), Some("Finance"));

        let stripped = dir.path().join("stripped.pdf");
        cmd_strip_meta(&path, Some(&stripped)).unwrap();
        let read = read_metadata(&fs::read(&stripped).unwrap()).unwrap();
        assert!(read.title.is_none());
    }
}
