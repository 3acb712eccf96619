//! Tests for reading and editing PDF document information.

use chrono::DateTime;
use docpdf::{
    convert_to_pdf, copy_metadata, read_metadata, remove_metadata, write_metadata, Error,
    InputFile, PdfMetadata,
};
use lopdf::{dictionary, Document, Object, Stream};

fn sample_pdf(text: &str) -> Vec<u8> {
    let file = InputFile::from_bytes("sample.txt", text.as_bytes().to_vec());
    convert_to_pdf(&file, None, None).unwrap().data
}

fn catalog(doc: &Document) -> &lopdf::Dictionary {
    let root = doc.trailer.get(b"Root").and_then(Object::as_reference).unwrap();
    doc.get_dictionary(root).unwrap()
}

fn is_xmp_stream(object: &Object) -> bool {
    match object {
        Object::Stream(stream) => {
            matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"XML")
        }
        _ => false,
    }
}

/// Attach an XMP packet to the catalog and a `/Trapped /False` Info entry.
fn pdf_with_xmp_and_trapped(text: &str) -> Vec<u8> {
    let mut doc = Document::load_mem(&sample_pdf(text)).unwrap();
    let xmp = doc.add_object(Stream::new(
        dictionary! { "Type" => "Metadata", "Subtype" => "XML" },
        b"<?xpacket begin=\"\"?><x:xmpmeta xmlns:x=\"adobe:ns:meta/\"/><?xpacket end=\"w\"?>"
            .to_vec(),
    ));
    let root = doc.trailer.get(b"Root").and_then(Object::as_reference).unwrap();
    doc.get_object_mut(root)
        .and_then(Object::as_dict_mut)
        .unwrap()
        .set("Metadata", xmp);

    let info = doc.add_object(dictionary! {
        "Title" => Object::string_literal("With XMP"),
        "Trapped" => Object::Name(b"False".to_vec()),
    });
    doc.trailer.set("Info", info);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

#[test]
fn test_write_then_read() {
    let created = DateTime::parse_from_rfc3339("2024-03-01T10:20:30+02:00").unwrap();
    let metadata = PdfMetadata {
        creation_date: Some(created),
        creator: Some("Writer 7".into()),
        ..PdfMetadata::new()
            .with_title("Annual Report")
            .with_author("Jane Smith")
            .with_subject("Finance")
            .with_keywords(["budget", "2024"])
            .with_custom("Department", "Accounting")
    };

    let updated = write_metadata(&sample_pdf("body"), &metadata).unwrap();
    let read = read_metadata(&updated).unwrap();

    assert_eq!(read.title.as_deref(), Some("Annual Report"));
    assert_eq!(read.author.as_deref(), Some("Jane Smith"));
    assert_eq!(read.subject.as_deref(), Some("Finance"));
    assert_eq!(read.keywords, vec!["budget", "2024"]);
    assert_eq!(read.creator.as_deref(), Some("Writer 7"));
    assert_eq!(read.creation_date, Some(created));
    assert_eq!(read.custom.get("Department").map(String::as_str), Some("Accounting"));
}

#[test]
fn test_unicode_title_round_trip() {
    let title = "Résumé – 東京 2024";
    let updated = write_metadata(&sample_pdf("x"), &PdfMetadata::new().with_title(title)).unwrap();
    assert_eq!(read_metadata(&updated).unwrap().title.as_deref(), Some(title));
}

#[test]
fn test_write_keeps_unset_fields() {
    let first = write_metadata(
        &sample_pdf("x"),
        &PdfMetadata::new().with_title("Old").with_author("Keep Me"),
    )
    .unwrap();
    let second = write_metadata(&first, &PdfMetadata::new().with_title("New")).unwrap();

    let read = read_metadata(&second).unwrap();
    assert_eq!(read.title.as_deref(), Some("New"));
    assert_eq!(read.author.as_deref(), Some("Keep Me"));
}

#[test]
fn test_remove_metadata() {
    let with_meta = write_metadata(
        &sample_pdf("x"),
        &PdfMetadata::new().with_title("Secret").with_custom("Owner", "me"),
    )
    .unwrap();

    let stripped = remove_metadata(&with_meta).unwrap();
    assert!(read_metadata(&stripped).unwrap().is_empty());
    assert!(lopdf::Document::load_mem(&stripped).unwrap().get_pages().len() == 1);
}

#[test]
fn test_remove_metadata_drops_xmp_stream() {
    let original = pdf_with_xmp_and_trapped("x");
    let before = Document::load_mem(&original).unwrap();
    assert!(catalog(&before).has(b"Metadata"));
    assert!(before.objects.values().any(is_xmp_stream));

    let stripped = Document::load_mem(&remove_metadata(&original).unwrap()).unwrap();
    assert!(!catalog(&stripped).has(b"Metadata"));
    assert!(!stripped.objects.values().any(is_xmp_stream));
    assert!(stripped.trailer.get(b"Info").is_err());
    assert_eq!(stripped.get_pages().len(), 1);
}

#[test]
fn test_name_entries_survive_copy() {
    let source = pdf_with_xmp_and_trapped("source");
    let read = read_metadata(&source).unwrap();
    assert_eq!(read.custom.get("Trapped").map(String::as_str), Some("False"));

    let copied = copy_metadata(&source, &sample_pdf("target")).unwrap();
    let doc = Document::load_mem(&copied).unwrap();
    let info = match doc.trailer.get(b"Info").unwrap() {
        Object::Reference(id) => doc.get_dictionary(*id).unwrap(),
        Object::Dictionary(dict) => dict,
        other => panic!("unexpected {:?}", other),
    };
    assert_eq!(info.get(b"Trapped").unwrap(), &Object::Name(b"False".to_vec()));
    assert_eq!(read_metadata(&copied).unwrap().title.as_deref(), Some("With XMP"));
}

#[test]
fn test_copy_metadata() {
    let source = write_metadata(
        &sample_pdf("source"),
        &PdfMetadata::new()
            .with_title("Source Title")
            .with_keywords(["a", "b"]),
    )
    .unwrap();
    let target = sample_pdf("target");

    let copied = copy_metadata(&source, &target).unwrap();
    let read = read_metadata(&copied).unwrap();
    assert_eq!(read.title.as_deref(), Some("Source Title"));
    assert_eq!(read.keywords, vec!["a", "b"]);
}

#[test]
fn test_metadata_serializes_to_json() {
    let metadata = PdfMetadata::new().with_title("T").with_custom("K", "V");
    let json = serde_json::to_value(&metadata).unwrap();
    assert_eq!(json["title"], "T");
    assert_eq!(json["custom"]["K"], "V");
    assert!(json.get("keywords").is_none());
}

#[test]
fn test_non_pdf_rejected() {
    let not_pdf = b"GIF89a not a pdf";
    assert!(matches!(read_metadata(not_pdf), Err(Error::NotPdf)));
    assert!(matches!(
        write_metadata(not_pdf, &PdfMetadata::new()),
        Err(Error::NotPdf)
    ));
    assert!(matches!(remove_metadata(not_pdf), Err(Error::NotPdf)));
    assert!(matches!(
        copy_metadata(&sample_pdf("x"), not_pdf),
        Err(Error::NotPdf)
    ));
}

#[test]
fn test_metadata_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.pdf");
    std::fs::write(&path, sample_pdf("on disk")).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    let updated = write_metadata(&bytes, &PdfMetadata::new().with_author("Disk")).unwrap();
    std::fs::write(&path, &updated).unwrap();

    let reread = read_metadata(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(reread.author.as_deref(), Some("Disk"));
}
