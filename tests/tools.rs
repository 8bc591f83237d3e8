//! Whole-file tools working on real PDFs built with lopdf.

use image::{DynamicImage, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};
use pdf_workbench::pipeline::pages;
use pdf_workbench::tools::{self, ImagesToPdfOptions};
use pdf_workbench::{
    CompressOptions, CompressionLevel, Orientation, PageLayout, PageSize, SourceFile,
    WorkbenchError,
};
use std::io::Cursor;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// A document whose pages each show `label N`. Pages inherit their
/// MediaBox from the page tree root.
fn labelled_pdf(label: &str, num_pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (1..=num_pages)
        .map(|n| {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Td", vec![Object::Integer(72), Object::Integer(720)]),
                    Operation::new(
                        "Tj",
                        vec![Object::string_literal(format!("{label} {n}"))],
                    ),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
            let page_id = doc.add_object(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(pages_id)),
                ("Contents", Object::Reference(content_id)),
            ]));
            Object::Reference(page_id)
        })
        .collect();

    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(num_pages as i64)),
            ("Kids", Object::Array(kids)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(595),
                    Object::Integer(842),
                ]),
            ),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn pdf_source(name: &str, label: &str, num_pages: usize) -> SourceFile {
    SourceFile::new(name, "application/pdf", labelled_pdf(label, num_pages))
}

fn image_source(name: &str, width: u32, height: u32, format: image::ImageFormat) -> SourceFile {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    let media_type = match format {
        image::ImageFormat::Jpeg => "image/jpeg",
        _ => "image/png",
    };
    SourceFile::new(name, media_type, buf)
}

/// The string shown on every page, in page order.
fn page_labels(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_values()
        .map(|id| {
            let content = Content::decode(&doc.get_page_content(id).unwrap()).unwrap();
            content
                .operations
                .iter()
                .filter(|op| op.operator == "Tj")
                .filter_map(|op| op.operands.first())
                .map(|text| String::from_utf8_lossy(text.as_str().unwrap()).into_owned())
                .collect::<String>()
        })
        .collect()
}

// ── Merge ────────────────────────────────────────────────────────────────────

#[test]
fn merge_keeps_input_order() {
    let merged = tools::merge_documents(&[
        pdf_source("a.pdf", "Alpha", 2),
        pdf_source("b.pdf", "Beta", 3),
    ])
    .unwrap();

    assert_eq!(merged.name, tools::MERGED_NAME);
    assert_eq!(merged.media_type, "application/pdf");
    assert_eq!(
        page_labels(&merged.bytes),
        ["Alpha 1", "Alpha 2", "Beta 1", "Beta 2", "Beta 3"]
    );
}

#[test]
fn merged_pages_keep_inherited_media_box() {
    let merged =
        tools::merge_documents(&[pdf_source("a.pdf", "A", 1), pdf_source("b.pdf", "B", 1)])
            .unwrap();

    let doc = Document::load_mem(&merged.bytes).unwrap();
    for page_id in doc.get_pages().into_values() {
        let page = doc.get_dictionary(page_id).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box.len(), 4);
    }
}

#[test]
fn merge_names_the_unreadable_input() {
    let broken = SourceFile::new("broken.pdf", "application/pdf", b"%PDF-1.7 garbage".to_vec());
    let err = tools::merge_documents(&[pdf_source("a.pdf", "A", 1), broken]).unwrap_err();

    match err {
        WorkbenchError::OpenFailed { name, .. } => assert_eq!(name, "broken.pdf"),
        other => panic!("unexpected error: {other:?}"),
    }
}

// ── Compress ─────────────────────────────────────────────────────────────────

#[test]
fn compress_then_extract() {
    let source = pdf_source("Annual Report.pdf", "Page", 4);
    let options = CompressOptions {
        level: CompressionLevel::High,
        remove_metadata: true,
    };

    let report = tools::compress_document(&source, &options).unwrap();

    assert_eq!(report.artifact.name, "Annual Report_compressed.pdf");
    assert_eq!(report.original_size, source.bytes().len());
    assert_eq!(report.compressed_size, report.artifact.bytes.len());

    let second_and_last = pages::extract_pages(&report.artifact.bytes, &[2, 4]).unwrap();
    assert_eq!(page_labels(&second_and_last), ["Page 2", "Page 4"]);
}

#[test]
fn every_level_produces_a_valid_document() {
    let source = pdf_source("doc.pdf", "Page", 3);
    for level in [
        CompressionLevel::Low,
        CompressionLevel::Medium,
        CompressionLevel::High,
    ] {
        let options = CompressOptions {
            level,
            remove_metadata: false,
        };
        let report = tools::compress_document(&source, &options).unwrap();
        assert_eq!(
            pages::page_count(&report.artifact.bytes).unwrap(),
            3,
            "{level:?}"
        );
    }
}

// ── Images ───────────────────────────────────────────────────────────────────

#[test]
fn images_become_landscape_pages() {
    let images = [
        image_source("wide.png", 64, 32, image::ImageFormat::Png),
        image_source("tall.jpg", 24, 48, image::ImageFormat::Jpeg),
    ];
    let options = ImagesToPdfOptions {
        layout: PageLayout {
            size: PageSize::Letter,
            orientation: Orientation::Landscape,
        },
        filename: "scans".into(),
        ..ImagesToPdfOptions::default()
    };

    let result = tools::images_to_pdf(&images, &options).unwrap();

    assert_eq!(result.artifact.name, "scans.pdf");
    assert!(result.skipped.is_empty());

    let doc = Document::load_mem(&result.artifact.bytes).unwrap();
    let pages = doc.get_pages();
    assert_eq!(pages.len(), 2);
    for page_id in pages.into_values() {
        let media_box = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        let width = media_box[2].as_float().unwrap();
        let height = media_box[3].as_float().unwrap();
        assert!(width > height, "expected landscape, got {width}x{height}");
    }
}

#[test]
fn unreadable_image_is_reported_and_skipped() {
    let images = [
        image_source("ok.png", 10, 10, image::ImageFormat::Png),
        SourceFile::new("corrupt.jpg", "image/jpeg", vec![0xFF, 0xD8, 0x00]),
    ];

    let result = tools::images_to_pdf(&images, &ImagesToPdfOptions::default()).unwrap();

    assert_eq!(result.skipped, ["corrupt.jpg"]);
    assert_eq!(pages::page_count(&result.artifact.bytes).unwrap(), 2);
}

#[test]
fn rotating_swaps_dimensions() {
    let source = image_source("photo.png", 30, 10, image::ImageFormat::Png);

    let rotated = tools::rotate_image(&source, 90).unwrap();

    assert_eq!(rotated.name, "photo.png");
    let img = image::load_from_memory(&rotated.bytes).unwrap();
    assert_eq!((img.width(), img.height()), (10, 30));

    let err = tools::rotate_image(&source, 45).unwrap_err();
    assert!(matches!(err, WorkbenchError::InvalidConfig(_)));
}
