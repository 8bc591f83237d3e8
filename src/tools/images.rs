//! Images to PDF, and image rotation.
//!
//! Each image becomes one page. The image is re-encoded as JPEG, embedded as
//! a `DCTDecode` XObject, scaled to fit the page with its aspect ratio kept,
//! and centred. An image that cannot be decoded leaves its page blank and
//! the rest of the batch carries on.

use crate::artifact::{self, OutputArtifact};
use crate::config::PageLayout;
use crate::error::WorkbenchError;
use crate::pipeline::{encode, pages};
use crate::source::SourceFile;
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::Cursor;
use tracing::{debug, info, warn};

/// Default output name.
pub const DEFAULT_PDF_NAME: &str = "images.pdf";

/// Options for [`images_to_pdf`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImagesToPdfOptions {
    pub layout: PageLayout,
    /// JPEG quality for embedded images in `0.0..=1.0`. Default: 0.8.
    pub quality: f32,
    /// Output name; `.pdf` is appended when missing.
    pub filename: String,
}

impl Default for ImagesToPdfOptions {
    fn default() -> Self {
        Self {
            layout: PageLayout::default(),
            quality: 0.8,
            filename: DEFAULT_PDF_NAME.to_string(),
        }
    }
}

impl ImagesToPdfOptions {
    fn output_name(&self) -> String {
        let name = self.filename.trim();
        if name.is_empty() {
            DEFAULT_PDF_NAME.to_string()
        } else if name.ends_with(".pdf") {
            name.to_string()
        } else {
            format!("{name}.pdf")
        }
    }

    fn jpeg_quality(&self) -> u8 {
        (self.quality.clamp(0.01, 1.0) * 100.0).round() as u8
    }
}

/// Result of [`images_to_pdf`].
#[derive(Debug, Clone)]
pub struct ImagePdf {
    pub artifact: OutputArtifact,
    /// Names of inputs that could not be decoded; their pages are blank.
    pub skipped: Vec<String>,
}

/// Build a PDF with one page per image, in order.
pub fn images_to_pdf(
    images: &[SourceFile],
    options: &ImagesToPdfOptions,
) -> Result<ImagePdf, WorkbenchError> {
    if images.is_empty() {
        return Err(WorkbenchError::DocumentFailed("no image files provided".into()));
    }

    let (page_w, page_h) = options.layout.dimensions_pt();
    let quality = options.jpeg_quality();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut page_ids = Vec::with_capacity(images.len());
    let mut skipped = Vec::new();

    for file in images {
        let placed = match embed_image(&mut doc, file, quality) {
            Ok(placed) => Some(placed),
            Err(e) => {
                warn!("Leaving page blank for {}: {}", file.name(), e);
                skipped.push(file.name().to_string());
                None
            }
        };
        page_ids.push(add_page(&mut doc, pages_id, (page_w, page_h), placed)?);
    }

    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(page_ids.len() as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|&id| Object::Reference(id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc.compress();

    let bytes = pages::save(&mut doc)?;
    info!(
        "Built {} from {} images ({} skipped, {} bytes)",
        options.output_name(),
        images.len(),
        skipped.len(),
        bytes.len()
    );
    Ok(ImagePdf {
        artifact: artifact::pdf_artifact(options.output_name(), bytes),
        skipped,
    })
}

/// An embedded image XObject and its pixel size.
struct Placed {
    xobject: ObjectId,
    width: u32,
    height: u32,
}

fn embed_image(
    doc: &mut Document,
    file: &SourceFile,
    quality: u8,
) -> Result<Placed, WorkbenchError> {
    let decode_err = |detail: String| WorkbenchError::ImageDecode {
        name: file.name().to_string(),
        detail,
    };

    let img = image::load_from_memory(file.bytes()).map_err(|e| decode_err(e.to_string()))?;
    let (width, height) = (img.width(), img.height());
    if width == 0 || height == 0 {
        return Err(decode_err("image has no pixels".into()));
    }
    let jpeg = encode::encode_jpeg(&img, quality).map_err(|e| decode_err(e.to_string()))?;

    let dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(i64::from(width))),
        ("Height", Object::Integer(i64::from(height))),
        ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
        ("BitsPerComponent", Object::Integer(8)),
        ("Filter", Object::Name(b"DCTDecode".to_vec())),
    ]);
    // Already JPEG; keep Flate off it.
    let xobject = doc.add_object(Stream::new(dict, jpeg).with_compression(false));
    debug!("Embedded {} ({}x{})", file.name(), width, height);

    Ok(Placed {
        xobject,
        width,
        height,
    })
}

fn add_page(
    doc: &mut Document,
    pages_id: ObjectId,
    (page_w, page_h): (f32, f32),
    placed: Option<Placed>,
) -> Result<ObjectId, WorkbenchError> {
    let mut operations = Vec::new();
    let mut resources = Dictionary::new();

    if let Some(p) = placed {
        let (x, y, w, h) = fit_centered(p.width as f32, p.height as f32, page_w, page_h);
        operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    w.into(),
                    Object::Integer(0),
                    Object::Integer(0),
                    h.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ];
        resources.set(
            "XObject",
            Dictionary::from_iter(vec![("Im0", Object::Reference(p.xobject))]),
        );
    }

    let content = Content { operations }
        .encode()
        .map_err(|e| WorkbenchError::DocumentFailed(format!("page content: {e}")))?;
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content));

    let page = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        (
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                page_w.into(),
                page_h.into(),
            ]),
        ),
        ("Resources", Object::Dictionary(resources)),
        ("Contents", Object::Reference(content_id)),
    ]);
    Ok(doc.add_object(page))
}

/// Scale an `img_w`×`img_h` image to fit a `page_w`×`page_h` page, keeping
/// its aspect ratio, and centre it. Returns `(x, y, width, height)`.
pub fn fit_centered(img_w: f32, img_h: f32, page_w: f32, page_h: f32) -> (f32, f32, f32, f32) {
    let aspect = img_w / img_h;
    let mut w = page_w;
    let mut h = page_w / aspect;
    if h > page_h {
        h = page_h;
        w = page_h * aspect;
    }
    ((page_w - w) / 2.0, (page_h - h) / 2.0, w, h)
}

/// Rotate an image clockwise by `degrees` (a multiple of 90), keeping its
/// name and format.
pub fn rotate_image(file: &SourceFile, degrees: i32) -> Result<OutputArtifact, WorkbenchError> {
    let decode_err = |detail: String| WorkbenchError::ImageDecode {
        name: file.name().to_string(),
        detail,
    };

    let format = image::guess_format(file.bytes()).map_err(|e| decode_err(e.to_string()))?;
    let img = image::load_from_memory_with_format(file.bytes(), format)
        .map_err(|e| decode_err(e.to_string()))?;

    let rotated: DynamicImage = match degrees.rem_euclid(360) {
        0 => img,
        90 => img.rotate90(),
        180 => img.rotate180(),
        270 => img.rotate270(),
        other => {
            return Err(WorkbenchError::InvalidConfig(format!(
                "rotation must be a multiple of 90 degrees, got {other}"
            )))
        }
    };

    let bytes = match format {
        image::ImageFormat::Jpeg => {
            encode::encode_jpeg(&rotated, 95).map_err(|e| decode_err(e.to_string()))?
        }
        other => {
            let mut buf = Vec::new();
            rotated
                .write_to(&mut Cursor::new(&mut buf), other)
                .map_err(|e| decode_err(e.to_string()))?;
            buf
        }
    };

    Ok(OutputArtifact::new(file.name(), file.media_type(), bytes))
}
