//! PDF compression.
//!
//! Works on document structure only; embedded images are not re-encoded.
//!
//! | Level  | Effect                                                        |
//! |--------|---------------------------------------------------------------|
//! | Low    | drop unreferenced objects                                     |
//! | Medium | + Flate-compress uncompressed streams                         |
//! | High   | + drop XMP metadata, page thumbnails and empty streams        |

use crate::artifact::{self, OutputArtifact};
use crate::config::{CompressOptions, CompressionLevel};
use crate::error::WorkbenchError;
use crate::pipeline::pages;
use crate::source::{format_file_size, SourceFile};
use lopdf::{Document, Object};
use tracing::{debug, info};

/// Document information entries blanked by `remove_metadata`.
const INFO_KEYS: [&str; 6] = ["Title", "Author", "Subject", "Keywords", "Producer", "Creator"];

/// A compressed document and how much it shrank.
#[derive(Debug, Clone)]
pub struct CompressReport {
    pub artifact: OutputArtifact,
    pub original_size: usize,
    pub compressed_size: usize,
}

impl CompressReport {
    /// Size reduction in whole percent; negative when the output grew.
    pub fn savings_percent(&self) -> i64 {
        if self.original_size == 0 {
            return 0;
        }
        let ratio = self.compressed_size as f64 / self.original_size as f64;
        ((1.0 - ratio) * 100.0).round() as i64
    }
}

/// Compress `source` into `<base>_compressed.pdf`.
pub fn compress_document(
    source: &SourceFile,
    options: &CompressOptions,
) -> Result<CompressReport, WorkbenchError> {
    let mut doc = pages::load(source.bytes()).map_err(|e| WorkbenchError::OpenFailed {
        name: source.name().to_string(),
        detail: e.to_string(),
    })?;

    if options.remove_metadata {
        blank_info(&mut doc);
    }

    if options.level == CompressionLevel::High {
        strip_auxiliary(&mut doc);
        let removed = doc.delete_zero_length_streams();
        debug!("Removed {} empty streams", removed.len());
    }

    let pruned = doc.prune_objects();
    debug!("Pruned {} unreferenced objects", pruned.len());

    if options.level != CompressionLevel::Low {
        doc.compress();
    }

    let bytes = pages::save(&mut doc)?;
    let report = CompressReport {
        original_size: source.bytes().len(),
        compressed_size: bytes.len(),
        artifact: artifact::pdf_artifact(
            artifact::compressed_document_name(&source.base_name()),
            bytes,
        ),
    };

    info!(
        "Compressed {}: {} → {} ({}%)",
        source.name(),
        format_file_size(report.original_size as u64),
        format_file_size(report.compressed_size as u64),
        report.savings_percent()
    );
    Ok(report)
}

/// Blank the document information dictionary entries.
fn blank_info(doc: &mut Document) {
    let Ok(info_id) = doc.trailer.get(b"Info").and_then(Object::as_reference) else {
        return;
    };
    if let Ok(info) = doc.get_object_mut(info_id).and_then(Object::as_dict_mut) {
        for key in INFO_KEYS {
            info.set(key, Object::string_literal(""));
        }
    }
}

/// Remove the catalog's XMP stream and every page thumbnail.
fn strip_auxiliary(doc: &mut Document) {
    if let Ok(root_id) = doc.trailer.get(b"Root").and_then(Object::as_reference) {
        if let Ok(catalog) = doc.get_object_mut(root_id).and_then(Object::as_dict_mut) {
            catalog.remove(b"Metadata");
        }
    }
    for page_id in doc.get_pages().into_values() {
        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            page.remove(b"Thumb");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pages::fixtures::sample_pdf;
    use crate::source::PDF_MEDIA_TYPE;
    use lopdf::Dictionary;

    fn with_info(bytes: &[u8]) -> Vec<u8> {
        let mut doc = pages::load(bytes).unwrap();
        let info = Dictionary::from_iter(vec![
            ("Title", Object::string_literal("Quarterly report")),
            ("Author", Object::string_literal("Finance")),
        ]);
        let info_id = doc.add_object(info);
        doc.trailer.set("Info", Object::Reference(info_id));
        pages::save(&mut doc).unwrap()
    }

    #[test]
    fn output_is_named_and_keeps_pages() {
        let source = SourceFile::new("Report.PDF", PDF_MEDIA_TYPE, sample_pdf(3));
        let report = compress_document(&source, &CompressOptions::default()).unwrap();
        assert_eq!(report.artifact.name, "Report_compressed.pdf");
        assert_eq!(pages::page_count(&report.artifact.bytes).unwrap(), 3);
        assert_eq!(report.original_size, source.bytes().len());
    }

    #[test]
    fn remove_metadata_blanks_info() {
        let source = SourceFile::new("a.pdf", PDF_MEDIA_TYPE, with_info(&sample_pdf(1)));
        let options = CompressOptions {
            level: CompressionLevel::Low,
            remove_metadata: true,
        };
        let report = compress_document(&source, &options).unwrap();

        let doc = pages::load(&report.artifact.bytes).unwrap();
        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_dictionary(info_id).unwrap();
        assert_eq!(info.get(b"Title").unwrap().as_str().unwrap(), b"");
        assert_eq!(info.get(b"Author").unwrap().as_str().unwrap(), b"");
    }

    #[test]
    fn metadata_kept_by_default() {
        let source = SourceFile::new("a.pdf", PDF_MEDIA_TYPE, with_info(&sample_pdf(1)));
        let report = compress_document(&source, &CompressOptions::default()).unwrap();
        let doc = pages::load(&report.artifact.bytes).unwrap();
        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let title = doc.get_dictionary(info_id).unwrap().get(b"Title").unwrap();
        assert_eq!(title.as_str().unwrap(), b"Quarterly report");
    }

    #[test]
    fn high_level_still_valid() {
        let source = SourceFile::new("a.pdf", PDF_MEDIA_TYPE, sample_pdf(2));
        let options = CompressOptions {
            level: CompressionLevel::High,
            remove_metadata: false,
        };
        let report = compress_document(&source, &options).unwrap();
        assert_eq!(pages::page_count(&report.artifact.bytes).unwrap(), 2);
    }

    #[test]
    fn savings_percent_rounds() {
        let report = CompressReport {
            artifact: OutputArtifact::new("x.pdf", PDF_MEDIA_TYPE, vec![]),
            original_size: 1000,
            compressed_size: 333,
        };
        assert_eq!(report.savings_percent(), 67);
    }

    #[test]
    fn garbage_input_is_open_failure() {
        let source = SourceFile::new("bad.pdf", PDF_MEDIA_TYPE, b"hello".to_vec());
        let err = compress_document(&source, &CompressOptions::default()).unwrap_err();
        assert!(matches!(err, WorkbenchError::OpenFailed { .. }));
    }
}
