//! Output artifacts and their names.
//!
//! Every name is a pure function of the source name, the page number and the
//! target format, so re-running the same job yields the same file names.

use crate::config::ImageFormat;
use crate::source::PDF_MEDIA_TYPE;
use serde::{Deserialize, Serialize};

pub const ZIP_MEDIA_TYPE: &str = "application/zip";

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl OutputArtifact {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Metadata without the payload, for listings and JSON output.
    pub fn info(&self) -> ArtifactInfo {
        ArtifactInfo {
            name: self.name.clone(),
            media_type: self.media_type.clone(),
            size: self.bytes.len(),
        }
    }
}

/// Serialisable description of an [`OutputArtifact`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub name: String,
    pub media_type: String,
    pub size: usize,
}

/// `<base>_page_<n>.<ext>`
pub fn page_image_name(base: &str, page_num: usize, format: ImageFormat) -> String {
    format!("{base}_page_{page_num}.{}", format.extension())
}

/// `<base>_page_<n>.pdf`
pub fn page_document_name(base: &str, page_num: usize) -> String {
    format!("{base}_page_{page_num}.pdf")
}

/// `<base>_extracted.pdf`
pub fn extracted_document_name(base: &str) -> String {
    format!("{base}_extracted.pdf")
}

/// `<base>_compressed.pdf`
pub fn compressed_document_name(base: &str) -> String {
    format!("{base}_compressed.pdf")
}

/// `<base>_<suffix>.zip`, or `converted_<suffix>.zip` when there is no base.
pub fn archive_name(base: Option<&str>, suffix: &str) -> String {
    match base {
        Some(b) if !b.is_empty() => format!("{b}_{suffix}.zip"),
        _ => format!("converted_{suffix}.zip"),
    }
}

/// A single-page or multi-page PDF artifact.
pub fn pdf_artifact(name: String, bytes: Vec<u8>) -> OutputArtifact {
    OutputArtifact::new(name, PDF_MEDIA_TYPE, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_names() {
        assert_eq!(
            page_image_name("report", 7, ImageFormat::Webp),
            "report_page_7.webp"
        );
        assert_eq!(page_document_name("report", 2), "report_page_2.pdf");
        assert_eq!(extracted_document_name("a b"), "a b_extracted.pdf");
        assert_eq!(compressed_document_name("x"), "x_compressed.pdf");
    }

    #[test]
    fn archive_names() {
        assert_eq!(archive_name(Some("report"), "images"), "report_images.zip");
        assert_eq!(archive_name(None, "images"), "converted_images.zip");
        assert_eq!(archive_name(Some(""), "pages"), "converted_pages.zip");
    }

    #[test]
    fn info_omits_payload() {
        let a = OutputArtifact::new("p.png", "image/png", vec![1, 2, 3]);
        let info = a.info();
        assert_eq!(info.size, 3);
        assert_eq!(info.name, "p.png");
    }
}
