//! Source files: the bytes a user selected, plus upload validation.
//!
//! A [`SourceFile`] is immutable once created. Its payload is held behind an
//! `Arc<[u8]>` so engine calls on blocking threads can share it without
//! copying.

use crate::config::WorkbenchConfig;
use crate::error::WorkbenchError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";

static PDF_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.pdf$").unwrap());

/// A file selected by the user.
#[derive(Debug, Clone)]
pub struct SourceFile {
    name: String,
    media_type: String,
    bytes: Arc<[u8]>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, inferring its media type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, WorkbenchError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| WorkbenchError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        let media_type = media_type_for(&name);
        debug!("Loaded {} ({} bytes, {})", name, bytes.len(), media_type);
        Ok(Self::new(name, media_type, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Shared handle to the payload.
    pub fn shared_bytes(&self) -> Arc<[u8]> {
        Arc::clone(&self.bytes)
    }

    pub fn is_pdf(&self) -> bool {
        self.media_type == PDF_MEDIA_TYPE
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    /// The name with a trailing `.pdf` (any case) removed; used as the stem
    /// of every output name.
    pub fn base_name(&self) -> String {
        PDF_SUFFIX.replace(&self.name, "").into_owned()
    }

    /// Lowercased extension including the dot, e.g. `.pdf`.
    fn extension(&self) -> String {
        match self.name.rsplit_once('.') {
            Some((_, ext)) => format!(".{}", ext.to_lowercase()),
            None => String::new(),
        }
    }
}

/// Check a file against the configured size limit and accept list, and
/// verify PDF magic bytes for files that claim to be PDFs.
pub fn validate(file: &SourceFile, config: &WorkbenchConfig) -> Result<(), WorkbenchError> {
    if file.size() > config.max_upload_bytes {
        return Err(WorkbenchError::FileTooLarge {
            name: file.name().to_string(),
            size: file.size(),
            limit: config.max_upload_bytes,
        });
    }

    if !config.accepted_types.is_empty() {
        let extension = file.extension();
        let accepted = config
            .accepted_types
            .iter()
            .any(|t| type_matches(t, file.media_type(), &extension));
        if !accepted {
            return Err(WorkbenchError::UnsupportedFileType {
                name: file.name().to_string(),
                media_type: file.media_type().to_string(),
                accepted: config.accepted_types.join(", "),
            });
        }
    }

    if file.is_pdf() && !file.bytes().starts_with(b"%PDF") {
        return Err(WorkbenchError::NotAPdf {
            name: file.name().to_string(),
            magic: file.bytes().iter().take(4).copied().collect(),
        });
    }

    Ok(())
}

/// One accept-list entry against a file's media type and extension.
fn type_matches(accepted: &str, media_type: &str, extension: &str) -> bool {
    let accepted = accepted.trim();
    if accepted.contains('/') {
        match accepted.strip_suffix("/*") {
            Some(main) => media_type.starts_with(&format!("{main}/")),
            None => media_type == accepted,
        }
    } else {
        extension == accepted.to_lowercase()
    }
}

/// Guess a media type from a file name.
pub fn media_type_for(name: &str) -> &'static str {
    let lower = name.to_lowercase();
    let ext = lower.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
    match ext {
        "pdf" => PDF_MEDIA_TYPE,
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

/// Format a byte count for people: `0 Bytes`, `1.5 KB`, `50 MB`.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf(name: &str, bytes: &[u8]) -> SourceFile {
        SourceFile::new(name, PDF_MEDIA_TYPE, bytes.to_vec())
    }

    #[test]
    fn base_name_strips_pdf_suffix_case_insensitively() {
        assert_eq!(pdf("Report.PDF", b"%PDF").base_name(), "Report");
        assert_eq!(pdf("a.pdf.pdf", b"%PDF").base_name(), "a.pdf");
        assert_eq!(pdf("notes.txt", b"%PDF").base_name(), "notes.txt");
    }

    #[test]
    fn validate_accepts_pdf() {
        let config = WorkbenchConfig::default();
        assert!(validate(&pdf("doc.pdf", b"%PDF-1.7\n"), &config).is_ok());
    }

    #[test]
    fn validate_rejects_oversized_file() {
        let config = WorkbenchConfig::builder().max_upload_bytes(4).build().unwrap();
        let err = validate(&pdf("doc.pdf", b"%PDF-1.7"), &config).unwrap_err();
        assert!(matches!(err, WorkbenchError::FileTooLarge { size: 8, .. }));
    }

    #[test]
    fn validate_rejects_wrong_type() {
        let config = WorkbenchConfig::default();
        let png = SourceFile::new("photo.png", "image/png", vec![0x89, b'P', b'N', b'G']);
        let err = validate(&png, &config).unwrap_err();
        assert!(matches!(err, WorkbenchError::UnsupportedFileType { .. }));
    }

    #[test]
    fn validate_rejects_bad_magic() {
        let config = WorkbenchConfig::default();
        let err = validate(&pdf("fake.pdf", b"GIF89a"), &config).unwrap_err();
        assert!(matches!(err, WorkbenchError::NotAPdf { .. }));
    }

    #[test]
    fn wildcard_and_extension_matching() {
        assert!(type_matches("image/*", "image/webp", ".webp"));
        assert!(!type_matches("image/*", "application/pdf", ".pdf"));
        assert!(type_matches(".JPG", "application/octet-stream", ".jpg"));
        assert!(type_matches("application/pdf", "application/pdf", ""));
    }

    #[test]
    fn media_type_inference() {
        assert_eq!(media_type_for("scan.JPEG"), "image/jpeg");
        assert_eq!(media_type_for("doc.pdf"), PDF_MEDIA_TYPE);
        assert_eq!(media_type_for("README"), "application/octet-stream");
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(50 * 1024 * 1024), "50 MB");
    }
}
