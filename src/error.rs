//! Error types for the pdf-workbench library.
//!
//! Three types reflect three failure scopes:
//!
//! * [`WorkbenchError`]: **Fatal**: the operation cannot produce a result
//!   (file rejected, document unreadable, every page failed, nothing to
//!   bundle). Returned as `Err(WorkbenchError)` and, during a run, moves the
//!   orchestrator to [`crate::orchestrator::JobState::Failed`].
//!
//! * [`UnitError`]: **Non-fatal**: a single page failed to render or
//!   extract. The batch skips it and continues; only the shorter output list
//!   reflects the loss.
//!
//! * [`EngineError`]: what a [`crate::engine::DocumentEngine`]
//!   implementation reports. The orchestrator maps it into one of the two
//!   above depending on where it happened.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-workbench library.
#[derive(Debug, Error)]
pub enum WorkbenchError {
    // ── Upload validation ─────────────────────────────────────────────────
    /// The selected file exceeds the configured size limit.
    #[error("File '{name}' is {size} bytes; the maximum is {limit} bytes")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    /// Neither the media type nor the extension is in the accept list.
    #[error("File type of '{name}' ({media_type}) is not supported. Accepted types: {accepted}")]
    UnsupportedFileType {
        name: String,
        media_type: String,
        accepted: String,
    },

    /// The file claims to be a PDF but does not start with `%PDF`.
    #[error("File '{name}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { name: String, magic: Vec<u8> },

    /// Could not read the file from disk.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── State machine ─────────────────────────────────────────────────────
    /// An operation needs a selected source file but none is present.
    #[error("No source file selected")]
    NoSource,

    /// The operation is not allowed in the current state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    // ── Document errors ───────────────────────────────────────────────────
    /// The document engine could not open the source.
    #[error("Could not open '{name}': {detail}")]
    OpenFailed { name: String, detail: String },

    /// The document is encrypted.
    #[error("'{name}' is encrypted and requires a password")]
    PasswordRequired { name: String },

    /// Every requested unit failed; there is nothing to show.
    #[error("All {total} pages failed. First error: {first_error}")]
    AllUnitsFailed { total: usize, first_error: String },

    /// A whole-document operation (merge, compress, split) failed.
    #[error("Document operation failed: {0}")]
    DocumentFailed(String),

    /// An input image could not be decoded or re-encoded.
    #[error("Image '{name}' could not be processed: {detail}")]
    ImageDecode { name: String, detail: String },

    // ── Bundling and delivery ─────────────────────────────────────────────
    /// `download_all` on an empty artifact list.
    #[error("There are no converted files to bundle")]
    NothingToBundle,

    /// `download_one` with an index outside the artifact list.
    #[error("Artifact index {index} is out of range ({len} artifacts)")]
    IndexOutOfRange { index: usize, len: usize },

    /// The archive engine rejected an entry or failed to finalise.
    #[error("Failed to build archive: {0}")]
    ArchiveFailed(String),

    /// Writing a delivered file failed.
    #[error("Failed to write '{path}': {source}")]
    DeliveryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorkbenchError {
    /// Short description suitable for a user-facing notification.
    ///
    /// Never includes engine output, paths or other internal detail; those
    /// go to the log.
    pub fn user_message(&self) -> String {
        match self {
            WorkbenchError::FileTooLarge { limit, .. } => format!(
                "File size exceeds the maximum limit of {}",
                crate::source::format_file_size(*limit)
            ),
            WorkbenchError::UnsupportedFileType { accepted, .. } => {
                format!("File type not supported. Accepted types: {accepted}")
            }
            WorkbenchError::NotAPdf { .. } => "The selected file is not a valid PDF.".into(),
            WorkbenchError::ReadFailed { .. } => "The selected file could not be read.".into(),
            WorkbenchError::NoSource => "Please select a file first.".into(),
            WorkbenchError::InvalidState { .. } => {
                "That action is not available right now.".into()
            }
            WorkbenchError::OpenFailed { .. } => "The document could not be opened.".into(),
            WorkbenchError::PasswordRequired { .. } => {
                "The document is password protected.".into()
            }
            WorkbenchError::AllUnitsFailed { .. } => {
                "An error occurred during conversion. Please try again.".into()
            }
            WorkbenchError::NothingToBundle => "There is nothing to download yet.".into(),
            WorkbenchError::IndexOutOfRange { .. } => "That file is no longer available.".into(),
            WorkbenchError::ArchiveFailed(_) | WorkbenchError::DeliveryFailed { .. } => {
                "An error occurred while preparing the download.".into()
            }
            _ => "An unexpected error occurred. Please try again.".into(),
        }
    }
}

/// A non-fatal error for a single unit of work (one page).
///
/// The batch continues unless every unit fails.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum UnitError {
    /// Page rasterisation failed.
    #[error("Page {page}: rendering failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// The rendered bitmap could not be encoded to the target format.
    #[error("Page {page}: encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// Page could not be copied into a new document.
    #[error("Page {page}: extraction failed: {detail}")]
    ExtractFailed { page: usize, detail: String },

    /// The blocking task running this unit panicked.
    #[error("Page {page}: worker panicked: {detail}")]
    Panicked { page: usize, detail: String },
}

impl UnitError {
    /// The 1-indexed page this error belongs to.
    pub fn page(&self) -> usize {
        match self {
            UnitError::RenderFailed { page, .. }
            | UnitError::EncodeFailed { page, .. }
            | UnitError::ExtractFailed { page, .. }
            | UnitError::Panicked { page, .. } => *page,
        }
    }
}

/// Errors reported by a document engine implementation.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The bytes could not be parsed as a document.
    #[error("cannot open document: {0}")]
    Open(String),

    /// The document needs a password.
    #[error("document is encrypted")]
    PasswordRequired,

    /// Rendering a page failed.
    #[error("page {page}: render failed: {detail}")]
    Render { page: usize, detail: String },

    /// Encoding the rendered page failed.
    #[error("page {page}: encode failed: {detail}")]
    Encode { page: usize, detail: String },

    /// Copying pages into a new document failed.
    #[error("extract failed: {0}")]
    Extract(String),
}

impl EngineError {
    /// Map a failure on an open document to a per-unit error for `page`.
    pub fn into_unit(self, page: usize) -> UnitError {
        match self {
            EngineError::Render { detail, .. } => UnitError::RenderFailed { page, detail },
            EngineError::Encode { detail, .. } => UnitError::EncodeFailed { page, detail },
            EngineError::Extract(detail) => UnitError::ExtractFailed { page, detail },
            other => UnitError::RenderFailed {
                page,
                detail: other.to_string(),
            },
        }
    }

    /// Map a failure to open `name` to a fatal error.
    pub fn into_fatal(self, name: &str) -> WorkbenchError {
        match self {
            EngineError::PasswordRequired => WorkbenchError::PasswordRequired {
                name: name.to_string(),
            },
            other => WorkbenchError::OpenFailed {
                name: name.to_string(),
                detail: other.to_string(),
            },
        }
    }
}
