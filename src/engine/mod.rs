//! Document engine seam.
//!
//! PDF parsing and rasterisation are external capabilities. The orchestrator
//! only sees these two traits, so a test can script per-page failures and a
//! caller can swap the rendering backend without touching the pipeline.
//!
//! Both traits are **blocking**: implementations may do CPU-heavy or
//! non-async-safe work (pdfium keeps thread-local state). Callers run them
//! through `tokio::task::spawn_blocking`.

pub mod pdfium;

use crate::config::ImageOptions;
use crate::error::EngineError;
use crate::source::SourceFile;
use std::sync::Arc;

/// Opens documents.
pub trait DocumentEngine: Send + Sync {
    /// Parse `source` and return a handle to the open document.
    fn open(&self, source: &SourceFile) -> Result<Arc<dyn DocumentHandle>, EngineError>;
}

/// An open document. Closing happens when the last `Arc` is dropped.
pub trait DocumentHandle: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Rasterise page `page_index` (0-indexed) and return the encoded image.
    fn render_page(&self, page_index: usize, options: &ImageOptions)
        -> Result<Vec<u8>, EngineError>;

    /// Copy pages (0-indexed) into a new PDF, keeping document order.
    fn extract_pages(&self, page_indices: &[usize]) -> Result<Vec<u8>, EngineError>;
}

pub use self::pdfium::PdfiumEngine;
