//! pdfium-backed document engine.
//!
//! Rasterisation goes through `pdfium-render`; page extraction goes through
//! lopdf (see [`crate::pipeline::pages`]), since pdfium's page-copy API is
//! tied to the lifetime of a loaded document.
//!
//! A pdfium `PdfDocument` borrows both the `Pdfium` instance and the source
//! bytes, so it cannot be stored in a `'static` handle. The handle keeps the
//! bytes instead and reloads the document for each call. Loading is lazy in
//! pdfium (only the xref is read), so the per-page cost is small compared to
//! rendering.

use crate::config::ImageOptions;
use crate::engine::{DocumentEngine, DocumentHandle};
use crate::error::{EngineError, WorkbenchError};
use crate::pipeline::{encode, pages};
use crate::source::SourceFile;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Longest rendered edge in pixels, whatever the scale.
const MAX_RENDER_EDGE: i32 = 10_000;

/// Document engine backed by the pdfium C library.
pub struct PdfiumEngine {
    pdfium: Arc<Pdfium>,
    password: Option<String>,
}

impl PdfiumEngine {
    /// Bind to pdfium.
    ///
    /// `PDFIUM_LIB_PATH` may point at the library file or at the directory
    /// containing it; otherwise the system library search path is used.
    pub fn new() -> Result<Self, WorkbenchError> {
        let bindings = match std::env::var("PDFIUM_LIB_PATH") {
            Ok(path) if !path.is_empty() => {
                let path = PathBuf::from(path);
                let lib = if path.is_dir() {
                    Pdfium::pdfium_platform_library_name_at_path(&path)
                } else {
                    path
                };
                debug!("Binding pdfium from {}", lib.display());
                Pdfium::bind_to_library(lib)
            }
            _ => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| WorkbenchError::PdfiumBindingFailed(format!("{e:?}")))?;

        Ok(Self {
            pdfium: Arc::new(Pdfium::new(bindings)),
            password: None,
        })
    }

    /// Use `password` when opening encrypted documents.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }
}

impl DocumentEngine for PdfiumEngine {
    fn open(&self, source: &SourceFile) -> Result<Arc<dyn DocumentHandle>, EngineError> {
        let bytes = source.shared_bytes();
        let document = self
            .pdfium
            .load_pdf_from_byte_slice(&bytes, self.password.as_deref())
            .map_err(|e| map_load_error(e, self.password.is_some()))?;
        let page_count = document.pages().len() as usize;
        drop(document);

        info!("Opened {}: {} pages", source.name(), page_count);

        Ok(Arc::new(PdfiumDocument {
            pdfium: Arc::clone(&self.pdfium),
            bytes,
            password: self.password.clone(),
            page_count,
        }))
    }
}

struct PdfiumDocument {
    pdfium: Arc<Pdfium>,
    bytes: Arc<[u8]>,
    password: Option<String>,
    page_count: usize,
}

impl DocumentHandle for PdfiumDocument {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn render_page(
        &self,
        page_index: usize,
        options: &ImageOptions,
    ) -> Result<Vec<u8>, EngineError> {
        let render_err = |detail: String| EngineError::Render {
            page: page_index + 1,
            detail,
        };

        let document = self
            .pdfium
            .load_pdf_from_byte_slice(&self.bytes, self.password.as_deref())
            .map_err(|e| render_err(format!("{e:?}")))?;

        let page = document
            .pages()
            .get(pdfium_page_index(page_index)?)
            .map_err(|e| render_err(format!("{e:?}")))?;

        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(options.scale)
            .set_maximum_width(MAX_RENDER_EDGE)
            .set_maximum_height(MAX_RENDER_EDGE);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| render_err(format!("{e:?}")))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            page_index + 1,
            image.width(),
            image.height()
        );

        encode::encode_image(&image, options).map_err(|e| EngineError::Encode {
            page: page_index + 1,
            detail: e.to_string(),
        })
    }

    fn extract_pages(&self, page_indices: &[usize]) -> Result<Vec<u8>, EngineError> {
        let page_numbers: Vec<u32> = page_indices.iter().map(|&i| i as u32 + 1).collect();
        pages::extract_pages(&self.bytes, &page_numbers)
            .map_err(|e| EngineError::Extract(e.to_string()))
    }
}

/// Classify a pdfium load failure.
fn map_load_error(e: PdfiumError, password_given: bool) -> EngineError {
    let detail = format!("{e:?}");
    if detail.contains("Password") || detail.contains("password") {
        if password_given {
            EngineError::Open("wrong password".into())
        } else {
            EngineError::PasswordRequired
        }
    } else {
        EngineError::Open(detail)
    }
}

/// pdfium addresses pages with a `u16`.
fn pdfium_page_index(page_index: usize) -> Result<u16, EngineError> {
    u16::try_from(page_index).map_err(|_| EngineError::Render {
        page: page_index + 1,
        detail: format!("page index {page_index} is beyond what pdfium can address"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_index_within_u16_passes_through() {
        assert_eq!(pdfium_page_index(0).unwrap(), 0);
        assert_eq!(pdfium_page_index(65_535).unwrap(), u16::MAX);
    }

    #[test]
    fn page_index_beyond_u16_is_a_render_error() {
        let err = pdfium_page_index(65_536 + 6).unwrap_err();
        assert!(matches!(err, EngineError::Render { page: 65_543, .. }));
    }
}
