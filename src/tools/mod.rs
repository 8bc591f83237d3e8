//! One-shot document tools that run outside the orchestrator.
//!
//! Each tool takes whole input files and returns a finished
//! [`crate::OutputArtifact`]. They are blocking; call them from
//! `tokio::task::spawn_blocking` inside async code.
//!
//! - [`merge`]: concatenate PDFs into `merged.pdf`
//! - [`compress`]: prune and recompress a PDF
//! - [`images`]: build a PDF from images, one per page; rotate images

pub mod compress;
pub mod images;
pub mod merge;

pub use compress::{compress_document, CompressReport};
pub use images::{images_to_pdf, rotate_image, ImagePdf, ImagesToPdfOptions};
pub use merge::{merge_documents, MERGED_NAME};
