//! Per-page processing stages.
//!
//! ## Data Flow
//!
//! ```text
//! PageSelection ──▶ invoke ──▶ engine call ──▶ OutputArtifact
//!                  (sequential)  │
//!                                ├─ render ─▶ encode  (images)
//!                                └─ pages            (PDF extraction)
//! ```
//!
//! 1. [`invoke`]: run one blocking engine call per selected page, in order,
//!    skipping pages that fail
//! 2. [`encode`]: turn a rasterised page into JPEG, PNG or WebP bytes
//! 3. [`pages`] : lopdf page surgery: extract, count, load and save

pub mod encode;
pub mod invoke;
pub mod pages;
