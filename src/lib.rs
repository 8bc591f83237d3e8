//! # pdf-workbench
//!
//! Local PDF toolkit: render PDF pages to images, split, merge, compress,
//! and build PDFs from images. Nothing leaves the machine.
//!
//! ## Conversion Overview
//!
//! Multi-page jobs (PDF → images, PDF → per-page PDFs) go through the
//! [`Orchestrator`], a small state machine that owns one source file:
//!
//! ```text
//! SourceFile
//!  │
//!  ├─ 1. Select   validate size, type and magic bytes
//!  ├─ 2. Range    "1-3, 5" → PageSelection (lenient; empty → all pages)
//!  ├─ 3. Invoke   one engine call per page, sequential, skip failures
//!  │              └─ progress ticker runs alongside (cosmetic, ≤ 90%)
//!  ├─ 4. Finish   Complete (progress 100) or Failed (all pages failed)
//!  └─ 5. Deliver  one artifact, or all of them zipped
//! ```
//!
//! One-shot tools that take whole files live in [`tools`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_workbench::{
//!     DirectorySink, Dependencies, JobOutcome, JobRequest, Orchestrator, PageRangeMode,
//!     PdfiumEngine, SourceFile, WorkbenchConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let deps = Dependencies::new(
//!         Arc::new(PdfiumEngine::new()?),
//!         Arc::new(DirectorySink::new("out")),
//!     );
//!     let orch = Orchestrator::new(WorkbenchConfig::default(), deps);
//!
//!     orch.select_source(SourceFile::from_path("report.pdf").await?)?;
//!     orch.set_page_range_mode(PageRangeMode::Custom("1-3, 7".into()))?;
//!
//!     if let JobOutcome::Completed(files) = orch.run(JobRequest::default()).await? {
//!         eprintln!("{} pages rendered", files.len());
//!         orch.download_all().await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Builds the `pdfwb` binary (clap, indicatif, tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-workbench = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod bundle;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod selection;
pub mod source;
pub mod ticker;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::{ArtifactInfo, OutputArtifact};
pub use bundle::{
    bundle_artifacts, ArchiveBuilder, ArchiveEngine, DirectorySink, DownloadSink, MemorySink,
    ZipArchiveEngine,
};
pub use config::{
    CompressOptions, CompressionLevel, ImageFormat, ImageOptions, JobRequest, Orientation,
    PageLayout, PageRangeMode, PageSize, QualityPreset, SplitMode, WorkbenchConfig,
    WorkbenchConfigBuilder,
};
pub use engine::{DocumentEngine, DocumentHandle, PdfiumEngine};
pub use error::{EngineError, UnitError, WorkbenchError};
pub use orchestrator::{Dependencies, JobOutcome, JobState, JobSummary, Orchestrator};
pub use progress::{JobObserver, NoopObserver, Notification, NotificationLevel, SharedObserver};
pub use selection::PageSelection;
pub use source::{format_file_size, SourceFile};
pub use ticker::{ProgressTicker, TickerSettings};
