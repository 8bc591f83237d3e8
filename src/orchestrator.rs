//! The conversion orchestrator: one source file, one job at a time.
//!
//! ```text
//!  Idle ──select_source──▶ OptionsVisible ──start/run──▶ Running ──▶ Complete
//!   ▲                            ▲                          │
//!   │                            └──set_page_range_mode──── Failed ◀──┘
//!   └──────────────────────────── reset (from any state)
//! ```
//!
//! State lives in one mutex-guarded container. No lock is held across an
//! await, and observer callbacks run after the lock is released so an
//! observer may call back into the orchestrator.
//!
//! A run is tagged with a generation number. [`Orchestrator::reset`] bumps
//! the generation. A stale run stops after its current unit, reports
//! nothing more to the observer and leaves the state alone.

use crate::artifact::{self, ArtifactInfo, OutputArtifact};
use crate::bundle::{self, ArchiveEngine, DownloadSink, ZipArchiveEngine};
use crate::config::{JobRequest, PageRangeMode, SplitMode, WorkbenchConfig};
use crate::engine::DocumentEngine;
use crate::error::WorkbenchError;
use crate::pipeline::invoke::{self, ExtractPage, ExtractSelection, PageOperation, RenderToImage};
use crate::progress::{JobObserver, NoopObserver, Notification};
use crate::selection::PageSelection;
use crate::source::{self, SourceFile};
use crate::ticker::{ProgressTicker, TickerSettings};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{error, info, warn};

// ── Public types ─────────────────────────────────────────────────────────

/// Where the orchestrator is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// No source file selected.
    Idle,
    /// A source is selected and options can be edited.
    OptionsVisible,
    /// A job is in flight; options are locked.
    Running,
    /// Artifacts are available for download.
    Complete,
    /// The last job failed; options can be edited and the job retried.
    Failed,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobState::Idle => "idle",
            JobState::OptionsVisible => "editing options",
            JobState::Running => "running",
            JobState::Complete => "complete",
            JobState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// How a run ended: artifacts or a reason, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(Vec<OutputArtifact>),
    Failed(String),
}

impl JobOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed(_))
    }
}

/// Per-run counts, including the pages that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Units the run attempted.
    pub requested: usize,
    /// Units that produced an artifact.
    pub produced: usize,
    /// Pages whose unit failed, ascending.
    pub skipped: Vec<usize>,
}

/// External capabilities the orchestrator is built with.
#[derive(Clone)]
pub struct Dependencies {
    pub engine: Arc<dyn DocumentEngine>,
    pub archive: Arc<dyn ArchiveEngine>,
    pub sink: Arc<dyn DownloadSink>,
    pub observer: Arc<dyn JobObserver>,
}

impl Dependencies {
    /// Zip archives and no observer.
    pub fn new(engine: Arc<dyn DocumentEngine>, sink: Arc<dyn DownloadSink>) -> Self {
        Self {
            engine,
            archive: Arc::new(ZipArchiveEngine),
            sink,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_archive(mut self, archive: Arc<dyn ArchiveEngine>) -> Self {
        self.archive = archive;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn JobObserver>) -> Self {
        self.observer = observer;
        self
    }
}

// ── State container ──────────────────────────────────────────────────────

struct Inner {
    state: JobState,
    source: Option<SourceFile>,
    range_mode: PageRangeMode,
    request: Option<JobRequest>,
    artifacts: Vec<OutputArtifact>,
    last_error: Option<String>,
    summary: Option<JobSummary>,
    generation: u64,
    ticker: Option<ProgressTicker>,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: JobState::Idle,
            source: None,
            range_mode: PageRangeMode::All,
            request: None,
            artifacts: Vec::new(),
            last_error: None,
            summary: None,
            generation: 0,
            ticker: None,
        }
    }

    fn clear_results(&mut self) {
        self.artifacts.clear();
        self.last_error = None;
        self.summary = None;
    }
}

/// Everything a run needs, captured when it starts.
struct RunPlan {
    generation: u64,
    source: SourceFile,
    range_mode: PageRangeMode,
    request: JobRequest,
}

/// Drives conversions for one source file.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<WorkbenchConfig>,
    deps: Dependencies,
    inner: Arc<Mutex<Inner>>,
    progress: watch::Sender<u8>,
}

impl Orchestrator {
    pub fn new(config: WorkbenchConfig, deps: Dependencies) -> Self {
        let (progress, _) = watch::channel(0u8);
        Self {
            config: Arc::new(config),
            deps,
            inner: Arc::new(Mutex::new(Inner::new())),
            progress,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Observables ──────────────────────────────────────────────────────

    pub fn state(&self) -> JobState {
        self.lock().state
    }

    /// Current progress in `0..=100`.
    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<u8> {
        self.progress.subscribe()
    }

    /// Progress as a stream, starting with the current value.
    pub fn progress_stream(&self) -> WatchStream<u8> {
        WatchStream::new(self.progress.subscribe())
    }

    pub fn artifacts(&self) -> Vec<OutputArtifact> {
        self.lock().artifacts.clone()
    }

    pub fn artifact_infos(&self) -> Vec<ArtifactInfo> {
        self.lock().artifacts.iter().map(OutputArtifact::info).collect()
    }

    /// The short message of the last failure, if the orchestrator is
    /// `Failed`.
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn summary(&self) -> Option<JobSummary> {
        self.lock().summary.clone()
    }

    pub fn source_name(&self) -> Option<String> {
        self.lock().source.as_ref().map(|s| s.name().to_string())
    }

    pub fn page_range_mode(&self) -> PageRangeMode {
        self.lock().range_mode.clone()
    }

    // ── Operations ───────────────────────────────────────────────────────

    /// Validate and select a source file.
    ///
    /// Rejected files leave the state unchanged and raise an error
    /// notification.
    pub fn select_source(&self, file: SourceFile) -> Result<(), WorkbenchError> {
        let current = self.state();
        if current == JobState::Running {
            return Err(WorkbenchError::InvalidState {
                operation: "select a file",
                state: current.to_string(),
            });
        }

        if let Err(e) = source::validate(&file, &self.config) {
            warn!("Rejected {}: {}", file.name(), e);
            self.notify(&Notification::error("Invalid file", e.user_message()));
            return Err(e);
        }

        info!("Selected {} ({})", file.name(), source::format_file_size(file.size()));
        {
            let mut inner = self.lock();
            inner.ticker = None;
            inner.clear_results();
            inner.source = Some(file);
            inner.range_mode = PageRangeMode::All;
            inner.request = None;
            inner.state = JobState::OptionsVisible;
        }
        self.progress.send_replace(0);
        self.deps.observer.on_state_change(JobState::OptionsVisible);
        Ok(())
    }

    /// Choose which pages the next run processes.
    ///
    /// From `Failed` this also returns to `OptionsVisible` for a retry.
    pub fn set_page_range_mode(&self, mode: PageRangeMode) -> Result<(), WorkbenchError> {
        let retried = {
            let mut inner = self.lock();
            match inner.state {
                JobState::OptionsVisible => {
                    inner.range_mode = mode;
                    false
                }
                JobState::Failed => {
                    inner.range_mode = mode;
                    inner.clear_results();
                    inner.state = JobState::OptionsVisible;
                    true
                }
                other => {
                    return Err(WorkbenchError::InvalidState {
                        operation: "change the page range",
                        state: other.to_string(),
                    })
                }
            }
        };
        if retried {
            self.progress.send_replace(0);
            self.deps.observer.on_state_change(JobState::OptionsVisible);
        }
        Ok(())
    }

    /// Start a job in the background and return its handle.
    ///
    /// Only allowed from `OptionsVisible`. A failed job goes back there
    /// through [`Orchestrator::set_page_range_mode`] before a retry.
    ///
    /// The state is `Running` when this returns. Must be called from within
    /// a tokio runtime.
    pub fn start(&self, request: JobRequest) -> Result<JoinHandle<JobOutcome>, WorkbenchError> {
        let plan = self.begin(request)?;
        let this = self.clone();
        Ok(tokio::spawn(async move { this.drive(plan).await }))
    }

    /// Run a job to completion.
    ///
    /// Same preconditions as [`Orchestrator::start`]. Returns `Err` only when
    /// the job could not start. A job that starts always ends in `Complete`
    /// or `Failed`, reported through the outcome.
    pub async fn run(&self, request: JobRequest) -> Result<JobOutcome, WorkbenchError> {
        let plan = self.begin(request)?;
        Ok(self.drive(plan).await)
    }

    /// Deliver artifact `index` through the download sink.
    pub async fn download_one(&self, index: usize) -> Result<ArtifactInfo, WorkbenchError> {
        let artifact = {
            let inner = self.lock();
            inner
                .artifacts
                .get(index)
                .cloned()
                .ok_or(WorkbenchError::IndexOutOfRange {
                    index,
                    len: inner.artifacts.len(),
                })?
        };

        let info = artifact.info();
        self.deliver(artifact).await?;
        Ok(info)
    }

    /// Bundle every artifact into one archive and deliver it.
    ///
    /// Fails with [`WorkbenchError::NothingToBundle`] before touching the
    /// archive engine when there are no artifacts.
    pub async fn download_all(&self) -> Result<ArtifactInfo, WorkbenchError> {
        let (artifacts, archive_name) = {
            let inner = self.lock();
            if inner.artifacts.is_empty() {
                return Err(WorkbenchError::NothingToBundle);
            }
            let suffix = match inner.request {
                Some(JobRequest::Split(_)) => "pages",
                _ => "images",
            };
            let base = inner.source.as_ref().map(SourceFile::base_name);
            (
                inner.artifacts.clone(),
                artifact::archive_name(base.as_deref(), suffix),
            )
        };

        let engine = Arc::clone(&self.deps.archive);
        let archive = tokio::task::spawn_blocking(move || {
            bundle::bundle_artifacts(engine.as_ref(), &artifacts, &archive_name)
        })
        .await
        .map_err(|e| WorkbenchError::Internal(format!("bundling task failed: {e}")))
        .and_then(|r| r);

        let archive = match archive {
            Ok(a) => a,
            Err(e) => {
                error!("Bundling failed: {}", e);
                self.notify(&Notification::error("Download failed", e.user_message()));
                return Err(e);
            }
        };

        let info = archive.info();
        self.deliver(archive).await?;
        Ok(info)
    }

    /// Return to `Idle` from any state.
    ///
    /// Drops the source and artifacts and stops the progress timer. A run
    /// still in flight keeps going but its result is discarded.
    pub fn reset(&self) {
        {
            let mut inner = self.lock();
            inner.generation += 1;
            inner.ticker = None;
            inner.clear_results();
            inner.source = None;
            inner.range_mode = PageRangeMode::All;
            inner.request = None;
            inner.state = JobState::Idle;
        }
        self.progress.send_replace(0);
        info!("Reset");
        self.deps.observer.on_state_change(JobState::Idle);
    }

    // ── Run internals ────────────────────────────────────────────────────

    fn begin(&self, request: JobRequest) -> Result<RunPlan, WorkbenchError> {
        let plan = {
            let mut inner = self.lock();
            if inner.state != JobState::OptionsVisible {
                return Err(WorkbenchError::InvalidState {
                    operation: "start a job",
                    state: inner.state.to_string(),
                });
            }
            let source = inner.source.clone().ok_or(WorkbenchError::NoSource)?;

            inner.generation += 1;
            inner.clear_results();
            inner.request = Some(request);
            inner.state = JobState::Running;

            self.progress.send_replace(0);
            inner.ticker = Some(ProgressTicker::start(
                self.progress.clone(),
                TickerSettings::from(self.config.as_ref()),
            ));

            RunPlan {
                generation: inner.generation,
                source,
                range_mode: inner.range_mode.clone(),
                request,
            }
        };

        info!("Starting {:?} on {}", plan.request, plan.source.name());
        self.deps.observer.on_state_change(JobState::Running);
        Ok(plan)
    }

    /// `false` once `reset` or a newer run has superseded `generation`.
    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    async fn drive(&self, plan: RunPlan) -> JobOutcome {
        let result = self.execute(&plan).await;
        self.finish(plan.generation, result)
    }

    async fn execute(
        &self,
        plan: &RunPlan,
    ) -> Result<(Vec<OutputArtifact>, JobSummary), WorkbenchError> {
        let name = plan.source.name().to_string();

        // ── Open ─────────────────────────────────────────────────────────
        let engine = Arc::clone(&self.deps.engine);
        let source = plan.source.clone();
        let document = tokio::task::spawn_blocking(move || engine.open(&source))
            .await
            .map_err(|e| WorkbenchError::Internal(format!("open task failed: {e}")))?
            .map_err(|e| e.into_fatal(&name))?;

        let total_pages = document.page_count();
        if total_pages == 0 {
            return Err(WorkbenchError::OpenFailed {
                name,
                detail: "document has no pages".into(),
            });
        }

        // ── Select ───────────────────────────────────────────────────────
        let selection = PageSelection::resolve(&plan.range_mode, total_pages);
        let base_name = plan.source.base_name();

        // Single-file split is one unit covering the whole selection.
        let (op, units) = match plan.request {
            JobRequest::ToImages(options) => {
                let op = RenderToImage {
                    document,
                    options,
                    base_name,
                };
                (Arc::new(op) as Arc<dyn PageOperation>, selection.pages().to_vec())
            }
            JobRequest::Split(SplitMode::Multiple) => {
                let op = ExtractPage {
                    document,
                    base_name,
                };
                (Arc::new(op) as Arc<dyn PageOperation>, selection.pages().to_vec())
            }
            JobRequest::Split(SplitMode::Single) => {
                let op = ExtractSelection {
                    document,
                    base_name,
                    pages: selection.pages().to_vec(),
                };
                (Arc::new(op) as Arc<dyn PageOperation>, selection.pages()[..1].to_vec())
            }
        };

        info!(
            "Processing {} of {} pages ({} units)",
            selection.len(),
            total_pages,
            units.len()
        );
        if self.is_current(plan.generation) {
            self.deps.observer.on_job_start(units.len());
        }

        // ── Transform ────────────────────────────────────────────────────
        let is_current = || self.is_current(plan.generation);
        let batch =
            invoke::process_units(op, &units, self.deps.observer.as_ref(), is_current).await;

        if batch.artifacts.is_empty() {
            return Err(WorkbenchError::AllUnitsFailed {
                total: units.len(),
                first_error: batch
                    .errors
                    .first()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "no units produced output".into()),
            });
        }

        let summary = JobSummary {
            requested: units.len(),
            produced: batch.artifacts.len(),
            skipped: batch.errors.iter().map(|e| e.page()).collect(),
        };
        Ok((batch.artifacts, summary))
    }

    fn finish(
        &self,
        generation: u64,
        result: Result<(Vec<OutputArtifact>, JobSummary), WorkbenchError>,
    ) -> JobOutcome {
        let mut inner = self.lock();

        if inner.generation != generation {
            warn!(
                "Discarding result of superseded run {} (current {})",
                generation, inner.generation
            );
            return match result {
                Ok((artifacts, _)) => JobOutcome::Completed(artifacts),
                Err(e) => JobOutcome::Failed(e.user_message()),
            };
        }

        // Stop the timer before publishing the final value.
        inner.ticker = None;

        match result {
            Ok((artifacts, summary)) => {
                info!(
                    "Job complete: {}/{} units produced output",
                    summary.produced, summary.requested
                );
                inner.artifacts = artifacts.clone();
                inner.summary = Some(summary.clone());
                inner.state = JobState::Complete;
                drop(inner);

                self.progress.send_replace(100);
                self.deps
                    .observer
                    .on_job_complete(summary.requested, summary.produced);
                self.deps.observer.on_state_change(JobState::Complete);
                self.notify(&Notification::success(
                    "Conversion complete",
                    completion_message(&summary),
                ));
                JobOutcome::Completed(artifacts)
            }
            Err(e) => {
                error!("Job failed: {}", e);
                let message = e.user_message();
                inner.artifacts.clear();
                inner.last_error = Some(message.clone());
                inner.state = JobState::Failed;
                drop(inner);

                self.progress.send_replace(0);
                self.deps.observer.on_state_change(JobState::Failed);
                self.notify(&Notification::error("Conversion failed", message.clone()));
                JobOutcome::Failed(message)
            }
        }
    }

    async fn deliver(&self, artifact: OutputArtifact) -> Result<(), WorkbenchError> {
        let sink = Arc::clone(&self.deps.sink);
        let result = tokio::task::spawn_blocking(move || {
            sink.deliver(&artifact.name, &artifact.media_type, &artifact.bytes)
        })
        .await
        .map_err(|e| WorkbenchError::Internal(format!("delivery task failed: {e}")))
        .and_then(|r| r);

        if let Err(e) = &result {
            error!("Delivery failed: {}", e);
            self.notify(&Notification::error("Download failed", e.user_message()));
        }
        result
    }

    fn notify(&self, notification: &Notification) {
        self.deps.observer.on_notification(notification);
    }
}

fn completion_message(summary: &JobSummary) -> String {
    if summary.skipped.is_empty() {
        format!("{} files ready to download", summary.produced)
    } else {
        let skipped: Vec<String> = summary.skipped.iter().map(ToString::to_string).collect();
        format!(
            "{} of {} files ready; skipped page(s) {}",
            summary.produced,
            summary.requested,
            skipped.join(", ")
        )
    }
}
