//! Transformation invoker: run one engine call per page, in order.
//!
//! Each unit runs on the blocking pool and is awaited before the next one
//! starts. Engines are not assumed to tolerate concurrent calls on one
//! document, and ordering falls out for free.
//!
//! A failing unit is logged, reported to the observer and skipped. The
//! caller decides what an empty result means.

use crate::artifact::{self, OutputArtifact};
use crate::config::ImageOptions;
use crate::engine::DocumentHandle;
use crate::error::UnitError;
use crate::progress::JobObserver;
use std::sync::Arc;
use tracing::{debug, warn};

/// One kind of per-page work.
///
/// `process` is blocking and is called from `spawn_blocking`.
pub trait PageOperation: Send + Sync {
    /// Produce the artifact for `page_num` (1-indexed).
    fn process(&self, page_num: usize) -> Result<OutputArtifact, UnitError>;
}

/// Render a page to an encoded image named `<base>_page_<n>.<ext>`.
pub struct RenderToImage {
    pub document: Arc<dyn DocumentHandle>,
    pub options: ImageOptions,
    pub base_name: String,
}

impl PageOperation for RenderToImage {
    fn process(&self, page_num: usize) -> Result<OutputArtifact, UnitError> {
        let bytes = self
            .document
            .render_page(page_num - 1, &self.options)
            .map_err(|e| e.into_unit(page_num))?;
        Ok(OutputArtifact::new(
            artifact::page_image_name(&self.base_name, page_num, self.options.format),
            self.options.format.media_type(),
            bytes,
        ))
    }
}

/// Copy a page into its own PDF named `<base>_page_<n>.pdf`.
pub struct ExtractPage {
    pub document: Arc<dyn DocumentHandle>,
    pub base_name: String,
}

impl PageOperation for ExtractPage {
    fn process(&self, page_num: usize) -> Result<OutputArtifact, UnitError> {
        let bytes = self
            .document
            .extract_pages(&[page_num - 1])
            .map_err(|e| e.into_unit(page_num))?;
        Ok(artifact::pdf_artifact(
            artifact::page_document_name(&self.base_name, page_num),
            bytes,
        ))
    }
}

/// Copy every selected page into one PDF named `<base>_extracted.pdf`.
///
/// This is a single unit: it is invoked once, with the first selected page
/// standing in for the whole selection.
pub struct ExtractSelection {
    pub document: Arc<dyn DocumentHandle>,
    pub base_name: String,
    pub pages: Vec<usize>,
}

impl PageOperation for ExtractSelection {
    fn process(&self, page_num: usize) -> Result<OutputArtifact, UnitError> {
        let indices: Vec<usize> = self.pages.iter().map(|p| p - 1).collect();
        let bytes = self
            .document
            .extract_pages(&indices)
            .map_err(|e| e.into_unit(page_num))?;
        Ok(artifact::pdf_artifact(
            artifact::extracted_document_name(&self.base_name),
            bytes,
        ))
    }
}

/// Result of a batch: the artifacts that succeeded and the errors of the
/// units that did not.
#[derive(Debug, Default)]
pub struct BatchResult {
    pub artifacts: Vec<OutputArtifact>,
    pub errors: Vec<UnitError>,
}

/// Run `op` for every page in `pages`, one at a time, in order.
///
/// `is_current` is checked after every unit. Once it returns `false` the
/// run has been superseded: the finished unit is not reported and no
/// further units start.
pub async fn process_units<F>(
    op: Arc<dyn PageOperation>,
    pages: &[usize],
    observer: &dyn JobObserver,
    is_current: F,
) -> BatchResult
where
    F: Fn() -> bool,
{
    let total = pages.len();
    let mut result = BatchResult {
        artifacts: Vec::with_capacity(total),
        errors: Vec::new(),
    };

    for (position, &page_num) in (1..).zip(pages) {
        let unit_op = Arc::clone(&op);
        let outcome = tokio::task::spawn_blocking(move || unit_op.process(page_num))
            .await
            .unwrap_or_else(|e| {
                Err(UnitError::Panicked {
                    page: page_num,
                    detail: e.to_string(),
                })
            });

        if !is_current() {
            debug!("Run superseded after page {}; stopping", page_num);
            break;
        }

        match outcome {
            Ok(artifact) => {
                debug!(
                    "Page {} ({}/{}) → {} ({} bytes)",
                    page_num,
                    position,
                    total,
                    artifact.name,
                    artifact.size()
                );
                observer.on_unit_complete(page_num, position, total, &artifact.name);
                result.artifacts.push(artifact);
            }
            Err(e) => {
                warn!("Skipping page {}: {}", page_num, e);
                observer.on_unit_error(page_num, position, total, &e.to_string());
                result.errors.push(e);
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopObserver;
    use std::sync::Mutex;

    /// Fails on the listed pages; records call order.
    struct Scripted {
        fail_on: Vec<usize>,
        calls: Mutex<Vec<usize>>,
    }

    impl PageOperation for Scripted {
        fn process(&self, page_num: usize) -> Result<OutputArtifact, UnitError> {
            self.calls.lock().unwrap().push(page_num);
            if page_num == 99 {
                panic!("engine crashed");
            }
            if self.fail_on.contains(&page_num) {
                return Err(UnitError::RenderFailed {
                    page: page_num,
                    detail: "scripted".into(),
                });
            }
            Ok(OutputArtifact::new(
                format!("p{page_num}"),
                "image/png",
                vec![page_num as u8],
            ))
        }
    }

    fn scripted(fail_on: &[usize]) -> Arc<Scripted> {
        Arc::new(Scripted {
            fail_on: fail_on.to_vec(),
            calls: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn all_units_succeed_in_order() {
        let op = scripted(&[]);
        let result = process_units(op.clone(), &[2, 3, 4, 7], &NoopObserver, || true).await;
        let names: Vec<_> = result.artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["p2", "p3", "p4", "p7"]);
        assert!(result.errors.is_empty());
        assert_eq!(*op.calls.lock().unwrap(), vec![2, 3, 4, 7]);
    }

    #[tokio::test]
    async fn failed_units_are_skipped() {
        let op = scripted(&[3, 7]);
        let result = process_units(op.clone(), &[2, 3, 4, 7], &NoopObserver, || true).await;
        let names: Vec<_> = result.artifacts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["p2", "p4"]);
        assert_eq!(result.errors.len(), 2);
        // Every unit was still attempted.
        assert_eq!(op.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn panicking_unit_becomes_unit_error() {
        let op = scripted(&[]);
        let result = process_units(op, &[1, 99, 2], &NoopObserver, || true).await;
        assert_eq!(result.artifacts.len(), 2);
        assert!(matches!(result.errors[0], UnitError::Panicked { page: 99, .. }));
    }

    #[derive(Default)]
    struct Positions(Mutex<Vec<(usize, usize, usize)>>);

    impl JobObserver for Positions {
        fn on_unit_complete(&self, page_num: usize, position: usize, total: usize, _name: &str) {
            self.0.lock().unwrap().push((page_num, position, total));
        }

        fn on_unit_error(&self, page_num: usize, position: usize, total: usize, _error: &str) {
            self.0.lock().unwrap().push((page_num, position, total));
        }
    }

    #[tokio::test]
    async fn callbacks_carry_position_and_page() {
        let observer = Positions::default();
        process_units(scripted(&[4]), &[2, 4, 7], &observer, || true).await;
        assert_eq!(
            *observer.0.lock().unwrap(),
            vec![(2, 1, 3), (4, 2, 3), (7, 3, 3)]
        );
    }

    #[tokio::test]
    async fn superseded_run_stops_and_stays_silent() {
        let observer = Positions::default();
        let op = scripted(&[]);
        let checks = std::sync::atomic::AtomicUsize::new(0);
        // Current for the first unit only.
        let is_current = || checks.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0;

        let result = process_units(op.clone(), &[1, 2, 3], &observer, is_current).await;

        assert_eq!(result.artifacts.len(), 1);
        assert_eq!(*op.calls.lock().unwrap(), vec![1, 2]);
        assert_eq!(*observer.0.lock().unwrap(), vec![(1, 1, 3)]);
    }

    #[tokio::test]
    async fn empty_selection_yields_nothing() {
        let result = process_units(scripted(&[]), &[], &NoopObserver, || true).await;
        assert!(result.artifacts.is_empty());
        assert!(result.errors.is_empty());
    }
}
