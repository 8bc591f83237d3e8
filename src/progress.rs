//! Observer trait for job events and user notifications.
//!
//! Inject an [`Arc<dyn JobObserver>`] through
//! [`crate::orchestrator::Dependencies`] to receive state changes, per-page
//! results and the notifications a UI would show as toasts. The observer is
//! owned by the orchestrator that was given it; there is no global
//! dispatcher.
//!
//! # Example
//!
//! ```rust
//! use pdf_workbench::{JobObserver, Notification};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Toasts(Mutex<Vec<String>>);
//!
//! impl JobObserver for Toasts {
//!     fn on_notification(&self, n: &Notification) {
//!         self.0.lock().unwrap().push(n.title.clone());
//!     }
//! }
//!
//! let observer: Arc<dyn JobObserver> = Arc::new(Toasts::default());
//! ```

use crate::orchestrator::JobState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Severity of a [`Notification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

/// A short, dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn success(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Called by the orchestrator as a job moves through its states.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Calls arrive from the task driving the job, never
/// concurrently for one orchestrator, but the trait is `Send + Sync` because
/// that task may run on any runtime worker.
pub trait JobObserver: Send + Sync {
    /// The orchestrator entered `state`.
    fn on_state_change(&self, state: JobState) {
        let _ = state;
    }

    /// A run started with `total_units` pages to process.
    fn on_job_start(&self, total_units: usize) {
        let _ = total_units;
    }

    /// One unit produced `artifact_name`.
    ///
    /// # Arguments
    /// * `page_num`   : 1-indexed page number in the source document
    /// * `position`   : 1-indexed position of this unit within the run
    /// * `total_units`: units in this run
    fn on_unit_complete(
        &self,
        page_num: usize,
        position: usize,
        total_units: usize,
        artifact_name: &str,
    ) {
        let _ = (page_num, position, total_units, artifact_name);
    }

    /// One unit failed and was skipped.
    fn on_unit_error(&self, page_num: usize, position: usize, total_units: usize, error: &str) {
        let _ = (page_num, position, total_units, error);
    }

    /// A run finished; `produced` of `requested` units succeeded.
    fn on_job_complete(&self, requested: usize, produced: usize) {
        let _ = (requested, produced);
    }

    /// Show `notification` to the user.
    fn on_notification(&self, notification: &Notification) {
        let _ = notification;
    }
}

/// An observer that ignores everything.
///
/// This is the default when no observer is configured.
pub struct NoopObserver;

impl JobObserver for NoopObserver {}

/// Convenience alias for the shared observer type.
pub type SharedObserver = Arc<dyn JobObserver>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Tracking {
        completes: AtomicUsize,
        errors: AtomicUsize,
        states: Mutex<Vec<JobState>>,
    }

    impl JobObserver for Tracking {
        fn on_state_change(&self, state: JobState) {
            self.states.lock().unwrap().push(state);
        }

        fn on_unit_complete(&self, _page: usize, _pos: usize, _total: usize, _name: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_unit_error(&self, _page: usize, _pos: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let o = NoopObserver;
        o.on_state_change(JobState::Running);
        o.on_job_start(3);
        o.on_unit_complete(1, 1, 3, "a_page_1.jpg");
        o.on_unit_error(2, 2, 3, "boom");
        o.on_job_complete(3, 2);
        o.on_notification(&Notification::success("Done", "ok"));
    }

    #[test]
    fn overridden_methods_receive_events() {
        let t = Tracking::default();
        t.on_state_change(JobState::Running);
        t.on_unit_complete(1, 1, 2, "x");
        t.on_unit_error(2, 2, 2, "y");
        t.on_state_change(JobState::Complete);

        assert_eq!(t.completes.load(Ordering::SeqCst), 1);
        assert_eq!(t.errors.load(Ordering::SeqCst), 1);
        assert_eq!(
            *t.states.lock().unwrap(),
            vec![JobState::Running, JobState::Complete]
        );
    }

    #[test]
    fn notification_constructors() {
        let n = Notification::error("Conversion failed", "Please try again.");
        assert_eq!(n.level, NotificationLevel::Error);
        let json = serde_json::to_string(&n).unwrap();
        assert!(json.contains("\"error\""));
    }
}
