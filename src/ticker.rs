//! Simulated progress.
//!
//! The engine gives no per-page progress signal fine enough to drive a bar,
//! so while a job runs a timer nudges the value upward by a small random
//! step, never past a ceiling below 100. Only the orchestrator moves it to
//! 100, when the job actually completes.
//!
//! [`ProgressTicker`] is a guard: the timer task lives exactly as long as the
//! guard does.

use crate::config::WorkbenchConfig;
use rand_core::{OsRng, RngCore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Timer parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerSettings {
    pub interval: Duration,
    pub ceiling: u8,
    pub max_step: u8,
}

impl Default for TickerSettings {
    fn default() -> Self {
        Self::from(&WorkbenchConfig::default())
    }
}

impl From<&WorkbenchConfig> for TickerSettings {
    fn from(config: &WorkbenchConfig) -> Self {
        Self {
            interval: config.tick_interval(),
            ceiling: config.progress_ceiling,
            max_step: config.max_tick_step.max(1),
        }
    }
}

/// A running progress timer. Dropping it stops the timer.
#[derive(Debug)]
pub struct ProgressTicker {
    active: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    /// Spawn the timer on the current runtime.
    ///
    /// Every `settings.interval` the value in `progress` grows by a random
    /// step in `1..=max_step`, capped at `ceiling`. The task ends by itself
    /// once the ceiling is reached.
    pub fn start(progress: watch::Sender<u8>, settings: TickerSettings) -> Self {
        let active = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&active);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(settings.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;

            loop {
                interval.tick().await;
                let step = random_step(settings.max_step);
                // Checked under the channel lock so a stopped ticker can never
                // overwrite the value the orchestrator publishes after it.
                progress.send_if_modified(|value| {
                    if !flag.load(Ordering::SeqCst) {
                        return false;
                    }
                    let next = next_value(*value, step, settings.ceiling);
                    let changed = next != *value;
                    *value = next;
                    changed
                });

                if !flag.load(Ordering::SeqCst) || *progress.borrow() >= settings.ceiling {
                    break;
                }
            }
            debug!("Progress ticker finished");
        });

        Self { active, handle }
    }

    /// Stop the timer now. Equivalent to dropping the guard.
    pub fn stop(self) {}
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
        self.handle.abort();
    }
}

/// Advance `current` by `step`, never past `ceiling`.
///
/// A value already at or above the ceiling (for example 100 after
/// completion) is left alone.
pub fn next_value(current: u8, step: u8, ceiling: u8) -> u8 {
    if current >= ceiling {
        current
    } else {
        current.saturating_add(step).min(ceiling)
    }
}

fn random_step(max_step: u8) -> u8 {
    let max = u32::from(max_step.max(1));
    (OsRng.next_u32() % max) as u8 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> TickerSettings {
        TickerSettings {
            interval: Duration::from_millis(200),
            ceiling: 90,
            max_step: 10,
        }
    }

    #[test]
    fn next_value_caps_at_ceiling() {
        assert_eq!(next_value(0, 7, 90), 7);
        assert_eq!(next_value(85, 10, 90), 90);
        assert_eq!(next_value(90, 5, 90), 90);
        assert_eq!(next_value(100, 5, 90), 100);
        assert_eq!(next_value(250, 10, 255), 255);
    }

    #[test]
    fn random_step_is_in_range() {
        for _ in 0..1000 {
            let s = random_step(10);
            assert!((1..=10).contains(&s), "step {s}");
        }
        assert_eq!(random_step(0), 1);
        assert_eq!(random_step(1), 1);
    }

    #[test]
    fn settings_follow_config() {
        let config = WorkbenchConfig::builder()
            .tick_interval_ms(50)
            .progress_ceiling(80)
            .build()
            .unwrap();
        let s = TickerSettings::from(&config);
        assert_eq!(s.interval, Duration::from_millis(50));
        assert_eq!(s.ceiling, 80);
    }

    #[tokio::test(start_paused = true)]
    async fn climbs_monotonically_to_ceiling() {
        let (tx, rx) = watch::channel(0u8);
        let _ticker = ProgressTicker::start(tx, settings());

        tokio::task::yield_now().await;
        assert_eq!(*rx.borrow(), 0, "no step before the first interval");

        let mut last = 0u8;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let now = *rx.borrow();
            assert!(now >= last, "went backwards: {last} -> {now}");
            assert!(now <= 90, "passed ceiling: {now}");
            last = now;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*rx.borrow(), 90);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_guard_stops_updates() {
        let (tx, rx) = watch::channel(0u8);
        let ticker = ProgressTicker::start(tx, settings());

        tokio::time::sleep(Duration::from_millis(650)).await;
        ticker.stop();
        let frozen = *rx.borrow();
        assert!(frozen > 0 && frozen <= 30, "got {frozen}");

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(*rx.borrow(), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_value_is_never_lowered() {
        let (tx, rx) = watch::channel(100u8);
        let _ticker = ProgressTicker::start(tx, settings());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(*rx.borrow(), 100);
    }
}
