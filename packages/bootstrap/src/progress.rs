//! Progress reporting for bootstrap runs.
//!
//! [`ProgressCallback`] decouples iteration progress from how it is shown
//! (`indicatif` bars in the CLI, periodic log lines, or nothing at all in
//! tests). Rendering implementations live upstream in the binaries.

use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for reporting progress from long-running operations.
///
/// Implementations must be `Send + Sync` because bootstrap iterations call
/// [`ProgressCallback::inc`] from rayon worker threads.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work (enables percentage/ETA).
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// Silently ignores all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}

/// Emits an `info` log line every `every` units of work.
///
/// Used in place of a progress bar when stderr is not a terminal.
pub struct LogProgress {
    label: String,
    every: u64,
    total: AtomicU64,
    done: AtomicU64,
}

impl LogProgress {
    #[must_use]
    pub fn new(label: impl Into<String>, every: u64) -> Self {
        Self {
            label: label.into(),
            every: every.max(1),
            total: AtomicU64::new(0),
            done: AtomicU64::new(0),
        }
    }
}

impl ProgressCallback for LogProgress {
    fn set_total(&self, total: u64) {
        self.total.store(total, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
    }

    fn inc(&self, delta: u64) {
        let before = self.done.fetch_add(delta, Ordering::Relaxed);
        if crosses_report_point(before, delta, self.every) {
            log::info!(
                "{}: {} of {}",
                self.label,
                before + delta,
                self.total.load(Ordering::Relaxed)
            );
        }
    }

    fn set_message(&self, msg: String) {
        log::info!("{}: {msg}", self.label);
    }

    fn finish(&self, msg: String) {
        log::info!("{}: {msg}", self.label);
    }
}

/// Whether advancing from `before` by `delta` passes a multiple of `every`.
const fn crosses_report_point(before: u64, delta: u64, every: u64) -> bool {
    (before + delta) / every > before / every
}
