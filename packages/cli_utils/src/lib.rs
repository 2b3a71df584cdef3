#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared CLI utilities for the route equity toolchain.
//!
//! Provides `indicatif`-backed progress bars behind the bootstrap
//! [`ProgressCallback`] trait, falling back to periodic log lines when
//! stderr is not a terminal, plus [`init_logger`] which sets up
//! `indicatif-log-bridge` so that `log::info!` and friends are suspended
//! while progress bars redraw.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use route_equity_bootstrap::progress::{LogProgress, ProgressCallback};

pub use indicatif::MultiProgress;

/// An `indicatif` [`ProgressBar`] that implements [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Style to switch to once `set_total()` provides a known length.
    bar_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Bar for bootstrap iterations. Starts as a spinner and becomes a bar
    /// with percentage and ETA once the iteration count is set.
    #[must_use]
    pub fn iterations_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.yellow} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let bar_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.yellow/dim} {pos}/{len} {percent}% [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self { bar, bar_style })
    }

    /// Bar for a known number of input files.
    #[must_use]
    pub fn files_bar(multi: &MultiProgress, message: &str, total: u64) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new(total));
        bar.set_style(
            ProgressStyle::with_template(
                "{msg} {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}]",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
        );
        bar.set_message(message.to_string());

        let bar_style = bar.style();

        Arc::new(Self { bar, bar_style })
    }
}

/// Number of log lines a bootstrap run emits without a progress bar.
const LOGGED_STEPS: u64 = 10;

/// Whether progress bars can be drawn, i.e. stderr is a terminal.
#[must_use]
pub fn progress_bars_enabled() -> bool {
    std::io::stderr().is_terminal()
}

/// Progress for `iterations` bootstrap iterations: a bar when `bars` is
/// set, otherwise a log line every tenth of the run.
#[must_use]
pub fn iterations_progress(
    multi: &MultiProgress,
    bars: bool,
    message: &str,
    iterations: usize,
) -> Arc<dyn ProgressCallback> {
    if bars {
        IndicatifProgress::iterations_bar(multi, message)
    } else {
        Arc::new(LogProgress::new(message, log_interval(iterations as u64)))
    }
}

/// Progress over `total` input files: a bar when `bars` is set, otherwise
/// a log line per file.
#[must_use]
pub fn files_progress(
    multi: &MultiProgress,
    bars: bool,
    message: &str,
    total: u64,
) -> Arc<dyn ProgressCallback> {
    if bars {
        IndicatifProgress::files_bar(multi, message, total)
    } else {
        let progress = LogProgress::new(message, 1);
        progress.set_total(total);
        Arc::new(progress)
    }
}

const fn log_interval(total: u64) -> u64 {
    let every = total / LOGGED_STEPS;
    if every == 0 { 1 } else { every }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.bar_style.clone());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Initializes the global logger wrapped in `indicatif-log-bridge` so that
/// `log::info!` and friends are suspended while progress bars redraw.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Already set when several tests initialize logging.
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}
