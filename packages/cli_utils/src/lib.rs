#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the heatmap CLI.
//!
//! A run goes through several request phases (baseline window, target
//! range, hourly series). [`PhaseProgress`] gives each phase its own bar:
//! the phase name is taken from the last [`ProgressCallback::set_message`]
//! before [`ProgressCallback::set_total`], and a finished phase stays on
//! screen as a one-line summary. [`init_logger`] routes `log` output
//! through `indicatif-log-bridge` so log lines do not tear the bars.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use heatmap_source::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

const TICK: Duration = Duration::from_millis(100);

fn running_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:>10.cyan.bold} {wide_bar:.cyan/dim} {pos}/{len} requests {percent}% [{eta}]",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("##-")
}

fn done_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix:>10.green.bold} {msg} in {elapsed}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Request progress with one bar per phase.
pub struct PhaseProgress {
    multi: MultiProgress,
    phase: Mutex<String>,
    bar: Mutex<Option<ProgressBar>>,
}

impl PhaseProgress {
    /// Creates a reporter whose bars are added to `multi`. Nothing is drawn
    /// until the first phase announces its request count.
    #[must_use]
    pub fn new(multi: &MultiProgress) -> Arc<Self> {
        Arc::new(Self {
            multi: multi.clone(),
            phase: Mutex::new("Requests".to_string()),
            bar: Mutex::new(None),
        })
    }

    fn current(&self) -> Option<ProgressBar> {
        self.bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressCallback for PhaseProgress {
    fn set_total(&self, total: u64) {
        let phase = self
            .phase
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let bar = self.multi.add(ProgressBar::new(total));
        bar.set_style(running_style());
        bar.set_prefix(phase);
        bar.enable_steady_tick(TICK);

        let previous = self
            .bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(bar);
        if let Some(previous) = previous
            && !previous.is_finished()
        {
            previous.abandon();
        }
    }

    fn inc(&self, delta: u64) {
        if let Some(bar) = self.current() {
            bar.inc(delta);
        }
    }

    fn set_message(&self, msg: String) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = msg;
    }

    fn finish(&self, msg: String) {
        if let Some(bar) = self.current() {
            bar.set_style(done_style());
            bar.finish_with_message(msg);
        }
    }

    fn finish_and_clear(&self) {
        let bar = self
            .bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(bar) = bar {
            bar.finish_and_clear();
            self.multi.remove(&bar);
        }
    }
}

/// Installs `pretty_env_logger` (filtered by `RUST_LOG`) behind
/// `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] that progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}
