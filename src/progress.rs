//! Console progress: one live bar per active host.
//!
//! Bars are keyed by host name and cleared as each pipeline finishes;
//! the run summary afterwards is the durable record.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::engine::{HostReport, Progress, StepReport};
use crate::ui;

pub struct ConsoleProgress {
    multi: MultiProgress,
    bars: Mutex<HashMap<String, ProgressBar>>,
}

impl ConsoleProgress {
    pub fn new(quiet: bool) -> Self {
        let multi = MultiProgress::new();
        if quiet {
            multi.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self {
            multi,
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} [{pos}/{len}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl Progress for ConsoleProgress {
    fn on_host_start(&self, host: &str, steps: usize) {
        let bar = self.multi.add(ProgressBar::new(steps as u64));
        bar.set_style(Self::style());
        bar.set_prefix(host.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        self.bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(host.to_string(), bar);
    }

    fn on_step_complete(&self, host: &str, report: &StepReport) {
        let bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bar) = bars.get(host) {
            bar.set_message(format!(
                "{} {}",
                ui::outcome_glyph(report.outcome),
                report.step
            ));
            bar.inc(1);
        }
    }

    fn on_host_complete(&self, report: &HostReport) {
        let bar = self
            .bars
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&report.host);
        if let Some(bar) = bar {
            bar.finish_and_clear();
        }
    }
}
