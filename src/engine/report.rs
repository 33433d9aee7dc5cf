//! Run reports: per-step outcomes rolled up per host and per run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one step on one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The action applied a change.
    Changed,
    /// Desired state already held; nothing was done.
    Satisfied,
    /// The predicate excluded the host, an earlier step failed, or
    /// the run was cancelled.
    Skipped,
    /// The action failed, its transport failed, or its deadline
    /// elapsed.
    Failed,
}

impl Outcome {
    /// Lowercase label, matching the JSON encoding.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Changed => "changed",
            Self::Satisfied => "satisfied",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

/// Aggregated status of one host's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    /// Every applicable step was already satisfied.
    Ok,
    /// At least one step applied a change; everything converged.
    Changed,
    /// Steps converged but a handler failed.
    Degraded,
    /// A step failed, or the host's plan could not be built.
    Failed,
    /// The run was cancelled before this pipeline completed.
    Cancelled,
}

impl HostStatus {
    /// Whether the host ended in a converged state.
    pub fn is_converged(&self) -> bool {
        matches!(self, Self::Ok | Self::Changed)
    }

    /// Lowercase label, matching the JSON encoding.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Changed => "changed",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One step's result on one host.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    /// Step name from the runbook.
    pub step: String,
    /// Action kind (`package`, `service`, ...).
    pub action: String,
    /// What happened.
    pub outcome: Outcome,
    /// Failure message, skip reason, or would-change note.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub detail: Option<String>,
    /// Wall time spent on the step.
    #[serde(default)]
    pub duration_ms: u64,
}

impl StepReport {
    /// A step that never ran.
    pub fn skipped(step: &str, action: &str, reason: &str) -> Self {
        Self {
            step: step.to_string(),
            action: action.to_string(),
            outcome: Outcome::Skipped,
            detail: Some(reason.to_string()),
            duration_ms: 0,
        }
    }
}

/// One host's full result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostReport {
    /// Host name from the inventory.
    pub host: String,
    /// Aggregated status.
    pub status: HostStatus,
    /// Per-step results in plan order.
    pub steps: Vec<StepReport>,
    /// Handlers that fired (or would fire, in check mode).
    #[serde(default)]
    pub fired_handlers: Vec<String>,
    /// Handler failures, as `name: message`.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub handler_failures: Vec<String>,
    /// Plan-level error when the pipeline never started.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl HostReport {
    /// A host whose plan could not be built; it never executed.
    pub fn plan_failure(host: &str, message: String) -> Self {
        Self {
            host: host.to_string(),
            status: HostStatus::Failed,
            steps: Vec::new(),
            fired_handlers: Vec::new(),
            handler_failures: Vec::new(),
            error: Some(message),
        }
    }

    /// Count steps with the given outcome.
    pub fn count(&self, outcome: Outcome) -> usize {
        self.steps.iter().filter(|s| s.outcome == outcome).count()
    }

    /// The per-host summary counts, e.g.
    /// `changed=2 satisfied=3 skipped=1 failed=0`.
    pub fn counts_line(&self) -> String {
        format!(
            "changed={} satisfied={} skipped={} failed={}",
            self.count(Outcome::Changed),
            self.count(Outcome::Satisfied),
            self.count(Outcome::Skipped),
            self.count(Outcome::Failed),
        )
    }
}

/// The whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Runbook title.
    pub runbook: String,
    /// Whether this was a check-mode (probe only) run.
    pub check: bool,
    /// When the run started.
    pub started: DateTime<Utc>,
    /// Total wall time.
    pub duration_ms: u64,
    /// Per-host results in inventory order.
    pub hosts: Vec<HostReport>,
}

impl RunReport {
    /// A run passes only when every host converged. Degraded and
    /// cancelled hosts fail the run.
    pub fn is_success(&self) -> bool {
        self.hosts.iter().all(|h| h.status.is_converged())
    }

    /// Number of hosts that did not converge.
    pub fn unconverged(&self) -> usize {
        self.hosts
            .iter()
            .filter(|h| !h.status.is_converged())
            .count()
    }

    /// Total changed steps across hosts.
    pub fn total_changed(&self) -> usize {
        self.hosts.iter().map(|h| h.count(Outcome::Changed)).sum()
    }
}
