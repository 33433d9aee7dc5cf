//! Idempotent actions: probe current state, apply only on drift.
//!
//! Every action follows the same shape. It probes the host for the
//! state it manages, reports satisfied when the desired state already
//! holds, and otherwise applies the change (or, in check mode, reports
//! what it would do). Actions speak both platform dialects: POSIX
//! shell for Linux families, PowerShell for Windows.

mod command;
mod http_get;
mod package;
mod service;
mod upload;

use async_trait::async_trait;
use inventory::Host;
use runbook::{ActionSpec, PlannedStep};
use transport::{Connection, Exec, Result};

use crate::engine::report::Outcome;

/// What an action's convergence produced.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// Changed, satisfied, or failed.
    pub outcome: Outcome,
    /// Human detail for the report.
    pub detail: Option<String>,
}

impl ActionOutcome {
    /// A change was applied.
    pub fn changed() -> Self {
        Self {
            outcome: Outcome::Changed,
            detail: None,
        }
    }

    /// A change was applied, with detail.
    pub fn changed_with(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Changed,
            detail: Some(detail.into()),
        }
    }

    /// Desired state already held.
    pub fn satisfied() -> Self {
        Self {
            outcome: Outcome::Satisfied,
            detail: None,
        }
    }

    /// Desired state already held, with detail.
    pub fn satisfied_with(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Satisfied,
            detail: Some(detail.into()),
        }
    }

    /// The action ran and failed.
    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failed,
            detail: Some(detail.into()),
        }
    }

    /// Check mode: a change is pending but was not applied.
    pub fn would(detail: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Changed,
            detail: Some(detail.into()),
        }
    }
}

/// A single idempotent action against one host.
#[async_trait]
pub trait Action: Send + Sync {
    /// Action kind label for reports.
    fn kind(&self) -> &'static str;

    /// Drive the host toward the desired state. Probes first; in check
    /// mode, stops after the probe and reports what would change.
    ///
    /// Transport failures are `Err`. An action that ran and failed is
    /// an `Ok` outcome carrying `Outcome::Failed`.
    async fn converge(
        &self,
        host: &Host,
        conn: &dyn Connection,
        check: bool,
    ) -> Result<ActionOutcome>;
}

/// Instantiate the action for a planned step.
pub fn resolve(step: &PlannedStep) -> Box<dyn Action> {
    resolve_spec(&step.action, step.payload.clone())
}

/// Instantiate an action from its spec. `payload` carries the rendered
/// file content for uploads.
pub fn resolve_spec(spec: &ActionSpec, payload: Option<Vec<u8>>) -> Box<dyn Action> {
    match spec {
        ActionSpec::Package(s) => Box::new(package::PackageAction::new(s.clone())),
        ActionSpec::Service(s) => Box::new(service::ServiceAction::new(s.clone())),
        ActionSpec::Upload(s) => Box::new(upload::UploadAction::new(s.clone(), payload)),
        ActionSpec::Command(s) => Box::new(command::CommandAction::new(s.clone())),
        ActionSpec::HttpGet(s) => Box::new(http_get::HttpGetAction::new(s.clone())),
    }
}

/// The last meaningful stderr line, for failure details.
fn stderr_tail(exec: &Exec) -> String {
    exec.stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map_or_else(|| "exit status nonzero".to_string(), |l| l.trim().to_string())
}
