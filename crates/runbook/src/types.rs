//! Runbook schema: ordered steps, handlers, and the action vocabulary.
//!
//! A runbook is a YAML document:
//! ```yaml
//! name: provision web tier
//! steps:
//!   - name: install nginx
//!     package: { name: nginx, state: present }
//!     when: os_family == "debian" || os_family == "rhel"
//!     notify: [reload nginx]
//! handlers:
//!   - name: reload nginx
//!     service: { name: nginx, state: restarted }
//! ```
//!
//! The action is the single remaining key of the step mapping after
//! `name`, `when` and `notify`, matched against the action vocabulary.

use crate::error::{Error, Result};
use crate::predicate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Desired presence of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackageState {
    /// Package must be installed.
    #[default]
    Present,
    /// Package must not be installed.
    Absent,
}

/// Desired run state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    /// Service must be running.
    Started,
    /// Service must be stopped.
    Stopped,
    /// Service is restarted unconditionally (always a change).
    Restarted,
}

/// Ensure a package is present or absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSpec {
    /// Package (or Windows feature) name.
    pub name: String,
    /// Desired state, `present` by default.
    #[serde(default)]
    pub state: PackageState,
}

/// Ensure a service's run state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Service name.
    pub name: String,
    /// Desired run state.
    pub state: ServiceState,
    /// Also enable/disable start-on-boot.
    #[serde(default)]
    pub enabled: Option<bool>,
}

/// Upload a rendered template to a remote path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSpec {
    /// Template source, relative to the runbook file.
    pub src: PathBuf,
    /// Remote destination path.
    pub dest: String,
    /// Octal file mode, e.g. `"0644"`. Ignored on Windows targets.
    #[serde(default)]
    pub mode: Option<String>,
}

/// Run a raw command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// The command line, run through the remote shell.
    pub cmd: String,
    /// Skip (report satisfied) when this remote path already exists.
    #[serde(default)]
    pub creates: Option<String>,
}

fn default_expect_status() -> u16 {
    200
}

/// Probe a URL and require a status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpGetSpec {
    /// URL to fetch. May use `{{ address }}` and other host facts.
    pub url: String,
    /// Expected HTTP status, 200 by default.
    #[serde(default = "default_expect_status")]
    pub status: u16,
}

/// The action vocabulary. Each step and handler carries exactly one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionSpec {
    /// Package presence.
    Package(PackageSpec),
    /// Service run state.
    Service(ServiceSpec),
    /// Rendered template upload.
    Upload(UploadSpec),
    /// Raw command with optional `creates` guard.
    Command(CommandSpec),
    /// HTTP status probe.
    HttpGet(HttpGetSpec),
}

impl ActionSpec {
    /// The action's YAML key, for display.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Package(_) => "package",
            Self::Service(_) => "service",
            Self::Upload(_) => "upload",
            Self::Command(_) => "command",
            Self::HttpGet(_) => "http_get",
        }
    }
}

/// One ordered unit of desired state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Human-readable step name.
    pub name: String,
    /// The action to converge.
    #[serde(flatten)]
    pub action: ActionSpec,
    /// Applicability predicate over host facts. Absent means the step
    /// applies to every host.
    #[serde(default)]
    pub when: Option<String>,
    /// Handlers to signal when this step reports a change.
    #[serde(default)]
    pub notify: Vec<String>,
}

/// A named deferred action, fired at most once per host per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handler {
    /// Handler name, referenced by `notify`.
    pub name: String,
    /// The action to run when signaled.
    #[serde(flatten)]
    pub action: ActionSpec,
}

/// A parsed, validated runbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runbook {
    /// Runbook title, for display.
    pub name: String,
    /// Ordered steps.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Handlers in declaration order. Declaration order is firing
    /// order among signaled handlers.
    #[serde(default)]
    pub handlers: Vec<Handler>,
}

impl Runbook {
    /// Load and validate a runbook from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate a runbook from a string.
    pub fn parse(content: &str) -> Result<Self> {
        let runbook: Self = serde_yaml::from_str(content)?;
        runbook.validate()?;
        Ok(runbook)
    }

    /// Look up a handler by name.
    pub fn handler(&self, name: &str) -> Option<&Handler> {
        self.handlers.iter().find(|h| h.name == name)
    }

    /// Structural validation beyond what serde enforces.
    fn validate(&self) -> Result<()> {
        let mut handler_names = HashSet::new();
        for handler in &self.handlers {
            if handler.name.trim().is_empty() {
                return Err(Error::Parse("handler with an empty name".to_string()));
            }
            if !handler_names.insert(handler.name.as_str()) {
                return Err(Error::Parse(format!(
                    "duplicate handler '{}'",
                    handler.name
                )));
            }
            if matches!(handler.action, ActionSpec::Upload(_)) {
                return Err(Error::Parse(format!(
                    "handler '{}': upload is not supported in handlers",
                    handler.name
                )));
            }
        }

        for (idx, step) in self.steps.iter().enumerate() {
            if step.name.trim().is_empty() {
                return Err(Error::Parse(format!("step {} has an empty name", idx + 1)));
            }
            if let Some(when) = &step.when {
                predicate::parse(when).map_err(|e| {
                    Error::Parse(format!("step '{}': {e}", step.name))
                })?;
            }
            for target in &step.notify {
                if !handler_names.contains(target.as_str()) {
                    return Err(Error::Parse(format!(
                        "step '{}' notifies undeclared handler '{target}'",
                        step.name
                    )));
                }
            }
            if let ActionSpec::Upload(spec) = &step.action {
                validate_mode(&step.name, spec.mode.as_deref())?;
            }
        }
        Ok(())
    }
}

/// File modes are octal strings like `"0644"`.
fn validate_mode(step: &str, mode: Option<&str>) -> Result<()> {
    let Some(mode) = mode else {
        return Ok(());
    };
    let octal = (3..=4).contains(&mode.len()) && mode.chars().all(|c| ('0'..='7').contains(&c));
    if !octal {
        return Err(Error::Parse(format!(
            "step '{step}': invalid file mode '{mode}' (expected octal like 0644)"
        )));
    }
    Ok(())
}
