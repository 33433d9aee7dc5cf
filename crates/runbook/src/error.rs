//! Error types for runbook loading and plan building.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a runbook or building a per-host plan.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error reading the runbook or a template source.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Runbook file does not exist.
    #[error("runbook file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Malformed YAML.
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Structurally invalid runbook (empty step name, duplicate
    /// handler, notify to an undeclared handler, bad predicate
    /// syntax, bad file mode).
    #[error("invalid runbook: {0}")]
    Parse(String),

    /// A predicate referenced a variable the host does not define.
    /// Mapped to [`Error::Config`] by the plan builder, which knows
    /// the host.
    #[error("unknown variable '{name}'")]
    UnknownVariable {
        /// The unresolved identifier.
        name: String,
    },

    /// Per-host plan construction failed. Only the affected host is
    /// lost; other hosts' plans proceed.
    #[error("cannot build plan for host '{host}': {message}")]
    Config {
        /// Host whose plan could not be built.
        host: String,
        /// What went wrong.
        message: String,
    },
}

/// Result alias for runbook operations.
pub type Result<T> = std::result::Result<T, Error>;
