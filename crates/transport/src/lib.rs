//! # transport
//!
//! Remote-execution transports for drover.
//!
//! This crate provides functionality for:
//! - A `Connection` trait abstracting command execution and upload
//! - SSH via the system `ssh` binary (BatchMode, sudo escalation)
//! - WinRM via local `pwsh` PowerShell remoting (run-as credential)
//! - A local transport for the control node
//! - Stderr-based error classification (unreachable / auth / exec)
//! - A zero-on-drop `Secret` for become and run-as passwords
//!
//! Secrets reach child processes only through stdin pipes; they never
//! appear in argv, a child's environment, or on disk.
//!
//! ## Example
//!
//! ```no_run
//! use transport::{ConnectOptions, connect};
//! use inventory::Host;
//!
//! # async fn demo() -> transport::Result<()> {
//! let host = Host::new("ubuntu1".to_string(), "web".to_string());
//! let conn = connect(&host, &ConnectOptions::default());
//! let exec = conn.run("hostname").await?;
//! println!("{}", exec.stdout.trim());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod local;
pub mod secret;
pub mod shell;
pub mod ssh;
pub mod winrm;

pub use error::{Error, ErrorCategory, Result};
pub use local::Local;
pub use secret::Secret;
pub use ssh::Ssh;
pub use winrm::WinRm;

use async_trait::async_trait;
use inventory::{ConnectionKind, Host};
use std::sync::Arc;

/// Outcome of one remote command: exit code plus captured output.
///
/// A nonzero exit code is a result, not an error; probe commands
/// legitimately fail. Transport-level failures (unreachable host,
/// refused credential) surface as [`Error`] instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exec {
    /// Process exit code, `-1` when killed by a signal.
    pub exit_code: i32,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl Exec {
    /// Build from a finished process.
    pub fn from_output(output: &std::process::Output) -> Self {
        Self {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }

    /// Whether the command exited zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A command-execution channel to one host.
///
/// Implementations are cheap immutable handles; the engine holds one
/// per host for the duration of a run.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Run a command on the target, returning its outcome.
    async fn run(&self, command: &str) -> Result<Exec>;

    /// Write `content` to `dest` on the target. `mode` is an octal
    /// string honored by POSIX transports and ignored on Windows.
    async fn upload(&self, content: &[u8], dest: &str, mode: Option<&str>) -> Result<Exec>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// Options shared by all connections of a run.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Connect timeout in seconds (ssh `ConnectTimeout`).
    pub connect_timeout_secs: u64,
    /// Become/run-as password, shared across hosts.
    pub become_pass: Option<Arc<Secret>>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            become_pass: None,
        }
    }
}

/// Create the connection matching a host's configured kind.
pub fn connect(host: &Host, options: &ConnectOptions) -> Arc<dyn Connection> {
    match host.connection {
        ConnectionKind::Local => Arc::new(Local::new(
            host.become_root,
            options.become_pass.clone(),
        )),
        ConnectionKind::Ssh => Arc::new(Ssh::for_host(
            host,
            options.connect_timeout_secs,
            options.become_pass.clone(),
        )),
        ConnectionKind::WinRm => Arc::new(WinRm::for_host(host, options.become_pass.clone())),
    }
}
