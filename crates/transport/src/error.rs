//! Error types for remote execution.
//!
//! Errors are categorized from the transport tool's stderr so the
//! engine can tell an unreachable host from a refused credential from
//! a command that simply failed, and report each appropriately.

use thiserror::Error;

/// Categories of transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The host could not be contacted (transient, retryable).
    Unreachable,
    /// The host refused the credential or key.
    Auth,
    /// The transport ran but remote execution failed.
    Exec,
    /// The transport tool itself is missing from PATH.
    ToolMissing,
    /// Other/unknown errors.
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unreachable)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Unreachable => "Host unreachable",
            Self::Auth => "Authentication failed",
            Self::Exec => "Remote execution failed",
            Self::ToolMissing => "Transport tool not installed",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Unreachable => "Check the address, port and network path to the host",
            Self::Auth => "Check the remote user, SSH key or become password",
            Self::Exec => "Check the remote command and the host's state",
            Self::ToolMissing => "Install the missing tool and ensure it is on PATH",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while executing on a target host.
#[derive(Debug, Error)]
pub enum Error {
    /// The host could not be contacted.
    #[error("host '{host}' unreachable: {message}")]
    Unreachable {
        /// The host that could not be contacted.
        host: String,
        /// Detail from the transport tool.
        message: String,
    },

    /// The host refused the credential.
    #[error("authentication failed for '{host}': {message}")]
    Auth {
        /// The host that refused the credential.
        host: String,
        /// Detail from the transport tool.
        message: String,
    },

    /// The transport ran but remote execution failed.
    #[error("remote execution failed on '{host}': {stderr}")]
    Exec {
        /// The host the command ran on.
        host: String,
        /// Standard error from the remote side.
        stderr: String,
    },

    /// The transport tool is not installed.
    #[error("'{program}' not found on PATH (required by the {transport} transport)")]
    ToolMissing {
        /// The missing executable.
        program: String,
        /// Which transport needed it.
        transport: &'static str,
    },

    /// IO error spawning or talking to the transport process.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Unreachable { .. } => ErrorCategory::Unreachable,
            Error::Auth { .. } => ErrorCategory::Auth,
            Error::Exec { .. } => ErrorCategory::Exec,
            Error::ToolMissing { .. } => ErrorCategory::ToolMissing,
            Error::Io(_) => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Create an error from a transport tool's stderr.
    ///
    /// Analyzes stderr to categorize the failure. Covers the
    /// vocabularies of both OpenSSH and PowerShell remoting; the two
    /// do not collide.
    pub fn from_remote_stderr(host: &str, stderr: &str) -> Self {
        let lower = stderr.to_lowercase();

        // Connectivity
        if lower.contains("connection refused")
            || lower.contains("connection timed out")
            || lower.contains("could not resolve")
            || lower.contains("no route to host")
            || lower.contains("network is unreachable")
            || lower.contains("operation timed out")
            || lower.contains("cannot connect")
            || lower.contains("network path was not found")
            || lower.contains("connection closed by remote host")
        {
            return Error::Unreachable {
                host: host.to_string(),
                message: stderr.trim().to_string(),
            };
        }

        // Credentials
        if lower.contains("permission denied")
            || lower.contains("authentication failed")
            || lower.contains("host key verification failed")
            || lower.contains("no supported authentication")
            || lower.contains("access is denied")
            || lower.contains("logon failure")
            || lower.contains("the user name or password is incorrect")
        {
            return Error::Auth {
                host: host.to_string(),
                message: stderr.trim().to_string(),
            };
        }

        Error::Exec {
            host: host.to_string(),
            stderr: stderr.trim().to_string(),
        }
    }

    /// Map a spawn failure, turning `NotFound` into [`Error::ToolMissing`].
    pub fn from_spawn(err: std::io::Error, program: &str, transport: &'static str) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Error::ToolMissing {
                program: program.to_string(),
                transport,
            }
        } else {
            Error::Io(err)
        }
    }
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, Error>;
