//! Error types for the inventory crate

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or querying an inventory
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Inventory file not found
    #[error("inventory file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid inventory syntax
    #[error("invalid inventory syntax at line {line}: {message}")]
    Parse {
        /// Line number where the parse error occurred (1-indexed)
        line: usize,
        /// Description of the syntax error
        message: String,
    },

    /// A host name was declared more than once
    #[error("duplicate host '{name}' at line {line} (first declared at line {first})")]
    DuplicateHost {
        /// The host name that appeared twice
        name: String,
        /// Line of the second declaration
        line: usize,
        /// Line of the first declaration
        first: usize,
    },

    /// Requested group does not exist
    #[error("unknown group: {name}")]
    UnknownGroup {
        /// The group name that was requested
        name: String,
    },
}

/// Result type for inventory operations
pub type Result<T> = std::result::Result<T, Error>;
