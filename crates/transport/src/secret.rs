//! Scoped in-memory secret for become/run-as passwords.
//!
//! The secret lives only in memory, reaches remote processes only
//! through stdin pipes, and is wiped when dropped. It never appears
//! in argv, in a child's environment, or on disk.

use std::fmt;

/// A password held in memory and zeroed on drop.
pub struct Secret {
    bytes: Vec<u8>,
}

impl Secret {
    /// Wrap raw bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Wrap a string, taking ownership of its buffer.
    pub fn from_string(s: String) -> Self {
        Self {
            bytes: s.into_bytes(),
        }
    }

    /// Borrow the secret bytes for piping to a child's stdin.
    pub fn reveal(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the secret is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        // Volatile writes so the wipe survives dead-store elimination.
        for byte in &mut self.bytes {
            unsafe { std::ptr::write_volatile(byte, 0) };
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(***)")
    }
}
