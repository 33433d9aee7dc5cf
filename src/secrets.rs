//! Become-password acquisition.
//!
//! The password is read once per run, held in a wiped-on-drop
//! [`Secret`], and shared by reference with every connection. It
//! never touches disk and never appears in an argv.

use anyhow::{Context, Result};
use std::sync::Arc;
use transport::Secret;

/// Environment variable consulted when `--ask-become-pass` is absent.
pub const BECOME_PASS_ENV: &str = "DROVER_BECOME_PASS";

/// Acquire the become password for this run. Prompting wins over the
/// environment; neither set means privileged actions go without one.
pub fn acquire(ask: bool) -> Result<Option<Arc<Secret>>> {
    if ask {
        let password = dialoguer::Password::new()
            .with_prompt("Become password")
            .interact()
            .context("Could not read password from terminal")?;
        return Ok(Some(Arc::new(Secret::from_string(password))));
    }
    Ok(from_env_value(std::env::var(BECOME_PASS_ENV).ok()))
}

fn from_env_value(value: Option<String>) -> Option<Arc<Secret>> {
    match value {
        Some(password) if !password.is_empty() => Some(Arc::new(Secret::from_string(password))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_env_means_no_password() {
        assert!(from_env_value(None).is_none());
    }

    #[test]
    fn test_empty_env_means_no_password() {
        assert!(from_env_value(Some(String::new())).is_none());
    }

    #[test]
    fn test_env_password_is_wrapped() {
        let secret = from_env_value(Some("hunter2".to_string())).unwrap();
        assert_eq!(secret.reveal(), b"hunter2");
    }
}
