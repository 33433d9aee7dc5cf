//! Run-locally transport for the control node.
//!
//! Runs commands through `sh -c` on the machine drover itself runs
//! on. Privilege escalation uses `sudo -S` with the password piped to
//! stdin, exactly like the ssh transport does remotely.

use crate::error::{Error, Result};
use crate::secret::Secret;
use crate::shell;
use crate::{Connection, Exec};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Local connection: direct process spawn on the control node.
pub struct Local {
    become_root: bool,
    become_pass: Option<Arc<Secret>>,
}

impl Local {
    /// Create a local connection.
    pub fn new(become_root: bool, become_pass: Option<Arc<Secret>>) -> Self {
        Self {
            become_root,
            become_pass,
        }
    }

    fn effective_command(&self, command: &str) -> String {
        if self.become_root {
            shell::become_wrap(command)
        } else {
            command.to_string()
        }
    }
}

#[async_trait]
impl Connection for Local {
    async fn run(&self, command: &str) -> Result<Exec> {
        let effective = self.effective_command(command);
        log::debug!("local: {effective}");

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&effective)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::from_spawn(e, "sh", "local"))?;

        if let Some(mut stdin) = child.stdin.take() {
            if self.become_root {
                if let Some(pass) = &self.become_pass {
                    stdin.write_all(pass.reveal()).await?;
                    stdin.write_all(b"\n").await?;
                }
            }
            // Dropping closes the pipe so the child never blocks on read.
        }

        let output = child.wait_with_output().await?;
        Ok(Exec::from_output(&output))
    }

    async fn upload(&self, content: &[u8], dest: &str, mode: Option<&str>) -> Result<Exec> {
        self.run(&shell::upload_command(content, dest, mode)).await
    }

    fn describe(&self) -> String {
        "local".to_string()
    }
}
