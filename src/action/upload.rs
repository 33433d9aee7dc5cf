//! Rendered template upload with content-hash convergence.
//!
//! The rendered payload is hashed locally and compared against the
//! remote file's sha256 before any bytes move. Matching digests mean
//! satisfied; anything else uploads.

use async_trait::async_trait;
use inventory::{Host, OsFamily};
use runbook::UploadSpec;
use sha2::{Digest, Sha256};
use transport::winrm::ps_quote;
use transport::{shell, Connection, Exec, Result};

use super::{stderr_tail, Action, ActionOutcome};

pub struct UploadAction {
    spec: UploadSpec,
    payload: Option<Vec<u8>>,
}

impl UploadAction {
    pub fn new(spec: UploadSpec, payload: Option<Vec<u8>>) -> Self {
        Self { spec, payload }
    }
}

fn hash_command(family: OsFamily, dest: &str) -> String {
    if family.is_linux() {
        format!("sha256sum {}", shell::quote(dest))
    } else {
        format!("(Get-FileHash -Path {} -Algorithm SHA256).Hash", ps_quote(dest))
    }
}

/// Digest of the remote file, lowercase hex. None when the file is
/// missing or unreadable.
fn remote_digest(family: OsFamily, probe: &Exec) -> Option<String> {
    if !probe.success() {
        return None;
    }
    let digest = if family.is_linux() {
        probe.stdout.split_whitespace().next()?.to_string()
    } else {
        probe.stdout.trim().to_string()
    };
    if digest.is_empty() {
        None
    } else {
        Some(digest.to_ascii_lowercase())
    }
}

fn local_digest(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[async_trait]
impl Action for UploadAction {
    fn kind(&self) -> &'static str {
        "upload"
    }

    async fn converge(
        &self,
        host: &Host,
        conn: &dyn Connection,
        check: bool,
    ) -> Result<ActionOutcome> {
        let Some(payload) = &self.payload else {
            // Plans render payloads for applicable upload steps; a
            // missing one means this action was resolved outside one.
            return Ok(ActionOutcome::failed("upload payload missing from plan"));
        };

        let dest = &self.spec.dest;
        let want = local_digest(payload);
        let probe = conn.run(&hash_command(host.os_family, dest)).await?;
        if remote_digest(host.os_family, &probe).is_some_and(|have| have == want) {
            return Ok(ActionOutcome::satisfied());
        }

        if check {
            return Ok(ActionOutcome::would(format!(
                "would upload {} bytes to {dest}",
                payload.len()
            )));
        }

        let put = conn
            .upload(payload, dest, self.spec.mode.as_deref())
            .await?;
        if put.success() {
            Ok(ActionOutcome::changed_with(format!("uploaded {dest}")))
        } else {
            Ok(ActionOutcome::failed(stderr_tail(&put)))
        }
    }
}
