//! WinRM transport, delegated to PowerShell remoting via a local
//! `pwsh`.
//!
//! The connection model is run-as-a-user: when a credential is
//! configured, the password arrives on pwsh's stdin and is turned
//! into a `PSCredential` inside the script. The wrapper script
//! travels in argv but never contains the password.

use crate::error::{Error, ErrorCategory, Result};
use crate::secret::Secret;
use crate::{Connection, Exec};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use inventory::Host;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Quote a string as a PowerShell single-quoted literal.
pub fn ps_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Build the remote side of an upload: decode an embedded base64
/// payload and write the bytes to `dest`.
pub fn upload_command(content: &[u8], dest: &str) -> String {
    let encoded = BASE64.encode(content);
    format!(
        "[IO.File]::WriteAllBytes({}, [Convert]::FromBase64String({}))",
        ps_quote(dest),
        ps_quote(&encoded)
    )
}

/// WinRM connection to one host.
pub struct WinRm {
    host_name: String,
    address: String,
    port: Option<u16>,
    user: Option<String>,
    password: Option<Arc<Secret>>,
}

impl WinRm {
    /// Create a connection for an inventory host.
    pub fn for_host(host: &Host, password: Option<Arc<Secret>>) -> Self {
        Self {
            host_name: host.name.clone(),
            address: host.address.clone(),
            port: host.port,
            user: host.user.clone(),
            password,
        }
    }

    fn with_credential(&self) -> bool {
        self.user.is_some() && self.password.is_some()
    }

    /// Build the local wrapper script. The command is embedded
    /// verbatim in the remote script block.
    fn wrapper_script(&self, command: &str) -> String {
        let mut script = String::from("$ErrorActionPreference = 'Stop'\n");
        let mut params = format!("ComputerName = {}", ps_quote(&self.address));
        if let Some(port) = self.port {
            params.push_str(&format!("; Port = {port}"));
        }
        if self.with_credential() {
            let user = self.user.as_deref().unwrap_or_default();
            script.push_str("$plain = [Console]::In.ReadLine()\n");
            script.push_str(
                "$secure = ConvertTo-SecureString -String $plain -AsPlainText -Force\n",
            );
            script.push_str("Remove-Variable plain\n");
            script.push_str(&format!(
                "$cred = New-Object System.Management.Automation.PSCredential({}, $secure)\n",
                ps_quote(user)
            ));
            params.push_str("; Credential = $cred");
        }
        script.push_str(&format!("$params = @{{ {params} }}\n"));
        script.push_str(&format!(
            "Invoke-Command @params -ScriptBlock {{ {command} }}\n"
        ));
        // Native exit codes propagate through pwsh 7 remoting; cmdlet
        // failures become terminating errors and exit 1 instead.
        script.push_str("if ($null -ne $LASTEXITCODE) { exit $LASTEXITCODE } else { exit 0 }\n");
        script
    }
}

#[async_trait]
impl Connection for WinRm {
    async fn run(&self, command: &str) -> Result<Exec> {
        let script = self.wrapper_script(command);
        log::debug!("winrm {}: {command}", self.address);

        let mut child = Command::new("pwsh")
            .arg("-NoProfile")
            .arg("-NonInteractive")
            .arg("-Command")
            .arg(&script)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::from_spawn(e, "pwsh", "winrm"))?;

        if let Some(mut stdin) = child.stdin.take() {
            if self.with_credential() {
                if let Some(pass) = &self.password {
                    stdin.write_all(pass.reveal()).await?;
                    stdin.write_all(b"\n").await?;
                }
            }
        }

        let output = child.wait_with_output().await?;
        let exec = Exec::from_output(&output);

        // pwsh exits nonzero for both transport failures and failing
        // remote commands; stderr tells them apart.
        if !exec.success() {
            let classified = Error::from_remote_stderr(&self.host_name, &exec.stderr);
            if matches!(
                classified.category(),
                ErrorCategory::Unreachable | ErrorCategory::Auth
            ) {
                return Err(classified);
            }
        }
        Ok(exec)
    }

    async fn upload(&self, content: &[u8], dest: &str, _mode: Option<&str>) -> Result<Exec> {
        // File modes are a POSIX notion; ignored here.
        self.run(&upload_command(content, dest)).await
    }

    fn describe(&self) -> String {
        match &self.user {
            Some(user) => format!("winrm {user}@{}", self.address),
            None => format!("winrm {}", self.address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inventory::{ConnectionKind, OsFamily};

    fn win_host() -> Host {
        let mut host = Host::new("winserver1".to_string(), "win".to_string());
        host.address = "10.2.0.21".to_string();
        host.os_family = OsFamily::Windows;
        host.connection = ConnectionKind::WinRm;
        host.user = Some("Administrator".to_string());
        host
    }

    #[test]
    fn test_ps_quote_doubles_quotes() {
        assert_eq!(ps_quote("it's"), "'it''s'");
        assert_eq!(ps_quote("plain"), "'plain'");
    }

    #[test]
    fn test_upload_command_embeds_base64() {
        let cmd = upload_command(b"hello", r"C:\inetpub\wwwroot\index.html");
        assert!(cmd.contains("FromBase64String('aGVsbG8=')"));
        assert!(cmd.contains(r"C:\inetpub\wwwroot\index.html"));
    }

    #[test]
    fn test_script_without_credential_has_no_stdin_read() {
        let conn = WinRm::for_host(&win_host(), None);
        let script = conn.wrapper_script("Get-Service W3SVC");
        assert!(!script.contains("ReadLine"));
        assert!(!script.contains("Credential"));
        assert!(script.contains("ComputerName = '10.2.0.21'"));
    }

    #[test]
    fn test_script_with_credential_reads_stdin() {
        let secret = Arc::new(Secret::from_string("pw".to_string()));
        let conn = WinRm::for_host(&win_host(), Some(secret));
        let script = conn.wrapper_script("Get-Service W3SVC");
        assert!(script.contains("[Console]::In.ReadLine()"));
        assert!(script.contains("PSCredential('Administrator', $secure)"));
        // The password itself never lands in the script.
        assert!(!script.contains("pw'"));
    }

    #[test]
    fn test_script_includes_port_when_set() {
        let mut host = win_host();
        host.port = Some(5986);
        let conn = WinRm::for_host(&host, None);
        assert!(conn.wrapper_script("hostname").contains("Port = 5986"));
    }

    #[test]
    fn test_command_embedded_in_script_block() {
        let conn = WinRm::for_host(&win_host(), None);
        let script = conn.wrapper_script("Install-WindowsFeature -Name Web-Server");
        assert!(script.contains("-ScriptBlock { Install-WindowsFeature -Name Web-Server }"));
    }
}
