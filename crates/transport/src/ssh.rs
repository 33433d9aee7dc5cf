//! SSH transport, delegated to the system `ssh` binary.
//!
//! `BatchMode=yes` keeps ssh from ever prompting; authentication is
//! whatever the operator's ssh config and agent provide. Privilege
//! escalation wraps the remote command in `sudo -S` with the become
//! password piped over stdin, never on the command line.

use crate::error::{Error, Result};
use crate::secret::Secret;
use crate::shell;
use crate::{Connection, Exec};
use async_trait::async_trait;
use inventory::Host;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// ssh's own exit code when the connection or authentication failed,
/// as opposed to the remote command failing.
const SSH_FAILURE_CODE: i32 = 255;

/// SSH connection to one host.
pub struct Ssh {
    host_name: String,
    target: String,
    port: Option<u16>,
    connect_timeout_secs: u64,
    become_root: bool,
    become_pass: Option<Arc<Secret>>,
}

impl Ssh {
    /// Create a connection for an inventory host.
    pub fn for_host(
        host: &Host,
        connect_timeout_secs: u64,
        become_pass: Option<Arc<Secret>>,
    ) -> Self {
        Self {
            host_name: host.name.clone(),
            target: host.ssh_target(),
            port: host.port,
            connect_timeout_secs,
            become_root: host.become_root,
            become_pass,
        }
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
        ];
        if let Some(port) = self.port {
            args.push("-p".to_string());
            args.push(port.to_string());
        }
        args.push(self.target.clone());
        args
    }

    fn remote_command(&self, command: &str) -> String {
        if self.become_root {
            shell::become_wrap(command)
        } else {
            command.to_string()
        }
    }
}

#[async_trait]
impl Connection for Ssh {
    async fn run(&self, command: &str) -> Result<Exec> {
        let remote = self.remote_command(command);
        log::debug!("ssh {}: {remote}", self.target);

        let mut child = Command::new("ssh")
            .args(self.base_args())
            .arg(&remote)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::from_spawn(e, "ssh", "ssh"))?;

        if let Some(mut stdin) = child.stdin.take() {
            if self.become_root {
                if let Some(pass) = &self.become_pass {
                    stdin.write_all(pass.reveal()).await?;
                    stdin.write_all(b"\n").await?;
                }
            }
        }

        let output = child.wait_with_output().await?;
        let exec = Exec::from_output(&output);
        if exec.exit_code == SSH_FAILURE_CODE {
            return Err(Error::from_remote_stderr(&self.host_name, &exec.stderr));
        }
        Ok(exec)
    }

    async fn upload(&self, content: &[u8], dest: &str, mode: Option<&str>) -> Result<Exec> {
        self.run(&shell::upload_command(content, dest, mode)).await
    }

    fn describe(&self) -> String {
        format!("ssh {}", self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(name: &str) -> Host {
        let mut host = Host::new(name.to_string(), "web".to_string());
        host.address = "10.1.0.11".to_string();
        host
    }

    #[test]
    fn test_target_includes_user() {
        let mut h = host("ubuntu1");
        h.user = Some("deploy".to_string());
        let conn = Ssh::for_host(&h, 10, None);
        assert_eq!(conn.describe(), "ssh deploy@10.1.0.11");
    }

    #[test]
    fn test_base_args_without_port() {
        let conn = Ssh::for_host(&host("ubuntu1"), 10, None);
        let args = conn.base_args();
        assert!(args.contains(&"BatchMode=yes".to_string()));
        assert!(args.contains(&"ConnectTimeout=10".to_string()));
        assert!(!args.contains(&"-p".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("10.1.0.11"));
    }

    #[test]
    fn test_base_args_with_port() {
        let mut h = host("ubuntu1");
        h.port = Some(2222);
        let conn = Ssh::for_host(&h, 10, None);
        let args = conn.base_args();
        let pos = args.iter().position(|a| a == "-p").unwrap();
        assert_eq!(args[pos + 1], "2222");
    }

    #[test]
    fn test_become_wraps_remote_command() {
        let mut h = host("ubuntu1");
        h.become_root = true;
        let conn = Ssh::for_host(&h, 10, None);
        let remote = conn.remote_command("apt-get install -y nginx");
        assert!(remote.starts_with("sudo -S -p ''"));
        assert!(remote.contains("apt-get install -y nginx"));
    }

    #[test]
    fn test_plain_remote_command_untouched() {
        let conn = Ssh::for_host(&host("ubuntu1"), 10, None);
        assert_eq!(conn.remote_command("hostname"), "hostname");
    }
}
