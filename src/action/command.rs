//! Raw command execution with an optional `creates` guard.

use async_trait::async_trait;
use inventory::{Host, OsFamily};
use runbook::CommandSpec;
use transport::winrm::ps_quote;
use transport::{shell, Connection, Result};

use super::{stderr_tail, Action, ActionOutcome};

pub struct CommandAction {
    spec: CommandSpec,
}

impl CommandAction {
    pub fn new(spec: CommandSpec) -> Self {
        Self { spec }
    }
}

fn exists_command(family: OsFamily, path: &str) -> String {
    if family.is_linux() {
        format!("test -e {}", shell::quote(path))
    } else {
        format!("if (Test-Path {}) {{ exit 0 }} else {{ exit 1 }}", ps_quote(path))
    }
}

#[async_trait]
impl Action for CommandAction {
    fn kind(&self) -> &'static str {
        "command"
    }

    async fn converge(
        &self,
        host: &Host,
        conn: &dyn Connection,
        check: bool,
    ) -> Result<ActionOutcome> {
        if let Some(creates) = &self.spec.creates {
            let probe = conn.run(&exists_command(host.os_family, creates)).await?;
            if probe.success() {
                return Ok(ActionOutcome::satisfied_with(format!(
                    "{creates} already exists"
                )));
            }
        }

        if check {
            return Ok(ActionOutcome::would("would run command"));
        }

        let exec = conn.run(&self.spec.cmd).await?;
        if exec.success() {
            Ok(ActionOutcome::changed())
        } else {
            Ok(ActionOutcome::failed(format!(
                "exit {}: {}",
                exec.exit_code,
                stderr_tail(&exec)
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exists_commands() {
        assert_eq!(
            exists_command(OsFamily::Debian, "/usr/local/bin/tool"),
            "test -e /usr/local/bin/tool"
        );
        assert_eq!(
            exists_command(OsFamily::Windows, "C:\\tools\\tool.exe"),
            "if (Test-Path 'C:\\tools\\tool.exe') { exit 0 } else { exit 1 }"
        );
    }

    #[test]
    fn test_exists_command_quotes_spaces() {
        assert_eq!(
            exists_command(OsFamily::Debian, "/opt/my app/done"),
            "test -e '/opt/my app/done'"
        );
    }
}
