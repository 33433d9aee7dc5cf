//! Service run state and boot enablement.
//!
//! Linux families converge through systemctl, Windows through the
//! Service cmdlets. `restarted` is the one non-idempotent state: it
//! always restarts and always reports a change.

use async_trait::async_trait;
use inventory::{Host, OsFamily};
use runbook::{ServiceSpec, ServiceState};
use transport::winrm::ps_quote;
use transport::{shell, Connection, Exec, Result};

use super::{stderr_tail, Action, ActionOutcome};

pub struct ServiceAction {
    spec: ServiceSpec,
}

impl ServiceAction {
    pub fn new(spec: ServiceSpec) -> Self {
        Self { spec }
    }
}

fn status_command(family: OsFamily, name: &str) -> String {
    if family.is_linux() {
        format!("systemctl is-active {}", shell::quote(name))
    } else {
        format!("(Get-Service -Name {}).Status", ps_quote(name))
    }
}

fn running(family: OsFamily, probe: &Exec) -> bool {
    if family.is_linux() {
        probe.success()
    } else {
        probe.stdout.trim().eq_ignore_ascii_case("running")
    }
}

fn control_command(family: OsFamily, name: &str, verb: &str) -> String {
    if family.is_linux() {
        format!("systemctl {verb} {}", shell::quote(name))
    } else {
        let cmdlet = match verb {
            "start" => "Start-Service",
            "stop" => "Stop-Service",
            _ => "Restart-Service",
        };
        format!("{cmdlet} -Name {}", ps_quote(name))
    }
}

fn enabled_probe_command(family: OsFamily, name: &str) -> String {
    if family.is_linux() {
        format!("systemctl is-enabled {}", shell::quote(name))
    } else {
        format!("(Get-Service -Name {}).StartType", ps_quote(name))
    }
}

fn enabled(family: OsFamily, probe: &Exec) -> bool {
    if family.is_linux() {
        probe.success() && probe.stdout.trim() == "enabled"
    } else {
        probe.stdout.trim().eq_ignore_ascii_case("automatic")
    }
}

fn enable_command(family: OsFamily, name: &str, enable: bool) -> String {
    if family.is_linux() {
        let verb = if enable { "enable" } else { "disable" };
        format!("systemctl {verb} {}", shell::quote(name))
    } else {
        let start_type = if enable { "Automatic" } else { "Disabled" };
        format!("Set-Service -Name {} -StartupType {start_type}", ps_quote(name))
    }
}

#[async_trait]
impl Action for ServiceAction {
    fn kind(&self) -> &'static str {
        "service"
    }

    async fn converge(
        &self,
        host: &Host,
        conn: &dyn Connection,
        check: bool,
    ) -> Result<ActionOutcome> {
        let family = host.os_family;
        let name = &self.spec.name;

        // (phrase, command) pairs still needed to reach desired state.
        let mut pending: Vec<(String, String)> = Vec::new();

        match self.spec.state {
            ServiceState::Restarted => {
                pending.push((
                    format!("restart {name}"),
                    control_command(family, name, "restart"),
                ));
            }
            ServiceState::Started | ServiceState::Stopped => {
                let probe = conn.run(&status_command(family, name)).await?;
                let want_running = self.spec.state == ServiceState::Started;
                if running(family, &probe) != want_running {
                    let verb = if want_running { "start" } else { "stop" };
                    pending.push((
                        format!("{verb} {name}"),
                        control_command(family, name, verb),
                    ));
                }
            }
        }

        if let Some(want_enabled) = self.spec.enabled {
            let probe = conn.run(&enabled_probe_command(family, name)).await?;
            if enabled(family, &probe) != want_enabled {
                let verb = if want_enabled { "enable" } else { "disable" };
                pending.push((
                    format!("{verb} {name}"),
                    enable_command(family, name, want_enabled),
                ));
            }
        }

        if pending.is_empty() {
            return Ok(ActionOutcome::satisfied());
        }

        let phrases: Vec<String> = pending.iter().map(|(p, _)| p.clone()).collect();
        if check {
            return Ok(ActionOutcome::would(format!("would {}", phrases.join(", "))));
        }

        for (phrase, command) in &pending {
            let exec = conn.run(command).await?;
            if !exec.success() {
                return Ok(ActionOutcome::failed(format!(
                    "{phrase} failed: {}",
                    stderr_tail(&exec)
                )));
            }
        }
        Ok(ActionOutcome::changed_with(phrases.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(exit_code: i32, stdout: &str) -> Exec {
        Exec {
            exit_code,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    #[test]
    fn test_status_commands() {
        assert_eq!(
            status_command(OsFamily::Debian, "nginx"),
            "systemctl is-active nginx"
        );
        assert_eq!(
            status_command(OsFamily::Windows, "W3SVC"),
            "(Get-Service -Name 'W3SVC').Status"
        );
    }

    #[test]
    fn test_running_interpretation() {
        assert!(running(OsFamily::Debian, &exec(0, "active\n")));
        assert!(!running(OsFamily::Debian, &exec(3, "inactive\n")));
        assert!(running(OsFamily::Windows, &exec(0, "Running\r\n")));
        assert!(!running(OsFamily::Windows, &exec(0, "Stopped\r\n")));
    }

    #[test]
    fn test_control_commands() {
        assert_eq!(
            control_command(OsFamily::Rhel, "httpd", "restart"),
            "systemctl restart httpd"
        );
        assert_eq!(
            control_command(OsFamily::Windows, "W3SVC", "stop"),
            "Stop-Service -Name 'W3SVC'"
        );
    }

    #[test]
    fn test_enabled_interpretation() {
        assert!(enabled(OsFamily::Debian, &exec(0, "enabled\n")));
        assert!(!enabled(OsFamily::Debian, &exec(1, "disabled\n")));
        // is-enabled exits 0 for static units too; those do not count.
        assert!(!enabled(OsFamily::Debian, &exec(0, "static\n")));
        assert!(enabled(OsFamily::Windows, &exec(0, "Automatic\r\n")));
        assert!(!enabled(OsFamily::Windows, &exec(0, "Manual\r\n")));
    }

    #[test]
    fn test_enable_commands() {
        assert_eq!(
            enable_command(OsFamily::Debian, "nginx", true),
            "systemctl enable nginx"
        );
        assert_eq!(
            enable_command(OsFamily::Windows, "W3SVC", false),
            "Set-Service -Name 'W3SVC' -StartupType Disabled"
        );
    }
}
