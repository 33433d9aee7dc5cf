//! Package presence via the platform package manager.
//!
//! Debian hosts go through dpkg/apt, RHEL hosts through rpm/dnf, and
//! Windows hosts manage server features through PowerShell.

use async_trait::async_trait;
use inventory::{Host, OsFamily};
use runbook::{PackageSpec, PackageState};
use transport::winrm::ps_quote;
use transport::{shell, Connection, Exec, Result};

use super::{stderr_tail, Action, ActionOutcome};

pub struct PackageAction {
    spec: PackageSpec,
}

impl PackageAction {
    pub fn new(spec: PackageSpec) -> Self {
        Self { spec }
    }
}

fn probe_command(family: OsFamily, name: &str) -> String {
    match family {
        OsFamily::Debian => {
            format!("dpkg-query -W -f '${{Status}}' {}", shell::quote(name))
        }
        OsFamily::Rhel => format!("rpm -q {}", shell::quote(name)),
        OsFamily::Windows => {
            format!("(Get-WindowsFeature -Name {}).Installed", ps_quote(name))
        }
    }
}

/// Interpret the probe. dpkg keeps removed-but-configured packages in
/// its database, so exit code alone is not enough there.
fn installed(family: OsFamily, probe: &Exec) -> bool {
    match family {
        OsFamily::Debian => probe.success() && probe.stdout.contains("install ok installed"),
        OsFamily::Rhel => probe.success(),
        OsFamily::Windows => probe.success() && probe.stdout.trim().eq_ignore_ascii_case("true"),
    }
}

fn apply_command(family: OsFamily, name: &str, state: PackageState) -> String {
    let install = state == PackageState::Present;
    match family {
        OsFamily::Debian => {
            let verb = if install { "install" } else { "remove" };
            format!(
                "DEBIAN_FRONTEND=noninteractive apt-get {verb} -y {}",
                shell::quote(name)
            )
        }
        OsFamily::Rhel => {
            let verb = if install { "install" } else { "remove" };
            format!("dnf {verb} -y {}", shell::quote(name))
        }
        OsFamily::Windows => {
            let cmdlet = if install {
                "Install-WindowsFeature"
            } else {
                "Uninstall-WindowsFeature"
            };
            format!("{cmdlet} -Name {}", ps_quote(name))
        }
    }
}

#[async_trait]
impl Action for PackageAction {
    fn kind(&self) -> &'static str {
        "package"
    }

    async fn converge(
        &self,
        host: &Host,
        conn: &dyn Connection,
        check: bool,
    ) -> Result<ActionOutcome> {
        let name = &self.spec.name;
        let probe = conn.run(&probe_command(host.os_family, name)).await?;
        let desired = self.spec.state == PackageState::Present;

        if installed(host.os_family, &probe) == desired {
            return Ok(ActionOutcome::satisfied());
        }
        if check {
            let verb = if desired { "install" } else { "remove" };
            return Ok(ActionOutcome::would(format!("would {verb} {name}")));
        }

        let apply = conn
            .run(&apply_command(host.os_family, name, self.spec.state))
            .await?;
        if apply.success() {
            let done = if desired { "installed" } else { "removed" };
            Ok(ActionOutcome::changed_with(format!("{done} {name}")))
        } else {
            Ok(ActionOutcome::failed(stderr_tail(&apply)))
        }
    }
}
