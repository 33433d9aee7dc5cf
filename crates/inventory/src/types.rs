//! Core types for host inventories.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Operating-system family of a target host.
///
/// The family drives step applicability predicates and decides which
/// platform tooling an action delegates to (apt/dnf vs. PowerShell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    /// Debian-like Linux (apt/dpkg)
    Debian,
    /// RPM-like Linux (dnf/rpm)
    Rhel,
    /// Windows Server
    Windows,
}

impl OsFamily {
    /// Get the inventory keyword for this family.
    pub fn keyword(&self) -> &'static str {
        match self {
            OsFamily::Debian => "debian",
            OsFamily::Rhel => "rhel",
            OsFamily::Windows => "windows",
        }
    }

    /// Parse a family from its inventory keyword.
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "debian" => Some(OsFamily::Debian),
            "rhel" => Some(OsFamily::Rhel),
            "windows" => Some(OsFamily::Windows),
            _ => None,
        }
    }

    /// Whether this family is a Linux family.
    pub fn is_linux(&self) -> bool {
        !matches!(self, OsFamily::Windows)
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// How drover reaches a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    /// Secure shell via the system `ssh` binary
    Ssh,
    /// Windows remote management via PowerShell remoting
    WinRm,
    /// Run directly on the control node
    Local,
}

impl ConnectionKind {
    /// Get the inventory keyword for this connection kind.
    pub fn keyword(&self) -> &'static str {
        match self {
            ConnectionKind::Ssh => "ssh",
            ConnectionKind::WinRm => "winrm",
            ConnectionKind::Local => "local",
        }
    }

    /// Parse a connection kind from its inventory keyword.
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ssh" => Some(ConnectionKind::Ssh),
            "winrm" => Some(ConnectionKind::WinRm),
            "local" => Some(ConnectionKind::Local),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// A single target host. Immutable after inventory load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    /// Unique host identifier
    pub name: String,
    /// Group this host was declared in
    pub group: String,
    /// Connection endpoint (defaults to the host name)
    pub address: String,
    /// Remote port (default 22 for ssh)
    pub port: Option<u16>,
    /// Operating-system family
    pub os_family: OsFamily,
    /// Transport used to reach the host
    pub connection: ConnectionKind,
    /// Remote user (None means the current user)
    pub user: Option<String>,
    /// Whether actions escalate privileges (sudo on Linux)
    pub become_root: bool,
    /// Remote interpreter override (e.g. a non-default python path)
    pub interpreter: Option<String>,
    /// Free-form variables, usable by predicates and templates
    pub vars: BTreeMap<String, String>,
}

impl Host {
    /// Create a host with defaults: ssh, debian, address = name.
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            address: name.clone(),
            name,
            group: group.into(),
            port: None,
            os_family: OsFamily::Debian,
            connection: ConnectionKind::Ssh,
            user: None,
            become_root: false,
            interpreter: None,
            vars: BTreeMap::new(),
        }
    }

    /// Facts visible to predicates and templates: the built-in keys
    /// plus every free-form variable. Built-ins win on collision.
    pub fn facts(&self) -> BTreeMap<String, String> {
        let mut facts = self.vars.clone();
        facts.insert("name".into(), self.name.clone());
        facts.insert("group".into(), self.group.clone());
        facts.insert("address".into(), self.address.clone());
        facts.insert("os_family".into(), self.os_family.keyword().into());
        facts.insert("connection".into(), self.connection.keyword().into());
        if let Some(user) = &self.user {
            facts.insert("user".into(), user.clone());
        }
        facts
    }

    /// `user@address` as the ssh target, or just the address.
    pub fn ssh_target(&self) -> String {
        match &self.user {
            Some(user) => format!("{}@{}", user, self.address),
            None => self.address.clone(),
        }
    }
}

/// A named, ordered set of hosts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Group name
    pub name: String,
    /// Host names in declaration order
    pub hosts: Vec<String>,
}

impl Group {
    /// Create an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hosts: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_family_keywords() {
        assert_eq!(OsFamily::Debian.keyword(), "debian");
        assert_eq!(OsFamily::from_keyword("RHEL"), Some(OsFamily::Rhel));
        assert_eq!(OsFamily::from_keyword("bsd"), None);
        assert!(OsFamily::Debian.is_linux());
        assert!(OsFamily::Rhel.is_linux());
        assert!(!OsFamily::Windows.is_linux());
    }

    #[test]
    fn test_connection_keywords() {
        assert_eq!(ConnectionKind::WinRm.keyword(), "winrm");
        assert_eq!(
            ConnectionKind::from_keyword("LOCAL"),
            Some(ConnectionKind::Local)
        );
        assert_eq!(ConnectionKind::from_keyword("telnet"), None);
    }

    #[test]
    fn test_host_defaults() {
        let host = Host::new("web1", "web");
        assert_eq!(host.address, "web1");
        assert_eq!(host.connection, ConnectionKind::Ssh);
        assert_eq!(host.os_family, OsFamily::Debian);
        assert!(!host.become_root);
    }

    #[test]
    fn test_host_facts_include_builtins() {
        let mut host = Host::new("web1", "web");
        host.vars.insert("tier".into(), "frontend".into());
        host.user = Some("deploy".into());

        let facts = host.facts();
        assert_eq!(facts.get("name").map(String::as_str), Some("web1"));
        assert_eq!(facts.get("os_family").map(String::as_str), Some("debian"));
        assert_eq!(facts.get("tier").map(String::as_str), Some("frontend"));
        assert_eq!(facts.get("user").map(String::as_str), Some("deploy"));
    }

    #[test]
    fn test_host_facts_builtins_win_over_vars() {
        let mut host = Host::new("web1", "web");
        host.vars.insert("name".into(), "spoofed".into());
        assert_eq!(host.facts().get("name").map(String::as_str), Some("web1"));
    }

    #[test]
    fn test_ssh_target() {
        let mut host = Host::new("web1", "web");
        host.address = "10.0.0.5".into();
        assert_eq!(host.ssh_target(), "10.0.0.5");
        host.user = Some("deploy".into());
        assert_eq!(host.ssh_target(), "deploy@10.0.0.5");
    }
}
