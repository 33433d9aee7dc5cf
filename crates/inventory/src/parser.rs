//! Parser for the INI-style inventory format.
//!
//! The format is a grouped host listing with optional per-group
//! variables:
//! ```text
//! # web tier
//! [web]
//! ubuntu1  address=10.1.0.11 os_family=debian
//! centos1  address=10.1.0.12 os_family=rhel
//!
//! [web:vars]
//! user=deploy
//! become=true
//!
//! [control]
//! localhost connection=local
//! ```
//!
//! Host lines are `name key=value ...`; values cannot contain
//! whitespace. Recognized keys (`address`, `port`, `os_family`,
//! `connection`, `user`, `become`, `interpreter`) configure the host;
//! anything else becomes a free-form variable visible to predicates
//! and templates. A `[group:vars]` section applies to every host of
//! the group, with host-level keys winning.

use crate::error::{Error, Result};
use crate::types::{ConnectionKind, Group, Host, OsFamily};
use std::collections::HashMap;
use std::path::Path;

/// Raw host entry collected during the line pass.
struct RawHost {
    name: String,
    group: String,
    line: usize,
    settings: Vec<(String, String)>,
}

/// Parsed inventory: ordered groups and their hosts.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    groups: Vec<Group>,
    hosts: Vec<Host>,
}

impl Inventory {
    /// Load an inventory from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse an inventory from a string.
    pub fn parse(content: &str) -> Result<Self> {
        let mut groups: Vec<Group> = Vec::new();
        let mut raw_hosts: Vec<RawHost> = Vec::new();
        let mut group_vars: HashMap<String, Vec<(String, String)>> = HashMap::new();
        let mut vars_sections: Vec<(String, usize)> = Vec::new();
        let mut seen_hosts: HashMap<String, usize> = HashMap::new();

        // Section currently being filled: Some(group) for host lines,
        // or a :vars target for key=value lines.
        enum Section {
            None,
            Hosts(String),
            Vars(String),
        }
        let mut section = Section::None;

        for (idx, raw_line) in content.lines().enumerate() {
            let line_num = idx + 1;
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }

            if line.starts_with('[') {
                let name = parse_section_header(line, line_num)?;
                if let Some(group) = name.strip_suffix(":vars") {
                    let group = group.to_string();
                    vars_sections.push((group.clone(), line_num));
                    section = Section::Vars(group);
                } else {
                    if groups.iter().any(|g| g.name == name) {
                        return Err(Error::Parse {
                            line: line_num,
                            message: format!("group '{name}' declared twice"),
                        });
                    }
                    groups.push(Group::new(name.clone()));
                    section = Section::Hosts(name);
                }
                continue;
            }

            match &section {
                Section::None => {
                    return Err(Error::Parse {
                        line: line_num,
                        message: "host declared before any [group] header".to_string(),
                    });
                }
                Section::Hosts(group) => {
                    let raw = parse_host_line(line, group, line_num)?;
                    if let Some(first) = seen_hosts.get(&raw.name) {
                        return Err(Error::DuplicateHost {
                            name: raw.name,
                            line: line_num,
                            first: *first,
                        });
                    }
                    seen_hosts.insert(raw.name.clone(), line_num);
                    if let Some(g) = groups.iter_mut().find(|g| &g.name == group) {
                        g.hosts.push(raw.name.clone());
                    }
                    raw_hosts.push(raw);
                }
                Section::Vars(group) => {
                    let (key, value) = parse_key_value(line, line_num)?;
                    group_vars.entry(group.clone()).or_default().push((key, value));
                }
            }
        }

        // :vars for a group that never appears is a typo worth failing on.
        for (group, line) in &vars_sections {
            if !groups.iter().any(|g| &g.name == group) {
                return Err(Error::Parse {
                    line: *line,
                    message: format!("[{group}:vars] refers to undeclared group '{group}'"),
                });
            }
        }

        let mut hosts = Vec::with_capacity(raw_hosts.len());
        for raw in raw_hosts {
            let mut host = Host::new(raw.name, raw.group.clone());
            if let Some(vars) = group_vars.get(&raw.group) {
                for (key, value) in vars {
                    apply_setting(&mut host, key, value, raw.line)?;
                }
            }
            for (key, value) in &raw.settings {
                apply_setting(&mut host, key, value, raw.line)?;
            }
            hosts.push(host);
        }

        Ok(Self { groups, hosts })
    }

    /// All groups in declaration order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// All hosts in declaration order.
    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    /// Look up a single host by name.
    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.iter().find(|h| h.name == name)
    }

    /// Hosts of a group, in declaration order. The implicit group
    /// `all` selects every host.
    pub fn hosts_in(&self, group: &str) -> Result<Vec<&Host>> {
        if group == "all" {
            return Ok(self.hosts.iter().collect());
        }
        let found = self
            .groups
            .iter()
            .find(|g| g.name == group)
            .ok_or_else(|| Error::UnknownGroup {
                name: group.to_string(),
            })?;
        Ok(found
            .hosts
            .iter()
            .filter_map(|name| self.host(name))
            .collect())
    }

    /// Check if the inventory has no hosts at all.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

/// Strip a trailing `# comment`, respecting nothing fancier than
/// "the first # starts the comment".
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Parse `[name]` or `[name:vars]`, returning the inner text.
fn parse_section_header(line: &str, line_num: usize) -> Result<String> {
    let inner = line
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| Error::Parse {
            line: line_num,
            message: "unclosed section header".to_string(),
        })?;
    let name_part = inner.strip_suffix(":vars").unwrap_or(inner);
    if name_part.is_empty()
        || name_part.contains(char::is_whitespace)
        || name_part.contains(':')
        || name_part == "all"
    {
        return Err(Error::Parse {
            line: line_num,
            message: format!("invalid group name '{inner}'"),
        });
    }
    Ok(inner.to_string())
}

/// Parse a host line: `name key=value key=value ...`
fn parse_host_line(line: &str, group: &str, line_num: usize) -> Result<RawHost> {
    let mut tokens = line.split_whitespace();
    let name = tokens.next().unwrap_or_default();
    if name.contains('=') {
        return Err(Error::Parse {
            line: line_num,
            message: "expected a host name, found key=value".to_string(),
        });
    }

    let mut settings = Vec::new();
    for token in tokens {
        let (key, value) = parse_key_value(token, line_num)?;
        settings.push((key, value));
    }

    Ok(RawHost {
        name: name.to_string(),
        group: group.to_string(),
        line: line_num,
        settings,
    })
}

/// Parse a single `key=value` token.
fn parse_key_value(token: &str, line_num: usize) -> Result<(String, String)> {
    let (key, value) = token.split_once('=').ok_or_else(|| Error::Parse {
        line: line_num,
        message: format!("expected key=value, found '{token}'"),
    })?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() {
        return Err(Error::Parse {
            line: line_num,
            message: "empty key in key=value".to_string(),
        });
    }
    Ok((key.to_string(), value.to_string()))
}

/// Apply one key=value setting to a host being built.
fn apply_setting(host: &mut Host, key: &str, value: &str, line: usize) -> Result<()> {
    match key {
        "address" => host.address = value.to_string(),
        "port" => {
            host.port = Some(value.parse().map_err(|_| Error::Parse {
                line,
                message: format!("invalid port '{value}'"),
            })?);
        }
        "os_family" => {
            host.os_family = OsFamily::from_keyword(value).ok_or_else(|| Error::Parse {
                line,
                message: format!(
                    "unknown os_family '{value}' (expected debian, rhel or windows)"
                ),
            })?;
        }
        "connection" => {
            host.connection = ConnectionKind::from_keyword(value).ok_or_else(|| Error::Parse {
                line,
                message: format!(
                    "unknown connection '{value}' (expected ssh, winrm or local)"
                ),
            })?;
        }
        "user" => host.user = Some(value.to_string()),
        "become" => {
            host.become_root = match value.to_lowercase().as_str() {
                "true" | "yes" | "1" => true,
                "false" | "no" | "0" => false,
                other => {
                    return Err(Error::Parse {
                        line,
                        message: format!("invalid become value '{other}'"),
                    });
                }
            };
        }
        "interpreter" => host.interpreter = Some(value.to_string()),
        _ => {
            host.vars.insert(key.to_string(), value.to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLEET: &str = r#"
# the demo fleet
[web]
ubuntu1  address=10.1.0.11 os_family=debian
centos1  address=10.1.0.12 os_family=rhel

[web:vars]
user=deploy
become=true

[win]
winserver1 address=10.2.0.21 os_family=windows connection=winrm user=Administrator

[control]
localhost connection=local
"#;

    #[test]
    fn test_parse_basic_fleet() {
        let inv = Inventory::parse(FLEET).unwrap();
        assert_eq!(inv.groups().len(), 3);
        assert_eq!(inv.hosts().len(), 4);

        let ubuntu = inv.host("ubuntu1").unwrap();
        assert_eq!(ubuntu.address, "10.1.0.11");
        assert_eq!(ubuntu.os_family, OsFamily::Debian);
        assert_eq!(ubuntu.group, "web");
    }

    #[test]
    fn test_group_vars_applied() {
        let inv = Inventory::parse(FLEET).unwrap();
        let centos = inv.host("centos1").unwrap();
        assert_eq!(centos.user.as_deref(), Some("deploy"));
        assert!(centos.become_root);
        // vars section does not leak into other groups
        let win = inv.host("winserver1").unwrap();
        assert!(!win.become_root);
    }

    #[test]
    fn test_host_setting_wins_over_group_var() {
        let content = r#"
[web]
a user=alice
b

[web:vars]
user=deploy
"#;
        let inv = Inventory::parse(content).unwrap();
        assert_eq!(inv.host("a").unwrap().user.as_deref(), Some("alice"));
        assert_eq!(inv.host("b").unwrap().user.as_deref(), Some("deploy"));
    }

    #[test]
    fn test_vars_section_may_precede_group() {
        let content = r#"
[web:vars]
user=deploy

[web]
a
"#;
        let inv = Inventory::parse(content).unwrap();
        assert_eq!(inv.host("a").unwrap().user.as_deref(), Some("deploy"));
    }

    #[test]
    fn test_local_connection_mode() {
        let inv = Inventory::parse(FLEET).unwrap();
        let local = inv.host("localhost").unwrap();
        assert_eq!(local.connection, ConnectionKind::Local);
    }

    #[test]
    fn test_free_form_vars() {
        let content = "[web]\na tier=frontend\n";
        let inv = Inventory::parse(content).unwrap();
        let host = inv.host("a").unwrap();
        assert_eq!(host.vars.get("tier").map(String::as_str), Some("frontend"));
    }

    #[test]
    fn test_duplicate_host_rejected() {
        let content = "[web]\na\n[db]\na\n";
        let err = Inventory::parse(content).unwrap_err();
        match err {
            Error::DuplicateHost { name, line, first } => {
                assert_eq!(name, "a");
                assert_eq!(first, 2);
                assert_eq!(line, 4);
            }
            other => panic!("expected DuplicateHost, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_group_rejected() {
        let content = "[web]\na\n[web]\nb\n";
        assert!(matches!(
            Inventory::parse(content),
            Err(Error::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn test_host_before_group_rejected() {
        let err = Inventory::parse("orphan\n[web]\n").unwrap_err();
        assert!(matches!(err, Error::Parse { line: 1, .. }));
    }

    #[test]
    fn test_unknown_os_family_rejected() {
        let content = "[web]\na os_family=bsd\n";
        let err = Inventory::parse(content).unwrap_err();
        match err {
            Error::Parse { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("os_family"));
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_port_rejected() {
        let content = "[web]\na port=ssh\n";
        assert!(matches!(
            Inventory::parse(content),
            Err(Error::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn test_vars_line_without_equals_rejected() {
        let content = "[web]\na\n[web:vars]\njustakey\n";
        assert!(matches!(
            Inventory::parse(content),
            Err(Error::Parse { line: 4, .. })
        ));
    }

    #[test]
    fn test_vars_for_undeclared_group_rejected() {
        let content = "[web:vars]\nuser=deploy\n";
        let err = Inventory::parse(content).unwrap_err();
        match err {
            Error::Parse { line, message } => {
                assert_eq!(line, 1);
                assert!(message.contains("undeclared"));
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn test_unclosed_section_rejected() {
        assert!(matches!(
            Inventory::parse("[web\na\n"),
            Err(Error::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_all_is_reserved() {
        assert!(matches!(
            Inventory::parse("[all]\na\n"),
            Err(Error::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_hosts_in_group_order_preserved() {
        let inv = Inventory::parse(FLEET).unwrap();
        let web: Vec<_> = inv
            .hosts_in("web")
            .unwrap()
            .iter()
            .map(|h| h.name.clone())
            .collect();
        assert_eq!(web, vec!["ubuntu1", "centos1"]);
    }

    #[test]
    fn test_hosts_in_all() {
        let inv = Inventory::parse(FLEET).unwrap();
        let all: Vec<_> = inv
            .hosts_in("all")
            .unwrap()
            .iter()
            .map(|h| h.name.clone())
            .collect();
        assert_eq!(all, vec!["ubuntu1", "centos1", "winserver1", "localhost"]);
    }

    #[test]
    fn test_unknown_group_query() {
        let inv = Inventory::parse(FLEET).unwrap();
        assert!(matches!(
            inv.hosts_in("database"),
            Err(Error::UnknownGroup { .. })
        ));
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let content = "\n# header\n[web]  # trailing\n\na  # a host\n";
        let inv = Inventory::parse(content).unwrap();
        assert_eq!(inv.hosts().len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = Inventory::load(Path::new("/nonexistent/hosts.ini")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_load_from_tempfile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hosts.ini");
        std::fs::write(&path, FLEET).unwrap();
        let inv = Inventory::load(&path).unwrap();
        assert_eq!(inv.hosts().len(), 4);
    }
}
