use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that points at an explicit config file.
pub const CONFIG_ENV: &str = "DROVER_CONFIG";

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("drover"))
}

fn default_forks() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

/// Run defaults, overridable per invocation from the command line.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default inventory path. `~` expands to the home directory.
    pub inventory: Option<String>,
    /// Default worker pool size.
    pub forks: usize,
    /// Default per-action deadline, in seconds.
    pub timeout_secs: u64,
    /// Connection establishment timeout, in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inventory: None,
            forks: default_forks(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Config {
    /// Load config, trying in order: `$DROVER_CONFIG`, `./drover.toml`,
    /// `~/.config/drover/config.toml`. Missing files fall through to
    /// the built-in defaults; a file that exists but does not parse is
    /// an error.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }

        let local = Path::new("drover.toml");
        if local.exists() {
            return Self::from_file(local);
        }

        let global = config_dir()?.join("config.toml");
        if global.exists() {
            return Self::from_file(&global);
        }

        Ok(Self::default())
    }

    /// Load config from a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid config format in {}", path.display()))
    }

    /// The configured inventory path with `~` expanded.
    pub fn inventory_path(&self) -> Option<PathBuf> {
        self.inventory
            .as_ref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
    }
}
