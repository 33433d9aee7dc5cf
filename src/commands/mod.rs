// Fleet commands
pub mod hosts;
pub mod run;
pub mod validate;

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use inventory::{Host, Inventory};

use crate::config::Config;

/// The inventory to use: the command-line flag wins, then the config.
fn resolve_inventory(flag: Option<PathBuf>, config: &Config) -> Result<PathBuf> {
    flag.or_else(|| config.inventory_path())
        .context("No inventory given: pass --inventory or set `inventory` in drover.toml")
}

/// Resolve `--limit` to hosts: a group name (including the implicit
/// `all`), or a single host name.
fn select_hosts(inventory: &Inventory, limit: &str) -> Result<Vec<Host>> {
    if let Ok(hosts) = inventory.hosts_in(limit) {
        return Ok(hosts.into_iter().cloned().collect());
    }
    if let Some(host) = inventory.host(limit) {
        return Ok(vec![host.clone()]);
    }
    bail!("'{limit}' is neither a group nor a host in the inventory");
}
