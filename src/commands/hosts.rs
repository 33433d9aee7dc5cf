//! The `hosts` command: show what the inventory resolves to.

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;

use inventory::Inventory;

use crate::cli::HostsArgs;
use crate::config::Config;
use crate::ui;
use crate::Context;

pub fn run(_ctx: &Context, args: HostsArgs) -> Result<()> {
    let config = Config::load()?;

    let inventory_path = super::resolve_inventory(args.inventory.clone(), &config)?;
    let inv = Inventory::load(&inventory_path)
        .with_context(|| format!("Could not load inventory {}", inventory_path.display()))?;

    let hosts = super::select_hosts(&inv, &args.limit)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&hosts)?);
        return Ok(());
    }

    ui::header(&format!("Inventory: {}", inventory_path.display()));

    for host in &hosts {
        println!();
        println!("  {} {}", "●".cyan(), host.name.bold());
        ui::kv("group", &host.group);
        ui::kv("address", &host.address);
        if let Some(port) = host.port {
            ui::kv("port", &port.to_string());
        }
        ui::kv("os_family", host.os_family.keyword());
        ui::kv("connection", host.connection.keyword());
        if let Some(user) = &host.user {
            ui::kv("user", user);
        }
        if host.become_root {
            ui::kv("become", "true");
        }
        for (key, value) in &host.vars {
            ui::kv(key, value);
        }
    }

    println!();
    ui::dim(&format!("{} hosts", hosts.len()));
    Ok(())
}
