//! The `validate` command: parse a runbook and dry-build its plans.

use anyhow::{bail, Context as AnyhowContext, Result};
use std::path::{Path, PathBuf};

use inventory::Inventory;
use runbook::{build_plan, Runbook};

use crate::cli::ValidateArgs;
use crate::config::Config;
use crate::ui;
use crate::Context;

pub fn run(_ctx: &Context, args: ValidateArgs) -> Result<()> {
    let config = Config::load()?;

    let runbook = Runbook::load(&args.runbook)
        .with_context(|| format!("Could not load runbook {}", args.runbook.display()))?;
    ui::success(&format!(
        "runbook '{}' parsed: {} steps, {} handlers",
        runbook.name,
        runbook.steps.len(),
        runbook.handlers.len()
    ));
    let total = runbook.steps.len();
    for (i, step) in runbook.steps.iter().enumerate() {
        ui::step(i + 1, total, &format!("{} ({})", step.name, step.action.kind()));
    }

    // Without an inventory we can only check the runbook itself.
    let Some(inventory_path) = args.inventory.clone().or_else(|| config.inventory_path()) else {
        ui::info("no inventory; skipped per-host plan checks");
        return Ok(());
    };
    let inv = Inventory::load(&inventory_path)
        .with_context(|| format!("Could not load inventory {}", inventory_path.display()))?;
    let hosts = super::select_hosts(&inv, &args.limit)?;

    let template_root = args
        .runbook
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    println!();
    let mut failures = 0;
    for host in &hosts {
        match build_plan(&runbook, host, &template_root) {
            Ok(plan) => ui::dim(&format!(
                "{}: {} of {} steps apply",
                host.name,
                plan.applicable_steps(),
                plan.steps.len()
            )),
            Err(e) => {
                failures += 1;
                ui::error(&format!("{}: {e}", host.name));
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} plans failed to build", hosts.len());
    }
    ui::success(&format!("built {} host plans", hosts.len()));
    Ok(())
}
