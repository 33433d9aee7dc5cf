//! The `run` command: converge a fleet against a runbook.

use anyhow::{bail, Context as AnyhowContext, Result};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use inventory::Inventory;
use runbook::{build_plan, Runbook};
use transport::ConnectOptions;

use crate::cli::RunArgs;
use crate::config::Config;
use crate::engine::{Engine, EngineOptions, HostJob, HostReport, Outcome, RunReport};
use crate::progress::ConsoleProgress;
use crate::secrets;
use crate::ui;
use crate::Context;

pub async fn run(ctx: &Context, args: RunArgs) -> Result<()> {
    let config = Config::load()?;

    let inventory_path = super::resolve_inventory(args.inventory.clone(), &config)?;
    let inv = Inventory::load(&inventory_path)
        .with_context(|| format!("Could not load inventory {}", inventory_path.display()))?;
    let runbook = Runbook::load(&args.runbook)
        .with_context(|| format!("Could not load runbook {}", args.runbook.display()))?;

    let hosts = super::select_hosts(&inv, &args.limit)?;
    if hosts.is_empty() {
        ui::warn(&format!("no hosts matched '{}'", args.limit));
        return Ok(());
    }

    let become_pass = secrets::acquire(args.ask_become_pass)?;
    let connect_options = ConnectOptions {
        connect_timeout_secs: config.connect_timeout_secs,
        become_pass,
    };

    // Relative template paths resolve against the runbook's directory.
    let template_root = args
        .runbook
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

    ui::header(&format!("Runbook: {}", runbook.name));
    ui::kv("inventory", &inventory_path.display().to_string());
    ui::kv("hosts", &hosts.len().to_string());
    if args.check {
        ui::info("check mode - probing only, nothing will change");
    }

    // Build every host's plan up front. A host whose plan fails is
    // reported failed without ever connecting; the others still run.
    let mut jobs = Vec::new();
    let mut job_order = Vec::new();
    let mut prebuilt: BTreeMap<usize, HostReport> = BTreeMap::new();
    for (idx, host) in hosts.iter().enumerate() {
        match build_plan(&runbook, host, &template_root) {
            Ok(plan) => {
                let connection = transport::connect(host, &connect_options);
                jobs.push(HostJob { plan, connection });
                job_order.push(idx);
            }
            Err(e) => {
                ui::error(&format!("{}: {e}", host.name));
                prebuilt.insert(idx, HostReport::plan_failure(&host.name, e.to_string()));
            }
        }
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupt received: finishing in-flight steps");
            interrupt.cancel();
        }
    });

    let options = EngineOptions {
        forks: args.forks.unwrap_or(config.forks),
        action_timeout: Duration::from_secs(args.timeout.unwrap_or(config.timeout_secs)),
        check: args.check,
    };
    let engine = Engine::with_progress(options, Arc::new(ConsoleProgress::new(ctx.quiet)));

    let started = chrono::Utc::now();
    let clock = Instant::now();
    let ran = engine.run(jobs, cancel).await;

    let mut by_index = prebuilt;
    for (idx, report) in job_order.into_iter().zip(ran) {
        by_index.insert(idx, report);
    }
    let host_reports: Vec<HostReport> = hosts
        .iter()
        .enumerate()
        .map(|(idx, host)| {
            by_index.remove(&idx).unwrap_or_else(|| {
                HostReport::plan_failure(&host.name, "host report missing".to_string())
            })
        })
        .collect();

    let report = RunReport {
        runbook: runbook.name.clone(),
        check: args.check,
        started,
        duration_ms: clock.elapsed().as_millis() as u64,
        hosts: host_reports,
    };

    print_summary(&report, ctx.verbose > 0);

    if let Some(path) = &args.report_json {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)
            .with_context(|| format!("Could not write report to {}", path.display()))?;
        ui::dim(&format!("report written to {}", path.display()));
    }

    println!();
    if report.is_success() {
        if args.check {
            ui::success(&format!(
                "check complete: {} pending changes across {} hosts",
                report.total_changed(),
                report.hosts.len()
            ));
        } else {
            ui::success(&format!(
                "{} hosts converged, {} changes applied",
                report.hosts.len(),
                report.total_changed()
            ));
        }
        Ok(())
    } else {
        bail!(
            "{} of {} hosts did not converge",
            report.unconverged(),
            report.hosts.len()
        );
    }
}

fn print_summary(report: &RunReport, verbose: bool) {
    ui::section("Summary");
    for host in &report.hosts {
        println!(
            "  {} {} {}",
            ui::status_label(host.status),
            host.host.bold(),
            host.counts_line().dimmed()
        );
        if let Some(error) = &host.error {
            ui::dim(&format!("  plan: {error}"));
        }
        for step in &host.steps {
            if verbose {
                let line = match &step.detail {
                    Some(detail) => format!(
                        "    {} {} ({detail})",
                        ui::outcome_glyph(step.outcome),
                        step.step
                    ),
                    None => format!("    {} {}", ui::outcome_glyph(step.outcome), step.step),
                };
                ui::dim(&line);
            } else if let (Outcome::Failed, Some(detail)) = (step.outcome, &step.detail) {
                ui::dim(&format!("  {}: {detail}", step.step));
            }
        }
        for failure in &host.handler_failures {
            ui::dim(&format!("  handler {failure}"));
        }
    }
}
