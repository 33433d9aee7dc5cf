//! Per-host plan construction.
//!
//! `build_plan` specializes a runbook for one host: predicates are
//! evaluated against the host's facts, upload templates and probe
//! URLs are rendered (handlebars, strict mode), and every failure
//! surfaces here, before any remote action runs.
//!
//! Steps excluded by their predicate stay in the plan, marked not
//! applicable, so the executor can report them skipped instead of
//! silently dropping them.

use crate::error::{Error, Result};
use crate::predicate;
use crate::types::{ActionSpec, Handler, Runbook, Step};
use handlebars::Handlebars;
use inventory::Host;
use std::collections::BTreeMap;
use std::path::Path;

/// One step of a host's plan.
#[derive(Debug, Clone)]
pub struct PlannedStep {
    /// Step name, from the runbook.
    pub name: String,
    /// The action, with any templated fields already rendered.
    pub action: ActionSpec,
    /// False when the predicate excluded this host.
    pub applicable: bool,
    /// Handlers to signal on change.
    pub notify: Vec<String>,
    /// Rendered upload payload, present for applicable upload steps.
    pub payload: Option<Vec<u8>>,
}

/// The ordered execution plan for one host.
#[derive(Debug, Clone)]
pub struct Plan {
    /// The target host.
    pub host: Host,
    /// Steps in runbook declaration order.
    pub steps: Vec<PlannedStep>,
    /// Handlers in declaration order, URLs rendered for this host.
    pub handlers: Vec<Handler>,
}

impl Plan {
    /// Number of steps the predicate left applicable.
    pub fn applicable_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.applicable).count()
    }
}

/// Build the execution plan for one host. `template_root` anchors
/// relative `upload.src` paths, normally the runbook's directory.
pub fn build_plan(runbook: &Runbook, host: &Host, template_root: &Path) -> Result<Plan> {
    let facts = host.facts();
    let mut renderer = Handlebars::new();
    renderer.set_strict_mode(true);

    let mut steps = Vec::with_capacity(runbook.steps.len());
    for step in &runbook.steps {
        steps.push(plan_step(step, host, &facts, &renderer, template_root)?);
    }

    let mut handlers = Vec::with_capacity(runbook.handlers.len());
    for handler in &runbook.handlers {
        handlers.push(Handler {
            name: handler.name.clone(),
            action: render_action(&handler.action, &facts, &renderer, host, &handler.name)?,
        });
    }

    Ok(Plan {
        host: host.clone(),
        steps,
        handlers,
    })
}

fn plan_step(
    step: &Step,
    host: &Host,
    facts: &BTreeMap<String, String>,
    renderer: &Handlebars,
    template_root: &Path,
) -> Result<PlannedStep> {
    let applicable = match &step.when {
        None => true,
        Some(expr) => predicate::parse(expr)?
            .evaluate(facts)
            .map_err(|e| match e {
                Error::UnknownVariable { name } => Error::Config {
                    host: host.name.clone(),
                    message: format!(
                        "unknown variable '{name}' in 'when' of step '{}'",
                        step.name
                    ),
                },
                other => other,
            })?,
    };

    // Non-applicable steps are never rendered. A linux-only template
    // must not fail the plan of a windows host.
    if !applicable {
        return Ok(PlannedStep {
            name: step.name.clone(),
            action: step.action.clone(),
            applicable: false,
            notify: step.notify.clone(),
            payload: None,
        });
    }

    let action = render_action(&step.action, facts, renderer, host, &step.name)?;
    let payload = match &action {
        ActionSpec::Upload(spec) => {
            let src = if spec.src.is_absolute() {
                spec.src.clone()
            } else {
                template_root.join(&spec.src)
            };
            let template = std::fs::read_to_string(&src).map_err(|e| Error::Config {
                host: host.name.clone(),
                message: format!(
                    "step '{}': cannot read template '{}': {e}",
                    step.name,
                    src.display()
                ),
            })?;
            let rendered = renderer
                .render_template(&template, facts)
                .map_err(|e| Error::Config {
                    host: host.name.clone(),
                    message: format!("step '{}': template render failed: {e}", step.name),
                })?;
            Some(rendered.into_bytes())
        }
        _ => None,
    };

    Ok(PlannedStep {
        name: step.name.clone(),
        action,
        applicable: true,
        notify: step.notify.clone(),
        payload,
    })
}

/// Render the templated fields of an action. Today that is the
/// `http_get` URL; other actions pass through unchanged.
fn render_action(
    action: &ActionSpec,
    facts: &BTreeMap<String, String>,
    renderer: &Handlebars,
    host: &Host,
    owner: &str,
) -> Result<ActionSpec> {
    match action {
        ActionSpec::HttpGet(spec) => {
            let url = renderer
                .render_template(&spec.url, facts)
                .map_err(|e| Error::Config {
                    host: host.name.clone(),
                    message: format!("'{owner}': cannot render url '{}': {e}", spec.url),
                })?;
            let mut rendered = spec.clone();
            rendered.url = url;
            Ok(ActionSpec::HttpGet(rendered))
        }
        other => Ok(other.clone()),
    }
}
