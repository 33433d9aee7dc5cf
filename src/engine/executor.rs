//! The run engine: per-host pipelines under a bounded worker pool.
//!
//! Hosts execute concurrently, capped by `forks`. Within one host the
//! steps run strictly in order; the first failure skips the rest of
//! that host's steps without touching any other host. Handlers
//! signaled by changed steps fire after the steps, deduplicated, in
//! declaration order. Cancellation is cooperative: the in-flight step
//! finishes, everything after it is reported skipped.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use inventory::Host;
use runbook::{Handler, Plan, PlannedStep};
use transport::Connection;

use crate::action;
use crate::engine::report::{HostReport, HostStatus, Outcome, StepReport};

// ============================================================================
// Options
// ============================================================================

/// Knobs for one run.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Maximum number of hosts executing at once.
    pub forks: usize,
    /// Deadline for a single action, probe included.
    pub action_timeout: Duration,
    /// Probe only; report what would change without applying.
    pub check: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            forks: 4,
            action_timeout: Duration::from_secs(60),
            check: false,
        }
    }
}

// ============================================================================
// Progress callbacks
// ============================================================================

/// Observer for run progress, driven from the host pipelines.
pub trait Progress: Send + Sync {
    /// A host's pipeline is starting.
    fn on_host_start(&self, host: &str, steps: usize);

    /// A step finished (ran, or was skipped).
    fn on_step_complete(&self, host: &str, report: &StepReport);

    /// A host's pipeline finished.
    fn on_host_complete(&self, report: &HostReport);
}

/// A progress observer that does nothing.
pub struct NoProgress;

impl Progress for NoProgress {
    fn on_host_start(&self, _host: &str, _steps: usize) {}
    fn on_step_complete(&self, _host: &str, _report: &StepReport) {}
    fn on_host_complete(&self, _report: &HostReport) {}
}

// ============================================================================
// Engine
// ============================================================================

/// One host's work: its plan and the connection to run it over.
pub struct HostJob {
    /// The specialized plan for this host.
    pub plan: Plan,
    /// Transport in charge of the host.
    pub connection: Arc<dyn Connection>,
}

/// Drives host pipelines to completion.
pub struct Engine {
    options: EngineOptions,
    progress: Arc<dyn Progress>,
}

impl Engine {
    /// Create an engine that reports no progress.
    pub fn new(options: EngineOptions) -> Self {
        Self::with_progress(options, Arc::new(NoProgress))
    }

    /// Create an engine with a progress observer.
    pub fn with_progress(options: EngineOptions, progress: Arc<dyn Progress>) -> Self {
        Self { options, progress }
    }

    /// Run every job to completion and return one report per job, in
    /// job order. Cancelling the token stops new work: hosts that
    /// have not started are reported cancelled, hosts mid-pipeline
    /// finish their current step first.
    pub async fn run(&self, jobs: Vec<HostJob>, cancel: CancellationToken) -> Vec<HostReport> {
        let semaphore = Arc::new(Semaphore::new(self.options.forks.max(1)));
        let names: Vec<String> = jobs.iter().map(|j| j.plan.host.name.clone()).collect();

        let mut set = JoinSet::new();
        for (idx, job) in jobs.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let progress = Arc::clone(&self.progress);
            let cancel = cancel.clone();
            let options = self.options;
            set.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (idx, cancelled_report(&job.plan));
                };
                if cancel.is_cancelled() {
                    return (idx, cancelled_report(&job.plan));
                }
                (idx, run_host(options, progress.as_ref(), &job, &cancel).await)
            });
        }

        let mut collected: BTreeMap<usize, HostReport> = BTreeMap::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, report)) => {
                    collected.insert(idx, report);
                }
                Err(e) => log::error!("host pipeline panicked: {e}"),
            }
        }

        names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| {
                collected.remove(&idx).unwrap_or_else(|| {
                    HostReport::plan_failure(&name, "host pipeline panicked".to_string())
                })
            })
            .collect()
    }
}

/// A host whose pipeline never started.
fn cancelled_report(plan: &Plan) -> HostReport {
    HostReport {
        host: plan.host.name.clone(),
        status: HostStatus::Cancelled,
        steps: plan
            .steps
            .iter()
            .map(|s| StepReport::skipped(&s.name, s.action.kind(), "run cancelled"))
            .collect(),
        fired_handlers: Vec::new(),
        handler_failures: Vec::new(),
        error: None,
    }
}

async fn run_host(
    options: EngineOptions,
    progress: &dyn Progress,
    job: &HostJob,
    cancel: &CancellationToken,
) -> HostReport {
    let host = &job.plan.host;
    progress.on_host_start(&host.name, job.plan.steps.len());

    let mut steps = Vec::with_capacity(job.plan.steps.len());
    let mut failed = false;
    let mut cancelled = false;
    let mut signaled: Vec<String> = Vec::new();

    for step in &job.plan.steps {
        let report = if failed {
            StepReport::skipped(&step.name, step.action.kind(), "earlier step failed")
        } else if cancelled || cancel.is_cancelled() {
            cancelled = true;
            StepReport::skipped(&step.name, step.action.kind(), "run cancelled")
        } else if !step.applicable {
            StepReport::skipped(&step.name, step.action.kind(), "predicate excluded host")
        } else {
            let report = run_step(options, step, host, job.connection.as_ref()).await;
            match report.outcome {
                Outcome::Failed => failed = true,
                Outcome::Changed => {
                    for name in &step.notify {
                        if !signaled.contains(name) {
                            signaled.push(name.clone());
                        }
                    }
                }
                Outcome::Satisfied | Outcome::Skipped => {}
            }
            report
        };
        progress.on_step_complete(&host.name, &report);
        steps.push(report);
    }

    // Handlers fire only for hosts that completed their steps. Each
    // signaled handler runs at most once, in declaration order. A
    // handler failure does not stop the handlers after it.
    let mut fired_handlers = Vec::new();
    let mut handler_failures = Vec::new();
    if !failed && !cancelled {
        for handler in &job.plan.handlers {
            if !signaled.contains(&handler.name) {
                continue;
            }
            fired_handlers.push(handler.name.clone());
            if options.check {
                continue;
            }
            if let Err(message) = run_handler(options, handler, host, job.connection.as_ref()).await
            {
                log::warn!("{}: handler '{}' failed: {message}", host.name, handler.name);
                handler_failures.push(format!("{}: {message}", handler.name));
            }
        }
    }

    let status = if failed {
        HostStatus::Failed
    } else if cancelled {
        HostStatus::Cancelled
    } else if !handler_failures.is_empty() {
        HostStatus::Degraded
    } else if steps.iter().any(|s| s.outcome == Outcome::Changed) {
        HostStatus::Changed
    } else {
        HostStatus::Ok
    };

    let report = HostReport {
        host: host.name.clone(),
        status,
        steps,
        fired_handlers,
        handler_failures,
        error: None,
    };
    progress.on_host_complete(&report);
    report
}

async fn run_step(
    options: EngineOptions,
    step: &PlannedStep,
    host: &Host,
    conn: &dyn Connection,
) -> StepReport {
    let started = Instant::now();
    let action = action::resolve(step);
    let converge = action.converge(host, conn, options.check);
    let (outcome, detail) = match tokio::time::timeout(options.action_timeout, converge).await {
        Err(_) => (
            Outcome::Failed,
            Some(format!(
                "timed out: {}s deadline elapsed",
                options.action_timeout.as_secs()
            )),
        ),
        Ok(Err(e)) => (Outcome::Failed, Some(e.to_string())),
        Ok(Ok(result)) => (result.outcome, result.detail),
    };
    StepReport {
        step: step.name.clone(),
        action: step.action.kind().to_string(),
        outcome,
        detail,
        duration_ms: started.elapsed().as_millis() as u64,
    }
}

async fn run_handler(
    options: EngineOptions,
    handler: &Handler,
    host: &Host,
    conn: &dyn Connection,
) -> std::result::Result<(), String> {
    let action = action::resolve_spec(&handler.action, None);
    let converge = action.converge(host, conn, false);
    match tokio::time::timeout(options.action_timeout, converge).await {
        Err(_) => Err(format!(
            "timed out: {}s deadline elapsed",
            options.action_timeout.as_secs()
        )),
        Ok(Err(e)) => Err(e.to_string()),
        Ok(Ok(result)) if result.outcome == Outcome::Failed => Err(result
            .detail
            .unwrap_or_else(|| "handler action failed".to_string())),
        Ok(Ok(_)) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use runbook::{ActionSpec, CommandSpec};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use transport::Exec;

    fn exec(exit_code: i32, stdout: &str, stderr: &str) -> Exec {
        Exec {
            exit_code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    /// A connection that replays canned results keyed by command.
    struct Scripted {
        responses: HashMap<String, Exec>,
        default: Exec,
        ran: Mutex<Vec<String>>,
        delay: Option<Duration>,
        cancel_on: Option<(String, CancellationToken)>,
        active: AtomicUsize,
        max_active: AtomicUsize,
    }

    impl Scripted {
        fn ok() -> Self {
            Self {
                responses: HashMap::new(),
                default: exec(0, "", ""),
                ran: Mutex::new(Vec::new()),
                delay: None,
                cancel_on: None,
                active: AtomicUsize::new(0),
                max_active: AtomicUsize::new(0),
            }
        }

        fn with(mut self, command: &str, result: Exec) -> Self {
            self.responses.insert(command.to_string(), result);
            self
        }

        fn delayed(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        fn cancelling_on(mut self, command: &str, token: CancellationToken) -> Self {
            self.cancel_on = Some((command.to_string(), token));
            self
        }

        fn commands(&self) -> Vec<String> {
            self.ran.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Connection for Scripted {
        async fn run(&self, command: &str) -> transport::Result<Exec> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.ran.lock().unwrap().push(command.to_string());
            if let Some((trigger, token)) = &self.cancel_on {
                if command.contains(trigger.as_str()) {
                    token.cancel();
                }
            }
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(self
                .responses
                .get(command)
                .cloned()
                .unwrap_or_else(|| self.default.clone()))
        }

        async fn upload(
            &self,
            _content: &[u8],
            dest: &str,
            _mode: Option<&str>,
        ) -> transport::Result<Exec> {
            self.ran.lock().unwrap().push(format!("upload {dest}"));
            Ok(exec(0, "", ""))
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    fn cmd_step(name: &str, cmd: &str) -> PlannedStep {
        PlannedStep {
            name: name.to_string(),
            action: ActionSpec::Command(CommandSpec {
                cmd: cmd.to_string(),
                creates: None,
            }),
            applicable: true,
            notify: Vec::new(),
            payload: None,
        }
    }

    fn notifying(mut step: PlannedStep, handlers: &[&str]) -> PlannedStep {
        step.notify = handlers.iter().map(|h| (*h).to_string()).collect();
        step
    }

    fn handler(name: &str, cmd: &str) -> Handler {
        Handler {
            name: name.to_string(),
            action: ActionSpec::Command(CommandSpec {
                cmd: cmd.to_string(),
                creates: None,
            }),
        }
    }

    fn job(
        name: &str,
        steps: Vec<PlannedStep>,
        handlers: Vec<Handler>,
        conn: Arc<Scripted>,
    ) -> HostJob {
        HostJob {
            plan: Plan {
                host: Host::new(name.to_string(), "all".to_string()),
                steps,
                handlers,
            },
            connection: conn,
        }
    }

    fn fast_options() -> EngineOptions {
        EngineOptions {
            forks: 4,
            action_timeout: Duration::from_secs(5),
            check: false,
        }
    }

    #[tokio::test]
    async fn test_rerun_after_convergence_changes_nothing() {
        let step = PlannedStep {
            name: "install app".to_string(),
            action: ActionSpec::Command(CommandSpec {
                cmd: "install app".to_string(),
                creates: Some("/opt/app.ok".to_string()),
            }),
            applicable: true,
            notify: Vec::new(),
            payload: None,
        };
        let engine = Engine::new(fast_options());

        // First run: marker absent, the command applies.
        let first = Arc::new(Scripted::ok().with("test -e /opt/app.ok", exec(1, "", "")));
        let reports = engine
            .run(
                vec![job("h1", vec![step.clone()], vec![], Arc::clone(&first))],
                CancellationToken::new(),
            )
            .await;
        assert_eq!(reports[0].status, HostStatus::Changed);
        assert_eq!(reports[0].steps[0].outcome, Outcome::Changed);
        assert!(first.commands().contains(&"install app".to_string()));

        // Second run: marker present, nothing to do.
        let second = Arc::new(Scripted::ok());
        let reports = engine
            .run(
                vec![job("h1", vec![step], vec![], Arc::clone(&second))],
                CancellationToken::new(),
            )
            .await;
        assert_eq!(reports[0].status, HostStatus::Ok);
        assert_eq!(reports[0].steps[0].outcome, Outcome::Satisfied);
        assert!(!second.commands().contains(&"install app".to_string()));
    }

    #[tokio::test]
    async fn test_excluded_step_is_skipped_not_run() {
        let mut step = cmd_step("linux only", "apt-get update");
        step.applicable = false;
        let conn = Arc::new(Scripted::ok());
        let engine = Engine::new(fast_options());
        let reports = engine
            .run(
                vec![job("win1", vec![step], vec![], Arc::clone(&conn))],
                CancellationToken::new(),
            )
            .await;
        assert_eq!(reports[0].status, HostStatus::Ok);
        assert_eq!(reports[0].steps[0].outcome, Outcome::Skipped);
        assert_eq!(
            reports[0].steps[0].detail.as_deref(),
            Some("predicate excluded host")
        );
        assert!(conn.commands().is_empty());
    }

    #[tokio::test]
    async fn test_linux_only_step_across_mixed_fleet() {
        let inv = inventory::Inventory::parse(
            "[linux]\n\
             ubuntu1 address=10.0.0.1 os_family=debian\n\
             centos1 address=10.0.0.2 os_family=rhel\n\
             [windows]\n\
             winserver1 address=10.0.0.3 os_family=windows connection=winrm\n",
        )
        .unwrap();
        let book = runbook::Runbook::parse(
            r#"
name: web tier
steps:
  - name: install nginx
    package: { name: nginx, state: present }
    when: os_family == "debian" || os_family == "rhel"
"#,
        )
        .unwrap();

        let conns = [
            Arc::new(Scripted::ok()),
            Arc::new(
                Scripted::ok().with("rpm -q nginx", exec(1, "package nginx is not installed", "")),
            ),
            Arc::new(Scripted::ok()),
        ];
        let jobs: Vec<HostJob> = inv
            .hosts()
            .iter()
            .zip(conns.iter())
            .map(|(host, conn)| HostJob {
                plan: runbook::build_plan(&book, host, std::path::Path::new(".")).unwrap(),
                connection: Arc::clone(conn) as Arc<dyn Connection>,
            })
            .collect();
        let engine = Engine::new(fast_options());
        let reports = engine.run(jobs, CancellationToken::new()).await;

        assert_eq!(reports[0].host, "ubuntu1");
        assert_eq!(reports[0].steps[0].outcome, Outcome::Changed);
        assert!(conns[0]
            .commands()
            .contains(&"DEBIAN_FRONTEND=noninteractive apt-get install -y nginx".to_string()));

        assert_eq!(reports[1].host, "centos1");
        assert_eq!(reports[1].steps[0].outcome, Outcome::Changed);
        assert!(conns[1].commands().contains(&"dnf install -y nginx".to_string()));

        assert_eq!(reports[2].host, "winserver1");
        assert_eq!(reports[2].status, HostStatus::Ok);
        assert_eq!(reports[2].steps[0].outcome, Outcome::Skipped);
        assert!(conns[2].commands().is_empty());
    }

    #[tokio::test]
    async fn test_handler_fires_once_for_many_signals() {
        let steps = vec![
            notifying(cmd_step("write conf", "write conf"), &["restart app"]),
            notifying(cmd_step("write env", "write env"), &["restart app"]),
        ];
        let conn = Arc::new(Scripted::ok());
        let engine = Engine::new(fast_options());
        let reports = engine
            .run(
                vec![job(
                    "h1",
                    steps,
                    vec![handler("restart app", "systemctl restart app")],
                    Arc::clone(&conn),
                )],
                CancellationToken::new(),
            )
            .await;
        assert_eq!(reports[0].status, HostStatus::Changed);
        assert_eq!(reports[0].fired_handlers, vec!["restart app".to_string()]);
        let restarts = conn
            .commands()
            .iter()
            .filter(|c| c.as_str() == "systemctl restart app")
            .count();
        assert_eq!(restarts, 1);
    }

    #[tokio::test]
    async fn test_handlers_run_in_declaration_order() {
        let steps = vec![notifying(cmd_step("touch", "touch it"), &["second", "first"])];
        let conn = Arc::new(Scripted::ok());
        let engine = Engine::new(fast_options());
        let reports = engine
            .run(
                vec![job(
                    "h1",
                    steps,
                    vec![handler("first", "first cmd"), handler("second", "second cmd")],
                    Arc::clone(&conn),
                )],
                CancellationToken::new(),
            )
            .await;
        assert_eq!(
            reports[0].fired_handlers,
            vec!["first".to_string(), "second".to_string()]
        );
        let commands = conn.commands();
        let first = commands.iter().position(|c| c == "first cmd").unwrap();
        let second = commands.iter().position(|c| c == "second cmd").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_failure_stops_host_but_not_fleet() {
        let bad_steps = vec![
            notifying(cmd_step("prep", "prep"), &["reload"]),
            cmd_step("deploy", "deploy"),
            cmd_step("verify", "verify"),
        ];
        let bad_conn = Arc::new(Scripted::ok().with("deploy", exec(1, "", "disk full")));
        let good_conn = Arc::new(Scripted::ok());
        let engine = Engine::new(fast_options());
        let reports = engine
            .run(
                vec![
                    job(
                        "broken",
                        bad_steps,
                        vec![handler("reload", "reload cmd")],
                        Arc::clone(&bad_conn),
                    ),
                    job(
                        "healthy",
                        vec![cmd_step("deploy", "deploy")],
                        vec![],
                        Arc::clone(&good_conn),
                    ),
                ],
                CancellationToken::new(),
            )
            .await;

        let broken = &reports[0];
        assert_eq!(broken.status, HostStatus::Failed);
        assert_eq!(broken.steps[0].outcome, Outcome::Changed);
        assert_eq!(broken.steps[1].outcome, Outcome::Failed);
        assert!(broken.steps[1].detail.as_deref().unwrap().contains("disk full"));
        assert_eq!(broken.steps[2].outcome, Outcome::Skipped);
        assert_eq!(broken.steps[2].detail.as_deref(), Some("earlier step failed"));
        // A failed host runs no handlers, even signaled ones.
        assert!(broken.fired_handlers.is_empty());
        assert!(!bad_conn.commands().contains(&"reload cmd".to_string()));

        let healthy = &reports[1];
        assert_eq!(healthy.status, HostStatus::Changed);
        assert!(good_conn.commands().contains(&"deploy".to_string()));
    }

    #[tokio::test]
    async fn test_handler_failure_degrades_host() {
        let steps = vec![notifying(cmd_step("conf", "conf"), &["flaky", "steady"])];
        let conn = Arc::new(Scripted::ok().with("flaky cmd", exec(1, "", "unit not found")));
        let engine = Engine::new(fast_options());
        let reports = engine
            .run(
                vec![job(
                    "h1",
                    steps,
                    vec![handler("flaky", "flaky cmd"), handler("steady", "steady cmd")],
                    Arc::clone(&conn),
                )],
                CancellationToken::new(),
            )
            .await;
        assert_eq!(reports[0].status, HostStatus::Degraded);
        assert_eq!(reports[0].handler_failures.len(), 1);
        assert!(reports[0].handler_failures[0].starts_with("flaky:"));
        // The failure does not stop the handler after it.
        assert!(conn.commands().contains(&"steady cmd".to_string()));
        assert!(!reports[0].status.is_converged());
    }

    #[tokio::test]
    async fn test_cancel_finishes_current_step_only() {
        let token = CancellationToken::new();
        let slow_conn = Arc::new(
            Scripted::ok()
                .delayed(Duration::from_millis(20))
                .cancelling_on("slow step", token.clone()),
        );
        let idle_conn = Arc::new(Scripted::ok());
        let options = EngineOptions {
            forks: 1,
            ..fast_options()
        };
        let engine = Engine::new(options);
        let reports = engine
            .run(
                vec![
                    job(
                        "first",
                        vec![
                            notifying(cmd_step("slow step", "slow step"), &["reload"]),
                            cmd_step("after", "after"),
                        ],
                        vec![handler("reload", "reload cmd")],
                        Arc::clone(&slow_conn),
                    ),
                    job(
                        "second",
                        vec![cmd_step("s", "s cmd")],
                        vec![],
                        Arc::clone(&idle_conn),
                    ),
                ],
                token,
            )
            .await;

        let first = &reports[0];
        assert_eq!(first.status, HostStatus::Cancelled);
        // The in-flight step completed before the pipeline wound down.
        assert_eq!(first.steps[0].outcome, Outcome::Changed);
        assert_eq!(first.steps[1].outcome, Outcome::Skipped);
        assert_eq!(first.steps[1].detail.as_deref(), Some("run cancelled"));
        // Cancelled hosts do not fire handlers.
        assert!(first.fired_handlers.is_empty());
        assert!(!slow_conn.commands().contains(&"reload cmd".to_string()));

        let second = &reports[1];
        assert_eq!(second.status, HostStatus::Cancelled);
        assert_eq!(second.steps[0].outcome, Outcome::Skipped);
        assert!(idle_conn.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fails_step() {
        let conn = Arc::new(Scripted::ok().delayed(Duration::from_secs(120)));
        let options = EngineOptions {
            action_timeout: Duration::from_secs(60),
            ..fast_options()
        };
        let engine = Engine::new(options);
        let reports = engine
            .run(
                vec![job(
                    "h1",
                    vec![cmd_step("hangs", "hang"), cmd_step("never", "never")],
                    vec![],
                    Arc::clone(&conn),
                )],
                CancellationToken::new(),
            )
            .await;
        assert_eq!(reports[0].status, HostStatus::Failed);
        assert_eq!(reports[0].steps[0].outcome, Outcome::Failed);
        assert!(reports[0].steps[0]
            .detail
            .as_deref()
            .unwrap()
            .contains("timed out: 60s"));
        assert_eq!(reports[0].steps[1].outcome, Outcome::Skipped);
    }

    #[tokio::test]
    async fn test_check_mode_probes_without_applying() {
        let step = PlannedStep {
            name: "provision".to_string(),
            action: ActionSpec::Command(CommandSpec {
                cmd: "apply thing".to_string(),
                creates: Some("/etc/thing".to_string()),
            }),
            applicable: true,
            notify: vec!["reload".to_string()],
            payload: None,
        };
        let conn = Arc::new(Scripted::ok().with("test -e /etc/thing", exec(1, "", "")));
        let options = EngineOptions {
            check: true,
            ..fast_options()
        };
        let engine = Engine::new(options);
        let reports = engine
            .run(
                vec![job(
                    "h1",
                    vec![step],
                    vec![handler("reload", "reload cmd")],
                    Arc::clone(&conn),
                )],
                CancellationToken::new(),
            )
            .await;

        assert_eq!(reports[0].status, HostStatus::Changed);
        assert_eq!(reports[0].steps[0].outcome, Outcome::Changed);
        assert!(reports[0].steps[0].detail.as_deref().unwrap().contains("would"));
        // The probe ran, the apply and the handler did not.
        let commands = conn.commands();
        assert!(commands.contains(&"test -e /etc/thing".to_string()));
        assert!(!commands.contains(&"apply thing".to_string()));
        assert!(!commands.contains(&"reload cmd".to_string()));
        // Check mode still reports which handlers would fire.
        assert_eq!(reports[0].fired_handlers, vec!["reload".to_string()]);
    }

    #[tokio::test]
    async fn test_forks_bound_concurrency() {
        let conn = Arc::new(Scripted::ok().delayed(Duration::from_millis(30)));
        let jobs: Vec<HostJob> = (0..4)
            .map(|i| {
                job(
                    &format!("h{i}"),
                    vec![cmd_step("ping", &format!("ping {i}"))],
                    vec![],
                    Arc::clone(&conn),
                )
            })
            .collect();
        let options = EngineOptions {
            forks: 2,
            ..fast_options()
        };
        let engine = Engine::new(options);
        let reports = engine.run(jobs, CancellationToken::new()).await;
        assert_eq!(reports.len(), 4);
        assert!(reports.iter().all(|r| r.status == HostStatus::Changed));
        assert!(conn.max_active.load(Ordering::SeqCst) <= 2);
        assert_eq!(conn.commands().len(), 4);
    }

    #[tokio::test]
    async fn test_reports_keep_job_order() {
        let slow = Arc::new(Scripted::ok().delayed(Duration::from_millis(50)));
        let fast = Arc::new(Scripted::ok());
        let engine = Engine::new(fast_options());
        let reports = engine
            .run(
                vec![
                    job("tortoise", vec![cmd_step("s", "a")], vec![], slow),
                    job("hare", vec![cmd_step("s", "b")], vec![], fast),
                ],
                CancellationToken::new(),
            )
            .await;
        assert_eq!(reports[0].host, "tortoise");
        assert_eq!(reports[1].host, "hare");
    }
}
