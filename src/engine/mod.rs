//! Run engine for drover
//!
//! The engine takes per-host plans and drives them:
//! 1. Scheduling - host pipelines under a bounded worker pool
//! 2. Executing - sequential steps per host, fail-fast, deadlines
//! 3. Reporting - per-step outcomes rolled up per host and per run

pub mod executor;
pub mod report;

pub use executor::{Engine, EngineOptions, HostJob, NoProgress, Progress};
pub use report::{HostReport, HostStatus, Outcome, RunReport, StepReport};
