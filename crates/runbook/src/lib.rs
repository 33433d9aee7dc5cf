//! # runbook
//!
//! Runbook schema and per-host plan builder for drover.
//!
//! This crate provides functionality for:
//! - Parsing YAML runbooks (ordered steps + deferred handlers)
//! - Validating structure at load time (handler references, predicates)
//! - Evaluating pure applicability predicates over host facts
//! - Building per-host execution plans with templates rendered up front
//!
//! ## Example
//!
//! ```
//! use runbook::{Runbook, build_plan};
//! use inventory::Host;
//! use std::path::Path;
//!
//! let runbook = Runbook::parse(
//!     "name: demo\n\
//!      steps:\n\
//!      \x20 - name: install curl\n\
//!      \x20   package: { name: curl }\n\
//!      \x20   when: os_family != \"windows\"\n",
//! )
//! .expect("valid runbook");
//!
//! let host = Host::new("ubuntu1".to_string(), "web".to_string());
//! let plan = build_plan(&runbook, &host, Path::new(".")).expect("plan builds");
//! assert!(plan.steps[0].applicable);
//! ```
//!
//! Plan building is the error boundary: predicate and template
//! problems surface here, for the affected host only, before any
//! remote action runs.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod plan;
pub mod predicate;
pub mod types;

pub use error::{Error, Result};
pub use plan::{Plan, PlannedStep, build_plan};
pub use types::{
    ActionSpec, CommandSpec, Handler, HttpGetSpec, PackageSpec, PackageState, Runbook,
    ServiceSpec, ServiceState, Step, UploadSpec,
};
