//! # inventory
//!
//! Host inventory for drover fleet provisioning.
//!
//! This crate provides functionality for:
//! - Parsing INI-style inventory files into groups and hosts
//! - Modeling connection metadata (address, port, transport, credentials)
//! - Classifying hosts by OS family for plan filtering
//! - Resolving group selections, including the implicit `all` group
//!
//! ## Example
//!
//! ```
//! use inventory::Inventory;
//!
//! let inv = Inventory::parse(
//!     "[web]\n\
//!      ubuntu1 address=10.1.0.11 os_family=debian\n\
//!      centos1 address=10.1.0.12 os_family=rhel\n",
//! )
//! .expect("valid inventory");
//!
//! let web = inv.hosts_in("web").expect("group exists");
//! assert_eq!(web.len(), 2);
//! assert_eq!(web[0].ssh_target(), "10.1.0.11");
//! ```
//!
//! Group-level defaults live in `[group:vars]` sections and apply to
//! every host of the group; a key set on the host line wins.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod parser;
pub mod types;

pub use error::{Error, Result};
pub use parser::Inventory;
pub use types::{ConnectionKind, Group, Host, OsFamily};
