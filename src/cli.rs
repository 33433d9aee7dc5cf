use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "drover")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Drive a fleet of hosts through declarative runbooks", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a runbook against inventory hosts
    Run(RunArgs),

    /// List inventory hosts and their connection settings
    Hosts(HostsArgs),

    /// Validate a runbook and build every plan without connecting
    Validate(ValidateArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Run
// ============================================================================

#[derive(Parser)]
pub struct RunArgs {
    /// Runbook file (YAML)
    pub runbook: PathBuf,

    /// Inventory file (INI); falls back to the config default
    #[arg(short, long)]
    pub inventory: Option<PathBuf>,

    /// Group or host name to target
    #[arg(short, long, default_value = "all")]
    pub limit: String,

    /// Maximum concurrent hosts
    #[arg(short, long)]
    pub forks: Option<usize>,

    /// Per-action deadline in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Probe only - report what would change without applying
    #[arg(long)]
    pub check: bool,

    /// Prompt for the privilege-escalation password
    #[arg(long)]
    pub ask_become_pass: bool,

    /// Write the full run report as JSON
    #[arg(long, value_name = "PATH")]
    pub report_json: Option<PathBuf>,
}

// ============================================================================
// Hosts
// ============================================================================

#[derive(Parser)]
pub struct HostsArgs {
    /// Inventory file (INI); falls back to the config default
    #[arg(short, long)]
    pub inventory: Option<PathBuf>,

    /// Group or host name to show
    #[arg(short, long, default_value = "all")]
    pub limit: String,

    /// Emit JSON instead of a listing
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// Validate
// ============================================================================

#[derive(Parser)]
pub struct ValidateArgs {
    /// Runbook file (YAML)
    pub runbook: PathBuf,

    /// Inventory file (INI); falls back to the config default
    #[arg(short, long)]
    pub inventory: Option<PathBuf>,

    /// Group or host name to plan for
    #[arg(short, long, default_value = "all")]
    pub limit: String,
}
