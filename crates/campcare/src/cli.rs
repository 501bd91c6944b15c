//! Clap derive structures for the `campcare` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// campcare -- Camping.care lookups from the command line
#[derive(Debug, Parser)]
#[command(
    name = "campcare",
    version,
    about = "Check license plates and look up Camping.care reservations",
    long_about = "Command-line host for Camping.care integrations.\n\n\
        Configure one or more instances (API key + base URL), then run\n\
        license-plate checks, reservation lookups and place listings.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Instance id or display name (required when several are configured)
    #[arg(long, short = 'i', env = "CAMPCARE_INSTANCE", global = true)]
    pub instance: Option<String>,

    /// Config file path
    #[arg(long, env = "CAMPCARE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'o', env = "CAMPCARE_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// Request timeout in seconds
    #[arg(long, env = "CAMPCARE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Accept invalid TLS certificates (self-signed proxies)
    #[arg(long, short = 'k', env = "CAMPCARE_INSECURE", global = true)]
    pub insecure: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check whether a license plate is known
    #[command(alias = "check")]
    CheckPlate(CheckPlateArgs),

    /// Find reservations attached to a license plate
    #[command(alias = "query")]
    QueryPlate(QueryPlateArgs),

    /// Fetch one reservation by id
    #[command(alias = "res")]
    Reservation(ReservationArgs),

    /// List places (pitches)
    Places(PlacesArgs),

    /// Manage configured instances
    #[command(alias = "inst")]
    Instances(InstancesArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Lookups ──────────────────────────────────────────────────────────

/// Shared flag for the fire-and-forget path.
#[derive(Debug, Args)]
pub struct NotifyArgs {
    /// Fire the lookup and print the broadcast event instead of the reply
    #[arg(long)]
    pub notify: bool,
}

#[derive(Debug, Args)]
pub struct CheckPlateArgs {
    /// License plate to check
    pub plate: String,

    #[command(flatten)]
    pub notify: NotifyArgs,
}

#[derive(Debug, Args)]
pub struct QueryPlateArgs {
    /// License plate to search for
    pub plate: String,

    /// Start of the search window (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// End of the search window (YYYY-MM-DD)
    #[arg(long)]
    pub end_date: Option<NaiveDate>,

    #[command(flatten)]
    pub notify: NotifyArgs,
}

#[derive(Debug, Args)]
pub struct ReservationArgs {
    /// Reservation id
    pub id: String,

    #[command(flatten)]
    pub notify: NotifyArgs,
}

#[derive(Debug, Args)]
pub struct PlacesArgs {
    #[command(flatten)]
    pub notify: NotifyArgs,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  INSTANCES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct InstancesArgs {
    #[command(subcommand)]
    pub command: InstancesCommand,
}

/// Where a new or replacement API key comes from.
#[derive(Debug, Args)]
pub struct KeySourceArgs {
    /// API key value
    #[arg(long, conflicts_with = "api_key_env")]
    pub api_key: Option<String>,

    /// Name of an environment variable that holds the API key
    #[arg(long)]
    pub api_key_env: Option<String>,

    /// Store the key in the system keyring instead of the config file
    #[arg(long, requires = "api_key")]
    pub keyring: bool,
}

#[derive(Debug, Subcommand)]
pub enum InstancesCommand {
    /// List configured instances
    #[command(alias = "ls")]
    List,

    /// Configure a new instance (validated against the API first)
    Add {
        /// Display name, unique across instances
        #[arg(long)]
        name: String,

        /// API root
        #[arg(long)]
        base_url: Option<String>,

        #[command(flatten)]
        key: KeySourceArgs,
    },

    /// Change an instance's name, base URL or API key
    Update {
        /// Instance id or display name
        instance: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        base_url: Option<String>,

        #[command(flatten)]
        key: KeySourceArgs,
    },

    /// Remove an instance
    #[command(alias = "rm")]
    Remove {
        /// Instance id or display name
        instance: String,
    },

    /// Test the connection of one instance (or the only one)
    Probe {
        /// Instance id or display name
        instance: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
