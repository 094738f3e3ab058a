//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use durable_core::store::status;
use durable_core::{DurabilityLevel, RawError};

/// durable - run read-modify-write operations with classified retries
#[derive(Parser, Debug)]
#[command(name = "durable")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to durable.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Change a user's email address against an in-memory store
    ChangeEmail(ChangeEmailArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

// Change-email command
#[derive(Args, Debug)]
pub struct ChangeEmailArgs {
    /// Document key of the user record
    #[arg(long, default_value = "user::john")]
    pub key: String,

    /// New email address
    #[arg(long, default_value = "john.smith@example.com")]
    pub email: String,

    /// Retries allowed after the first attempt (overrides config)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Durability level for the write (overrides config)
    #[arg(long)]
    pub durability: Option<DurabilityLevel>,

    /// Overall deadline in milliseconds, 0 disables it (overrides config)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Do not seed the user record
    #[arg(long)]
    pub missing: bool,

    /// Inject a write failure; repeat to queue several in order
    #[arg(long = "fail", value_enum)]
    pub faults: Vec<FaultArg>,
}

/// Write failures that can be injected into the in-memory store
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FaultArg {
    /// Another writer changed the record first
    CasMismatch,
    /// Server temporarily unable to take the write
    TempFail,
    /// Durable write outcome unknown
    Ambiguous,
    /// Request timed out after the write was sent
    Timeout,
    /// Server does not support the durability level
    InvalidLevel,
    /// Not enough replicas reachable for the durability level
    Impossible,
    /// No replicas configured for the durability level
    NotConfigured,
    /// Client-side failure outside the known taxonomy
    Unknown,
}

impl FaultArg {
    /// The raw store error this fault produces
    pub fn to_raw_error(self, durability: DurabilityLevel) -> RawError {
        match self {
            FaultArg::CasMismatch => {
                RawError::status_with_cas(status::KEY_EEXISTS, "document changed concurrently")
            }
            FaultArg::TempFail => RawError::status(status::ETMPFAIL, "temporary failure"),
            FaultArg::Ambiguous => RawError::status(
                status::SYNC_WRITE_AMBIGUOUS,
                "durable write outcome unknown",
            ),
            FaultArg::Timeout => RawError::Timeout { elapsed_ms: 2500 },
            FaultArg::InvalidLevel => RawError::status(
                status::DURABILITY_INVALID_LEVEL,
                "durability level not supported",
            ),
            FaultArg::Impossible => RawError::status(
                status::DURABILITY_IMPOSSIBLE,
                "not enough replicas available",
            ),
            FaultArg::NotConfigured => RawError::ReplicaNotConfigured {
                requested: durability,
            },
            FaultArg::Unknown => RawError::Client("connection reset by peer".to_string()),
        }
    }
}

// Config commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show(ConfigShowArgs),
}

#[derive(Args, Debug)]
pub struct ConfigShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
