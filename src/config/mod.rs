pub mod registry_config;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use serde::{Deserialize, Serialize};

pub use registry_config::RegistryConfig;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "service-registry")]
#[command(about = "Inspect and plan service registration from a descriptor file")]
pub struct CliConfig {
    /// Path to the service descriptor file
    #[arg(short, long, default_value = "configs/services.toml")]
    pub config: String,

    /// Override the active platform from the config file
    #[arg(long)]
    pub platform: Option<String>,

    /// Treat the run as an editor session
    #[arg(long)]
    pub editor: bool,

    /// Show the registration plan
    #[arg(long)]
    pub dry_run: bool,

    /// Write the plan as JSON to this path
    #[arg(long)]
    pub export: Option<String>,

    /// Log process stats while planning
    #[arg(long)]
    pub monitor: bool,

    /// Emit JSON log lines instead of compact text
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}
