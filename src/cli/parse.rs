//! CLI parse: clap types for prebake. No behavior; definitions only.

use crate::types::Profile;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Prebake CLI - build-time optimization of service discovery and startup configuration
#[derive(Parser)]
#[command(name = "prebake")]
#[command(about = "Precomputes service discovery and startup configuration at build time")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run every enabled optimization module against an application manifest
    Run {
        /// Application manifest (JSON or TOML)
        #[arg(long)]
        application: PathBuf,
        /// Output directory for sources, resources, and logs
        #[arg(long)]
        output: PathBuf,
        /// Configuration file path
        #[arg(long)]
        config: Option<PathBuf>,
        /// Namespace of generated units (overrides generated.package)
        #[arg(long)]
        package: Option<String>,
        /// Target runtime (overrides the runtime key)
        #[arg(long)]
        runtime: Option<Profile>,
    },
    /// List the modules applicable to a runtime, in execution order
    Modules {
        /// Target runtime
        #[arg(long, default_value = "jit")]
        runtime: Profile,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Write a sample configuration file for a runtime
    ExportConfig {
        /// Target runtime
        #[arg(long)]
        runtime: Profile,
        /// Destination file
        #[arg(long)]
        file: PathBuf,
    },
}

impl Commands {
    /// Configuration file named on the command line, if any.
    pub fn config_path(&self) -> Option<&PathBuf> {
        match self {
            Commands::Run { config, .. } => config.as_ref(),
            _ => None,
        }
    }
}
