//! CLI command definitions
//!
//! Defines the clap commands for the apicase CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::engine::RunMode;

/// Connection settings that override the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Configuration file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the API under test
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Login used for authentication
    #[arg(long, global = true)]
    pub login: Option<String>,

    /// Password used for authentication
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Show request/response details and debug logs
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a suite of test cases from a suite file
    Run {
        /// Path to the YAML suite file
        file: PathBuf,

        /// Suite to run (default: first suite in the file)
        #[arg(long)]
        suite: Option<u64>,

        /// auto: run continuously, step: advance on Enter
        #[arg(long, default_value = "auto")]
        mode: RunMode,

        /// Run only this case
        #[arg(long)]
        case: Option<u64>,

        /// Print results as JSON instead of the live report
        #[arg(long)]
        json: bool,
    },

    /// List suites and their cases in execution order
    #[command(alias = "ls")]
    List {
        /// Path to the YAML suite file
        file: PathBuf,

        /// Only list this suite
        #[arg(long)]
        suite: Option<u64>,
    },

    /// Delete a test case from a suite file
    #[command(alias = "rm")]
    Delete {
        /// Path to the YAML suite file
        file: PathBuf,

        /// Case ID to delete
        case_id: u64,
    },

    /// Authenticate and report the session user
    Login,

    /// Show the configuration file in use
    Config,
}
