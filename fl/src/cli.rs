//! CLI definitions for the `fl` console host

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Flare - diagnostics console for a simulated game server
#[derive(Parser)]
#[command(
    name = "fl",
    about = "Diagnostics console hosting flare against a simulated game server",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Directory holding config, logs, activity and saved profiles
    #[arg(short = 'p', long = "plugin-dir", global = true)]
    pub plugin_dir: Option<PathBuf>,

    /// Target ticks per second of the simulated server
    #[arg(long, global = true, default_value_t = 20)]
    pub tps: u32,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    pub fn plugin_dir(&self) -> PathBuf {
        self.plugin_dir.clone().unwrap_or_else(default_plugin_dir)
    }
}

/// CLI subcommands
#[derive(Debug, Subcommand, PartialEq)]
pub enum Command {
    /// Interactive console (default)
    Console,

    /// Run a single command and exit
    Exec {
        /// Seconds to let the server tick before running the command
        #[arg(long, default_value_t = 0)]
        warmup_secs: u64,

        /// Command arguments, e.g. `tps` or `profiler --timeout 30`
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

/// `<data dir>/flare`
pub fn default_plugin_dir() -> PathBuf {
    dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")).join("flare")
}
