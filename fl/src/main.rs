use clap::Parser;
use eyre::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use flare::cli::{Cli, Command};
use flare::command::CommandSender;
use flare::config::Config;
use flare::console::{ConsoleHost, SimulatedServer, run_repl};
use flare::platform::Platform;

fn setup_logging(plugin_dir: &Path, cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = plugin_dir.join("logs");
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(log_dir.join("flare.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let plugin_dir = cli.plugin_dir();

    let config_log_level = Config::load_log_level(cli.config.as_ref(), &plugin_dir);
    setup_logging(&plugin_dir, cli.log_level.as_deref(), config_log_level.as_deref())
        .context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref(), &plugin_dir).context("Failed to load configuration")?;
    info!(plugin_dir = %plugin_dir.display(), viewer = %config.viewer_url, "Flare loaded config");

    let server = Arc::new(SimulatedServer::new(cli.tps));
    let host = Arc::new(ConsoleHost::new(plugin_dir, Handle::current(), Arc::clone(&server)));
    let console = host.console();

    let platform = Platform::with_config(host, config).context("Failed to create platform")?;
    platform.enable().context("Failed to enable platform")?;
    server.start()?;

    debug!(command = ?cli.command, "main: dispatching command");
    let result = match cli.command {
        None | Some(Command::Console) => {
            debug!("main: matched Console command");
            let (platform, runtime) = (Arc::clone(&platform), Handle::current());
            tokio::task::spawn_blocking(move || run_repl(platform, console, runtime))
                .await
                .context("Console task failed")?
        }
        Some(Command::Exec { warmup_secs, args }) => {
            debug!(warmup_secs, ?args, "main: matched Exec command");
            if warmup_secs > 0 {
                tokio::time::sleep(Duration::from_secs(warmup_secs)).await;
            }
            let sender: Arc<dyn CommandSender> = console;
            platform.dispatch(sender, args).await;
            Ok(())
        }
    };

    server.stop();
    if let Err(e) = platform.disable() {
        warn!(error = %e, "Failed to disable platform");
    }
    info!("Flare shut down");
    result
}
