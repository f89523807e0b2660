#![forbid(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clipshare_lib::logging::append_error_log;
use clipshare_lib::{load_from_path, Config, MemoryClipboard, NoopImageProvider, Server};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Cross-host clipboard and file-transfer daemon")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", default_value = "clipshare.conf")]
    config: PathBuf,

    /// Working directory for inbound files (overrides the config file)
    #[arg(short, long, value_name = "DIR")]
    working_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let mut config = match load_from_path(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            error!(%err, "failed to load configuration");
            append_error_log(&std::env::current_dir().unwrap_or_default(), &err.to_string());
            std::process::exit(1);
        }
    };
    if let Some(dir) = cli.working_dir {
        config.working_dir = Some(dir);
    }

    if let Err(err) = enter_working_dir(&mut config) {
        error!(%err, "failed to enter the working directory");
        append_error_log(&std::env::current_dir().unwrap_or_default(), &err);
        std::process::exit(1);
    }

    info!(
        app_port = config.app_port,
        secure = config.secure_mode_enabled,
        udp = config.udp_server_enabled,
        "configuration loaded"
    );

    let config = Arc::new(config);
    let clipboard = Arc::new(MemoryClipboard::new());
    let images = Arc::new(NoopImageProvider);
    let server = match Server::bind(Arc::clone(&config), clipboard, images) {
        Ok(server) => server,
        Err(err) => {
            error!(%err, "failed to start listeners");
            let dir = config.working_dir.clone().or_else(|| std::env::current_dir().ok());
            append_error_log(&dir.unwrap_or_default(), &err.to_string());
            std::process::exit(1);
        }
    };

    if let Err(err) = server.run().await {
        error!(%err, "server exited with error");
        std::process::exit(1);
    }
}

/// Change into the configured working directory. When the directory resolves
/// to where the daemon already runs, the override is treated as not set so
/// the configuration-file name guard stays active.
fn enter_working_dir(config: &mut Config) -> Result<(), String> {
    let Some(dir) = config.working_dir.clone() else {
        return Ok(());
    };
    let before = std::env::current_dir().map_err(|e| e.to_string())?;
    std::env::set_current_dir(&dir)
        .map_err(|e| format!("cannot change into {}: {e}", dir.display()))?;
    let after = std::env::current_dir().map_err(|e| e.to_string())?;
    if before == after {
        config.working_dir = None;
    } else {
        config.working_dir = Some(after);
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
