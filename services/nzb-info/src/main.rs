//! NZB Info CLI
//!
//! Command-line interface for the Usenet and media-manager status service.

use std::path::PathBuf;

use clap::Parser;
use nzb_info::{load_config, Config, NzbInfoBuilder};
use tracing::Level;

/// Directory holding `config.json` when `--config` is not given
const CONFIG_HOME_VAR: &str = "UC_CONFIG_HOME";

#[derive(Parser)]
#[command(name = "nzb-info")]
#[command(about = "Usenet downloader and media manager status service")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Remote UI port (overrides config file)
    #[arg(long)]
    port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,

    /// Test connectivity of every enabled application once and exit
    #[arg(long)]
    check: bool,
}

fn config_path(args: &Args) -> Option<PathBuf> {
    if let Some(path) = &args.config {
        return Some(path.clone());
    }
    let home = std::env::var_os(CONFIG_HOME_VAR)?;
    let path = PathBuf::from(home).join("config.json");
    path.exists().then_some(path)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, port={:?}, log_level={:?}, check={}",
        args.config,
        args.port,
        args.log_level,
        args.check
    );

    let mut config = if let Some(path) = config_path(&args) {
        tracing::debug!("Loading configuration from {:?}", path);
        load_config(&path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    if let Some(port) = args.port {
        config.server.port = port;
    }

    let service = NzbInfoBuilder::new(config).build().await?;

    if args.check {
        let mut failed = 0;
        for (id, result) in service.check().await {
            if !result.is_success() {
                failed += 1;
            }
            println!("{:<10} {}", id, result);
        }
        if failed > 0 {
            return Err(format!("{} application(s) failed the connectivity check", failed).into());
        }
        return Ok(());
    }

    tracing::info!("Starting nzb-info service");
    service.start().await?;

    Ok(())
}
