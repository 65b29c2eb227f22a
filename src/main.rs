use anyhow::{ensure, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use marksync::common::config::{apply_overrides, load_config, ConfigOverrides};
use marksync::ui::tui::run_browser;

#[derive(Parser)]
#[command(name = "marksync")]
#[command(about = "Mark directory entries and upload them with rsync")]
struct Cli {
    /// Directory to browse (defaults to the current directory)
    dir: Option<PathBuf>,

    /// Override the configured destination, e.g. user@host:/srv/inbox/
    #[arg(long)]
    destination: Option<String>,
}

fn init_tracing() {
    // Opt-in: the TUI owns the terminal, so logs only flow when the user
    // asks for them (MARKSYNC_LOG=debug 2>marksync.log).
    if let Ok(filter) = EnvFilter::try_from_env("MARKSYNC_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config()?;
    let config = apply_overrides(
        config,
        &ConfigOverrides {
            destination: cli.destination,
        },
    );

    let dir = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    ensure!(dir.is_dir(), "Not a directory: {}", dir.display());

    run_browser(config, dir).await
}
