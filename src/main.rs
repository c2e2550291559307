use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use tokio::sync::Mutex;

use vpd::cli::Cli;
use vpd::config::{self, Config};
use vpd::daemon::Daemon;
use vpd::session;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install().unwrap();
    setup_tracing();

    let cli = Cli::parse();
    let config = Config::load(&cli)?;
    config::ensure_workdir(&config)?;

    let daemon = Arc::new(Mutex::new(Daemon::new(
        config.playlists_dir(),
        config.vlc_start_delay,
    )));

    let server = tokio::spawn(session::handle_clients(
        Arc::clone(&daemon),
        config.bind_to_address.clone(),
        config.port,
    ));

    wait_for_shutdown_signal().await?;
    tracing::info!("shutdown signal received, stopping");
    server.abort();

    Ok(())
}

/// Waits for `SIGINT`, `SIGTERM`, or `SIGQUIT` so the daemon can shut down
/// cleanly instead of being hard-killed.
async fn wait_for_shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

fn setup_tracing() {
    use tracing_subscriber::filter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = filter::EnvFilter::builder()
        .with_default_directive(filter::LevelFilter::INFO.into())
        .from_env_lossy();
    let fmt = fmt::layer().with_line_number(true);

    let _ignore_err = tracing_subscriber::registry()
        .with(fmt)
        .with(filter)
        .try_init();
}
