//! peerdir registry daemon entry point

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use peerdir_registry::{Cli, Reactor};

// The reactor is a single cooperative loop; a current-thread runtime keeps
// the whole server on one thread, so table and index mutation needs no
// locking.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let limits = cli.limits();
    limits
        .validate()
        .map_err(|reason| anyhow::anyhow!(reason))
        .context("invalid limits")?;

    let addr = SocketAddr::from((cli.bind, cli.port));
    let reactor = Reactor::bind(addr, limits)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(port = cli.port, "registry starting");
    reactor.run().await.context("reactor loop failed")?;
    Ok(())
}

/// Setup logging based on verbosity level
fn setup_logging(verbose: bool) {
    let log_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();
}
