//! Entry point for the `metaserver` binary.

use clap::Parser;
use metaserver::{logging, Args, MetadataServer};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    let config = args.load_config()?;
    let mut server = MetadataServer::create(config)?;
    server.start()?;
    if let Some(addr) = server.local_addr() {
        tracing::info!(%addr, "listening; send SIGINT or SIGTERM to stop");
    }

    server.wait_for_shutdown_signal()?;
    server.stop()?;
    server.destroy();
    Ok(())
}
