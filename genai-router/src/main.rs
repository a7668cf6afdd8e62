use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use args::{Args, Command};
use clap::Parser;
use config::Config;
use server::ServeConfig;
use tokio_util::sync::CancellationToken;

mod args;
mod chat;
mod logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = Args::parse();

    logger::init(&args);

    match args.command.take() {
        Some(Command::Chat(chat)) => chat::run(chat).await,
        Some(Command::Serve) | None => serve(&args).await,
    }
}

async fn serve(args: &Args) -> anyhow::Result<()> {
    let config = args.config()?;
    let shutdown_signal = CancellationToken::new();

    tokio::spawn({
        let shutdown_signal = shutdown_signal.clone();

        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C: {e}");
                return;
            }

            log::info!("Shutdown requested, finishing in-flight requests");
            shutdown_signal.cancel();
        }
    });

    if let Err(e) = server::serve(serve_config(args, config, shutdown_signal)).await {
        log::error!("Server failed to start: {e}");
        std::process::exit(1);
    }

    Ok(())
}

fn serve_config(args: &Args, config: Config, shutdown_signal: CancellationToken) -> ServeConfig {
    let listen_address = args
        .listen_address
        .or(config.server.listen_address)
        .unwrap_or(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(127, 0, 0, 1), 8000)));

    ServeConfig {
        listen_address,
        config,
        shutdown_signal,
    }
}
