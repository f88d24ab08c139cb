use commandd::command::FactoryRegistry;
use commandd::config::Config;
use commandd::process::SystemProcessRunner;
use commandd::processor::CommandProcessor;
use commandd::transport::TcpReplyTransport;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = Arc::new(Config::from_env());
    info!("commandd starting on {}", config.listen_addr);

    let mut transport = match TcpReplyTransport::bind(&config.listen_addr).await {
        Ok(transport) => transport,
        Err(err) => {
            error!("cannot bind command channel: {err:#}");
            std::process::exit(1);
        }
    };

    let processor = CommandProcessor::new(
        config,
        Arc::new(SystemProcessRunner),
        FactoryRegistry::with_defaults(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(err) => {
                error!("cannot install SIGTERM handler: {err}");
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => info!("SIGTERM received"),
            _ = tokio::signal::ctrl_c() => info!("interrupt received"),
        }
        let _ = shutdown_tx.send(true);
    });

    if let Err(err) = processor.run(&mut transport, shutdown_rx).await {
        error!("command processor failed: {err:#}");
        std::process::exit(1);
    }
    info!("commandd stopped");
}
