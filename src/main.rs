use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use echoprobe::config::LogFormat;
use echoprobe::shutdown::{shutdown_channel, wait_for_signal};
use echoprobe::{AppState, Server, ServerConfig, Uptime, app};

#[tokio::main]
async fn main() -> Result<(), echoprobe::Error> {
    // Probe windows are measured from here.
    let uptime = Uptime::start();

    let config = ServerConfig::parse();
    init_tracing(config.log_format);

    info!(
        listen_address = %config.listen_address,
        app_ttl_secs = config.liveness_window_secs,
        readiness_delay_secs = config.readiness_delay_secs,
        shutdown_timeout_secs = config.shutdown_timeout_secs,
        "echoprobe v{} starting",
        env!("CARGO_PKG_VERSION"),
    );

    let state = Arc::new(AppState::from_config(&config, uptime)?);
    info!(hostname = %state.identity.hostname, "worker identity resolved");

    let server = Server::bind(&config.bind_address())
        .await
        .inspect_err(|e| error!(error = %e, "startup failed"))?
        .read_timeout(config.read_timeout())
        .write_timeout(config.write_timeout())
        .shutdown_timeout(config.shutdown_timeout());

    let (controller, signal) = shutdown_channel();
    let serving = tokio::spawn(server.serve(app::router(state), signal.recv()));

    wait_for_signal().await;
    controller.shutdown();

    match serving.await {
        Ok(Ok(())) => info!("shutting down"),
        Ok(Err(e)) => error!(error = %e, "server error"),
        Err(e) => error!(error = %e, "server task failed"),
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("echoprobe=info"));

    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
    }
}
