use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rpc_relay::bus::{Bus, NatsBus};
use rpc_relay::config::{Cli, Config};
use rpc_relay::egress::{self, EgressState};
use rpc_relay::upstream::UpstreamClient;
use tracing::{error, info};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .init();

    let config = match Config::load(&cli.config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };

    info!(
        subject = %config.bus.subject_name,
        queue = %config.bus.queue_name,
        upstream = %config.upstream.base_url(),
        "starting egress"
    );

    let bus: Arc<dyn Bus> = match NatsBus::connect(&config.bus.server_url).await {
        Ok(bus) => Arc::new(bus),
        Err(e) => {
            error!(error = %e, "failed to connect to bus");
            std::process::exit(1);
        }
    };

    let upstream = match UpstreamClient::new(config.upstream.base_url()) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to build upstream client");
            std::process::exit(1);
        }
    };

    let state = EgressState { enabled_rpc_modules: config.upstream.enabled_rpc_modules, upstream };

    let subject = config.bus.subject_name.clone();
    let queue = config.bus.queue_name.clone();
    let run_bus = bus.clone();
    let run_handle = tokio::spawn(async move {
        if let Err(e) = egress::run(state, run_bus, &subject, &queue).await {
            error!(error = %e, "egress subscription loop exited with error");
        }
    });

    tokio::signal::ctrl_c().await.ok();
    info!("egress shutting down, draining bus");

    match tokio::time::timeout(SHUTDOWN_GRACE, bus.drain()).await {
        Ok(Ok(())) => info!("bus drained"),
        Ok(Err(e)) => error!(error = %e, "bus drain failed"),
        Err(_) => {
            error!("bus drain exceeded shutdown grace window");
            std::process::exit(1);
        }
    }

    if tokio::time::timeout(SHUTDOWN_GRACE, run_handle).await.is_err() {
        error!("egress subscription loop did not exit within shutdown grace window");
        std::process::exit(1);
    }

    info!("egress stopped");
}
