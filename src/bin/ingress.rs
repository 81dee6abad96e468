use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use rpc_relay::bus::{Bus, NatsBus};
use rpc_relay::cache::{sweeper, ResultCache};
use rpc_relay::config::{Cli, Config};
use rpc_relay::ingress::{router, AppState};
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

    info!(addr = %config.ingress.listen_addr(), bus = %config.bus.server_url, "starting ingress");

    let bus: Arc<dyn Bus> = match NatsBus::connect(&config.bus.server_url).await {
        Ok(bus) => Arc::new(bus),
        Err(e) => {
            error!(error = %e, "failed to connect to bus");
            std::process::exit(1);
        }
    };

    let refresh_threshold =
        Duration::from_secs(config.ingress.refresh_cached_request_threshold_secs);
    let expire_threshold = Duration::from_secs(config.ingress.expire_cached_request_threshold_secs);
    let sweep_period =
        Duration::from_secs(config.ingress.invalidate_cache_loop_sleep_period_secs);

    let cache = ResultCache::new(refresh_threshold, expire_threshold);
    let sweeper_handle = sweeper::spawn(cache.clone(), sweep_period, expire_threshold);

    let state = AppState {
        cache,
        bus: bus.clone(),
        subject_pattern: config.bus.subject_name.clone(),
        call_timeout: Duration::from_secs(config.ingress.nats_call_wait_timeout_secs),
    };

    let listener = match tokio::net::TcpListener::bind(config.ingress.listen_addr()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "failed to bind ingress listener");
            std::process::exit(1);
        }
    };

    info!(addr = %config.ingress.listen_addr(), "ingress listening");
    let serve_result =
        axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await;
    if let Err(e) = serve_result {
        error!(error = %e, "ingress server error");
    }

    info!("ingress shutting down, draining bus");
    match tokio::time::timeout(SHUTDOWN_GRACE, bus.drain()).await {
        Ok(Ok(())) => info!("bus drained"),
        Ok(Err(e)) => error!(error = %e, "bus drain failed"),
        Err(_) => {
            error!("bus drain exceeded shutdown grace window");
            std::process::exit(1);
        }
    }

    sweeper_handle.stop().await;
    info!("ingress stopped");
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
