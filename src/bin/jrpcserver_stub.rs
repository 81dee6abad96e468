use clap::Parser;
use rpc_relay::config::{Cli, Config};
use rpc_relay::stub;
use tracing::{error, info};

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

    let addr = format!("{}:{}", config.upstream.host, config.upstream.port);
    let app = stub::router(&config.upstream.rpc_endpoint_path);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "failed to bind jrpcserver-stub listener");
            std::process::exit(1);
        }
    };

    info!(addr = %addr, path = %config.upstream.rpc_endpoint_path, "jrpcserver-stub listening");
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
    {
        error!(error = %e, "jrpcserver-stub server error");
    }
}
