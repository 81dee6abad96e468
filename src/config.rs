use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

use crate::error::ConfigError;

/// Thin CLI wrapper: every binary accepts exactly one flag, the path to its
/// JSON config file, with an env fallback in the style of the teacher's
/// `#[arg(long, env = ...)]` fields.
#[derive(Parser, Debug, Clone)]
#[command(name = "rpc-relay", about = "Two-stage JSON-RPC 2.0 relay")]
pub struct Cli {
    #[arg(long = "configPath", env = "RPC_RELAY_CONFIG_PATH")]
    pub config_path: PathBuf,
}

/// `upstream.enabledRpcModules`: module name to its list of permitted
/// methods. The method list is parsed and preserved but, per spec, not
/// enforced — only module membership gates a request.
pub type EnabledRpcModules = HashMap<String, Vec<String>>;

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    pub host: String,
    pub port: u16,
    #[serde(rename = "rpcEndpointPath")]
    pub rpc_endpoint_path: String,
    #[serde(rename = "tlsEnabled")]
    pub tls_enabled: bool,
    #[serde(rename = "enabledRpcModules")]
    pub enabled_rpc_modules: EnabledRpcModules,
}

impl UpstreamConfig {
    pub fn base_url(&self) -> String {
        let scheme = if self.tls_enabled { "https" } else { "http" };
        format!("{scheme}://{}:{}{}", self.host, self.port, self.rpc_endpoint_path)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngressConfig {
    pub host: String,
    pub port: u16,
    #[serde(rename = "refreshCachedRequestThreshold")]
    pub refresh_cached_request_threshold_secs: u64,
    #[serde(rename = "expireCachedRequestThreshold")]
    pub expire_cached_request_threshold_secs: u64,
    #[serde(rename = "natsCallWaitTimeout")]
    pub nats_call_wait_timeout_secs: u64,
    #[serde(rename = "invalidateCacheLoopSleepPeriod")]
    pub invalidate_cache_loop_sleep_period_secs: u64,
}

impl IngressConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EgressConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    #[serde(rename = "serverURL")]
    pub server_url: String,
    #[serde(rename = "subjectName")]
    pub subject_name: String,
    #[serde(rename = "queueName")]
    pub queue_name: String,
}

/// Full hierarchical config document, loaded from a single JSON file at
/// startup. Unlike the teacher's flat, CLI-only `Config`, every field here
/// comes from the config file; the CLI only names the file's path (see
/// [`Cli`]).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub ingress: IngressConfig,
    pub egress: EgressConfig,
    pub bus: BusConfig,
}

impl Config {
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        let config: Config = serde_json::from_str(&text)?;
        Ok(config)
    }
}
