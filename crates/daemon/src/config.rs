//! Daemon configuration from `DISPATCH_*` environment variables

use anyhow::{anyhow, Context, Result};
use dispatch_api_rpc::server::{RpcServerConfig, DEFAULT_RPC_HOST, DEFAULT_RPC_PORT};
use dispatch_core::domain::queue::{
    DEFAULT_HISTORY_LIMIT, DEFAULT_MAX_ATTEMPTS, DEFAULT_MESSAGES_PER_MINUTE,
};
use dispatch_core::domain::{QueueConfig, RequeuePlacement};
use dispatch_infra_transport::WebhookConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub queue: QueueConfig,
    pub rpc: RpcServerConfig,
    /// None selects the dry-run log transport
    pub webhook: Option<WebhookConfig>,
    pub delivery_log: Option<PathBuf>,
    pub log_format: LogFormat,
    pub log_dir: Option<PathBuf>,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset and blank values take defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let requeue_placement = match get("DISPATCH_REQUEUE") {
            Some(raw) => RequeuePlacement::from_str(raw.trim())
                .map_err(|e| anyhow!("Invalid DISPATCH_REQUEUE: {}", e))?,
            None => RequeuePlacement::default(),
        };

        let send_timeout = parse_optional::<u64>(&get, "DISPATCH_SEND_TIMEOUT_MS")?
            .map(Duration::from_millis);

        let queue = QueueConfig {
            messages_per_minute: parse_or(&get, "DISPATCH_MESSAGES_PER_MINUTE", DEFAULT_MESSAGES_PER_MINUTE)?,
            default_max_attempts: parse_or(&get, "DISPATCH_MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS)?,
            requeue_placement,
            send_timeout,
            history_limit: parse_or(&get, "DISPATCH_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?,
            start_paused: false,
        };
        queue
            .validate()
            .map_err(|e| anyhow!("Invalid queue configuration: {}", e))?;

        let rpc = RpcServerConfig {
            host: get("DISPATCH_RPC_HOST").unwrap_or_else(|| DEFAULT_RPC_HOST.to_string()),
            port: parse_or(&get, "DISPATCH_RPC_PORT", DEFAULT_RPC_PORT)?,
        };

        let webhook = match get("DISPATCH_WEBHOOK_URL") {
            Some(url) => Some(WebhookConfig {
                url,
                token: get("DISPATCH_WEBHOOK_TOKEN"),
                timeout_secs: parse_or(
                    &get,
                    "DISPATCH_WEBHOOK_TIMEOUT_SECS",
                    DEFAULT_WEBHOOK_TIMEOUT_SECS,
                )?,
            }),
            None => None,
        };

        let log_format = match get("DISPATCH_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("pretty") | None => LogFormat::Pretty,
            Some(other) => return Err(anyhow!("Invalid DISPATCH_LOG_FORMAT: {}", other)),
        };

        Ok(Self {
            queue,
            rpc,
            webhook,
            delivery_log: get("DISPATCH_DELIVERY_LOG").map(expand_path),
            log_format,
            log_dir: get("DISPATCH_LOG_DIR").map(expand_path),
        })
    }
}

fn expand_path(raw: String) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&raw).into_owned())
}

fn parse_optional<T>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    get(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid {}: {:?}", key, raw))
        })
        .transpose()
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(parse_optional(get, key)?.unwrap_or(default))
}
