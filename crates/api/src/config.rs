use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use texgen_core::policy::{LaneMode, QueuePolicy};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the database URL and JWT secret have defaults suitable
/// for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Budget for draining background tasks on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub comfyui: ComfyUIConfig,
    /// Sequencer timing and lane sharing.
    pub queue: QueuePolicy,
}

/// Render backend settings.
#[derive(Debug, Clone)]
pub struct ComfyUIConfig {
    pub api_url: String,
    /// Path of the API-format workflow template.
    pub workflow_path: String,
    /// Callback URL written into the workflow's webhook node.
    pub webhook_url: String,
    /// Shared secret for the completion webhook. `None` disables verification.
    pub webhook_secret: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                                        |
    /// |-----------------------------|------------------------------------------------|
    /// | `HOST`                      | `0.0.0.0`                                      |
    /// | `PORT`                      | `3000`                                         |
    /// | `CORS_ORIGINS`              | `http://localhost:5173`                        |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                                           |
    /// | `SHUTDOWN_TIMEOUT_SECS`     | `30`                                           |
    /// | `COMFYUI_API_URL`           | `http://localhost:8188`                        |
    /// | `COMFYUI_WORKFLOW_PATH`     | `workflows/texture_generation.json`            |
    /// | `COMFYUI_WEBHOOK_URL`       | `http://localhost:3000/api/v1/webhook/comfyui` |
    /// | `COMFYUI_WEBHOOK_SECRET`    | unset                                          |
    /// | `QUEUE_POLL_INTERVAL_SECS`  | `10`                                           |
    /// | `QUEUE_TIMEOUT_SECS`        | `2700`                                         |
    /// | `QUEUE_INTER_ITEM_DELAY_MS` | `2000`                                         |
    /// | `QUEUE_FAILURE_DELAY_MS`    | `1000`                                         |
    /// | `QUEUE_LANE_MODE`           | `shared`                                       |
    ///
    /// # Panics
    ///
    /// Panics on malformed values or an inconsistent queue policy.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parse_env("PORT", 3000);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_env("REQUEST_TIMEOUT_SECS", 30);
        let shutdown_timeout_secs: u64 = parse_env("SHUTDOWN_TIMEOUT_SECS", 30);

        let comfyui = ComfyUIConfig {
            api_url: std::env::var("COMFYUI_API_URL")
                .unwrap_or_else(|_| texgen_comfyui::api::DEFAULT_API_URL.into()),
            workflow_path: std::env::var("COMFYUI_WORKFLOW_PATH")
                .unwrap_or_else(|_| "workflows/texture_generation.json".into()),
            webhook_url: std::env::var("COMFYUI_WEBHOOK_URL")
                .unwrap_or_else(|_| "http://localhost:3000/api/v1/webhook/comfyui".into()),
            webhook_secret: std::env::var("COMFYUI_WEBHOOK_SECRET")
                .ok()
                .filter(|s| !s.is_empty()),
        };

        let queue = QueuePolicy {
            poll_interval: Duration::from_secs(parse_env("QUEUE_POLL_INTERVAL_SECS", 10)),
            job_timeout: Duration::from_secs(parse_env("QUEUE_TIMEOUT_SECS", 2700)),
            inter_item_delay: Duration::from_millis(parse_env("QUEUE_INTER_ITEM_DELAY_MS", 2000)),
            failure_delay: Duration::from_millis(parse_env("QUEUE_FAILURE_DELAY_MS", 1000)),
            lane_mode: parse_env("QUEUE_LANE_MODE", LaneMode::Shared),
        };
        if let Err(e) = queue.validate() {
            panic!("Invalid queue policy: {e}");
        }

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            comfyui,
            queue,
        }
    }
}

/// Read and parse `key`, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}
