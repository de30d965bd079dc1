use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;

#[derive(Debug, Clone)]
pub struct FrontendConfig {
    pub api_url: String,
    pub socket_url: String,
    pub token_path: Option<PathBuf>,
    pub http_timeout: Duration,
    pub notice_ttl: Duration,
    /// First real-time reconnect delay. Later attempts back off up to five
    /// times this.
    pub reconnect_delay: Duration,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:5000/api".to_string(),
            socket_url: "http://localhost:5000".to_string(),
            token_path: default_token_path(),
            http_timeout: Duration::from_secs(15),
            notice_ttl: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

impl FrontendConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let api_url = env::var("ROADMAP_API_URL")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .unwrap_or(defaults.api_url);
        let socket_url = env::var("ROADMAP_SOCKET_URL")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .unwrap_or(defaults.socket_url);
        let token_path = env::var("ROADMAP_TOKEN_PATH")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from)
            .or(defaults.token_path);
        let http_timeout = env::var("ROADMAP_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.http_timeout);
        let notice_ttl = env::var("ROADMAP_NOTICE_TTL_SECS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.notice_ttl);
        let reconnect_delay = env::var("ROADMAP_RECONNECT_DELAY_MS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.reconnect_delay);

        Ok(Self {
            api_url: sanitize_base_url(api_url).context("invalid ROADMAP_API_URL")?,
            socket_url: sanitize_base_url(socket_url).context("invalid ROADMAP_SOCKET_URL")?,
            token_path,
            http_timeout,
            notice_ttl,
            reconnect_delay,
        })
    }

    /// Config that never touches disk. Used by tests and the smoke tool.
    pub fn ephemeral(api_url: impl Into<String>, socket_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            api_url: sanitize_base_url(api_url.into())?,
            socket_url: sanitize_base_url(socket_url.into())?,
            token_path: None,
            ..Self::default()
        })
    }
}

fn default_token_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".roadmap").join("auth_token"))
}

pub fn sanitize_base_url(mut base: String) -> Result<String> {
    base = base.trim().to_string();
    if !base.contains("://") {
        base = format!("http://{base}");
    }
    // Remove trailing slash for consistency
    while base.ends_with('/') {
        base.pop();
    }
    // Validate once
    let _ = Url::parse(&base).context("invalid base URL")?;
    Ok(base)
}
