//! Client configuration
//!
//! Layered: built-in defaults, then `~/.agentdeck/config.toml`, then
//! `AGENTDECK_*` environment variables. The CLI layers its flags on top.

use serde::Deserialize;

use crate::error::ClientError;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base HTTP URL of the session backend.
    pub server_url: String,
    /// API key sent as `X-API-Key` (HTTP) / `api_key` query param (WS).
    pub api_key: Option<String>,
    /// Keepalive probe interval on the primary transport, seconds.
    pub ping_interval_secs: u64,
    /// How long to wait for the probe's answer before declaring the
    /// connection dead, seconds.
    pub pong_timeout_secs: u64,
    /// First reconnect delay, milliseconds. Doubles per failure.
    pub reconnect_base_ms: u64,
    /// Reconnect delay cap, milliseconds.
    pub reconnect_cap_ms: u64,
    /// Consecutive failures before permanently switching to the
    /// fallback stream.
    pub fallback_threshold: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            api_key: None,
            ping_interval_secs: 30,
            pong_timeout_secs: 10,
            reconnect_base_ms: 1_000,
            reconnect_cap_ms: 30_000,
            fallback_threshold: 5,
        }
    }
}

impl ClientConfig {
    /// Load config file (if present) and apply environment overrides.
    pub fn load() -> Result<Self, ClientError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(&path)
                    .map_err(|e| ClientError::Config(format!("read {}: {e}", path.display())))?;
                toml::from_str(&text)
                    .map_err(|e| ClientError::Config(format!("parse {}: {e}", path.display())))?
            }
            _ => Self::default(),
        };

        if let Ok(url) = std::env::var("AGENTDECK_SERVER_URL") {
            config.server_url = url;
        }
        if let Ok(key) = std::env::var("AGENTDECK_API_KEY") {
            config.api_key = Some(key);
        }

        Ok(config)
    }

    fn config_path() -> Option<std::path::PathBuf> {
        dirs::home_dir().map(|home| home.join(".agentdeck").join("config.toml"))
    }

    /// WebSocket URL for a session's primary stream.
    pub fn ws_url(&self, session_id: &str) -> String {
        let base = self.server_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            format!("ws://{base}")
        };
        let mut url = format!("{ws_base}/ws/sessions/{}", urlencoding::encode(session_id));
        if let Some(key) = &self.api_key {
            url.push_str(&format!("?api_key={}", urlencoding::encode(key)));
        }
        url
    }

    /// SSE URL for a session's fallback stream.
    pub fn sse_url(&self, session_id: &str) -> String {
        format!(
            "{}/api/sessions/{}/stream",
            self.server_url.trim_end_matches('/'),
            urlencoding::encode(session_id)
        )
    }

    /// REST URL for one session.
    pub fn session_url(&self, session_id: &str) -> String {
        format!(
            "{}/api/sessions/{}",
            self.server_url.trim_end_matches('/'),
            urlencoding::encode(session_id)
        )
    }
}
