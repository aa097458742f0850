//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.freq/config.json`) and environment.
//! The API key can be kept out of the file entirely via FREQUENCY_API_KEY.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Frequency platform connection and identity.
    #[serde(default)]
    pub frequency: FrequencyConfig,

    /// Poll transport settings.
    #[serde(default)]
    pub poll: PollConfig,

    /// Agent-to-agent HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Platform base URL and agent identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrequencyConfig {
    /// Platform base URL (default "https://api.frequency.chat").
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Frequency (channel/tenant) this agent belongs to.
    #[serde(default)]
    pub frequency_id: String,

    /// This agent's id within the frequency.
    #[serde(default)]
    pub agent_id: String,

    /// API key for the frequency. Overridden by FREQUENCY_API_KEY env when set.
    pub api_key: Option<String>,
}

fn default_base_url() -> String {
    "https://api.frequency.chat".to_string()
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            frequency_id: String::new(),
            agent_id: String::new(),
            api_key: None,
        }
    }
}

/// Poll transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollConfig {
    /// Poll interval in milliseconds (default 2000).
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Agent-to-agent server bind and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for the a2a HTTP server (default 8790).
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_server_bind")]
    pub bind: String,
}

fn default_server_port() -> u16 {
    8790
}

fn default_server_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            bind: default_server_bind(),
        }
    }
}

/// Static agent identity: base URL and credentials for every outbound request,
/// and the expected bearer key for inbound routes. Fixed at construction.
#[derive(Debug, Clone)]
pub struct Identity {
    pub api_key: String,
    pub frequency_id: String,
    pub agent_id: String,
    pub base_url: String,
}

impl Identity {
    /// Build the identity from config and environment. Fails when the API key,
    /// frequency id, or agent id is missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = resolve_api_key(config)
            .context("no api key (set frequency.apiKey or FREQUENCY_API_KEY)")?;
        let frequency_id = config.frequency.frequency_id.trim().to_string();
        if frequency_id.is_empty() {
            anyhow::bail!("no frequency id (set frequency.frequencyId)");
        }
        let agent_id = config.frequency.agent_id.trim().to_string();
        if agent_id.is_empty() {
            anyhow::bail!("no agent id (set frequency.agentId)");
        }
        Ok(Self {
            api_key,
            frequency_id,
            agent_id,
            base_url: config.frequency.base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Resolve the API key: env FREQUENCY_API_KEY overrides config.
pub fn resolve_api_key(config: &Config) -> Option<String> {
    std::env::var("FREQUENCY_API_KEY")
        .ok()
        .and_then(|s| {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        })
        .or_else(|| {
            config
                .frequency
                .api_key
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("FREQ_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".freq").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or FREQ_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Write a default config file (creating parent directories). Fails if the file
/// already exists so existing credentials are never overwritten.
pub fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("config already exists at {}", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let s = serde_json::to_string_pretty(&Config::default())?;
    std::fs::write(path, s).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.poll.interval_ms, 2000);
        assert_eq!(c.server.port, 8790);
        assert_eq!(c.server.bind, "127.0.0.1");
        assert_eq!(c.frequency.base_url, "https://api.frequency.chat");
    }

    #[test]
    fn identity_requires_key_and_ids() {
        let config = Config::default();
        assert!(Identity::from_config(&config).is_err());
    }

    #[test]
    fn identity_from_full_config() {
        let mut config = Config::default();
        config.frequency.api_key = Some("k1".to_string());
        config.frequency.frequency_id = "freq-1".to_string();
        config.frequency.agent_id = "agent-1".to_string();
        config.frequency.base_url = "https://example.test/".to_string();
        let id = Identity::from_config(&config).unwrap();
        assert_eq!(id.api_key, "k1");
        // Trailing slash is normalized away so URL building stays simple.
        assert_eq!(id.base_url, "https://example.test");
    }

    #[test]
    fn config_parses_camel_case() {
        let raw = r#"{"frequency":{"baseUrl":"http://x","frequencyId":"f","agentId":"a","apiKey":"k"},"poll":{"intervalMs":500}}"#;
        let c: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(c.frequency.frequency_id, "f");
        assert_eq!(c.poll.interval_ms, 500);
    }
}
