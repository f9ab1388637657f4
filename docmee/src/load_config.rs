/// `load_config` module: Loads the static YAML config of the CLI and injects the API key from the environment.
///
/// The YAML file holds nothing secret: the docmee base URL and the defaults
/// used when exchanging the API key for a token. The key itself only ever
/// comes from `DOCMEE_API_KEY` (optionally via a `.env` file).
///
/// ```yaml
/// client:
///   base_url: https://docmee.cn
/// token:
///   uid: reporting-bot
///   limit: 20
/// ```
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{Context, Result};
use docmee_core::ClientConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

pub const API_KEY_ENV: &str = "DOCMEE_API_KEY";

#[derive(Debug)]
pub struct CliConfig {
    pub client: ClientConfig,
    pub token: TokenSection,
    /// From the environment; only commands that exchange a token need it.
    pub api_key: Option<String>,
}

impl CliConfig {
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .with_context(|| format!("{API_KEY_ENV} environment variable not set"))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TokenSection {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    client: ClientConfig,
    #[serde(default)]
    token: TokenSection,
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow::anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;

    // An empty file is a valid config with every default.
    let raw: RawConfig = if config_content.trim().is_empty() {
        RawConfig {
            client: ClientConfig::default(),
            token: TokenSection::default(),
        }
    } else {
        serde_yaml::from_str(&config_content).map_err(|e| {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            anyhow::anyhow!("Failed to parse config YAML: {e}")
        })?
    };
    raw.client.trace_loaded();

    Ok(CliConfig {
        client: raw.client,
        token: raw.token,
        api_key: api_key_from_env(),
    })
}

/// Configuration used when no file is given: defaults plus the env API key.
pub fn config_from_env() -> CliConfig {
    info!("No config file given, using defaults");
    CliConfig {
        client: ClientConfig::default(),
        token: TokenSection::default(),
        api_key: api_key_from_env(),
    }
}

fn api_key_from_env() -> Option<String> {
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => {
            info!("{API_KEY_ENV} found in env");
            Some(key)
        }
        _ => {
            warn!("{API_KEY_ENV} not set; token exchange will be unavailable");
            None
        }
    }
}
