use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{RelayError, Result};
use crate::sanitize::{DEFAULT_DENYLIST, DEFAULT_MAX_LEN};

/// Main configuration structure loaded from decision_relay.toml and environment variables
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub models: ModelsConfig,
    pub sanitizer: SanitizerConfig,
    /// Credentials, loaded from environment variables only
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// HTTP surface configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_bind: SocketAddr,
    pub templates_dir: PathBuf,
    /// Outcomes processed at once within one request; 1 keeps them sequential
    pub outcome_concurrency: usize,
    /// Tracing filter used when RUST_LOG is unset
    pub log_level: String,
}

/// Remote model endpoints. Model names themselves are fixed in `clients`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub primary_base_url: String,
    pub fallback_base_url: String,
    pub request_timeout_ms: u64,
    /// Return the raw envelope when it has no completion text instead of failing
    pub lenient_envelope: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SanitizerConfig {
    pub max_len: usize,
    pub denylist: Vec<String>,
}

/// Credentials loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub primary_api_key: String,
    pub fallback_api_key: String,
}

pub const DEFAULT_CONFIG_PATH: &str = "decision_relay.toml";

/// Log filter used when neither RUST_LOG nor `server.log_level` is set
pub const DEFAULT_LOG_FILTER: &str = "decision_relay=info,tower_http=info";

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            templates_dir: PathBuf::from("templates"),
            outcome_concurrency: 1,
            log_level: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            primary_base_url: "https://api.openai.com/v1".to_string(),
            fallback_base_url: "https://api.openai.com/v1".to_string(),
            request_timeout_ms: 60_000,
            lenient_envelope: false,
        }
    }
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            models: ModelsConfig::default(),
            sanitizer: SanitizerConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses RELAY_CONFIG or defaults to [`DEFAULT_CONFIG_PATH`].
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Same as [`Config::load`] with an explicit path taking precedence over RELAY_CONFIG.
    pub fn load_with(config_path: Option<&str>) -> Result<Self> {
        load_env();
        let requested = config_path
            .map(str::to_string)
            .or_else(|| std::env::var("RELAY_CONFIG").ok());
        match requested {
            Some(path) => Self::read_and_finish(&path, true),
            None => Self::read_and_finish(DEFAULT_CONFIG_PATH, false),
        }
    }

    /// Load from an explicit TOML path, then apply environment overrides.
    /// The file must exist and parse.
    pub fn load_from(config_path: &str) -> Result<Self> {
        Self::read_and_finish(config_path, true)
    }

    fn read_and_finish(config_path: &str, required: bool) -> Result<Self> {
        let mut config = match read_config_file(config_path, required)? {
            Some(content) => Self::from_toml_str(&content)?,
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.runtime = RuntimeConfig::load_from_env()?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("RELAY_HTTP_BIND") {
            match v.parse::<SocketAddr>() {
                Ok(bind) => self.server.http_bind = bind,
                Err(_) => tracing::warn!("Ignoring unparsable RELAY_HTTP_BIND '{}'", v),
            }
        }
        if let Ok(dir) = std::env::var("RELAY_TEMPLATES_DIR") {
            self.server.templates_dir = PathBuf::from(dir);
        }
        if let Some(n) = std::env::var("RELAY_OUTCOME_CONCURRENCY")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            self.server.outcome_concurrency = n;
        }
        if let Some(timeout) = std::env::var("RELAY_REQUEST_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.models.request_timeout_ms = timeout;
        }
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            self.models.primary_base_url = url;
        }
        if let Ok(url) = std::env::var("RELAY_FALLBACK_BASE_URL") {
            self.models.fallback_base_url = url;
        }
        if let Ok(lenient) = std::env::var("RELAY_LENIENT_ENVELOPE") {
            self.models.lenient_envelope = lenient == "1" || lenient.eq_ignore_ascii_case("true");
        }
        if let Some(max_len) = std::env::var("RELAY_SANITIZE_MAX_LEN")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
        {
            self.sanitizer.max_len = max_len;
        }
        if let Ok(list) = std::env::var("RELAY_DENYLIST") {
            self.sanitizer.denylist = parse_denylist(&list);
        }
    }

    /// Validate and clamp values that would make the service misbehave
    pub fn validate(&mut self) -> Result<()> {
        if self.server.outcome_concurrency == 0 {
            self.server.outcome_concurrency = 1;
        } else if self.server.outcome_concurrency > 16 {
            tracing::warn!(
                "outcome_concurrency {} exceeds max 16, clamping to 16",
                self.server.outcome_concurrency
            );
            self.server.outcome_concurrency = 16;
        }
        if self.sanitizer.max_len == 0 {
            return Err(RelayError::config("sanitizer max_len must be > 0"));
        }
        if self.models.request_timeout_ms == 0 {
            return Err(RelayError::config("request_timeout_ms must be > 0"));
        }
        for url in [&self.models.primary_base_url, &self.models.fallback_base_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(RelayError::config(format!(
                    "Model base URL '{}' must start with http:// or https://",
                    url
                )));
            }
        }
        Ok(())
    }
}

/// Read the config file. Only a missing file at the default location is
/// tolerated; every other read failure is a configuration error.
fn read_config_file(config_path: &str, required: bool) -> Result<Option<String>> {
    match std::fs::read_to_string(config_path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
            tracing::warn!("Config file {} not found, using defaults", config_path);
            Ok(None)
        }
        Err(e) => Err(RelayError::config(format!(
            "Cannot read config file {}: {}",
            config_path, e
        ))),
    }
}

impl RuntimeConfig {
    /// Load credentials from the environment. The primary key is mandatory.
    pub fn load_from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials from any key/value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let primary_api_key = lookup("OPENAI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| RelayError::config("OPENAI_API_KEY is not set"))?;
        let fallback_api_key = lookup("RELAY_FALLBACK_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| primary_api_key.clone());

        Ok(Self {
            primary_api_key,
            fallback_api_key,
        })
    }
}

/// Load .env files with fallbacks:
/// 1) RELAY_ENV_FILE if set
/// 2) ./.env
/// 3) ../.env when the key is still missing
///
/// Safe to call more than once; variables already set are never overwritten.
pub fn load_env() {
    if let Ok(env_path) = std::env::var("RELAY_ENV_FILE") {
        let _ = dotenvy::from_path(env_path);
    } else {
        let _ = dotenvy::from_path(".env");
        if std::env::var("OPENAI_API_KEY").is_err() {
            let _ = dotenvy::from_path("../.env");
        }
    }
}

/// Split a comma-separated phrase list, dropping blanks.
pub fn parse_denylist(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}
