//! Service configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use idv_providers::{PersonaSettings, PlaidSettings};
use idv_types::VerificationParams;

use crate::RpcError;

/// Configuration for the verification service.
///
/// Can be loaded from a TOML file via [`ServiceConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Provider secrets are normally
/// left out of the file and supplied through the environment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// How long a started session blocks another start for the same user.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,

    /// Upper bound on a single provider API call.
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Origins allowed to call the API from a browser. `["*"]` allows any.
    #[serde(default = "default_cors_allowed_origins")]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub plaid: PlaidSettings,

    #[serde(default)]
    pub persona: PersonaSettings,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_port() -> u16 {
    7090
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./idv_data")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_session_ttl_secs() -> u64 {
    VerificationParams::defaults().session_ttl_secs
}

fn default_provider_timeout_secs() -> u64 {
    VerificationParams::defaults().provider_timeout_secs
}

fn default_cors_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ServiceConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, RpcError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| RpcError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, RpcError> {
        toml::from_str(s).map_err(|e| RpcError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, RpcError> {
        toml::to_string_pretty(self).map_err(|e| RpcError::Config(e.to_string()))
    }

    /// Controller parameters, validated.
    pub fn params(&self) -> Result<VerificationParams, RpcError> {
        let params = VerificationParams {
            session_ttl_secs: self.session_ttl_secs,
            provider_timeout_secs: self.provider_timeout_secs,
        };
        params
            .validate()
            .map_err(|e| RpcError::Config(e.to_string()))?;
        Ok(params)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            data_dir: default_data_dir(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            session_ttl_secs: default_session_ttl_secs(),
            provider_timeout_secs: default_provider_timeout_secs(),
            cors_allowed_origins: default_cors_allowed_origins(),
            plaid: PlaidSettings::default(),
            persona: PersonaSettings::default(),
        }
    }
}
