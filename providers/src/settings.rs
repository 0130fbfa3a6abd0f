//! Provider credentials and endpoints, as read from the service config.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Plaid API environment. Each has its own host and credentials.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaidEnvironment {
    #[default]
    Sandbox,
    Development,
    Production,
}

impl PlaidEnvironment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.plaid.com",
            Self::Development => "https://development.plaid.com",
            Self::Production => "https://production.plaid.com",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox => "sandbox",
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for PlaidEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaidEnvironment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            other => Err(format!("unknown Plaid environment: {other}")),
        }
    }
}

/// `[plaid]` section of the service config.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaidSettings {
    pub client_id: String,
    pub secret: String,
    pub environment: PlaidEnvironment,
    /// Identity Verification template the Link session runs.
    pub template_id: String,
    /// Overrides the environment host (tests, proxies).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl PlaidSettings {
    /// All credentials needed to call Plaid are present.
    pub fn is_complete(&self) -> bool {
        !self.client_id.is_empty() && !self.secret.is_empty() && !self.template_id.is_empty()
    }

    pub fn endpoint(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| self.environment.base_url().to_string())
    }
}

/// `[persona]` section of the service config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaSettings {
    pub api_key: String,
    pub template_id: String,
    pub base_url: String,
}

impl Default for PersonaSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            template_id: String::new(),
            base_url: default_persona_base_url(),
        }
    }
}

fn default_persona_base_url() -> String {
    "https://withpersona.com".to_string()
}

impl PersonaSettings {
    pub fn is_complete(&self) -> bool {
        !self.api_key.is_empty() && !self.template_id.is_empty()
    }
}
