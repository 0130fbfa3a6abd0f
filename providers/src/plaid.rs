//! Plaid Identity Verification client.
//!
//! A session is a Link token created for the configured IDV template. Plaid
//! keys verifications by `client_user_id`, so status is read back by listing
//! the user's verifications for the template and taking the newest.

use std::time::Duration;

use async_trait::async_trait;
use idv_types::{RawProviderStatus, UserId, VerificationProvider};
use idv_verification::{ExternalSession, ProviderClient, ProviderError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{build_client, send_json};
use crate::settings::PlaidSettings;

const CLIENT_NAME: &str = "Identity Verification";

#[derive(Debug, Serialize)]
struct LinkUser<'a> {
    client_user_id: &'a str,
}

#[derive(Debug, Serialize)]
struct IdentityVerificationConfig<'a> {
    template_id: &'a str,
}

#[derive(Debug, Serialize)]
struct LinkTokenCreateRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    client_name: &'a str,
    language: &'a str,
    country_codes: [&'a str; 1],
    user: LinkUser<'a>,
    products: [&'a str; 1],
    identity_verification: IdentityVerificationConfig<'a>,
}

#[derive(Debug, Deserialize)]
struct LinkTokenCreateResponse {
    link_token: String,
}

#[derive(Debug, Serialize)]
struct IdentityVerificationListRequest<'a> {
    client_id: &'a str,
    secret: &'a str,
    template_id: &'a str,
    client_user_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct IdentityVerification {
    status: String,
    /// RFC 3339, so lexical order is chronological.
    #[serde(default)]
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct IdentityVerificationListResponse {
    #[serde(default)]
    identity_verifications: Vec<IdentityVerification>,
}

/// Plaid API client.
#[derive(Clone)]
pub struct PlaidClient {
    settings: PlaidSettings,
    base_url: String,
    http: Client,
}

impl PlaidClient {
    pub fn new(settings: PlaidSettings, timeout: Duration) -> Result<Self, ProviderError> {
        let base_url = settings.endpoint().trim_end_matches('/').to_string();
        Ok(Self {
            settings,
            base_url,
            http: build_client(timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl ProviderClient for PlaidClient {
    fn provider(&self) -> VerificationProvider {
        VerificationProvider::Plaid
    }

    async fn create_session(&self, user: &UserId) -> Result<ExternalSession, ProviderError> {
        let body = LinkTokenCreateRequest {
            client_id: &self.settings.client_id,
            secret: &self.settings.secret,
            client_name: CLIENT_NAME,
            language: "en",
            country_codes: ["US"],
            user: LinkUser {
                client_user_id: user.as_str(),
            },
            products: ["identity_verification"],
            identity_verification: IdentityVerificationConfig {
                template_id: &self.settings.template_id,
            },
        };
        let response: LinkTokenCreateResponse =
            send_json(self.http.post(self.url("/link/token/create")).json(&body)).await?;

        if response.link_token.is_empty() {
            return Err(ProviderError::InvalidResponse("empty link_token".into()));
        }
        debug!(%user, "plaid link token created");
        Ok(ExternalSession {
            external_session_id: response.link_token,
        })
    }

    async fn fetch_status(
        &self,
        user: &UserId,
        _external_session_id: &str,
    ) -> Result<Option<RawProviderStatus>, ProviderError> {
        let body = IdentityVerificationListRequest {
            client_id: &self.settings.client_id,
            secret: &self.settings.secret,
            template_id: &self.settings.template_id,
            client_user_id: user.as_str(),
        };
        let response: IdentityVerificationListResponse =
            send_json(self.http.post(self.url("/identity_verification/list")).json(&body)).await?;

        Ok(response
            .identity_verifications
            .into_iter()
            .max_by(|a, b| a.created_at.cmp(&b.created_at))
            .map(|v| RawProviderStatus::new(v.status)))
    }
}
