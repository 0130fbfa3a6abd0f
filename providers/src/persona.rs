//! Persona inquiries client.
//!
//! A session is an inquiry created from the configured template with the
//! user id as its reference id.

use std::time::Duration;

use async_trait::async_trait;
use idv_types::{RawProviderStatus, UserId, VerificationProvider};
use idv_verification::{ExternalSession, ProviderClient, ProviderError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{build_client, send_json};
use crate::settings::PersonaSettings;

/// Pinned API version header.
const PERSONA_VERSION: &str = "2023-01-05";

#[derive(Debug, Serialize)]
struct InquiryAttributes<'a> {
    #[serde(rename = "inquiry-template-id")]
    inquiry_template_id: &'a str,
    #[serde(rename = "reference-id")]
    reference_id: &'a str,
}

#[derive(Debug, Serialize)]
struct InquiryData<'a> {
    attributes: InquiryAttributes<'a>,
}

#[derive(Debug, Serialize)]
struct CreateInquiryRequest<'a> {
    data: InquiryData<'a>,
}

#[derive(Debug, Default, Deserialize)]
struct InquiryStatus {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Inquiry {
    id: String,
    #[serde(default)]
    attributes: InquiryStatus,
}

#[derive(Debug, Deserialize)]
struct InquiryResponse {
    data: Inquiry,
}

/// Persona API client.
#[derive(Clone)]
pub struct PersonaClient {
    settings: PersonaSettings,
    base_url: String,
    http: Client,
}

impl PersonaClient {
    pub fn new(settings: PersonaSettings, timeout: Duration) -> Result<Self, ProviderError> {
        let base_url = settings.base_url.trim_end_matches('/').to_string();
        Ok(Self {
            settings,
            base_url,
            http: build_client(timeout)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn inquiries_url(&self) -> String {
        format!("{}/api/v1/inquiries", self.base_url)
    }
}

#[async_trait]
impl ProviderClient for PersonaClient {
    fn provider(&self) -> VerificationProvider {
        VerificationProvider::Persona
    }

    async fn create_session(&self, user: &UserId) -> Result<ExternalSession, ProviderError> {
        let body = CreateInquiryRequest {
            data: InquiryData {
                attributes: InquiryAttributes {
                    inquiry_template_id: &self.settings.template_id,
                    reference_id: user.as_str(),
                },
            },
        };
        let request = self
            .http
            .post(self.inquiries_url())
            .bearer_auth(&self.settings.api_key)
            .header("Persona-Version", PERSONA_VERSION)
            .json(&body);
        let response: InquiryResponse = send_json(request).await?;

        if response.data.id.is_empty() {
            return Err(ProviderError::InvalidResponse("empty inquiry id".into()));
        }
        debug!(%user, inquiry = %response.data.id, "persona inquiry created");
        Ok(ExternalSession {
            external_session_id: response.data.id,
        })
    }

    async fn fetch_status(
        &self,
        _user: &UserId,
        external_session_id: &str,
    ) -> Result<Option<RawProviderStatus>, ProviderError> {
        let request = self
            .http
            .get(format!("{}/{external_session_id}", self.inquiries_url()))
            .bearer_auth(&self.settings.api_key)
            .header("Persona-Version", PERSONA_VERSION);
        let response: InquiryResponse = send_json(request).await?;

        Ok(response.data.attributes.status.map(RawProviderStatus::new))
    }
}
