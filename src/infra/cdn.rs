//! HTTP CDN purge integration.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url, header::AUTHORIZATION};
use tracing::debug;

use crate::config::CdnSettings;
use crate::domain::CdnPurgeRequest;
use crate::invalidation::{CdnIntegration, PurgeError};

use super::error::InfraError;
use super::webhook::user_agent;

const PURGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Full-domain purge through a CDN HTTP API: `POST {purge_url}` with
/// `{"purge_everything": true}` and an optional bearer token.
#[derive(Clone, Debug)]
pub struct HttpCdnIntegration {
    client: Client,
    purge_url: Url,
    api_token: Option<String>,
    enabled: bool,
}

impl HttpCdnIntegration {
    pub fn new(purge_url: Url, api_token: Option<String>, enabled: bool) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(PURGE_TIMEOUT)
            .build()
            .map_err(|err| InfraError::http_client(format!("failed to build CDN client: {err}")))?;
        Ok(Self {
            client,
            purge_url,
            api_token,
            enabled,
        })
    }

    /// `None` when no purge URL is configured.
    pub fn from_settings(settings: &CdnSettings) -> Result<Option<Self>, InfraError> {
        let Some(purge_url) = settings.purge_url.clone() else {
            return Ok(None);
        };
        Self::new(purge_url, settings.api_token.clone(), settings.enabled).map(Some)
    }
}

#[async_trait]
impl CdnIntegration for HttpCdnIntegration {
    fn purge_enabled(&self) -> bool {
        self.enabled
    }

    async fn purge_everything(&self) -> Result<(), PurgeError> {
        let mut request = self
            .client
            .post(self.purge_url.clone())
            .json(&CdnPurgeRequest {
                purge_everything: true,
            });
        if let Some(token) = self.api_token.as_deref() {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request
            .send()
            .await
            .map_err(|err| PurgeError::Request(err.to_string()))?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %self.purge_url, "CDN purge response");

        if status.is_success() {
            Ok(())
        } else {
            Err(PurgeError::Rejected(status.as_u16()))
        }
    }
}
