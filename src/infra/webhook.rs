//! reqwest-backed revalidation transport.

use async_trait::async_trait;
use reqwest::Client;

use crate::domain::RevalidationRequest;
use crate::invalidation::{DELIVERY_TIMEOUT, RevalidationTransport, TransportError};

use super::error::InfraError;

pub(crate) fn user_agent() -> &'static str {
    concat!("headwind/", env!("CARGO_PKG_VERSION"))
}

/// POSTs the revalidation body as JSON. Connection and whole-request time
/// are both capped at [`DELIVERY_TIMEOUT`].
#[derive(Clone, Debug)]
pub struct ReqwestRevalidationTransport {
    client: Client,
}

impl ReqwestRevalidationTransport {
    pub fn new() -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(user_agent())
            .connect_timeout(DELIVERY_TIMEOUT)
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .map_err(|err| InfraError::http_client(format!("failed to build webhook client: {err}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RevalidationTransport for ReqwestRevalidationTransport {
    async fn send(
        &self,
        endpoint: &str,
        request: &RevalidationRequest,
    ) -> Result<u16, TransportError> {
        let response = self
            .client
            .post(endpoint)
            .json(request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    TransportError::Timeout(DELIVERY_TIMEOUT)
                } else {
                    TransportError::Request(err.to_string())
                }
            })?;

        Ok(response.status().as_u16())
    }
}
