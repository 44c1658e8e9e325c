pub mod fal;
pub mod placeholder;
pub mod replicate;

use crate::{
    error::Result,
    models::{ProviderResult, ProviderSpec},
};
use async_trait::async_trait;

pub use fal::{FalClient, FalWire};
pub use placeholder::PlaceholderGenerator;
pub use replicate::ReplicateClient;

/// Wire contract of one upstream image service.
///
/// An adapter makes one logical request per call and never retries; a missing
/// credential must fail with [`crate::GatewayError::MissingCredential`] before
/// anything goes over the network.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn invoke(&self, spec: &ProviderSpec, prompt: &str) -> Result<ProviderResult>;
}

/// Reads an upstream reply, turning non-2xx statuses and unparsable bodies into
/// upstream errors. Error payloads are kept verbatim for diagnostics.
pub(crate) async fn read_json(
    provider: &str,
    response: reqwest::Response,
) -> Result<serde_json::Value> {
    let status = response.status();
    let body = response.text().await.map_err(|e| {
        crate::GatewayError::upstream(
            provider,
            Some(status.as_u16()),
            format!("Failed to read response from {}: {}", provider, e),
        )
    })?;

    if !status.is_success() {
        let payload = serde_json::from_str::<serde_json::Value>(&body)
            .map(|json| json.to_string())
            .unwrap_or(body);
        log::error!("{} returned {}: {}", provider, status.as_u16(), payload);
        return Err(crate::GatewayError::upstream(
            provider,
            Some(status.as_u16()),
            format!("API error: {}", payload),
        ));
    }

    serde_json::from_str(&body).map_err(|e| {
        crate::GatewayError::upstream(
            provider,
            Some(status.as_u16()),
            format!("Malformed response from {}: {}", provider, e),
        )
    })
}

pub(crate) fn transport_error(provider: &str, error: reqwest::Error) -> crate::GatewayError {
    log::error!("Request to {} failed: {}", provider, error);
    crate::GatewayError::upstream(provider, None, format!("Request to {} failed: {}", provider, error))
}
