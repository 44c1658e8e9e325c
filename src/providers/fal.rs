use super::{read_json, transport_error, ImageProvider};
use crate::{
    config::FalConfig,
    error::{GatewayError, Result},
    models::{ProviderResult, ProviderSpec},
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// The two ways fal.ai accepts a synchronous generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FalWire {
    /// `POST {run_url}/{model}` with the model input as the whole body.
    Run,
    /// `POST {direct_url}/{model}` with the model input wrapped in `{"input": ...}`.
    Direct,
}

#[derive(Clone)]
pub struct FalClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    wire: FalWire,
}

impl FalClient {
    pub fn new(client: Client, config: &FalConfig, wire: FalWire) -> Self {
        let base_url = match wire {
            FalWire::Run => &config.run_url,
            FalWire::Direct => &config.direct_url,
        };

        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            wire,
        }
    }

    pub fn run(client: Client, config: &FalConfig) -> Self {
        Self::new(client, config, FalWire::Run)
    }

    pub fn direct(client: Client, config: &FalConfig) -> Self {
        Self::new(client, config, FalWire::Direct)
    }

    pub fn wire(&self) -> FalWire {
        self.wire
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/{}", self.base_url, model.trim_start_matches('/'))
    }
}

#[async_trait]
impl ImageProvider for FalClient {
    fn name(&self) -> &str {
        match self.wire {
            FalWire::Run => "fal",
            FalWire::Direct => "fal-direct",
        }
    }

    async fn invoke(&self, spec: &ProviderSpec, prompt: &str) -> Result<ProviderResult> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::MissingCredential {
                provider: self.name().to_string(),
            })?;

        let input = spec.input_for(prompt);
        let body = match self.wire {
            FalWire::Run => input,
            FalWire::Direct => json!({ "input": input }),
        };

        let url = self.endpoint(spec.name());
        log::info!("Calling {} model: {}", self.name(), spec.name());
        log::debug!("fal request to {}: {}", url, body);

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, format!("Key {}", api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(spec.name(), e))?;

        log::debug!("{} responded with status {}", spec.name(), response.status());
        let value = read_json(spec.name(), response).await?;
        log::debug!("{} response received: {}", spec.name(), value);

        Ok(ProviderResult::new(value))
    }
}
