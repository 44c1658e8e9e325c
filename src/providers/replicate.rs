use super::{read_json, transport_error, ImageProvider};
use crate::{
    config::ReplicateConfig,
    error::{GatewayError, Result},
    models::{ProviderResult, ProviderSpec},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: Option<String>,
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Value,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

enum PredictionState {
    Succeeded(Value),
    Failed(String),
    Running(Option<String>),
}

impl Prediction {
    fn state(self) -> PredictionState {
        match self.status.as_str() {
            "succeeded" => PredictionState::Succeeded(self.output),
            "failed" | "canceled" => {
                let reason = match self.error {
                    Value::Null => format!("prediction {}", self.status),
                    Value::String(msg) => msg,
                    other => other.to_string(),
                };
                PredictionState::Failed(reason)
            }
            _ => PredictionState::Running(self.urls.and_then(|urls| urls.get)),
        }
    }
}

/// Replicate predictions API. `Prefer: wait` lets most predictions finish in
/// the first round trip; the rest are polled through `urls.get`.
#[derive(Clone)]
pub struct ReplicateClient {
    client: Client,
    api_token: Option<String>,
    base_url: String,
    poll_interval: Duration,
    max_polls: u32,
}

impl ReplicateClient {
    pub fn new(client: Client, config: &ReplicateConfig) -> Self {
        Self {
            client,
            api_token: config.api_token.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            poll_interval: config.poll_interval,
            max_polls: config.max_polls,
        }
    }

    /// `owner/model:version` goes to the versioned endpoint, `owner/model` to
    /// the model's own predictions endpoint.
    fn prediction_request(&self, spec: &ProviderSpec, prompt: &str) -> (String, Value) {
        let input = spec.input_for(prompt);
        match spec.name().split_once(':') {
            Some((_, version)) => (
                format!("{}/predictions", self.base_url),
                json!({ "version": version, "input": input }),
            ),
            None => (
                format!("{}/models/{}/predictions", self.base_url, spec.name()),
                json!({ "input": input }),
            ),
        }
    }

    async fn fetch(&self, spec: &ProviderSpec, token: &str, url: &str) -> Result<Prediction> {
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| transport_error(spec.name(), e))?;
        let value = read_json(spec.name(), response).await?;
        parse_prediction(spec, value)
    }
}

fn parse_prediction(spec: &ProviderSpec, value: Value) -> Result<Prediction> {
    serde_json::from_value(value).map_err(|e| {
        GatewayError::upstream(
            spec.name(),
            None,
            format!("Malformed prediction from {}: {}", spec.name(), e),
        )
    })
}

#[async_trait]
impl ImageProvider for ReplicateClient {
    fn name(&self) -> &str {
        "replicate"
    }

    async fn invoke(&self, spec: &ProviderSpec, prompt: &str) -> Result<ProviderResult> {
        let token = self
            .api_token
            .as_deref()
            .ok_or_else(|| GatewayError::MissingCredential {
                provider: self.name().to_string(),
            })?;

        let (url, body) = self.prediction_request(spec, prompt);
        log::info!("Creating Replicate prediction for {}", spec.name());

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(spec.name(), e))?;

        let mut prediction = parse_prediction(spec, read_json(spec.name(), response).await?)?;
        let mut polls = 0;

        loop {
            let id = prediction.id.clone().unwrap_or_default();
            match prediction.state() {
                PredictionState::Succeeded(output) => {
                    log::debug!("Replicate prediction {} output: {}", id, output);
                    return Ok(ProviderResult::new(output));
                }
                PredictionState::Failed(reason) => {
                    log::error!("Replicate prediction {} failed: {}", id, reason);
                    return Err(GatewayError::upstream(spec.name(), None, reason));
                }
                PredictionState::Running(Some(poll_url)) if polls < self.max_polls => {
                    polls += 1;
                    log::debug!("Replicate prediction {} still running (poll {})", id, polls);
                    tokio::time::sleep(self.poll_interval).await;
                    prediction = self.fetch(spec, token, &poll_url).await?;
                }
                PredictionState::Running(_) => {
                    return Err(GatewayError::upstream(
                        spec.name(),
                        None,
                        format!("Replicate prediction {} did not complete", id),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn client_for(server: &MockServer, max_polls: u32) -> ReplicateClient {
        let config = ReplicateConfig::new()
            .with_api_token("r8_test")
            .with_base_url(server.uri())
            .with_polling(Duration::from_millis(5), max_polls);
        ReplicateClient::new(Client::new(), &config)
    }

    #[tokio::test]
    async fn test_versioned_model_uses_predictions_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predictions"))
            .and(header("authorization", "Bearer r8_test"))
            .and(header("prefer", "wait"))
            .and(body_partial_json(json!({
                "version": "abc123",
                "input": {"prompt": "a tram at night", "num_outputs": 1}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "p1",
                "status": "succeeded",
                "output": ["https://replicate.delivery/out-0.png"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let spec =
            ProviderSpec::new("stability-ai/stable-diffusion:abc123", json!({"num_outputs": 1}))
                .unwrap();
        let result = client_for(&server, 3)
            .invoke(&spec, "a tram at night")
            .await
            .unwrap();

        assert_eq!(
            result.into_inner(),
            json!(["https://replicate.delivery/out-0.png"])
        );
    }

    #[tokio::test]
    async fn test_unversioned_model_uses_model_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/black-forest-labs/flux-schnell/predictions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "p2",
                "status": "succeeded",
                "output": "https://replicate.delivery/one.webp"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let spec = ProviderSpec::new("black-forest-labs/flux-schnell", json!({})).unwrap();
        let result = client_for(&server, 3).invoke(&spec, "moss").await.unwrap();

        assert_eq!(result.into_inner(), json!("https://replicate.delivery/one.webp"));
    }

    #[tokio::test]
    async fn test_running_prediction_is_polled() {
        let server = MockServer::start().await;
        let poll_url = format!("{}/predictions/p3", server.uri());
        Mock::given(method("POST"))
            .and(path("/predictions"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "p3",
                "status": "processing",
                "output": null,
                "urls": {"get": poll_url}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/predictions/p3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "p3",
                "status": "succeeded",
                "output": ["https://replicate.delivery/late.png"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let spec = ProviderSpec::new("owner/model:v1", json!({})).unwrap();
        let result = client_for(&server, 3).invoke(&spec, "fog").await.unwrap();

        assert_eq!(result.into_inner(), json!(["https://replicate.delivery/late.png"]));
    }

    #[tokio::test]
    async fn test_poll_bound_is_enforced() {
        let server = MockServer::start().await;
        let running = json!({
            "id": "p4",
            "status": "starting",
            "urls": {"get": format!("{}/predictions/p4", server.uri())}
        });
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(running.clone()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(running))
            .expect(2)
            .mount(&server)
            .await;

        let spec = ProviderSpec::new("owner/model:v1", json!({})).unwrap();
        let err = client_for(&server, 2).invoke(&spec, "fog").await.unwrap_err();

        assert!(err.to_string().contains("did not complete"));
    }

    #[tokio::test]
    async fn test_failed_prediction_reports_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "p5",
                "status": "failed",
                "error": "NSFW content detected"
            })))
            .mount(&server)
            .await;

        let spec = ProviderSpec::new("owner/model:v1", json!({})).unwrap();
        let err = client_for(&server, 1).invoke(&spec, "x").await.unwrap_err();

        assert!(matches!(err, GatewayError::Upstream { .. }));
        assert_eq!(err.to_string(), "NSFW content detected");
    }

    #[tokio::test]
    async fn test_missing_token_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let config = ReplicateConfig::new().with_base_url(server.uri());
        let client = ReplicateClient::new(Client::new(), &config);
        let spec = ProviderSpec::replicate_stable_diffusion().unwrap();
        let err = client.invoke(&spec, "x").await.unwrap_err();

        assert_eq!(err.to_string(), "API key is not configured");
    }
}
