pub mod normalizer;
pub mod orchestrator;

use crate::{
    config::GatewayConfig,
    error::{GatewayError, Result},
    models::{
        BackendMode, FallbackChain, GenerationOutcome, GenerationRequest, ProviderSpec,
    },
    providers::{FalClient, ImageProvider, PlaceholderGenerator, ReplicateClient},
};
use std::sync::Arc;

pub use normalizer::{normalize, ResultShape};
pub use orchestrator::FallbackOrchestrator;

/// A single adapter call with a single normalization attempt.
#[derive(Clone)]
pub struct DirectRoute {
    provider: Arc<dyn ImageProvider>,
    spec: ProviderSpec,
}

impl DirectRoute {
    pub fn new(provider: Arc<dyn ImageProvider>, spec: ProviderSpec) -> Self {
        Self { provider, spec }
    }

    pub fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    pub async fn run(&self, request: &GenerationRequest) -> Result<GenerationOutcome> {
        log::info!(
            "Processing prompt with direct {} call: {}",
            self.provider.name(),
            self.spec.name()
        );
        let result = self.provider.invoke(&self.spec, request.prompt()).await?;

        match normalize(&result) {
            Some(response) => {
                log::info!(
                    "Generated {} images with {}",
                    response.len(),
                    self.spec.name()
                );
                Ok(GenerationOutcome::new(response, self.spec.name()))
            }
            None => {
                log::error!("No images found in {} response", self.spec.name());
                Err(GatewayError::NoImages {
                    provider: self.spec.name().to_string(),
                })
            }
        }
    }
}

/// Every backend mode wired to its route. Holds nothing but immutable
/// configuration and HTTP clients, so one instance serves all requests.
#[derive(Clone)]
pub struct Gateway {
    placeholder: PlaceholderGenerator,
    fal: FallbackOrchestrator,
    fal_direct: DirectRoute,
    replicate: DirectRoute,
}

impl Gateway {
    pub fn builder(config: &GatewayConfig) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        GatewayBuilder::new(config).build()
    }

    pub fn fal_chain(&self) -> &FallbackChain {
        self.fal.chain()
    }

    pub async fn generate(
        &self,
        mode: BackendMode,
        request: &GenerationRequest,
    ) -> Result<GenerationOutcome> {
        match mode {
            BackendMode::Local => {
                let response = self.placeholder.generate(request);
                Ok(GenerationOutcome::new(response, "placeholder"))
            }
            BackendMode::Fal => self.fal.run(request).await,
            BackendMode::FalDirect => self.fal_direct.run(request).await,
            BackendMode::Replicate => self.replicate.run(request).await,
        }
    }
}

/// Builds a [`Gateway`] from configuration, with every route replaceable.
pub struct GatewayBuilder {
    config: GatewayConfig,
    fal_provider: Option<Arc<dyn ImageProvider>>,
    fal_direct_provider: Option<Arc<dyn ImageProvider>>,
    replicate_provider: Option<Arc<dyn ImageProvider>>,
    fal_chain: Option<FallbackChain>,
    fal_direct_spec: Option<ProviderSpec>,
    replicate_spec: Option<ProviderSpec>,
}

impl GatewayBuilder {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            config: config.clone(),
            fal_provider: None,
            fal_direct_provider: None,
            replicate_provider: None,
            fal_chain: None,
            fal_direct_spec: None,
            replicate_spec: None,
        }
    }

    pub fn with_fal_provider(mut self, provider: Arc<dyn ImageProvider>) -> Self {
        self.fal_provider = Some(provider);
        self
    }

    pub fn with_fal_direct_provider(mut self, provider: Arc<dyn ImageProvider>) -> Self {
        self.fal_direct_provider = Some(provider);
        self
    }

    pub fn with_replicate_provider(mut self, provider: Arc<dyn ImageProvider>) -> Self {
        self.replicate_provider = Some(provider);
        self
    }

    pub fn with_fal_chain(mut self, chain: FallbackChain) -> Self {
        self.fal_chain = Some(chain);
        self
    }

    pub fn with_fal_direct_spec(mut self, spec: ProviderSpec) -> Self {
        self.fal_direct_spec = Some(spec);
        self
    }

    pub fn with_replicate_spec(mut self, spec: ProviderSpec) -> Self {
        self.replicate_spec = Some(spec);
        self
    }

    pub fn build(self) -> Result<Gateway> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("promptcanvas/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::Internal(format!("HTTP client: {}", e)))?;

        let fal_provider = self
            .fal_provider
            .unwrap_or_else(|| Arc::new(FalClient::run(http.clone(), &self.config.fal)));
        let fal_direct_provider = self
            .fal_direct_provider
            .unwrap_or_else(|| Arc::new(FalClient::direct(http.clone(), &self.config.fal)));
        let replicate_provider = self
            .replicate_provider
            .unwrap_or_else(|| Arc::new(ReplicateClient::new(http, &self.config.replicate)));

        let fal_chain = match self.fal_chain {
            Some(chain) => chain,
            None => FallbackChain::fal_default()?,
        };
        let fal_direct_spec = match self.fal_direct_spec {
            Some(spec) => spec,
            None => ProviderSpec::flux_dev()?,
        };
        let replicate_spec = match self.replicate_spec {
            Some(spec) => spec,
            None => ProviderSpec::replicate_stable_diffusion()?,
        };

        Ok(Gateway {
            placeholder: PlaceholderGenerator::new(&self.config.placeholder),
            fal: FallbackOrchestrator::new(fal_provider, fal_chain),
            fal_direct: DirectRoute::new(fal_direct_provider, fal_direct_spec),
            replicate: DirectRoute::new(replicate_provider, replicate_spec),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FalConfig, ReplicateConfig};
    use serde_json::json;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    #[tokio::test]
    async fn test_default_gateway_uses_fal_chain() {
        let gateway = Gateway::from_config(&GatewayConfig::new()).unwrap();
        assert_eq!(gateway.fal_chain().len(), 4);
    }

    #[tokio::test]
    async fn test_local_mode_never_needs_credentials() {
        let gateway = Gateway::from_config(&GatewayConfig::new()).unwrap();
        let request = GenerationRequest::new("sunrise over tokyo").unwrap();

        let outcome = gateway.generate(BackendMode::Local, &request).await.unwrap();

        assert_eq!(outcome.response.len(), 1);
        assert!(outcome.response.image_urls[0].contains("text=sunrise%20over%20tokyo"));
    }

    #[tokio::test]
    async fn test_fal_chain_against_mock_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fal-ai/flux/dev"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "down"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/fal-ai/fast-sdxl"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "images": [{"url": "https://fal.media/sdxl.png"}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/fal-ai/stable-diffusion"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = GatewayConfig::new().with_fal(
            FalConfig::new()
                .with_api_key("fal-key")
                .with_urls(server.uri(), server.uri()),
        );
        let gateway = Gateway::from_config(&config).unwrap();
        let request = GenerationRequest::new("a harbor").unwrap();

        let outcome = gateway.generate(BackendMode::Fal, &request).await.unwrap();

        assert_eq!(outcome.provider, "fal-ai/fast-sdxl");
        assert_eq!(outcome.response.image_urls, vec!["https://fal.media/sdxl.png"]);
    }

    #[tokio::test]
    async fn test_direct_route_reports_missing_images() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "p",
                "status": "succeeded",
                "output": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = GatewayConfig::new().with_replicate(
            ReplicateConfig::new()
                .with_api_token("r8_key")
                .with_base_url(server.uri()),
        );
        let gateway = Gateway::from_config(&config).unwrap();
        let request = GenerationRequest::new("a harbor").unwrap();

        let err = gateway
            .generate(BackendMode::Replicate, &request)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::NoImages { .. }));
        assert_eq!(err.to_string(), "No images were returned from the API");
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_every_upstream_mode() {
        let gateway = Gateway::from_config(&GatewayConfig::new()).unwrap();
        let request = GenerationRequest::new("a harbor").unwrap();

        for mode in [BackendMode::Fal, BackendMode::FalDirect, BackendMode::Replicate] {
            let err = gateway.generate(mode, &request).await.unwrap_err();
            assert_eq!(err.to_string(), "API key is not configured");
        }
    }
}
