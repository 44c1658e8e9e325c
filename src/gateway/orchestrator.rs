use super::normalizer::normalize;
use crate::{
    error::{GatewayError, Result},
    models::{
        AttemptFailure, FailureReason, FallbackChain, GenerationOutcome, GenerationRequest,
        GenerationResponse,
    },
    providers::ImageProvider,
};
use std::sync::Arc;

/// Where a fallback run currently stands.
#[derive(Debug)]
enum AttemptState {
    Pending,
    Trying(usize),
    Succeeded {
        index: usize,
        response: GenerationResponse,
    },
    ExhaustedFailed,
}

/// Tries each candidate of a chain in order until one yields images.
///
/// Runs are strictly sequential and stop at the first success. A missing
/// credential aborts the whole run, every other failure moves on to the next
/// candidate and is kept for diagnostics.
#[derive(Clone)]
pub struct FallbackOrchestrator {
    provider: Arc<dyn ImageProvider>,
    chain: FallbackChain,
}

impl FallbackOrchestrator {
    pub fn new(provider: Arc<dyn ImageProvider>, chain: FallbackChain) -> Self {
        Self { provider, chain }
    }

    pub fn chain(&self) -> &FallbackChain {
        &self.chain
    }

    pub async fn run(&self, request: &GenerationRequest) -> Result<GenerationOutcome> {
        let specs = self.chain.specs();
        let mut failures: Vec<AttemptFailure> = Vec::new();
        let mut state = AttemptState::Pending;

        loop {
            state = match state {
                AttemptState::Pending => AttemptState::Trying(0),
                AttemptState::Trying(index) if index >= specs.len() => {
                    AttemptState::ExhaustedFailed
                }
                AttemptState::Trying(index) => {
                    let spec = &specs[index];
                    log::info!(
                        "Trying model {}/{}: {}",
                        index + 1,
                        specs.len(),
                        spec.name()
                    );

                    match self.provider.invoke(spec, request.prompt()).await {
                        Ok(result) => match normalize(&result) {
                            Some(response) => AttemptState::Succeeded { index, response },
                            None => {
                                log::warn!("No images found in {} response", spec.name());
                                failures.push(AttemptFailure {
                                    provider: spec.name().to_string(),
                                    reason: FailureReason::NoImages,
                                });
                                AttemptState::Trying(index + 1)
                            }
                        },
                        Err(e) if e.is_fatal() => {
                            log::error!("Aborting fallback chain at {}: {}", spec.name(), e);
                            return Err(e);
                        }
                        Err(e) => {
                            log::warn!("Error with {} model: {}", spec.name(), e);
                            failures.push(AttemptFailure {
                                provider: spec.name().to_string(),
                                reason: FailureReason::Upstream(e.to_string()),
                            });
                            AttemptState::Trying(index + 1)
                        }
                    }
                }
                AttemptState::Succeeded { index, response } => {
                    let provider = specs[index].name();
                    log::info!("Generated {} images with {}", response.len(), provider);
                    return Ok(GenerationOutcome::new(response, provider).with_failures(failures));
                }
                AttemptState::ExhaustedFailed => {
                    log::error!(
                        "All models failed to generate images: {}",
                        serde_json::to_string(&failures).unwrap_or_default()
                    );
                    return Err(GatewayError::Exhausted { failures });
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProviderResult, ProviderSpec};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Reply {
        Json(Value),
        Fail,
        NoKey,
    }

    struct ScriptedProvider {
        replies: HashMap<String, Reply>,
        calls: Mutex<Vec<String>>,
        total: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<(&str, Reply)>) -> Arc<Self> {
            Arc::new(Self {
                replies: replies
                    .into_iter()
                    .map(|(name, reply)| (name.to_string(), reply))
                    .collect(),
                calls: Mutex::new(Vec::new()),
                total: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImageProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn invoke(&self, spec: &ProviderSpec, _prompt: &str) -> Result<ProviderResult> {
            self.total.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push(spec.name().to_string());
            match self.replies.get(spec.name()) {
                Some(Reply::Json(value)) => Ok(ProviderResult::new(value.clone())),
                Some(Reply::NoKey) => Err(GatewayError::MissingCredential {
                    provider: "scripted".into(),
                }),
                Some(Reply::Fail) | None => Err(GatewayError::upstream(
                    spec.name(),
                    Some(503),
                    "API error: {\"detail\":\"overloaded\"}",
                )),
            }
        }
    }

    fn chain(names: &[&str]) -> FallbackChain {
        FallbackChain::new(
            names
                .iter()
                .map(|name| ProviderSpec::new(*name, json!({})).unwrap())
                .collect(),
        )
        .unwrap()
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("a paper boat").unwrap()
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let provider = ScriptedProvider::new(vec![
            ("A", Reply::Json(json!({"images": [{"url": "a1"}, {"url": "a2"}]}))),
            ("B", Reply::Json(json!(["b1"]))),
        ]);
        let orchestrator = FallbackOrchestrator::new(provider.clone(), chain(&["A", "B"]));

        let outcome = orchestrator.run(&request()).await.unwrap();

        assert_eq!(outcome.response.image_urls, vec!["a1", "a2"]);
        assert_eq!(outcome.provider, "A");
        assert!(outcome.failures.is_empty());
        assert_eq!(provider.calls(), vec!["A"]);
    }

    #[tokio::test]
    async fn test_falls_back_in_order_and_stops_at_success() {
        let provider = ScriptedProvider::new(vec![
            ("A", Reply::Fail),
            ("B", Reply::Json(json!(["b1", "b2"]))),
            ("C", Reply::Json(json!("c1"))),
        ]);
        let orchestrator = FallbackOrchestrator::new(provider.clone(), chain(&["A", "B", "C"]));

        let outcome = orchestrator.run(&request()).await.unwrap();

        assert_eq!(outcome.response.image_urls, vec!["b1", "b2"]);
        assert_eq!(outcome.provider, "B");
        assert_eq!(provider.calls(), vec!["A", "B"]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].provider, "A");
    }

    #[tokio::test]
    async fn test_empty_result_advances_to_next_candidate() {
        let provider = ScriptedProvider::new(vec![
            ("A", Reply::Json(json!({"seed": 3}))),
            ("B", Reply::Json(json!({"image": {"url": "b"}}))),
        ]);
        let orchestrator = FallbackOrchestrator::new(provider.clone(), chain(&["A", "B"]));

        let outcome = orchestrator.run(&request()).await.unwrap();

        assert_eq!(outcome.response.image_urls, vec!["b"]);
        assert_eq!(outcome.failures[0].reason, FailureReason::NoImages);
    }

    #[tokio::test]
    async fn test_exhausted_chain_records_every_failure() {
        let provider = ScriptedProvider::new(vec![
            ("A", Reply::Fail),
            ("B", Reply::Json(json!([]))),
            ("C", Reply::Fail),
        ]);
        let orchestrator = FallbackOrchestrator::new(provider.clone(), chain(&["A", "B", "C"]));

        let err = orchestrator.run(&request()).await.unwrap_err();

        match err {
            GatewayError::Exhausted { failures } => {
                let names: Vec<_> = failures.iter().map(|f| f.provider.as_str()).collect();
                assert_eq!(names, vec!["A", "B", "C"]);
                assert_eq!(failures[1].reason, FailureReason::NoImages);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(provider.total.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_missing_credential_is_fatal_mid_chain() {
        let provider = ScriptedProvider::new(vec![
            ("A", Reply::Fail),
            ("B", Reply::NoKey),
            ("C", Reply::Json(json!(["c"]))),
        ]);
        let orchestrator = FallbackOrchestrator::new(provider.clone(), chain(&["A", "B", "C"]));

        let err = orchestrator.run(&request()).await.unwrap_err();

        assert!(matches!(err, GatewayError::MissingCredential { .. }));
        assert_eq!(provider.calls(), vec!["A", "B"]);
    }
}
