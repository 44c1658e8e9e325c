use crate::error::{GatewayError, Result};
use serde_json::{json, Map, Value};
use std::collections::HashSet;

pub const FLUX_DEV: &str = "fal-ai/flux/dev";
pub const FAST_SDXL: &str = "fal-ai/fast-sdxl";
pub const STABLE_DIFFUSION: &str = "fal-ai/stable-diffusion";
pub const TEXT_TO_IMAGE: &str = "fal-ai/text-to-image";
pub const REPLICATE_STABLE_DIFFUSION: &str = "stability-ai/stable-diffusion:db21e45d3f7023abc2a46ee38a23973f6dce16bb082a930b0c49861f96d1e5bf";

/// A model to call and the generation options sent along with the prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSpec {
    name: String,
    parameters: Map<String, Value>,
}

impl ProviderSpec {
    pub fn new(name: impl Into<String>, parameters: Value) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(GatewayError::Config("Provider name must not be empty".into()));
        }

        let parameters = match parameters {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(GatewayError::Config(format!(
                    "Parameters for {} must be a JSON object, got {}",
                    name, other
                )))
            }
        };

        Ok(Self { name, parameters })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &Map<String, Value> {
        &self.parameters
    }

    /// Parameters with the prompt filled in, ready to go on the wire.
    pub fn input_for(&self, prompt: &str) -> Value {
        let mut input = Map::with_capacity(self.parameters.len() + 1);
        input.insert("prompt".to_string(), json!(prompt));
        for (key, value) in &self.parameters {
            if key != "prompt" {
                input.insert(key.clone(), value.clone());
            }
        }
        Value::Object(input)
    }

    pub fn flux_dev() -> Result<Self> {
        Self::new(
            FLUX_DEV,
            json!({
                "image_size": "landscape_16_9",
                "num_inference_steps": 28,
                "guidance_scale": 3.5,
                "num_images": 1,
                "enable_safety_checker": true
            }),
        )
    }

    pub fn replicate_stable_diffusion() -> Result<Self> {
        Self::new(
            REPLICATE_STABLE_DIFFUSION,
            json!({
                "image_dimensions": "512x512",
                "num_outputs": 1,
                "num_inference_steps": 50,
                "guidance_scale": 7.5,
                "scheduler": "DPMSolverMultistep"
            }),
        )
    }
}

/// Ordered candidates; the first entry is tried first.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackChain {
    specs: Vec<ProviderSpec>,
}

impl FallbackChain {
    pub fn new(specs: Vec<ProviderSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(GatewayError::Config("Fallback chain is empty".into()));
        }

        let mut seen = HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name()) {
                return Err(GatewayError::Config(format!(
                    "Duplicate provider in fallback chain: {}",
                    spec.name()
                )));
            }
        }

        Ok(Self { specs })
    }

    pub fn fal_default() -> Result<Self> {
        Self::new(vec![
            ProviderSpec::flux_dev()?,
            ProviderSpec::new(
                FAST_SDXL,
                json!({
                    "negative_prompt": "low quality, blurry, distorted",
                    "height": 512,
                    "width": 512
                }),
            )?,
            ProviderSpec::new(
                STABLE_DIFFUSION,
                json!({
                    "num_inference_steps": 30,
                    "guidance_scale": 7.5
                }),
            )?,
            ProviderSpec::new(TEXT_TO_IMAGE, Value::Null)?,
        ])
    }

    pub fn specs(&self) -> &[ProviderSpec] {
        &self.specs
    }

    pub fn first(&self) -> &ProviderSpec {
        &self.specs[0]
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(ProviderSpec::name).collect()
    }
}

/// Raw JSON handed back by an upstream provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResult(Value);

impl ProviderResult {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for ProviderResult {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
