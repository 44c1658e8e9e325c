use crate::{
    config::PlaceholderConfig,
    models::{GenerationRequest, GenerationResponse},
};
use rand::{seq::SliceRandom, Rng};

pub const PALETTE: [&str; 6] = ["4287f5", "f54242", "42f54e", "f5d442", "f542f2", "42f5f5"];
pub const TEXT_COLOR: &str = "FFFFFF";
pub const EXCERPT_CHARS: usize = 30;

/// Network-free demo backend: a placeholder image URL that renders the prompt.
#[derive(Debug, Clone)]
pub struct PlaceholderGenerator {
    base_url: String,
}

impl PlaceholderGenerator {
    pub fn new(config: &PlaceholderConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn generate(&self, request: &GenerationRequest) -> GenerationResponse {
        self.generate_with_rng(request, &mut rand::thread_rng())
    }

    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        request: &GenerationRequest,
        rng: &mut R,
    ) -> GenerationResponse {
        let color = PALETTE.choose(rng).copied().unwrap_or(PALETTE[0]);
        let excerpt: String = request.prompt().chars().take(EXCERPT_CHARS).collect();

        let url = format!(
            "{}/{}/{}?text={}",
            self.base_url,
            color,
            TEXT_COLOR,
            urlencoding::encode(&excerpt)
        );
        log::info!("Generated placeholder image URL: {}", url);

        GenerationResponse::new(vec![url])
    }
}
