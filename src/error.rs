use crate::models::AttemptFailure;

pub const PROMPT_REQUIRED: &str = "Prompt is required";
pub const NO_IMAGES_RETURNED: &str = "No images were returned from the API";

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Validation(String),

    #[error("API key is not configured")]
    MissingCredential { provider: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{message}")]
    Upstream {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    #[error("No images were returned from the API")]
    NoImages { provider: String },

    #[error("Failed to generate images with all available models. Please try a different prompt.")]
    Exhausted { failures: Vec<AttemptFailure> },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn upstream(
        provider: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        GatewayError::Upstream {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Errors that mean no other candidate in a chain can succeed either.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GatewayError::MissingCredential { .. } | GatewayError::Config(_)
        )
    }

    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Validation(_) => 400,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

#[cfg(feature = "server")]
impl actix_web::ResponseError for GatewayError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::from_u16(GatewayError::status_code(self))
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> actix_web::HttpResponse {
        actix_web::HttpResponse::build(actix_web::ResponseError::status_code(self))
            .json(crate::models::ErrorBody::new(self.to_string()))
    }
}
