//! Prompt-to-image gateway: one prompt in, a list of image URLs out, whichever
//! upstream service produced them.

pub mod config;
pub mod error;
pub mod gateway;
pub mod logger;
pub mod models;
pub mod providers;
#[cfg(feature = "server")]
pub mod server;

pub use config::{FalConfig, GatewayConfig, PlaceholderConfig, ReplicateConfig};
pub use error::{GatewayError, Result};
pub use gateway::{FallbackOrchestrator, Gateway, GatewayBuilder};
pub use models::*;
pub use providers::{FalClient, ImageProvider, PlaceholderGenerator, ReplicateClient};
