use std::env;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_FAL_RUN_URL: &str = "https://fal.run";
pub const DEFAULT_FAL_DIRECT_URL: &str = "https://api.fal.ai/v1/models";
pub const DEFAULT_REPLICATE_URL: &str = "https://api.replicate.com/v1";
pub const DEFAULT_PLACEHOLDER_URL: &str = "https://placehold.co/600x400";

#[derive(Debug, Clone)]
pub struct FalConfig {
    pub api_key: Option<String>,
    pub run_url: String,
    pub direct_url: String,
}

#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    pub api_token: Option<String>,
    pub base_url: String,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

#[derive(Debug, Clone)]
pub struct PlaceholderConfig {
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub fal: FalConfig,
    pub replicate: ReplicateConfig,
    pub placeholder: PlaceholderConfig,
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Shows only the head of a credential, for log lines.
pub fn mask_secret(secret: &str) -> String {
    let head: String = secret.chars().take(8).collect();
    format!("{}...", head)
}

impl Default for FalConfig {
    fn default() -> Self {
        FalConfig {
            api_key: None,
            run_url: DEFAULT_FAL_RUN_URL.to_string(),
            direct_url: DEFAULT_FAL_DIRECT_URL.to_string(),
        }
    }
}

impl FalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        FalConfig {
            api_key: non_empty_var("FAL_API_KEY"),
            run_url: non_empty_var("FAL_RUN_URL").unwrap_or(defaults.run_url),
            direct_url: non_empty_var("FAL_DIRECT_URL").unwrap_or(defaults.direct_url),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into()).filter(|key: &String| !key.trim().is_empty());
        self
    }

    pub fn with_urls(mut self, run_url: impl Into<String>, direct_url: impl Into<String>) -> Self {
        self.run_url = run_url.into();
        self.direct_url = direct_url.into();
        self
    }
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        ReplicateConfig {
            api_token: None,
            base_url: DEFAULT_REPLICATE_URL.to_string(),
            poll_interval: Duration::from_millis(1000),
            max_polls: 60,
        }
    }
}

impl ReplicateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let poll_interval = non_empty_var("REPLICATE_POLL_INTERVAL_MS")
            .and_then(|ms| ms.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.poll_interval);
        let max_polls = non_empty_var("REPLICATE_MAX_POLLS")
            .and_then(|n| n.parse().ok())
            .unwrap_or(defaults.max_polls);

        ReplicateConfig {
            api_token: non_empty_var("REPLICATE_API_TOKEN"),
            base_url: non_empty_var("REPLICATE_API_URL").unwrap_or(defaults.base_url),
            poll_interval,
            max_polls,
        }
    }

    pub fn with_api_token(mut self, api_token: impl Into<String>) -> Self {
        self.api_token = Some(api_token.into()).filter(|token: &String| !token.trim().is_empty());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_polling(mut self, poll_interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = poll_interval;
        self.max_polls = max_polls;
        self
    }
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        PlaceholderConfig {
            base_url: DEFAULT_PLACEHOLDER_URL.to_string(),
        }
    }
}

impl PlaceholderConfig {
    pub fn from_env() -> Self {
        PlaceholderConfig {
            base_url: non_empty_var("PLACEHOLDER_URL")
                .unwrap_or_else(|| DEFAULT_PLACEHOLDER_URL.to_string()),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            host: None,
            port: None,
            fal: FalConfig::default(),
            replicate: ReplicateConfig::default(),
            placeholder: PlaceholderConfig::default(),
        }
    }
}

impl GatewayConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let host = non_empty_var("HOST");
        let port = env::var("PORT").ok().and_then(|port| port.parse().ok());

        GatewayConfig {
            host,
            port,
            fal: FalConfig::from_env(),
            replicate: ReplicateConfig::from_env(),
            placeholder: PlaceholderConfig::from_env(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_fal(mut self, config: FalConfig) -> Self {
        self.fal = config;
        self
    }

    pub fn with_replicate(mut self, config: ReplicateConfig) -> Self {
        self.replicate = config;
        self
    }

    pub fn with_placeholder(mut self, config: PlaceholderConfig) -> Self {
        self.placeholder = config;
        self
    }

    pub fn bind_host(&self) -> &str {
        self.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn bind_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}
