use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One backend per HTTP endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendMode {
    Local,
    Fal,
    FalDirect,
    Replicate,
}

impl BackendMode {
    pub const ALL: [BackendMode; 4] = [
        BackendMode::Local,
        BackendMode::Fal,
        BackendMode::FalDirect,
        BackendMode::Replicate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendMode::Local => "local",
            BackendMode::Fal => "fal",
            BackendMode::FalDirect => "fal-direct",
            BackendMode::Replicate => "replicate",
        }
    }

    pub fn endpoint(&self) -> String {
        format!("/api/{}/generate-image", self.as_str())
    }

    pub fn description(&self) -> &'static str {
        match self {
            BackendMode::Local => "Local placeholder images (no network)",
            BackendMode::Fal => "fal.ai with model fallback chain",
            BackendMode::FalDirect => "fal.ai direct REST call",
            BackendMode::Replicate => "Replicate hosted inference",
        }
    }
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("Unknown backend mode: {}", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_round_trip_through_str() {
        for mode in BackendMode::ALL {
            assert_eq!(mode.as_str().parse::<BackendMode>().unwrap(), mode);
        }
        assert!("demo".parse::<BackendMode>().is_err());
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(BackendMode::Local.endpoint(), "/api/local/generate-image");
        assert_eq!(
            BackendMode::FalDirect.endpoint(),
            "/api/fal-direct/generate-image"
        );
    }
}
