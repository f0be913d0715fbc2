use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },
    #[error("Malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Configuration rejected: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Error, PartialEq)]
#[error("Unknown statistic: {0}")]
pub struct UnknownStatistic(pub String);
