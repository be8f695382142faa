use thiserror::Error;

#[derive(Debug, Error)]
pub enum LottoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid schedule '{expr}': {reason}")]
    InvalidSchedule { expr: String, reason: String },
}

impl LottoError {
    /// Short error code string returned in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            LottoError::Config(_) => "CONFIG_ERROR",
            LottoError::InvalidSchedule { .. } => "INVALID_SCHEDULE",
        }
    }

    pub(crate) fn schedule(expr: &str, reason: impl Into<String>) -> Self {
        LottoError::InvalidSchedule {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LottoError>;
