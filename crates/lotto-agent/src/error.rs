use thiserror::Error;

use crate::provider::ProviderError;
use crate::validate::ValidationError;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("unsupported lottery format: {code}")]
    UnsupportedFormat { code: String },

    /// Every attempt failed transport or validation.
    #[error(
        "generation failed after {attempts} attempts{}{}",
        suffix("last error", .last_error),
        suffix("last rejected output", .last_rejection)
    )]
    GenerationFailed {
        attempts: u32,
        /// Last transport-level error, if any attempt got that far.
        last_error: Option<ProviderError>,
        /// Why the last response that did arrive was discarded.
        last_rejection: Option<ValidationError>,
    },

    #[error("batch size must be between 1 and {max}, got {count}")]
    InvalidBatchSize { count: usize, max: usize },
}

fn suffix<E: std::fmt::Display>(label: &str, err: &Option<E>) -> String {
    match err {
        Some(e) => format!("; {label}: {e}"),
        None => String::new(),
    }
}
