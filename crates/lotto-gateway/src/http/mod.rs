//! Admin HTTP handlers.
//!
//! Errors leave every handler as `(StatusCode, Json<ErrorBody>)` with a
//! short machine-readable `code` next to the message.

pub mod health;
pub mod lottery_types;
pub mod recommendations;
pub mod trigger;

use axum::{http::StatusCode, Json};
use lotto_agent::GenerationError;
use lotto_draw::DrawError;
use lotto_scheduler::SchedulerError;
use lotto_store::StoreError;
use serde::Serialize;
use tracing::error;

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 500;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn api_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
            code,
        }),
    )
}

/// `?limit=` of the list endpoints, clamped to `1..=MAX_LIST_LIMIT`.
pub fn list_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

pub fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::LotteryTypeNotFound { .. } => {
            api_error(StatusCode::NOT_FOUND, "LOTTERY_NOT_FOUND", e.to_string())
        }
        StoreError::LotteryTypeExists { .. } => {
            api_error(StatusCode::CONFLICT, "LOTTERY_EXISTS", e.to_string())
        }
        StoreError::RecommendationNotFound { .. } => {
            api_error(StatusCode::NOT_FOUND, "RECOMMENDATION_NOT_FOUND", e.to_string())
        }
        StoreError::Database(_) | StoreError::Serialization(_) => {
            error!(error = %e, "store failure");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR", e.to_string())
        }
    }
}

pub fn draw_error(e: DrawError) -> ApiError {
    match e {
        DrawError::UnknownLottery(_) | DrawError::NoDrawResult { .. } => {
            api_error(StatusCode::NOT_FOUND, "NOT_FOUND", e.to_string())
        }
        DrawError::NotConfigured(_) => {
            api_error(StatusCode::CONFLICT, "RESULTS_NOT_CONFIGURED", e.to_string())
        }
        DrawError::Schedule(inner) => {
            api_error(StatusCode::BAD_REQUEST, inner.code(), inner.to_string())
        }
        DrawError::Store(inner) => store_error(inner),
        DrawError::Http(_)
        | DrawError::Api { .. }
        | DrawError::Provider { .. }
        | DrawError::Parse(_) => api_error(StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", e.to_string()),
    }
}

pub fn scheduler_error(e: SchedulerError) -> ApiError {
    match e {
        SchedulerError::LotteryNotFound { .. } => {
            api_error(StatusCode::NOT_FOUND, "LOTTERY_NOT_FOUND", e.to_string())
        }
        SchedulerError::InvalidSchedule { .. } => {
            api_error(StatusCode::BAD_REQUEST, "INVALID_SCHEDULE", e.to_string())
        }
        SchedulerError::Store(inner) => store_error(inner),
        SchedulerError::Draw(inner) => draw_error(inner),
        SchedulerError::Generation(inner) => generation_error(inner),
        SchedulerError::Engine(_) => {
            error!(error = %e, "scheduler engine failure");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "SCHEDULER_ERROR", e.to_string())
        }
    }
}

fn generation_error(e: GenerationError) -> ApiError {
    match e {
        GenerationError::InvalidBatchSize { .. } => {
            api_error(StatusCode::BAD_REQUEST, "INVALID_BATCH_SIZE", e.to_string())
        }
        GenerationError::UnsupportedFormat { .. } => {
            api_error(StatusCode::UNPROCESSABLE_ENTITY, "UNSUPPORTED_FORMAT", e.to_string())
        }
        GenerationError::GenerationFailed { .. } => {
            api_error(StatusCode::BAD_GATEWAY, "GENERATION_FAILED", e.to_string())
        }
    }
}
