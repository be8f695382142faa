//! On-demand triggers for the scheduled jobs.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use lotto_core::Recommendation;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{draw_error, scheduler_error, ApiError};
use crate::app::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub lottery_type_id: i64,
    /// Omitted means a single recommendation.
    pub count: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CrawlRequest {
    /// Omitted means every active lottery.
    pub lottery_type_id: Option<i64>,
}

/// POST /lottery/generate
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<Vec<Recommendation>>), ApiError> {
    let jobs = state.jobs();
    let created = match req.count {
        None => vec![jobs
            .generate_for_lottery(req.lottery_type_id)
            .await
            .map_err(scheduler_error)?],
        Some(count) => jobs
            .generate_batch_for_lottery(req.lottery_type_id, count)
            .await
            .map_err(scheduler_error)?,
    };
    Ok((StatusCode::CREATED, Json(created)))
}

/// POST /lottery/crawl: fetch the latest official result for one lottery,
/// or for all active ones.
pub async fn crawl(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CrawlRequest>,
) -> Result<Json<Value>, ApiError> {
    let jobs = state.jobs();
    match req.lottery_type_id {
        Some(id) => {
            let draw = jobs.fetcher().fetch_one(id).await.map_err(draw_error)?;
            Ok(Json(json!({ "draw_result": draw })))
        }
        None => {
            let summary = jobs.fetch_all().await.map_err(scheduler_error)?;
            Ok(Json(json!({ "summary": summary })))
        }
    }
}
