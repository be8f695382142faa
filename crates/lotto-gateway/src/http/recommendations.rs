use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use lotto_core::{DrawResult, Recommendation};
use lotto_store::{DrawResultFilter, RecommendationFilter};
use serde::Deserialize;

use super::{list_limit, store_error, ApiError};
use crate::app::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RecommendationQuery {
    pub lottery_type_id: Option<i64>,
    pub lottery_code: Option<String>,
    /// Target period, e.g. `24099`.
    #[serde(alias = "drawNumber")]
    pub draw_number: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DrawResultQuery {
    pub lottery_type_id: Option<i64>,
    pub lottery_code: Option<String>,
    #[serde(alias = "drawNumber")]
    pub draw_number: Option<String>,
    /// Inclusive `YYYY-MM-DD` bounds on the draw date.
    #[serde(alias = "startDate")]
    pub start_date: Option<NaiveDate>,
    #[serde(alias = "endDate")]
    pub end_date: Option<NaiveDate>,
    pub limit: Option<usize>,
}

/// Lottery id a listing is restricted to.
///
/// Returns `None` when `code` names no lottery (or a different one than
/// `id`), in which case nothing can match.
fn lottery_scope(
    state: &AppState,
    id: Option<i64>,
    code: Option<&str>,
) -> Result<Option<Option<i64>>, ApiError> {
    let Some(code) = code else {
        return Ok(Some(id));
    };
    match state.store.get_lottery_type_by_code(code).map_err(store_error)? {
        Some(lottery) if id.map_or(true, |id| id == lottery.id) => Ok(Some(Some(lottery.id))),
        _ => Ok(None),
    }
}

/// GET /recommendations?lottery_type_id=&lottery_code=&draw_number=&limit=:
/// newest first.
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<Vec<Recommendation>>, ApiError> {
    let Some(lottery_type_id) =
        lottery_scope(&state, query.lottery_type_id, query.lottery_code.as_deref())?
    else {
        return Ok(Json(Vec::new()));
    };
    let filter = RecommendationFilter {
        lottery_type_id,
        target_period: query.draw_number,
    };
    state
        .store
        .list_recommendations(&filter, list_limit(query.limit))
        .map(Json)
        .map_err(store_error)
}

/// PUT /recommendations/{id}/purchase
pub async fn mark_purchased(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Recommendation>, ApiError> {
    set_purchased(&state, id, true)
}

/// DELETE /recommendations/{id}/purchase
pub async fn unmark_purchased(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Recommendation>, ApiError> {
    set_purchased(&state, id, false)
}

fn set_purchased(state: &AppState, id: i64, purchased: bool) -> Result<Json<Recommendation>, ApiError> {
    state
        .store
        .set_purchased(id, purchased)
        .map(Json)
        .map_err(store_error)
}

/// GET /draw-results?lottery_code=&drawNumber=&startDate=&endDate=&limit=:
/// most recent draw first.
pub async fn list_draw_results(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DrawResultQuery>,
) -> Result<Json<Vec<DrawResult>>, ApiError> {
    let Some(lottery_type_id) =
        lottery_scope(&state, query.lottery_type_id, query.lottery_code.as_deref())?
    else {
        return Ok(Json(Vec::new()));
    };
    let filter = DrawResultFilter {
        lottery_type_id,
        period: query.draw_number,
        start_date: query.start_date,
        end_date: query.end_date,
    };
    state
        .store
        .list_draw_results(&filter, list_limit(query.limit))
        .map(Json)
        .map_err(store_error)
}
