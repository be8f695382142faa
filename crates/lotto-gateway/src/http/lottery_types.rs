use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use lotto_core::config::LotteryTypeSeed;
use lotto_core::{LotteryType, ScheduleSpec};
use lotto_store::LotteryTypeUpdate;
use tracing::info;

use super::{api_error, scheduler_error, store_error, ApiError};
use crate::app::AppState;

/// GET /lottery-types
pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<LotteryType>>, ApiError> {
    state.store.list_lottery_types().map(Json).map_err(store_error)
}

/// POST /lottery-types: register a new lottery and schedule its
/// generation task right away when it is active.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(seed): Json<LotteryTypeSeed>,
) -> Result<(StatusCode, Json<LotteryType>), ApiError> {
    if seed.code.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "INVALID_CODE", "code must not be empty"));
    }
    if let Err(e) = ScheduleSpec::parse(&seed.schedule_cron) {
        return Err(api_error(StatusCode::BAD_REQUEST, e.code(), e.to_string()));
    }

    let lottery = state.store.create_lottery_type(&seed).map_err(store_error)?;
    state
        .scheduler
        .reload(&lottery)
        .await
        .map_err(scheduler_error)?;
    info!(id = lottery.id, code = %lottery.code, active = lottery.is_active, "lottery type created");
    Ok((StatusCode::CREATED, Json(lottery)))
}

/// PUT /lottery-types/{id}: partial update, then re-register the
/// lottery's generation task.
///
/// A schedule that does not parse is rejected before anything is written.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(update): Json<LotteryTypeUpdate>,
) -> Result<Json<LotteryType>, ApiError> {
    if let Some(expr) = &update.schedule_cron {
        if let Err(e) = ScheduleSpec::parse(expr) {
            return Err(api_error(StatusCode::BAD_REQUEST, e.code(), e.to_string()));
        }
    }

    let lottery = state
        .store
        .update_lottery_type(id, &update)
        .map_err(store_error)?;
    state
        .scheduler
        .reload(&lottery)
        .await
        .map_err(scheduler_error)?;
    info!(id, code = %lottery.code, active = lottery.is_active, "lottery type updated");
    Ok(Json(lottery))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use lotto_scheduler::TaskKey;
    use lotto_store::LotteryStore;
    use serde_json::json;

    use crate::app::tests::{call, seed, state};

    #[tokio::test]
    async fn lists_seeded_types() {
        let store = Arc::new(LotteryStore::open_in_memory().unwrap());
        seed(&store, "tc_dlt", Some(14));
        seed(&store, "fc_ssq", Some(11));

        let (status, body) = call(state(store), "GET", "/lottery-types", None).await;
        assert_eq!(status, StatusCode::OK);
        let codes: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["code"].as_str().unwrap())
            .collect();
        assert_eq!(codes.len(), 2);
        assert!(codes.contains(&"tc_dlt"));
        assert!(codes.contains(&"fc_ssq"));
    }

    #[tokio::test]
    async fn create_stores_new_type() {
        let store = Arc::new(LotteryStore::open_in_memory().unwrap());
        let (status, body) = call(
            state(store.clone()),
            "POST",
            "/lottery-types",
            Some(json!({
                "code": "fc_ssq",
                "name": "Double Color Ball",
                "schedule_cron": "0 0 10 * * 2,4,0",
                "model_name": "gpt-test",
                "results_api_id": 11
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["code"], "fc_ssq");
        assert_eq!(body["is_active"], true);

        let id = body["id"].as_i64().unwrap();
        let stored = store.get_lottery_type(id).unwrap().unwrap();
        assert_eq!(stored.results_api_id, Some(11));
        assert_eq!(stored.schedule_cron, "0 0 10 * * 2,4,0");
    }

    #[tokio::test]
    async fn create_rejects_bad_schedule_and_duplicate_code() {
        let store = Arc::new(LotteryStore::open_in_memory().unwrap());
        seed(&store, "tc_dlt", Some(14));
        let state = state(store.clone());

        let (status, body) = call(
            state.clone(),
            "POST",
            "/lottery-types",
            Some(json!({
                "code": "fc_ssq",
                "name": "Double Color Ball",
                "schedule_cron": "0 0 10 * * 9",
                "model_name": "gpt-test"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_SCHEDULE");
        assert_eq!(store.list_lottery_types().unwrap().len(), 1);

        let (status, body) = call(
            state,
            "POST",
            "/lottery-types",
            Some(json!({
                "code": "tc_dlt",
                "name": "Again",
                "schedule_cron": "0 0 10 * * 1,3,6",
                "model_name": "gpt-test"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "LOTTERY_EXISTS");
        assert_eq!(store.list_lottery_types().unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn create_registers_task_on_running_scheduler() {
        let store = Arc::new(LotteryStore::open_in_memory().unwrap());
        let state = state(store);
        state.scheduler.start().await.unwrap();
        assert_eq!(state.scheduler.task_keys().await, vec![TaskKey::FetchAll]);

        let (status, body) = call(
            state.clone(),
            "POST",
            "/lottery-types",
            Some(json!({
                "code": "tc_dlt",
                "name": "Super Lotto",
                "schedule_cron": "0 0 10 * * 1,3,6",
                "model_name": "gpt-test"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["id"].as_i64().unwrap();
        assert_eq!(
            state.scheduler.task_keys().await,
            vec![TaskKey::Generate(id), TaskKey::FetchAll]
        );
        state.scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_schedule_is_rejected_without_writing() {
        let store = Arc::new(LotteryStore::open_in_memory().unwrap());
        let dlt = seed(&store, "tc_dlt", Some(14));

        let (status, body) = call(
            state(store.clone()),
            "PUT",
            &format!("/lottery-types/{}", dlt.id),
            Some(json!({ "schedule_cron": "0 0 20 * * 8" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_SCHEDULE");
        let stored = store.get_lottery_type(dlt.id).unwrap().unwrap();
        assert_eq!(stored.schedule_cron, dlt.schedule_cron);
    }

    #[tokio::test]
    async fn unknown_id_is_404() {
        let store = Arc::new(LotteryStore::open_in_memory().unwrap());
        let (status, body) = call(
            state(store),
            "PUT",
            "/lottery-types/42",
            Some(json!({ "is_active": false })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "LOTTERY_NOT_FOUND");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn update_reloads_running_scheduler() {
        let store = Arc::new(LotteryStore::open_in_memory().unwrap());
        let dlt = seed(&store, "tc_dlt", Some(14));
        let state = state(store);
        state.scheduler.start().await.unwrap();

        let (status, body) = call(
            state.clone(),
            "PUT",
            &format!("/lottery-types/{}", dlt.id),
            Some(json!({ "is_active": false, "model_name": "gpt-next" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_active"], false);
        assert_eq!(body["model_name"], "gpt-next");
        assert_eq!(state.scheduler.task_keys().await, vec![TaskKey::FetchAll]);

        let (status, _) = call(
            state.clone(),
            "PUT",
            &format!("/lottery-types/{}", dlt.id),
            Some(json!({ "is_active": true, "schedule_cron": "0 30 9 * * 2,5" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            state.scheduler.task_keys().await,
            vec![TaskKey::Generate(dlt.id), TaskKey::FetchAll]
        );
        state.scheduler.stop().await.unwrap();
    }
}
