use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use lotto_core::config::LottoConfig;
use lotto_scheduler::{JobContext, Scheduler};
use lotto_store::LotteryStore;

use crate::http;

/// Shared state handed to every handler as `Arc<AppState>`.
pub struct AppState {
    pub config: LottoConfig,
    pub store: Arc<LotteryStore>,
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(config: LottoConfig, store: Arc<LotteryStore>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            config,
            store,
            scheduler,
        }
    }

    /// Job bodies, for on-demand triggers.
    pub fn jobs(&self) -> &JobContext {
        self.scheduler.context()
    }
}

/// Assemble the admin router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(http::health::health_handler))
        .route(
            "/lottery-types",
            get(http::lottery_types::list).post(http::lottery_types::create),
        )
        .route("/lottery-types/{id}", put(http::lottery_types::update))
        .route("/recommendations", get(http::recommendations::list))
        .route(
            "/recommendations/{id}/purchase",
            put(http::recommendations::mark_purchased)
                .delete(http::recommendations::unmark_purchased),
        )
        .route("/draw-results", get(http::recommendations::list_draw_results))
        .route("/lottery/generate", post(http::trigger::generate))
        .route("/lottery/crawl", post(http::trigger::crawl))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
