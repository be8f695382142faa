//! Job bodies run by the scheduler, also callable on demand.

use std::sync::Arc;

use chrono::Utc;
use lotto_agent::NumberGenerator;
use lotto_core::{LotteryType, NewRecommendation, Recommendation};
use lotto_draw::{DrawInfoResolver, FetchSummary, ResultFetcher, WinAnalyzer};
use lotto_store::LotteryStore;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::error::{Result, SchedulerError};
use crate::types::{JobEvent, JobOutcome, TaskKey};

/// Everything a job firing needs. Shared by all registered jobs.
pub struct JobContext {
    store: Arc<LotteryStore>,
    resolver: Arc<DrawInfoResolver>,
    generator: Arc<NumberGenerator>,
    fetcher: Arc<ResultFetcher>,
    analyzer: Arc<WinAnalyzer>,
    reconcile_on_create: bool,
    /// If set, every firing's outcome is sent here.
    events: Option<mpsc::Sender<JobEvent>>,
}

impl JobContext {
    pub fn new(
        store: Arc<LotteryStore>,
        resolver: Arc<DrawInfoResolver>,
        generator: Arc<NumberGenerator>,
        fetcher: Arc<ResultFetcher>,
        analyzer: Arc<WinAnalyzer>,
    ) -> Self {
        Self {
            store,
            resolver,
            generator,
            fetcher,
            analyzer,
            reconcile_on_create: true,
            events: None,
        }
    }

    /// Analyze new recommendations right away when their draw is known.
    pub fn with_reconcile_on_create(mut self, enabled: bool) -> Self {
        self.reconcile_on_create = enabled;
        self
    }

    /// Attach an outcome channel. Sends never block a job; events are
    /// dropped when the channel is full.
    pub fn with_events(mut self, tx: mpsc::Sender<JobEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn store(&self) -> &Arc<LotteryStore> {
        &self.store
    }

    pub fn fetcher(&self) -> &ResultFetcher {
        &self.fetcher
    }

    /// Generate and store one recommendation for the lottery's next draw.
    pub async fn generate_for_lottery(&self, lottery_type_id: i64) -> Result<Recommendation> {
        let lottery = self.lottery(lottery_type_id)?;
        let info = self.resolver.resolve(&lottery).await?;
        let numbers = self
            .generator
            .generate(&lottery.code, &lottery.model_name)
            .await?;
        let rec = self.store.create_recommendation(&NewRecommendation {
            lottery_type_id,
            numbers,
            model_name: lottery.model_name.clone(),
            target_period: info.next_period,
            expected_draw_time: info.next_draw_at,
        })?;
        info!(code = %lottery.code, id = rec.id, period = %rec.target_period, "recommendation created");
        self.reconcile(rec)
    }

    /// Generate up to `count` distinct recommendations for the next draw.
    pub async fn generate_batch_for_lottery(
        &self,
        lottery_type_id: i64,
        count: usize,
    ) -> Result<Vec<Recommendation>> {
        let lottery = self.lottery(lottery_type_id)?;
        let info = self.resolver.resolve(&lottery).await?;
        let combinations = self
            .generator
            .generate_batch(&lottery.code, &lottery.model_name, count)
            .await?;

        let batch: Vec<NewRecommendation> = combinations
            .into_iter()
            .map(|numbers| NewRecommendation {
                lottery_type_id,
                numbers,
                model_name: lottery.model_name.clone(),
                target_period: info.next_period.clone(),
                expected_draw_time: info.next_draw_at,
            })
            .collect();
        let created = self
            .store
            .create_recommendations(&batch)?
            .into_iter()
            .map(|rec| self.reconcile(rec))
            .collect::<Result<Vec<_>>>()?;
        info!(code = %lottery.code, period = %info.next_period, count = created.len(), "batch created");
        Ok(created)
    }

    pub async fn fetch_all(&self) -> Result<FetchSummary> {
        Ok(self.fetcher.fetch_all_active().await?)
    }

    /// Body of a generation task. Failures are logged and reported on the
    /// event channel; the next firing is the retry.
    pub(crate) async fn run_generate(&self, lottery_type_id: i64) {
        let key = TaskKey::Generate(lottery_type_id);
        let outcome = match self.generate_for_lottery(lottery_type_id).await {
            Ok(rec) => JobOutcome::Generated {
                recommendation_id: rec.id,
                period: rec.target_period,
            },
            Err(e) => {
                error!(task = %key, error = %e, "generation job failed");
                JobOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        self.emit(key, outcome);
    }

    /// Body of the shared fetch task.
    pub(crate) async fn run_fetch_all(&self) {
        let outcome = match self.fetch_all().await {
            Ok(summary) => JobOutcome::Fetched(summary),
            Err(e) => {
                error!(task = %TaskKey::FetchAll, error = %e, "fetch job failed");
                JobOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };
        self.emit(TaskKey::FetchAll, outcome);
    }

    fn lottery(&self, id: i64) -> Result<LotteryType> {
        self.store
            .get_lottery_type(id)?
            .ok_or(SchedulerError::LotteryNotFound { id })
    }

    /// Settle a fresh recommendation whose draw is already stored.
    fn reconcile(&self, rec: Recommendation) -> Result<Recommendation> {
        if !self.reconcile_on_create {
            return Ok(rec);
        }
        match self.analyzer.reconcile(&rec) {
            Ok(Some(tier)) => {
                info!(id = rec.id, %tier, "recommendation settled on creation");
                Ok(self.store.get_recommendation(rec.id)?.unwrap_or(rec))
            }
            Ok(None) => Ok(rec),
            Err(e) => {
                warn!(id = rec.id, error = %e, "reconciliation on creation failed");
                Ok(rec)
            }
        }
    }

    fn emit(&self, key: TaskKey, outcome: JobOutcome) {
        if let Some(ref tx) = self.events {
            let event = JobEvent {
                key,
                outcome,
                at: Utc::now(),
            };
            if tx.try_send(event).is_err() {
                warn!(task = %key, "job event channel full or closed; event dropped");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use lotto_agent::{ChatRequest, ChatResponse, GeneratorConfig, LlmProvider, ProviderError};
    use lotto_core::config::{DrawConfig, LotteryTypeSeed};
    use lotto_core::{FetchedDraw, PrizeTier};
    use lotto_draw::{DrawError, ResultSource};
    use lotto_store::RecommendationFilter;

    use super::*;

    fn for_lottery(id: i64) -> RecommendationFilter {
        RecommendationFilter {
            lottery_type_id: Some(id),
            ..Default::default()
        }
    }

    /// Always answers with the same combination.
    pub(crate) struct AlwaysOk(pub &'static str);

    #[async_trait]
    impl LlmProvider for AlwaysOk {
        fn name(&self) -> &str {
            "always-ok"
        }
        async fn send(&self, req: &ChatRequest) -> std::result::Result<ChatResponse, ProviderError> {
            Ok(ChatResponse {
                content: format!("<NUMBER>{}</NUMBER>", self.0),
                model: req.model.clone(),
                tokens_in: 1,
                tokens_out: 1,
                stop_reason: "stop".to_string(),
            })
        }
    }

    pub(crate) struct AlwaysFail;

    #[async_trait]
    impl LlmProvider for AlwaysFail {
        fn name(&self) -> &str {
            "always-fail"
        }
        async fn send(&self, _req: &ChatRequest) -> std::result::Result<ChatResponse, ProviderError> {
            Err(ProviderError::Unavailable("intentional failure".to_string()))
        }
    }

    /// Result source that never has anything.
    pub(crate) struct NoResults {
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl ResultSource for NoResults {
        fn name(&self) -> &str {
            "none"
        }
        async fn fetch_latest(&self, _lottery: &LotteryType) -> lotto_draw::Result<FetchedDraw> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(DrawError::Api { status: 503 })
        }
    }

    pub(crate) fn seed(store: &LotteryStore, code: &str, cron: &str, active: bool) -> LotteryType {
        store
            .upsert_lottery_type(&LotteryTypeSeed {
                code: code.to_string(),
                name: code.to_string(),
                schedule_cron: cron.to_string(),
                model_name: "gpt-test".to_string(),
                is_active: active,
                results_api_id: Some(14),
                draw_info_endpoint: None,
            })
            .unwrap()
    }

    pub(crate) fn context(store: Arc<LotteryStore>, provider: Arc<dyn LlmProvider>) -> JobContext {
        let resolver = Arc::new(DrawInfoResolver::new(store.clone(), &DrawConfig::default()));
        let generator = Arc::new(NumberGenerator::new(
            provider,
            GeneratorConfig {
                max_retries: 2,
                backoff_unit: std::time::Duration::ZERO,
                ..GeneratorConfig::default()
            },
        ));
        let analyzer = Arc::new(WinAnalyzer::new(store.clone()));
        let source = Arc::new(NoResults {
            calls: AtomicUsize::new(0),
        });
        let fetcher = Arc::new(ResultFetcher::new(store.clone(), source, analyzer.clone()));
        JobContext::new(store, resolver, generator, fetcher, analyzer)
    }

    #[tokio::test]
    async fn generation_targets_the_resolved_draw() {
        let store = Arc::new(LotteryStore::open_in_memory().unwrap());
        let dlt = seed(&store, "tc_dlt", "0 0 10 * * 1,3,6", true);
        let ctx = context(store.clone(), Arc::new(AlwaysOk("03,05,18,27,34+08,11")));

        let rec = ctx.generate_for_lottery(dlt.id).await.unwrap();
        let expected = ctx.resolver.resolve(&dlt).await.unwrap();
        assert_eq!(rec.numbers, "03,05,18,27,34+08,11");
        assert_eq!(rec.model_name, "gpt-test");
        assert_eq!(rec.target_period, expected.next_period);
        assert_eq!(rec.win_tier, None);
    }

    #[tokio::test]
    async fn known_draw_settles_new_recommendation() {
        let store = Arc::new(LotteryStore::open_in_memory().unwrap());
        let dlt = seed(&store, "tc_dlt", "0 0 10 * * 1,3,6", true);
        let ctx = context(store.clone(), Arc::new(AlwaysOk("03,05,18,27,34+08,11")));
        let info = ctx.resolver.resolve(&dlt).await.unwrap();
        store
            .upsert_draw_result(&FetchedDraw {
                lottery_type_id: dlt.id,
                results_api_id: Some(14),
                period: info.next_period.clone(),
                main_numbers: "03 05 18 27 40".to_string(),
                special_numbers: "08 12".to_string(),
                draw_date: info.next_draw_at.date_naive(),
                sale_amount: 0.0,
                pool_amount: 0.0,
                official_open_date: None,
                deadline: None,
                prize_info: "[]".to_string(),
                breakdown: vec![],
            })
            .unwrap();

        let rec = ctx.generate_for_lottery(dlt.id).await.unwrap();
        assert_eq!(rec.win_tier, Some(PrizeTier::Tier5));

        let untouched = context(store.clone(), Arc::new(AlwaysOk("03,05,18,27,34+08,11")))
            .with_reconcile_on_create(false)
            .generate_for_lottery(dlt.id)
            .await
            .unwrap();
        assert_eq!(untouched.win_tier, None);
    }

    #[tokio::test]
    async fn batch_stores_each_combination() {
        let store = Arc::new(LotteryStore::open_in_memory().unwrap());
        let dlt = seed(&store, "tc_dlt", "0 0 10 * * 1,3,6", true);
        let ctx = context(store.clone(), Arc::new(AlwaysOk("03,05,18,27,34+08,11")));

        // A backend repeating itself yields one distinct combination.
        let recs = ctx.generate_batch_for_lottery(dlt.id, 3).await.unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(store.list_recommendations(&for_lottery(dlt.id), 10).unwrap().len(), 1);

        assert!(matches!(
            ctx.generate_batch_for_lottery(dlt.id, 0).await,
            Err(SchedulerError::Generation(_))
        ));
    }

    #[tokio::test]
    async fn job_bodies_report_outcomes() {
        let store = Arc::new(LotteryStore::open_in_memory().unwrap());
        let dlt = seed(&store, "tc_dlt", "0 0 10 * * 1,3,6", true);
        let (tx, mut rx) = mpsc::channel(8);
        let ctx = context(store.clone(), Arc::new(AlwaysFail)).with_events(tx);

        ctx.run_generate(dlt.id).await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.key, TaskKey::Generate(dlt.id));
        assert!(matches!(event.outcome, JobOutcome::Failed { .. }));
        assert!(store.list_recommendations(&for_lottery(dlt.id), 10).unwrap().is_empty());

        ctx.run_fetch_all().await;
        let event = rx.recv().await.unwrap();
        assert_eq!(event.key, TaskKey::FetchAll);
        assert_eq!(
            event.outcome,
            JobOutcome::Fetched(FetchSummary {
                fetched: 0,
                skipped: 0,
                failed: 1
            })
        );

        ctx.run_generate(999).await;
        let event = rx.recv().await.unwrap();
        match event.outcome {
            JobOutcome::Failed { reason } => assert!(reason.contains("999")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
