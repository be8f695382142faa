use std::collections::HashMap;
use std::sync::Arc;

use chrono::FixedOffset;
use lotto_core::config::SchedulerConfig;
use lotto_core::{LotteryType, ScheduleSpec};
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, SchedulerError};
use crate::jobs::JobContext;
use crate::types::TaskKey;

/// Live engine plus the entry id of every task registered on it.
#[derive(Default)]
struct Registry {
    engine: Option<JobScheduler>,
    entries: HashMap<TaskKey, Uuid>,
}

/// Owns the cron engine and the per-lottery task registry.
///
/// `start`, `stop` and `reload` serialize on one lock. Job bodies never take
/// it, so a reload does not wait for a running job.
pub struct Scheduler {
    registry: Mutex<Registry>,
    ctx: Arc<JobContext>,
    fetch_cron: String,
    tz: FixedOffset,
}

impl Scheduler {
    pub fn new(ctx: Arc<JobContext>, cfg: &SchedulerConfig, tz: FixedOffset) -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
            ctx,
            fetch_cron: cfg.result_fetch_cron.clone(),
            tz,
        }
    }

    pub fn context(&self) -> &Arc<JobContext> {
        &self.ctx
    }

    /// Build a fresh engine with one generation task per active lottery and
    /// the shared fetch task, then start it.
    ///
    /// Any existing engine is shut down first. A schedule that fails to
    /// parse aborts the whole start and leaves the scheduler stopped.
    pub async fn start(&self) -> Result<()> {
        let mut reg = self.registry.lock().await;
        if let Some(mut old) = reg.engine.take() {
            debug!("discarding previous scheduler engine");
            if let Err(e) = old.shutdown().await {
                warn!(error = %e, "previous engine did not shut down cleanly");
            }
        }
        reg.entries.clear();

        let engine = JobScheduler::new().await?;
        let mut entries = HashMap::new();

        let fetch_spec = parse(TaskKey::FetchAll, &self.fetch_cron)?;
        let id = engine.add(self.build_job(TaskKey::FetchAll, &fetch_spec)?).await?;
        entries.insert(TaskKey::FetchAll, id);

        for lottery in self.ctx.store().list_active_lottery_types()? {
            let key = TaskKey::Generate(lottery.id);
            let spec = parse(key, &lottery.schedule_cron)?;
            let id = engine.add(self.build_job(key, &spec)?).await?;
            debug!(task = %key, code = %lottery.code, schedule = %spec, "task registered");
            entries.insert(key, id);
        }

        engine.start().await?;
        info!(tasks = entries.len(), "scheduler started");
        reg.engine = Some(engine);
        reg.entries = entries;
        Ok(())
    }

    /// Halt the engine. Jobs already running are left to finish.
    pub async fn stop(&self) -> Result<()> {
        let mut reg = self.registry.lock().await;
        reg.entries.clear();
        if let Some(mut engine) = reg.engine.take() {
            engine.shutdown().await?;
            info!("scheduler stopped");
        }
        Ok(())
    }

    /// Re-register one lottery's generation task after an edit.
    ///
    /// The existing task is removed; a new one is added only while the
    /// lottery is active. A stopped scheduler picks the change up on its
    /// next start.
    pub async fn reload(&self, lottery: &LotteryType) -> Result<()> {
        let mut reg = self.registry.lock().await;
        let key = TaskKey::Generate(lottery.id);
        let Registry { engine, entries } = &mut *reg;
        let Some(engine) = engine.as_ref() else {
            debug!(task = %key, "scheduler not running; reload deferred to start");
            return Ok(());
        };

        if let Some(id) = entries.remove(&key) {
            engine.remove(&id).await?;
            debug!(task = %key, "task removed");
        }
        if !lottery.is_active {
            info!(task = %key, code = %lottery.code, "lottery inactive; task not registered");
            return Ok(());
        }

        let spec = parse(key, &lottery.schedule_cron)?;
        let id = engine.add(self.build_job(key, &spec)?).await?;
        entries.insert(key, id);
        info!(task = %key, code = %lottery.code, schedule = %spec, "task reloaded");
        Ok(())
    }

    /// Registered task keys, sorted.
    pub async fn task_keys(&self) -> Vec<TaskKey> {
        let reg = self.registry.lock().await;
        let mut keys: Vec<TaskKey> = reg.entries.keys().copied().collect();
        keys.sort();
        keys
    }

    pub async fn is_running(&self) -> bool {
        self.registry.lock().await.engine.is_some()
    }

    /// Wrap a task body in a cron job. A firing that finds the previous run
    /// of the same task still going is skipped.
    fn build_job(&self, key: TaskKey, spec: &ScheduleSpec) -> Result<Job> {
        let ctx = self.ctx.clone();
        let running = Arc::new(Mutex::new(()));
        let expr = spec.engine_expression();

        let job = Job::new_async_tz(expr.as_str(), self.tz, move |_id, _engine| {
            let ctx = ctx.clone();
            let running = running.clone();
            Box::pin(async move {
                let Ok(_guard) = running.try_lock_owned() else {
                    warn!(task = %key, "previous run still in progress; skipping firing");
                    return;
                };
                debug!(task = %key, "task firing");
                match key {
                    TaskKey::Generate(id) => ctx.run_generate(id).await,
                    TaskKey::FetchAll => ctx.run_fetch_all().await,
                }
            })
        })?;
        Ok(job)
    }
}

fn parse(key: TaskKey, expr: &str) -> Result<ScheduleSpec> {
    ScheduleSpec::parse(expr).map_err(|source| SchedulerError::InvalidSchedule {
        task: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use lotto_store::{LotteryStore, LotteryTypeUpdate};

    use super::*;
    use crate::jobs::tests::{context, seed, AlwaysFail};

    fn scheduler(store: Arc<LotteryStore>, fetch_cron: &str) -> Scheduler {
        let ctx = Arc::new(context(store, Arc::new(AlwaysFail)));
        let cfg = SchedulerConfig {
            result_fetch_cron: fetch_cron.to_string(),
            reconcile_on_create: true,
        };
        Scheduler::new(ctx, &cfg, FixedOffset::east_opt(8 * 3600).unwrap())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn start_registers_active_lotteries_and_fetch_task() {
        let store = Arc::new(LotteryStore::open_in_memory().unwrap());
        let dlt = seed(&store, "tc_dlt", "0 0 10 * * 1,3,6", true);
        let ssq = seed(&store, "fc_ssq", "0 0 10 * * 2,4,0", true);
        seed(&store, "paused", "0 0 10 * * 5", false);
        let sched = scheduler(store, "0 30 21 * * *");

        assert!(!sched.is_running().await);
        sched.start().await.unwrap();
        assert!(sched.is_running().await);
        assert_eq!(
            sched.task_keys().await,
            vec![
                TaskKey::Generate(dlt.id),
                TaskKey::Generate(ssq.id),
                TaskKey::FetchAll
            ]
        );

        sched.stop().await.unwrap();
        assert!(!sched.is_running().await);
        assert!(sched.task_keys().await.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn invalid_schedule_aborts_start() {
        let store = Arc::new(LotteryStore::open_in_memory().unwrap());
        seed(&store, "tc_dlt", "0 0 10 * * 1,3,6", true);
        seed(&store, "broken", "0 0 10 * * 9", true);
        let sched = scheduler(store.clone(), "0 30 21 * * *");

        match sched.start().await {
            Err(SchedulerError::InvalidSchedule { task, .. }) => assert!(task.starts_with("generate_")),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!sched.is_running().await);

        let bad_fetch = scheduler(store, "every day");
        assert!(matches!(
            bad_fetch.start().await,
            Err(SchedulerError::InvalidSchedule { .. })
        ));
        assert!(!bad_fetch.is_running().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn reload_follows_active_flag() {
        let store = Arc::new(LotteryStore::open_in_memory().unwrap());
        let dlt = seed(&store, "tc_dlt", "0 0 10 * * 1,3,6", true);
        let sched = scheduler(store.clone(), "0 30 21 * * *");
        sched.start().await.unwrap();

        let paused = store
            .update_lottery_type(
                dlt.id,
                &LotteryTypeUpdate {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        sched.reload(&paused).await.unwrap();
        assert_eq!(sched.task_keys().await, vec![TaskKey::FetchAll]);

        let resumed = store
            .update_lottery_type(
                dlt.id,
                &LotteryTypeUpdate {
                    is_active: Some(true),
                    schedule_cron: Some("0 15 9 * * 2,5".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        sched.reload(&resumed).await.unwrap();
        sched.reload(&resumed).await.unwrap();
        assert_eq!(
            sched.task_keys().await,
            vec![TaskKey::Generate(dlt.id), TaskKey::FetchAll]
        );

        sched.stop().await.unwrap();
    }

    #[tokio::test]
    async fn reload_while_stopped_is_a_no_op() {
        let store = Arc::new(LotteryStore::open_in_memory().unwrap());
        let dlt = seed(&store, "tc_dlt", "0 0 10 * * 1,3,6", true);
        let sched = scheduler(store, "0 30 21 * * *");
        sched.reload(&dlt).await.unwrap();
        assert!(sched.task_keys().await.is_empty());
        assert!(!sched.is_running().await);
    }
}
