use lotto_agent::GenerationError;
use lotto_core::LottoError;
use lotto_draw::DrawError;
use lotto_store::StoreError;
use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The underlying cron engine refused an operation.
    #[error("Scheduler engine error: {0}")]
    Engine(#[from] JobSchedulerError),

    /// A task's schedule could not be parsed.
    #[error("Invalid schedule for {task}: {source}")]
    InvalidSchedule {
        task: String,
        #[source]
        source: LottoError,
    },

    #[error("Lottery type not found: {id}")]
    LotteryNotFound { id: i64 },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Draw(#[from] DrawError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
