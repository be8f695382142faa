//! `lotto-scheduler`: cron-driven generation and result fetching.
//!
//! # Overview
//!
//! A [`Scheduler`] owns one `tokio-cron-scheduler` engine. Each active
//! lottery gets a generation task keyed `generate_{id}`; one shared task,
//! `fetch_all_results`, pulls official results for every active lottery and
//! scores pending recommendations. Task bodies live on [`JobContext`] so the
//! HTTP triggers can run them on demand.
//!
//! Nothing here is persisted: the registry is rebuilt from the lottery
//! table on every [`Scheduler::start`].

pub mod engine;
pub mod error;
pub mod jobs;
pub mod types;

pub use engine::Scheduler;
pub use error::{Result, SchedulerError};
pub use jobs::JobContext;
pub use types::{JobEvent, JobOutcome, TaskKey};
