use std::fmt;

use chrono::{DateTime, Utc};
use lotto_draw::FetchSummary;
use serde::{Serialize, Serializer};

/// Identity of a registered task.
///
/// Generation tasks are keyed per lottery so reloading one lottery never
/// touches another; the shared fetch task has a fixed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKey {
    Generate(i64),
    FetchAll,
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKey::Generate(id) => write!(f, "generate_{id}"),
            TaskKey::FetchAll => write!(f, "fetch_all_results"),
        }
    }
}

impl Serialize for TaskKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What a job firing produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobOutcome {
    Generated {
        recommendation_id: i64,
        period: String,
    },
    Fetched(FetchSummary),
    Failed {
        reason: String,
    },
}

/// Emitted after every job firing when an event channel is attached.
#[derive(Debug, Clone, Serialize)]
pub struct JobEvent {
    pub key: TaskKey,
    pub outcome: JobOutcome,
    pub at: DateTime<Utc>,
}
