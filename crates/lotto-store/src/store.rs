use std::sync::Mutex;

use rusqlite::{types::Type, Connection};

use crate::db::init_db;
use crate::error::Result;

/// Thread-safe store over a single SQLite connection.
///
/// Query methods are split by table across `lottery_types`,
/// `recommendations` and `draw_results`.
pub struct LotteryStore {
    pub(crate) db: Mutex<Connection>,
}

impl LotteryStore {
    /// Wrap an already-open connection, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Fresh in-memory database, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }
}

pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Wrap a column decoding failure so it surfaces as a rusqlite error.
pub(crate) fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}
