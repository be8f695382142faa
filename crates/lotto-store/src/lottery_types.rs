use lotto_core::config::LotteryTypeSeed;
use lotto_core::LotteryType;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Result, StoreError};
use crate::store::{now_rfc3339, LotteryStore};

const SELECT_COLUMNS: &str = "SELECT id, code, name, schedule_cron, model_name, is_active,
        results_api_id, draw_info_endpoint, created_at, updated_at
 FROM lottery_types";

/// Partial update of a lottery type; `None` leaves a column unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LotteryTypeUpdate {
    pub name: Option<String>,
    pub schedule_cron: Option<String>,
    pub model_name: Option<String>,
    pub is_active: Option<bool>,
    pub results_api_id: Option<i64>,
    pub draw_info_endpoint: Option<String>,
}

impl LotteryStore {
    /// Insert a lottery type or overwrite the row with the same code.
    #[instrument(skip(self, seed), fields(code = %seed.code))]
    pub fn upsert_lottery_type(&self, seed: &LotteryTypeSeed) -> Result<LotteryType> {
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO lottery_types
             (code, name, schedule_cron, model_name, is_active, results_api_id,
              draw_info_endpoint, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT(code) DO UPDATE SET
                 name               = excluded.name,
                 schedule_cron      = excluded.schedule_cron,
                 model_name         = excluded.model_name,
                 is_active          = excluded.is_active,
                 results_api_id     = excluded.results_api_id,
                 draw_info_endpoint = excluded.draw_info_endpoint,
                 updated_at         = excluded.updated_at",
            rusqlite::params![
                seed.code,
                seed.name,
                seed.schedule_cron,
                seed.model_name,
                seed.is_active,
                seed.results_api_id,
                seed.draw_info_endpoint,
                now
            ],
        )?;
        let row = db.query_row(
            &format!("{SELECT_COLUMNS} WHERE code = ?1"),
            [&seed.code],
            row_to_lottery_type,
        )?;
        debug!(id = row.id, "lottery type upserted");
        Ok(row)
    }

    /// Insert a new lottery type; an existing code is an error.
    #[instrument(skip(self, seed), fields(code = %seed.code))]
    pub fn create_lottery_type(&self, seed: &LotteryTypeSeed) -> Result<LotteryType> {
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        let exists: bool = db.query_row(
            "SELECT EXISTS(SELECT 1 FROM lottery_types WHERE code = ?1)",
            [&seed.code],
            |row| row.get(0),
        )?;
        if exists {
            return Err(StoreError::LotteryTypeExists {
                code: seed.code.clone(),
            });
        }
        db.execute(
            "INSERT INTO lottery_types
             (code, name, schedule_cron, model_name, is_active, results_api_id,
              draw_info_endpoint, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            rusqlite::params![
                seed.code,
                seed.name,
                seed.schedule_cron,
                seed.model_name,
                seed.is_active,
                seed.results_api_id,
                seed.draw_info_endpoint,
                now
            ],
        )?;
        let row = db.query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            [db.last_insert_rowid()],
            row_to_lottery_type,
        )?;
        debug!(id = row.id, "lottery type created");
        Ok(row)
    }

    #[instrument(skip(self))]
    pub fn get_lottery_type(&self, id: i64) -> Result<Option<LotteryType>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            [id],
            row_to_lottery_type,
        ) {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    #[instrument(skip(self))]
    pub fn get_lottery_type_by_code(&self, code: &str) -> Result<Option<LotteryType>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!("{SELECT_COLUMNS} WHERE code = ?1"),
            [code],
            row_to_lottery_type,
        ) {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    #[instrument(skip(self))]
    pub fn list_lottery_types(&self) -> Result<Vec<LotteryType>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
        let rows = stmt.query_map([], row_to_lottery_type)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Every lottery type with `is_active = 1`, in id order.
    #[instrument(skip(self))]
    pub fn list_active_lottery_types(&self) -> Result<Vec<LotteryType>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!("{SELECT_COLUMNS} WHERE is_active = 1 ORDER BY id"))?;
        let rows = stmt.query_map([], row_to_lottery_type)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Apply a partial update and return the stored row.
    #[instrument(skip(self, update))]
    pub fn update_lottery_type(&self, id: i64, update: &LotteryTypeUpdate) -> Result<LotteryType> {
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE lottery_types
             SET name               = COALESCE(?1, name),
                 schedule_cron      = COALESCE(?2, schedule_cron),
                 model_name         = COALESCE(?3, model_name),
                 is_active          = COALESCE(?4, is_active),
                 results_api_id     = COALESCE(?5, results_api_id),
                 draw_info_endpoint = COALESCE(?6, draw_info_endpoint),
                 updated_at         = ?7
             WHERE id = ?8",
            rusqlite::params![
                update.name,
                update.schedule_cron,
                update.model_name,
                update.is_active,
                update.results_api_id,
                update.draw_info_endpoint,
                now,
                id
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::LotteryTypeNotFound { id });
        }
        Ok(db.query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            [id],
            row_to_lottery_type,
        )?)
    }
}

fn row_to_lottery_type(row: &rusqlite::Row<'_>) -> rusqlite::Result<LotteryType> {
    Ok(LotteryType {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        schedule_cron: row.get(3)?,
        model_name: row.get(4)?,
        is_active: row.get(5)?,
        results_api_id: row.get(6)?,
        draw_info_endpoint: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
