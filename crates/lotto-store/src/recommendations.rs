use chrono::DateTime;
use lotto_core::{NewRecommendation, PrizeTier, Recommendation};
use tracing::{debug, instrument};

use crate::error::{Result, StoreError};
use crate::store::{conversion_error, now_rfc3339, LotteryStore};

const SELECT_COLUMNS: &str = "SELECT id, lottery_type_id, numbers, model_name, target_period,
        expected_draw_time, is_purchased, official_result, win_tier, win_amount,
        created_at, updated_at
 FROM recommendations";

/// Optional filters for [`LotteryStore::list_recommendations`].
#[derive(Debug, Clone, Default)]
pub struct RecommendationFilter {
    pub lottery_type_id: Option<i64>,
    pub target_period: Option<String>,
}

/// Rows whose outcome has not been determined yet.
const UNSETTLED: &str = "(win_tier IS NULL OR win_tier IN ('', 'unknown'))";

impl LotteryStore {
    #[instrument(skip(self, rec), fields(lottery_type_id = rec.lottery_type_id, period = %rec.target_period))]
    pub fn create_recommendation(&self, rec: &NewRecommendation) -> Result<Recommendation> {
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO recommendations
             (lottery_type_id, numbers, model_name, target_period, expected_draw_time,
              is_purchased, win_amount, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6, ?6)",
            rusqlite::params![
                rec.lottery_type_id,
                rec.numbers,
                rec.model_name,
                rec.target_period,
                rec.expected_draw_time.to_rfc3339(),
                now
            ],
        )?;
        let id = db.last_insert_rowid();
        debug!(id, "recommendation created");
        Ok(db.query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            [id],
            row_to_recommendation,
        )?)
    }

    /// Insert a whole batch in one transaction: either every row is stored
    /// or none is.
    #[instrument(skip(self, recs), fields(count = recs.len()))]
    pub fn create_recommendations(&self, recs: &[NewRecommendation]) -> Result<Vec<Recommendation>> {
        let now = now_rfc3339();
        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        let mut created = Vec::with_capacity(recs.len());
        for rec in recs {
            tx.execute(
                "INSERT INTO recommendations
                 (lottery_type_id, numbers, model_name, target_period, expected_draw_time,
                  is_purchased, win_amount, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6, ?6)",
                rusqlite::params![
                    rec.lottery_type_id,
                    rec.numbers,
                    rec.model_name,
                    rec.target_period,
                    rec.expected_draw_time.to_rfc3339(),
                    now
                ],
            )?;
            created.push(tx.query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                [tx.last_insert_rowid()],
                row_to_recommendation,
            )?);
        }
        tx.commit()?;
        debug!(count = created.len(), "recommendation batch created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub fn get_recommendation(&self, id: i64) -> Result<Option<Recommendation>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            [id],
            row_to_recommendation,
        ) {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Recommendations for one draw whose outcome is empty or `unknown`.
    #[instrument(skip(self))]
    pub fn list_unsettled_for_period(
        &self,
        lottery_type_id: i64,
        period: &str,
    ) -> Result<Vec<Recommendation>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "{SELECT_COLUMNS}
             WHERE lottery_type_id = ?1 AND target_period = ?2 AND {UNSETTLED}
             ORDER BY id"
        ))?;
        let rows = stmt.query_map(rusqlite::params![lottery_type_id, period], row_to_recommendation)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Newest first, optionally filtered by lottery and target period.
    #[instrument(skip(self))]
    pub fn list_recommendations(
        &self,
        filter: &RecommendationFilter,
        limit: usize,
    ) -> Result<Vec<Recommendation>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "{SELECT_COLUMNS}
             WHERE (?1 IS NULL OR lottery_type_id = ?1)
               AND (?2 IS NULL OR target_period = ?2)
             ORDER BY id DESC
             LIMIT ?3"
        ))?;
        let rows = stmt.query_map(
            rusqlite::params![filter.lottery_type_id, filter.target_period, limit as i64],
            row_to_recommendation,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Store an analysis outcome unless a concrete one is already present.
    ///
    /// Returns `false` when the row was already settled (or does not exist).
    #[instrument(skip(self, official_result))]
    pub fn record_outcome(
        &self,
        id: i64,
        tier: PrizeTier,
        amount: f64,
        official_result: &str,
    ) -> Result<bool> {
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            &format!(
                "UPDATE recommendations
                 SET win_tier = ?1, win_amount = ?2, official_result = ?3, updated_at = ?4
                 WHERE id = ?5 AND {UNSETTLED}"
            ),
            rusqlite::params![tier.to_string(), amount, official_result, now, id],
        )?;
        Ok(changed > 0)
    }

    #[instrument(skip(self))]
    pub fn set_purchased(&self, id: i64, purchased: bool) -> Result<Recommendation> {
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        let changed = db.execute(
            "UPDATE recommendations SET is_purchased = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![purchased, now, id],
        )?;
        if changed == 0 {
            return Err(StoreError::RecommendationNotFound { id });
        }
        Ok(db.query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            [id],
            row_to_recommendation,
        )?)
    }
}

fn row_to_recommendation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Recommendation> {
    let draw_time: String = row.get(5)?;
    let expected_draw_time =
        DateTime::parse_from_rfc3339(&draw_time).map_err(|e| conversion_error(5, e))?;
    // Anything that is not a known tier label counts as "not analyzed".
    let win_tier = row
        .get::<_, Option<String>>(8)?
        .and_then(|s| s.parse::<PrizeTier>().ok());

    Ok(Recommendation {
        id: row.get(0)?,
        lottery_type_id: row.get(1)?,
        numbers: row.get(2)?,
        model_name: row.get(3)?,
        target_period: row.get(4)?,
        expected_draw_time,
        is_purchased: row.get(6)?,
        official_result: row.get(7)?,
        win_tier,
        win_amount: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}
