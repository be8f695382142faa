use chrono::NaiveDate;
use lotto_core::{DrawResult, FetchedDraw, TierPrize};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{Result, StoreError};
use crate::store::{conversion_error, now_rfc3339, LotteryStore};

const SELECT_COLUMNS: &str = "SELECT id, lottery_type_id, results_api_id, period, main_numbers,
        special_numbers, draw_date, sale_amount, pool_amount, official_open_date,
        deadline, prize_info, breakdown, created_at, updated_at
 FROM draw_results";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Optional filters for [`LotteryStore::list_draw_results`]; the date
/// bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct DrawResultFilter {
    pub lottery_type_id: Option<i64>,
    pub period: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Whether an upsert created a row or overwrote an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

impl LotteryStore {
    /// Insert or overwrite the draw keyed by `(lottery_type_id, period)`.
    ///
    /// Re-fetching a known period replaces numbers, amounts and the prize
    /// breakdown in place; `created_at` and the row id are preserved.
    #[instrument(skip(self, draw), fields(lottery_type_id = draw.lottery_type_id, period = %draw.period))]
    pub fn upsert_draw_result(&self, draw: &FetchedDraw) -> Result<(DrawResult, UpsertOutcome)> {
        let now = now_rfc3339();
        let breakdown = serde_json::to_string(&draw.breakdown)?;
        let draw_date = draw.draw_date.format(DATE_FORMAT).to_string();

        let mut db = self.db.lock().unwrap();
        let tx = db.transaction()?;
        let existing: Option<i64> = match tx.query_row(
            "SELECT id FROM draw_results WHERE lottery_type_id = ?1 AND period = ?2",
            rusqlite::params![draw.lottery_type_id, draw.period],
            |row| row.get(0),
        ) {
            Ok(id) => Some(id),
            Err(rusqlite::Error::QueryReturnedNoRows) => None,
            Err(e) => return Err(StoreError::Database(e)),
        };

        let (id, outcome) = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE draw_results
                     SET results_api_id = ?1, main_numbers = ?2, special_numbers = ?3,
                         draw_date = ?4, sale_amount = ?5, pool_amount = ?6,
                         official_open_date = ?7, deadline = ?8, prize_info = ?9,
                         breakdown = ?10, updated_at = ?11
                     WHERE id = ?12",
                    rusqlite::params![
                        draw.results_api_id,
                        draw.main_numbers,
                        draw.special_numbers,
                        draw_date,
                        draw.sale_amount,
                        draw.pool_amount,
                        draw.official_open_date,
                        draw.deadline,
                        draw.prize_info,
                        breakdown,
                        now,
                        id
                    ],
                )?;
                (id, UpsertOutcome::Updated)
            }
            None => {
                tx.execute(
                    "INSERT INTO draw_results
                     (lottery_type_id, results_api_id, period, main_numbers, special_numbers,
                      draw_date, sale_amount, pool_amount, official_open_date, deadline,
                      prize_info, breakdown, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
                    rusqlite::params![
                        draw.lottery_type_id,
                        draw.results_api_id,
                        draw.period,
                        draw.main_numbers,
                        draw.special_numbers,
                        draw_date,
                        draw.sale_amount,
                        draw.pool_amount,
                        draw.official_open_date,
                        draw.deadline,
                        draw.prize_info,
                        breakdown,
                        now
                    ],
                )?;
                (tx.last_insert_rowid(), UpsertOutcome::Inserted)
            }
        };

        let stored = tx.query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            [id],
            row_to_draw_result,
        )?;
        tx.commit()?;
        debug!(id, ?outcome, "draw result stored");
        Ok((stored, outcome))
    }

    #[instrument(skip(self))]
    pub fn get_draw_result(&self, lottery_type_id: i64, period: &str) -> Result<Option<DrawResult>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!("{SELECT_COLUMNS} WHERE lottery_type_id = ?1 AND period = ?2"),
            rusqlite::params![lottery_type_id, period],
            row_to_draw_result,
        ) {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Most recent stored draw of a lottery.
    #[instrument(skip(self))]
    pub fn latest_draw_result(&self, lottery_type_id: i64) -> Result<Option<DrawResult>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            &format!(
                "{SELECT_COLUMNS} WHERE lottery_type_id = ?1
                 ORDER BY draw_date DESC, period DESC LIMIT 1"
            ),
            [lottery_type_id],
            row_to_draw_result,
        ) {
            Ok(r) => Ok(Some(r)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Database(e)),
        }
    }

    /// Newest draw first. Dates are stored as `YYYY-MM-DD`, so the range
    /// bounds compare as text.
    #[instrument(skip(self))]
    pub fn list_draw_results(
        &self,
        filter: &DrawResultFilter,
        limit: usize,
    ) -> Result<Vec<DrawResult>> {
        let start = filter.start_date.map(|d| d.format(DATE_FORMAT).to_string());
        let end = filter.end_date.map(|d| d.format(DATE_FORMAT).to_string());
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(&format!(
            "{SELECT_COLUMNS}
             WHERE (?1 IS NULL OR lottery_type_id = ?1)
               AND (?2 IS NULL OR period = ?2)
               AND (?3 IS NULL OR draw_date >= ?3)
               AND (?4 IS NULL OR draw_date <= ?4)
             ORDER BY draw_date DESC, period DESC
             LIMIT ?5"
        ))?;
        let rows = stmt.query_map(
            rusqlite::params![filter.lottery_type_id, filter.period, start, end, limit as i64],
            row_to_draw_result,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Number of rows stored for one draw (0 or 1 under the unique key).
    pub fn count_draw_results(&self, lottery_type_id: i64, period: &str) -> Result<usize> {
        let db = self.db.lock().unwrap();
        let n: i64 = db.query_row(
            "SELECT COUNT(*) FROM draw_results WHERE lottery_type_id = ?1 AND period = ?2",
            rusqlite::params![lottery_type_id, period],
            |row| row.get(0),
        )?;
        Ok(n as usize)
    }
}

fn row_to_draw_result(row: &rusqlite::Row<'_>) -> rusqlite::Result<DrawResult> {
    let draw_date: String = row.get(6)?;
    let draw_date =
        NaiveDate::parse_from_str(&draw_date, DATE_FORMAT).map_err(|e| conversion_error(6, e))?;
    let breakdown: String = row.get(12)?;
    let breakdown: Vec<TierPrize> =
        serde_json::from_str(&breakdown).map_err(|e| conversion_error(12, e))?;

    Ok(DrawResult {
        id: row.get(0)?,
        lottery_type_id: row.get(1)?,
        results_api_id: row.get(2)?,
        period: row.get(3)?,
        main_numbers: row.get(4)?,
        special_numbers: row.get(5)?,
        draw_date,
        sale_amount: row.get(7)?,
        pool_amount: row.get(8)?,
        official_open_date: row.get(9)?,
        deadline: row.get(10)?,
        prize_info: row.get(11)?,
        breakdown,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

#[cfg(test)]
mod tests {
    use lotto_core::config::LotteryTypeSeed;

    use super::*;

    fn setup() -> (LotteryStore, i64) {
        let store = LotteryStore::open_in_memory().unwrap();
        let lottery = store
            .upsert_lottery_type(&LotteryTypeSeed {
                code: "tc_dlt".to_string(),
                name: "Super Lotto".to_string(),
                schedule_cron: "0 0 20 * * 1,3,6".to_string(),
                model_name: "gpt-4o-mini".to_string(),
                is_active: true,
                results_api_id: Some(14),
                draw_info_endpoint: None,
            })
            .unwrap();
        (store, lottery.id)
    }

    fn fetched(lottery_type_id: i64, period: &str, date: (i32, u32, u32)) -> FetchedDraw {
        FetchedDraw {
            lottery_type_id,
            results_api_id: Some(14),
            period: period.to_string(),
            main_numbers: "03 05 18 27 40".to_string(),
            special_numbers: "08 12".to_string(),
            draw_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            sale_amount: 300_000_000.0,
            pool_amount: 800_000_000.0,
            official_open_date: None,
            deadline: None,
            prize_info: "[]".to_string(),
            breakdown: vec![TierPrize {
                level: 1,
                add_on: false,
                amount: 10_000_000.0,
                winners: 2,
            }],
        }
    }

    #[test]
    fn refetch_overwrites_in_place() {
        let (store, lid) = setup();
        let (first, outcome) = store
            .upsert_draw_result(&fetched(lid, "24099", (2024, 8, 28)))
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);

        let mut again = fetched(lid, "24099", (2024, 8, 28));
        again.pool_amount = 900_000_000.0;
        again.breakdown[0].winners = 3;
        let (second, outcome) = store.upsert_draw_result(&again).unwrap();

        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.pool_amount, 900_000_000.0);
        assert_eq!(second.breakdown[0].winners, 3);
        assert_eq!(store.count_draw_results(lid, "24099").unwrap(), 1);
    }

    #[test]
    fn latest_orders_by_draw_date() {
        let (store, lid) = setup();
        assert!(store.latest_draw_result(lid).unwrap().is_none());
        store
            .upsert_draw_result(&fetched(lid, "24100", (2024, 8, 31)))
            .unwrap();
        store
            .upsert_draw_result(&fetched(lid, "24099", (2024, 8, 28)))
            .unwrap();

        let latest = store.latest_draw_result(lid).unwrap().unwrap();
        assert_eq!(latest.period, "24100");
        assert_eq!(latest.official_result(), "03 05 18 27 40+08 12");
        let by_lottery = DrawResultFilter {
            lottery_type_id: Some(lid),
            ..Default::default()
        };
        assert_eq!(store.list_draw_results(&by_lottery, 10).unwrap().len(), 2);
        assert!(store.get_draw_result(lid, "23001").unwrap().is_none());
    }

    #[test]
    fn listing_filters_by_period_and_date_range() {
        let (store, lid) = setup();
        for (period, day) in [("24098", 26), ("24099", 28), ("24100", 31)] {
            store
                .upsert_draw_result(&fetched(lid, period, (2024, 8, day)))
                .unwrap();
        }
        let periods = |filter: &DrawResultFilter| -> Vec<String> {
            store
                .list_draw_results(filter, 10)
                .unwrap()
                .into_iter()
                .map(|d| d.period)
                .collect()
        };

        let by_period = DrawResultFilter {
            period: Some("24099".to_string()),
            ..Default::default()
        };
        assert_eq!(periods(&by_period), vec!["24099"]);

        let range = DrawResultFilter {
            lottery_type_id: Some(lid),
            start_date: NaiveDate::from_ymd_opt(2024, 8, 28),
            end_date: NaiveDate::from_ymd_opt(2024, 8, 31),
            ..Default::default()
        };
        assert_eq!(periods(&range), vec!["24100", "24099"]);

        let open_ended = DrawResultFilter {
            end_date: NaiveDate::from_ymd_opt(2024, 8, 27),
            ..Default::default()
        };
        assert_eq!(periods(&open_ended), vec!["24098"]);
    }
}
