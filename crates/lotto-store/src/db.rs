use rusqlite::Connection;

use crate::error::Result;

/// Initialise all tables and indexes.
///
/// Safe to call on every startup: uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS lottery_types (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            code               TEXT    NOT NULL UNIQUE,
            name               TEXT    NOT NULL,
            schedule_cron      TEXT    NOT NULL,
            model_name         TEXT    NOT NULL,
            is_active          INTEGER NOT NULL DEFAULT 1,
            results_api_id     INTEGER,            -- NULL disables result fetching
            draw_info_endpoint TEXT,
            created_at         TEXT    NOT NULL,
            updated_at         TEXT    NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recommendations (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            lottery_type_id    INTEGER NOT NULL REFERENCES lottery_types(id),
            numbers            TEXT    NOT NULL,
            model_name         TEXT    NOT NULL,
            target_period      TEXT    NOT NULL,
            expected_draw_time TEXT    NOT NULL,   -- RFC 3339 with offset
            is_purchased       INTEGER NOT NULL DEFAULT 0,
            official_result    TEXT,
            win_tier           TEXT,               -- NULL until analyzed
            win_amount         REAL    NOT NULL DEFAULT 0,
            created_at         TEXT    NOT NULL,
            updated_at         TEXT    NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_recommendations_period
            ON recommendations(lottery_type_id, target_period);

        CREATE TABLE IF NOT EXISTS draw_results (
            id                 INTEGER PRIMARY KEY AUTOINCREMENT,
            lottery_type_id    INTEGER NOT NULL REFERENCES lottery_types(id),
            results_api_id     INTEGER,
            period             TEXT    NOT NULL,
            main_numbers       TEXT    NOT NULL,
            special_numbers    TEXT    NOT NULL,
            draw_date          TEXT    NOT NULL,   -- YYYY-MM-DD
            sale_amount        REAL    NOT NULL DEFAULT 0,
            pool_amount        REAL    NOT NULL DEFAULT 0,
            official_open_date TEXT,
            deadline           TEXT,
            prize_info         TEXT    NOT NULL DEFAULT '[]',  -- provider JSON
            breakdown          TEXT    NOT NULL DEFAULT '[]',  -- JSON Vec<TierPrize>
            created_at         TEXT    NOT NULL,
            updated_at         TEXT    NOT NULL,
            UNIQUE (lottery_type_id, period)
        );
        CREATE INDEX IF NOT EXISTS idx_draw_results_latest
            ON draw_results(lottery_type_id, draw_date DESC);",
    )?;
    Ok(())
}
