use anyhow::Result;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;

use crate::models::{IndexDailyBar, WeekdayReturn};

#[derive(Clone)]
pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    /// Open (creating if missing) the database and ensure the schema exists
    pub async fn new(database_path: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(
                SqliteConnectOptions::new()
                    .filename(database_path)
                    .create_if_missing(true),
            )
            .await?;

        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS index_daily (
                ts_code TEXT NOT NULL,
                trade_date DATE NOT NULL,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                pre_close REAL NOT NULL,
                vol INTEGER NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (ts_code, trade_date)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_index_daily_date ON index_daily(trade_date)",
        )
        .execute(&pool)
        .await?;

        info!("Database initialized at {}", database_path);
        Ok(Self { pool })
    }

    /// Insert daily bars, replacing any previously stored row for the same
    /// (ts_code, trade_date). Returns the number of rows written.
    pub async fn insert_daily_bars(&self, bars: &[IndexDailyBar]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;

        for bar in bars {
            sqlx::query(
                r#"
                INSERT INTO index_daily (ts_code, trade_date, open, high, low, close, pre_close, vol)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(ts_code, trade_date) DO UPDATE SET
                    open = excluded.open,
                    high = excluded.high,
                    low = excluded.low,
                    close = excluded.close,
                    pre_close = excluded.pre_close,
                    vol = excluded.vol
                "#,
            )
            .bind(&bar.ts_code)
            .bind(bar.trade_date)
            .bind(bar.open)
            .bind(bar.high)
            .bind(bar.low)
            .bind(bar.close)
            .bind(bar.pre_close)
            .bind(bar.vol)
            .execute(&mut tx)
            .await?;
        }

        tx.commit().await?;
        Ok(bars.len())
    }

    /// Average daily return per (index, day of week), ordered by index then day.
    /// Day of week is 1 = Monday .. 7 = Sunday; only trading days appear.
    pub async fn weekday_avg_returns(&self) -> Result<Vec<WeekdayReturn>> {
        let rows = sqlx::query(
            r#"
            SELECT
                ts_code,
                (CAST(strftime('%w', trade_date) AS INTEGER) + 6) % 7 + 1 AS day_of_week,
                AVG((close - pre_close) / pre_close) AS avg_return
            FROM index_daily
            GROUP BY ts_code, day_of_week
            ORDER BY ts_code, day_of_week
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            results.push(WeekdayReturn {
                ts_code: row.get::<String, _>("ts_code"),
                day_of_week: row.get::<i64, _>("day_of_week") as u32,
                avg_return: row.get::<f64, _>("avg_return"),
            });
        }

        Ok(results)
    }

    /// Get all stored bars for an index, oldest first
    pub async fn get_daily_bars(&self, ts_code: &str) -> Result<Vec<IndexDailyBar>> {
        let rows = sqlx::query(
            r#"
            SELECT ts_code, trade_date, open, high, low, close, pre_close, vol
            FROM index_daily
            WHERE ts_code = ?
            ORDER BY trade_date ASC
            "#,
        )
        .bind(ts_code)
        .fetch_all(&self.pool)
        .await?;

        let mut bars = Vec::with_capacity(rows.len());
        for row in rows {
            bars.push(IndexDailyBar {
                ts_code: row.get("ts_code"),
                trade_date: row.get::<NaiveDate, _>("trade_date"),
                open: row.get("open"),
                high: row.get("high"),
                low: row.get("low"),
                close: row.get("close"),
                pre_close: row.get("pre_close"),
                vol: row.get("vol"),
            });
        }

        Ok(bars)
    }

    /// Total bar count and distinct index count
    pub async fn get_stats(&self) -> Result<(usize, usize)> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS bars, COUNT(DISTINCT ts_code) AS indexes FROM index_daily",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok((
            row.get::<i64, _>("bars") as usize,
            row.get::<i64, _>("indexes") as usize,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn bar(ts_code: &str, date: NaiveDate, close: f64, pre_close: f64) -> IndexDailyBar {
        IndexDailyBar {
            ts_code: ts_code.to_string(),
            trade_date: date,
            open: pre_close,
            high: close.max(pre_close),
            low: close.min(pre_close),
            close,
            pre_close,
            vol: 1_000_000,
        }
    }

    async fn test_db() -> (tempfile::TempDir, DatabaseManager) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = DatabaseManager::new(path.to_str().unwrap()).await.unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let (_dir, db) = test_db().await;
        let date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();

        let bars = vec![bar("000001.SH", date, 3085.2, 3050.12)];
        db.insert_daily_bars(&bars).await.unwrap();
        db.insert_daily_bars(&bars).await.unwrap();

        let (count, indexes) = db.get_stats().await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(indexes, 1);
    }

    #[tokio::test]
    async fn test_weekday_avg_returns() {
        let (_dir, db) = test_db().await;

        // 2020-01-06 is a Monday, 2020-01-07 a Tuesday
        let monday1 = NaiveDate::from_ymd_opt(2020, 1, 6).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2020, 1, 7).unwrap();
        let monday2 = NaiveDate::from_ymd_opt(2020, 1, 13).unwrap();

        db.insert_daily_bars(&[
            bar("000001.SH", monday1, 102.0, 100.0), // +2%
            bar("000001.SH", tuesday, 101.0, 102.0), // ~-0.98%
            bar("000001.SH", monday2, 104.0, 100.0), // +4%
        ])
        .await
        .unwrap();

        let rows = db.weekday_avg_returns().await.unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].day_of_week, 1);
        assert!((rows[0].avg_return - 0.03).abs() < 1e-9); // mean of +2% and +4%

        assert_eq!(rows[1].day_of_week, 2);
        assert!((rows[1].avg_return - (101.0 - 102.0) / 102.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_get_daily_bars_ordered_oldest_first() {
        let (_dir, db) = test_db().await;

        let d1 = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2020, 1, 3).unwrap();

        // Insert newest first, as Tushare returns them
        db.insert_daily_bars(&[
            bar("000001.SH", d2, 3083.79, 3085.2),
            bar("000001.SH", d1, 3085.2, 3050.12),
            bar("399001.SZ", d1, 10638.82, 10430.7),
        ])
        .await
        .unwrap();

        let bars = db.get_daily_bars("000001.SH").await.unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].trade_date, d1);
        assert_eq!(bars[1].trade_date, d2);
    }
}
