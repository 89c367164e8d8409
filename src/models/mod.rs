use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A stock index tracked by the pipeline: Tushare code plus display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub ts_code: &'static str,
    pub name: &'static str,
}

/// The five headline indexes analyzed by default.
pub const DEFAULT_INDEXES: &[IndexSpec] = &[
    IndexSpec { ts_code: "000001.SH", name: "SSE Composite" },
    IndexSpec { ts_code: "399001.SZ", name: "SZSE Component" },
    IndexSpec { ts_code: "000016.SH", name: "SSE 50" },
    IndexSpec { ts_code: "000300.SH", name: "CSI 300" },
    IndexSpec { ts_code: "000905.SH", name: "CSI 500" },
];

/// One daily bar of an index as returned by the data provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexDailyBar {
    pub ts_code: String,
    pub trade_date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub pre_close: f64,
    pub vol: i64,
}

/// One row of the day-of-week aggregation: average daily return of an index
/// on a given weekday (1 = Monday .. 5 = Friday for trading days).
#[derive(Debug, Clone, PartialEq)]
pub struct WeekdayReturn {
    pub ts_code: String,
    pub day_of_week: u32,
    pub avg_return: f64,
}

/// Configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub tushare_token: String,
    pub database_path: String,
    pub output_dir: String,
    pub rate_limit_per_minute: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Ok(Config {
            tushare_token: std::env::var("TUSHARE_TOKEN")
                .map_err(|_| anyhow::anyhow!("TUSHARE_TOKEN environment variable required"))?,
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "index_daily.db".to_string()),
            output_dir: std::env::var("OUTPUT_DIR")
                .unwrap_or_else(|_| "output".to_string()),
            rate_limit_per_minute: std::env::var("RATE_LIMIT_PER_MINUTE")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap_or(120),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_indexes() {
        assert_eq!(DEFAULT_INDEXES.len(), 5);
        assert_eq!(DEFAULT_INDEXES[0].ts_code, "000001.SH");
        assert!(DEFAULT_INDEXES
            .iter()
            .all(|i| i.ts_code.ends_with(".SH") || i.ts_code.ends_with(".SZ")));
    }

    #[test]
    fn test_config_from_env() {
        std::env::set_var("TUSHARE_TOKEN", "test_token");
        std::env::remove_var("DATABASE_PATH");
        std::env::remove_var("RATE_LIMIT_PER_MINUTE");

        let config = Config::from_env().unwrap();
        assert_eq!(config.tushare_token, "test_token");
        assert_eq!(config.database_path, "index_daily.db");
        assert_eq!(config.rate_limit_per_minute, 120); // default value
    }
}
