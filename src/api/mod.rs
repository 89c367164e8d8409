use anyhow::Result;
use chrono::NaiveDate;
use std::time::Duration;

use crate::models::IndexDailyBar;

pub mod tushare_client;
pub use tushare_client::TushareClient;

/// Simple rate limiter for API requests
pub struct ApiRateLimiter {
    delay_ms: u64,
}

impl ApiRateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        let delay_ms = if requests_per_minute > 0 {
            60_000 / requests_per_minute as u64
        } else {
            1000 // Default 1 second delay
        };

        Self { delay_ms }
    }

    pub async fn wait(&self) {
        tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
    }
}

/// Common trait for index data providers
#[async_trait::async_trait]
pub trait IndexDataProvider {
    async fn get_index_daily(
        &self,
        ts_code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<IndexDailyBar>>;
}
