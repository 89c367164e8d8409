use anyhow::Result;
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{error, info};

use crate::api::IndexDataProvider;
use crate::database::DatabaseManager;
use crate::models::IndexSpec;

/// Fetches index daily bars from a provider and stores them.
pub struct IndexCollector<P: IndexDataProvider> {
    provider: Arc<P>,
    database: DatabaseManager,
}

/// Outcome of a collection run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionReport {
    pub bars_stored: usize,
    pub indexes_loaded: usize,
    pub failed_codes: Vec<String>,
}

impl<P: IndexDataProvider> IndexCollector<P> {
    pub fn new(provider: P, database: DatabaseManager) -> Self {
        Self {
            provider: Arc::new(provider),
            database,
        }
    }

    /// Fetch and store daily bars for each index over the date range. A
    /// failed fetch is logged and the remaining indexes still load.
    pub async fn collect(
        &self,
        indexes: &[IndexSpec],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<CollectionReport> {
        let mut report = CollectionReport::default();

        for spec in indexes {
            match self
                .provider
                .get_index_daily(spec.ts_code, start_date, end_date)
                .await
            {
                Ok(bars) => {
                    let stored = self.database.insert_daily_bars(&bars).await?;
                    info!("Stored {} bars for {} ({})", stored, spec.ts_code, spec.name);
                    report.bars_stored += stored;
                    report.indexes_loaded += 1;
                }
                Err(e) => {
                    error!("Failed to fetch {}: {}", spec.ts_code, e);
                    report.failed_codes.push(spec.ts_code.to_string());
                }
            }
        }

        Ok(report)
    }
}
