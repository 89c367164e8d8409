use anyhow::Result;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::models::{Config, IndexDailyBar};
use super::{ApiRateLimiter, IndexDataProvider};

const TUSHARE_API_URL: &str = "http://api.tushare.pro";

/// Fields requested from the index_daily API.
const INDEX_DAILY_FIELDS: &str = "ts_code,trade_date,open,high,low,close,pre_close,vol";

/// Failure modes of the Tushare Pro API
#[derive(Debug, thiserror::Error)]
pub enum TushareError {
    #[error("Tushare API error (code {code}): {msg}")]
    Api { code: i64, msg: String },
    #[error("Tushare response missing field '{0}'")]
    MissingField(String),
    #[error("Tushare response malformed: {0}")]
    Malformed(String),
}

/// Request body for the Tushare Pro HTTP API
#[derive(Debug, Serialize)]
struct TushareRequest<'a> {
    api_name: &'a str,
    token: &'a str,
    params: Value,
    fields: &'a str,
}

/// Top-level Tushare Pro response envelope
#[derive(Debug, Deserialize)]
struct TushareResponse {
    code: i64,
    msg: Option<String>,
    data: Option<TushareData>,
}

/// Column-oriented payload: field names plus rows of values
#[derive(Debug, Deserialize)]
struct TushareData {
    fields: Vec<String>,
    items: Vec<Vec<Value>>,
}

/// Tushare Pro API client
pub struct TushareClient {
    client: Client,
    token: String,
    base_url: String,
    rate_limiter: ApiRateLimiter,
}

impl TushareClient {
    /// Create a new Tushare client
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_base_url(config, TUSHARE_API_URL)
    }

    /// Create a client against a non-default endpoint (used by tests)
    pub fn with_base_url(config: &Config, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("weekday-effect/0.1")
            .build()?;

        Ok(Self {
            client,
            token: config.tushare_token.clone(),
            base_url: base_url.to_string(),
            rate_limiter: ApiRateLimiter::new(config.rate_limit_per_minute),
        })
    }

    /// Call a Tushare API and return the decoded column payload
    async fn call(&self, api_name: &str, params: Value, fields: &str) -> Result<TushareData> {
        let request = TushareRequest {
            api_name,
            token: &self.token,
            params,
            fields,
        };

        self.rate_limiter.wait().await;

        debug!("Calling Tushare API '{}'", api_name);

        let response = self.client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            anyhow::bail!("Tushare request failed with status {}: {}", status, error_text);
        }

        let envelope: TushareResponse = response.json().await?;
        if envelope.code != 0 {
            return Err(TushareError::Api {
                code: envelope.code,
                msg: envelope.msg.unwrap_or_else(|| "unknown error".to_string()),
            }
            .into());
        }

        envelope
            .data
            .ok_or_else(|| TushareError::Malformed("missing data section".to_string()).into())
    }
}

/// Decode the column-oriented payload into daily bars.
fn decode_daily_bars(data: TushareData) -> Result<Vec<IndexDailyBar>> {
    let columns: HashMap<&str, usize> = data
        .fields
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    let col = |name: &str| -> Result<usize, TushareError> {
        columns
            .get(name)
            .copied()
            .ok_or_else(|| TushareError::MissingField(name.to_string()))
    };

    let ts_code_col = col("ts_code")?;
    let trade_date_col = col("trade_date")?;
    let open_col = col("open")?;
    let high_col = col("high")?;
    let low_col = col("low")?;
    let close_col = col("close")?;
    let pre_close_col = col("pre_close")?;
    let vol_col = col("vol")?;

    let get_str = |row: &[Value], idx: usize| -> Result<String, TushareError> {
        row.get(idx)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| TushareError::Malformed(format!("non-string value in column {}", idx)))
    };
    let get_f64 = |row: &[Value], idx: usize| -> Result<f64, TushareError> {
        row.get(idx)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| TushareError::Malformed(format!("non-numeric value in column {}", idx)))
    };

    let mut bars = Vec::with_capacity(data.items.len());
    for row in &data.items {
        let trade_date_raw = get_str(row, trade_date_col)?;
        let trade_date = NaiveDate::parse_from_str(&trade_date_raw, "%Y%m%d")
            .map_err(|_| TushareError::Malformed(format!("bad trade_date '{}'", trade_date_raw)))?;

        bars.push(IndexDailyBar {
            ts_code: get_str(row, ts_code_col)?,
            trade_date,
            open: get_f64(row, open_col)?,
            high: get_f64(row, high_col)?,
            low: get_f64(row, low_col)?,
            close: get_f64(row, close_col)?,
            pre_close: get_f64(row, pre_close_col)?,
            // Tushare reports volume in lots as a float
            vol: get_f64(row, vol_col)?.round() as i64,
        });
    }

    Ok(bars)
}

#[async_trait::async_trait]
impl IndexDataProvider for TushareClient {
    /// Get daily bars for an index over a date range (newest first, as Tushare returns them)
    async fn get_index_daily(
        &self,
        ts_code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<IndexDailyBar>> {
        let params = json!({
            "ts_code": ts_code,
            "start_date": start_date.format("%Y%m%d").to_string(),
            "end_date": end_date.format("%Y%m%d").to_string(),
        });

        let data = self.call("index_daily", params, INDEX_DAILY_FIELDS).await?;
        let bars = decode_daily_bars(data)?;

        info!("Retrieved {} daily bars for {} from {} to {}",
              bars.len(), ts_code, start_date, end_date);
        Ok(bars)
    }
}
