use anyhow::{bail, Result};
use chrono::{Datelike, NaiveDate};
use tracing::info;

use crate::models::IndexDailyBar;

/// Parameters of the calendar-rule backtest.
#[derive(Debug, Clone)]
pub struct BacktestParams {
    pub initial_capital: f64,
    /// Proportional fee charged on every Tuesday exit and Wednesday entry.
    pub fee: f64,
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self {
            initial_capital: 100_000.0,
            fee: 0.0003,
        }
    }
}

/// Result of a backtest run, aligned by trading day.
#[derive(Debug, Clone)]
pub struct BacktestReport {
    pub dates: Vec<NaiveDate>,
    /// Strategy equity in currency units.
    pub equity: Vec<f64>,
    /// Index close divided by the first close.
    pub index_norm: Vec<f64>,
    /// Strategy equity divided by the initial capital.
    pub strategy_norm: Vec<f64>,
    pub index_return_pct: f64,
    pub strategy_return_pct: f64,
}

impl BacktestReport {
    pub fn strategy_beats_index(&self) -> bool {
        self.strategy_return_pct > self.index_return_pct
    }

    /// Every `step`-th point of both normalized curves, values rounded to
    /// three decimals. Used to thin the comparison chart's x axis.
    pub fn sampled(&self, step: usize) -> (Vec<NaiveDate>, Vec<f64>, Vec<f64>) {
        let step = step.max(1);
        let round3 = |v: &f64| (v * 1000.0).round() / 1000.0;

        let dates = self.dates.iter().step_by(step).copied().collect();
        let index_vals = self.index_norm.iter().step_by(step).map(round3).collect();
        let strategy_vals = self.strategy_norm.iter().step_by(step).map(round3).collect();
        (dates, index_vals, strategy_vals)
    }
}

/// Run the Tuesday-exit / Wednesday-entry rule over one index's bars.
///
/// Bars must be sorted oldest first. The position starts held; each day the
/// equity is marked from the balance fixed at the last trade day, grown by
/// that day's close-to-close return when holding. Tuesdays flatten the
/// position and Wednesdays re-enter it, each time banking the marked equity
/// less the fee.
pub fn run_weekday_strategy(bars: &[IndexDailyBar], params: &BacktestParams) -> Result<BacktestReport> {
    if bars.is_empty() {
        bail!("Cannot backtest an empty series");
    }
    for window in bars.windows(2) {
        if window[1].trade_date <= window[0].trade_date {
            bail!(
                "Bars out of order: {} does not follow {}",
                window[1].trade_date,
                window[0].trade_date
            );
        }
    }

    let mut remain = params.initial_capital;
    let mut hold = true;
    let mut prev_close: Option<f64> = None;

    let mut dates = Vec::with_capacity(bars.len());
    let mut equity = Vec::with_capacity(bars.len());

    for bar in bars {
        let daily_return = prev_close.map(|prev| bar.close / prev - 1.0);
        prev_close = Some(bar.close);

        let current_value = match daily_return {
            Some(ret) if hold => remain * (1.0 + ret),
            _ => remain,
        };
        dates.push(bar.trade_date);
        equity.push(current_value);

        match bar.trade_date.weekday().number_from_monday() {
            2 => {
                hold = false;
                remain = current_value * (1.0 - params.fee);
            }
            3 => {
                hold = true;
                remain = current_value * (1.0 - params.fee);
            }
            _ => {}
        }
    }

    let first_close = bars[0].close;
    let last_close = bars[bars.len() - 1].close;
    let final_equity = equity[equity.len() - 1];

    let index_norm: Vec<f64> = bars.iter().map(|b| b.close / first_close).collect();
    let strategy_norm: Vec<f64> = equity.iter().map(|v| v / params.initial_capital).collect();

    let report = BacktestReport {
        dates,
        equity,
        index_norm,
        strategy_norm,
        index_return_pct: (last_close / first_close - 1.0) * 100.0,
        strategy_return_pct: (final_equity / params.initial_capital - 1.0) * 100.0,
    };

    info!(
        "Backtest over {} trading days: index {:.2}%, strategy {:.2}%",
        bars.len(),
        report.index_return_pct,
        report.strategy_return_pct
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: NaiveDate, close: f64) -> IndexDailyBar {
        IndexDailyBar {
            ts_code: "000001.SH".to_string(),
            trade_date: date,
            open: close,
            high: close,
            low: close,
            close,
            pre_close: close,
            vol: 0,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_series_rejected() {
        assert!(run_weekday_strategy(&[], &BacktestParams::default()).is_err());
    }

    #[test]
    fn test_unsorted_series_rejected() {
        let bars = vec![bar(day(2020, 1, 3), 100.0), bar(day(2020, 1, 2), 101.0)];
        assert!(run_weekday_strategy(&bars, &BacktestParams::default()).is_err());
    }

    #[test]
    fn test_flat_while_out_of_market() {
        // Mon 2020-01-06 .. Thu 2020-01-09
        let bars = vec![
            bar(day(2020, 1, 6), 100.0),
            bar(day(2020, 1, 7), 110.0), // Tuesday: marked +10%, then exit
            bar(day(2020, 1, 8), 90.0),  // Wednesday: flat, drop not taken; re-enter
            bar(day(2020, 1, 9), 99.0),  // Thursday: +10% while holding
        ];
        let params = BacktestParams {
            initial_capital: 1000.0,
            fee: 0.0,
        };
        let report = run_weekday_strategy(&bars, &params).unwrap();

        assert_eq!(report.equity[0], 1000.0); // first day has no return
        assert!((report.equity[1] - 1100.0).abs() < 1e-9);
        assert!((report.equity[2] - 1100.0).abs() < 1e-9); // flat through Wednesday's fall
        assert!((report.equity[3] - 1210.0).abs() < 1e-9);

        assert!((report.index_return_pct - (-1.0)).abs() < 1e-9);
        assert!((report.strategy_return_pct - 21.0).abs() < 1e-9);
        assert!(report.strategy_beats_index());
    }

    #[test]
    fn test_fee_charged_on_both_trade_days() {
        // Constant price: the only equity change is the fees
        let bars = vec![
            bar(day(2020, 1, 6), 100.0),
            bar(day(2020, 1, 7), 100.0), // Tuesday
            bar(day(2020, 1, 8), 100.0), // Wednesday
            bar(day(2020, 1, 9), 100.0), // Thursday
        ];
        let params = BacktestParams {
            initial_capital: 1000.0,
            fee: 0.01,
        };
        let report = run_weekday_strategy(&bars, &params).unwrap();

        // Equity marks before the day's fee is banked
        assert!((report.equity[1] - 1000.0).abs() < 1e-9);
        assert!((report.equity[2] - 990.0).abs() < 1e-9);
        assert!((report.equity[3] - 980.1).abs() < 1e-9);
    }

    #[test]
    fn test_sampled_steps_and_rounds() {
        let bars: Vec<_> = (0..7)
            .map(|i| bar(day(2020, 1, 6) + chrono::Duration::days(i), 100.0 + i as f64 / 3.0))
            .collect();
        let report = run_weekday_strategy(&bars, &BacktestParams::default()).unwrap();

        let (dates, index_vals, strategy_vals) = report.sampled(3);
        assert_eq!(dates.len(), 3);
        assert_eq!(dates[1], day(2020, 1, 9));
        assert_eq!(index_vals[1], 1.01); // 101/100 rounded to 3 decimals
        assert_eq!(strategy_vals.len(), 3);
    }
}
