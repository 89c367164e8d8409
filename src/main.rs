use anyhow::{bail, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

use weekday_effect::analysis::{weekday_series, WEEKDAY_LABELS};
use weekday_effect::api::TushareClient;
use weekday_effect::backtest::{run_weekday_strategy, BacktestParams};
use weekday_effect::charts::LineChart;
use weekday_effect::collector::IndexCollector;
use weekday_effect::database::DatabaseManager;
use weekday_effect::models::{Config, DEFAULT_INDEXES};

const WEEKDAY_CHART_FILE: &str = "weekday_returns.html";
const BACKTEST_CHART_FILE: &str = "strategy_vs_index.html";

#[derive(Parser)]
#[command(name = "weekday-effect", about = "Day-of-week seasonality analysis of Chinese index daily bars")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch index daily bars into the database
    Fetch {
        #[arg(long, value_parser = parse_date, default_value = "2020-01-01")]
        start: NaiveDate,
        #[arg(long, value_parser = parse_date, default_value = "2024-12-31")]
        end: NaiveDate,
    },
    /// Render the average-weekday-return chart from stored bars
    Seasonality,
    /// Backtest the sell-Tuesday / buy-Wednesday rule against buy-and-hold
    Backtest {
        /// Index to trade
        #[arg(long, default_value = "000001.SH")]
        code: String,
        #[arg(long, default_value_t = 100_000.0)]
        capital: f64,
        #[arg(long, default_value_t = 0.0003)]
        fee: f64,
        /// Chart one point per this many trading days
        #[arg(long, default_value_t = 30)]
        sample_step: usize,
    },
    /// Run the whole pipeline: fetch, seasonality chart, backtest chart
    Run {
        #[arg(long, value_parser = parse_date, default_value = "2020-01-01")]
        start: NaiveDate,
        #[arg(long, value_parser = parse_date, default_value = "2024-12-31")]
        end: NaiveDate,
    },
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| format!("invalid date '{}': {}", s, e))
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let database = DatabaseManager::new(&config.database_path).await?;

    match cli.command {
        Command::Fetch { start, end } => {
            fetch(&config, &database, start, end).await?;
        }
        Command::Seasonality => {
            render_seasonality(&config, &database).await?;
        }
        Command::Backtest { code, capital, fee, sample_step } => {
            let params = BacktestParams {
                initial_capital: capital,
                fee,
            };
            run_backtest(&config, &database, &code, &params, sample_step).await?;
        }
        Command::Run { start, end } => {
            fetch(&config, &database, start, end).await?;
            render_seasonality(&config, &database).await?;
            run_backtest(&config, &database, "000001.SH", &BacktestParams::default(), 30).await?;
        }
    }

    Ok(())
}

async fn fetch(
    config: &Config,
    database: &DatabaseManager,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<()> {
    if start > end {
        bail!("Start date {} is after end date {}", start, end);
    }

    info!("Fetching {} indexes from {} to {}", DEFAULT_INDEXES.len(), start, end);
    let client = TushareClient::new(config)?;
    let collector = IndexCollector::new(client, database.clone());
    let report = collector.collect(DEFAULT_INDEXES, start, end).await?;

    println!(
        "Loaded {} bars across {} indexes",
        report.bars_stored, report.indexes_loaded
    );
    if !report.failed_codes.is_empty() {
        println!("Failed to fetch: {}", report.failed_codes.join(", "));
    }
    Ok(())
}

async fn render_seasonality(config: &Config, database: &DatabaseManager) -> Result<()> {
    let rows = database.weekday_avg_returns().await?;
    if rows.is_empty() {
        bail!("No bars in the database; run `weekday-effect fetch` first");
    }

    let mut chart = LineChart::new("Average weekday return, five major indexes")
        .x_labels(WEEKDAY_LABELS.iter().map(|s| s.to_string()).collect())
        .x_axis_name("Weekday")
        .y_axis_name("Average return");

    for series in weekday_series(&rows, DEFAULT_INDEXES) {
        chart = chart.add_series(series.name, series.values.to_vec());
    }

    let path = Path::new(&config.output_dir).join(WEEKDAY_CHART_FILE);
    chart.save(&path)?;
    println!("Weekday-return chart written to {}", path.display());
    Ok(())
}

async fn run_backtest(
    config: &Config,
    database: &DatabaseManager,
    code: &str,
    params: &BacktestParams,
    sample_step: usize,
) -> Result<()> {
    let bars = database.get_daily_bars(code).await?;
    if bars.is_empty() {
        bail!("No bars stored for {}; run `weekday-effect fetch` first", code);
    }

    let report = run_weekday_strategy(&bars, params)?;
    let (dates, index_vals, strategy_vals) = report.sampled(sample_step);

    let index_name = DEFAULT_INDEXES
        .iter()
        .find(|spec| spec.ts_code == code)
        .map(|spec| spec.name)
        .unwrap_or(code);

    let chart = LineChart::new(format!("{} vs sell-Tuesday / buy-Wednesday strategy", index_name))
        .x_labels(dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect())
        .y_axis_name("Normalized value (start = 1)")
        .add_series(index_name, index_vals.into_iter().map(Some).collect())
        .add_series(
            "Sell-Tue / buy-Wed strategy",
            strategy_vals.into_iter().map(Some).collect(),
        );

    let path = Path::new(&config.output_dir).join(BACKTEST_CHART_FILE);
    chart.save(&path)?;

    println!("Backtest over {} trading days ({} .. {})",
             bars.len(), bars[0].trade_date, bars[bars.len() - 1].trade_date);
    println!("{} total return:      {:.2}%", index_name, report.index_return_pct);
    println!("Strategy total return: {:.2}%", report.strategy_return_pct);
    println!(
        "Strategy beats index:  {}",
        if report.strategy_beats_index() { "yes" } else { "no" }
    );
    println!("Comparison chart written to {}", path.display());
    Ok(())
}
