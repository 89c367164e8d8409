use crate::models::{IndexSpec, WeekdayReturn};

/// X-axis labels for the seasonality chart.
pub const WEEKDAY_LABELS: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

/// One chart series: an index's average return for each trading weekday.
/// A weekday with no data in the table is a gap (None).
#[derive(Debug, Clone, PartialEq)]
pub struct WeekdaySeries {
    pub name: String,
    pub values: [Option<f64>; 5],
}

/// Reshape aggregation rows into one series per requested index, in the order
/// the indexes were requested. Rows for codes outside `indexes` are ignored,
/// as are Saturday/Sunday rows (possible if holiday make-up sessions land on
/// a weekend).
pub fn weekday_series(rows: &[WeekdayReturn], indexes: &[IndexSpec]) -> Vec<WeekdaySeries> {
    indexes
        .iter()
        .map(|spec| {
            let mut values = [None; 5];
            for row in rows.iter().filter(|r| r.ts_code == spec.ts_code) {
                if (1..=5).contains(&row.day_of_week) {
                    values[(row.day_of_week - 1) as usize] = Some(row.avg_return);
                }
            }
            WeekdaySeries {
                name: spec.name.to_string(),
                values,
            }
        })
        .collect()
}
