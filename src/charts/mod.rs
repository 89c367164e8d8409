use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

/// Standalone HTML page wrapping a single ECharts canvas. The option object
/// is injected as JSON.
const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>__TITLE__</title>
  <script src="https://cdn.jsdelivr.net/npm/echarts@5/dist/echarts.min.js"></script>
  <style>
    body { margin: 0; font-family: sans-serif; }
    #chart { width: 80%; height: 600px; margin: 24px auto; }
  </style>
</head>
<body>
  <div id="chart"></div>
  <script>
    var chart = echarts.init(document.getElementById('chart'));
    chart.setOption(__OPTION__);
  </script>
</body>
</html>
"#;

/// Builder for a line chart with a category x axis.
#[derive(Debug, Clone, Default)]
pub struct LineChart {
    title: String,
    x_labels: Vec<String>,
    x_axis_name: Option<String>,
    y_axis_name: Option<String>,
    series: Vec<(String, Vec<Option<f64>>)>,
}

impl LineChart {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn x_labels(mut self, labels: Vec<String>) -> Self {
        self.x_labels = labels;
        self
    }

    pub fn x_axis_name(mut self, name: impl Into<String>) -> Self {
        self.x_axis_name = Some(name.into());
        self
    }

    pub fn y_axis_name(mut self, name: impl Into<String>) -> Self {
        self.y_axis_name = Some(name.into());
        self
    }

    /// Add a named series. `None` values render as gaps.
    pub fn add_series(mut self, name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        self.series.push((name.into(), values));
        self
    }

    /// The ECharts option object for this chart.
    pub fn to_option(&self) -> Value {
        let series: Vec<Value> = self
            .series
            .iter()
            .map(|(name, values)| {
                json!({
                    "name": name,
                    "type": "line",
                    "label": { "show": false },
                    "data": values,
                })
            })
            .collect();

        json!({
            "title": { "text": self.title, "left": "center" },
            "tooltip": { "trigger": "axis" },
            "legend": {
                "top": "8%",
                "data": self.series.iter().map(|(name, _)| name.clone()).collect::<Vec<_>>(),
            },
            "xAxis": {
                "type": "category",
                "name": self.x_axis_name,
                "data": self.x_labels,
            },
            "yAxis": {
                "type": "value",
                "name": self.y_axis_name,
            },
            "series": series,
        })
    }

    /// Render the chart as a complete HTML document.
    pub fn render_html(&self) -> String {
        PAGE_TEMPLATE
            .replace("__TITLE__", &html_escape(&self.title))
            .replace("__OPTION__", &self.to_option().to_string())
    }

    /// Write the rendered chart to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, self.render_html())
            .with_context(|| format!("Failed to write chart to {}", path.display()))?;

        info!("Chart written to {}", path.display());
        Ok(())
    }
}

fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chart() -> LineChart {
        LineChart::new("Weekday averages")
            .x_labels(vec!["Monday".to_string(), "Tuesday".to_string()])
            .y_axis_name("Average return")
            .add_series("SSE Composite", vec![Some(0.001), None])
    }

    #[test]
    fn test_option_shape() {
        let option = sample_chart().to_option();

        assert_eq!(option["title"]["text"], "Weekday averages");
        assert_eq!(option["xAxis"]["data"][1], "Tuesday");
        assert_eq!(option["series"][0]["name"], "SSE Composite");
        assert_eq!(option["series"][0]["data"][0], 0.001);
        assert!(option["series"][0]["data"][1].is_null());
        assert_eq!(option["series"][0]["label"]["show"], false);
    }

    #[test]
    fn test_render_html_embeds_option() {
        let html = sample_chart().render_html();
        assert!(html.contains("echarts.init"));
        assert!(html.contains("\"SSE Composite\""));
        assert!(html.contains("<title>Weekday averages</title>"));
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chart.html");

        sample_chart().save(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("echarts"));
    }
}
