//! Proportional breakdown charts.
//!
//! Five charts per run: top securities, portfolio by position, portfolio by
//! category, exposure by sector, exposure by country. The shipped sink
//! renders each series as a proportional horizontal bar breakdown in a text
//! artifact; chart failures are logged per destination and never abort the
//! run.

use std::fmt::Write as _;
use std::path::Path;

use tracing::{error, info};

/// One labeled value series to visualize.
#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub title: String,
    pub slices: Vec<(String, f64)>,
}

impl ChartSeries {
    pub fn new(title: &str, slices: Vec<(String, f64)>) -> Self {
        ChartSeries { title: title.to_string(), slices }
    }
}

pub trait ChartSink {
    fn render(&self, series: &ChartSeries, dest: &Path) -> anyhow::Result<()>;
}

const BAR_WIDTH: usize = 50;

/// Renders a series as proportional unicode bars, largest slice first.
pub struct TextChartSink;

impl TextChartSink {
    fn render_to_string(series: &ChartSeries) -> String {
        let total: f64 = series.slices.iter().map(|(_, v)| v.max(0.0)).sum();
        let label_width = series
            .slices
            .iter()
            .map(|(label, _)| label.chars().count())
            .max()
            .unwrap_or(0);

        let mut slices = series.slices.clone();
        slices.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let mut out = format!("{}\n{}\n", series.title, "=".repeat(series.title.chars().count()));
        for (label, value) in &slices {
            let fraction = if total > 0.0 { value.max(0.0) / total } else { 0.0 };
            let filled = (fraction * BAR_WIDTH as f64).round() as usize;
            let _ = writeln!(
                out,
                "{label:<label_width$}  {:<BAR_WIDTH$}  {:6.2}%",
                "█".repeat(filled.min(BAR_WIDTH)),
                fraction * 100.0
            );
        }
        out
    }
}

impl ChartSink for TextChartSink {
    fn render(&self, series: &ChartSeries, dest: &Path) -> anyhow::Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(dest, Self::render_to_string(series))?;
        Ok(())
    }
}

/// Renders every chart, isolating failures per destination.
pub fn render_all(sink: &dyn ChartSink, charts: &[(ChartSeries, std::path::PathBuf)]) {
    for (series, dest) in charts {
        match sink.render(series, dest) {
            Ok(()) => info!("Wrote chart '{}' to {}", series.title, dest.display()),
            Err(err) => error!("Failed to render chart '{}': {err}", series.title),
        }
    }
}
