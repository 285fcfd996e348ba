pub mod aggregate;
pub mod chart;
pub mod config;
pub mod download;
pub mod error;
pub mod fund;
pub mod log;
pub mod lookthrough;
pub mod portfolio;
pub mod price_provider;
pub mod pricing;
pub mod providers;
pub mod report;
pub mod summary;
pub mod ticker;
pub mod ui;

use std::time::Instant;

use anyhow::Result;
use tracing::{info, warn};

use crate::chart::{ChartSeries, ChartSink, TextChartSink};
use crate::report::{CsvReportSink, ReportSink};

pub async fn run(config_path: Option<&str>) -> Result<()> {
    info!("Look-through analysis starting...");
    let started = Instant::now();

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };

    let report_sink = CsvReportSink::new(&config.report_dir);
    let chart_sink = TextChartSink;
    run_pipeline(&config, &report_sink, &chart_sink).await?;

    info!("Run finished in {:.2}s", started.elapsed().as_secs_f64());
    Ok(())
}

/// The whole batch pipeline, parameterized over the sinks so tests can
/// substitute their own.
pub async fn run_pipeline(
    config: &config::AppConfig,
    report_sink: &dyn ReportSink,
    chart_sink: &dyn ChartSink,
) -> Result<()> {
    let client = reqwest::Client::new();

    // Stage 0: refresh fund exports, then read and clean every export in the
    // fund directory (manually placed files count too).
    download::refresh_fund_files(&client, &config.funds, &config.fund_dir, config.max_age_days)
        .await;
    let mut constituents = Vec::new();
    for path in fund_files(&config.fund_dir) {
        constituents.extend(fund::read_fund_csv(&path, config.fund_skip_rows)?);
    }

    let mut positions = portfolio::load_portfolio(&config.portfolio_file)?;

    // Stage 1+2: price every ticker concurrently, merge at one sync point.
    let base_url = config
        .providers
        .yahoo
        .as_ref()
        .map_or("https://query1.finance.yahoo.com", |p| &p.base_url);
    let provider = providers::yahoo_finance::YahooFinanceProvider::new(base_url);
    let (prices, mut misses) = pricing::fetch_prices(
        &positions,
        &provider,
        &config.stock_suffixes,
        &config.crypto_suffixes,
    )
    .await;
    portfolio::apply_prices(&mut positions, &prices);
    for position in portfolio::unpriced(&positions) {
        warn!("Position '{}' has no market value this run", position.label);
    }

    // Stage 3+4: look-through weighting, then consolidation.
    let weighting = lookthrough::weight_constituents(constituents, &positions)?;
    misses.extend(weighting.misses.iter().cloned());
    let exposure = lookthrough::consolidate(&weighting.rows, &positions);

    // Stage 5: the four aggregate views.
    let securities = aggregate::by_security(&exposure);
    let sectors = aggregate::by_sector(&exposure);
    let countries = aggregate::by_country(&exposure);
    let funds = aggregate::by_fund(&exposure);

    println!("{}", summary::securities_table(&securities));
    ui::print_separator();
    println!("{}", summary::aggregate_table("Exposure by sector", "Sector", &sectors));
    ui::print_separator();
    println!("{}", summary::aggregate_table("Exposure by country", "Country", &countries));
    ui::print_separator();
    println!("{}", summary::aggregate_table("Exposure by fund", "Fund", &funds));
    println!("\n{}", summary::run_footer(&weighting.summary, &misses));

    let sheets = [
        report::positions_sheet(&positions),
        report::exposure_sheet(&exposure),
        report::securities_sheet(&securities),
        report::aggregate_sheet("sectors", "Sector", &sectors),
        report::aggregate_sheet("countries", "Country", &countries),
        report::aggregate_sheet("funds", "Fund", &funds),
    ];
    let failed = report_sink
        .write(&sheets)
        .into_iter()
        .filter(|o| o.error.is_some())
        .count();
    if failed > 0 {
        warn!("{failed} report sheet(s) could not be written");
    }

    chart::render_all(chart_sink, &build_charts(config, &positions, &securities, &sectors, &countries));
    Ok(())
}

/// CSV files in the fund directory, sorted for a deterministic read order.
fn fund_files(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
        .collect();
    paths.sort();
    paths
}

fn build_charts(
    config: &config::AppConfig,
    positions: &[portfolio::Position],
    securities: &[aggregate::SecurityRow],
    sectors: &[aggregate::AggregateRow],
    countries: &[aggregate::AggregateRow],
) -> Vec<(ChartSeries, std::path::PathBuf)> {
    // Top-N securities, with the tail collapsed into one remainder slice.
    let mut top: Vec<(String, f64)> = securities
        .iter()
        .take(config.chart_top_n)
        .map(|s| (s.name.clone(), s.weight))
        .collect();
    let shown: f64 = top.iter().map(|(_, w)| w).sum();
    let total: f64 = securities.iter().map(|s| s.weight).sum();
    if total - shown > 1e-9 {
        top.push(("Other".to_string(), total - shown));
    }

    let by_position: Vec<(String, f64)> = positions
        .iter()
        .filter_map(|p| p.value_share.map(|share| (p.label.clone(), share)))
        .collect();

    let mut by_category: Vec<(String, f64)> = Vec::new();
    for position in positions {
        let Some(share) = position.value_share else { continue };
        let key = position.class.label().to_string();
        match by_category.iter_mut().find(|(k, _)| *k == key) {
            Some((_, weight)) => *weight += share,
            None => by_category.push((key, share)),
        }
    }

    let slices = |rows: &[aggregate::AggregateRow]| {
        rows.iter().map(|r| (r.key.clone(), r.weight)).collect::<Vec<_>>()
    };

    let dir = &config.charts_dir;
    vec![
        (
            ChartSeries::new(&format!("Top {} securities", config.chart_top_n), top),
            dir.join("1-top-securities.txt"),
        ),
        (ChartSeries::new("Portfolio by position", by_position), dir.join("2-by-position.txt")),
        (ChartSeries::new("Portfolio by category", by_category), dir.join("3-by-category.txt")),
        (ChartSeries::new("Exposure by sector", slices(sectors)), dir.join("4-by-sector.txt")),
        (ChartSeries::new("Exposure by country", slices(countries)), dir.join("5-by-country.txt")),
    ]
}
