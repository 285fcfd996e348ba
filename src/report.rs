//! Multi-sheet report output.
//!
//! The run emits six named sheets: raw positions, consolidated exposure, and
//! the four aggregates. Sheet writes are independent; one failed sheet never
//! blocks the others.

use std::path::PathBuf;

use tracing::{error, info};

use crate::aggregate::{AggregateRow, SecurityRow};
use crate::lookthrough::ExposureRow;
use crate::portfolio::Position;

/// One named tabular output.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    fn new(name: &str, header: &[&str]) -> Self {
        Sheet {
            name: name.to_string(),
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

/// Per-sheet write result, reported back to the caller instead of aborting.
#[derive(Debug)]
pub struct SheetOutcome {
    pub sheet: String,
    pub error: Option<String>,
}

pub trait ReportSink {
    /// Persists every sheet, isolating failures per sheet.
    fn write(&self, sheets: &[Sheet]) -> Vec<SheetOutcome>;
}

/// Writes one CSV file per sheet into an output directory.
pub struct CsvReportSink {
    dir: PathBuf,
}

impl CsvReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CsvReportSink { dir: dir.into() }
    }

    fn write_sheet(&self, sheet: &Sheet) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.csv", sheet.name));
        let mut writer = csv::Writer::from_path(&path)?;
        writer.write_record(&sheet.header)?;
        for row in &sheet.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl ReportSink for CsvReportSink {
    fn write(&self, sheets: &[Sheet]) -> Vec<SheetOutcome> {
        sheets
            .iter()
            .map(|sheet| match self.write_sheet(sheet) {
                Ok(()) => {
                    info!("Wrote sheet '{}'", sheet.name);
                    SheetOutcome { sheet: sheet.name.clone(), error: None }
                }
                Err(err) => {
                    error!("Failed to write sheet '{}': {err}", sheet.name);
                    SheetOutcome { sheet: sheet.name.clone(), error: Some(err.to_string()) }
                }
            })
            .collect()
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_default()
}

pub fn positions_sheet(positions: &[Position]) -> Sheet {
    let mut sheet = Sheet::new(
        "positions",
        &["Ticker", "Category", "Label", "Sector", "Country", "Quantity", "Price", "Market Value", "Share (%)"],
    );
    for p in positions {
        sheet.rows.push(vec![
            p.ticker.clone(),
            p.class.label().to_string(),
            p.label.clone(),
            p.sector.clone(),
            p.country.clone(),
            fmt_opt(p.quantity),
            fmt_opt(p.price),
            fmt_opt(p.market_value),
            fmt_opt(p.value_share),
        ]);
    }
    sheet
}

pub fn exposure_sheet(rows: &[ExposureRow]) -> Sheet {
    let mut sheet = Sheet::new(
        "exposure",
        &["Ticker", "Fund", "Name", "Sector", "Country", "Relative Weight (%)"],
    );
    for r in rows {
        sheet.rows.push(vec![
            r.ticker.clone(),
            r.fund.clone(),
            r.name.clone(),
            r.sector.clone().unwrap_or_default(),
            r.country.clone().unwrap_or_default(),
            format!("{:.4}", r.relative_weight),
        ]);
    }
    sheet
}

pub fn securities_sheet(rows: &[SecurityRow]) -> Sheet {
    let mut sheet = Sheet::new(
        "securities",
        &["Name", "Ticker", "Sector", "Country", "Total Weight (%)"],
    );
    for r in rows {
        sheet.rows.push(vec![
            r.name.clone(),
            r.ticker.clone(),
            r.sector.clone(),
            r.country.clone(),
            format!("{:.4}", r.weight),
        ]);
    }
    sheet
}

pub fn aggregate_sheet(name: &str, key_header: &str, rows: &[AggregateRow]) -> Sheet {
    let mut sheet = Sheet::new(name, &[key_header, "Weight (%)"]);
    for r in rows {
        sheet.rows.push(vec![r.key.clone(), format!("{:.4}", r.weight)]);
    }
    sheet
}
