//! Fund constituent exports: reading and cleaning.
//!
//! Each fund ships one delimited export listing its holdings. iShares-style
//! files carry a couple of free-text metadata lines before the header, and
//! weights in the German locale (`"2,53"`). Cleaning turns each file into
//! [`ConstituentRow`]s keyed by the file's stem, which is also the join key
//! against the portfolio's Fund-position labels.

use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Error, ParseError, Result, ValidationError};

/// One holding of one fund. `relative_weight` is unset until the look-through
/// stage matches the fund against the portfolio; `None` and `0.0` mean
/// different things and stay distinguishable.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstituentRow {
    pub fund: String,
    pub ticker: String,
    pub name: String,
    pub sector: Option<String>,
    pub country: Option<String>,
    pub weight_in_fund: f64,
    pub relative_weight: Option<f64>,
}

/// Header aliases per logical column. The original exports are German iShares
/// files; English exports of the same shape are accepted too.
const TICKER_ALIASES: [&str; 3] = ["Issuer Ticker", "Emittententicker", "Ticker"];
const NAME_ALIASES: [&str; 1] = ["Name"];
const WEIGHT_ALIASES: [&str; 2] = ["Weight (%)", "Gewichtung (%)"];
const SECTOR_ALIASES: [&str; 2] = ["Sector", "Sektor"];
const COUNTRY_ALIASES: [&str; 3] = ["Location", "Standort", "Country"];

fn find_column(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| aliases.iter().any(|a| h.trim() == *a))
}

/// Fund identifier: file base name with the extension stripped. Two files
/// with the same stem collide on purpose; the stem is the matching key.
pub fn fund_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Reads and cleans one fund export.
///
/// The first `skip_rows` lines are discarded before the header. The weight
/// column is required and parsed after comma-to-period substitution; a
/// non-numeric weight aborts with the offending row. Sector and country pass
/// through unchanged and may be absent entirely.
pub fn read_fund_csv(path: &Path, skip_rows: usize) -> Result<Vec<ConstituentRow>> {
    let fund = fund_id(path);
    let file = std::fs::File::open(path).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })?;

    // Drop the metadata preamble; csv sees only the header and data lines.
    let mut lines = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        if i >= skip_rows {
            lines.push(line);
        }
    }
    let body = lines.join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers = reader
        .headers()
        .map_err(|source| Error::Csv {
            path: path.display().to_string(),
            source,
        })?
        .clone();

    let weight_col = find_column(&headers, &WEIGHT_ALIASES).ok_or(ValidationError::MissingColumn {
        table: "fund constituents",
        column: "Weight (%)",
    })?;
    let ticker_col = find_column(&headers, &TICKER_ALIASES);
    let name_col = find_column(&headers, &NAME_ALIASES);
    let sector_col = find_column(&headers, &SECTOR_ALIASES);
    let country_col = find_column(&headers, &COUNTRY_ALIASES);

    let mut rows = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|source| Error::Csv {
            path: path.display().to_string(),
            source,
        })?;
        let get = |col: Option<usize>| {
            col.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let raw_weight = record.get(weight_col).unwrap_or("").trim().to_string();
        let weight_in_fund =
            raw_weight
                .replace(',', ".")
                .parse::<f64>()
                .map_err(|_| ParseError::Weight {
                    fund: fund.clone(),
                    row: row + 1,
                    value: raw_weight.clone(),
                })?;

        rows.push(ConstituentRow {
            fund: fund.clone(),
            ticker: get(ticker_col).unwrap_or_default(),
            name: get(name_col).unwrap_or_default(),
            sector: get(sector_col),
            country: get(country_col),
            weight_in_fund,
            relative_weight: None,
        });
    }

    let mass: f64 = rows.iter().map(|r| r.weight_in_fund).sum();
    if (mass - 100.0).abs() > 1.0 {
        // Report-only: exports routinely sum slightly off 100.
        warn!("Fund '{}' constituent weights sum to {:.2}%", fund, mass);
    }
    debug!("Read {} constituents for fund '{}'", rows.len(), fund);
    Ok(rows)
}
