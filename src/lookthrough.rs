//! Look-through weighting and consolidation.
//!
//! The heart of the pipeline: scale each fund's constituent weights by that
//! fund's share of total portfolio value, then merge the scaled rows with the
//! directly-held positions into one flat exposure table.

use tracing::{debug, warn};

use crate::error::{Result, ValidationError};
use crate::fund::ConstituentRow;
use crate::portfolio::{AssetClass, Position};

/// A non-fatal gap discovered while joining tables. Recorded and reported;
/// the run continues with the affected rows left explicitly unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupMiss {
    /// Portfolio holds this fund but no constituent file matched its label.
    FundConstituents { fund: String },
    /// No price could be fetched for this ticker.
    Price { ticker: String },
}

impl std::fmt::Display for LookupMiss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupMiss::FundConstituents { fund } => {
                write!(f, "no constituent data for fund '{fund}'")
            }
            LookupMiss::Price { ticker } => write!(f, "no price for ticker '{ticker}'"),
        }
    }
}

/// Outcome of the weighting stage.
#[derive(Debug)]
pub struct WeightingResult {
    pub rows: Vec<ConstituentRow>,
    pub misses: Vec<LookupMiss>,
    /// Human-readable sanity check: total look-through mass should
    /// approximate the portfolio's aggregate fund share.
    pub summary: String,
}

/// Scales constituent weights into portfolio-relative weights.
///
/// For every Fund-category position, finds that fund's constituent rows by
/// label and multiplies each `weight_in_fund` by the fund's market-value
/// share over 100. Funds without constituent data are skipped and recorded
/// as misses. Constituents of funds not held in the portfolio keep
/// `relative_weight = None`.
pub fn weight_constituents(
    mut constituents: Vec<ConstituentRow>,
    portfolio: &[Position],
) -> Result<WeightingResult> {
    if constituents.is_empty() {
        return Err(ValidationError::EmptyTable { table: "fund constituents" }.into());
    }
    if portfolio.is_empty() {
        return Err(ValidationError::EmptyTable { table: "portfolio" }.into());
    }
    // With typed rows the columns exist by construction; "missing column"
    // here means the pricing stage never populated the share field.
    if portfolio.iter().all(|p| p.value_share.is_none()) {
        return Err(ValidationError::MissingColumn {
            table: "portfolio",
            column: "market-value share",
        }
        .into());
    }

    let mut fund_labels: Vec<&str> = Vec::new();
    for position in portfolio.iter().filter(|p| p.class == AssetClass::Fund) {
        if !fund_labels.contains(&position.label.as_str()) {
            fund_labels.push(&position.label);
        } else {
            // Same fund held twice (e.g. two custody accounts): the first
            // match's share scales all constituents, see DESIGN.md.
            warn!(
                "Fund '{}' appears more than once in the portfolio; using the first position's share",
                position.label
            );
        }
    }
    debug!("Funds held in portfolio: {:?}", fund_labels);

    let mut misses = Vec::new();
    for fund in fund_labels {
        if !constituents.iter().any(|row| row.fund == fund) {
            warn!("Fund '{}' has no constituent rows; skipping", fund);
            misses.push(LookupMiss::FundConstituents { fund: fund.to_string() });
            continue;
        }
        let share = portfolio
            .iter()
            .find(|p| p.class == AssetClass::Fund && p.label == fund)
            .and_then(|p| p.value_share);
        let Some(share) = share else {
            warn!("Fund '{}' has no market-value share; skipping", fund);
            misses.push(LookupMiss::Price { ticker: fund.to_string() });
            continue;
        };
        for row in constituents.iter_mut().filter(|r| r.fund == fund) {
            row.relative_weight = Some(row.weight_in_fund * share / 100.0);
        }
        debug!("Fund '{}' weighted at {:.2}% portfolio share", fund, share);
    }

    let total: f64 = constituents.iter().filter_map(|r| r.relative_weight).sum();
    let summary = format!(
        "Look-through weighting computed; funds account for {:.2}% of the portfolio.",
        total
    );

    Ok(WeightingResult { rows: constituents, misses, summary })
}

/// One leaf exposure: either a fund constituent after look-through or a
/// directly-held position. `fund` is empty for direct holdings, so the
/// fund-level aggregation groups them as their own "not a fund" bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureRow {
    pub ticker: String,
    pub fund: String,
    pub name: String,
    pub sector: Option<String>,
    pub country: Option<String>,
    pub relative_weight: f64,
}

/// Merges weighted constituents with directly-held non-fund positions.
///
/// Append-only: look-through rows first, then direct holdings. No
/// deduplication: a security held directly and through a fund shows up
/// twice, and its total exposure is formed only at aggregation time.
/// Constituents that never received a weight (their fund is not in the
/// portfolio) and unpriced direct positions are left out; both conditions
/// are logged upstream.
pub fn consolidate(weighted: &[ConstituentRow], portfolio: &[Position]) -> Vec<ExposureRow> {
    let mut rows: Vec<ExposureRow> = weighted
        .iter()
        .filter_map(|row| {
            row.relative_weight.map(|weight| ExposureRow {
                ticker: row.ticker.clone(),
                fund: row.fund.clone(),
                name: row.name.clone(),
                sector: row.sector.clone(),
                country: row.country.clone(),
                relative_weight: weight,
            })
        })
        .collect();

    for position in portfolio {
        if position.class == AssetClass::Fund {
            continue;
        }
        let Some(share) = position.value_share else {
            debug!("Direct position '{}' is unpriced; excluded from exposure", position.label);
            continue;
        };
        rows.push(ExposureRow {
            ticker: position.ticker.clone(),
            fund: String::new(),
            name: position.label.clone(),
            sector: Some(position.sector.clone()).filter(|s| !s.is_empty()),
            country: Some(position.country.clone()).filter(|s| !s.is_empty()),
            relative_weight: share,
        });
    }
    rows
}
