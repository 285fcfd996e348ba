//! Grouped exposure summaries over the consolidated table.
//!
//! Four independent views: by security, by sector, by country and by fund.
//! Each sums relative weights per group and sorts descending; rows with an
//! absent dimension value land in a single "Unspecified" bucket so no mass is
//! ever dropped.

use crate::lookthrough::ExposureRow;

/// Bucket label for rows whose grouping dimension is absent.
pub const UNSPECIFIED: &str = "Unspecified";

/// Display label for the fund group that holds direct (non-fund) positions.
pub const DIRECT_HOLDINGS: &str = "Direct holdings";

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRow {
    pub key: String,
    pub weight: f64,
}

/// Security-level aggregate carries the first-seen descriptive fields along
/// with the summed weight.
#[derive(Debug, Clone, PartialEq)]
pub struct SecurityRow {
    pub name: String,
    pub ticker: String,
    pub sector: String,
    pub country: String,
    pub weight: f64,
}

/// Groups in first-occurrence order, then sorts by weight descending. The
/// sort is stable, so equal-weight groups keep their grouping order.
fn group_by<F>(rows: &[ExposureRow], key_of: F) -> Vec<AggregateRow>
where
    F: Fn(&ExposureRow) -> String,
{
    let mut groups: Vec<AggregateRow> = Vec::new();
    for row in rows {
        let key = key_of(row);
        match groups.iter_mut().find(|g| g.key == key) {
            Some(group) => group.weight += row.relative_weight,
            None => groups.push(AggregateRow { key, weight: row.relative_weight }),
        }
    }
    groups.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
    groups
}

pub fn by_sector(rows: &[ExposureRow]) -> Vec<AggregateRow> {
    group_by(rows, |r| r.sector.clone().unwrap_or_else(|| UNSPECIFIED.to_string()))
}

pub fn by_country(rows: &[ExposureRow]) -> Vec<AggregateRow> {
    group_by(rows, |r| r.country.clone().unwrap_or_else(|| UNSPECIFIED.to_string()))
}

/// Fund-or-self grouping: direct holdings carry an empty fund label and form
/// their own group, displayed as [`DIRECT_HOLDINGS`].
pub fn by_fund(rows: &[ExposureRow]) -> Vec<AggregateRow> {
    group_by(rows, |r| {
        if r.fund.is_empty() {
            DIRECT_HOLDINGS.to_string()
        } else {
            r.fund.clone()
        }
    })
}

/// Sums exposure per display name, keeping the first-seen ticker, sector and
/// country for each security. This is where a security held both directly
/// and through funds collapses into its total exposure.
pub fn by_security(rows: &[ExposureRow]) -> Vec<SecurityRow> {
    let mut groups: Vec<SecurityRow> = Vec::new();
    for row in rows {
        match groups.iter_mut().find(|g| g.name == row.name) {
            Some(group) => group.weight += row.relative_weight,
            None => groups.push(SecurityRow {
                name: row.name.clone(),
                ticker: row.ticker.clone(),
                sector: row.sector.clone().unwrap_or_else(|| UNSPECIFIED.to_string()),
                country: row.country.clone().unwrap_or_else(|| UNSPECIFIED.to_string()),
                weight: row.relative_weight,
            }),
        }
    }
    groups.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
    groups
}
