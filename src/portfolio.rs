//! Portfolio positions: loading, pricing and market-value shares.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, ParseError, Result, ValidationError};

/// Closed set of position categories. Anything else in the source file is a
/// validation error, not an implicit bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetClass {
    Equity,
    Fund,
    Cash,
    Crypto,
}

impl AssetClass {
    /// Exact-match parse; the portfolio format owns its spelling.
    pub fn parse(value: &str, row: usize) -> std::result::Result<Self, ValidationError> {
        match value {
            "Equity" => Ok(AssetClass::Equity),
            "Fund" => Ok(AssetClass::Fund),
            "Cash" => Ok(AssetClass::Cash),
            "Crypto" => Ok(AssetClass::Crypto),
            other => Err(ValidationError::UnknownCategory {
                table: "portfolio",
                row,
                value: other.to_string(),
            }),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssetClass::Equity => "Equity",
            AssetClass::Fund => "Fund",
            AssetClass::Cash => "Cash",
            AssetClass::Crypto => "Crypto",
        }
    }
}

/// One row of the portfolio file, enriched in place by the pricing stage.
///
/// `market_value` and `value_share` stay `None` while the quantity or price is
/// unknown. An unpriced position is surfaced by the run summary, never coerced
/// to zero.
#[derive(Debug, Clone)]
pub struct Position {
    pub ticker: String,
    pub class: AssetClass,
    pub label: String,
    pub sector: String,
    pub country: String,
    pub quantity: Option<f64>,
    pub price: Option<f64>,
    pub market_value: Option<f64>,
    pub value_share: Option<f64>,
}

const REQUIRED_COLUMNS: [&str; 6] = ["Ticker", "Category", "Label", "Sector", "Country", "Quantity"];

/// Reads the portfolio CSV. Validates the header up front so a missing column
/// fails with its name instead of a late row-access error.
pub fn load_portfolio(path: &Path) -> Result<Vec<Position>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| Error::Csv {
            path: path.display().to_string(),
            source,
        })?;

    let headers = reader
        .headers()
        .map_err(|source| Error::Csv {
            path: path.display().to_string(),
            source,
        })?
        .clone();
    let mut index = HashMap::new();
    for (i, name) in headers.iter().enumerate() {
        index.insert(name.to_string(), i);
    }
    let col = |name: &'static str| -> Result<usize> {
        index
            .get(name)
            .copied()
            .ok_or_else(|| ValidationError::MissingColumn { table: "portfolio", column: name }.into())
    };
    for name in REQUIRED_COLUMNS {
        col(name)?;
    }
    let (ticker_col, category_col, label_col) = (col("Ticker")?, col("Category")?, col("Label")?);
    let (sector_col, country_col, quantity_col) = (col("Sector")?, col("Country")?, col("Quantity")?);

    let mut positions = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|source| Error::Csv {
            path: path.display().to_string(),
            source,
        })?;
        let field = |i: usize| record.get(i).unwrap_or("").to_string();

        let class = AssetClass::parse(&field(category_col), row + 1)?;
        let label = field(label_col);
        let raw_quantity = field(quantity_col);
        let quantity = if raw_quantity.is_empty() {
            None
        } else {
            Some(raw_quantity.replace(',', ".").parse::<f64>().map_err(|_| {
                ParseError::Quantity {
                    row: row + 1,
                    label: label.clone(),
                    value: raw_quantity.clone(),
                }
            })?)
        };

        positions.push(Position {
            ticker: field(ticker_col),
            class,
            label,
            sector: field(sector_col),
            country: field(country_col),
            quantity,
            price: None,
            market_value: None,
            value_share: None,
        });
    }

    if positions.is_empty() {
        return Err(ValidationError::EmptyTable { table: "portfolio" }.into());
    }
    debug!("Loaded {} portfolio positions from {}", positions.len(), path.display());
    Ok(positions)
}

/// Merges fetched prices into the portfolio and derives market values and
/// shares. Single synchronization point after the concurrent lookups.
///
/// `prices` is keyed by normalized ticker; a missing or `None` entry leaves
/// the position unpriced. The share denominator is the sum over positions
/// with a defined market value, so shares of priced positions always sum to
/// 100 regardless of gaps.
pub fn apply_prices(positions: &mut [Position], prices: &HashMap<String, Option<f64>>) {
    for position in positions.iter_mut() {
        let key = crate::ticker::normalize(&position.ticker, position.class);
        position.price = prices.get(key).copied().flatten();
        position.market_value = match (position.quantity, position.price) {
            (Some(quantity), Some(price)) => Some(quantity * price),
            _ => None,
        };
    }

    let total: f64 = positions.iter().filter_map(|p| p.market_value).sum();
    if total <= 0.0 {
        warn!("Portfolio has no priced market value; shares left unset");
        return;
    }
    for position in positions.iter_mut() {
        position.value_share = position.market_value.map(|v| v / total * 100.0);
    }
}

/// Positions that could not be valued this run, for the summary output.
pub fn unpriced<'a>(positions: &'a [Position]) -> Vec<&'a Position> {
    positions.iter().filter(|p| p.market_value.is_none()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const HEADER: &str = "Ticker,Category,Label,Sector,Country,Quantity\n";

    #[test]
    fn loads_positions_with_optional_quantity() {
        let file = write_csv(&format!(
            "{HEADER}AAPL.DE,Equity,Apple,IT,USA,10\n-,Cash,Cash,Cash,-,\n"
        ));
        let positions = load_portfolio(file.path()).unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].quantity, Some(10.0));
        assert_eq!(positions[1].quantity, None);
        assert_eq!(positions[1].class, AssetClass::Cash);
    }

    #[test]
    fn missing_column_is_named() {
        let file = write_csv("Ticker,Category,Label,Sector,Country\nAAPL,Equity,Apple,IT,USA\n");
        let err = load_portfolio(file.path()).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::MissingColumn { table: "portfolio", column: "Quantity" })
        ));
    }

    #[test]
    fn unknown_category_names_row_and_value() {
        let file = write_csv(&format!("{HEADER}XYZ,Bond,Some Bond,Fixed Income,DE,5\n"));
        let err = load_portfolio(file.path()).unwrap_err();
        match err {
            Error::Validation(ValidationError::UnknownCategory { row, value, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(value, "Bond");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_portfolio_is_rejected() {
        let file = write_csv(HEADER);
        let err = load_portfolio(file.path()).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::EmptyTable { table: "portfolio" })
        ));
    }

    #[test]
    fn comma_decimal_quantity_is_accepted() {
        let file = write_csv(&format!("{HEADER}BTC-EUR,Crypto,Bitcoin,Crypto,-,\"0,5\"\n"));
        let positions = load_portfolio(file.path()).unwrap();
        assert_eq!(positions[0].quantity, Some(0.5));
    }

    #[test]
    fn non_numeric_quantity_is_a_parse_error() {
        let file = write_csv(&format!("{HEADER}AAPL,Equity,Apple,IT,USA,abc\n"));
        let err = load_portfolio(file.path()).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::Quantity { row: 1, .. })));
    }

    fn position(ticker: &str, class: AssetClass, quantity: Option<f64>) -> Position {
        Position {
            ticker: ticker.to_string(),
            class,
            label: ticker.to_string(),
            sector: String::new(),
            country: String::new(),
            quantity,
            price: None,
            market_value: None,
            value_share: None,
        }
    }

    #[test]
    fn shares_sum_to_100_over_priced_positions() {
        let mut positions = vec![
            position("AAA", AssetClass::Equity, Some(10.0)),
            position("BBB", AssetClass::Equity, Some(5.0)),
        ];
        let prices = HashMap::from([
            ("AAA".to_string(), Some(30.0)),
            ("BBB".to_string(), Some(60.0)),
        ]);
        apply_prices(&mut positions, &prices);
        assert_eq!(positions[0].market_value, Some(300.0));
        assert_eq!(positions[1].market_value, Some(300.0));
        let total: f64 = positions.iter().filter_map(|p| p.value_share).sum();
        assert!((total - 100.0).abs() < 1e-6);
    }

    #[test]
    fn unpriced_position_stays_undefined_not_zero() {
        let mut positions = vec![
            position("AAA", AssetClass::Equity, Some(10.0)),
            position("MISSING", AssetClass::Equity, Some(5.0)),
        ];
        let prices = HashMap::from([
            ("AAA".to_string(), Some(10.0)),
            ("MISSING".to_string(), None),
        ]);
        apply_prices(&mut positions, &prices);
        assert_eq!(positions[1].market_value, None);
        assert_eq!(positions[1].value_share, None);
        // The priced remainder still accounts for the full 100%.
        assert_eq!(positions[0].value_share, Some(100.0));
        assert_eq!(unpriced(&positions).len(), 1);
    }

    #[test]
    fn prices_join_on_normalized_ticker() {
        let mut positions = vec![position("SAP.DE", AssetClass::Equity, Some(2.0))];
        let prices = HashMap::from([("SAP".to_string(), Some(100.0))]);
        apply_prices(&mut positions, &prices);
        assert_eq!(positions[0].market_value, Some(200.0));
    }
}
