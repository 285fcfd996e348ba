//! Canonical ticker identifiers.
//!
//! Raw portfolio tickers carry exchange suffixes (`SAP.DE`) or currency pairs
//! (`BTC-EUR`). Every join against price data or fund constituents keys on the
//! stripped prefix, so normalization happens once, up front.

use crate::portfolio::AssetClass;

/// Strips the venue/currency suffix from a raw identifier.
///
/// Equities and funds use the `.`-suffix exchange convention, crypto the
/// `-`-suffix currency-pair convention. Cash positions carry the `-` sentinel
/// and are never modified. Idempotent: an already-normalized identifier passes
/// through unchanged.
pub fn normalize(raw: &str, class: AssetClass) -> &str {
    let delimiter = match class {
        AssetClass::Equity | AssetClass::Fund => '.',
        AssetClass::Crypto => '-',
        AssetClass::Cash => return raw,
    };
    match raw.find(delimiter) {
        Some(idx) => &raw[..idx],
        None => raw,
    }
}
