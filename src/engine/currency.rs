//! Currency cell parsing (`"$1,234.56"` → whole dollars).

use crate::error::CurrencyError;

/// Parse a currency-formatted cell into whole dollars.
///
/// Strips a leading `$`, thousands separators, and surrounding whitespace, rounds to cents, then
/// truncates the cents: `"$1,234.56"` → `1234`, `"$0.99"` → `0`.
pub fn parse_currency(raw: &str) -> Result<i64, CurrencyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CurrencyError::Empty);
    }
    let cleaned: String = trimmed
        .strip_prefix('$')
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| *c != ',')
        .collect();
    let cleaned = cleaned.trim();
    let malformed = || CurrencyError::Malformed(raw.to_string());
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(malformed());
    }
    let amount: f64 = cleaned.parse().map_err(|_| malformed())?;
    let cents = (amount * 100.0).round() as i64;
    Ok(cents / 100)
}

/// Read an optional offer cell: blank or missing is `None`, anything else must parse.
pub fn parse_offer_cell(cell: Option<&str>) -> Result<Option<i64>, CurrencyError> {
    match cell.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_currency(s).map(Some),
    }
}
