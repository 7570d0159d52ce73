//! Numeric coercion for cells that may use `,` as the decimal separator.

/// Parse a prevalence or confidence-limit cell.
///
/// Commas are read as decimal points. Blank cells, text that still fails to
/// parse, and non-finite results all become `None`.
pub fn coerce_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse a survey year, accepting integral decimals such as `2020.0`.
pub fn coerce_year(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if let Ok(year) = trimmed.parse::<i32>() {
        return Some(year);
    }
    let value = coerce_number(trimmed)?;
    if value.fract() == 0.0 && value >= i32::MIN as f64 && value <= i32::MAX as f64 {
        Some(value as i32)
    } else {
        None
    }
}
