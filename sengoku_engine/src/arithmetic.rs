//! Arithmetic primitives and boundary validation.
//!
//! Stored quantities are unsigned integers. Percent-scaled products are
//! computed in `i128` and floored, so no intermediate step truncates
//! silently.

use crate::error::LedgerError;

/// Longest legal legion name, in characters.
pub const MAX_LEGION_NAME_CHARS: usize = 8;

/// `floor(value * (100 + pct) / 100)`, clamped at zero.
pub fn apply_percent_floor(value: u64, pct: i64) -> u64 {
    let scaled = i128::from(value) * (100 + i128::from(pct));
    let floored = scaled.div_euclid(100);
    u64::try_from(floored.max(0)).unwrap_or(u64::MAX)
}

/// `value * (100 + pct) / 100` as a float; negative results clamp to zero.
pub fn apply_percent(value: u64, pct: i64) -> f64 {
    let scaled = i128::from(value) * (100 + i128::from(pct));
    (scaled.max(0) as f64) / 100.0
}

/// `floor(value * numerator / denominator)` without overflow.
pub fn mul_div_floor(value: u64, numerator: u64, denominator: u64) -> u64 {
    if denominator == 0 {
        return 0;
    }
    let q = u128::from(value) * u128::from(numerator) / u128::from(denominator);
    u64::try_from(q).unwrap_or(u64::MAX)
}

/// Accept a signed request count as a non-negative quantity.
pub fn non_negative(field: &'static str, value: i64) -> Result<u64, LedgerError> {
    u64::try_from(value)
        .map_err(|_| LedgerError::validation(field, format!("must not be negative (got {value})")))
}

/// Accept a signed request count that must be strictly positive.
pub fn positive(field: &'static str, value: i64) -> Result<u64, LedgerError> {
    match non_negative(field, value)? {
        0 => Err(LedgerError::validation(field, "must be greater than zero")),
        n => Ok(n),
    }
}

/// CJK Unified Ideographs block.
fn is_ideograph(ch: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&ch)
}

/// Validate a legion name and return it trimmed.
///
/// Legal names are 1 to 8 characters, every one a CJK unified ideograph.
pub fn validate_legion_name(raw: &str) -> Result<String, LedgerError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(LedgerError::validation("name", "legion name must not be empty"));
    }
    let chars = name.chars().count();
    if chars > MAX_LEGION_NAME_CHARS {
        return Err(LedgerError::validation(
            "name",
            format!("legion name must be at most {MAX_LEGION_NAME_CHARS} characters (got {chars})"),
        ));
    }
    if let Some(bad) = name.chars().find(|c| !is_ideograph(*c)) {
        return Err(LedgerError::validation(
            "name",
            format!("legion name may only contain kanji (found {bad:?})"),
        ));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_floor_is_exact() {
        assert_eq!(apply_percent_floor(100_000, 3), 103_000);
        assert_eq!(apply_percent_floor(33_333, -12), 29_333);
        assert_eq!(apply_percent_floor(10, -200), 0);
    }

    #[test]
    fn percent_float() {
        assert_eq!(apply_percent(100_000, 12), 112_000.0);
        assert_eq!(apply_percent(100_000, -40), 60_000.0);
    }

    #[test]
    fn mul_div() {
        assert_eq!(mul_div_floor(100_000, 230, 10_000), 2300);
        assert_eq!(mul_div_floor(15_000, 180, 10_000), 270);
        assert_eq!(mul_div_floor(5, 1, 0), 0);
    }

    #[test]
    fn signed_counts() {
        assert_eq!(non_negative("rifles", 0).unwrap(), 0);
        assert!(non_negative("rifles", -1).is_err());
        assert!(positive("soldiers", 0).is_err());
        assert_eq!(positive("soldiers", 7).unwrap(), 7);
    }

    #[test]
    fn legion_names() {
        assert_eq!(
            validate_legion_name("  赤備え隊 ").unwrap_err().kind(),
            crate::error::ErrorKind::Validation
        );
        assert_eq!(validate_legion_name(" 赤備隊 ").unwrap(), "赤備隊");
        assert_eq!(validate_legion_name("一二三四五六七八").unwrap(), "一二三四五六七八");
        assert!(validate_legion_name("").is_err());
        assert!(validate_legion_name("   ").is_err());
        assert!(validate_legion_name("一二三四五六七八九").is_err());
        assert!(validate_legion_name("Red").is_err());
        assert!(validate_legion_name("あかぞなえ").is_err());
    }
}
