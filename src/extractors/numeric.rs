// src/extractors/numeric.rs

use rust_decimal::Decimal;
use std::str::FromStr;

/// Converts a raw filing value into an exact decimal.
///
/// Filings present numbers with thousands separators and use a handful of
/// placeholder strings for "no value". Those placeholders normalize to `None`,
/// never to zero. The `sign` argument carries the document's sign-marker
/// attribute: a literal `"-"` inverts the parsed magnitude, anything else
/// leaves it untouched.
pub fn normalize(raw: &str, sign: Option<&str>) -> Option<Decimal> {
    let cleaned = raw.replace(',', "");
    let cleaned = cleaned.trim();

    if matches!(cleaned, "" | "-" | "N/A") {
        return None;
    }

    match Decimal::from_str(cleaned) {
        Ok(value) => {
            if sign == Some("-") {
                Some(-value)
            } else {
                Some(value)
            }
        }
        Err(e) => {
            tracing::error!("Could not convert value '{}' to a decimal: {}", raw, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn strips_thousands_separators() {
        assert_eq!(normalize("1,234,567", None), Some(dec("1234567")));
        assert_eq!(normalize("  42,000 ", None), Some(dec("42000")));
    }

    #[test]
    fn placeholders_are_null_not_zero() {
        assert_eq!(normalize("", None), None);
        assert_eq!(normalize("-", None), None);
        assert_eq!(normalize("N/A", None), None);
        assert_eq!(normalize("  - ", Some("-")), None);
    }

    #[test]
    fn sign_marker_inverts_magnitude() {
        assert_eq!(normalize("500", Some("-")), Some(dec("-500")));
        assert_eq!(normalize("500", Some("")), Some(dec("500")));
        assert_eq!(normalize("500", None), Some(dec("500")));
        // A leading minus in the text is independent of the marker
        assert_eq!(normalize("-500", None), Some(dec("-500")));
    }

    #[test]
    fn garbage_is_null() {
        assert_eq!(normalize("not a number", None), None);
        assert_eq!(normalize("12.3.4", None), None);
    }

    #[test]
    fn preserves_fractional_precision() {
        assert_eq!(normalize("1,234.50", None), Some(dec("1234.50")));
        // Round-trip: formatting a decimal and normalizing it yields the same value
        let d = dec("987654.21");
        assert_eq!(normalize(&d.to_string(), None), Some(d));
    }
}
