//! Typed parsing of raw extraction output.
//!
//! Each declared [`FieldType`] has one parser turning trimmed strategy
//! output into a [`FieldValue`]. A parser returning `None` marks a failed
//! type parse, which the validator reports and the confidence scoring
//! penalizes; it is never an error.

use crate::domain::record::FieldValue;
use crate::domain::template::FieldType;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// Date formats accepted, tried in order. ISO first, then the common US
/// and European numeric forms, then spelled-out months.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// A numeric token: optional sign, digits with thousands separators, an
/// optional decimal part.
static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+]?\d[\d,]*(?:\.\d+)?").expect("static regex"));

/// A monetary amount with an optional currency symbol or ISO code on
/// either side.
static CURRENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:(?P<pre>[$€£¥]|\b[A-Z]{3}\b)\s*)?(?P<amount>\d[\d,]*(?:\.\d+)?)(?:\s*(?P<post>[$€£¥]|\b[A-Z]{3}\b))?")
        .expect("static regex")
});

/// Parses trimmed, non-empty raw text according to the declared type.
///
/// Returns `None` when the text does not contain a value of that type.
pub fn parse_field(raw: &str, field_type: FieldType) -> Option<FieldValue> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match field_type {
        FieldType::Text => Some(FieldValue::Text(raw.to_string())),
        FieldType::Number => parse_number(raw),
        FieldType::Currency => parse_currency(raw),
        FieldType::Date => parse_date(raw),
    }
}

fn parse_number(raw: &str) -> Option<FieldValue> {
    let token = NUMBER.find(raw)?;
    let cleaned = token.as_str().replace(',', "");
    cleaned.parse::<f64>().ok().map(FieldValue::Number)
}

fn parse_currency(raw: &str) -> Option<FieldValue> {
    let captures = CURRENCY.captures(raw)?;
    let amount = captures
        .name("amount")?
        .as_str()
        .replace(',', "")
        .parse::<f64>()
        .ok()?;
    let symbol = captures
        .name("pre")
        .or_else(|| captures.name("post"))
        .map(|m| m.as_str().to_string());
    Some(FieldValue::Currency { amount, symbol })
}

fn parse_date(raw: &str) -> Option<FieldValue> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .map(FieldValue::Date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_passes_through_trimmed() {
        assert_eq!(
            parse_field("  ACME Corp  ", FieldType::Text),
            Some(FieldValue::Text("ACME Corp".to_string()))
        );
        assert_eq!(parse_field("   ", FieldType::Text), None);
    }

    #[test]
    fn test_number_with_thousands_separators() {
        assert_eq!(
            parse_field("1,234,567.89", FieldType::Number),
            Some(FieldValue::Number(1234567.89))
        );
        assert_eq!(
            parse_field("qty: 42", FieldType::Number),
            Some(FieldValue::Number(42.0))
        );
        assert_eq!(parse_field("no digits here", FieldType::Number), None);
    }

    #[test]
    fn test_currency_symbol_before_amount() {
        assert_eq!(
            parse_field("$ 1,234.50", FieldType::Currency),
            Some(FieldValue::Currency {
                amount: 1234.5,
                symbol: Some("$".to_string()),
            })
        );
    }

    #[test]
    fn test_currency_code_after_amount() {
        assert_eq!(
            parse_field("Total 99.00 EUR", FieldType::Currency),
            Some(FieldValue::Currency {
                amount: 99.0,
                symbol: Some("EUR".to_string()),
            })
        );
    }

    #[test]
    fn test_currency_bare_amount_has_no_symbol() {
        assert_eq!(
            parse_field("17.25", FieldType::Currency),
            Some(FieldValue::Currency {
                amount: 17.25,
                symbol: None,
            })
        );
    }

    #[test]
    fn test_date_formats() {
        let expected = FieldValue::Date(NaiveDate::from_ymd_opt(2024, 3, 9).expect("valid"));
        for raw in ["2024-03-09", "03/09/2024", "Mar 09, 2024", "9 March 2024"] {
            assert_eq!(
                parse_field(raw, FieldType::Date),
                Some(expected.clone()),
                "failed on {raw}"
            );
        }
    }

    #[test]
    fn test_invalid_date_fails() {
        assert_eq!(parse_field("2024-13-40", FieldType::Date), None);
        assert_eq!(parse_field("yesterday", FieldType::Date), None);
    }
}
