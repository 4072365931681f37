//! Typed views of captured text values.
//!
//! The record keeps values exactly as captured; these helpers are for
//! consumers that need numbers or timestamps.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::ExtractionError;

use super::Result;

const EMISSION_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

fn parse_error(field: &str, value: &str) -> ExtractionError {
    ExtractionError::Parse {
        field: field.to_string(),
        value: value.to_string(),
    }
}

/// Parse a Brazilian-formatted amount ("1.234,56", "R$ 0,00", "5,00 %").
pub fn parse_brl_amount(s: &str) -> Result<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.' || *c == '-')
        .collect();

    // dots group thousands, the comma is the decimal separator
    let normalized = cleaned.replace('.', "").replace(',', ".");
    if normalized.matches('.').count() > 1 {
        return Err(parse_error("amount", s));
    }

    Decimal::from_str(&normalized).map_err(|_| parse_error("amount", s))
}

/// Parse the "DD/MM/YYYY HH:MM:SS" emission timestamp.
pub fn parse_emission_timestamp(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s.trim(), EMISSION_FORMAT).map_err(|_| parse_error("invoice_creation", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_brl_amount() {
        assert_eq!(parse_brl_amount("1.234,56").unwrap(), Decimal::from_str("1234.56").unwrap());
        assert_eq!(parse_brl_amount("R$ 0,00").unwrap(), Decimal::ZERO);
        assert_eq!(
            parse_brl_amount("12.345.678,90").unwrap(),
            Decimal::from_str("12345678.90").unwrap()
        );
        assert_eq!(parse_brl_amount("5,00 %").unwrap(), Decimal::from_str("5.00").unwrap());
    }

    #[test]
    fn test_parse_brl_amount_rejects_garbage() {
        assert!(matches!(
            parse_brl_amount("sem valor"),
            Err(ExtractionError::Parse { field, .. }) if field == "amount"
        ));
        assert!(parse_brl_amount("1,2,3").is_err());
    }

    #[test]
    fn test_parse_emission_timestamp() {
        let ts = parse_emission_timestamp("05/03/2021 14:32:10").unwrap();
        let expected = NaiveDate::from_ymd_opt(2021, 3, 5).unwrap().and_hms_opt(14, 32, 10).unwrap();
        assert_eq!(ts, expected);

        assert!(parse_emission_timestamp("31/02/2021 10:00:00").is_err());
    }
}
