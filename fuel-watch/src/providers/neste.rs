use regex::Regex;
use std::sync::LazyLock;

use super::{capture, Provider};
use crate::error::FetchError;
use crate::prices::{FuelKind, Price, PriceTable};

static TABLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(<table.*</table>)").expect("static regex"));
static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(<tr.*?</tr>)").expect("static regex"));
static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<p>(.*?)</p>").expect("static regex"));
static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(?:strong|b)>([\d.,]*)</(?:strong|b)>").expect("static regex"));

/// Rows after the header that carry the four fuel grades
const PRICE_ROWS: std::ops::Range<usize> = 1..5;

pub struct Neste;

impl Neste {
    fn kind_for_label(label: &str) -> Option<FuelKind> {
        if label.contains("95") {
            Some(FuelKind::Petrol95)
        } else if label.contains("Neste Futura 98") {
            Some(FuelKind::Petrol98)
        } else if label.contains("Neste Futura D") {
            Some(FuelKind::Diesel)
        } else if label.contains("Neste Pro Diesel") {
            Some(FuelKind::DieselPremium)
        } else {
            None
        }
    }
}

impl Provider for Neste {
    fn name(&self) -> &'static str {
        "Neste"
    }

    fn slug(&self) -> &'static str {
        "neste"
    }

    fn parse_prices(&self, html: &str) -> Result<PriceTable, FetchError> {
        let table = capture(&TABLE_RE, html, "Neste price table")?;

        let mut prices = PriceTable::default();
        let rows = ROW_RE
            .captures_iter(table)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .skip(PRICE_ROWS.start)
            .take(PRICE_ROWS.len());

        for row in rows {
            let cells: Vec<&str> = CELL_RE
                .captures_iter(row)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str())
                .collect();
            let (label, price_cell) = match cells.as_slice() {
                [label, price_cell, ..] => (*label, *price_cell),
                _ => {
                    return Err(FetchError::processing(format!(
                        "Neste row has fewer than two cells: {}",
                        row.trim()
                    )))
                }
            };

            let price = Price::parse(capture(&PRICE_RE, price_cell, "Neste price")?)?;
            let kind = Self::kind_for_label(label).ok_or_else(|| {
                FetchError::processing(format!("unknown Neste fuel row: {}", row.trim()))
            })?;
            prices.set(kind, price);
        }

        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    const SAMPLE: &str = include_str!("../../tests/fixtures/neste.html");

    #[test]
    fn test_parse_sample_page() {
        let prices = Neste.parse_prices(SAMPLE).unwrap();

        assert_eq!(prices.get(FuelKind::Petrol95).millis(), 1579);
        assert_eq!(prices.get(FuelKind::Petrol98).millis(), 1659);
        assert_eq!(prices.get(FuelKind::Diesel).millis(), 1489);
        assert_eq!(prices.get(FuelKind::DieselPremium).millis(), 1529);
    }

    #[test]
    fn test_label_mapping_checks_95_first() {
        assert_eq!(Neste::kind_for_label("Futura 95"), Some(FuelKind::Petrol95));
        assert_eq!(
            Neste::kind_for_label("Neste Futura 98"),
            Some(FuelKind::Petrol98)
        );
        assert_eq!(Neste::kind_for_label("LPG"), None);
    }

    #[test]
    fn test_missing_table_is_processing_error() {
        let err = Neste.parse_prices("<html><body>maintenance</body></html>").unwrap_err();
        assert_eq!(err.kind(), FailureKind::Processing);
        assert!(err.to_string().contains("Neste price table not found"));
    }

    #[test]
    fn test_unknown_row_is_processing_error() {
        let html = SAMPLE.replace("Neste Pro Diesel", "AdBlue");
        let err = Neste.parse_prices(&html).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Processing);
        assert!(err.to_string().contains("unknown Neste fuel row"));
    }

    #[test]
    fn test_missing_price_markup_is_processing_error() {
        let html = SAMPLE.replace("<b>1.489</b>", "1.489");
        let err = Neste.parse_prices(&html).unwrap_err();
        assert!(err.to_string().contains("Neste price not found"));
    }
}
