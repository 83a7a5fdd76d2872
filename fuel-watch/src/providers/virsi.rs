use regex::Regex;
use std::sync::LazyLock;

use super::{capture, Provider};
use crate::error::FetchError;
use crate::prices::{FuelKind, Price, PriceTable};

fn price_item_re(class: &str) -> Regex {
    let pattern = format!(
        r#"(?s)price-item type-{}.*?<p class="price">([\d.,]*)</p>"#,
        regex::escape(class)
    );
    Regex::new(&pattern).expect("static regex")
}

static DIESEL_RE: LazyLock<Regex> = LazyLock::new(|| price_item_re("dd"));
static PETROL_95_RE: LazyLock<Regex> = LazyLock::new(|| price_item_re("95e"));
static PETROL_98_RE: LazyLock<Regex> = LazyLock::new(|| price_item_re("98e"));

/// Virši has no premium diesel; that slot stays zero.
pub struct Virsi;

impl Provider for Virsi {
    fn name(&self) -> &'static str {
        "Virši"
    }

    fn slug(&self) -> &'static str {
        "virsi"
    }

    fn parse_prices(&self, html: &str) -> Result<PriceTable, FetchError> {
        let items: [(&LazyLock<Regex>, FuelKind, &str); 3] = [
            (&DIESEL_RE, FuelKind::Diesel, "Virši diesel price"),
            (&PETROL_95_RE, FuelKind::Petrol95, "Virši 95E price"),
            (&PETROL_98_RE, FuelKind::Petrol98, "Virši 98E price"),
        ];

        let mut prices = PriceTable::default();
        for (re, kind, what) in items {
            prices.set(kind, Price::parse(capture(re, html, what)?)?);
        }
        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    const SAMPLE: &str = include_str!("../../tests/fixtures/virsi.html");

    #[test]
    fn test_parse_sample_page() {
        let prices = Virsi.parse_prices(SAMPLE).unwrap();

        assert_eq!(prices.get(FuelKind::Petrol95).millis(), 1574);
        assert_eq!(prices.get(FuelKind::Petrol98).millis(), 1654);
        assert_eq!(prices.get(FuelKind::Diesel).millis(), 1484);
        assert!(prices.get(FuelKind::DieselPremium).is_zero());
    }

    #[test]
    fn test_missing_item_is_processing_error() {
        let html = SAMPLE.replace("type-98e", "type-98");
        let err = Virsi.parse_prices(&html).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Processing);
        assert!(err.to_string().contains("Virši 98E price not found"));
    }

    #[test]
    fn test_empty_price_is_processing_error() {
        let html = SAMPLE.replace(r#"<p class="price">1.484</p>"#, r#"<p class="price"></p>"#);
        let err = Virsi.parse_prices(&html).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Processing);
        assert!(err.to_string().contains("invalid price"));
    }
}
