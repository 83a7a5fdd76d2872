use regex::Regex;
use std::sync::LazyLock;

use super::{capture, Provider};
use crate::error::FetchError;
use crate::prices::{FuelKind, Price, PriceTable};

static TBODY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<tbody>(.*?)</tbody>").expect("static regex"));
static ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<tr>(.*?)</tr>").expect("static regex"));
static CELL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<td>(.*?)</td>").expect("static regex"));
static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+) EUR").expect("static regex"));

/// Viada labels its rows with product images; the image name identifies the grade.
const GRADE_IMAGES: [(&str, FuelKind); 4] = [
    ("petrol_95ectoplus_new", FuelKind::Petrol95),
    ("petrol_98_new", FuelKind::Petrol98),
    ("petrol_d_new", FuelKind::Diesel),
    ("petrol_d_ecto_new", FuelKind::DieselPremium),
];

pub struct Viada;

impl Provider for Viada {
    fn name(&self) -> &'static str {
        "Viada"
    }

    fn slug(&self) -> &'static str {
        "viada"
    }

    fn parse_prices(&self, html: &str) -> Result<PriceTable, FetchError> {
        let body = capture(&TBODY_RE, html, "Viada price table")?;

        let mut prices = PriceTable::default();
        for row in ROW_RE.captures_iter(body).skip(1) {
            let row = row.get(1).map_or("", |m| m.as_str());
            let cells: Vec<&str> = CELL_RE
                .captures_iter(row)
                .filter_map(|c| c.get(1))
                .map(|m| m.as_str())
                .collect();
            let [label, price_cell, ..] = cells.as_slice() else {
                tracing::debug!(row = %row.trim(), "Skipping Viada row without price cell");
                continue;
            };

            // Rows for grades we do not track (CNG, LPG) are ignored
            let Some(kind) = GRADE_IMAGES
                .iter()
                .find(|(image, _)| label.contains(image))
                .map(|(_, kind)| *kind)
            else {
                continue;
            };

            let price = Price::parse(capture(&PRICE_RE, price_cell, "Viada price")?)?;
            prices.set(kind, price);
        }

        Ok(prices)
    }
}
