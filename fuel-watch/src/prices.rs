use std::fmt;
use std::ops::Sub;
use strum::{EnumIter, IntoEnumIterator};

use crate::error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, strum::Display)]
pub enum FuelKind {
    Petrol95,
    Petrol98,
    Diesel,
    DieselPremium,
}

const KIND_COUNT: usize = 4;

/// Euro amount in thousandths (one tenth of a cent per litre)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(i64);

const FRACTION_DIGITS: usize = 3;
const SCALE: i64 = 1000;

impl Price {
    pub const ZERO: Price = Price(0);

    pub fn from_millis(millis: i64) -> Self {
        Price(millis)
    }

    pub fn millis(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Parse price text as printed on station websites: `1.579`, `1,579`, `2`.
    pub fn parse(text: &str) -> Result<Self, FetchError> {
        let text = text.trim();
        let invalid = || FetchError::processing(format!("invalid price '{}'", text));

        let (whole, fraction) = match text.find(['.', ',']) {
            Some(idx) => (&text[..idx], &text[idx + 1..]),
            None => (text, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        if fraction.len() > FRACTION_DIGITS
            && fraction[FRACTION_DIGITS..].bytes().any(|b| b != b'0')
        {
            return Err(FetchError::processing(format!(
                "price '{}' has more than {} significant decimals",
                text, FRACTION_DIGITS
            )));
        }

        let whole: i64 = whole.parse().map_err(|_| invalid())?;
        let mut fraction_millis = 0i64;
        for (i, digit) in fraction.bytes().take(FRACTION_DIGITS).enumerate() {
            fraction_millis += i64::from(digit - b'0') * 10i64.pow((FRACTION_DIGITS - 1 - i) as u32);
        }

        whole
            .checked_mul(SCALE)
            .and_then(|w| w.checked_add(fraction_millis))
            .map(Price)
            .ok_or_else(invalid)
    }

    /// Always-signed rendering, e.g. `+0.020` or `-0.105`.
    pub fn signed(self) -> String {
        if self.0 < 0 {
            self.to_string()
        } else {
            format!("+{}", self)
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(
            f,
            "{}{}.{:03}",
            sign,
            abs / SCALE as u64,
            abs % SCALE as u64
        )
    }
}

impl Sub for Price {
    type Output = Price;

    fn sub(self, rhs: Price) -> Price {
        Price(self.0 - rhs.0)
    }
}

/// One price per fuel kind; zero means the station does not sell it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceTable {
    prices: [Price; KIND_COUNT],
}

/// Signed per-kind change between two tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceDiff {
    changes: [Price; KIND_COUNT],
}

impl PriceTable {
    pub fn get(&self, kind: FuelKind) -> Price {
        self.prices[kind as usize]
    }

    pub fn set(&mut self, kind: FuelKind, price: Price) {
        self.prices[kind as usize] = price;
    }

    pub fn with(mut self, kind: FuelKind, price: Price) -> Self {
        self.set(kind, price);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.prices.iter().all(|p| p.is_zero())
    }

    pub fn iter(&self) -> impl Iterator<Item = (FuelKind, Price)> + '_ {
        FuelKind::iter().map(move |kind| (kind, self.get(kind)))
    }

    /// Store `new` and return what moved.
    pub fn update(&mut self, new: &PriceTable) -> PriceDiff {
        let mut diff = PriceDiff::default();
        for kind in FuelKind::iter() {
            let (old, current) = (self.get(kind), new.get(kind));
            if old != current {
                diff.changes[kind as usize] = current - old;
                self.set(kind, current);
            }
        }
        diff
    }
}

impl fmt::Display for PriceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .filter(|(_, price)| !price.is_zero())
            .map(|(kind, price)| format!("{}: {} €/L", kind, price))
            .collect();
        if parts.is_empty() {
            write!(f, "no prices")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

impl PriceDiff {
    pub fn get(&self, kind: FuelKind) -> Price {
        self.changes[kind as usize]
    }

    pub fn is_empty(&self) -> bool {
        self.changes.iter().all(|c| c.is_zero())
    }
}

/// Human-readable change report, e.g.
/// `Petrol95: +0.020€/L (1.599 €/L), Diesel: +0.000€/L (1.489 €/L)`.
///
/// Kinds with neither a price nor a change are left out.
pub fn format_report(diff: &PriceDiff, current: &PriceTable) -> String {
    FuelKind::iter()
        .filter(|&kind| !(diff.get(kind).is_zero() && current.get(kind).is_zero()))
        .map(|kind| {
            format!(
                "{}: {}€/L ({} €/L)",
                kind,
                diff.get(kind).signed(),
                current.get(kind)
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    fn p(text: &str) -> Price {
        Price::parse(text).unwrap()
    }

    #[test]
    fn test_parse_price_formats() {
        assert_eq!(p("1.579").millis(), 1579);
        assert_eq!(p("1,579").millis(), 1579);
        assert_eq!(p(" 1.5 ").millis(), 1500);
        assert_eq!(p("2").millis(), 2000);
        assert_eq!(p("1.5790").millis(), 1579);
        assert_eq!(p("0.009").millis(), 9);
    }

    #[test]
    fn test_parse_price_rejects_garbage() {
        for text in ["", ".5", "abc", "1.5a", "1.2.3", "-1.000", "1.5791"] {
            let err = Price::parse(text).unwrap_err();
            assert_eq!(err.kind(), FailureKind::Processing, "input {:?}", text);
        }
    }

    #[test]
    fn test_price_display() {
        assert_eq!(Price::from_millis(1579).to_string(), "1.579");
        assert_eq!(Price::from_millis(20).to_string(), "0.020");
        assert_eq!(Price::from_millis(-105).to_string(), "-0.105");
        assert_eq!(Price::from_millis(20).signed(), "+0.020");
        assert_eq!(Price::from_millis(-20).signed(), "-0.020");
        assert_eq!(Price::ZERO.signed(), "+0.000");
    }

    #[test]
    fn test_update_records_changes_and_stores_new_prices() {
        let mut table = PriceTable::default()
            .with(FuelKind::Petrol95, p("1.579"))
            .with(FuelKind::Diesel, p("1.489"));
        let new = PriceTable::default()
            .with(FuelKind::Petrol95, p("1.599"))
            .with(FuelKind::Diesel, p("1.489"))
            .with(FuelKind::Petrol98, p("1.699"));

        let diff = table.update(&new);

        assert_eq!(diff.get(FuelKind::Petrol95).millis(), 20);
        assert_eq!(diff.get(FuelKind::Petrol98).millis(), 1699);
        assert!(diff.get(FuelKind::Diesel).is_zero());
        assert!(!diff.is_empty());
        assert_eq!(table, new);
    }

    #[test]
    fn test_update_with_identical_table_is_empty() {
        let mut table = PriceTable::default().with(FuelKind::Diesel, p("1.489"));
        let diff = table.update(&table.clone());
        assert!(diff.is_empty());
    }

    #[test]
    fn test_format_report_skips_unsold_unchanged_kinds() {
        let mut table = PriceTable::default()
            .with(FuelKind::Petrol95, p("1.579"))
            .with(FuelKind::Diesel, p("1.489"));
        let diff = table.update(
            &PriceTable::default()
                .with(FuelKind::Petrol95, p("1.559"))
                .with(FuelKind::Diesel, p("1.489")),
        );

        assert_eq!(
            format_report(&diff, &table),
            "Petrol95: -0.020€/L (1.559 €/L), Diesel: +0.000€/L (1.489 €/L)"
        );
    }

    #[test]
    fn test_format_report_shows_withdrawn_kind() {
        let mut table = PriceTable::default().with(FuelKind::DieselPremium, p("1.600"));
        let diff = table.update(&PriceTable::default());
        assert_eq!(
            format_report(&diff, &table),
            "DieselPremium: -1.600€/L (0.000 €/L)"
        );
    }

    #[test]
    fn test_table_display() {
        assert_eq!(PriceTable::default().to_string(), "no prices");
        let table = PriceTable::default().with(FuelKind::Petrol98, p("1.7"));
        assert_eq!(table.to_string(), "Petrol98: 1.700 €/L");
    }
}
