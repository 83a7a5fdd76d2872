use serde::Deserialize;
use strum::{EnumIter, EnumString};

use crate::error::FetchError;
use crate::prices::PriceTable;

pub mod neste;
pub mod viada;
pub mod virsi;

/// Fuel station whose price page can be scraped
pub trait Provider: Send + Sync {
    /// Name used in reports, e.g. "Virši"
    fn name(&self) -> &'static str;

    /// ASCII identifier used in config and cache file names
    fn slug(&self) -> &'static str;

    /// Extract the current price table from the provider's price page
    fn parse_prices(&self, html: &str) -> Result<PriceTable, FetchError>;
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, EnumIter, EnumString, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
    Neste,
    Virsi,
    Viada,
}

impl ProviderKind {
    pub fn slug(self) -> &'static str {
        match self {
            ProviderKind::Neste => "neste",
            ProviderKind::Virsi => "virsi",
            ProviderKind::Viada => "viada",
        }
    }

    pub fn default_url(self) -> &'static str {
        match self {
            ProviderKind::Neste => "https://www.neste.lv/lv/content/degvielas-cenas",
            ProviderKind::Virsi => "https://www.virsi.lv/lv/degvielas-cena",
            ProviderKind::Viada => "https://www.viada.lv/zemakas-degvielas-cenas/",
        }
    }

    pub fn build(self) -> Box<dyn Provider> {
        match self {
            ProviderKind::Neste => Box::new(neste::Neste),
            ProviderKind::Virsi => Box::new(virsi::Virsi),
            ProviderKind::Viada => Box::new(viada::Viada),
        }
    }
}

/// Capture group 1 of `re` in `haystack`, or a processing error naming `what`.
pub(crate) fn capture<'h>(
    re: &regex::Regex,
    haystack: &'h str,
    what: &str,
) -> Result<&'h str, FetchError> {
    re.captures(haystack)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| FetchError::processing(format!("{} not found", what)))
}
