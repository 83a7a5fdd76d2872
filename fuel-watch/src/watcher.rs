use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::FetchError;
use crate::fetcher::{FetchRequest, Fetcher};
use crate::notifier::{self, Notifier};
use crate::page_cache::PageCache;
use crate::prices::{format_report, PriceDiff, PriceTable};
use crate::providers::Provider;

/// Consecutive failures after which a provider failure is logged as an error
const FAILURE_ESCALATION_THRESHOLD: u32 = 3;

/// A provider together with the last prices seen for it
pub struct TrackedProvider {
    provider: Box<dyn Provider>,
    url: String,
    prices: PriceTable,
    consecutive_failures: u32,
}

/// Result of looking at one provider during a pass
#[derive(Debug)]
pub struct ProviderCheck {
    pub provider: &'static str,
    /// `Some(report)` when a report was emitted
    pub outcome: Result<Option<String>, FetchError>,
}

pub struct Watcher {
    fetcher: Arc<Fetcher>,
    cache: Option<PageCache>,
    notifier: Box<dyn Notifier>,
    providers: Vec<TrackedProvider>,
}

impl TrackedProvider {
    pub fn new(provider: Box<dyn Provider>, url: impl Into<String>) -> Self {
        Self {
            provider,
            url: url.into(),
            prices: PriceTable::default(),
            consecutive_failures: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    fn record_failure(&mut self, err: &FetchError) {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= FAILURE_ESCALATION_THRESHOLD {
            error!(
                provider = %self.name(),
                url = %self.url,
                error = %err,
                consecutive_failures = self.consecutive_failures,
                "PRICE CHECK FAILURE: provider unreachable or page layout changed"
            );
        } else {
            warn!(
                provider = %self.name(),
                error = %err,
                consecutive_failures = self.consecutive_failures,
                "Failed to check prices"
            );
        }
    }

    fn record_success(&mut self) {
        if self.consecutive_failures > 0 {
            info!(
                provider = %self.name(),
                previous_failures = self.consecutive_failures,
                "Price check recovered"
            );
            self.consecutive_failures = 0;
        }
    }
}

/// Fetch the provider page (or its cached snapshot) and parse it.
/// Issues at most one request.
async fn scrape(
    fetcher: &Fetcher,
    cache: Option<&PageCache>,
    tracked: &TrackedProvider,
) -> Result<PriceTable, FetchError> {
    let slug = tracked.provider.slug();

    let cached = match cache {
        Some(cache) => cache.load(slug)?,
        None => None,
    };
    let html = match cached {
        Some(html) => {
            tracing::debug!(provider = %tracked.name(), "Using cached page");
            html
        }
        None => {
            let response = fetcher.fetch(&FetchRequest::get(&tracked.url)?).await?;
            let html = response.text().into_owned();
            if let Some(cache) = cache {
                cache.store(slug, &html)?;
            }
            html
        }
    };

    tracked.provider.parse_prices(&html)
}

/// Print the report and forward it to the notifier. Notification failures
/// are logged and swallowed.
async fn report(
    notifier: &dyn Notifier,
    provider: &str,
    diff: &PriceDiff,
    prices: &PriceTable,
) -> String {
    let text = format_report(diff, prices);
    println!("{} {}", provider, text);

    if let Err(e) = notifier.notify(provider, &text).await {
        error!(
            provider = %provider,
            error = %e,
            "Notification failed! Subscribers were not told about this price update."
        );
    }
    text
}

impl Watcher {
    pub fn new(
        fetcher: Arc<Fetcher>,
        cache: Option<PageCache>,
        notifier: Box<dyn Notifier>,
        providers: Vec<TrackedProvider>,
    ) -> Self {
        Self {
            fetcher,
            cache,
            notifier,
            providers,
        }
    }

    pub fn from_config(config: &Config, fetcher: Arc<Fetcher>) -> Self {
        let providers = config
            .providers
            .enabled
            .iter()
            .map(|&kind| TrackedProvider::new(kind.build(), config.provider_url(kind)))
            .collect();
        let cache = config.cache.dir.as_ref().map(|dir| PageCache::new(dir));
        let notifier = notifier::from_config(&config.telegram, fetcher.clone());

        Self::new(fetcher, cache, notifier, providers)
    }

    pub fn providers(&self) -> &[TrackedProvider] {
        &self.providers
    }

    /// Current prices of every provider, without touching tracked state or
    /// notifying anyone.
    pub async fn snapshot(&self) -> Vec<(&'static str, Result<PriceTable, FetchError>)> {
        let mut tables = Vec::with_capacity(self.providers.len());
        for tracked in &self.providers {
            let result = scrape(&self.fetcher, self.cache.as_ref(), tracked).await;
            tables.push((tracked.name(), result));
        }
        tables
    }

    /// Load every provider once and announce its current prices.
    pub async fn prime(&mut self) -> Vec<ProviderCheck> {
        let mut checks = Vec::with_capacity(self.providers.len());
        for tracked in self.providers.iter_mut() {
            let outcome = match scrape(&self.fetcher, self.cache.as_ref(), tracked).await {
                Ok(prices) => {
                    tracked.record_success();
                    tracked.prices = prices;
                    let text = report(
                        self.notifier.as_ref(),
                        tracked.name(),
                        &PriceDiff::default(),
                        &tracked.prices,
                    )
                    .await;
                    Ok(Some(text))
                }
                Err(e) => {
                    tracked.record_failure(&e);
                    Err(e)
                }
            };
            checks.push(ProviderCheck {
                provider: tracked.name(),
                outcome,
            });
        }
        checks
    }

    /// Load every provider and report the ones whose prices moved.
    /// A failing provider keeps its previous prices.
    pub async fn check_once(&mut self) -> Vec<ProviderCheck> {
        let mut checks = Vec::with_capacity(self.providers.len());
        for tracked in self.providers.iter_mut() {
            let outcome = match scrape(&self.fetcher, self.cache.as_ref(), tracked).await {
                Ok(prices) => {
                    tracked.record_success();
                    let diff = tracked.prices.update(&prices);
                    if diff.is_empty() {
                        tracing::debug!(provider = %tracked.name(), "Prices unchanged");
                        Ok(None)
                    } else {
                        let text =
                            report(self.notifier.as_ref(), tracked.name(), &diff, &tracked.prices)
                                .await;
                        Ok(Some(text))
                    }
                }
                Err(e) => {
                    tracked.record_failure(&e);
                    Err(e)
                }
            };
            checks.push(ProviderCheck {
                provider: tracked.name(),
                outcome,
            });
        }
        checks
    }

    /// Prime, then check every `period` until `shutdown` resolves.
    pub async fn run<F>(&mut self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            providers = ?self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            interval_seconds = period.as_secs(),
            cache = ?self.cache.as_ref().map(|c| c.dir().display().to_string()),
            "Watcher started"
        );

        tokio::pin!(shutdown);

        tokio::select! {
            _ = self.prime() => {}
            _ = &mut shutdown => {
                info!("Shutdown requested during startup");
                return;
            }
        }

        let Some(first_tick) = Instant::now().checked_add(period) else {
            error!(interval_secs = period.as_secs(), "Polling interval is too large, stopping watcher");
            return;
        };
        let mut ticker = interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let checks = self.check_once().await;
                    let changed = checks
                        .iter()
                        .filter(|c| matches!(c.outcome, Ok(Some(_))))
                        .count();
                    let failed = checks.iter().filter(|c| c.outcome.is_err()).count();
                    info!(changed, failed, "Price check complete");
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping watcher");
                    return;
                }
            }
        }
    }
}
