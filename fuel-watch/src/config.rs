use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::providers::ProviderKind;

/// Upper bound for `http.timeout_seconds` (one hour)
pub const MAX_TIMEOUT_SECONDS: u64 = 60 * 60;
/// Upper bound for `polling.interval_seconds` (one week)
pub const MAX_INTERVAL_SECONDS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CacheConfig {
    /// Directory holding `<provider>.html` page snapshots
    pub dir: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_enabled_providers")]
    pub enabled: Vec<ProviderKind>,
    /// Per-provider URL overrides, keyed by provider slug
    #[serde(default)]
    pub urls: HashMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            channel: String::new(),
            api_base: default_telegram_api(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_providers(),
            urls: HashMap::new(),
        }
    }
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty() && !self.channel.is_empty()
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load from `path` when given, otherwise start from defaults.
    /// Environment overrides and validation are applied in both cases.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// `TELEGRAM_TOKEN` and `TELEGRAM_CHANNEL` take precedence over the file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = lookup("TELEGRAM_TOKEN").filter(|v| !v.is_empty()) {
            self.telegram.token = token;
        }
        if let Some(channel) = lookup("TELEGRAM_CHANNEL").filter(|v| !v.is_empty()) {
            self.telegram.channel = channel;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_seconds == 0 {
            bail!("http.timeout_seconds must be greater than zero");
        }
        if self.http.timeout_seconds > MAX_TIMEOUT_SECONDS {
            bail!(
                "http.timeout_seconds must be at most {}, got {}",
                MAX_TIMEOUT_SECONDS,
                self.http.timeout_seconds
            );
        }
        if self.polling.interval_seconds == 0 {
            bail!("polling.interval_seconds must be greater than zero");
        }
        if self.polling.interval_seconds > MAX_INTERVAL_SECONDS {
            bail!(
                "polling.interval_seconds must be at most {}, got {}",
                MAX_INTERVAL_SECONDS,
                self.polling.interval_seconds
            );
        }
        if self.providers.enabled.is_empty() {
            bail!("providers.enabled must name at least one provider");
        }
        for (slug, url) in &self.providers.urls {
            let kind: ProviderKind = slug
                .parse()
                .with_context(|| format!("Unknown provider in providers.urls: {}", slug))?;
            reqwest::Url::parse(url)
                .with_context(|| format!("Invalid URL override for provider {}: {}", kind, url))?;
        }
        reqwest::Url::parse(&self.telegram.api_base)
            .with_context(|| format!("Invalid telegram.api_base: {}", self.telegram.api_base))?;
        Ok(())
    }

    pub fn provider_url(&self, kind: ProviderKind) -> String {
        self.providers
            .urls
            .get(kind.slug())
            .cloned()
            .unwrap_or_else(|| kind.default_url().to_string())
    }
}

// Default functions
fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("fuel-watch/{}", env!("CARGO_PKG_VERSION"))
}

fn default_interval() -> u64 {
    600
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}

fn default_enabled_providers() -> Vec<ProviderKind> {
    vec![ProviderKind::Neste, ProviderKind::Virsi, ProviderKind::Viada]
}
