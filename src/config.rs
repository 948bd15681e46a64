use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://talent_dashboard.db?mode=rwc";
const DEFAULT_INSIGHTS_TIMEOUT_SECS: u64 = 10;
const DEFAULT_INSIGHTS_DEBOUNCE_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub insights_url: Option<String>,
    pub insights_timeout: Duration,
    pub insights_debounce: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let insights_timeout = match non_empty("INSIGHTS_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| {
                    format!("INSIGHTS_TIMEOUT_SECS must be whole seconds, got {raw:?}")
                })?,
            None => DEFAULT_INSIGHTS_TIMEOUT_SECS,
        };

        let insights_debounce = match non_empty("INSIGHTS_DEBOUNCE_MS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| {
                    format!("INSIGHTS_DEBOUNCE_MS must be milliseconds, got {raw:?}")
                })?,
            None => DEFAULT_INSIGHTS_DEBOUNCE_MS,
        };

        Ok(Self {
            database_url: non_empty("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            insights_url: non_empty("INSIGHTS_URL"),
            insights_timeout: Duration::from_secs(insights_timeout),
            insights_debounce: Duration::from_millis(insights_debounce),
        })
    }
}
