//! Exchange-rate lookup.
//!
//! The oracle answers "how many `to` per one `from`" or nothing at all.
//! Every failure mode (network, timeout, non-2xx, malformed body, missing or
//! non-positive rate) collapses to `None`; callers must map that to
//! `ConversionUnavailable` and never to a 1:1 rate.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use courierpay_types::{CourierpayError, CurrencyCode, RateOracleConfig, Result};
use rust_decimal::Decimal;

/// Source of exchange rates.
#[async_trait]
pub trait RateOracle: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Units of `to` per one unit of `from`, if known.
    async fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Option<Decimal>;
}

// =====================================================================
// HTTP adapter
// =====================================================================

/// Queries `GET {base_url}/{from}` and reads `rates[to]` from the JSON body.
#[derive(Debug, Clone)]
pub struct HttpRateOracle {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpRateOracle {
    /// Build the adapter from configuration.
    ///
    /// # Errors
    /// Returns `Configuration` if the HTTP client cannot be created.
    pub fn new(config: &RateOracleConfig) -> Result<Self> {
        let timeout = Duration::from_millis(config.timeout_ms);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CourierpayError::Configuration(format!("rate oracle client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    async fn fetch(&self, from: &CurrencyCode) -> std::result::Result<String, reqwest::Error> {
        let url = format!("{}/{}", self.base_url, from);
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl RateOracle for HttpRateOracle {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }
        // The client timeout covers the request; this one also bounds the
        // body read.
        match tokio::time::timeout(self.timeout, self.fetch(from)).await {
            Ok(Ok(body)) => {
                let rate = parse_rate(&body, to);
                if rate.is_none() {
                    tracing::warn!(%from, %to, "Rate oracle response carried no usable rate");
                }
                rate
            }
            Ok(Err(e)) => {
                tracing::warn!(%from, %to, error = %e, "Rate oracle request failed");
                None
            }
            Err(_) => {
                tracing::warn!(
                    %from,
                    %to,
                    timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
                    "Rate oracle timed out"
                );
                None
            }
        }
    }
}

/// Extract `rates[to]` from a `{"rates": {...}}` document.
///
/// Accepts the rate as a JSON number or a numeric string. Zero, negative,
/// missing or unparsable rates yield `None`.
#[must_use]
pub fn parse_rate(body: &str, to: &CurrencyCode) -> Option<Decimal> {
    let doc: serde_json::Value = serde_json::from_str(body).ok()?;
    let raw = doc.get("rates")?.get(to.as_str())?;
    let text = match raw {
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s.clone(),
        _ => return None,
    };
    let rate = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()?;
    (rate > Decimal::ZERO).then_some(rate)
}

// =====================================================================
// Static table
// =====================================================================

/// Fixed rate table for tests and offline deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticRateOracle {
    rates: HashMap<(CurrencyCode, CurrencyCode), Decimal>,
}

impl StaticRateOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) one directed rate.
    #[must_use]
    pub fn with_rate(mut self, from: CurrencyCode, to: CurrencyCode, rate: Decimal) -> Self {
        self.rates.insert((from, to), rate);
        self
    }
}

#[async_trait]
impl RateOracle for StaticRateOracle {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn rate(&self, from: &CurrencyCode, to: &CurrencyCode) -> Option<Decimal> {
        if from == to {
            return Some(Decimal::ONE);
        }
        self.rates
            .get(&(from.clone(), to.clone()))
            .copied()
            .filter(|r| *r > Decimal::ZERO)
    }
}
