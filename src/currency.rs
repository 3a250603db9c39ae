use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Every price is also reported as a multiplier into this currency.
pub const REFERENCE_CURRENCY: &str = "EUR";

/// Rate lookup into [`REFERENCE_CURRENCY`]. Implementations never fail: any
/// problem resolves to a rate of `1.0`.
#[async_trait]
pub trait RateLookup: Send + Sync {
    async fn rate_to_reference(&self, currency: Option<&str>) -> f64;
}

#[derive(Deserialize)]
struct LatestRates {
    rates: Option<serde_json::Map<String, serde_json::Value>>,
}

/// Client for a Frankfurter-style `/latest?from=XXX&to=EUR` endpoint.
pub struct CurrencyConverter {
    client: Client,
    base_url: String,
}

impl CurrencyConverter {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_rate(&self, currency: &str) -> anyhow::Result<Option<f64>> {
        let body: LatestRates = self
            .client
            .get(format!("{}/latest", self.base_url))
            .query(&[("from", currency), ("to", REFERENCE_CURRENCY)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(body
            .rates
            .and_then(|rates| rates.get(REFERENCE_CURRENCY).and_then(|v| v.as_f64()))
            .filter(|rate| rate.is_finite() && *rate > 0.0))
    }
}

#[async_trait]
impl RateLookup for CurrencyConverter {
    async fn rate_to_reference(&self, currency: Option<&str>) -> f64 {
        let currency = match currency {
            Some(c) if !c.is_empty() && c != REFERENCE_CURRENCY => c,
            _ => return 1.0,
        };

        match self.fetch_rate(currency).await {
            Ok(Some(rate)) => rate,
            Ok(None) => {
                tracing::warn!("Received invalid rate from API for currency: {currency}");
                1.0
            }
            Err(e) => {
                tracing::error!(
                    "Currency conversion failed from {currency} to {REFERENCE_CURRENCY}: {:#}",
                    e
                );
                1.0
            }
        }
    }
}

/// Per-request memo in front of a [`RateLookup`]; each distinct currency is
/// looked up once per batch of offers, even when the offers ask concurrently.
#[derive(Clone)]
pub struct RateMemo {
    lookup: Arc<dyn RateLookup>,
    rates: Arc<DashMap<String, Arc<OnceCell<f64>>>>,
}

impl RateMemo {
    pub fn new(lookup: Arc<dyn RateLookup>) -> Self {
        Self {
            lookup,
            rates: Arc::new(DashMap::new()),
        }
    }

    pub async fn rate_to_reference(&self, currency: Option<&str>) -> f64 {
        // the map guard must not be held across the lookup
        let cell = Arc::clone(
            &self
                .rates
                .entry(currency.unwrap_or_default().to_string())
                .or_default(),
        );
        *cell
            .get_or_init(|| self.lookup.rate_to_reference(currency))
            .await
    }
}
