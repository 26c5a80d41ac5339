//! Spot price feed
//!
//! Continuously polls the external price API for ETH and the platform token
//! in USD and EUR. Keeps the latest snapshot in memory; on any fetch failure
//! the previous snapshot keeps being served, so downstream calculators always
//! have a usable (if stale) quote. Before the first successful fetch a
//! hardcoded fallback table is served.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::models::prices::{AssetPrice, PriceTable};

/// Concurrent refresh requests inside this window collapse into one fetch.
const DEDUP_WINDOW_SECS: i64 = 5;

/// A stalled price API must not wedge the polling loop.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to build HTTP client")
}

/// Clears the in-flight flag when the fetch finishes, on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct PriceSnapshot {
    pub table: PriceTable,
    pub fetched_at: DateTime<Utc>,
    /// True while serving the hardcoded table rather than live data.
    pub fallback: bool,
}

#[derive(Clone)]
pub struct PriceFeedService {
    client: Client,
    api_url: String,
    token_id: String,
    poll_interval_secs: u64,
    snapshot: Arc<RwLock<PriceSnapshot>>,
    in_flight: Arc<AtomicBool>,
}

#[derive(Debug, Deserialize)]
struct QuotedPrices {
    usd: f64,
    eur: f64,
}

impl PriceFeedService {
    pub fn new(api_url: String, token_id: String, poll_interval_secs: u64) -> Self {
        let snapshot = PriceSnapshot {
            table: fallback_table(),
            fetched_at: Utc::now(),
            fallback: true,
        };

        Self {
            client: build_client(REQUEST_TIMEOUT),
            api_url,
            token_id,
            poll_interval_secs,
            snapshot: Arc::new(RwLock::new(snapshot)),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current snapshot. Never errors; worst case is a stale or fallback quote.
    pub async fn get_prices(&self) -> PriceSnapshot {
        self.snapshot.read().await.clone()
    }

    /// Start the background polling task.
    pub fn start_polling(&self) {
        let service = self.clone();
        tokio::spawn(async move {
            info!(
                "Starting price feed polling (every {} seconds)",
                service.poll_interval_secs
            );

            let mut interval =
                tokio::time::interval(Duration::from_secs(service.poll_interval_secs));

            loop {
                interval.tick().await;
                service.refresh().await;
            }
        });
    }

    /// Fetch fresh quotes, deduplicating concurrent calls within a short
    /// window. Failures are logged and the previous snapshot is kept.
    pub async fn refresh(&self) {
        {
            let snapshot = self.snapshot.read().await;
            let age = Utc::now() - snapshot.fetched_at;
            if !snapshot.fallback && age.num_seconds() < DEDUP_WINDOW_SECS {
                debug!("Price snapshot is {}s old, skipping refresh", age.num_seconds());
                return;
            }
        }

        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("Price refresh already in flight, skipping");
            return;
        }
        let _in_flight = InFlightGuard(&self.in_flight);

        match self.fetch_table().await {
            Ok(table) => {
                let mut snapshot = self.snapshot.write().await;
                *snapshot = PriceSnapshot {
                    table,
                    fetched_at: Utc::now(),
                    fallback: false,
                };
                debug!(
                    "Price snapshot updated: ETH {} EUR, token {} EUR",
                    snapshot.table.base_crypto.eur, snapshot.table.platform_token.eur
                );
            }
            Err(e) => {
                warn!("Price fetch failed, keeping previous snapshot: {}", e);
            }
        }
    }

    async fn fetch_table(&self) -> Result<PriceTable, Box<dyn std::error::Error + Send + Sync>> {
        let ids = format!("ethereum,{}", self.token_id);

        let response = self
            .client
            .get(&self.api_url)
            .header("accept", "application/json")
            .query(&[("ids", ids.as_str()), ("vs_currencies", "usd,eur")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("price API error: {}", response.status()).into());
        }

        let quotes: HashMap<String, QuotedPrices> = response.json().await?;

        let eth = quotes
            .get("ethereum")
            .ok_or("price API response missing ethereum")?;
        let token = quotes
            .get(&self.token_id)
            .ok_or("price API response missing platform token")?;

        Ok(PriceTable {
            base_crypto: AssetPrice {
                usd: eth.usd,
                eur: eth.eur,
            },
            platform_token: AssetPrice {
                usd: token.usd,
                eur: token.eur,
            },
        })
    }
}

/// Last-known quotes served when the feed has never succeeded.
pub fn fallback_table() -> PriceTable {
    PriceTable {
        base_crypto: AssetPrice {
            usd: 2150.0,
            eur: 2000.0,
        },
        platform_token: AssetPrice {
            usd: 0.11,
            eur: 0.10,
        },
    }
}
