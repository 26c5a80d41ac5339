use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Spot price of one asset in both supported fiat currencies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AssetPrice {
    pub usd: f64,
    pub eur: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceTable {
    pub base_crypto: AssetPrice,
    pub platform_token: AssetPrice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricesResponse {
    pub prices: PriceTable,
    pub fetched_at: DateTime<Utc>,
    /// True while the hardcoded fallback table is being served.
    pub fallback: bool,
}
