use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One ledger entry. Never mutated after creation; the projected value is
/// derived from `created_at` on every read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentRecord {
    pub id: Uuid,
    pub eth_amount: Decimal,
    pub eur_value: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentView {
    pub id: Uuid,
    pub eth_amount: Decimal,
    pub eur_value: Decimal,
    pub created_at: DateTime<Utc>,
    pub projected_value: Decimal,
    pub growth_pct: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentsResponse {
    pub investments: Vec<InvestmentView>,
    pub total_invested: Decimal,
    pub total_projected_value: Decimal,
}
