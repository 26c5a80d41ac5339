use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stake lifecycle. Transitions are monotonic: locked -> unlockable
/// (automatic once the unlock date passes) -> unstaked (explicit user action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeStatus {
    Locked,
    Unlockable,
    Unstaked,
}

impl StakeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StakeStatus::Locked => "locked",
            StakeStatus::Unlockable => "unlockable",
            StakeStatus::Unstaked => "unstaked",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "locked" => Some(StakeStatus::Locked),
            "unlockable" => Some(StakeStatus::Unlockable),
            "unstaked" => Some(StakeStatus::Unstaked),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, StakeStatus::Unstaked)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeRecord {
    pub id: Uuid,
    pub amount: Decimal,
    pub period_days: i32,
    pub apy: Decimal,
    pub start_date: DateTime<Utc>,
    pub unlock_date: DateTime<Utc>,
    pub projected_reward: Decimal,
    pub status: StakeStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStakeRequest {
    /// Decimal string, mirroring form input
    pub amount: String,
    pub period_days: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeView {
    #[serde(flatten)]
    pub stake: StakeRecord,
    pub current_reward: Decimal,
    pub days_left: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakesResponse {
    pub stakes: Vec<StakeView>,
    pub total_staked: Decimal,
    pub available_balance: Decimal,
}
