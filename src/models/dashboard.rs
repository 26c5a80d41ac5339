use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationSlice {
    pub name: String,
    pub value: Decimal,
    pub share_pct: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformancePoint {
    /// First day of the month, YYYY-MM-DD
    pub date: String,
    pub invested: Decimal,
    pub projected: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyProjection {
    /// Month label, e.g. "Sep 2026"
    pub month: String,
    pub reward: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodRollup {
    pub period_days: i32,
    pub total_staked: Decimal,
    pub projected_rewards: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSummary {
    /// Rewards from unstaked (completed) stakes
    pub total_earned: Decimal,
    /// Full rewards of unlockable stakes
    pub ready_to_claim: Decimal,
    /// Prorated rewards of still-locked stakes
    pub currently_earning: Decimal,
    /// Maturity rewards of all active stakes
    pub total_projected: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub total_invested: Decimal,
    pub total_projected_value: Decimal,
    pub growth_pct: Decimal,
    pub allocation: Vec<AllocationSlice>,
    pub performance: Vec<PerformancePoint>,
    pub rewards: RewardSummary,
    pub monthly_projections: Vec<MonthlyProjection>,
    pub rewards_by_period: Vec<PeriodRollup>,
}
