//! Dashboard aggregator
//!
//! Pulls the investment ledger and the staking engine together into the
//! figures the dashboard renders: portfolio totals, the fixed allocation
//! breakdown, a month-by-month performance series, and staking reward
//! summaries. Everything here is a pure fold over the two ledgers.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::models::dashboard::{
    AllocationSlice, DashboardResponse, MonthlyProjection, PerformancePoint, PeriodRollup,
    RewardSummary,
};
use crate::models::investment::InvestmentRecord;
use crate::models::stake::{StakeRecord, StakeStatus};
use crate::services::clock::Clock;
use crate::services::ledger::InvestmentLedger;
use crate::services::local_store::StoreError;
use crate::services::projection;
use crate::services::staking::{current_reward, derive_status, StakingService};

/// Fixed portfolio allocation shown on the dashboard pie chart.
const ALLOCATION: [(&str, i64); 4] = [
    ("Platform Tokens", 65),
    ("Staking Rewards", 15),
    ("Growth Fund", 12),
    ("Liquidity Pool", 8),
];

const PROJECTION_MONTHS: i64 = 6;

#[derive(Clone)]
pub struct DashboardService {
    ledger: InvestmentLedger,
    staking: StakingService,
    clock: Arc<dyn Clock>,
}

impl DashboardService {
    pub fn new(ledger: InvestmentLedger, staking: StakingService, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger,
            staking,
            clock,
        }
    }

    pub async fn build(&self, user_id: uuid::Uuid) -> Result<DashboardResponse, StoreError> {
        let now = self.clock.now();
        let investments = self.ledger.list(user_id).await?;
        let stakes = self.staking.list_stakes(user_id).await?;

        let total_invested: Decimal = investments.iter().map(|r| r.eur_value).sum();
        let total_projected_value: Decimal = investments
            .iter()
            .map(|r| projection::projected_value(r.eur_value, r.created_at, now))
            .sum();

        Ok(DashboardResponse {
            total_invested,
            total_projected_value,
            growth_pct: growth_pct(total_invested, total_projected_value),
            allocation: allocation(total_projected_value),
            performance: performance_series(&investments, now),
            rewards: reward_summary(&stakes, now),
            monthly_projections: monthly_projections(&stakes, now),
            rewards_by_period: rewards_by_period(&stakes, now),
        })
    }
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn growth_pct(invested: Decimal, projected: Decimal) -> Decimal {
    if invested <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round2((projected - invested) / invested * dec!(100))
}

pub fn allocation(total_value: Decimal) -> Vec<AllocationSlice> {
    ALLOCATION
        .iter()
        .map(|(name, pct)| AllocationSlice {
            name: name.to_string(),
            value: round2(total_value * Decimal::from(*pct) / dec!(100)),
            share_pct: Decimal::from(*pct),
        })
        .collect()
}

fn month_start(date: DateTime<Utc>) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date.date_naive())
}

fn next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

/// One point per calendar month from the first investment through the
/// current month, valuing the portfolio as of each month start (the current
/// month is valued as of now).
pub fn performance_series(
    investments: &[InvestmentRecord],
    now: DateTime<Utc>,
) -> Vec<PerformancePoint> {
    let first = match investments.iter().map(|r| r.created_at).min() {
        Some(first) => first,
        None => return Vec::new(),
    };

    let mut points = Vec::new();
    let mut month = month_start(first);
    let current = month_start(now);

    while month <= current {
        let at = if month == current {
            now
        } else {
            DateTime::from_naive_utc_and_offset(
                month.and_hms_opt(0, 0, 0).unwrap_or_default(),
                Utc,
            )
        };

        let held: Vec<&InvestmentRecord> =
            investments.iter().filter(|r| r.created_at <= at).collect();
        let invested: Decimal = held.iter().map(|r| r.eur_value).sum();
        let projected: Decimal = held
            .iter()
            .map(|r| projection::projected_value(r.eur_value, r.created_at, at))
            .sum();

        points.push(PerformancePoint {
            date: month.format("%Y-%m-%d").to_string(),
            invested,
            projected,
        });
        month = next_month(month);
    }

    points
}

pub fn reward_summary(stakes: &[StakeRecord], now: DateTime<Utc>) -> RewardSummary {
    let mut summary = RewardSummary {
        total_earned: Decimal::ZERO,
        ready_to_claim: Decimal::ZERO,
        currently_earning: Decimal::ZERO,
        total_projected: Decimal::ZERO,
    };

    for stake in stakes {
        match derive_status(stake, now) {
            StakeStatus::Unstaked => summary.total_earned += stake.projected_reward,
            StakeStatus::Unlockable => {
                summary.ready_to_claim += stake.projected_reward;
                summary.total_projected += stake.projected_reward;
            }
            StakeStatus::Locked => {
                summary.currently_earning += current_reward(stake, now);
                summary.total_projected += stake.projected_reward;
            }
        }
    }

    summary
}

/// Six months ahead; each active stake contributes one month of simple
/// interest for every month that falls before its unlock date.
pub fn monthly_projections(stakes: &[StakeRecord], now: DateTime<Utc>) -> Vec<MonthlyProjection> {
    (1..=PROJECTION_MONTHS)
        .map(|i| {
            let month_date = now + Duration::days(30 * i);
            let reward: Decimal = stakes
                .iter()
                .filter(|s| derive_status(s, now).is_active() && month_date <= s.unlock_date)
                .map(|s| s.amount * s.apy / dec!(12) / dec!(100))
                .sum();

            MonthlyProjection {
                month: month_date.format("%b %Y").to_string(),
                reward: round2(reward),
            }
        })
        .collect()
}

pub fn rewards_by_period(stakes: &[StakeRecord], now: DateTime<Utc>) -> Vec<PeriodRollup> {
    let mut by_period: BTreeMap<i32, (Decimal, Decimal)> = BTreeMap::new();

    for stake in stakes {
        if !derive_status(stake, now).is_active() {
            continue;
        }
        let entry = by_period
            .entry(stake.period_days)
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        entry.0 += stake.amount;
        entry.1 += stake.projected_reward;
    }

    by_period
        .into_iter()
        .map(|(period_days, (total_staked, projected_rewards))| PeriodRollup {
            period_days,
            total_staked,
            projected_rewards,
        })
        .collect()
}
