//! Staking engine
//!
//! Locks part of a user's invested balance for a fixed period at a
//! period-dependent APY. The 365-day tier pays disproportionately more than
//! linear scaling of the shorter tiers; that is the documented product
//! policy, preserved as-is.
//!
//! Status is derived lazily on read by comparing the unlock date against the
//! current instant; no scheduler flips stakes in the background.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, Order, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::entities::{prelude::*, stakes};
use crate::models::stake::{StakeRecord, StakeStatus};
use crate::services::clock::Clock;
use crate::services::ledger::InvestmentLedger;
use crate::services::local_store::{LocalStore, StoreError};

const DAYS_PER_YEAR: i64 = 365;

#[derive(Debug, Error)]
pub enum StakeError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("stake amount must be a positive number")]
    InvalidAmount,
    #[error("staking period must be 30, 90 or 365 days")]
    InvalidPeriod,
    #[error("insufficient balance: {available} available")]
    InsufficientBalance { available: Decimal },
    #[error("stake is still locked until {unlock_date}")]
    NotUnlockable { unlock_date: DateTime<Utc> },
    #[error("stake not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// APY in percent for a lock period. The tier table is fixed product policy.
pub fn apy_for_period(period_days: i32) -> Option<Decimal> {
    match period_days {
        30 => Some(dec!(1.3)),
        90 => Some(dec!(4.0)),
        365 => Some(dec!(17.6)),
        _ => None,
    }
}

/// The single Locked -> Unlockable derivation, applied on every read path.
pub fn derive_status(stake: &StakeRecord, now: DateTime<Utc>) -> StakeStatus {
    if stake.status == StakeStatus::Locked && now >= stake.unlock_date {
        StakeStatus::Unlockable
    } else {
        stake.status
    }
}

/// Reward accrued so far: linear proration while locked, the full projected
/// reward once unlockable or unstaked.
pub fn current_reward(stake: &StakeRecord, now: DateTime<Utc>) -> Decimal {
    match derive_status(stake, now) {
        StakeStatus::Locked => {
            let total_ms = (stake.unlock_date - stake.start_date).num_milliseconds() as f64;
            if total_ms <= 0.0 {
                return stake.projected_reward;
            }
            let elapsed_ms = (now - stake.start_date).num_milliseconds() as f64;
            let ratio = (elapsed_ms / total_ms).clamp(0.0, 1.0);
            let reward = stake.projected_reward.to_f64().unwrap_or(0.0) * ratio;
            Decimal::from_f64(reward)
                .unwrap_or(Decimal::ZERO)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        }
        _ => stake.projected_reward,
    }
}

#[async_trait]
pub trait StakeStore: Send + Sync {
    async fn insert(&self, user_id: Uuid, stake: &StakeRecord) -> Result<(), StoreError>;
    async fn list(&self, user_id: Uuid) -> Result<Vec<StakeRecord>, StoreError>;
    async fn set_status(
        &self,
        user_id: Uuid,
        stake_id: Uuid,
        status: StakeStatus,
    ) -> Result<(), StoreError>;
}

/// SeaORM-backed store against the `stakes` table.
#[derive(Clone)]
pub struct RemoteStakeStore {
    db: DatabaseConnection,
}

impl RemoteStakeStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StakeStore for RemoteStakeStore {
    async fn insert(&self, user_id: Uuid, stake: &StakeRecord) -> Result<(), StoreError> {
        let now = Utc::now();
        let row = stakes::ActiveModel {
            id: Set(stake.id),
            user_id: Set(user_id),
            amount: Set(stake.amount),
            period: Set(stake.period_days),
            apy: Set(stake.apy),
            start_date: Set(stake.start_date.into()),
            unlock_date: Set(stake.unlock_date.into()),
            projected_reward: Set(stake.projected_reward),
            status: Set(stake.status.as_str().to_string()),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        row.insert(&self.db).await?;
        Ok(())
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<StakeRecord>, StoreError> {
        let rows = Stakes::find()
            .filter(stakes::Column::UserId.eq(user_id))
            .order_by(stakes::Column::CreatedAt, Order::Desc)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| StakeRecord {
                id: row.id,
                amount: row.amount,
                period_days: row.period,
                apy: row.apy,
                start_date: row.start_date.with_timezone(&Utc),
                unlock_date: row.unlock_date.with_timezone(&Utc),
                projected_reward: row.projected_reward,
                status: StakeStatus::parse(&row.status).unwrap_or(StakeStatus::Locked),
            })
            .collect())
    }

    async fn set_status(
        &self,
        user_id: Uuid,
        stake_id: Uuid,
        status: StakeStatus,
    ) -> Result<(), StoreError> {
        let row = Stakes::find_by_id(stake_id)
            .filter(stakes::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound)?;

        let mut active = row.into_active_model();
        active.status = Set(status.as_str().to_string());
        active.updated_at = Set(Utc::now().into());
        active.update(&self.db).await?;
        Ok(())
    }
}

/// JSON-file fallback store, one blob per user.
#[derive(Clone)]
pub struct LocalStakeStore {
    store: LocalStore,
}

impl LocalStakeStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    fn key(user_id: Uuid) -> String {
        format!("stakes_{}", user_id)
    }
}

#[async_trait]
impl StakeStore for LocalStakeStore {
    async fn insert(&self, user_id: Uuid, stake: &StakeRecord) -> Result<(), StoreError> {
        let key = Self::key(user_id);
        let mut records: Vec<StakeRecord> = self.store.read(&key)?.unwrap_or_default();
        records.insert(0, stake.clone());
        self.store.write(&key, &records)
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<StakeRecord>, StoreError> {
        Ok(self.store.read(&Self::key(user_id))?.unwrap_or_default())
    }

    async fn set_status(
        &self,
        user_id: Uuid,
        stake_id: Uuid,
        status: StakeStatus,
    ) -> Result<(), StoreError> {
        let key = Self::key(user_id);
        let mut records: Vec<StakeRecord> = self.store.read(&key)?.unwrap_or_default();
        let record = records
            .iter_mut()
            .find(|r| r.id == stake_id)
            .ok_or(StoreError::NotFound)?;
        record.status = status;
        self.store.write(&key, &records)
    }
}

/// Two-tier facade with the same fallback policy as the investment ledger.
#[derive(Clone)]
pub struct StakeLedger {
    remote: Arc<dyn StakeStore>,
    local: Arc<dyn StakeStore>,
}

impl StakeLedger {
    pub fn new(remote: Arc<dyn StakeStore>, local: Arc<dyn StakeStore>) -> Self {
        Self { remote, local }
    }

    pub async fn insert(&self, user_id: Uuid, stake: &StakeRecord) -> Result<(), StoreError> {
        self.local.insert(user_id, stake).await?;
        if let Err(e) = self.remote.insert(user_id, stake).await {
            warn!("Remote stake write failed, kept local copy: {}", e);
        }
        Ok(())
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<StakeRecord>, StoreError> {
        match self.remote.list(user_id).await {
            Ok(records) if !records.is_empty() => Ok(records),
            Ok(_) => self.local.list(user_id).await,
            Err(e) => {
                warn!("Remote stake read failed, falling back to local: {}", e);
                self.local.list(user_id).await
            }
        }
    }

    pub async fn set_status(
        &self,
        user_id: Uuid,
        stake_id: Uuid,
        status: StakeStatus,
    ) -> Result<(), StoreError> {
        self.local.set_status(user_id, stake_id, status).await?;
        if let Err(e) = self.remote.set_status(user_id, stake_id, status).await {
            warn!("Remote stake status update failed: {}", e);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct StakingService {
    stakes: StakeLedger,
    ledger: InvestmentLedger,
    clock: Arc<dyn Clock>,
}

impl StakingService {
    pub fn new(stakes: StakeLedger, ledger: InvestmentLedger, clock: Arc<dyn Clock>) -> Self {
        Self {
            stakes,
            ledger,
            clock,
        }
    }

    /// Invested principal not currently locked in an active stake.
    pub async fn available_balance(&self, user_id: Uuid) -> Result<Decimal, StoreError> {
        let invested = self.ledger.total_invested(user_id).await?;
        Ok(invested - self.total_staked(user_id).await?)
    }

    /// Sum of active (non-unstaked) stake amounts, on derived status.
    pub async fn total_staked(&self, user_id: Uuid) -> Result<Decimal, StoreError> {
        let now = self.clock.now();
        let stakes = self.stakes.list(user_id).await?;
        Ok(stakes
            .iter()
            .filter(|s| derive_status(s, now).is_active())
            .map(|s| s.amount)
            .sum())
    }

    /// The available-balance invariant is enforced here, at creation time
    /// only; later projection growth does not retroactively free balance.
    pub async fn create_stake(
        &self,
        user_id: Option<Uuid>,
        amount: &str,
        period_days: i32,
    ) -> Result<StakeRecord, StakeError> {
        let user_id = user_id.ok_or(StakeError::Unauthenticated)?;

        let amount = Decimal::from_str(amount.trim()).map_err(|_| StakeError::InvalidAmount)?;
        if amount <= Decimal::ZERO {
            return Err(StakeError::InvalidAmount);
        }

        let apy = apy_for_period(period_days).ok_or(StakeError::InvalidPeriod)?;

        let available = self.available_balance(user_id).await?;
        if amount > available {
            return Err(StakeError::InsufficientBalance { available });
        }

        let start = self.clock.now();
        let projected_reward = (amount * apy * Decimal::from(period_days)
            / (dec!(100) * Decimal::from(DAYS_PER_YEAR)))
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        let stake = StakeRecord {
            id: Uuid::new_v4(),
            amount,
            period_days,
            apy,
            start_date: start,
            unlock_date: start + Duration::days(period_days as i64),
            projected_reward,
            status: StakeStatus::Locked,
        };

        self.stakes.insert(user_id, &stake).await?;
        Ok(stake)
    }

    /// Stakes with freshly derived statuses. Locked stakes observed past
    /// their unlock date are written back as unlockable, best-effort; the
    /// derived value is returned either way.
    pub async fn list_stakes(&self, user_id: Uuid) -> Result<Vec<StakeRecord>, StoreError> {
        let now = self.clock.now();
        let mut stakes = self.stakes.list(user_id).await?;

        for stake in &mut stakes {
            let derived = derive_status(stake, now);
            if derived != stake.status {
                if let Err(e) = self.stakes.set_status(user_id, stake.id, derived).await {
                    warn!("Stake status write-back failed for {}: {}", stake.id, e);
                }
                stake.status = derived;
            }
        }

        Ok(stakes)
    }

    pub async fn unstake(
        &self,
        user_id: Option<Uuid>,
        stake_id: Uuid,
    ) -> Result<StakeRecord, StakeError> {
        let user_id = user_id.ok_or(StakeError::Unauthenticated)?;
        let now = self.clock.now();

        let stakes = self.stakes.list(user_id).await?;
        let mut stake = stakes
            .into_iter()
            .find(|s| s.id == stake_id)
            .ok_or(StakeError::NotFound)?;

        if derive_status(&stake, now) == StakeStatus::Locked {
            return Err(StakeError::NotUnlockable {
                unlock_date: stake.unlock_date,
            });
        }

        self.stakes
            .set_status(user_id, stake_id, StakeStatus::Unstaked)
            .await?;
        stake.status = StakeStatus::Unstaked;
        Ok(stake)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::investment::InvestmentRecord;
    use crate::services::clock::ManualClock;
    use crate::services::ledger::{InvestmentStore, LocalInvestmentStore};

    struct Harness {
        _dirs: (tempfile::TempDir, tempfile::TempDir),
        clock: ManualClock,
        service: StakingService,
        user: Uuid,
    }

    async fn harness(invested_eur: Decimal) -> Harness {
        let dir_inv = tempfile::tempdir().unwrap();
        let dir_stk = tempfile::tempdir().unwrap();
        let clock = ManualClock::new(Utc::now());
        let user = Uuid::new_v4();

        let inv_store = Arc::new(LocalInvestmentStore::new(
            LocalStore::new(dir_inv.path()).unwrap(),
        ));
        inv_store
            .append(
                user,
                &InvestmentRecord {
                    id: Uuid::new_v4(),
                    eth_amount: dec!(0.5),
                    eur_value: invested_eur,
                    created_at: clock.now(),
                },
            )
            .await
            .unwrap();
        let ledger = InvestmentLedger::new(inv_store.clone(), inv_store);

        let stake_remote = Arc::new(LocalStakeStore::new(
            LocalStore::new(dir_stk.path().join("remote")).unwrap(),
        ));
        let stake_local = Arc::new(LocalStakeStore::new(
            LocalStore::new(dir_stk.path().join("local")).unwrap(),
        ));
        let stakes = StakeLedger::new(stake_remote, stake_local);

        let service = StakingService::new(stakes, ledger, Arc::new(clock.clone()));

        Harness {
            _dirs: (dir_inv, dir_stk),
            clock,
            service,
            user,
        }
    }

    #[test]
    fn apy_tiers_match_product_policy() {
        assert_eq!(apy_for_period(30), Some(dec!(1.3)));
        assert_eq!(apy_for_period(90), Some(dec!(4.0)));
        assert_eq!(apy_for_period(365), Some(dec!(17.6)));
        assert_eq!(apy_for_period(180), None);
    }

    #[tokio::test]
    async fn yearly_stake_projects_full_apy() {
        let h = harness(dec!(1000)).await;

        let stake = h
            .service
            .create_stake(Some(h.user), "1000", 365)
            .await
            .unwrap();

        assert_eq!(stake.apy, dec!(17.6));
        assert_eq!(stake.projected_reward, dec!(176.00));
    }

    #[tokio::test]
    async fn locked_reward_prorates_linearly() {
        let h = harness(dec!(1000)).await;
        let stake = h
            .service
            .create_stake(Some(h.user), "1000", 365)
            .await
            .unwrap();

        // exactly half the lock period
        h.clock.advance(Duration::hours(182 * 24 + 12));
        assert_eq!(current_reward(&stake, h.clock.now()), dec!(88.00));
    }

    #[tokio::test]
    async fn reward_is_full_after_unlock() {
        let h = harness(dec!(1000)).await;
        let stake = h
            .service
            .create_stake(Some(h.user), "500", 30)
            .await
            .unwrap();

        h.clock.advance(Duration::days(45));
        assert_eq!(current_reward(&stake, h.clock.now()), stake.projected_reward);
    }

    #[tokio::test]
    async fn overdrawn_stake_is_rejected_and_leaves_balance_untouched() {
        let h = harness(dec!(500)).await;

        let err = h
            .service
            .create_stake(Some(h.user), "600", 30)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StakeError::InsufficientBalance { available } if available == dec!(500)
        ));

        assert!(h.service.list_stakes(h.user).await.unwrap().is_empty());
        assert_eq!(h.service.available_balance(h.user).await.unwrap(), dec!(500));
    }

    #[tokio::test]
    async fn successful_stake_reduces_available_balance() {
        let h = harness(dec!(1000)).await;

        h.service
            .create_stake(Some(h.user), "400", 90)
            .await
            .unwrap();

        assert_eq!(h.service.available_balance(h.user).await.unwrap(), dec!(600));
    }

    #[tokio::test]
    async fn invalid_inputs_are_rejected() {
        let h = harness(dec!(1000)).await;

        assert!(matches!(
            h.service.create_stake(None, "100", 30).await.unwrap_err(),
            StakeError::Unauthenticated
        ));
        assert!(matches!(
            h.service
                .create_stake(Some(h.user), "abc", 30)
                .await
                .unwrap_err(),
            StakeError::InvalidAmount
        ));
        assert!(matches!(
            h.service
                .create_stake(Some(h.user), "-5", 30)
                .await
                .unwrap_err(),
            StakeError::InvalidAmount
        ));
        assert!(matches!(
            h.service
                .create_stake(Some(h.user), "100", 45)
                .await
                .unwrap_err(),
            StakeError::InvalidPeriod
        ));
    }

    #[tokio::test]
    async fn unstake_before_unlock_fails() {
        let h = harness(dec!(1000)).await;
        let stake = h
            .service
            .create_stake(Some(h.user), "300", 30)
            .await
            .unwrap();

        let err = h
            .service
            .unstake(Some(h.user), stake.id)
            .await
            .unwrap_err();
        assert!(matches!(err, StakeError::NotUnlockable { .. }));
    }

    #[tokio::test]
    async fn status_becomes_unlockable_without_unstake_call() {
        let h = harness(dec!(1000)).await;
        h.service
            .create_stake(Some(h.user), "300", 30)
            .await
            .unwrap();

        h.clock.advance(Duration::days(31));

        let stakes = h.service.list_stakes(h.user).await.unwrap();
        assert_eq!(stakes[0].status, StakeStatus::Unlockable);
    }

    #[tokio::test]
    async fn unstake_after_unlock_frees_balance() {
        let h = harness(dec!(1000)).await;
        let stake = h
            .service
            .create_stake(Some(h.user), "300", 30)
            .await
            .unwrap();

        h.clock.advance(Duration::days(31));
        let unstaked = h.service.unstake(Some(h.user), stake.id).await.unwrap();
        assert_eq!(unstaked.status, StakeStatus::Unstaked);

        assert_eq!(
            h.service.available_balance(h.user).await.unwrap(),
            dec!(1000)
        );
    }
}
