//! Investment ledger
//!
//! Append-only record of a user's investments behind a two-tier repository:
//! a remote SeaORM store and a local JSON fallback. Writes go to both tiers
//! (local first, for immediate durability); reads prefer the remote tier and
//! fall back when it errors or returns no rows.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, Order,
    QueryFilter, QueryOrder,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::entities::{investments, prelude::*};
use crate::models::investment::InvestmentRecord;
use crate::services::local_store::{LocalStore, StoreError};

#[async_trait]
pub trait InvestmentStore: Send + Sync {
    async fn append(&self, user_id: Uuid, record: &InvestmentRecord) -> Result<(), StoreError>;
    async fn list(&self, user_id: Uuid) -> Result<Vec<InvestmentRecord>, StoreError>;
}

/// SeaORM-backed store against the `investments` table.
#[derive(Clone)]
pub struct RemoteInvestmentStore {
    db: DatabaseConnection,
}

impl RemoteInvestmentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InvestmentStore for RemoteInvestmentStore {
    async fn append(&self, user_id: Uuid, record: &InvestmentRecord) -> Result<(), StoreError> {
        let row = investments::ActiveModel {
            id: Set(record.id),
            user_id: Set(user_id),
            eth_amount: Set(record.eth_amount),
            eur_value: Set(record.eur_value),
            created_at: Set(record.created_at.into()),
        };
        row.insert(&self.db).await?;
        Ok(())
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<InvestmentRecord>, StoreError> {
        let rows = Investments::find()
            .filter(investments::Column::UserId.eq(user_id))
            .order_by(investments::Column::CreatedAt, Order::Asc)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| InvestmentRecord {
                id: row.id,
                eth_amount: row.eth_amount,
                eur_value: row.eur_value,
                created_at: row.created_at.with_timezone(&Utc),
            })
            .collect())
    }
}

/// JSON-file fallback store, one blob per user.
#[derive(Clone)]
pub struct LocalInvestmentStore {
    store: LocalStore,
}

impl LocalInvestmentStore {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    fn key(user_id: Uuid) -> String {
        format!("investments_{}", user_id)
    }
}

#[async_trait]
impl InvestmentStore for LocalInvestmentStore {
    async fn append(&self, user_id: Uuid, record: &InvestmentRecord) -> Result<(), StoreError> {
        let key = Self::key(user_id);
        let mut records: Vec<InvestmentRecord> = self.store.read(&key)?.unwrap_or_default();
        records.push(record.clone());
        self.store.write(&key, &records)
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<InvestmentRecord>, StoreError> {
        Ok(self.store.read(&Self::key(user_id))?.unwrap_or_default())
    }
}

/// Facade over the two tiers; the fallback policy lives here and nowhere else.
#[derive(Clone)]
pub struct InvestmentLedger {
    remote: Arc<dyn InvestmentStore>,
    local: Arc<dyn InvestmentStore>,
}

impl InvestmentLedger {
    pub fn new(remote: Arc<dyn InvestmentStore>, local: Arc<dyn InvestmentStore>) -> Self {
        Self { remote, local }
    }

    /// Local write is authoritative for the caller; a remote failure is
    /// logged and swallowed, matching toast-level error surfacing.
    pub async fn append(&self, user_id: Uuid, record: &InvestmentRecord) -> Result<(), StoreError> {
        self.local.append(user_id, record).await?;

        if let Err(e) = self.remote.append(user_id, record).await {
            warn!("Remote investment write failed, kept local copy: {}", e);
        }
        Ok(())
    }

    pub async fn list(&self, user_id: Uuid) -> Result<Vec<InvestmentRecord>, StoreError> {
        match self.remote.list(user_id).await {
            Ok(records) if !records.is_empty() => Ok(records),
            Ok(_) => self.local.list(user_id).await,
            Err(e) => {
                warn!("Remote investment read failed, falling back to local: {}", e);
                self.local.list(user_id).await
            }
        }
    }

    pub async fn total_invested(&self, user_id: Uuid) -> Result<Decimal, StoreError> {
        let records = self.list(user_id).await?;
        Ok(records.iter().map(|r| r.eur_value).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct FailingStore;

    #[async_trait]
    impl InvestmentStore for FailingStore {
        async fn append(&self, _: Uuid, _: &InvestmentRecord) -> Result<(), StoreError> {
            Err(StoreError::NotFound)
        }

        async fn list(&self, _: Uuid) -> Result<Vec<InvestmentRecord>, StoreError> {
            Err(StoreError::NotFound)
        }
    }

    fn record(eur: Decimal) -> InvestmentRecord {
        InvestmentRecord {
            id: Uuid::new_v4(),
            eth_amount: dec!(0.5),
            eur_value: eur,
            created_at: Utc::now(),
        }
    }

    fn local_store(dir: &tempfile::TempDir) -> Arc<LocalInvestmentStore> {
        Arc::new(LocalInvestmentStore::new(
            LocalStore::new(dir.path()).unwrap(),
        ))
    }

    #[tokio::test]
    async fn append_survives_remote_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = InvestmentLedger::new(Arc::new(FailingStore), local_store(&dir));
        let user = Uuid::new_v4();

        ledger.append(user, &record(dec!(1000))).await.unwrap();

        let listed = ledger.list(user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].eur_value, dec!(1000));
    }

    #[tokio::test]
    async fn list_prefers_remote_when_it_has_rows() {
        let dir_remote = tempfile::tempdir().unwrap();
        let dir_local = tempfile::tempdir().unwrap();
        let remote = local_store(&dir_remote);
        let local = local_store(&dir_local);
        let user = Uuid::new_v4();

        remote.append(user, &record(dec!(700))).await.unwrap();
        local.append(user, &record(dec!(1))).await.unwrap();

        let ledger = InvestmentLedger::new(remote, local);
        let listed = ledger.list(user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].eur_value, dec!(700));
    }

    #[tokio::test]
    async fn empty_remote_falls_back_to_local() {
        let dir_remote = tempfile::tempdir().unwrap();
        let dir_local = tempfile::tempdir().unwrap();
        let local = local_store(&dir_local);
        let user = Uuid::new_v4();

        local.append(user, &record(dec!(250))).await.unwrap();

        let ledger = InvestmentLedger::new(local_store(&dir_remote), local);
        let listed = ledger.list(user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].eur_value, dec!(250));
    }

    #[tokio::test]
    async fn totals_sum_eur_principal() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = InvestmentLedger::new(Arc::new(FailingStore), local_store(&dir));
        let user = Uuid::new_v4();

        ledger.append(user, &record(dec!(1000))).await.unwrap();
        ledger.append(user, &record(dec!(500))).await.unwrap();

        assert_eq!(ledger.total_invested(user).await.unwrap(), dec!(1500));
    }
}
