//! Withdrawal requests
//!
//! Requests are recorded locally only and reviewed out of band; the API
//! accepts and lists them but never transitions their status.

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::withdrawal::{WithdrawalRecord, WithdrawalStatus};
use crate::services::clock::Clock;
use crate::services::local_store::{LocalStore, StoreError};
use std::sync::Arc;

const MIN_ADDRESS_LEN: usize = 10;

#[derive(Debug, Error)]
pub enum WithdrawalError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("withdrawal amount must be a positive number")]
    InvalidAmount,
    #[error("wallet address must be at least {MIN_ADDRESS_LEN} characters")]
    InvalidAddress,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct WithdrawalService {
    store: LocalStore,
    clock: Arc<dyn Clock>,
}

impl WithdrawalService {
    pub fn new(store: LocalStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    fn key(user_id: Uuid) -> String {
        format!("withdrawals_{}", user_id)
    }

    pub fn submit(
        &self,
        user_id: Option<Uuid>,
        amount: &str,
        wallet_address: &str,
    ) -> Result<WithdrawalRecord, WithdrawalError> {
        let user_id = user_id.ok_or(WithdrawalError::Unauthenticated)?;

        let amount =
            Decimal::from_str(amount.trim()).map_err(|_| WithdrawalError::InvalidAmount)?;
        if amount <= Decimal::ZERO {
            return Err(WithdrawalError::InvalidAmount);
        }

        let wallet_address = wallet_address.trim();
        if wallet_address.len() < MIN_ADDRESS_LEN {
            return Err(WithdrawalError::InvalidAddress);
        }

        let record = WithdrawalRecord {
            id: Uuid::new_v4(),
            amount,
            wallet_address: wallet_address.to_string(),
            status: WithdrawalStatus::Pending,
            created_at: self.clock.now(),
        };

        let key = Self::key(user_id);
        let mut records: Vec<WithdrawalRecord> = self.store.read(&key)?.unwrap_or_default();
        records.insert(0, record.clone());
        self.store.write(&key, &records)?;

        info!("Withdrawal request of {} recorded for {}", amount, user_id);
        Ok(record)
    }

    pub fn list(&self, user_id: Option<Uuid>) -> Result<Vec<WithdrawalRecord>, WithdrawalError> {
        let user_id = user_id.ok_or(WithdrawalError::Unauthenticated)?;
        Ok(self.store.read(&Self::key(user_id))?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::clock::SystemClock;
    use rust_decimal_macros::dec;

    fn service(dir: &tempfile::TempDir) -> WithdrawalService {
        WithdrawalService::new(
            LocalStore::new(dir.path()).unwrap(),
            Arc::new(SystemClock),
        )
    }

    #[test]
    fn submit_records_a_pending_request() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let user = Uuid::new_v4();

        let record = svc
            .submit(Some(user), "250.50", "0x8Ba1f109551bD432803012645Ac136ddd64DBA72")
            .unwrap();

        assert_eq!(record.amount, dec!(250.50));
        assert_eq!(record.status, WithdrawalStatus::Pending);

        let listed = svc.list(Some(user)).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, record.id);
    }

    #[test]
    fn newest_request_lists_first() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let user = Uuid::new_v4();

        svc.submit(Some(user), "100", "0xfirst-address").unwrap();
        let second = svc.submit(Some(user), "200", "0xsecond-address").unwrap();

        let listed = svc.list(Some(user)).unwrap();
        assert_eq!(listed[0].id, second.id);
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let user = Uuid::new_v4();

        assert!(matches!(
            svc.submit(None, "100", "0xsome-address").unwrap_err(),
            WithdrawalError::Unauthenticated
        ));
        assert!(matches!(
            svc.submit(Some(user), "abc", "0xsome-address").unwrap_err(),
            WithdrawalError::InvalidAmount
        ));
        assert!(matches!(
            svc.submit(Some(user), "0", "0xsome-address").unwrap_err(),
            WithdrawalError::InvalidAmount
        ));
        assert!(matches!(
            svc.submit(Some(user), "100", "0xshort").unwrap_err(),
            WithdrawalError::InvalidAddress
        ));

        assert!(svc.list(Some(user)).unwrap().is_empty());
    }

    #[test]
    fn users_see_only_their_own_requests() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        svc.submit(Some(alice), "100", "0xalice-address").unwrap();

        assert_eq!(svc.list(Some(alice)).unwrap().len(), 1);
        assert!(svc.list(Some(bob)).unwrap().is_empty());
    }
}
