//! Three-step investment flow
//!
//! Connect wallet -> convert currency -> complete transaction. Per-user flow
//! state lives in memory; only a confirmed transfer touches the ledger. The
//! wallet connection and on-chain transfer are simulated with injectable
//! delays, and connection attempts fail with a configurable chance to mirror
//! real wallet flakiness.

use parking_lot::RwLock;
use rand::Rng;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::models::flow::FlowResponse;
use crate::models::investment::InvestmentRecord;
use crate::services::clock::Clock;
use crate::services::conversion;
use crate::services::ledger::InvestmentLedger;
use crate::services::local_store::{LocalStore, StoreError};
use crate::services::price_feed::PriceFeedService;

/// Address shown to the user at the transfer step.
pub const DEPOSIT_ADDRESS: &str = "0x8Ba1f109551bD432803012645Ac136ddd64DBA72";

/// Transfers below this many ETH are rejected at the conversion step.
pub const MIN_ETH_AMOUNT: f64 = 0.01;

const CONNECT_DELAY: Duration = Duration::from_millis(1500);
const TRANSFER_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("wallet connection failed")]
    ConnectionFailed,
    #[error("amount must be a positive number")]
    InvalidAmount,
    #[error("minimum transfer is {MIN_ETH_AMOUNT} ETH")]
    BelowMinimum,
    #[error("a transfer is already pending for this account")]
    AlreadyPending,
    #[error("operation not valid at the current step")]
    InvalidStep,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxPhase {
    Initial,
    Processing,
    Confirmed,
}

impl TxPhase {
    fn as_str(&self) -> &'static str {
        match self {
            TxPhase::Initial => "initial",
            TxPhase::Processing => "processing",
            TxPhase::Confirmed => "confirmed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowStep {
    ConnectWallet,
    ConvertCurrency,
    CompleteTransaction(TxPhase),
}

#[derive(Debug, Clone)]
struct FlowState {
    step: FlowStep,
    wallet_provider: Option<String>,
    eur_amount: Option<String>,
    token_amount: Option<String>,
    eth_amount: Option<String>,
}

impl Default for FlowState {
    fn default() -> Self {
        Self {
            step: FlowStep::ConnectWallet,
            wallet_provider: None,
            eur_amount: None,
            token_amount: None,
            eth_amount: None,
        }
    }
}

impl FlowState {
    fn response(&self) -> FlowResponse {
        let (step, phase) = match self.step {
            FlowStep::ConnectWallet => (1, None),
            FlowStep::ConvertCurrency => (2, None),
            FlowStep::CompleteTransaction(phase) => (3, Some(phase.as_str().to_string())),
        };

        let at_transfer = step == 3;
        FlowResponse {
            step,
            phase,
            wallet_provider: self.wallet_provider.clone(),
            eur_amount: self.eur_amount.clone(),
            token_amount: self.token_amount.clone(),
            eth_amount: self.eth_amount.clone(),
            deposit_address: at_transfer.then(|| DEPOSIT_ADDRESS.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct InvestmentFlow {
    sessions: Arc<RwLock<HashMap<Uuid, FlowState>>>,
    prices: PriceFeedService,
    ledger: InvestmentLedger,
    local: LocalStore,
    clock: Arc<dyn Clock>,
    connect_failure_chance: f64,
}

impl InvestmentFlow {
    pub fn new(
        prices: PriceFeedService,
        ledger: InvestmentLedger,
        local: LocalStore,
        clock: Arc<dyn Clock>,
        connect_failure_chance: f64,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            prices,
            ledger,
            local,
            clock,
            connect_failure_chance,
        }
    }

    fn pending_key(user_id: Uuid) -> String {
        format!("pending_investment_{}", user_id)
    }

    pub fn state(&self, user_id: Option<Uuid>) -> Result<FlowResponse, FlowError> {
        let user_id = user_id.ok_or(FlowError::Unauthenticated)?;
        let sessions = self.sessions.read();
        Ok(sessions.get(&user_id).cloned().unwrap_or_default().response())
    }

    pub fn reset(&self, user_id: Option<Uuid>) -> Result<FlowResponse, FlowError> {
        let user_id = user_id.ok_or(FlowError::Unauthenticated)?;
        let mut sessions = self.sessions.write();
        sessions.remove(&user_id);
        Ok(FlowState::default().response())
    }

    /// Step 1. The connection attempt itself is simulated; a failure leaves
    /// the flow at the connect step so the user can retry.
    pub async fn connect_wallet(
        &self,
        user_id: Option<Uuid>,
        provider: &str,
    ) -> Result<FlowResponse, FlowError> {
        let user_id = user_id.ok_or(FlowError::Unauthenticated)?;

        self.clock.sleep(CONNECT_DELAY).await;

        let failed = rand::thread_rng().gen_bool(self.connect_failure_chance.clamp(0.0, 1.0));
        if failed {
            return Err(FlowError::ConnectionFailed);
        }

        let mut sessions = self.sessions.write();
        let state = sessions.entry(user_id).or_default();
        state.wallet_provider = Some(provider.to_string());
        state.step = FlowStep::ConvertCurrency;
        Ok(state.response())
    }

    /// Step 2. Quotes both conversions off the same snapshot so the token
    /// and ETH figures are mutually consistent.
    pub async fn convert(
        &self,
        user_id: Option<Uuid>,
        eur_amount: &str,
    ) -> Result<FlowResponse, FlowError> {
        let user_id = user_id.ok_or(FlowError::Unauthenticated)?;

        let eur = Decimal::from_str(eur_amount.trim()).map_err(|_| FlowError::InvalidAmount)?;
        if eur <= Decimal::ZERO {
            return Err(FlowError::InvalidAmount);
        }

        {
            let sessions = self.sessions.read();
            match sessions.get(&user_id).map(|s| s.step) {
                Some(FlowStep::ConvertCurrency) | Some(FlowStep::CompleteTransaction(_)) => {}
                _ => return Err(FlowError::InvalidStep),
            }
        }

        let snapshot = self.prices.get_prices().await;
        let token_amount =
            conversion::tokens_for_fiat(eur_amount, snapshot.table.platform_token.eur);
        let eth_amount = conversion::crypto_for_fiat(eur_amount, snapshot.table.base_crypto.eur);

        let eth: f64 = eth_amount.parse().unwrap_or(0.0);
        if eth < MIN_ETH_AMOUNT {
            return Err(FlowError::BelowMinimum);
        }

        let mut sessions = self.sessions.write();
        let state = sessions.entry(user_id).or_default();
        state.eur_amount = Some(eur_amount.trim().to_string());
        state.token_amount = Some(token_amount);
        state.eth_amount = Some(eth_amount);
        state.step = FlowStep::CompleteTransaction(TxPhase::Initial);
        Ok(state.response())
    }

    fn set_phase(&self, user_id: Uuid, phase: TxPhase) {
        let mut sessions = self.sessions.write();
        if let Some(state) = sessions.get_mut(&user_id) {
            state.step = FlowStep::CompleteTransaction(phase);
        }
    }

    /// Step 3. The Initial -> Processing transition happens under the
    /// sessions write lock, so of two racing confirms only one proceeds; the
    /// persisted pending marker additionally blocks resubmission after a
    /// crash mid-transfer.
    pub async fn confirm_transfer(
        &self,
        user_id: Option<Uuid>,
    ) -> Result<FlowResponse, FlowError> {
        let user_id = user_id.ok_or(FlowError::Unauthenticated)?;

        let pending_key = Self::pending_key(user_id);
        if self.local.read::<bool>(&pending_key)?.is_some() {
            return Err(FlowError::AlreadyPending);
        }

        let (eur_amount, eth_amount) = {
            let mut sessions = self.sessions.write();
            let state = sessions.get_mut(&user_id).ok_or(FlowError::InvalidStep)?;
            match state.step {
                FlowStep::CompleteTransaction(TxPhase::Initial) => {}
                FlowStep::CompleteTransaction(TxPhase::Processing) => {
                    return Err(FlowError::AlreadyPending)
                }
                _ => return Err(FlowError::InvalidStep),
            }
            let amounts = (
                state.eur_amount.clone().ok_or(FlowError::InvalidStep)?,
                state.eth_amount.clone().ok_or(FlowError::InvalidStep)?,
            );
            state.step = FlowStep::CompleteTransaction(TxPhase::Processing);
            amounts
        };

        if let Err(e) = self.local.write(&pending_key, &true) {
            self.set_phase(user_id, TxPhase::Initial);
            return Err(e.into());
        }

        self.clock.sleep(TRANSFER_DELAY).await;

        let record = InvestmentRecord {
            id: Uuid::new_v4(),
            eth_amount: Decimal::from_str(&eth_amount).unwrap_or(Decimal::ZERO),
            eur_value: Decimal::from_str(&eur_amount).unwrap_or(Decimal::ZERO),
            created_at: self.clock.now(),
        };

        let result = self.ledger.append(user_id, &record).await;
        if let Err(e) = result.and(self.local.remove(&pending_key)) {
            self.set_phase(user_id, TxPhase::Initial);
            return Err(e.into());
        }

        info!(
            "Investment confirmed for {}: {} ETH ({} EUR)",
            user_id, record.eth_amount, record.eur_value
        );

        let mut sessions = self.sessions.write();
        let state = sessions.entry(user_id).or_default();
        state.step = FlowStep::CompleteTransaction(TxPhase::Confirmed);
        Ok(state.response())
    }
}
