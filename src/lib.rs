// src/lib.rs

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use services::{
    auth::AuthService, clock::Clock, dashboard::DashboardService,
    investment_flow::InvestmentFlow, ledger::InvestmentLedger, price_feed::PriceFeedService,
    staking::StakingService, withdrawals::WithdrawalService,
};

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub prices: PriceFeedService,
    pub flow: InvestmentFlow,
    pub ledger: InvestmentLedger,
    pub staking: StakingService,
    pub dashboard: DashboardService,
    pub withdrawals: WithdrawalService,
    pub clock: Arc<dyn Clock>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/api/prices", get(handlers::prices::get_prices))
        .route("/api/auth/signup", post(handlers::auth::sign_up))
        .route("/api/auth/signin", post(handlers::auth::sign_in))
        .route("/api/auth/signout", post(handlers::auth::sign_out))
        .route("/api/auth/session", get(handlers::auth::current_session))
        .route(
            "/api/auth/reset-password",
            post(handlers::auth::request_password_reset),
        )
        .route("/api/flow", get(handlers::flow::get_flow))
        .route("/api/flow/connect", post(handlers::flow::connect_wallet))
        .route("/api/flow/convert", post(handlers::flow::convert))
        .route("/api/flow/confirm", post(handlers::flow::confirm_transfer))
        .route("/api/flow/complete", post(handlers::flow::complete_flow))
        .route(
            "/api/investments",
            get(handlers::investments::get_investments),
        )
        .route(
            "/api/stakes",
            get(handlers::stakes::get_stakes).post(handlers::stakes::create_stake),
        )
        .route("/api/stakes/{id}/unstake", post(handlers::stakes::unstake))
        .route("/api/dashboard", get(handlers::dashboard::get_dashboard))
        .route(
            "/api/withdrawals",
            get(handlers::withdrawals::get_withdrawals)
                .post(handlers::withdrawals::submit_withdrawal),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn hello() -> &'static str {
    "Hello from TokenVest Backend! 🚀"
}

pub mod entities {
    pub mod prelude;
    pub mod investments;
    pub mod profiles;
    pub mod stakes;
}

pub mod services {
    pub mod auth;
    pub mod clock;
    pub mod conversion;
    pub mod dashboard;
    pub mod investment_flow;
    pub mod ledger;
    pub mod local_store;
    pub mod price_feed;
    pub mod projection;
    pub mod staking;
    pub mod withdrawals;
}

pub mod models;
pub mod handlers;
