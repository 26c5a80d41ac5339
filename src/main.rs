use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use std::env;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tokenvest_backend::services::{
    auth::{AuthService, SeaOrmProfileStore, SessionEvent},
    clock::SystemClock,
    dashboard::DashboardService,
    investment_flow::InvestmentFlow,
    ledger::{InvestmentLedger, LocalInvestmentStore, RemoteInvestmentStore},
    local_store::LocalStore,
    price_feed::PriceFeedService,
    staking::{LocalStakeStore, RemoteStakeStore, StakeLedger, StakingService},
    withdrawals::WithdrawalService,
};
use tokenvest_backend::{router, AppState};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tokenvest_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Connect to database
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    tracing::info!("Connecting to database...");
    let db = Database::connect(&database_url)
        .await
        .expect("Failed to connect to database");

    // Run migrations
    tracing::info!("Running migrations...");
    migration::Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    let data_dir = env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());
    let local = LocalStore::new(&data_dir).expect("Failed to create local data directory");

    let price_api_url = env::var("PRICE_API_URL")
        .unwrap_or_else(|_| "https://api.coingecko.com/api/v3/simple/price".to_string());
    let token_id = env::var("PLATFORM_TOKEN_ID").unwrap_or_else(|_| "tokenvest".to_string());
    let poll_secs = env::var("PRICE_POLL_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(30);
    let connect_failure_chance = env::var("CONNECT_FAILURE_CHANCE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(0.1);

    let clock = Arc::new(SystemClock);

    let prices = PriceFeedService::new(price_api_url, token_id, poll_secs);
    prices.start_polling();

    let ledger = InvestmentLedger::new(
        Arc::new(RemoteInvestmentStore::new(db.clone())),
        Arc::new(LocalInvestmentStore::new(local.clone())),
    );
    let stakes = StakeLedger::new(
        Arc::new(RemoteStakeStore::new(db.clone())),
        Arc::new(LocalStakeStore::new(local.clone())),
    );
    let staking = StakingService::new(stakes, ledger.clone(), clock.clone());

    let auth = AuthService::new(Arc::new(SeaOrmProfileStore::new(db)), clock.clone());

    // Log session lifecycle events
    let mut events = auth.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::SignedIn { user_id, email } => {
                    tracing::info!("Session opened for {} ({})", email, user_id)
                }
                SessionEvent::SignedOut { user_id } => {
                    tracing::info!("Session closed for {}", user_id)
                }
            }
        }
    });

    let state = AppState {
        flow: InvestmentFlow::new(
            prices.clone(),
            ledger.clone(),
            local.clone(),
            clock.clone(),
            connect_failure_chance,
        ),
        dashboard: DashboardService::new(ledger.clone(), staking.clone(), clock.clone()),
        withdrawals: WithdrawalService::new(local, clock.clone()),
        auth,
        prices,
        ledger,
        staking,
        clock,
    };

    let app = router(state);

    // Start server
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind server address");

    tracing::info!(
        "Server listening on {}",
        listener.local_addr().expect("Failed to read bound address")
    );

    axum::serve(listener, app).await.expect("Server error");
}
