//! Router-level tests against an in-memory application: memory profile
//! store, local JSON stores for both ledger tiers, an unreachable price API
//! (so the fallback table is served) and a manual clock.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use tokenvest_backend::services::{
    auth::{AuthService, MemoryProfileStore},
    clock::ManualClock,
    dashboard::DashboardService,
    investment_flow::InvestmentFlow,
    ledger::{InvestmentLedger, LocalInvestmentStore},
    local_store::LocalStore,
    price_feed::PriceFeedService,
    staking::{LocalStakeStore, StakeLedger, StakingService},
    withdrawals::WithdrawalService,
};
use tokenvest_backend::{router, AppState};

struct TestApp {
    app: Router,
    clock: ManualClock,
    _dir: tempfile::TempDir,
}

fn test_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let clock = ManualClock::new(Utc::now());
    let clock_arc: Arc<ManualClock> = Arc::new(clock.clone());

    let local = LocalStore::new(dir.path().join("data")).unwrap();
    let prices = PriceFeedService::new(
        "http://127.0.0.1:1/simple/price".to_string(),
        "tokenvest".to_string(),
        30,
    );

    let remote_inv = Arc::new(LocalInvestmentStore::new(
        LocalStore::new(dir.path().join("remote_inv")).unwrap(),
    ));
    let local_inv = Arc::new(LocalInvestmentStore::new(local.clone()));
    let ledger = InvestmentLedger::new(remote_inv, local_inv);

    let remote_stk = Arc::new(LocalStakeStore::new(
        LocalStore::new(dir.path().join("remote_stk")).unwrap(),
    ));
    let local_stk = Arc::new(LocalStakeStore::new(local.clone()));
    let staking = StakingService::new(
        StakeLedger::new(remote_stk, local_stk),
        ledger.clone(),
        clock_arc.clone(),
    );

    let auth = AuthService::new(Arc::new(MemoryProfileStore::new()), clock_arc.clone());

    let state = AppState {
        flow: InvestmentFlow::new(
            prices.clone(),
            ledger.clone(),
            local.clone(),
            clock_arc.clone(),
            0.0,
        ),
        dashboard: DashboardService::new(ledger.clone(), staking.clone(), clock_arc.clone()),
        withdrawals: WithdrawalService::new(local, clock_arc.clone()),
        auth,
        prices,
        ledger,
        staking,
        clock: clock_arc,
    };

    TestApp {
        app: router(state),
        clock,
        _dir: dir,
    }
}

async fn request(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let body = match body {
        Some(json) => Body::from(serde_json::to_vec(&json).unwrap()),
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn sign_in(app: &Router) -> String {
    let (status, _) = request(
        app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({"email": "ada@example.com", "password": "hunter22", "fullName": "Ada"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = request(
        app,
        "POST",
        "/api/auth/signin",
        None,
        Some(json!({"email": "ada@example.com", "password": "hunter22"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn prices_endpoint_serves_fallback_without_network() {
    let t = test_app();

    let (status, body) = request(&t.app, "GET", "/api/prices", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fallback"], json!(true));
    assert_eq!(body["prices"]["baseCrypto"]["eur"], json!(2000.0));
    assert_eq!(body["prices"]["platformToken"]["eur"], json!(0.10));
}

#[tokio::test]
async fn protected_endpoints_require_a_session() {
    let t = test_app();

    for uri in ["/api/investments", "/api/dashboard", "/api/flow", "/api/stakes"] {
        let (status, _) = request(&t.app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "uri: {}", uri);
    }
}

#[tokio::test]
async fn signup_is_pending_until_first_sign_in() {
    let t = test_app();

    let (status, body) = request(
        &t.app,
        "POST",
        "/api/auth/signup",
        None,
        Some(json!({"email": "ada@example.com", "password": "hunter22", "fullName": null})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["pendingConfirmation"], json!(true));

    let (status, body) = request(
        &t.app,
        "POST",
        "/api/auth/signin",
        None,
        Some(json!({"email": "ada@example.com", "password": "hunter22"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].is_string());

    let token = body["token"].as_str().unwrap();
    let (status, session) = request(&t.app, "GET", "/api/auth/session", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["email"], json!("ada@example.com"));
}

#[tokio::test]
async fn sign_out_revokes_the_token() {
    let t = test_app();
    let token = sign_in(&t.app).await;

    let (status, _) = request(&t.app, "POST", "/api/auth/signout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = request(&t.app, "GET", "/api/auth/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn full_investment_journey() {
    let t = test_app();
    let token = sign_in(&t.app).await;

    // fresh flow starts at the connect step
    let (status, flow) = request(&t.app, "GET", "/api/flow", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flow["step"], json!(1));

    let (status, flow) = request(
        &t.app,
        "POST",
        "/api/flow/connect",
        Some(&token),
        Some(json!({"provider": "MetaMask"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flow["step"], json!(2));
    assert_eq!(flow["walletProvider"], json!("MetaMask"));

    // fallback table: token 0.10 EUR, ETH 2000 EUR
    let (status, flow) = request(
        &t.app,
        "POST",
        "/api/flow/convert",
        Some(&token),
        Some(json!({"eurAmount": "1000"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flow["step"], json!(3));
    assert_eq!(flow["phase"], json!("initial"));
    assert_eq!(flow["tokenAmount"], json!("10000.00"));
    assert_eq!(flow["ethAmount"], json!("0.500000"));
    assert!(flow["depositAddress"].is_string());

    let (status, flow) = request(&t.app, "POST", "/api/flow/confirm", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flow["phase"], json!("confirmed"));

    // the confirmed transfer is on the ledger
    let (status, body) = request(&t.app, "GET", "/api/investments", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["investments"].as_array().unwrap().len(), 1);
    assert_eq!(body["totalInvested"], json!("1000"));

    // flow can be reset for the next investment
    let (status, flow) = request(&t.app, "POST", "/api/flow/complete", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(flow["step"], json!(1));
}

#[tokio::test]
async fn conversion_below_minimum_is_rejected() {
    let t = test_app();
    let token = sign_in(&t.app).await;

    request(
        &t.app,
        "POST",
        "/api/flow/connect",
        Some(&token),
        Some(json!({"provider": "MetaMask"})),
    )
    .await;

    // 10 EUR at 2000 EUR/ETH is below the 0.01 ETH floor
    let (status, body) = request(
        &t.app,
        "POST",
        "/api/flow/convert",
        Some(&token),
        Some(json!({"eurAmount": "10"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

async fn invest(t: &TestApp, token: &str, eur: &str) {
    request(
        &t.app,
        "POST",
        "/api/flow/connect",
        Some(token),
        Some(json!({"provider": "MetaMask"})),
    )
    .await;
    request(
        &t.app,
        "POST",
        "/api/flow/convert",
        Some(token),
        Some(json!({"eurAmount": eur})),
    )
    .await;
    let (status, _) = request(&t.app, "POST", "/api/flow/confirm", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    request(&t.app, "POST", "/api/flow/complete", Some(token), None).await;
}

#[tokio::test]
async fn staking_lifecycle_over_virtual_time() {
    let t = test_app();
    let token = sign_in(&t.app).await;
    invest(&t, &token, "1000").await;

    // stake part of the balance for 90 days
    let (status, stake) = request(
        &t.app,
        "POST",
        "/api/stakes",
        Some(&token),
        Some(json!({"amount": "400", "periodDays": 90})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(stake["status"], json!("locked"));
    assert_eq!(stake["apy"], json!("4.0"));
    let stake_id = stake["id"].as_str().unwrap().to_string();

    let (status, body) = request(&t.app, "GET", "/api/stakes", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["availableBalance"], json!("600"));
    assert_eq!(body["totalStaked"], json!("400"));

    // overdrawing the remaining balance fails
    let (status, _) = request(
        &t.app,
        "POST",
        "/api/stakes",
        Some(&token),
        Some(json!({"amount": "700", "periodDays": 30})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // unstaking while locked fails
    let (status, _) = request(
        &t.app,
        "POST",
        &format!("/api/stakes/{}/unstake", stake_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // past the unlock date the stake becomes unlockable on read
    t.clock.advance(Duration::days(91));
    let (_, body) = request(&t.app, "GET", "/api/stakes", Some(&token), None).await;
    assert_eq!(body["stakes"][0]["status"], json!("unlockable"));

    let (status, stake) = request(
        &t.app,
        "POST",
        &format!("/api/stakes/{}/unstake", stake_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stake["status"], json!("unstaked"));

    // the principal is available again
    let (_, body) = request(&t.app, "GET", "/api/stakes", Some(&token), None).await;
    assert_eq!(body["availableBalance"], json!("1000"));
}

#[tokio::test]
async fn dashboard_aggregates_portfolio_and_rewards() {
    let t = test_app();
    let token = sign_in(&t.app).await;
    invest(&t, &token, "1000").await;

    request(
        &t.app,
        "POST",
        "/api/stakes",
        Some(&token),
        Some(json!({"amount": "400", "periodDays": 90})),
    )
    .await;

    let (status, body) = request(&t.app, "GET", "/api/dashboard", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["totalInvested"], json!("1000"));
    assert_eq!(body["allocation"].as_array().unwrap().len(), 4);
    assert_eq!(body["allocation"][0]["name"], json!("Platform Tokens"));
    assert_eq!(body["performance"].as_array().unwrap().len(), 1);
    assert_eq!(body["monthlyProjections"].as_array().unwrap().len(), 6);
    assert_eq!(body["rewardsByPeriod"][0]["periodDays"], json!(90));
    // 400 * 4% * 90/365 projected at maturity
    assert_eq!(body["rewards"]["totalProjected"], json!("3.95"));
}

#[tokio::test]
async fn withdrawals_roundtrip() {
    let t = test_app();
    let token = sign_in(&t.app).await;

    let (status, record) = request(
        &t.app,
        "POST",
        "/api/withdrawals",
        Some(&token),
        Some(json!({
            "amount": "250.50",
            "walletAddress": "0x8Ba1f109551bD432803012645Ac136ddd64DBA72"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(record["status"], json!("pending"));

    let (status, _) = request(
        &t.app,
        "POST",
        "/api/withdrawals",
        Some(&token),
        Some(json!({"amount": "100", "walletAddress": "0xshort"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = request(&t.app, "GET", "/api/withdrawals", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["withdrawals"].as_array().unwrap().len(), 1);
    assert_eq!(body["withdrawals"][0]["amount"], json!("250.50"));
}
