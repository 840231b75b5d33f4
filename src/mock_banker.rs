// src/mock_banker.rs

use axum::extract::Path;
use axum::routing::post;
use axum::serve;
use axum::{Json, Router};
use rand::Rng;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

/// Simulates the banker's balance endpoint for local runs and tests.
///
/// Accepts the pacer's `{"USD/1M": amount}` top-up and answers with a
/// jittered remaining budget between 20% and 100% of it, so the paced
/// strategy gets a moving throttle to react to.
async fn handle_balance(Path(account): Path<String>, Json(top_up): Json<Value>) -> Json<Value> {
    let amount = top_up
        .get("USD/1M")
        .and_then(Value::as_f64)
        .unwrap_or_default();
    let remaining = amount * rand::thread_rng().gen_range(0.2..1.0);

    info!(
        "Mock banker balance report: account={}, amount={}, remaining={:.0}",
        account, amount, remaining
    );

    Json(json!({ "USD/1M": remaining }))
}

pub fn router() -> Router {
    Router::new().route("/v1/accounts/{account}/balance", post(handle_balance))
}

/// Starts the mock banker service on the given port.
pub async fn start_mock_banker_server(port: u16) {
    let addr = format!("0.0.0.0:{}", port);
    info!("Mock banker running at http://{}", addr);

    let listener = TcpListener::bind(&addr).await.unwrap();
    serve(listener, router()).await.unwrap();
}
