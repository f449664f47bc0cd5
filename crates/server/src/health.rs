use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::bootstrap::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub itemsets: usize,
    pub rules: usize,
    pub transactions: usize,
    pub checked_at: String,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: if state.transactions > 0 { "ready" } else { "empty" },
        itemsets: state.itemsets,
        rules: state.engine.rule_count(),
        transactions: state.transactions,
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
