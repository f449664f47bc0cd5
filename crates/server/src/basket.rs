use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use basketry_core::errors::{ApplicationError, InterfaceError, MiningError};
use basketry_core::recommend::RecommendationRequest;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::bootstrap::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitBasketRequest {
    #[serde(default)]
    pub basket: Option<Vec<String>>,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct SubmitBasketResponse {
    pub status: &'static str,
    pub value: Vec<String>,
}

#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct BasketError {
    pub status: &'static str,
    pub error: &'static str,
    pub detail: String,
    pub correlation_id: String,
}

type Rejection = (StatusCode, Json<BasketError>);

pub fn router(state: AppState) -> Router {
    Router::new().route("/api/submit_basket", post(submit_basket)).with_state(state)
}

pub async fn submit_basket(
    State(state): State<AppState>,
    payload: Result<Json<SubmitBasketRequest>, JsonRejection>,
) -> Result<Json<SubmitBasketResponse>, Rejection> {
    let correlation_id = Uuid::new_v4().to_string();

    let Json(body) = payload.map_err(|rejection| {
        reject(
            ApplicationError::from(MiningError::invalid_input(rejection.body_text()))
                .into_interface(correlation_id.clone()),
        )
    })?;

    let Some(basket) = body.basket else {
        return Err(reject(
            ApplicationError::from(MiningError::invalid_input("basket is required"))
                .into_interface(correlation_id),
        ));
    };

    let request = RecommendationRequest::new(
        basket.into_iter().map(|item| item.trim().to_owned()).filter(|item| !item.is_empty()),
    )
    .with_max_recommendations(body.count.unwrap_or(state.max_recommendations));
    let value = state.engine.recommend(&request);

    info!(
        event_name = "server.basket.served",
        correlation_id = %correlation_id,
        basket_size = request.basket.len(),
        returned = value.len(),
        "basket recommendations served"
    );

    Ok(Json(SubmitBasketResponse { status: "ok", value }))
}

fn reject(error: InterfaceError) -> Rejection {
    let status = match error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    warn!(
        event_name = "server.basket.rejected",
        correlation_id = %error.correlation_id(),
        status = status.as_u16(),
        error = %error,
        "basket request rejected"
    );

    (
        status,
        Json(BasketError {
            status: "error",
            error: error.user_message(),
            detail: error.to_string(),
            correlation_id: error.correlation_id().to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        extract::State,
        http::{Request, StatusCode},
        Json,
    };
    use basketry_core::config::AppConfig;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::{router, submit_basket, SubmitBasketRequest};
    use crate::bootstrap::{build_state, AppState};

    fn grocery_state() -> AppState {
        let transactions = [
            vec!["milk", "bread"],
            vec!["milk", "bread", "butter"],
            vec!["beer", "bread"],
        ]
        .into_iter()
        .map(|basket| basket.into_iter().map(str::to_owned).collect())
        .collect();

        let mut config = AppConfig::default();
        config.mining.min_confidence = 1.0;
        build_state(&config, transactions).expect("valid config")
    }

    #[tokio::test]
    async fn basket_with_milk_gets_bread() {
        let body = SubmitBasketRequest { basket: Some(vec!["milk".to_string()]), count: None };

        let Json(response) =
            submit_basket(State(grocery_state()), Ok(Json(body))).await.expect("valid request");

        assert_eq!(response.status, "ok");
        assert_eq!(response.value, vec!["bread".to_string()]);
    }

    #[tokio::test]
    async fn count_zero_returns_nothing() {
        let body = SubmitBasketRequest { basket: Some(vec!["milk".to_string()]), count: Some(0) };

        let Json(response) =
            submit_basket(State(grocery_state()), Ok(Json(body))).await.expect("valid request");

        assert!(response.value.is_empty());
    }

    #[tokio::test]
    async fn missing_basket_is_a_bad_request() {
        let body = SubmitBasketRequest { basket: None, count: Some(3) };

        let (status, Json(error)) = submit_basket(State(grocery_state()), Ok(Json(body)))
            .await
            .expect_err("basket is required");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error.status, "error");
        assert!(error.detail.contains("basket is required"));
        assert!(!error.correlation_id.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request_through_the_router() {
        let request = Request::post("/api/submit_basket")
            .header("content-type", "application/json")
            .body(Body::from("{\"basket\": "))
            .expect("request should build");

        let response = router(grocery_state()).oneshot(request).await.expect("router responds");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
        let payload: Value = serde_json::from_slice(&bytes).expect("json error body");
        assert_eq!(payload["status"], "error");
        assert!(payload["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));
    }

    #[tokio::test]
    async fn router_serves_recommendations() {
        let request = Request::post("/api/submit_basket")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"basket": ["milk"], "count": 2}"#))
            .expect("request should build");

        let response = router(grocery_state()).oneshot(request).await.expect("router responds");
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body bytes");
        let payload: Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["value"], serde_json::json!(["bread"]));
    }
}
