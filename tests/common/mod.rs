use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use classrota::events::EventPublisher;
use classrota::router::init_router;
use classrota::state::AppState;
use classrota_config::cors::CorsConfig;

// Re-exported fixtures shared with the unit suites
#[allow(unused_imports)]
pub use classrota::test_support::*;

pub async fn setup_test_app(pool: PgPool) -> axum::Router {
    dotenvy::dotenv().ok();
    let state = AppState {
        db: pool,
        cors_config: CorsConfig::from_env(),
        events: EventPublisher::spawn(),
    };
    init_router(state)
}

/// Fire one request with the gateway identity headers attached and
/// return status + parsed JSON body (Null for empty bodies).
pub async fn request_as(
    app: axum::Router,
    role: &str,
    user_id: Uuid,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user_id.to_string())
        .header("x-user-role", role);

    let request = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            builder
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        }
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
