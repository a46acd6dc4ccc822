pub mod alert;
pub mod error;
pub mod middleware;

use std::sync::Arc;

use axum::{
    extract::{Extension, MatchedPath},
    middleware::from_fn,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};

use crate::store::AlertStore;
use middleware::{basic_auth_middleware, Accounts};

pub type SharedStore = Arc<dyn AlertStore>;

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Alert routes plus request tracing. Reads are public; writes require basic auth.
pub fn router(store: SharedStore, accounts: Accounts) -> Router {
    let alert_by_id = get(alert::get_alert).merge(
        put(alert::update_alert)
            .delete(alert::delete_alert)
            .route_layer(from_fn(basic_auth_middleware)),
    );

    Router::new()
        .route("/healthz", get(health_check))
        .route(
            "/alert",
            post(alert::create_alert).route_layer(from_fn(basic_auth_middleware)),
        )
        .route("/alert/:external_id", alert_by_id)
        .layer(Extension(store))
        .layer(Extension(Arc::new(accounts)))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(|matched| matched.as_str())
                        .unwrap_or_else(|| request.uri().path());

                    tracing::info_span!(
                        "request",
                        "otel.name" = format!("{} {}", request.method(), path),
                        method = ?request.method(),
                        uri = ?request.uri(),
                        // Filled in by auth and handlers
                        user = tracing::field::Empty,
                        action = tracing::field::Empty,
                        external_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_request(|_request: &axum::http::Request<axum::body::Body>, _span: &tracing::Span| {})
                .on_response(
                    |response: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record("latency", tracing::field::debug(latency));
                        tracing::info!("request completed");
                    },
                ),
        )
}
