use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alert_service::api::{self, alert::AlertResponse, middleware::Accounts};
use alert_service::entities::alert;
use alert_service::sea_orm::DbErr;
use alert_service::{AlertError, AlertResult, AlertStore, ExternalId};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

const USER: &str = "integrationUser";
const PASSWORD: &str = "integrationUserPassword";

/// In-memory double that counts every call it receives.
#[derive(Default)]
struct CountingStore {
    rows: Mutex<HashMap<ExternalId, alert::Model>>,
    next_id: AtomicUsize,
    calls: AtomicUsize,
    fail: bool,
}

impl CountingStore {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> AlertResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AlertError::Store(DbErr::Custom("connection lost".to_string())));
        }
        Ok(())
    }

    fn seed(&self, message: &str) -> alert::Model {
        let now = Utc::now() - Duration::seconds(5);
        let model = alert::Model {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) as i32 + 1,
            external_id: ExternalId::generate().as_uuid(),
            created_at: now,
            updated_at: now,
            message: message.to_string(),
        };
        self.rows
            .lock()
            .unwrap()
            .insert(ExternalId::from(model.external_id), model.clone());
        model
    }
}

#[async_trait]
impl AlertStore for CountingStore {
    async fn create(&self, message: String) -> AlertResult<alert::Model> {
        self.enter()?;
        Ok(self.seed(&message))
    }

    async fn get_by_external_id(&self, id: ExternalId) -> AlertResult<alert::Model> {
        self.enter()?;
        self.rows
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(AlertError::NotFound)
    }

    async fn update_by_external_id(
        &self,
        id: ExternalId,
        message: String,
    ) -> AlertResult<alert::Model> {
        self.enter()?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows.get_mut(&id).ok_or(AlertError::NotFound)?;
        row.message = message;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_by_external_id(&self, id: ExternalId) -> AlertResult<()> {
        self.enter()?;
        self.rows
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or(AlertError::NotFound)
    }

    async fn count(&self) -> AlertResult<u64> {
        self.enter()?;
        Ok(self.rows.lock().unwrap().len() as u64)
    }
}

fn test_router(store: Arc<CountingStore>) -> Router {
    let accounts = Accounts::new(HashMap::from([(USER.to_string(), PASSWORD.to_string())]));
    api::router(store, accounts)
}

fn basic_auth(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{user}:{password}")))
}

fn request(method: Method, uri: &str, body: Option<Value>, auth: bool) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if auth {
        builder = builder.header(header::AUTHORIZATION, basic_auth(USER, PASSWORD));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn health_check_is_public() {
    let store = Arc::new(CountingStore::default());
    let (status, body) = send(
        test_router(store.clone()),
        request(Method::GET, "/healthz", None, false),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn create_alert_with_valid_body() {
    let store = Arc::new(CountingStore::default());
    let (status, body) = send(
        test_router(store.clone()),
        request(
            Method::POST,
            "/alert",
            Some(json!({ "message": "Hello there" })),
            true,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(store.calls(), 1);
    assert_eq!(body["message"], "Hello there");
    assert!(body.get("externalId").is_some());
    assert!(body.get("id").is_none());
    assert_eq!(body["createdAt"], body["updatedAt"]);

    let parsed: AlertResponse = serde_json::from_value(body).unwrap();
    assert!(store
        .rows
        .lock()
        .unwrap()
        .contains_key(&parsed.external_id));
}

#[tokio::test]
async fn create_alert_with_missing_message_is_rejected() {
    let store = Arc::new(CountingStore::default());

    for body in [json!({ "message": null }), json!({}), json!({ "message": "" })] {
        let (status, body) = send(
            test_router(store.clone()),
            request(Method::POST, "/alert", Some(body), true),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "errors": [{ "field": "message", "message": "this field is required" }] })
        );
    }
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn create_alert_with_malformed_json_is_rejected() {
    let store = Arc::new(CountingStore::default());
    let req = Request::builder()
        .method(Method::POST)
        .uri("/alert")
        .header(header::AUTHORIZATION, basic_auth(USER, PASSWORD))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"message\": 42"))
        .unwrap();

    let (status, body) = send(test_router(store.clone()), req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["body"].is_string());
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn create_alert_with_wrongly_typed_message_is_rejected() {
    let store = Arc::new(CountingStore::default());

    for body in [json!({ "message": 5 }), json!({ "message": ["Hello there"] })] {
        let (status, body) = send(
            test_router(store.clone()),
            request(Method::POST, "/alert", Some(body), true),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "errors": [{ "field": "message", "message": "invalid type for field" }] })
        );
    }
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn create_alert_with_whitespace_message_is_accepted() {
    let store = Arc::new(CountingStore::default());
    let (status, body) = send(
        test_router(store.clone()),
        request(Method::POST, "/alert", Some(json!({ "message": "   " })), true),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "   ");
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn writes_require_credentials() {
    let store = Arc::new(CountingStore::default());
    let existing = store.seed("Hello there");
    let uri = format!("/alert/{}", existing.external_id);

    let cases = [
        request(Method::POST, "/alert", Some(json!({ "message": "x" })), false),
        request(Method::PUT, &uri, Some(json!({ "message": "x" })), false),
        request(Method::DELETE, &uri, None, false),
    ];
    for req in cases {
        let response = test_router(store.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Basic realm=\"alert-service\""
        );
    }

    let mut req = request(Method::DELETE, &uri, None, false);
    req.headers_mut().insert(
        header::AUTHORIZATION,
        basic_auth(USER, "wrong").parse().unwrap(),
    );
    let (status, _) = send(test_router(store.clone()), req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn get_existing_alert_without_credentials() {
    let store = Arc::new(CountingStore::default());
    let existing = store.seed("Hello there");

    let (status, body) = send(
        test_router(store.clone()),
        request(
            Method::GET,
            &format!("/alert/{}", existing.external_id),
            None,
            false,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let parsed: AlertResponse = serde_json::from_value(body).unwrap();
    assert_eq!(parsed, AlertResponse::from(existing));
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn get_non_existing_alert_is_not_found() {
    let store = Arc::new(CountingStore::default());
    let (status, body) = send(
        test_router(store.clone()),
        request(
            Method::GET,
            "/alert/f47ac10b-58cc-0372-8567-0e02b2c3d479",
            None,
            true,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "errors": { "message": "alert not found" } }));
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn invalid_identifier_never_reaches_the_store() {
    let store = Arc::new(CountingStore::default());

    let cases = [
        request(Method::GET, "/alert/invalidUUID", None, true),
        request(Method::GET, "/alert/not-a-uuid", None, true),
        request(
            Method::PUT,
            "/alert/invalidUUID",
            Some(json!({ "message": "Hello there" })),
            true,
        ),
        request(Method::DELETE, "/alert/invalidUUID", None, true),
        request(
            Method::GET,
            "/alert/f47ac10b58cc037285670e02b2c3d479",
            None,
            true,
        ),
    ];
    for req in cases {
        let (status, body) = send(test_router(store.clone()), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "errors": { "message": "invalid identifier format" } })
        );
    }
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn update_existing_alert() {
    let store = Arc::new(CountingStore::default());
    let existing = store.seed("Hello there");

    let (status, body) = send(
        test_router(store.clone()),
        request(
            Method::PUT,
            &format!("/alert/{}", existing.external_id),
            Some(json!({ "message": "Steven why are you like this" })),
            true,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let parsed: AlertResponse = serde_json::from_value(body).unwrap();
    assert_eq!(parsed.external_id, ExternalId::from(existing.external_id));
    assert_eq!(parsed.message, "Steven why are you like this");
    assert_eq!(parsed.created_at, existing.created_at);
    assert!(parsed.updated_at > parsed.created_at);
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn update_non_existing_alert_is_not_found() {
    let store = Arc::new(CountingStore::default());
    let (status, body) = send(
        test_router(store.clone()),
        request(
            Method::PUT,
            "/alert/f47ac10b-58cc-0372-8567-0e02b2c3d479",
            Some(json!({ "message": "Hello there" })),
            true,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "errors": { "message": "alert not found" } }));
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn update_with_missing_message_skips_store() {
    let store = Arc::new(CountingStore::default());
    let existing = store.seed("Hello there");

    let (status, _) = send(
        test_router(store.clone()),
        request(
            Method::PUT,
            &format!("/alert/{}", existing.external_id),
            Some(json!({ "message": null })),
            true,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn delete_twice_reports_not_found_the_second_time() {
    let store = Arc::new(CountingStore::default());
    let existing = store.seed("Hello there");
    let uri = format!("/alert/{}", existing.external_id);

    let (status, body) = send(
        test_router(store.clone()),
        request(Method::DELETE, &uri, None, true),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let deleted: AlertResponse = serde_json::from_value(body).unwrap();
    assert_eq!(deleted, AlertResponse::from(existing));

    let (status, _) = send(
        test_router(store.clone()),
        request(Method::DELETE, &uri, None, true),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        test_router(store.clone()),
        request(Method::GET, &uri, None, false),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    // Lookup + delete, then a failed lookup twice.
    assert_eq!(store.calls(), 4);
}

#[tokio::test]
async fn store_failures_are_internal_errors_without_details() {
    let store = Arc::new(CountingStore::failing());
    let (status, body) = send(
        test_router(store.clone()),
        request(
            Method::POST,
            "/alert",
            Some(json!({ "message": "Hello there" })),
            true,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "errors": { "message": "internal error" } }));
    assert_eq!(store.calls(), 1);
}
