// 🌐 REST API with Axum
// /transactions CRUD over a shared TransactionStore, guarded by HTTP Basic auth

use crate::config::AuthConfig;
use crate::store::{TransactionFilter, TransactionStore};
use crate::transaction::TransactionInput;
use axum::{
    body::Bytes,
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Every store operation runs under this one lock
pub type SharedStore = Arc<Mutex<TransactionStore>>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub credentials: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(store: TransactionStore, credentials: AuthConfig) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            credentials: Arc::new(credentials),
        }
    }
}

/// Error body: `{"error": "..."}`
#[derive(Serialize)]
struct ApiError {
    error: String,
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError {
            error: "Not Found".to_string(),
        }),
    )
        .into_response()
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    transactions: usize,
}

// ============================================================================
// Authentication
// ============================================================================

/// Decode `Basic base64(user:pass)` into its two halves
fn parse_basic_auth(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

async fn require_basic_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let credentials = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_basic_auth);

    match credentials {
        Some((user, password))
            if user == state.credentials.username && password == state.credentials.password =>
        {
            next.run(request).await
        }
        _ => {
            warn!(path = %request.uri().path(), "rejected request without valid credentials");
            (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"Transactions API\"")],
            )
                .into_response()
        }
    }
}

/// Malformed or empty bodies are treated as `{}`
fn read_input(body: &Bytes) -> TransactionInput {
    if body.is_empty() {
        return TransactionInput::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        warn!("ignoring malformed transaction payload: {}", e);
        TransactionInput::default()
    })
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /health - Health check (no auth)
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK",
        transactions: state.store.lock().len(),
    })
}

/// GET /transactions - All transactions, optionally filtered
async fn list_transactions(
    State(state): State<AppState>,
    Query(filter): Query<TransactionFilter>,
) -> impl IntoResponse {
    let store = state.store.lock();
    let transactions = if filter.is_empty() {
        store.list()
    } else {
        store.search(&filter)
    };
    Json(transactions)
}

/// GET /transactions/:id
async fn get_transaction(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.lock().get(&id) {
        Some(tx) => (StatusCode::OK, Json(tx)).into_response(),
        None => not_found(),
    }
}

/// POST /transactions
async fn create_transaction(State(state): State<AppState>, body: Bytes) -> Response {
    let input = read_input(&body);
    match state.store.lock().create(input) {
        Ok(tx) => (StatusCode::CREATED, Json(tx)).into_response(),
        Err(e) => {
            warn!("create rejected: {}", e);
            (
                StatusCode::INSUFFICIENT_STORAGE,
                Json(ApiError {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// PUT /transactions/:id - Partial update
async fn update_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Response {
    let input = read_input(&body);
    match state.store.lock().update(&id, &input) {
        Some(tx) => (StatusCode::OK, Json(tx)).into_response(),
        None => not_found(),
    }
}

/// DELETE /transactions/:id
async fn delete_transaction(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if state.store.lock().delete(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        not_found()
    }
}

/// GET /stats - Totals and per-type counts
async fn get_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.lock().stats())
}

async fn fallback() -> Response {
    not_found()
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route(
            "/transactions/:id",
            get(get_transaction)
                .put(update_transaction)
                .delete(delete_transaction),
        )
        .route("/stats", get(get_stats))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_basic_auth));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .fallback(fallback)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::TransactionType;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request as HttpRequest};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let mut store = TransactionStore::new();
        store
            .bulk_load(vec![
                TransactionInput::default()
                    .with_type(TransactionType::Received)
                    .with_amount(2000.0)
                    .with_sender("alice"),
                TransactionInput::default()
                    .with_type(TransactionType::Sent)
                    .with_amount(500.0)
                    .with_receiver("bob"),
            ])
            .unwrap();
        router(AppState::new(store, AuthConfig::default()))
    }

    fn auth_header() -> String {
        format!("Basic {}", STANDARD.encode("admin:password123"))
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> HttpRequest<Body> {
        let builder = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, auth_header());
        match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: HttpRequest<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[test]
    fn test_parse_basic_auth() {
        let header = format!("Basic {}", STANDARD.encode("user:pa:ss"));
        assert_eq!(
            parse_basic_auth(&header),
            Some(("user".to_string(), "pa:ss".to_string()))
        );
        assert_eq!(parse_basic_auth("Bearer abc"), None);
        assert_eq!(parse_basic_auth("Basic !!!"), None);
    }

    #[tokio::test]
    async fn test_missing_credentials_are_rejected() {
        let app = app();
        let req = HttpRequest::builder()
            .uri("/transactions")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn test_wrong_password_is_rejected() {
        let app = app();
        let req = HttpRequest::builder()
            .uri("/transactions/1")
            .header(
                header::AUTHORIZATION,
                format!("Basic {}", STANDARD.encode("admin:nope")),
            )
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = app();
        let req = HttpRequest::builder().uri("/health").body(Body::empty()).unwrap();

        let (status, body) = send(&app, req).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transactions"], 2);
    }

    #[tokio::test]
    async fn test_list_and_get() {
        let app = app();

        let (status, body) = send(&app, request(Method::GET, "/transactions", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, body) = send(&app, request(Method::GET, "/transactions/1", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transaction_type"], "received");
        assert_eq!(body["amount"], 2000.0);

        let (status, body) = send(&app, request(Method::GET, "/transactions/99", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");
    }

    #[tokio::test]
    async fn test_list_with_filter() {
        let app = app();

        let (status, body) = send(
            &app,
            request(Method::GET, "/transactions?transaction_type=sent", None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["receiver"], "bob");
    }

    #[tokio::test]
    async fn test_type_filter_ignores_case() {
        let app = app();

        let (status, body) = send(
            &app,
            request(Method::GET, "/transactions?transaction_type=SENT", None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["transaction_type"], "sent");
    }

    #[tokio::test]
    async fn test_create_update_delete_flow() {
        let app = app();

        let (status, created) = send(
            &app,
            request(
                Method::POST,
                "/transactions",
                Some(json!({"amount": 50.5, "sender": "A", "receiver": "B"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], "3");
        assert_eq!(created["transaction_type"], "unknown");

        let (status, updated) = send(
            &app,
            request(Method::PUT, "/transactions/3", Some(json!({"amount": 75}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["amount"], 75.0);
        assert_eq!(updated["sender"], "A");

        let (status, fetched) = send(&app, request(Method::GET, "/transactions/3", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, updated);

        let (status, _) = send(&app, request(Method::DELETE, "/transactions/3", None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, request(Method::DELETE, "/transactions/3", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            request(Method::PUT, "/transactions/3", Some(json!({"amount": 1}))),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_payload_values_are_coerced() {
        let app = app();

        let (status, created) = send(
            &app,
            request(
                Method::POST,
                "/transactions",
                Some(json!({"amount": "lots", "transaction_type": "test"})),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["amount"], 0.0);
        assert_eq!(created["transaction_type"], "unknown");
        assert_eq!(created["sender"], "Unknown");
    }

    #[tokio::test]
    async fn test_malformed_body_creates_defaults() {
        let app = app();
        let req = HttpRequest::builder()
            .method(Method::POST)
            .uri("/transactions")
            .header(header::AUTHORIZATION, auth_header())
            .body(Body::from("{not json"))
            .unwrap();

        let (status, created) = send(&app, req).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], "3");
    }

    #[tokio::test]
    async fn test_stats_and_unknown_route() {
        let app = app();

        let (status, stats) = send(&app, request(Method::GET, "/stats", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stats["total"], 2);
        assert_eq!(stats["by_type"]["sent"], 1);

        let (status, _) = send(&app, request(Method::GET, "/nowhere", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
