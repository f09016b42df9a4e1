//! End-to-end auth flow over the full router, with in-memory stores and
//! cheap argon2 parameters.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use time::Duration;
use tower::ServiceExt;

use fakestore_api::auth::AuthService;
use fakestore_api::infra::clock::{Clock, SystemClock};
use fakestore_api::routes;
use fakestore_api::security::config::AuthConfig;
use fakestore_api::security::jwt::TokenCodec;
use fakestore_api::security::password::Argon2PasswordHasher;
use fakestore_api::state::AppState;
use fakestore_api::store::memory::{MemoryRefreshTokenLedger, MemoryUserStore};

fn app() -> Router {
    let config = AuthConfig {
        access_secret: "flow-access-secret".into(),
        refresh_secret: "flow-refresh-secret".into(),
        access_ttl: Duration::minutes(15),
        refresh_ttl: Duration::days(7),
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let codec = Arc::new(TokenCodec::new(&config, clock.clone()));
    let auth = AuthService::new(
        Arc::new(MemoryUserStore::new()),
        Arc::new(MemoryRefreshTokenLedger::new(clock.clone())),
        Arc::new(Argon2PasswordHasher::with_params(1024, 1, 1)),
        codec,
        clock,
    );
    // CRUD handlers need a pool in the state; auth flows never touch it.
    let db = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://postgres@localhost/unused")
        .unwrap();
    routes::app(AppState::new(db, auth))
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn register_payload() -> Value {
    json!({ "name": "Alice", "email": "a@b.com", "password": "correct" })
}

#[tokio::test]
async fn register_then_login_round_trip() {
    let app = app();

    let (status, body) = post_json(&app, "/auth/register", register_payload()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["accessToken"].is_string());
    assert!(body["refreshToken"].is_string());
    assert_eq!(body["user"]["name"], "Alice");
    assert_eq!(body["user"]["email"], "a@b.com");
    let registered_id = body["user"]["id"].as_str().unwrap().to_string();

    let (status, body) = post_json(
        &app,
        "/auth/login",
        json!({ "email": "a@b.com", "password": "correct" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], registered_id.as_str());

    let (status, body) = post_json(
        &app,
        "/auth/login",
        json!({ "email": "a@b.com", "password": "wrong" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid credentials");
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let app = app();
    let (status, _) = post_json(&app, "/auth/register", register_payload()).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = post_json(&app, "/auth/register", register_payload()).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "email already registered");
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let app = app();
    for (uri, payload) in [
        ("/auth/register", json!({ "email": "a@b.com" })),
        ("/auth/login", json!({ "email": "a@b.com" })),
        ("/auth/refresh", json!({})),
    ] {
        let (status, body) = post_json(&app, uri, payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn refresh_rotates_and_rejects_replay() {
    let app = app();
    let (_, session) = post_json(&app, "/auth/register", register_payload()).await;
    let original = session["refreshToken"].as_str().unwrap().to_string();

    let (status, pair) = post_json(&app, "/auth/refresh", json!({ "refreshToken": original })).await;
    assert_eq!(status, StatusCode::OK);
    assert!(pair["accessToken"].is_string());
    let rotated = pair["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(rotated, original);

    // the consumed token is burned, the rotated one still works
    let (status, body) = post_json(&app, "/auth/refresh", json!({ "refreshToken": original })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid or expired token");
    let (status, _) = post_json(&app, "/auth/refresh", json!({ "refreshToken": rotated })).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn logout_burns_the_refresh_token() {
    let app = app();
    let (_, session) = post_json(&app, "/auth/register", register_payload()).await;
    let token = session["refreshToken"].as_str().unwrap().to_string();

    let (status, _) = post_json(&app, "/auth/logout", json!({ "refreshToken": token })).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = post_json(&app, "/auth/refresh", json!({ "refreshToken": token })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    // idempotent: logging out again is still fine
    let (status, _) = post_json(&app, "/auth/logout", json!({ "refreshToken": token })).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn protected_routes_require_a_valid_bearer_token() {
    let app = app();
    let (_, session) = post_json(&app, "/auth/register", register_payload()).await;
    let access = session["accessToken"].as_str().unwrap().to_string();

    let get_cart = |auth_header: Option<String>| {
        let app = app.clone();
        async move {
            let mut builder = Request::builder().uri("/cart");
            if let Some(value) = auth_header {
                builder = builder.header(header::AUTHORIZATION, value);
            }
            app.oneshot(builder.body(Body::empty()).unwrap())
                .await
                .unwrap()
                .status()
        }
    };

    assert_eq!(get_cart(None).await, StatusCode::UNAUTHORIZED);
    assert_eq!(
        get_cart(Some("Bearer garbage".into())).await,
        StatusCode::UNAUTHORIZED
    );
    // a refresh token must not pass the access check
    let refresh = session["refreshToken"].as_str().unwrap().to_string();
    assert_eq!(
        get_cart(Some(format!("Bearer {refresh}"))).await,
        StatusCode::UNAUTHORIZED
    );
    // with a valid token the middleware admits the request; the handler
    // itself then needs a live database, which this suite does not run
    assert_ne!(
        get_cart(Some(format!("Bearer {access}"))).await,
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn health_and_index_are_public() {
    let app = app();
    for uri in ["/", "/health"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{uri}");
    }
}
