//! Shared helpers for API integration tests.
//!
//! `build_test_app` mirrors the router construction in `main.rs` so
//! integration tests exercise the same middleware stack (CORS, request
//! ID, timeout, tracing, panic recovery) that production uses.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use hearth_api::auth::jwt::JwtConfig;
use hearth_api::config::{LifecycleConfig, ServerConfig};
use hearth_api::routes;
use hearth_api::state::AppState;
use hearth_core::roles::Role;
use hearth_db::models::community::{Community, CreateCommunity};
use hearth_db::models::user::{CreateUser, User};
use hearth_db::repositories::{CommunityRepo, MembershipRepo, UserRepo};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        lifecycle: LifecycleConfig::default(),
    }
}

/// Build the full application router with all middleware layers, using the
/// given database pool and the default test config.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, test_config())
}

/// Same as [`build_test_app`] but with a caller-supplied config (used to
/// flip lifecycle policy switches).
pub fn build_test_app_with(pool: PgPool, config: ServerConfig) -> Router {
    let state = AppState {
        pool,
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// GET a path without authentication.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("request builds"),
    )
    .await
    .expect("request should not fail at the transport level")
}

/// GET a path with a Bearer token.
pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request builds"),
    )
    .await
    .expect("request should not fail at the transport level")
}

/// POST a JSON body without authentication.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request builds"),
    )
    .await
    .expect("request should not fail at the transport level")
}

/// POST a JSON body with a spoofed client IP (the throttle key).
pub async fn post_json_ip(
    app: Router,
    uri: &str,
    ip: &str,
    body: serde_json::Value,
) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(body.to_string()))
            .expect("request builds"),
    )
    .await
    .expect("request should not fail at the transport level")
}

/// POST a JSON body with a Bearer token.
pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(body.to_string()))
            .expect("request builds"),
    )
    .await
    .expect("request should not fail at the transport level")
}

/// DELETE a path with a Bearer token.
pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request builds"),
    )
    .await
    .expect("request should not fail at the transport level")
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be valid JSON")
}

// ---------------------------------------------------------------------------
// Database fixtures
// ---------------------------------------------------------------------------

/// Create a user directly in the database with the given role.
pub async fn create_user(pool: &PgPool, username: &str, role: Role) -> User {
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@test.com"),
            password_hash: hearth_api::auth::password::hash_password("test_password_123!")
                .expect("hashing should succeed"),
            role,
        },
    )
    .await
    .expect("user creation should succeed")
}

/// Create a community owned by the given user.
pub async fn create_community(pool: &PgPool, owner_id: i64, name: &str) -> Community {
    CommunityRepo::create(
        pool,
        &CreateCommunity {
            owner_id,
            name: name.to_string(),
            address: Some("12 Elm Street".to_string()),
            join_code: format!("JC{owner_id:06}"),
        },
    )
    .await
    .expect("community creation should succeed")
}

/// Add a member through the same path the join handler uses: membership
/// upsert plus the membership-created hook, in one transaction.
pub async fn add_member(pool: &PgPool, user_id: i64, community: &Community) {
    let mut tx = pool.begin().await.expect("begin");
    MembershipRepo::upsert(&mut tx, user_id, community.id)
        .await
        .expect("upsert should succeed");
    hearth_api::engine::roles::on_membership_created(&mut tx, user_id, community)
        .await
        .expect("hook should succeed");
    tx.commit().await.expect("commit");
}

/// Force a user's role directly, standing in for administrative action.
pub async fn force_role(pool: &PgPool, user_id: i64, role: Role) {
    let mut conn = pool.acquire().await.expect("acquire");
    UserRepo::set_role(&mut conn, user_id, role)
        .await
        .expect("set_role should succeed");
}

/// Backdate a subscription's expiry so the next reconciliation sees it
/// as elapsed.
pub async fn backdate_expiry(pool: &PgPool, owner_id: i64) {
    sqlx::query(
        "UPDATE subscriptions SET expiry_date = NOW() - INTERVAL '1 hour' WHERE owner_id = $1",
    )
    .bind(owner_id)
    .execute(pool)
    .await
    .expect("backdate should succeed");
}

/// The user's current role, read fresh from the database.
pub async fn role_of(pool: &PgPool, user_id: i64) -> Role {
    UserRepo::find_by_id(pool, user_id)
        .await
        .expect("find should succeed")
        .expect("user should exist")
        .role
}

/// Log in a user via the API and return the JSON response containing
/// `access_token`, `refresh_token`, and `user` info.
pub async fn login_user(app: Router, username: &str, password: &str) -> serde_json::Value {
    let body = serde_json::json!({ "username": username, "password": password });
    let response = post_json(app, "/api/v1/auth/login", body).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

/// Access token for a user created via [`create_user`] (fixture password).
pub async fn token_for(app: Router, username: &str) -> String {
    let auth = login_user(app, username, "test_password_123!").await;
    auth["access_token"]
        .as_str()
        .expect("access_token should be a string")
        .to_string()
}
