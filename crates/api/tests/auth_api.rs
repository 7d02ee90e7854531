//! HTTP-level tests for registration, login, the per-IP login throttle,
//! and refresh-token rotation.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, create_user, post_json, post_json_ip};
use hearth_core::roles::Role;
use serde_json::json;
use sqlx::PgPool;

const PASSWORD: &str = "test_password_123!";

fn login_body(username: &str, password: &str) -> serde_json::Value {
    json!({ "username": username, "password": password })
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_register_then_login(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(
        app.clone(),
        "/api/v1/auth/register",
        json!({
            "username": "newcomer",
            "email": "newcomer@test.com",
            "password": PASSWORD,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["role"], "guest", "everyone starts as a guest");

    let response = post_json(app, "/api/v1/auth/login", login_body("newcomer", PASSWORD)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());
    assert_eq!(body["user"]["username"], "newcomer");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_register_rejects_weak_password(pool: PgPool) {
    let app = build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/auth/register",
        json!({
            "username": "weakling",
            "email": "weakling@test.com",
            "password": "short",
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_duplicate_username_conflicts(pool: PgPool) {
    create_user(&pool, "taken", Role::Guest).await;
    let app = build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/auth/register",
        json!({
            "username": "taken",
            "email": "other@test.com",
            "password": PASSWORD,
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_wrong_password_is_unauthorized(pool: PgPool) {
    create_user(&pool, "careful", Role::Guest).await;
    let app = build_test_app(pool);

    let response = post_json(
        app,
        "/api/v1/auth/login",
        login_body("careful", "not-the-password"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_lockout_after_five_failures_from_one_ip(pool: PgPool) {
    create_user(&pool, "victim", Role::Guest).await;
    let app = build_test_app(pool);
    let attacker_ip = "203.0.113.66";

    // Four failures: still the generic credential error.
    for _ in 0..4 {
        let response = post_json_ip(
            app.clone(),
            "/api/v1/auth/login",
            attacker_ip,
            login_body("victim", "wrong"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // The fifth failure trips the lockout and says so.
    let response = post_json_ip(
        app.clone(),
        "/api/v1/auth/login",
        attacker_ip,
        login_body("victim", "wrong"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    let message = body["error"].as_str().expect("error message");
    assert!(
        message.contains("Try again in"),
        "lockout must state the remaining wait, was: {message}"
    );

    // Even correct credentials are refused while locked.
    let response = post_json_ip(
        app.clone(),
        "/api/v1/auth/login",
        attacker_ip,
        login_body("victim", PASSWORD),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // A different IP is unaffected.
    let response = post_json_ip(
        app,
        "/api/v1/auth/login",
        "198.51.100.9",
        login_body("victim", PASSWORD),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_lockout_self_heals_after_window(pool: PgPool) {
    create_user(&pool, "patient", Role::Guest).await;
    let app = build_test_app(pool.clone());
    let ip = "203.0.113.77";

    for _ in 0..5 {
        post_json_ip(
            app.clone(),
            "/api/v1/auth/login",
            ip,
            login_body("patient", "wrong"),
        )
        .await;
    }

    // Six minutes pass.
    sqlx::query(
        "UPDATE login_attempts SET last_attempt_at = NOW() - INTERVAL '6 minutes' WHERE ip = $1",
    )
    .bind(ip)
    .execute(&pool)
    .await
    .expect("backdate should succeed");

    let response = post_json_ip(app, "/api/v1/auth/login", ip, login_body("patient", PASSWORD)).await;
    assert_eq!(
        response.status(),
        StatusCode::OK,
        "a lapsed lockout must clear on the next check"
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_success_resets_the_counter(pool: PgPool) {
    create_user(&pool, "redeemed", Role::Guest).await;
    let app = build_test_app(pool);
    let ip = "203.0.113.88";

    for _ in 0..4 {
        post_json_ip(
            app.clone(),
            "/api/v1/auth/login",
            ip,
            login_body("redeemed", "wrong"),
        )
        .await;
    }

    let response = post_json_ip(
        app.clone(),
        "/api/v1/auth/login",
        ip,
        login_body("redeemed", PASSWORD),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Four more failures after the success: the counter started over.
    for _ in 0..4 {
        let response = post_json_ip(
            app.clone(),
            "/api/v1/auth/login",
            ip,
            login_body("redeemed", "wrong"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn test_refresh_rotates_tokens(pool: PgPool) {
    create_user(&pool, "rotator", Role::Guest).await;
    let app = build_test_app(pool);

    let auth = common::login_user(app.clone(), "rotator", PASSWORD).await;
    let refresh_token = auth["refresh_token"].as_str().expect("refresh token");

    let response = post_json(
        app.clone(),
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_ne!(rotated["refresh_token"], auth["refresh_token"]);

    // The old token died with the rotation.
    let response = post_json(
        app,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": refresh_token }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
