mod common;

use axum::http::{Method, StatusCode};
use common::{TestApp, USER_PASSWORD};
use serde_json::json;

#[tokio::test]
async fn login_returns_token_that_authenticates_me() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": "clerk", "password": USER_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"]["username"], "clerk");
    assert_eq!(body["user"]["role"], "USER");
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("password_hash").is_none());

    let token = body["token"].as_str().expect("token").to_string();
    let (status, body) = app
        .send(Method::GET, "/api/auth/me", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User information retrieved successfully");
    assert_eq!(body["user"]["username"], "clerk");
}

#[tokio::test]
async fn login_requires_both_fields() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": "clerk" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Username and password are required");
}

#[tokio::test]
async fn login_rejects_bad_credentials_with_one_message() {
    let app = TestApp::new().await;

    for payload in [
        json!({ "username": "clerk", "password": "wrong-password" }),
        json!({ "username": "nobody", "password": "whatever" }),
    ] {
        let (status, body) = app
            .send(Method::POST, "/api/auth/login", Some(payload), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid username or password");
    }
}

#[tokio::test]
async fn deactivated_account_cannot_sign_in() {
    let app = TestApp::new().await;
    let uri = format!("/api/users/{}", app.user.user.id);

    let (status, _) = app
        .send(
            Method::PUT,
            &uri,
            Some(json!({ "isActive": false })),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": "clerk", "password": USER_PASSWORD })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Account is deactivated");

    // Existing tokens stop working too
    let (status, body) = app
        .send(Method::GET, "/api/auth/me", None, Some(app.user_token()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User not found or inactive");
}

#[tokio::test]
async fn register_creates_user_role_account() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/register",
            Some(json!({
                "username": "newbie",
                "email": "  NewBie@Example.COM ",
                "password": "secret1",
                "firstName": "New",
                "role": "ADMIN",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["message"], "Registration successful");
    assert_eq!(body["user"]["email"], "newbie@example.com");
    assert_eq!(body["user"]["role"], "USER");
    assert!(body["token"].as_str().is_some());
}

#[tokio::test]
async fn register_validates_input() {
    let app = TestApp::new().await;

    let cases = [
        (
            json!({ "username": "x", "password": "secret1" }),
            StatusCode::BAD_REQUEST,
            "Username, email, and password are required",
        ),
        (
            json!({ "username": "x", "email": "not-an-email", "password": "secret1" }),
            StatusCode::BAD_REQUEST,
            "Invalid email format",
        ),
        (
            json!({ "username": "x", "email": "x@example.com", "password": "12345" }),
            StatusCode::BAD_REQUEST,
            "Password must be at least 6 characters long",
        ),
        (
            json!({ "username": "clerk", "email": "other@example.com", "password": "secret1" }),
            StatusCode::CONFLICT,
            "Username already exists",
        ),
        (
            json!({ "username": "other", "email": "clerk@stockroom.test", "password": "secret1" }),
            StatusCode::CONFLICT,
            "Email already exists",
        ),
    ];

    for (payload, expected_status, expected_message) in cases {
        let (status, body) = app
            .send(Method::POST, "/api/auth/register", Some(payload), None)
            .await;
        assert_eq!(status, expected_status, "{}", body);
        assert_eq!(body["message"], expected_message);
    }
}

#[tokio::test]
async fn me_rejects_missing_and_invalid_tokens() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing authentication token");

    let (status, body) = app
        .send(Method::GET, "/api/auth/me", None, Some("not.a.jwt"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid or expired token");
}

#[tokio::test]
async fn sentinel_token_resolves_in_test_mode() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            Method::GET,
            "/api/auth/me",
            None,
            Some(stockroom_api::auth::TEST_TOKEN),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["id"], 999);
    assert_eq!(body["user"]["role"], "USER");
}
