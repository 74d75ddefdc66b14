#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use stockroom_api::{
    auth::{hash_password, Role},
    config::AppConfig,
    db,
    entities::user,
    AppState,
};

pub const ADMIN_PASSWORD: &str = "admin-pass";
pub const MANAGER_PASSWORD: &str = "manager-pass";
pub const USER_PASSWORD: &str = "user-pass";

/// Seeded account with a signed token
pub struct TestAccount {
    pub user: user::Model,
    pub token: String,
}

/// In-process application backed by an in-memory SQLite database.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub admin: TestAccount,
    pub manager: TestAccount,
    pub user: TestAccount,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "integration-test-secret-with-enough-length".to_string(),
            "127.0.0.1".to_string(),
            0,
            "test".to_string(),
        );
        // Every connection to `sqlite::memory:` opens its own database
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.auth_test_mode = true;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("connect to in-memory sqlite");
        db::run_migrations(&pool).await.expect("apply migrations");

        let state = AppState::new(Arc::new(pool), cfg);

        let admin = Self::seed_account(&state, "admin", ADMIN_PASSWORD, Role::Admin).await;
        let manager = Self::seed_account(&state, "manager", MANAGER_PASSWORD, Role::Manager).await;
        let user = Self::seed_account(&state, "clerk", USER_PASSWORD, Role::User).await;

        let router = stockroom_api::build_router(state.clone());

        Self {
            router,
            state,
            admin,
            manager,
            user,
        }
    }

    async fn seed_account(
        state: &AppState,
        username: &str,
        password: &str,
        role: Role,
    ) -> TestAccount {
        let user = user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{}@stockroom.test", username)),
            password_hash: Set(hash_password(password).expect("hash password")),
            role: Set(role.to_string()),
            is_active: Set(true),
            first_name: Set(Some(username.to_string())),
            last_name: Set(None),
            ..Default::default()
        }
        .insert(&*state.db)
        .await
        .expect("seed account");
        let token = state.auth.issue_token(&user).expect("issue token");
        TestAccount { user, token }
    }

    pub fn admin_token(&self) -> &str {
        &self.admin.token
    }

    pub fn manager_token(&self) -> &str {
        &self.manager.token
    }

    pub fn user_token(&self) -> &str {
        &self.user.token
    }

    /// Sends a request through the router with an optional JSON body and bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends a request and returns its status with the decoded JSON body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, token).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    /// Creates a category through the API and returns its id.
    pub async fn create_category(&self, name: &str) -> i64 {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/categories",
                Some(serde_json::json!({ "name": name })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().expect("category id")
    }

    /// Creates a product through the API and returns its id.
    pub async fn create_product(&self, body: Value) -> i64 {
        let (status, body) = self
            .send(Method::POST, "/api/products", Some(body), None)
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().expect("product id")
    }

    /// Creates an inventory row for an existing product and returns its id.
    pub async fn create_inventory(&self, product_id: i64, quantity: i64, batch: &str) -> i64 {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/inventory",
                Some(serde_json::json!({
                    "productId": product_id,
                    "quantity": quantity,
                    "batchNumber": batch,
                    "location": "A-01",
                })),
                Some(self.manager_token()),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_i64().expect("inventory item id")
    }
}

/// Reads the full body as JSON; an empty body yields `Value::Null`.
pub async fn response_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is json")
    }
}

/// Decimal fields serialize as strings; compares them numerically.
pub fn as_f64(value: &Value) -> f64 {
    match value {
        Value::String(s) => s.parse().expect("numeric string"),
        other => other.as_f64().expect("number"),
    }
}
