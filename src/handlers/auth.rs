use super::common::{created_response, success_response, JsonBody};
use crate::{
    auth::{AuthRouterExt, CurrentUser},
    errors::ApiError,
    handlers::AppState,
    services::users::{LoginRequest, RegisterRequest},
};
use axum::{
    extract::State,
    response::Response,
    routing::{get, post},
    Router,
};
use serde_json::json;

pub fn auth_routes() -> Router<AppState> {
    let public = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register));

    let session = Router::new()
        .route("/api/auth/me", get(me))
        .with_auth();

    public.merge(session)
}

/// Exchange credentials for a session token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful"),
        (status = 400, description = "Missing credentials", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid credentials or deactivated account", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Response, ApiError> {
    let (user, token) = state.services.users.login(payload).await?;
    Ok(success_response(json!({
        "message": "Login successful",
        "user": user,
        "token": token,
    })))
}

/// Create a USER account and sign it in
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registration successful"),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 409, description = "Username or email taken", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<Response, ApiError> {
    let (user, token) = state.services.users.register(payload).await?;
    Ok(created_response(json!({
        "message": "Registration successful",
        "user": user,
        "token": token,
    })))
}

/// The caller's own account
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "User information retrieved successfully"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn me(user: CurrentUser) -> Result<Response, ApiError> {
    Ok(success_response(json!({
        "message": "User information retrieved successfully",
        "user": user,
    })))
}
