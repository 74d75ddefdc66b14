use super::common::{
    created_response, parse_id, parse_opt, success_response, JsonBody, PaginationParams,
    QueryParams,
};
use crate::{
    auth::{AuthRouterExt, CurrentUser, Role},
    db::{parse_sort_field, SortDirection},
    errors::ApiError,
    handlers::AppState,
    services::users::{
        CreateUserRequest, UpdateUserRequest, UserDetail, UserListQuery, UserPage, UserSort,
    },
};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

const DEFAULT_LIMIT: u64 = 20;

pub fn user_routes() -> Router<AppState> {
    let managers = Router::new()
        .route("/api/users", get(list_users))
        .with_role(Role::Manager);

    let admins = Router::new()
        .route("/api/users", post(create_user))
        .route("/api/users/:id", delete(delete_user))
        .with_role(Role::Admin);

    // Self-or-manager is decided per request
    let members = Router::new()
        .route("/api/users/:id", get(get_user).put(update_user))
        .with_auth();

    managers.merge(admins).merge(members)
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserListParams {
    /// Substring of username, email, first or last name
    pub search: Option<String>,
    /// USER, MANAGER or ADMIN
    pub role: Option<String>,
    #[param(value_type = Option<bool>)]
    pub is_active: Option<String>,
    /// username, email, role, createdAt, updatedAt, firstName or lastName
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl From<UserListParams> for UserListQuery {
    fn from(params: UserListParams) -> Self {
        let defaults = UserListQuery::default();
        Self {
            search: params.search,
            role: params
                .role
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            is_active: parse_opt(params.is_active.as_deref()),
            sort_by: parse_sort_field::<UserSort>(params.sort_by.as_deref(), defaults.sort_by),
            sort_order: SortDirection::parse(params.sort_order.as_deref(), defaults.sort_order),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(PaginationParams, UserListParams),
    responses(
        (status = 200, description = "User page with movement counts", body = UserPage),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Requires MANAGER", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    QueryParams(pagination): QueryParams<PaginationParams>,
    QueryParams(params): QueryParams<UserListParams>,
) -> Result<Response, ApiError> {
    let page = pagination.page_request(DEFAULT_LIMIT, state.config.api_max_page_size);
    let users = state.services.users.list(params.into(), page).await?;
    Ok(success_response(users))
}

#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 403, description = "Requires ADMIN", body = crate::errors::ErrorResponse),
        (status = 409, description = "Username or email taken", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    actor: CurrentUser,
    JsonBody(payload): JsonBody<CreateUserRequest>,
) -> Result<Response, ApiError> {
    let user = state.services.users.create(&actor, payload).await?;
    Ok(created_response(json!({
        "message": "User created successfully",
        "user": user,
    })))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User with recent movements", body = UserDetail),
        (status = 400, description = "Invalid user ID", body = crate::errors::ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "user")?;
    let user = state.services.users.get(&actor, id).await?;
    Ok(success_response(user))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated"),
        (status = 400, description = "Invalid input", body = crate::errors::ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already exists", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateUserRequest>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "user")?;
    let user = state.services.users.update(&actor, id, payload).await?;
    Ok(success_response(json!({
        "message": "User updated successfully",
        "user": user,
    })))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted"),
        (status = 400, description = "Own account", body = crate::errors::ErrorResponse),
        (status = 403, description = "Requires ADMIN", body = crate::errors::ErrorResponse),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "User has stock movements", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    actor: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "user")?;
    state.services.users.delete(&actor, id).await?;
    Ok(success_response(json!({ "message": "User deleted successfully" })))
}
