use super::common::{
    created_response, parse_flag, parse_id, success_response, JsonBody, PaginationParams,
    QueryParams,
};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::categories::{CategoryDetail, CategoryInput, CategoryListQuery, CategoryPage},
};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

const DEFAULT_LIMIT: u64 = 20;

/// Category endpoints; open to anonymous callers
pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/:id",
            get(get_category).put(update_category).delete(delete_category),
        )
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CategoryListParams {
    /// Substring of name or description
    pub search: Option<String>,
    /// `true` to attach `_count.products`
    #[param(value_type = Option<bool>)]
    pub include_product_count: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/categories",
    params(PaginationParams, CategoryListParams),
    responses(
        (status = 200, description = "Categories ordered by name", body = CategoryPage),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    QueryParams(pagination): QueryParams<PaginationParams>,
    QueryParams(params): QueryParams<CategoryListParams>,
) -> Result<Response, ApiError> {
    let query = CategoryListQuery {
        search: params.search,
        include_product_count: parse_flag(params.include_product_count.as_deref()),
    };
    let page = pagination.page_request(DEFAULT_LIMIT, state.config.api_max_page_size);

    let categories = state.services.categories.list(query, page).await?;
    Ok(success_response(categories))
}

#[utoipa::path(
    get,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category with its newest products", body = CategoryDetail),
        (status = 400, description = "Invalid category ID", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "category")?;
    let category = state.services.categories.get(id).await?;
    Ok(success_response(category))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Category created", body = crate::entities::category::Model),
        (status = 400, description = "Missing name", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate name", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CategoryInput>,
) -> Result<Response, ApiError> {
    let category = state.services.categories.create(payload).await?;
    Ok(created_response(category))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Category updated", body = crate::entities::category::Model),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate name", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<CategoryInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "category")?;
    let category = state.services.categories.update(id, payload).await?;
    Ok(success_response(category))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = i32, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Category still has products", body = crate::errors::ErrorResponse)
    ),
    tag = "categories"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "category")?;
    let deleted = state.services.categories.delete(id).await?;

    Ok(success_response(json!({
        "message": "Category deleted successfully",
        "deletedCategory": deleted,
    })))
}
