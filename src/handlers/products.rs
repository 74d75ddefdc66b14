use super::common::{
    created_response, parse_flag, parse_id, parse_opt, success_response, JsonBody,
    PaginationParams, QueryParams,
};
use crate::{
    db::{parse_sort_field, SortDirection},
    errors::ApiError,
    handlers::AppState,
    services::products::{
        ProductDetail, ProductInput, ProductListQuery, ProductPage, ProductSort,
        ProductWithCategory,
    },
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

const DEFAULT_LIMIT: u64 = 10;

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/api/products", get(list_products).post(create_product))
        .route(
            "/api/products/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ProductListParams {
    /// Substring of name, sku or description
    pub search: Option<String>,
    #[param(value_type = Option<i32>)]
    pub category_id: Option<String>,
    #[param(value_type = Option<i32>)]
    pub supplier_id: Option<String>,
    #[param(value_type = Option<f64>)]
    pub min_price: Option<String>,
    #[param(value_type = Option<f64>)]
    pub max_price: Option<String>,
    /// `true` keeps products with a row at or below their threshold
    #[param(value_type = Option<bool>)]
    pub low_stock: Option<String>,
    /// name, sku, sellingPrice, createdAt or updatedAt
    pub sort_by: Option<String>,
    /// asc or desc
    pub sort_order: Option<String>,
}

impl From<ProductListParams> for ProductListQuery {
    fn from(params: ProductListParams) -> Self {
        let defaults = ProductListQuery::default();
        Self {
            search: params.search,
            category_id: parse_opt(params.category_id.as_deref()),
            supplier_id: parse_opt(params.supplier_id.as_deref()),
            min_price: parse_opt(params.min_price.as_deref()),
            max_price: parse_opt(params.max_price.as_deref()),
            low_stock: parse_flag(params.low_stock.as_deref()),
            sort_by: parse_sort_field::<ProductSort>(params.sort_by.as_deref(), defaults.sort_by),
            sort_order: SortDirection::parse(params.sort_order.as_deref(), defaults.sort_order),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(PaginationParams, ProductListParams),
    responses(
        (status = 200, description = "Filtered, sorted product page", body = ProductPage),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    QueryParams(pagination): QueryParams<PaginationParams>,
    QueryParams(params): QueryParams<ProductListParams>,
) -> Result<Response, ApiError> {
    let page = pagination.page_request(DEFAULT_LIMIT, state.config.api_max_page_size);
    let products = state.services.products.list(params.into(), page).await?;
    Ok(success_response(products))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product with category and supplier", body = ProductDetail),
        (status = 400, description = "Invalid product ID", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "product")?;
    let product = state.services.products.get(id).await?;
    Ok(success_response(product))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = ProductInput,
    responses(
        (status = 201, description = "Product created", body = ProductWithCategory),
        (status = 400, description = "Missing fields or bad reference", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate SKU", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ProductInput>,
) -> Result<Response, ApiError> {
    let product = state.services.products.create(payload).await?;
    Ok(created_response(product))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    request_body = ProductInput,
    responses(
        (status = 200, description = "Product updated", body = ProductWithCategory),
        (status = 400, description = "Missing fields or bad reference", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate SKU", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<ProductInput>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "product")?;
    let product = state.services.products.update(id, payload).await?;
    Ok(success_response(product))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product has inventory or movements", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "product")?;
    let deleted = state.services.products.delete(id).await?;

    Ok(success_response(json!({
        "message": "Product deleted successfully",
        "deletedProduct": deleted,
    })))
}
