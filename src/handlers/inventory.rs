use super::common::{
    created_response, parse_flag, parse_id, parse_opt, success_response, JsonBody,
    PaginationParams, QueryParams,
};
use crate::{
    auth::{AuthRouterExt, Role},
    db::{parse_sort_field, SortDirection},
    errors::ApiError,
    handlers::AppState,
    services::inventory::{
        CreateInventoryRequest, InventoryDetail, InventoryListQuery, InventoryPage, InventoryRow,
        InventorySort, UpdateInventoryRequest,
    },
};
use axum::{
    extract::{Path, State},
    response::Response,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

const DEFAULT_LIMIT: u64 = 20;

/// Reads need a signed-in user, writes need MANAGER
pub fn inventory_routes() -> Router<AppState> {
    let read = Router::new()
        .route("/api/inventory", get(list_inventory))
        .route("/api/inventory/:id", get(get_inventory))
        .with_auth();

    let write = Router::new()
        .route("/api/inventory", post(create_inventory))
        .route(
            "/api/inventory/:id",
            put(update_inventory).delete(delete_inventory),
        )
        .with_role(Role::Manager);

    read.merge(write)
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct InventoryListParams {
    /// Substring of product name, sku or description
    pub search: Option<String>,
    #[param(value_type = Option<i32>)]
    pub category_id: Option<String>,
    #[param(value_type = Option<bool>)]
    pub low_stock: Option<String>,
    /// Substring of the storage location
    pub location: Option<String>,
    /// updatedAt, createdAt, quantity, reservedQuantity, location or productName
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl From<InventoryListParams> for InventoryListQuery {
    fn from(params: InventoryListParams) -> Self {
        let defaults = InventoryListQuery::default();
        Self {
            search: params.search,
            category_id: parse_opt(params.category_id.as_deref()),
            low_stock: parse_flag(params.low_stock.as_deref()),
            location: params.location,
            sort_by: parse_sort_field::<InventorySort>(params.sort_by.as_deref(), defaults.sort_by),
            sort_order: SortDirection::parse(params.sort_order.as_deref(), defaults.sort_order),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/inventory",
    params(PaginationParams, InventoryListParams),
    responses(
        (status = 200, description = "Inventory rows with stats", body = InventoryPage),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn list_inventory(
    State(state): State<AppState>,
    QueryParams(pagination): QueryParams<PaginationParams>,
    QueryParams(params): QueryParams<InventoryListParams>,
) -> Result<Response, ApiError> {
    let page = pagination.page_request(DEFAULT_LIMIT, state.config.api_max_page_size);
    let inventory = state.services.inventory.list(params.into(), page).await?;
    Ok(success_response(inventory))
}

#[utoipa::path(
    get,
    path = "/api/inventory/{id}",
    params(("id" = i32, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Row with product and recent movements", body = InventoryDetail),
        (status = 400, description = "Invalid inventory item ID", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 404, description = "Inventory item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn get_inventory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "inventory item")?;
    let item = state.services.inventory.get(id).await?;
    Ok(success_response(item))
}

#[utoipa::path(
    post,
    path = "/api/inventory",
    request_body = CreateInventoryRequest,
    responses(
        (status = 201, description = "Inventory row created", body = InventoryRow),
        (status = 400, description = "Missing fields", body = crate::errors::ErrorResponse),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate SKU or batch", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn create_inventory(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateInventoryRequest>,
) -> Result<Response, ApiError> {
    let item = state.services.inventory.create(payload).await?;
    Ok(created_response(item))
}

#[utoipa::path(
    put,
    path = "/api/inventory/{id}",
    params(("id" = i32, Path, description = "Inventory item ID")),
    request_body = UpdateInventoryRequest,
    responses(
        (status = 200, description = "Row and product updated", body = InventoryRow),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Inventory item not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate SKU or batch", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn update_inventory(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateInventoryRequest>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "inventory item")?;
    let item = state.services.inventory.update(id, payload).await?;
    Ok(success_response(item))
}

#[utoipa::path(
    delete,
    path = "/api/inventory/{id}",
    params(("id" = i32, Path, description = "Inventory item ID")),
    responses(
        (status = 200, description = "Inventory row deleted"),
        (status = 403, description = "Forbidden", body = crate::errors::ErrorResponse),
        (status = 404, description = "Inventory item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "inventory"
)]
pub async fn delete_inventory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "inventory item")?;
    state.services.inventory.delete(id).await?;
    Ok(success_response(json!({ "message": "Inventory item deleted successfully" })))
}
