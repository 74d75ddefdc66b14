use super::common::{
    created_response, parse_flag, parse_id, success_response, JsonBody, PaginationParams,
    QueryParams,
};
use crate::{
    db::{parse_sort_field, SortDirection},
    errors::ApiError,
    handlers::AppState,
    services::suppliers::{
        CreateSupplierRequest, SupplierDetail, SupplierListQuery, SupplierPage, SupplierSort,
        SupplierWithCount, UpdateSupplierRequest,
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

const DEFAULT_LIMIT: u64 = 20;

pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/api/suppliers", get(list_suppliers).post(create_supplier))
        .route(
            "/api/suppliers/:id",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SupplierListParams {
    /// Substring of name, contact person, email or phone
    pub search: Option<String>,
    #[param(value_type = Option<bool>)]
    pub include_product_count: Option<String>,
    /// name, contactPerson, email, createdAt or updatedAt
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/suppliers",
    params(PaginationParams, SupplierListParams),
    responses(
        (status = 200, description = "Supplier page", body = SupplierPage),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    QueryParams(pagination): QueryParams<PaginationParams>,
    QueryParams(params): QueryParams<SupplierListParams>,
) -> Result<Response, ApiError> {
    let defaults = SupplierListQuery::default();
    let query = SupplierListQuery {
        search: params.search,
        include_product_count: parse_flag(params.include_product_count.as_deref()),
        sort_by: parse_sort_field::<SupplierSort>(params.sort_by.as_deref(), defaults.sort_by),
        sort_order: SortDirection::parse(params.sort_order.as_deref(), defaults.sort_order),
    };
    let page = pagination.page_request(DEFAULT_LIMIT, state.config.api_max_page_size);

    let suppliers = state.services.suppliers.list(query, page).await?;
    Ok(success_response(suppliers))
}

#[utoipa::path(
    get,
    path = "/api/suppliers/{id}",
    params(("id" = i32, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier with its products", body = SupplierDetail),
        (status = 400, description = "Invalid supplier ID", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "supplier")?;
    let supplier = state.services.suppliers.get(id).await?;
    Ok(success_response(supplier))
}

#[utoipa::path(
    post,
    path = "/api/suppliers",
    request_body = CreateSupplierRequest,
    responses(
        (status = 201, description = "Supplier created", body = SupplierWithCount),
        (status = 400, description = "Missing name or bad email", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate name", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateSupplierRequest>,
) -> Result<Response, ApiError> {
    let supplier = state.services.suppliers.create(payload).await?;
    Ok(created_response(supplier))
}

#[utoipa::path(
    put,
    path = "/api/suppliers/{id}",
    params(("id" = i32, Path, description = "Supplier ID")),
    request_body = UpdateSupplierRequest,
    responses(
        (status = 200, description = "Supplier updated", body = SupplierWithCount),
        (status = 400, description = "Nothing to update or blank name", body = crate::errors::ErrorResponse),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate name", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateSupplierRequest>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "supplier")?;
    let supplier = state.services.suppliers.update(id, payload).await?;
    Ok(success_response(supplier))
}

#[utoipa::path(
    delete,
    path = "/api/suppliers/{id}",
    params(("id" = i32, Path, description = "Supplier ID")),
    responses(
        (status = 200, description = "Supplier deleted"),
        (status = 404, description = "Supplier not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Supplier still has products", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "supplier")?;
    state.services.suppliers.delete(id).await?;
    Ok(success_response(json!({ "message": "Supplier deleted successfully" })))
}
