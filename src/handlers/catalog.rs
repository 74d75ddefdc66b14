use super::common::{parse_opt, success_response, PaginationParams, QueryParams};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::catalog::{CatalogPage, CatalogQuery},
};
use axum::{extract::State, response::Response, routing::get, Router};
use serde::Deserialize;
use utoipa::IntoParams;

const DEFAULT_LIMIT: u64 = 20;

/// Public storefront listing
pub fn catalog_routes() -> Router<AppState> {
    Router::new().route("/api/catalog", get(list_catalog))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CatalogParams {
    pub search: Option<String>,
    #[param(value_type = Option<i32>)]
    pub category_id: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/catalog",
    params(PaginationParams, CatalogParams),
    responses(
        (status = 200, description = "In-stock items and all categories", body = CatalogPage),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse)
    ),
    tag = "catalog"
)]
pub async fn list_catalog(
    State(state): State<AppState>,
    QueryParams(pagination): QueryParams<PaginationParams>,
    QueryParams(params): QueryParams<CatalogParams>,
) -> Result<Response, ApiError> {
    let query = CatalogQuery {
        search: params.search,
        category_id: parse_opt(params.category_id.as_deref()),
    };
    let page = pagination.page_request(DEFAULT_LIMIT, state.config.api_max_page_size);

    let catalog = state.services.catalog.list(query, page).await?;
    Ok(success_response(catalog))
}
