use super::common::{
    created_response, parse_opt, success_response, JsonBody, PaginationParams, QueryParams,
};
use crate::{
    auth::{AuthRouterExt, CurrentUser},
    db::{parse_sort_field, SortDirection},
    entities::stock_movement::MovementType,
    errors::ApiError,
    handlers::AppState,
    services::{
        parse_timestamp,
        stock_movements::{
            CreateStockMovementRequest, StockMovementListQuery, StockMovementPage,
            StockMovementRow, StockMovementSort,
        },
    },
};
use axum::{extract::State, response::Response, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

const DEFAULT_LIMIT: u64 = 20;

pub fn stock_movement_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/stock-movements",
            get(list_stock_movements).post(create_stock_movement),
        )
        .with_auth()
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StockMovementListParams {
    #[param(value_type = Option<i32>)]
    pub product_id: Option<String>,
    /// PURCHASE, SALE, ADJUSTMENT, RETURN, TRANSFER or DAMAGE
    #[serde(rename = "type")]
    pub movement_type: Option<String>,
    /// Ignored for USER-role callers
    #[param(value_type = Option<i32>)]
    pub user_id: Option<String>,
    /// RFC 3339 timestamp or YYYY-MM-DD
    pub start_date: Option<String>,
    /// RFC 3339 timestamp or YYYY-MM-DD
    pub end_date: Option<String>,
    /// createdAt, quantity or type
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl TryFrom<StockMovementListParams> for StockMovementListQuery {
    type Error = ApiError;

    fn try_from(params: StockMovementListParams) -> Result<Self, Self::Error> {
        let defaults = StockMovementListQuery::default();
        let movement_type = match params.movement_type.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                raw.parse::<MovementType>()
                    .map_err(|_| ApiError::bad_request("Invalid movement type"))?,
            ),
        };

        Ok(Self {
            product_id: parse_opt(params.product_id.as_deref()),
            movement_type,
            user_id: parse_opt(params.user_id.as_deref()),
            start_date: date_param(params.start_date.as_deref(), "startDate")?,
            end_date: date_param(params.end_date.as_deref(), "endDate")?,
            sort_by: parse_sort_field::<StockMovementSort>(
                params.sort_by.as_deref(),
                defaults.sort_by,
            ),
            sort_order: SortDirection::parse(params.sort_order.as_deref(), defaults.sort_order),
        })
    }
}

fn date_param(raw: Option<&str>, name: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(value) => parse_timestamp(value)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(format!("Invalid {}", name))),
    }
}

#[utoipa::path(
    get,
    path = "/api/stock-movements",
    params(PaginationParams, StockMovementListParams),
    responses(
        (status = 200, description = "Movement page with stats", body = StockMovementPage),
        (status = 400, description = "Invalid filter value", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stock-movements"
)]
pub async fn list_stock_movements(
    State(state): State<AppState>,
    user: CurrentUser,
    QueryParams(pagination): QueryParams<PaginationParams>,
    QueryParams(params): QueryParams<StockMovementListParams>,
) -> Result<Response, ApiError> {
    let query = StockMovementListQuery::try_from(params)?;
    let page = pagination.page_request(DEFAULT_LIMIT, state.config.api_max_page_size);

    let movements = state
        .services
        .stock_movements
        .list(&user, query, page)
        .await?;
    Ok(success_response(movements))
}

#[utoipa::path(
    post,
    path = "/api/stock-movements",
    request_body = CreateStockMovementRequest,
    responses(
        (status = 201, description = "Movement recorded and stock adjusted", body = StockMovementRow),
        (status = 400, description = "Missing fields or bad reference", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 403, description = "Recording for another user", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product or inventory item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stock-movements"
)]
pub async fn create_stock_movement(
    State(state): State<AppState>,
    user: CurrentUser,
    JsonBody(payload): JsonBody<CreateStockMovementRequest>,
) -> Result<Response, ApiError> {
    let movement = state
        .services
        .stock_movements
        .create(&user, payload)
        .await?;
    Ok(created_response(movement))
}
