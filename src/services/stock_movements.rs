use super::{
    clean, lenient_number,
    views::{InventoryItemBrief, ProductBrief, UserBrief},
};
use crate::{
    auth::CurrentUser,
    db::{fetch_page, find_by_ids, DbPool, PageRequest, Pagination, SortDirection, Sorting},
    entities::{
        inventory_item, product,
        stock_movement::{self, MovementType},
        user,
    },
    errors::{ServiceError, StoreContext, StoreResultExt},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Select, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use utoipa::ToSchema;

/// Body for recording a stock movement
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateStockMovementRequest {
    #[serde(default, deserialize_with = "lenient_number")]
    pub product_id: Option<i32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub inventory_item_id: Option<i32>,
    /// Actor to record under; defaults to the caller
    #[serde(default, deserialize_with = "lenient_number")]
    pub user_id: Option<i32>,
    #[serde(rename = "type")]
    pub movement_type: Option<String>,
    /// Signed delta applied to the inventory row
    #[serde(default, deserialize_with = "lenient_number")]
    pub quantity: Option<i32>,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum StockMovementSort {
    CreatedAt,
    Quantity,
    Type,
}

impl StockMovementSort {
    fn column(self) -> stock_movement::Column {
        match self {
            StockMovementSort::CreatedAt => stock_movement::Column::CreatedAt,
            StockMovementSort::Quantity => stock_movement::Column::Quantity,
            StockMovementSort::Type => stock_movement::Column::MovementType,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovementListQuery {
    pub product_id: Option<i32>,
    #[serde(rename = "type")]
    #[schema(value_type = Option<String>)]
    pub movement_type: Option<MovementType>,
    pub user_id: Option<i32>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(skip)]
    #[schema(ignore)]
    pub sort_by: StockMovementSort,
    #[serde(skip)]
    #[schema(ignore)]
    pub sort_order: SortDirection,
}

impl Default for StockMovementListQuery {
    fn default() -> Self {
        Self {
            product_id: None,
            movement_type: None,
            user_id: None,
            start_date: None,
            end_date: None,
            sort_by: StockMovementSort::CreatedAt,
            sort_order: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovementRow {
    #[serde(flatten)]
    pub movement: stock_movement::Model,
    pub product: Option<ProductBrief>,
    pub inventory_item: Option<InventoryItemBrief>,
    pub user: Option<UserBrief>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovementStats {
    pub total_movements: u64,
    pub inbound_movements: u64,
    pub outbound_movements: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StockMovementPage {
    pub stock_movements: Vec<StockMovementRow>,
    pub pagination: Pagination,
    pub filters: StockMovementListQuery,
    pub sorting: Sorting,
    pub stats: StockMovementStats,
}

/// Service for the stock movement ledger
#[derive(Clone)]
pub struct StockMovementService {
    db_pool: Arc<DbPool>,
}

impl StockMovementService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lists movements; USER-role actors only ever see their own
    #[instrument(skip(self, actor), fields(actor_id = actor.id))]
    pub async fn list(
        &self,
        actor: &CurrentUser,
        mut query: StockMovementListQuery,
        page: PageRequest,
    ) -> Result<StockMovementPage, ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to fetch stock movements");

        if !actor.is_privileged() {
            query.user_id = Some(actor.id);
        }

        let filtered = filtered_select(&query);
        let inbound = filtered
            .clone()
            .filter(stock_movement::Column::Quantity.gt(0))
            .count(db)
            .await
            .map_store_err(&ctx)?;
        let outbound = filtered
            .clone()
            .filter(stock_movement::Column::Quantity.lt(0))
            .count(db)
            .await
            .map_store_err(&ctx)?;

        let select = filtered
            .order_by(query.sort_by.column(), query.sort_order.order())
            .order_by(stock_movement::Column::Id, query.sort_order.order());
        let (movements, total) = fetch_page(select, db, &page).await.map_store_err(&ctx)?;
        let rows = self.attach_relations(movements, &ctx).await?;

        Ok(StockMovementPage {
            stock_movements: rows,
            pagination: Pagination::new(&page, total),
            sorting: Sorting::new(query.sort_by, query.sort_order),
            filters: query,
            stats: StockMovementStats {
                total_movements: total,
                inbound_movements: inbound,
                outbound_movements: outbound,
            },
        })
    }

    /// Records a movement and applies its delta to the referenced inventory row
    #[instrument(skip(self, actor), fields(actor_id = actor.id))]
    pub async fn create(
        &self,
        actor: &CurrentUser,
        request: CreateStockMovementRequest,
    ) -> Result<StockMovementRow, ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to create stock movement")
            .on_invalid_reference("Invalid reference to product, inventory item, or user");

        let (product_id, raw_type, quantity) = match (
            request.product_id,
            clean(request.movement_type),
            request.quantity,
        ) {
            (Some(product_id), Some(raw_type), Some(quantity)) => (product_id, raw_type, quantity),
            _ => {
                return Err(ServiceError::ValidationError(
                    "Missing required fields: productId, type, quantity".to_string(),
                ))
            }
        };
        let movement_type: MovementType = raw_type
            .parse()
            .map_err(|_| ServiceError::ValidationError("Invalid movement type".to_string()))?;

        let user_id = match request.user_id {
            Some(user_id) if user_id != actor.id => {
                if !actor.is_privileged() {
                    return Err(ServiceError::Forbidden(
                        "Only managers and administrators can create records for other users"
                            .to_string(),
                    ));
                }
                user_id
            }
            _ => actor.id,
        };

        product::Entity::find_by_id(product_id)
            .one(db)
            .await
            .map_store_err(&ctx)?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if let Some(item_id) = request.inventory_item_id {
            let item = inventory_item::Entity::find_by_id(item_id)
                .one(db)
                .await
                .map_store_err(&ctx)?
                .ok_or_else(|| ServiceError::NotFound("Inventory item not found".to_string()))?;
            if item.product_id != product_id {
                return Err(ServiceError::ValidationError(
                    "Inventory item does not belong to the specified product".to_string(),
                ));
            }
        }

        let txn = db.begin().await.map_store_err(&ctx)?;
        let movement = stock_movement::ActiveModel {
            product_id: Set(product_id),
            inventory_item_id: Set(request.inventory_item_id),
            user_id: Set(user_id),
            movement_type: Set(movement_type.to_string()),
            quantity: Set(quantity),
            reason: Set(clean(request.reason)),
            reference: Set(clean(request.reference)),
            notes: Set(clean(request.notes)),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_store_err(&ctx)?;

        if let Some(item_id) = request.inventory_item_id {
            inventory_item::Entity::update_many()
                .col_expr(
                    inventory_item::Column::Quantity,
                    Expr::col(inventory_item::Column::Quantity).add(quantity),
                )
                .col_expr(inventory_item::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(inventory_item::Column::Id.eq(item_id))
                .exec(&txn)
                .await
                .map_store_err(&ctx)?;
        }
        txn.commit().await.map_store_err(&ctx)?;

        info!(
            stock_movement_id = movement.id,
            product_id,
            user_id,
            quantity,
            movement_type = %movement_type,
            "Stock movement recorded"
        );

        let mut rows = self.attach_relations(vec![movement], &ctx).await?;
        rows.pop()
            .ok_or_else(|| ServiceError::InternalError("stock movement vanished".to_string()))
    }

    async fn attach_relations(
        &self,
        movements: Vec<stock_movement::Model>,
        ctx: &StoreContext,
    ) -> Result<Vec<StockMovementRow>, ServiceError> {
        let db = &*self.db_pool;
        let products = find_by_ids::<product::Entity, _, _>(
            db,
            product::Column::Id,
            movements.iter().map(|m| m.product_id),
            |p| p.id,
        )
        .await
        .map_store_err(ctx)?;
        let items = find_by_ids::<inventory_item::Entity, _, _>(
            db,
            inventory_item::Column::Id,
            movements.iter().filter_map(|m| m.inventory_item_id),
            |i| i.id,
        )
        .await
        .map_store_err(ctx)?;
        let users = find_by_ids::<user::Entity, _, _>(
            db,
            user::Column::Id,
            movements.iter().map(|m| m.user_id),
            |u| u.id,
        )
        .await
        .map_store_err(ctx)?;

        Ok(movements
            .into_iter()
            .map(|movement| StockMovementRow {
                product: products.get(&movement.product_id).map(ProductBrief::from),
                inventory_item: movement
                    .inventory_item_id
                    .and_then(|id| items.get(&id))
                    .map(InventoryItemBrief::from),
                user: users.get(&movement.user_id).map(UserBrief::from),
                movement,
            })
            .collect())
    }
}

fn filtered_select(query: &StockMovementListQuery) -> Select<stock_movement::Entity> {
    let mut select = stock_movement::Entity::find();
    if let Some(product_id) = query.product_id {
        select = select.filter(stock_movement::Column::ProductId.eq(product_id));
    }
    if let Some(movement_type) = query.movement_type {
        select = select.filter(stock_movement::Column::MovementType.eq(movement_type.to_string()));
    }
    if let Some(user_id) = query.user_id {
        select = select.filter(stock_movement::Column::UserId.eq(user_id));
    }
    if let Some(start) = query.start_date {
        select = select.filter(stock_movement::Column::CreatedAt.gte(start));
    }
    if let Some(end) = query.end_date {
        select = select.filter(stock_movement::Column::CreatedAt.lte(end));
    }
    select
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::parse_sort_field;

    #[test]
    fn sort_field_type_maps_to_type_column() {
        let sort = parse_sort_field(Some("type"), StockMovementSort::CreatedAt);
        assert_eq!(sort, StockMovementSort::Type);
        assert_eq!(sort.to_string(), "type");
        assert_eq!(
            parse_sort_field(Some("userId"), StockMovementSort::CreatedAt),
            StockMovementSort::CreatedAt
        );
    }

    #[test]
    fn request_reads_type_key() {
        let request: CreateStockMovementRequest = serde_json::from_str(
            r#"{"productId":"3","type":"PURCHASE","quantity":"-2","inventoryItemId":7}"#,
        )
        .unwrap();
        assert_eq!(request.product_id, Some(3));
        assert_eq!(request.movement_type.as_deref(), Some("PURCHASE"));
        assert_eq!(request.quantity, Some(-2));
        assert_eq!(request.inventory_item_id, Some(7));
    }

    #[test]
    fn filters_echo_type_in_uppercase() {
        let query = StockMovementListQuery {
            movement_type: Some(MovementType::Sale),
            ..Default::default()
        };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["type"], "SALE");
        assert!(json.get("sortBy").is_none());
    }
}
