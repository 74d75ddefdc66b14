use super::{
    clean, lenient_number, parse_timestamp,
    views::{CategoryBrief, SupplierBrief, UserBrief},
};
use crate::{
    db::{
        contains_ci, fetch_page, find_by_ids, search_term, DbPool, PageRequest, Pagination,
        SearchBuilder, SortDirection, Sorting,
    },
    entities::{category, inventory_item, product, stock_movement, supplier, user},
    errors::{ServiceError, StoreContext, StoreResultExt},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use utoipa::ToSchema;

const NOT_FOUND: &str = "Inventory item not found";
const RECENT_MOVEMENTS: u64 = 10;
const NEW_PRODUCT_THRESHOLD: i32 = 10;

/// Body for creating an inventory row.
///
/// With `productId` the row is attached to that product. Without it a new
/// product is created from `productName`, `sku` and `sellingPrice`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInventoryRequest {
    #[serde(default, deserialize_with = "lenient_number")]
    pub product_id: Option<i32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub quantity: Option<i32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub reserved_quantity: Option<i32>,
    pub location: Option<String>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<String>,
    pub product_name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    #[schema(value_type = Option<f64>)]
    pub selling_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub low_stock_threshold: Option<i32>,
}

/// Combined product and row update; omitted fields keep their value
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInventoryRequest {
    pub product_name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    #[schema(value_type = Option<f64>)]
    pub selling_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub low_stock_threshold: Option<i32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub quantity: Option<i32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub reserved_quantity: Option<i32>,
    pub location: Option<String>,
    pub batch_number: Option<String>,
}

impl UpdateInventoryRequest {
    fn touches_product(&self) -> bool {
        self.product_name.is_some()
            || self.description.is_some()
            || self.sku.is_some()
            || self.selling_price.is_some()
            || self.low_stock_threshold.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum InventorySort {
    UpdatedAt,
    CreatedAt,
    Quantity,
    ReservedQuantity,
    Location,
    ProductName,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryListQuery {
    pub search: Option<String>,
    pub category_id: Option<i32>,
    pub low_stock: bool,
    pub location: Option<String>,
    #[serde(skip)]
    #[schema(ignore)]
    pub sort_by: InventorySort,
    #[serde(skip)]
    #[schema(ignore)]
    pub sort_order: SortDirection,
}

impl Default for InventoryListQuery {
    fn default() -> Self {
        Self {
            search: None,
            category_id: None,
            low_stock: false,
            location: None,
            sort_by: InventorySort::UpdatedAt,
            sort_order: SortDirection::Desc,
        }
    }
}

/// Product embedded in inventory rows
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InventoryProduct {
    #[serde(flatten)]
    pub product: product::Model,
    pub category: Option<CategoryBrief>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRow {
    #[serde(flatten)]
    pub item: inventory_item::Model,
    pub available_quantity: i32,
    pub product: InventoryProduct,
}

impl InventoryRow {
    fn new(
        item: inventory_item::Model,
        product: product::Model,
        category: Option<CategoryBrief>,
    ) -> Self {
        Self {
            available_quantity: item.available_quantity(),
            item,
            product: InventoryProduct { product, category },
        }
    }

    fn is_low_stock(&self) -> bool {
        self.item.quantity <= self.product.product.effective_threshold()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryStats {
    pub total_items: u64,
    /// Low-stock rows on the returned page
    pub low_stock_items: u64,
    /// Σ quantity × sellingPrice over the returned page
    pub total_value: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryPage {
    pub inventory_items: Vec<InventoryRow>,
    pub pagination: Pagination,
    pub filters: InventoryListQuery,
    pub sorting: Sorting,
    pub stats: InventoryStats,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DetailProduct {
    #[serde(flatten)]
    pub product: product::Model,
    pub category: Option<CategoryBrief>,
    pub supplier: Option<SupplierBrief>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MovementWithUser {
    #[serde(flatten)]
    pub movement: stock_movement::Model,
    pub user: Option<UserBrief>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryDetail {
    #[serde(flatten)]
    pub item: inventory_item::Model,
    pub available_quantity: i32,
    pub product: DetailProduct,
    pub stock_movements: Vec<MovementWithUser>,
}

/// Service for stock rows and their owning products
#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lists inventory rows joined with their product
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: InventoryListQuery,
        page: PageRequest,
    ) -> Result<InventoryPage, ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to fetch inventory");

        let mut select = inventory_item::Entity::find().inner_join(product::Entity);
        if let Some(term) = search_term(query.search.as_deref()) {
            if let Some(condition) = SearchBuilder::new()
                .add_like(product::Column::Name, term)
                .add_like(product::Column::Sku, term)
                .add_like(product::Column::Description, term)
                .build()
            {
                select = select.filter(condition);
            }
        }
        if let Some(category_id) = query.category_id {
            select = select.filter(product::Column::CategoryId.eq(category_id));
        }
        if let Some(location) = search_term(query.location.as_deref()) {
            select = select.filter(contains_ci(inventory_item::Column::Location, location));
        }
        if query.low_stock {
            select = select.filter(inventory_item::low_stock_condition());
        }

        let order = query.sort_order.order();
        select = match query.sort_by {
            InventorySort::ProductName => select.order_by(product::Column::Name, order.clone()),
            InventorySort::UpdatedAt => {
                select.order_by(inventory_item::Column::UpdatedAt, order.clone())
            }
            InventorySort::CreatedAt => {
                select.order_by(inventory_item::Column::CreatedAt, order.clone())
            }
            InventorySort::Quantity => {
                select.order_by(inventory_item::Column::Quantity, order.clone())
            }
            InventorySort::ReservedQuantity => {
                select.order_by(inventory_item::Column::ReservedQuantity, order.clone())
            }
            InventorySort::Location => {
                select.order_by(inventory_item::Column::Location, order.clone())
            }
        };
        let select = select.order_by(inventory_item::Column::Id, order);

        let (items, total) = fetch_page(select, db, &page).await.map_store_err(&ctx)?;
        let rows = self.attach_products(items, &ctx).await?;

        let stats = InventoryStats {
            total_items: total,
            low_stock_items: rows.iter().filter(|row| row.is_low_stock()).count() as u64,
            total_value: rows
                .iter()
                .map(|row| Decimal::from(row.item.quantity) * row.product.product.selling_price)
                .sum(),
        };

        Ok(InventoryPage {
            inventory_items: rows,
            pagination: Pagination::new(&page, total),
            sorting: Sorting::new(query.sort_by, query.sort_order),
            filters: query,
            stats,
        })
    }

    /// Gets a row with product, category, supplier and its latest movements
    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<InventoryDetail, ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to fetch inventory item");

        let item = find_item(db, id, &ctx).await?;
        let product = item
            .find_related(product::Entity)
            .one(db)
            .await
            .map_store_err(&ctx)?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;
        let category = product
            .find_related(category::Entity)
            .one(db)
            .await
            .map_store_err(&ctx)?;
        let supplier = product
            .find_related(supplier::Entity)
            .one(db)
            .await
            .map_store_err(&ctx)?;

        let movements = item
            .find_related(stock_movement::Entity)
            .order_by_desc(stock_movement::Column::CreatedAt)
            .order_by_desc(stock_movement::Column::Id)
            .limit(RECENT_MOVEMENTS)
            .all(db)
            .await
            .map_store_err(&ctx)?;
        let users = find_by_ids::<user::Entity, _, _>(
            db,
            user::Column::Id,
            movements.iter().map(|m| m.user_id),
            |u| u.id,
        )
        .await
        .map_store_err(&ctx)?;

        let stock_movements = movements
            .into_iter()
            .map(|movement| MovementWithUser {
                user: users.get(&movement.user_id).map(UserBrief::from),
                movement,
            })
            .collect();

        Ok(InventoryDetail {
            available_quantity: item.available_quantity(),
            item,
            product: DetailProduct {
                category: category.as_ref().map(CategoryBrief::from),
                supplier: supplier.as_ref().map(SupplierBrief::from),
                product,
            },
            stock_movements,
        })
    }

    /// Creates a row for an existing product, or a new product and its first row
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        request: CreateInventoryRequest,
    ) -> Result<InventoryRow, ServiceError> {
        let expiry_date = parse_expiry(request.expiry_date.as_deref())?;
        match request.product_id {
            Some(product_id) => self.create_for_product(product_id, request, expiry_date).await,
            None => self.create_with_product(request, expiry_date).await,
        }
    }

    async fn create_for_product(
        &self,
        product_id: i32,
        request: CreateInventoryRequest,
        expiry_date: Option<DateTime<Utc>>,
    ) -> Result<InventoryRow, ServiceError> {
        let db = &*self.db_pool;
        let ctx = create_context();

        let quantity = request.quantity.ok_or_else(|| {
            ServiceError::ValidationError("Missing required fields: quantity".to_string())
        })?;

        let product = product::Entity::find_by_id(product_id)
            .one(db)
            .await
            .map_store_err(&ctx)?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let item = inventory_item::ActiveModel {
            product_id: Set(product.id),
            quantity: Set(quantity),
            reserved_quantity: Set(request.reserved_quantity.unwrap_or(0)),
            location: Set(clean(request.location)),
            batch_number: Set(clean(request.batch_number)),
            expiry_date: Set(expiry_date),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_store_err(&ctx)?;

        info!(inventory_item_id = item.id, product_id, "Inventory item created");
        let category = load_category(db, &product, &ctx).await?;
        Ok(InventoryRow::new(item, product, category))
    }

    async fn create_with_product(
        &self,
        request: CreateInventoryRequest,
        expiry_date: Option<DateTime<Utc>>,
    ) -> Result<InventoryRow, ServiceError> {
        let db = &*self.db_pool;
        let ctx = create_context();

        let (name, sku, selling_price) = match (
            clean(request.product_name),
            clean(request.sku),
            request.selling_price,
        ) {
            (Some(name), Some(sku), Some(price)) => (name, sku, price),
            _ => {
                return Err(ServiceError::ValidationError(
                    "Product name, SKU and selling price are required".to_string(),
                ))
            }
        };

        let existing = product::Entity::find()
            .filter(product::Column::Sku.eq(sku.as_str()))
            .one(db)
            .await
            .map_store_err(&ctx)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(
                "SKU already exists, please use a different SKU".to_string(),
            ));
        }

        let txn = db.begin().await.map_store_err(&ctx)?;
        let product = product::ActiveModel {
            name: Set(name),
            sku: Set(sku),
            description: Set(clean(request.description)),
            selling_price: Set(selling_price),
            purchase_price: Set(Some(Decimal::ZERO)),
            low_stock_threshold: Set(Some(
                request.low_stock_threshold.unwrap_or(NEW_PRODUCT_THRESHOLD),
            )),
            category_id: Set(None),
            supplier_id: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_store_err(&ctx)?;

        let item = inventory_item::ActiveModel {
            product_id: Set(product.id),
            quantity: Set(request.quantity.unwrap_or(0)),
            reserved_quantity: Set(request.reserved_quantity.unwrap_or(0)),
            location: Set(clean(request.location)),
            batch_number: Set(clean(request.batch_number)),
            expiry_date: Set(expiry_date),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_store_err(&ctx)?;
        txn.commit().await.map_store_err(&ctx)?;

        info!(
            inventory_item_id = item.id,
            product_id = product.id,
            "Product and inventory item created"
        );
        Ok(InventoryRow::new(item, product, None))
    }

    /// Updates the row and its product in one transaction
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: i32,
        request: UpdateInventoryRequest,
    ) -> Result<InventoryRow, ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to update inventory item")
            .on_unique("SKU already exists or duplicate inventory item")
            .on_not_found(NOT_FOUND);

        let txn = db.begin().await.map_store_err(&ctx)?;
        let item = find_item(&txn, id, &ctx).await?;
        let mut product = item
            .find_related(product::Entity)
            .one(&txn)
            .await
            .map_store_err(&ctx)?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if request.touches_product() {
            let mut active = product.into_active_model();
            if let Some(name) = clean(request.product_name.clone()) {
                active.name = Set(name);
            }
            if let Some(sku) = clean(request.sku.clone()) {
                active.sku = Set(sku);
            }
            if let Some(description) = request.description.clone() {
                active.description = Set(clean(Some(description)));
            }
            if let Some(price) = request.selling_price {
                active.selling_price = Set(price);
            }
            if let Some(threshold) = request.low_stock_threshold {
                active.low_stock_threshold = Set(Some(threshold));
            }
            product = active.update(&txn).await.map_store_err(&ctx)?;
        }

        let mut active = item.into_active_model();
        if let Some(quantity) = request.quantity {
            active.quantity = Set(quantity);
        }
        if let Some(reserved) = request.reserved_quantity {
            active.reserved_quantity = Set(reserved);
        }
        if let Some(location) = request.location {
            active.location = Set(clean(Some(location)));
        }
        if let Some(batch_number) = request.batch_number {
            active.batch_number = Set(clean(Some(batch_number)));
        }
        let item = active.update(&txn).await.map_store_err(&ctx)?;

        let category = load_category(&txn, &product, &ctx).await?;
        txn.commit().await.map_store_err(&ctx)?;

        info!(inventory_item_id = id, product_id = product.id, "Inventory item updated");
        Ok(InventoryRow::new(item, product, category))
    }

    /// Deletes the row only; its movements keep their history
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to delete inventory item").on_not_found(NOT_FOUND);

        let item = find_item(db, id, &ctx).await?;
        item.delete(db).await.map_store_err(&ctx)?;

        info!(inventory_item_id = id, "Inventory item deleted");
        Ok(())
    }

    async fn attach_products(
        &self,
        items: Vec<inventory_item::Model>,
        ctx: &StoreContext,
    ) -> Result<Vec<InventoryRow>, ServiceError> {
        let db = &*self.db_pool;
        let products = find_by_ids::<product::Entity, _, _>(
            db,
            product::Column::Id,
            items.iter().map(|i| i.product_id),
            |p| p.id,
        )
        .await
        .map_store_err(ctx)?;
        let categories = find_by_ids::<category::Entity, _, _>(
            db,
            category::Column::Id,
            products.values().filter_map(|p| p.category_id),
            |c| c.id,
        )
        .await
        .map_store_err(ctx)?;

        items
            .into_iter()
            .map(|item| {
                let product = products.get(&item.product_id).cloned().ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "inventory item {} references missing product {}",
                        item.id, item.product_id
                    ))
                })?;
                let category = product
                    .category_id
                    .and_then(|id| categories.get(&id))
                    .map(CategoryBrief::from);
                Ok(InventoryRow::new(item, product, category))
            })
            .collect()
    }
}

fn create_context() -> StoreContext {
    StoreContext::new("Failed to create inventory item")
        .on_unique("SKU already exists or duplicate inventory item")
        .on_invalid_reference("Product not found")
}

fn parse_expiry(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, ServiceError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_timestamp(raw)
            .map(Some)
            .ok_or_else(|| ServiceError::ValidationError("Invalid expiry date".to_string())),
    }
}

async fn find_item<C: ConnectionTrait>(
    db: &C,
    id: i32,
    ctx: &StoreContext,
) -> Result<inventory_item::Model, ServiceError> {
    inventory_item::Entity::find_by_id(id)
        .one(db)
        .await
        .map_store_err(ctx)?
        .ok_or_else(|| ServiceError::NotFound(NOT_FOUND.to_string()))
}

async fn load_category<C: ConnectionTrait>(
    db: &C,
    product: &product::Model,
    ctx: &StoreContext,
) -> Result<Option<CategoryBrief>, ServiceError> {
    Ok(product
        .find_related(category::Entity)
        .one(db)
        .await
        .map_store_err(ctx)?
        .as_ref()
        .map(CategoryBrief::from))
}
