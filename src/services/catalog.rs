use super::views::CategoryBrief;
use crate::{
    db::{fetch_page, find_by_ids, search_term, DbPool, PageRequest, Pagination, SearchBuilder},
    entities::{category, inventory_item, product},
    errors::{ServiceError, StoreContext, StoreResultExt},
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub category_id: Option<i32>,
}

/// One sellable stock row as shown to shoppers.
///
/// `availableQuantity` is `quantity - reservedQuantity`.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Product id
    pub id: i32,
    pub inventory_item_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub sku: String,
    pub category_id: Option<i32>,
    #[schema(value_type = f64)]
    pub selling_price: Decimal,
    pub image_url: Option<String>,
    pub category: Option<CategoryBrief>,
    pub quantity: i32,
    pub reserved_quantity: i32,
    pub available_quantity: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CatalogPage {
    pub products: Vec<CatalogItem>,
    pub pagination: Pagination,
    pub categories: Vec<CategoryBrief>,
}

/// Read-only storefront listing
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: CatalogQuery,
        page: PageRequest,
    ) -> Result<CatalogPage, ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to fetch catalog");

        let mut select = inventory_item::Entity::find()
            .inner_join(product::Entity)
            .filter(inventory_item::Column::Quantity.gt(0));
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
        let select = select
            .order_by_desc(inventory_item::Column::UpdatedAt)
            .order_by_desc(inventory_item::Column::Id);

        let (rows, total) = fetch_page(select, db, &page).await.map_store_err(&ctx)?;

        let products_by_id = find_by_ids::<product::Entity, _, _>(
            db,
            product::Column::Id,
            rows.iter().map(|row| row.product_id),
            |p| p.id,
        )
        .await
        .map_store_err(&ctx)?;

        let categories = category::Entity::find()
            .order_by_asc(category::Column::Name)
            .all(db)
            .await
            .map_store_err(&ctx)?;

        let products = rows
            .iter()
            .filter_map(|row| {
                let product = products_by_id.get(&row.product_id)?;
                let category = product
                    .category_id
                    .and_then(|id| categories.iter().find(|c| c.id == id))
                    .map(CategoryBrief::from);
                Some(CatalogItem {
                    id: product.id,
                    inventory_item_id: row.id,
                    name: product.name.clone(),
                    description: product.description.clone(),
                    sku: product.sku.clone(),
                    category_id: product.category_id,
                    selling_price: product.selling_price,
                    image_url: product.image_url.clone(),
                    category,
                    quantity: row.quantity,
                    reserved_quantity: row.reserved_quantity,
                    available_quantity: row.quantity - row.reserved_quantity,
                })
            })
            .collect();

        Ok(CatalogPage {
            products,
            pagination: Pagination::new(&page, total),
            categories: categories.iter().map(CategoryBrief::from).collect(),
        })
    }
}
