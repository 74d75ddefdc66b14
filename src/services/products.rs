use super::{clean, lenient_number};
use crate::{
    db::{
        fetch_page, find_by_ids, search_term, DbPool, PageRequest, Pagination, SearchBuilder,
        SortDirection, Sorting,
    },
    entities::{category, inventory_item, product, stock_movement, supplier},
    errors::{ServiceError, StoreContext, StoreResultExt},
};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Query, ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use utoipa::ToSchema;

/// Create/update body for a product
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    #[schema(value_type = Option<f64>)]
    pub purchase_price: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_number")]
    #[schema(value_type = Option<f64>)]
    pub selling_price: Option<Decimal>,
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub low_stock_threshold: Option<i32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub category_id: Option<i32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub supplier_id: Option<i32>,
}

/// Columns products may be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum ProductSort {
    Name,
    Sku,
    SellingPrice,
    CreatedAt,
    UpdatedAt,
}

impl ProductSort {
    fn column(self) -> product::Column {
        match self {
            ProductSort::Name => product::Column::Name,
            ProductSort::Sku => product::Column::Sku,
            ProductSort::SellingPrice => product::Column::SellingPrice,
            ProductSort::CreatedAt => product::Column::CreatedAt,
            ProductSort::UpdatedAt => product::Column::UpdatedAt,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductListQuery {
    pub search: Option<String>,
    pub category_id: Option<i32>,
    pub supplier_id: Option<i32>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub low_stock: bool,
    #[serde(skip)]
    #[schema(ignore)]
    pub sort_by: ProductSort,
    #[serde(skip)]
    #[schema(ignore)]
    pub sort_order: SortDirection,
}

impl Default for ProductListQuery {
    fn default() -> Self {
        Self {
            search: None,
            category_id: None,
            supplier_id: None,
            min_price: None,
            max_price: None,
            low_stock: false,
            sort_by: ProductSort::CreatedAt,
            sort_order: SortDirection::Desc,
        }
    }
}

/// Category fields embedded in product responses
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryRef {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
}

impl From<category::Model> for CategoryRef {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductWithCategory {
    #[serde(flatten)]
    pub product: product::Model,
    pub category: Option<CategoryRef>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductPage {
    pub products: Vec<ProductWithCategory>,
    pub pagination: Pagination,
    pub filters: ProductListQuery,
    pub sorting: Sorting,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: product::Model,
    pub category: Option<CategoryRef>,
    pub supplier: Option<supplier::Model>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeletedProduct {
    pub id: i32,
    pub name: String,
    pub sku: String,
}

/// Validated product fields shared by create and update
struct ProductFields {
    name: String,
    sku: String,
    selling_price: Decimal,
}

impl ProductFields {
    fn from_input(input: &ProductInput) -> Result<Self, ServiceError> {
        match (
            clean(input.name.clone()),
            clean(input.sku.clone()),
            input.selling_price,
        ) {
            (Some(name), Some(sku), Some(selling_price)) => Ok(Self {
                name,
                sku,
                selling_price,
            }),
            _ => Err(ServiceError::ValidationError(
                "Missing required fields: name, sku, sellingPrice".to_string(),
            )),
        }
    }
}

/// Service for managing products
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lists products with filters, sorting and embedded category
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: ProductListQuery,
        page: PageRequest,
    ) -> Result<ProductPage, ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to fetch products");

        let mut select = product::Entity::find();
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
        if let Some(supplier_id) = query.supplier_id {
            select = select.filter(product::Column::SupplierId.eq(supplier_id));
        }
        if let Some(min) = query.min_price {
            select = select.filter(product::Column::SellingPrice.gte(min));
        }
        if let Some(max) = query.max_price {
            select = select.filter(product::Column::SellingPrice.lte(max));
        }
        if query.low_stock {
            let low_stock_products = Query::select()
                .column(inventory_item::Column::ProductId)
                .from(inventory_item::Entity)
                .and_where(inventory_item::low_stock_condition())
                .to_owned();
            select = select.filter(product::Column::Id.in_subquery(low_stock_products));
        }

        let select = select
            .order_by(query.sort_by.column(), query.sort_order.order())
            .order_by(product::Column::Id, query.sort_order.order());

        let (rows, total) = fetch_page(select, db, &page).await.map_store_err(&ctx)?;

        let categories = find_by_ids::<category::Entity, _, _>(
            db,
            category::Column::Id,
            rows.iter().filter_map(|p| p.category_id),
            |c| c.id,
        )
        .await
        .map_store_err(&ctx)?;

        let products = rows
            .into_iter()
            .map(|product| {
                let category = product
                    .category_id
                    .and_then(|id| categories.get(&id).cloned())
                    .map(CategoryRef::from);
                ProductWithCategory { product, category }
            })
            .collect();

        Ok(ProductPage {
            products,
            pagination: Pagination::new(&page, total),
            sorting: Sorting::new(query.sort_by, query.sort_order),
            filters: query,
        })
    }

    /// Gets a product with its category and supplier
    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<ProductDetail, ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to fetch product");

        let product = product::Entity::find_by_id(id)
            .one(db)
            .await
            .map_store_err(&ctx)?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let category = product
            .find_related(category::Entity)
            .one(db)
            .await
            .map_store_err(&ctx)?
            .map(CategoryRef::from);
        let supplier = product
            .find_related(supplier::Entity)
            .one(db)
            .await
            .map_store_err(&ctx)?;

        Ok(ProductDetail {
            product,
            category,
            supplier,
        })
    }

    /// Creates a product; the low-stock threshold defaults to 0
    #[instrument(skip(self))]
    pub async fn create(&self, input: ProductInput) -> Result<ProductWithCategory, ServiceError> {
        let fields = ProductFields::from_input(&input)?;
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to create product")
            .on_unique("Failed to create product: Unique constraint violation on {target}.")
            .on_invalid_reference("Invalid category or supplier reference");

        let model = product::ActiveModel {
            name: Set(fields.name),
            sku: Set(fields.sku),
            description: Set(clean(input.description)),
            purchase_price: Set(input.purchase_price),
            selling_price: Set(fields.selling_price),
            image_url: Set(clean(input.image_url)),
            low_stock_threshold: Set(Some(input.low_stock_threshold.unwrap_or(0))),
            category_id: Set(input.category_id),
            supplier_id: Set(input.supplier_id),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_store_err(&ctx)?;

        info!(product_id = model.id, sku = %model.sku, "Product created");
        self.with_category(model, &ctx).await
    }

    /// Replaces a product's fields, keeping the threshold when it is omitted
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: i32,
        input: ProductInput,
    ) -> Result<ProductWithCategory, ServiceError> {
        let fields = ProductFields::from_input(&input)?;
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to update product")
            .on_unique("Failed to update product: Unique constraint violation on {target}.")
            .on_invalid_reference("Invalid category or supplier reference")
            .on_not_found("Product not found");

        let existing = product::Entity::find_by_id(id)
            .one(db)
            .await
            .map_store_err(&ctx)?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let threshold = input.low_stock_threshold.or(existing.low_stock_threshold);
        let mut active = existing.into_active_model();
        active.name = Set(fields.name);
        active.sku = Set(fields.sku);
        active.selling_price = Set(fields.selling_price);
        active.description = Set(clean(input.description));
        active.purchase_price = Set(input.purchase_price);
        active.image_url = Set(clean(input.image_url));
        active.low_stock_threshold = Set(threshold);
        active.category_id = Set(input.category_id);
        active.supplier_id = Set(input.supplier_id);
        let model = active.update(db).await.map_store_err(&ctx)?;

        info!(product_id = model.id, "Product updated");
        self.with_category(model, &ctx).await
    }

    /// Deletes a product without inventory rows or stock movements
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<DeletedProduct, ServiceError> {
        const HAS_RELATED: &str =
            "Cannot delete product: it has related records (inventory, orders, etc.)";

        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to delete product")
            .on_foreign_key(HAS_RELATED)
            .on_not_found("Product not found");

        let existing = product::Entity::find_by_id(id)
            .one(db)
            .await
            .map_store_err(&ctx)?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let inventory_rows = existing
            .find_related(inventory_item::Entity)
            .count(db)
            .await
            .map_store_err(&ctx)?;
        let movements = existing
            .find_related(stock_movement::Entity)
            .count(db)
            .await
            .map_store_err(&ctx)?;
        let dependents = inventory_rows + movements;
        if dependents > 0 {
            return Err(ServiceError::HasDependents {
                message: HAS_RELATED.to_string(),
                details: Some(format!(
                    "This product has {} inventory records and {} stock movements",
                    inventory_rows, movements
                )),
                count: dependents,
            });
        }

        let deleted = DeletedProduct {
            id: existing.id,
            name: existing.name.clone(),
            sku: existing.sku.clone(),
        };
        existing.delete(db).await.map_store_err(&ctx)?;

        info!(product_id = id, "Product deleted");
        Ok(deleted)
    }

    async fn with_category(
        &self,
        product: product::Model,
        ctx: &StoreContext,
    ) -> Result<ProductWithCategory, ServiceError> {
        let category = product
            .find_related(category::Entity)
            .one(&*self.db_pool)
            .await
            .map_store_err(ctx)?
            .map(CategoryRef::from);
        Ok(ProductWithCategory { product, category })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::parse_sort_field;

    #[test]
    fn sort_fields_parse_camel_case() {
        assert_eq!(
            parse_sort_field(Some("sellingPrice"), ProductSort::CreatedAt),
            ProductSort::SellingPrice
        );
        assert_eq!(
            parse_sort_field(Some("password"), ProductSort::CreatedAt),
            ProductSort::CreatedAt
        );
        assert_eq!(ProductSort::UpdatedAt.to_string(), "updatedAt");
    }

    #[test]
    fn required_fields_are_checked_together() {
        let input = ProductInput {
            name: Some("Bolt".into()),
            sku: Some("  ".into()),
            selling_price: Some(Decimal::new(199, 2)),
            ..Default::default()
        };
        let err = ProductFields::from_input(&input).err().unwrap();
        assert_eq!(
            err.to_string(),
            "Missing required fields: name, sku, sellingPrice"
        );
    }
}
