use crate::{
    db::{count_grouped, fetch_page, search_term, DbPool, PageRequest, Pagination, SearchBuilder},
    entities::{category, product},
    errors::{ServiceError, StoreContext, StoreResultExt},
};
use super::clean;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

/// Create/update body for a category
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryListQuery {
    pub search: Option<String>,
    pub include_product_count: bool,
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct ProductCount {
    pub products: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: category::Model,
    #[serde(rename = "_count", skip_serializing_if = "Option::is_none")]
    pub count: Option<ProductCount>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFilters {
    pub search: Option<String>,
    pub include_product_count: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryPage {
    pub categories: Vec<CategoryWithCount>,
    pub pagination: Pagination,
    pub filters: CategoryFilters,
}

/// Recent product shown on the category detail view
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProduct {
    pub id: i32,
    pub name: String,
    pub sku: String,
    pub selling_price: Decimal,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: category::Model,
    #[serde(rename = "_count")]
    pub count: ProductCount,
    pub products: Vec<CategoryProduct>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DeletedCategory {
    pub id: i32,
    pub name: String,
}

const RECENT_PRODUCTS: u64 = 10;

/// Service for managing product categories
#[derive(Clone)]
pub struct CategoryService {
    db_pool: Arc<DbPool>,
}

impl CategoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lists categories ordered by name
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: CategoryListQuery,
        page: PageRequest,
    ) -> Result<CategoryPage, ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to fetch categories");

        let mut select = category::Entity::find();
        if let Some(term) = search_term(query.search.as_deref()) {
            if let Some(condition) = SearchBuilder::new()
                .add_like(category::Column::Name, term)
                .add_like(category::Column::Description, term)
                .build()
            {
                select = select.filter(condition);
            }
        }
        let select = select.order_by_asc(category::Column::Name);

        let (rows, total) = fetch_page(select, db, &page).await.map_store_err(&ctx)?;

        let counts = if query.include_product_count {
            Some(
                count_grouped::<product::Entity, _>(
                    db,
                    product::Column::CategoryId,
                    rows.iter().map(|c| c.id),
                )
                .await
                .map_store_err(&ctx)?,
            )
        } else {
            None
        };

        let categories = rows
            .into_iter()
            .map(|category| {
                let count = counts.as_ref().map(|counts| ProductCount {
                    products: counts.get(&category.id).copied().unwrap_or(0),
                });
                CategoryWithCount { category, count }
            })
            .collect();

        Ok(CategoryPage {
            categories,
            pagination: Pagination::new(&page, total),
            filters: CategoryFilters {
                search: query.search,
                include_product_count: query.include_product_count,
            },
        })
    }

    /// Gets a category with its product count and newest products
    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<CategoryDetail, ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to fetch category");

        let category = category::Entity::find_by_id(id)
            .one(db)
            .await
            .map_store_err(&ctx)?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;

        let count = category
            .find_related(product::Entity)
            .count(db)
            .await
            .map_store_err(&ctx)?;

        let products = category
            .find_related(product::Entity)
            .order_by_desc(product::Column::CreatedAt)
            .order_by_desc(product::Column::Id)
            .limit(RECENT_PRODUCTS)
            .all(db)
            .await
            .map_store_err(&ctx)?
            .into_iter()
            .map(|p| CategoryProduct {
                id: p.id,
                name: p.name,
                sku: p.sku,
                selling_price: p.selling_price,
                image_url: p.image_url,
            })
            .collect();

        Ok(CategoryDetail {
            category,
            count: ProductCount { products: count },
            products,
        })
    }

    /// Creates a category
    #[instrument(skip(self))]
    pub async fn create(&self, input: CategoryInput) -> Result<category::Model, ServiceError> {
        let name = required_name(input.name)?;
        let ctx = StoreContext::new("Failed to create category")
            .on_unique("Category name already exists");

        let model = category::ActiveModel {
            name: Set(name),
            description: Set(clean(input.description)),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_store_err(&ctx)?;

        info!(category_id = model.id, "Category created");
        Ok(model)
    }

    /// Replaces a category's name and description
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: i32,
        input: CategoryInput,
    ) -> Result<category::Model, ServiceError> {
        let name = required_name(input.name)?;
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to update category")
            .on_unique("Category name already exists")
            .on_not_found("Category not found");

        let existing = category::Entity::find_by_id(id)
            .one(db)
            .await
            .map_store_err(&ctx)?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;

        let mut active = existing.into_active_model();
        active.name = Set(name);
        active.description = Set(clean(input.description));
        let model = active.update(db).await.map_store_err(&ctx)?;

        info!(category_id = model.id, "Category updated");
        Ok(model)
    }

    /// Deletes a category that has no products
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<DeletedCategory, ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to delete category")
            .on_foreign_key("Cannot delete category: it still has associated products")
            .on_not_found("Category not found");

        let existing = category::Entity::find_by_id(id)
            .one(db)
            .await
            .map_store_err(&ctx)?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;

        let products = existing
            .find_related(product::Entity)
            .count(db)
            .await
            .map_store_err(&ctx)?;
        if products > 0 {
            return Err(ServiceError::HasDependents {
                message: format!(
                    "Cannot delete category: it has {} associated products. Please reassign or delete these products first.",
                    products
                ),
                details: None,
                count: products,
            });
        }

        let deleted = DeletedCategory {
            id: existing.id,
            name: existing.name.clone(),
        };
        existing.delete(db).await.map_store_err(&ctx)?;

        info!(category_id = id, "Category deleted");
        Ok(deleted)
    }
}

fn required_name(name: Option<String>) -> Result<String, ServiceError> {
    clean(name)
        .ok_or_else(|| ServiceError::ValidationError("Missing required field: name".to_string()))
}
