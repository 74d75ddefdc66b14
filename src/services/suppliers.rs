use super::{clean, is_valid_email, nullable};
use crate::{
    db::{
        count_grouped, fetch_page, search_term, DbPool, PageRequest, Pagination, SearchBuilder,
        SortDirection, Sorting,
    },
    entities::{product, supplier},
    errors::{ServiceError, StoreContext, StoreResultExt},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{info, instrument};
use utoipa::ToSchema;

const DUPLICATE_NAME: &str = "Supplier with this name already exists";

/// Body for creating a supplier
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplierRequest {
    pub name: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Partial update: absent fields are kept, `null` or blank clears them
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplierRequest {
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub contact_person: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    #[schema(value_type = Option<String>)]
    pub address: Option<Option<String>>,
}

impl UpdateSupplierRequest {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.contact_person.is_none()
            && self.phone.is_none()
            && self.email.is_none()
            && self.address.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum SupplierSort {
    Name,
    ContactPerson,
    Email,
    CreatedAt,
    UpdatedAt,
}

impl SupplierSort {
    fn column(self) -> supplier::Column {
        match self {
            SupplierSort::Name => supplier::Column::Name,
            SupplierSort::ContactPerson => supplier::Column::ContactPerson,
            SupplierSort::Email => supplier::Column::Email,
            SupplierSort::CreatedAt => supplier::Column::CreatedAt,
            SupplierSort::UpdatedAt => supplier::Column::UpdatedAt,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupplierListQuery {
    pub search: Option<String>,
    pub include_product_count: bool,
    pub sort_by: SupplierSort,
    pub sort_order: SortDirection,
}

impl Default for SupplierListQuery {
    fn default() -> Self {
        Self {
            search: None,
            include_product_count: false,
            sort_by: SupplierSort::Name,
            sort_order: SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct ProductCount {
    pub products: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SupplierWithCount {
    #[serde(flatten)]
    pub supplier: supplier::Model,
    #[serde(rename = "_count", skip_serializing_if = "Option::is_none")]
    pub count: Option<ProductCount>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierFilters {
    pub search: Option<String>,
    pub include_product_count: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SupplierPage {
    pub suppliers: Vec<SupplierWithCount>,
    pub pagination: Pagination,
    pub filters: SupplierFilters,
    pub sorting: Sorting,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SupplierProduct {
    pub id: i32,
    pub name: String,
    pub sku: String,
    pub selling_price: Decimal,
    pub low_stock_threshold: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SupplierDetail {
    #[serde(flatten)]
    pub supplier: supplier::Model,
    pub products: Vec<SupplierProduct>,
    #[serde(rename = "_count")]
    pub count: ProductCount,
}

/// Service for managing suppliers
#[derive(Clone)]
pub struct SupplierService {
    db_pool: Arc<DbPool>,
}

impl SupplierService {
    /// Creates a new supplier service instance
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lists suppliers
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        query: SupplierListQuery,
        page: PageRequest,
    ) -> Result<SupplierPage, ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to fetch suppliers");

        let mut select = supplier::Entity::find();
        if let Some(term) = search_term(query.search.as_deref()) {
            if let Some(condition) = SearchBuilder::new()
                .add_like(supplier::Column::Name, term)
                .add_like(supplier::Column::ContactPerson, term)
                .add_like(supplier::Column::Email, term)
                .add_like(supplier::Column::Phone, term)
                .build()
            {
                select = select.filter(condition);
            }
        }
        let select = select
            .order_by(query.sort_by.column(), query.sort_order.order())
            .order_by(supplier::Column::Id, query.sort_order.order());

        let (rows, total) = fetch_page(select, db, &page).await.map_store_err(&ctx)?;

        let counts = if query.include_product_count {
            Some(
                count_grouped::<product::Entity, _>(
                    db,
                    product::Column::SupplierId,
                    rows.iter().map(|s| s.id),
                )
                .await
                .map_store_err(&ctx)?,
            )
        } else {
            None
        };

        let suppliers = rows
            .into_iter()
            .map(|supplier| {
                let count = counts.as_ref().map(|counts| ProductCount {
                    products: counts.get(&supplier.id).copied().unwrap_or(0),
                });
                SupplierWithCount { supplier, count }
            })
            .collect();

        Ok(SupplierPage {
            suppliers,
            pagination: Pagination::new(&page, total),
            sorting: Sorting::new(query.sort_by, query.sort_order),
            filters: SupplierFilters {
                search: query.search,
                include_product_count: query.include_product_count,
            },
        })
    }

    /// Gets a supplier with its products ordered by name
    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<SupplierDetail, ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to fetch supplier");

        let supplier = self.find(id, &ctx).await?;
        let products: Vec<SupplierProduct> = supplier
            .find_related(product::Entity)
            .order_by_asc(product::Column::Name)
            .all(db)
            .await
            .map_store_err(&ctx)?
            .into_iter()
            .map(|p| SupplierProduct {
                id: p.id,
                name: p.name,
                sku: p.sku,
                selling_price: p.selling_price,
                low_stock_threshold: p.low_stock_threshold,
                created_at: p.created_at,
            })
            .collect();

        Ok(SupplierDetail {
            count: ProductCount {
                products: products.len() as u64,
            },
            supplier,
            products,
        })
    }

    /// Creates a new supplier
    #[instrument(skip(self))]
    pub async fn create(
        &self,
        request: CreateSupplierRequest,
    ) -> Result<SupplierWithCount, ServiceError> {
        let name = clean(request.name).ok_or_else(|| {
            ServiceError::ValidationError("Missing required field: name".to_string())
        })?;
        let email = clean(request.email);
        check_email(email.as_deref())?;

        let ctx = StoreContext::new("Failed to create supplier").on_unique(DUPLICATE_NAME);
        let model = supplier::ActiveModel {
            name: Set(name),
            contact_person: Set(clean(request.contact_person)),
            phone: Set(clean(request.phone)),
            email: Set(email),
            address: Set(clean(request.address)),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_store_err(&ctx)?;

        info!(supplier_id = model.id, "Supplier created");
        Ok(SupplierWithCount {
            supplier: model,
            count: Some(ProductCount { products: 0 }),
        })
    }

    /// Applies a partial update to a supplier
    #[instrument(skip(self))]
    pub async fn update(
        &self,
        id: i32,
        request: UpdateSupplierRequest,
    ) -> Result<SupplierWithCount, ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to update supplier")
            .on_unique(DUPLICATE_NAME)
            .on_not_found("Supplier not found");

        let existing = self.find(id, &ctx).await?;

        if request.is_empty() {
            return Err(ServiceError::ValidationError(
                "At least one field (name, contactPerson, phone, email, address) must be provided"
                    .to_string(),
            ));
        }

        let email = request.email.map(clean);
        check_email(email.as_ref().and_then(|e| e.as_deref()))?;

        let mut active = existing.into_active_model();
        if let Some(name) = request.name {
            let name = clean(name)
                .ok_or_else(|| ServiceError::ValidationError("Name cannot be empty".to_string()))?;
            active.name = Set(name);
        }
        if let Some(contact_person) = request.contact_person {
            active.contact_person = Set(clean(contact_person));
        }
        if let Some(phone) = request.phone {
            active.phone = Set(clean(phone));
        }
        if let Some(email) = email {
            active.email = Set(email);
        }
        if let Some(address) = request.address {
            active.address = Set(clean(address));
        }

        let model = active.update(db).await.map_store_err(&ctx)?;
        let products = model
            .find_related(product::Entity)
            .count(db)
            .await
            .map_store_err(&ctx)?;

        info!(supplier_id = model.id, "Supplier updated");
        Ok(SupplierWithCount {
            supplier: model,
            count: Some(ProductCount { products }),
        })
    }

    /// Deletes a supplier that has no products
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let ctx = StoreContext::new("Failed to delete supplier")
            .on_foreign_key("Cannot delete supplier with existing products")
            .on_not_found("Supplier not found");

        let existing = self.find(id, &ctx).await?;
        let products = existing
            .find_related(product::Entity)
            .count(db)
            .await
            .map_store_err(&ctx)?;
        if products > 0 {
            return Err(ServiceError::HasDependents {
                message: "Cannot delete supplier with existing products".to_string(),
                details: Some(format!(
                    "This supplier has {} associated products",
                    products
                )),
                count: products,
            });
        }

        existing.delete(db).await.map_store_err(&ctx)?;
        info!(supplier_id = id, "Supplier deleted");
        Ok(())
    }

    async fn find(&self, id: i32, ctx: &StoreContext) -> Result<supplier::Model, ServiceError> {
        supplier::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_store_err(ctx)?
            .ok_or_else(|| ServiceError::NotFound("Supplier not found".to_string()))
    }
}

fn check_email(email: Option<&str>) -> Result<(), ServiceError> {
    match email {
        Some(email) if !is_valid_email(email) => Err(ServiceError::ValidationError(
            "Invalid email format".to_string(),
        )),
        _ => Ok(()),
    }
}
