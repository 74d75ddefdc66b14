use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{Expr, Func, SimpleExpr};
use sea_orm::{ActiveValue, ConnectionTrait, Set};
use serde::Serialize;
use utoipa::ToSchema;

/// Stock of one product at one location/batch
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, ToSchema)]
#[sea_orm(table_name = "inventory_items")]
#[serde(rename_all = "camelCase")]
#[schema(as = InventoryItem)]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub reserved_quantity: i32,
    pub location: Option<String>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Units not held by reservations. Derived, never stored.
    pub fn available_quantity(&self) -> i32 {
        self.quantity - self.reserved_quantity
    }
}

/// `inventory_items.quantity <= COALESCE(products.low_stock_threshold, 0)`
///
/// The query must have `products` in scope, either joined or as the outer table
/// of a correlated subquery.
pub fn low_stock_condition() -> SimpleExpr {
    Expr::col((Entity, Column::Quantity)).lte(Func::coalesce([
        Expr::col((
            super::product::Entity,
            super::product::Column::LowStockThreshold,
        ))
        .into(),
        Expr::val(0).into(),
    ]))
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Restrict"
    )]
    Product,
    #[sea_orm(has_many = "super::stock_movement::Entity")]
    StockMovements,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockMovements.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            if let ActiveValue::NotSet = active_model.reserved_quantity {
                active_model.reserved_quantity = Set(0);
            }
            active_model.created_at = Set(now);
        }

        active_model.updated_at = Set(now);
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_quantity_subtracts_reservations() {
        let now = Utc::now();
        let item = Model {
            id: 1,
            product_id: 1,
            quantity: 12,
            reserved_quantity: 5,
            location: None,
            batch_number: None,
            expiry_date: None,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(item.available_quantity(), 7);
    }
}
