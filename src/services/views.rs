//! Compact projections embedded in other resources' responses.

use crate::entities::{category, inventory_item, product, supplier, user};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryBrief {
    pub id: i32,
    pub name: String,
}

impl From<&category::Model> for CategoryBrief {
    fn from(model: &category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SupplierBrief {
    pub id: i32,
    pub name: String,
}

impl From<&supplier::Model> for SupplierBrief {
    fn from(model: &supplier::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProductBrief {
    pub id: i32,
    pub name: String,
    pub sku: String,
}

impl From<&product::Model> for ProductBrief {
    fn from(model: &product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            sku: model.sku.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemBrief {
    pub id: i32,
    pub location: Option<String>,
    pub batch_number: Option<String>,
}

impl From<&inventory_item::Model> for InventoryItemBrief {
    fn from(model: &inventory_item::Model) -> Self {
        Self {
            id: model.id,
            location: model.location.clone(),
            batch_number: model.batch_number.clone(),
        }
    }
}

/// Actor attached to stock movements
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserBrief {
    pub id: i32,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<&user::Model> for UserBrief {
    fn from(model: &user::Model) -> Self {
        Self {
            id: model.id,
            username: model.username.clone(),
            first_name: model.first_name.clone(),
            last_name: model.last_name.clone(),
        }
    }
}
