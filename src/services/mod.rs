// Resource services
pub mod catalog;
pub mod categories;
pub mod inventory;
pub mod products;
pub mod stock_movements;
pub mod suppliers;
pub mod users;
pub mod views;

mod input;

pub use input::{
    clean, is_valid_email, lenient_bool, lenient_number, nullable, parse_timestamp,
};

use crate::auth::AuthService;
use crate::db::DbPool;
use std::sync::Arc;

/// Container for every service the handlers reach through `AppState`
#[derive(Clone)]
pub struct AppServices {
    pub categories: categories::CategoryService,
    pub products: products::ProductService,
    pub suppliers: suppliers::SupplierService,
    pub inventory: inventory::InventoryService,
    pub stock_movements: stock_movements::StockMovementService,
    pub users: users::UserService,
    pub catalog: catalog::CatalogService,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, auth: Arc<AuthService>) -> Self {
        Self {
            categories: categories::CategoryService::new(db_pool.clone()),
            products: products::ProductService::new(db_pool.clone()),
            suppliers: suppliers::SupplierService::new(db_pool.clone()),
            inventory: inventory::InventoryService::new(db_pool.clone()),
            stock_movements: stock_movements::StockMovementService::new(db_pool.clone()),
            users: users::UserService::new(db_pool.clone(), auth),
            catalog: catalog::CatalogService::new(db_pool),
        }
    }
}
