//! sea-orm entities for the stockroom schema.

pub mod category;
pub mod inventory_item;
pub mod product;
pub mod stock_movement;
pub mod supplier;
pub mod user;
