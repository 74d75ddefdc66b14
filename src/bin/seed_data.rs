//! Seed data script - populates the database with demo data
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - admin, manager and user1 accounts
//! - 4 categories and 3 suppliers
//! - 8 products with one inventory row each
//! - opening PURCHASE movements plus one SALE
//!
//! Rows whose unique key already exists are left untouched, so the script can
//! be run repeatedly.

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use clap::Parser;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set,
};
use tracing::info;

use stockroom_api::{
    auth::{hash_password, Role},
    db::{self, DbConfig},
    entities::{
        category, inventory_item, product,
        stock_movement::{self, MovementType},
        supplier, user,
    },
    migrator::Migrator,
};

#[derive(Debug, Parser)]
#[command(name = "seed-data", version, about = "Seed demo data")]
struct Args {
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite://stockroom.db?mode=rwc"
    )]
    database_url: String,

    #[arg(long, env = "SEED_ADMIN_PASSWORD", default_value = "admin123")]
    admin_password: String,

    #[arg(long, env = "SEED_MANAGER_PASSWORD", default_value = "manager123")]
    manager_password: String,

    #[arg(long, env = "SEED_USER_PASSWORD", default_value = "user123")]
    user_password: String,

    /// Skip applying pending migrations first
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    info!("=== Stockroom Seed Data ===");
    info!("Connecting to database: {}", args.database_url);
    let db = db::establish_connection_with_config(&DbConfig {
        url: args.database_url.clone(),
        max_connections: 2,
        ..Default::default()
    })
    .await
    .context("failed to connect to the database")?;

    if !args.no_migrate {
        use sea_orm_migration::MigratorTrait;
        Migrator::up(&db, None).await.context("migration failed")?;
    }

    info!("Creating users...");
    let admin = ensure_user(&db, "admin", "admin@inventory.com", &args.admin_password, Role::Admin, "Admin").await?;
    let manager = ensure_user(&db, "manager", "manager@inventory.com", &args.manager_password, Role::Manager, "Manager").await?;
    ensure_user(&db, "user1", "user1@inventory.com", &args.user_password, Role::User, "Regular").await?;

    info!("Creating categories...");
    let electronics = ensure_category(&db, "Electronics", "Phones, laptops and accessories").await?;
    let office = ensure_category(&db, "Office Supplies", "Paper, pens and desk equipment").await?;
    let furniture = ensure_category(&db, "Furniture", "Desks, chairs and storage").await?;
    ensure_category(&db, "Cleaning", "Janitorial consumables").await?;

    info!("Creating suppliers...");
    let north = ensure_supplier(&db, "Northwind Traders", "Ana Trujillo", "+1-555-0101", "sales@northwind.example.com", "12 Harbour Road, Seattle").await?;
    let contoso = ensure_supplier(&db, "Contoso Wholesale", "Li Wei", "+1-555-0102", "orders@contoso.example.com", "400 Commerce Ave, Austin").await?;
    let fabrikam = ensure_supplier(&db, "Fabrikam Office", "Sam Patel", "+1-555-0103", "hello@fabrikam.example.com", "9 Mill Street, Denver").await?;

    info!("Creating products and inventory...");
    let catalog = [
        ("Wireless Mouse", "ELEC-MOUSE-01", dec!(8.50), dec!(19.99), 10, &electronics, &north, 120),
        ("USB-C Hub 7-in-1", "ELEC-HUB-07", dec!(21.00), dec!(49.99), 5, &electronics, &north, 35),
        ("27\" Monitor", "ELEC-MON-27", dec!(140.00), dec!(279.00), 3, &electronics, &contoso, 4),
        ("A4 Copy Paper (500)", "OFF-PAPER-A4", dec!(3.10), dec!(6.49), 50, &office, &fabrikam, 400),
        ("Gel Pen Blue (12)", "OFF-PEN-BL12", dec!(2.40), dec!(5.99), 20, &office, &fabrikam, 15),
        ("Stapler Heavy Duty", "OFF-STAPLER", dec!(9.00), dec!(22.50), 5, &office, &fabrikam, 0),
        ("Ergonomic Chair", "FUR-CHAIR-ERG", dec!(160.00), dec!(349.00), 2, &furniture, &contoso, 8),
        ("Standing Desk 140cm", "FUR-DESK-140", dec!(230.00), dec!(499.00), 2, &furniture, &contoso, 2),
    ];

    let expiry = Utc
        .with_ymd_and_hms(2027, 12, 31, 0, 0, 0)
        .single()
        .context("invalid expiry date")?;
    let mut movements = 0;

    for (i, (name, sku, cost, price, threshold, category, supplier, quantity)) in
        catalog.into_iter().enumerate()
    {
        let product = ensure_product(&db, name, sku, cost, price, threshold, category, supplier).await?;
        let batch = format!("BATCH-{:03}", i + 1);

        let existing = inventory_item::Entity::find()
            .filter(inventory_item::Column::ProductId.eq(product.id))
            .filter(inventory_item::Column::BatchNumber.eq(batch.as_str()))
            .one(&db)
            .await?;
        if existing.is_some() {
            continue;
        }

        let item = inventory_item::ActiveModel {
            product_id: Set(product.id),
            quantity: Set(quantity),
            reserved_quantity: Set(0),
            location: Set(Some(format!("A-{:02}-01", i + 1))),
            batch_number: Set(Some(batch.clone())),
            expiry_date: Set(Some(expiry)),
            ..Default::default()
        }
        .insert(&db)
        .await?;

        if quantity > 0 {
            record_movement(
                &db,
                &item,
                admin.id,
                MovementType::Purchase,
                quantity,
                "Opening stock",
                &format!("PO-{}", batch),
            )
            .await?;
            movements += 1;
        }
        if i == 0 {
            record_movement(
                &db,
                &item,
                manager.id,
                MovementType::Sale,
                -10,
                "Counter sale",
                "SO-0001",
            )
            .await?;
            inventory_item::Entity::update_many()
                .col_expr(
                    inventory_item::Column::Quantity,
                    Expr::col(inventory_item::Column::Quantity).sub(10),
                )
                .filter(inventory_item::Column::Id.eq(item.id))
                .exec(&db)
                .await?;
            movements += 1;
        }
    }
    info!("  Recorded {} stock movements", movements);

    info!("=== Seed Data Complete ===");
    info!("Sign in with admin / manager / user1 and the configured passwords");
    info!("Explore interactively at: http://localhost:8080/swagger-ui");

    db::close_pool(db).await?;
    Ok(())
}

async fn ensure_user(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
    password: &str,
    role: Role,
    first_name: &str,
) -> Result<user::Model> {
    if let Some(existing) = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(db)
        .await?
    {
        info!("  {} already exists", username);
        return Ok(existing);
    }

    let model = user::ActiveModel {
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(password)?),
        role: Set(role.to_string()),
        is_active: Set(true),
        first_name: Set(Some(first_name.to_string())),
        last_name: Set(Some("User".to_string())),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!("  Created {} ({})", username, role);
    Ok(model)
}

async fn ensure_category(
    db: &DatabaseConnection,
    name: &str,
    description: &str,
) -> Result<category::Model> {
    if let Some(existing) = category::Entity::find()
        .filter(category::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    Ok(category::ActiveModel {
        name: Set(name.to_string()),
        description: Set(Some(description.to_string())),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

async fn ensure_supplier(
    db: &DatabaseConnection,
    name: &str,
    contact_person: &str,
    phone: &str,
    email: &str,
    address: &str,
) -> Result<supplier::Model> {
    if let Some(existing) = supplier::Entity::find()
        .filter(supplier::Column::Name.eq(name))
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    Ok(supplier::ActiveModel {
        name: Set(name.to_string()),
        contact_person: Set(Some(contact_person.to_string())),
        phone: Set(Some(phone.to_string())),
        email: Set(Some(email.to_string())),
        address: Set(Some(address.to_string())),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

#[allow(clippy::too_many_arguments)]
async fn ensure_product(
    db: &DatabaseConnection,
    name: &str,
    sku: &str,
    purchase_price: Decimal,
    selling_price: Decimal,
    low_stock_threshold: i32,
    category: &category::Model,
    supplier: &supplier::Model,
) -> Result<product::Model> {
    if let Some(existing) = product::Entity::find()
        .filter(product::Column::Sku.eq(sku))
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    Ok(product::ActiveModel {
        name: Set(name.to_string()),
        sku: Set(sku.to_string()),
        description: Set(None),
        purchase_price: Set(Some(purchase_price)),
        selling_price: Set(selling_price),
        image_url: Set(None),
        low_stock_threshold: Set(Some(low_stock_threshold)),
        category_id: Set(Some(category.id)),
        supplier_id: Set(Some(supplier.id)),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

async fn record_movement(
    db: &DatabaseConnection,
    item: &inventory_item::Model,
    user_id: i32,
    movement_type: MovementType,
    quantity: i32,
    reason: &str,
    reference: &str,
) -> Result<()> {
    stock_movement::ActiveModel {
        product_id: Set(item.product_id),
        inventory_item_id: Set(Some(item.id)),
        user_id: Set(user_id),
        movement_type: Set(movement_type.to_string()),
        quantity: Set(quantity),
        reason: Set(Some(reason.to_string())),
        reference: Set(Some(reference.to_string())),
        notes: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}
