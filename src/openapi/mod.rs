use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockroom API",
        version = "1.0.0",
        description = r#"
# Stockroom Inventory API

Catalog, stock and account management for a single-warehouse shop.

## Authentication

Sign in through `POST /api/auth/login` and send the returned token on
protected endpoints:

```
Authorization: Bearer <token>
```

Roles are hierarchical: `USER` < `MANAGER` < `ADMIN`.

## Error Handling

Every error is a JSON object with at least a `message`:

```json
{
  "error": "Conflict",
  "message": "Category name already exists",
  "timestamp": "2024-01-01T00:00:00Z"
}
```

## Pagination

List endpoints accept `page` (default 1) and `limit` (capped by the server)
and answer with a `pagination` block.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Sign-in, registration and session identity"),
        (name = "categories", description = "Product categories"),
        (name = "products", description = "Product master data"),
        (name = "suppliers", description = "Supplier directory"),
        (name = "inventory", description = "Stock rows per product and batch"),
        (name = "stock-movements", description = "Stock ledger"),
        (name = "users", description = "Account administration"),
        (name = "catalog", description = "Public storefront listing"),
        (name = "health", description = "Health check endpoints")
    ),
    paths(
        crate::handlers::health::liveness_check,
        crate::handlers::health::database_health_check,

        crate::handlers::auth::login,
        crate::handlers::auth::register,
        crate::handlers::auth::me,

        crate::handlers::categories::list_categories,
        crate::handlers::categories::get_category,
        crate::handlers::categories::create_category,
        crate::handlers::categories::update_category,
        crate::handlers::categories::delete_category,

        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,

        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::get_supplier,
        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::update_supplier,
        crate::handlers::suppliers::delete_supplier,

        crate::handlers::inventory::list_inventory,
        crate::handlers::inventory::get_inventory,
        crate::handlers::inventory::create_inventory,
        crate::handlers::inventory::update_inventory,
        crate::handlers::inventory::delete_inventory,

        crate::handlers::stock_movements::list_stock_movements,
        crate::handlers::stock_movements::create_stock_movement,

        crate::handlers::users::list_users,
        crate::handlers::users::create_user,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,

        crate::handlers::catalog::list_catalog,
    ),
    components(
        schemas(
            crate::auth::Role,
            crate::entities::stock_movement::MovementType,
            crate::entities::user::Model,
            crate::db::Pagination,
            crate::db::Sorting,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDocV1;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_resource() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Stockroom API"));
        for path in [
            "/api/auth/login",
            "/api/categories/{id}",
            "/api/products",
            "/api/suppliers/{id}",
            "/api/inventory",
            "/api/stock-movements",
            "/api/users/{id}",
            "/api/catalog",
            "/api/health/db",
        ] {
            assert!(json.contains(path), "missing {}", path);
        }
        assert!(json.contains("bearer_auth"));
    }
}
