mod common;

use axum::http::{Method, StatusCode};
use common::{as_f64, TestApp};
use serde_json::json;

#[tokio::test]
async fn reads_require_authentication() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/api/inventory", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing authentication token");

    let (status, _) = app
        .send(Method::GET, "/api/inventory", None, Some(app.user_token()))
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn writes_require_manager() {
    let app = TestApp::new().await;
    let product = app
        .create_product(json!({ "name": "Box", "sku": "BX-1", "sellingPrice": 2 }))
        .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/inventory",
            Some(json!({ "productId": product, "quantity": 5 })),
            Some(app.user_token()),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Insufficient permissions. Required: MANAGER");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/inventory",
            Some(json!({ "productId": product, "quantity": 5 })),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn create_for_existing_product() {
    let app = TestApp::new().await;
    let product = app
        .create_product(json!({ "name": "Tape", "sku": "TP-1", "sellingPrice": 3 }))
        .await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/inventory",
            Some(json!({
                "productId": product,
                "quantity": "12",
                "reservedQuantity": 2,
                "location": " Shelf 4 ",
                "batchNumber": "B-77",
                "expiryDate": "2030-01-31",
            })),
            Some(app.manager_token()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["productId"], product);
    assert_eq!(body["quantity"], 12);
    assert_eq!(body["availableQuantity"], 10);
    assert_eq!(body["location"], "Shelf 4");
    assert_eq!(body["product"]["sku"], "TP-1");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/inventory",
            Some(json!({ "productId": product, "quantity": 1, "batchNumber": "B-77" })),
            Some(app.manager_token()),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "SKU already exists or duplicate inventory item");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/inventory",
            Some(json!({ "productId": product })),
            Some(app.manager_token()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required fields: quantity");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/inventory",
            Some(json!({ "productId": 9999, "quantity": 1 })),
            Some(app.manager_token()),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found");
}

#[tokio::test]
async fn create_with_new_product() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/inventory",
            Some(json!({
                "productName": "Fresh Item",
                "sku": "FR-1",
                "sellingPrice": "7.25",
                "quantity": 20,
            })),
            Some(app.manager_token()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["product"]["name"], "Fresh Item");
    assert_eq!(body["product"]["lowStockThreshold"], 10);
    assert!(as_f64(&body["product"]["purchasePrice"]).abs() < 1e-9);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/inventory",
            Some(json!({ "productName": "Again", "sku": "FR-1", "sellingPrice": 1 })),
            Some(app.manager_token()),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "SKU already exists, please use a different SKU");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/inventory",
            Some(json!({ "productName": "No Sku", "sellingPrice": 1 })),
            Some(app.manager_token()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Product name, SKU and selling price are required");
}

#[tokio::test]
async fn list_reports_stats_and_filters() {
    let app = TestApp::new().await;
    let hardware = app.create_category("Hardware").await;
    let screws = app
        .create_product(json!({
            "name": "Screws", "sku": "HW-1", "sellingPrice": 2,
            "lowStockThreshold": 10, "categoryId": hardware,
        }))
        .await;
    let drill = app
        .create_product(json!({ "name": "Drill", "sku": "HW-2", "sellingPrice": 50, "lowStockThreshold": 1 }))
        .await;
    app.create_inventory(screws, 5, "S-1").await;
    app.create_inventory(drill, 3, "D-1").await;

    let (status, body) = app
        .send(Method::GET, "/api/inventory", None, Some(app.user_token()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inventoryItems"].as_array().unwrap().len(), 2);
    assert_eq!(body["stats"]["totalItems"], 2);
    assert_eq!(body["stats"]["lowStockItems"], 1);
    assert!((as_f64(&body["stats"]["totalValue"]) - 160.0).abs() < 1e-9);
    assert_eq!(body["sorting"]["sortBy"], "updatedAt");

    let (_, body) = app
        .send(
            Method::GET,
            "/api/inventory?lowStock=true",
            None,
            Some(app.user_token()),
        )
        .await;
    let rows = body["inventoryItems"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["product"]["name"], "Screws");
    assert_eq!(rows[0]["product"]["category"]["name"], "Hardware");

    let uri = format!("/api/inventory?categoryId={}", hardware);
    let (_, body) = app.send(Method::GET, &uri, None, Some(app.user_token())).await;
    assert_eq!(body["stats"]["totalItems"], 1);

    let (_, body) = app
        .send(
            Method::GET,
            "/api/inventory?search=drill&sortBy=quantity&sortOrder=asc",
            None,
            Some(app.user_token()),
        )
        .await;
    assert_eq!(body["inventoryItems"][0]["product"]["sku"], "HW-2");
    assert_eq!(body["sorting"]["sortBy"], "quantity");

    let (_, body) = app
        .send(
            Method::GET,
            "/api/inventory?location=a-0",
            None,
            Some(app.user_token()),
        )
        .await;
    assert_eq!(body["stats"]["totalItems"], 2);
}

#[tokio::test]
async fn detail_includes_product_relations_and_movements() {
    let app = TestApp::new().await;
    let product = app
        .create_product(json!({ "name": "Glue", "sku": "GL-1", "sellingPrice": 4 }))
        .await;
    let item = app.create_inventory(product, 10, "G-1").await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/stock-movements",
            Some(json!({
                "productId": product,
                "inventoryItemId": item,
                "type": "SALE",
                "quantity": -3,
            })),
            Some(app.user_token()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(
            Method::GET,
            &format!("/api/inventory/{}", item),
            None,
            Some(app.user_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quantity"], 7);
    assert!(body["product"]["supplier"].is_null());
    assert_eq!(body["stockMovements"][0]["type"], "SALE");
    assert_eq!(body["stockMovements"][0]["user"]["username"], "clerk");

    let (status, body) = app
        .send(Method::GET, "/api/inventory/abc", None, Some(app.user_token()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid inventory item ID");

    let (status, body) = app
        .send(Method::GET, "/api/inventory/777", None, Some(app.user_token()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Inventory item not found");
}

#[tokio::test]
async fn update_touches_product_and_row_together() {
    let app = TestApp::new().await;
    let product = app
        .create_product(json!({ "name": "Pen", "sku": "PN-1", "sellingPrice": 1 }))
        .await;
    app.create_product(json!({ "name": "Pencil", "sku": "PN-2", "sellingPrice": 1 }))
        .await;
    let item = app.create_inventory(product, 10, "P-1").await;
    let uri = format!("/api/inventory/{}", item);

    let (status, body) = app
        .send(
            Method::PUT,
            &uri,
            Some(json!({ "productName": "Blue Pen", "quantity": 25, "location": "B-02" })),
            Some(app.manager_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["quantity"], 25);
    assert_eq!(body["location"], "B-02");
    assert_eq!(body["batchNumber"], "P-1");
    assert_eq!(body["product"]["name"], "Blue Pen");
    assert_eq!(body["product"]["sku"], "PN-1");

    let (status, _) = app
        .send(
            Method::PUT,
            &uri,
            Some(json!({ "sku": "PN-2", "quantity": 1 })),
            Some(app.manager_token()),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // The failed transaction left the row untouched
    let (_, body) = app.send(Method::GET, &uri, None, Some(app.user_token())).await;
    assert_eq!(body["quantity"], 25);
    assert_eq!(body["product"]["sku"], "PN-1");

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/inventory/999",
            Some(json!({ "quantity": 1 })),
            Some(app.manager_token()),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Inventory item not found");
}

#[tokio::test]
async fn delete_keeps_movement_history() {
    let app = TestApp::new().await;
    let product = app
        .create_product(json!({ "name": "Clip", "sku": "CL-1", "sellingPrice": 1 }))
        .await;
    let item = app.create_inventory(product, 10, "C-1").await;
    app.send(
        Method::POST,
        "/api/stock-movements",
        Some(json!({ "productId": product, "inventoryItemId": item, "type": "PURCHASE", "quantity": 5 })),
        Some(app.manager_token()),
    )
    .await;

    let uri = format!("/api/inventory/{}", item);
    let (status, body) = app
        .send(Method::DELETE, &uri, None, Some(app.manager_token()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Inventory item deleted successfully");

    let (_, body) = app
        .send(
            Method::GET,
            &format!("/api/stock-movements?productId={}", product),
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(body["stockMovements"].as_array().unwrap().len(), 1);
    assert!(body["stockMovements"][0]["inventoryItemId"].is_null());

    let (status, _) = app
        .send(Method::DELETE, &uri, None, Some(app.manager_token()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
