mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::{json, Value};

struct Fixture {
    app: TestApp,
    product: i64,
    item: i64,
}

async fn fixture() -> Fixture {
    let app = TestApp::new().await;
    let product = app
        .create_product(json!({ "name": "Bolt", "sku": "BT-1", "sellingPrice": 1 }))
        .await;
    let item = app.create_inventory(product, 100, "BT-A").await;
    Fixture { app, product, item }
}

async fn record(app: &TestApp, token: &str, body: Value) -> (StatusCode, Value) {
    app.send(Method::POST, "/api/stock-movements", Some(body), Some(token))
        .await
}

async fn item_quantity(app: &TestApp, item: i64) -> i64 {
    let (_, body) = app
        .send(
            Method::GET,
            &format!("/api/inventory/{}", item),
            None,
            Some(app.admin_token()),
        )
        .await;
    body["quantity"].as_i64().unwrap()
}

#[tokio::test]
async fn recording_adjusts_inventory_by_signed_delta() {
    let Fixture { app, product, item } = fixture().await;

    let (status, body) = record(
        &app,
        app.user_token(),
        json!({
            "productId": product,
            "inventoryItemId": item,
            "type": "SALE",
            "quantity": -30,
            "reason": "Walk-in",
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["type"], "SALE");
    assert_eq!(body["quantity"], -30);
    assert_eq!(body["userId"], app.user.user.id);
    assert_eq!(body["product"]["sku"], "BT-1");
    assert_eq!(body["inventoryItem"]["batchNumber"], "BT-A");
    assert_eq!(body["user"]["username"], "clerk");
    assert_eq!(item_quantity(&app, item).await, 70);

    let (status, _) = record(
        &app,
        app.manager_token(),
        json!({ "productId": product, "inventoryItemId": item, "type": "RETURN", "quantity": "5" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item_quantity(&app, item).await, 75);
}

#[tokio::test]
async fn movement_without_item_leaves_stock_alone() {
    let Fixture { app, product, item } = fixture().await;

    let (status, body) = record(
        &app,
        app.user_token(),
        json!({ "productId": product, "type": "ADJUSTMENT", "quantity": 4 }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["inventoryItem"].is_null());
    assert_eq!(item_quantity(&app, item).await, 100);
}

#[tokio::test]
async fn create_validates_input() {
    let Fixture { app, product, .. } = fixture().await;
    let other = app
        .create_product(json!({ "name": "Other", "sku": "OT-1", "sellingPrice": 1 }))
        .await;
    let other_item = app.create_inventory(other, 1, "OT-A").await;

    let cases = [
        (
            json!({ "productId": product, "quantity": 1 }),
            StatusCode::BAD_REQUEST,
            "Missing required fields: productId, type, quantity",
        ),
        (
            json!({ "productId": product, "type": "GIFT", "quantity": 1 }),
            StatusCode::BAD_REQUEST,
            "Invalid movement type",
        ),
        (
            json!({ "productId": 4040, "type": "SALE", "quantity": 1 }),
            StatusCode::NOT_FOUND,
            "Product not found",
        ),
        (
            json!({ "productId": product, "inventoryItemId": 4040, "type": "SALE", "quantity": 1 }),
            StatusCode::NOT_FOUND,
            "Inventory item not found",
        ),
        (
            json!({ "productId": product, "inventoryItemId": other_item, "type": "SALE", "quantity": 1 }),
            StatusCode::BAD_REQUEST,
            "Inventory item does not belong to the specified product",
        ),
    ];

    for (payload, expected_status, expected_message) in cases {
        let (status, body) = record(&app, app.user_token(), payload).await;
        assert_eq!(status, expected_status, "{}", body);
        assert_eq!(body["message"], expected_message);
    }
}

#[tokio::test]
async fn only_managers_record_for_other_users() {
    let Fixture { app, product, .. } = fixture().await;

    let (status, body) = record(
        &app,
        app.user_token(),
        json!({ "productId": product, "type": "SALE", "quantity": -1, "userId": app.admin.user.id }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["message"],
        "Only managers and administrators can create records for other users"
    );

    let (status, body) = record(
        &app,
        app.manager_token(),
        json!({ "productId": product, "type": "SALE", "quantity": -1, "userId": app.user.user.id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["userId"], app.user.user.id);

    let (status, body) = record(
        &app,
        app.manager_token(),
        json!({ "productId": product, "type": "SALE", "quantity": -1, "userId": 5000 }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Invalid reference to product, inventory item, or user"
    );
}

#[tokio::test]
async fn list_scopes_regular_users_to_their_own_records() {
    let Fixture { app, product, item } = fixture().await;
    record(
        &app,
        app.user_token(),
        json!({ "productId": product, "inventoryItemId": item, "type": "SALE", "quantity": -2 }),
    )
    .await;
    record(
        &app,
        app.manager_token(),
        json!({ "productId": product, "inventoryItemId": item, "type": "PURCHASE", "quantity": 10 }),
    )
    .await;
    record(
        &app,
        app.admin_token(),
        json!({ "productId": product, "inventoryItemId": item, "type": "DAMAGE", "quantity": -1 }),
    )
    .await;

    // A USER asking for someone else's records still only sees their own
    let uri = format!("/api/stock-movements?userId={}", app.admin.user.id);
    let (status, body) = app.send(Method::GET, &uri, None, Some(app.user_token())).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["stockMovements"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["userId"], app.user.user.id);

    let (_, body) = app
        .send(Method::GET, "/api/stock-movements", None, Some(app.manager_token()))
        .await;
    assert_eq!(body["stats"]["totalMovements"], 3);
    assert_eq!(body["stats"]["inboundMovements"], 1);
    assert_eq!(body["stats"]["outboundMovements"], 2);
    assert_eq!(body["sorting"]["sortBy"], "createdAt");
    assert_eq!(body["sorting"]["sortOrder"], "desc");

    let (_, body) = app
        .send(
            Method::GET,
            "/api/stock-movements?type=PURCHASE",
            None,
            Some(app.manager_token()),
        )
        .await;
    assert_eq!(body["stockMovements"].as_array().unwrap().len(), 1);
    assert_eq!(body["stockMovements"][0]["type"], "PURCHASE");

    let (_, body) = app
        .send(
            Method::GET,
            "/api/stock-movements?sortBy=quantity&sortOrder=asc",
            None,
            Some(app.manager_token()),
        )
        .await;
    assert_eq!(body["stockMovements"][0]["quantity"], -2);
}

#[tokio::test]
async fn list_filters_by_date_range() {
    let Fixture { app, product, .. } = fixture().await;
    record(
        &app,
        app.user_token(),
        json!({ "productId": product, "type": "ADJUSTMENT", "quantity": 1 }),
    )
    .await;

    let (status, body) = app
        .send(
            Method::GET,
            "/api/stock-movements?startDate=2000-01-01&endDate=2999-12-31T00:00:00Z",
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stats"]["totalMovements"], 1);

    let (_, body) = app
        .send(
            Method::GET,
            "/api/stock-movements?endDate=2000-01-01",
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(body["stats"]["totalMovements"], 0);
}

#[tokio::test]
async fn list_rejects_malformed_filters() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(
            Method::GET,
            "/api/stock-movements?startDate=yesterday",
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid startDate");

    let (status, body) = app
        .send(
            Method::GET,
            "/api/stock-movements?type=LOST",
            None,
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid movement type");

    let (status, _) = app
        .send(Method::GET, "/api/stock-movements", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
