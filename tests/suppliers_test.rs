mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::{json, Value};

async fn create_supplier(app: &TestApp, body: Value) -> i64 {
    let (status, created) = app
        .send(Method::POST, "/api/suppliers", Some(body), None)
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    created["id"].as_i64().unwrap()
}

#[tokio::test]
async fn create_trims_fields_and_rejects_duplicates() {
    let app = TestApp::new().await;

    let (status, created) = app
        .send(
            Method::POST,
            "/api/suppliers",
            Some(json!({
                "name": "  Acme Corp  ",
                "contactPerson": "Jo Doe",
                "email": "sales@acme.test",
                "phone": "  ",
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Acme Corp");
    assert_eq!(created["contactPerson"], "Jo Doe");
    assert!(created["phone"].is_null());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/suppliers",
            Some(json!({ "name": "Acme Corp" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Supplier with this name already exists");
}

#[tokio::test]
async fn create_validates_name_and_email() {
    let app = TestApp::new().await;

    let (status, body) = app
        .send(Method::POST, "/api/suppliers", Some(json!({ "name": " " })), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required field: name");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/suppliers",
            Some(json!({ "name": "Bad Mail", "email": "nope@" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid email format");
}

#[tokio::test]
async fn list_searches_contact_fields_and_sorts_by_name() {
    let app = TestApp::new().await;
    create_supplier(&app, json!({ "name": "Zeta Supply", "contactPerson": "Ann" })).await;
    create_supplier(&app, json!({ "name": "Alpha Parts", "email": "hello@alpha.test" })).await;
    create_supplier(&app, json!({ "name": "Mid Wholesale", "phone": "555-0199" })).await;

    let (status, body) = app.send(Method::GET, "/api/suppliers", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<_> = body["suppliers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Alpha Parts", "Mid Wholesale", "Zeta Supply"]);
    assert_eq!(body["sorting"]["sortBy"], "name");
    assert_eq!(body["sorting"]["sortOrder"], "asc");
    assert_eq!(body["pagination"]["limit"], 20);

    let (_, body) = app
        .send(Method::GET, "/api/suppliers?search=ALPHA.TEST", None, None)
        .await;
    assert_eq!(body["suppliers"].as_array().unwrap().len(), 1);
    assert_eq!(body["suppliers"][0]["name"], "Alpha Parts");

    let (_, body) = app
        .send(Method::GET, "/api/suppliers?search=0199", None, None)
        .await;
    assert_eq!(body["suppliers"][0]["name"], "Mid Wholesale");

    let (_, body) = app
        .send(Method::GET, "/api/suppliers?search=ann", None, None)
        .await;
    assert_eq!(body["suppliers"][0]["name"], "Zeta Supply");
}

#[tokio::test]
async fn detail_lists_products_by_name() {
    let app = TestApp::new().await;
    let id = create_supplier(&app, json!({ "name": "Parts Inc" })).await;
    app.create_product(json!({ "name": "Nut", "sku": "P-NUT", "sellingPrice": 1, "supplierId": id }))
        .await;
    app.create_product(json!({ "name": "Bolt", "sku": "P-BOLT", "sellingPrice": 1, "supplierId": id }))
        .await;

    let (status, body) = app
        .send(Method::GET, &format!("/api/suppliers/{}", id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_count"]["products"], 2);
    assert_eq!(body["products"][0]["name"], "Bolt");
    assert_eq!(body["products"][1]["name"], "Nut");

    let (status, body) = app.send(Method::GET, "/api/suppliers/999", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Supplier not found");
}

#[tokio::test]
async fn update_is_partial() {
    let app = TestApp::new().await;
    let id = create_supplier(
        &app,
        json!({ "name": "Keep Me", "phone": "111", "address": "1 Road" }),
    )
    .await;
    let uri = format!("/api/suppliers/{}", id);

    let (status, body) = app
        .send(Method::PUT, &uri, Some(json!({ "phone": "222" })), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["name"], "Keep Me");
    assert_eq!(body["phone"], "222");
    assert_eq!(body["address"], "1 Road");

    let (status, body) = app
        .send(Method::PUT, &uri, Some(json!({ "name": "   " })), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Name cannot be empty");

    let (status, body) = app
        .send(Method::PUT, &uri, Some(json!({ "unknown": 1 })), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "At least one field (name, contactPerson, phone, email, address) must be provided"
    );

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/suppliers/999",
            Some(json!({ "phone": "1" })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_reports_dependent_products() {
    let app = TestApp::new().await;
    let id = create_supplier(&app, json!({ "name": "Busy Supplier" })).await;
    let product = app
        .create_product(json!({ "name": "Widget", "sku": "W-1", "sellingPrice": 3, "supplierId": id }))
        .await;
    let uri = format!("/api/suppliers/{}", id);

    let (status, body) = app.send(Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Cannot delete supplier with existing products");
    assert_eq!(body["details"], "This supplier has 1 associated products");
    assert_eq!(body["dependentCount"], 1);

    app.send(
        Method::DELETE,
        &format!("/api/products/{}", product),
        None,
        None,
    )
    .await;

    let (status, body) = app.send(Method::DELETE, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Supplier deleted successfully");
}
