mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn store_users_cannot_manage_inventory_or_users() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let store_id = app.create_store(&admin, "Central").await;
    let medicine_id = app.create_medicine(&admin, &store_id, "Paracetamol", 5).await;
    let clerk = app.store_user_token(&admin, "clerk@example.com", &store_id).await;

    let forbidden = [
        app.post("/api/stores", &clerk, json!({ "name": "Mine" })).await,
        app.delete(&format!("/api/stores/{}", store_id), &clerk).await,
        app.post(
            "/api/medicines",
            &clerk,
            json!({
                "name": "Aspirin",
                "storeId": store_id,
                "expirydate": common::FUTURE_DATE,
                "stock": 1,
                "batchNumber": "B-2",
            }),
        )
        .await,
        app.patch(&format!("/api/medicines/{}/stock", medicine_id), &clerk, json!({ "stock": 99 }))
            .await,
        app.get("/api/users", &clerk).await,
    ];

    for (status, body) in forbidden {
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Forbidden: Admins only");
    }
}

#[tokio::test]
async fn store_users_only_see_their_store() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let central = app.create_store(&admin, "Central").await;
    let westside = app.create_store(&admin, "Westside").await;
    let own = app.create_medicine(&admin, &central, "Paracetamol", 5).await;
    let foreign = app.create_medicine(&admin, &westside, "Aspirin", 5).await;
    let foreign_billing = app.create_billing(&admin, &foreign, &westside, "John Doe").await;
    let clerk = app.store_user_token(&admin, "clerk@example.com", &central).await;

    let (_, stores) = app.get("/api/stores", &clerk).await;
    let stores = stores.as_array().unwrap();
    assert_eq!(stores.len(), 1);
    assert_eq!(stores[0]["_id"], central.as_str());

    let (_, medicines) = app.get("/api/medicines", &clerk).await;
    let medicines = medicines.as_array().unwrap();
    assert_eq!(medicines.len(), 1);
    assert_eq!(medicines[0]["_id"], own.as_str());

    let (_, billings) = app.get("/api/billings", &clerk).await;
    assert!(billings.as_array().unwrap().is_empty());

    let (status, _) = app.get(&format!("/api/stores/{}", westside), &clerk).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/api/medicines/{}", foreign), &clerk).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/api/billings/{}", foreign_billing), &clerk).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/api/billings/store/{}", westside), &clerk).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&format!("/api/billings/{}", foreign_billing), &clerk).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn store_users_dispense_only_in_their_store() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let central = app.create_store(&admin, "Central").await;
    let westside = app.create_store(&admin, "Westside").await;
    let own = app.create_medicine(&admin, &central, "Paracetamol", 5).await;
    let foreign = app.create_medicine(&admin, &westside, "Aspirin", 5).await;
    let clerk = app.store_user_token(&admin, "clerk@example.com", &central).await;

    let (status, body) = app
        .post(
            "/api/billings",
            &clerk,
            json!({
                "medicineId": foreign,
                "storeId": westside,
                "frequency": "morning",
                "name": "John Doe",
                "number": "555-0100",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden: store access denied");

    let billing_id = app.create_billing(&clerk, &own, &central, "Jane Smith").await;
    let (status, billing) = app.get(&format!("/api/billings/{}", billing_id), &clerk).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(billing["storeId"]["_id"], central.as_str());
}

#[tokio::test]
async fn user_management() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let central = app.create_store(&admin, "Central").await;
    let westside = app.create_store(&admin, "Westside").await;

    let (status, user) = app
        .post(
            "/api/users",
            &admin,
            json!({ "email": "clerk@example.com", "pwd": "first", "type": "user", "storeId": central }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["type"], "user");
    assert!(user.get("pwd").is_none());
    assert!(user.get("passwordHash").is_none());
    let user_id = user["_id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/api/users",
            &admin,
            json!({ "email": "CLERK@example.com", "pwd": "x", "type": "user", "storeId": central }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "User already exists");

    let (status, body) = app
        .post(
            "/api/users",
            &admin,
            json!({ "email": "boss@example.com", "pwd": "x", "type": "owner", "storeId": central }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid user type");

    let (status, body) = app
        .post("/api/users", &admin, json!({ "email": "boss@example.com" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email, password, type and storeId are required");

    // Move the user to another store and change the password
    let (status, user) = app
        .put(
            &format!("/api/users/{}", user_id),
            &admin,
            json!({ "storeId": westside, "pwd": "second", "email": "" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["storeId"], westside.as_str());
    assert_eq!(user["email"], "clerk@example.com");

    let clerk = app.login("clerk@example.com", "second").await;
    let (_, stores) = app.get("/api/stores", &clerk).await;
    assert_eq!(stores[0]["_id"], westside.as_str());

    let (status, users) = app.get("/api/users", &admin).await;
    assert_eq!(status, StatusCode::OK);
    for user in users.as_array().unwrap() {
        assert!(user.get("pwd").is_none());
        assert!(user.get("passwordHash").is_none());
    }

    let (status, body) = app.delete(&format!("/api/users/{}", user_id), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User deleted successfully");

    let (status, body) = app.delete(&format!("/api/users/{}", user_id), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn deleting_a_store_unassigns_its_users() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let central = app.create_store(&admin, "Central").await;
    let clerk = app.store_user_token(&admin, "clerk@example.com", &central).await;

    let (status, _) = app.delete(&format!("/api/stores/{}", central), &admin).await;
    assert_eq!(status, StatusCode::OK);

    let (_, users) = app.get("/api/users", &admin).await;
    assert!(users[0]["storeId"].is_null());

    let (status, stores) = app.get("/api/stores", &clerk).await;
    assert_eq!(status, StatusCode::OK);
    assert!(stores.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn other_stores_medicines_look_missing_when_dispensing() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let central = app.create_store(&admin, "Central").await;
    let westside = app.create_store(&admin, "Westside").await;
    let own = app.create_medicine(&admin, &central, "Paracetamol", 5).await;
    let foreign = app.create_medicine(&admin, &westside, "Aspirin", 5).await;
    let clerk = app.store_user_token(&admin, "clerk@example.com", &central).await;
    let billing_id = app.create_billing(&clerk, &own, &central, "Jane Smith").await;
    let uri = format!("/api/billings/{}", billing_id);

    for medicine_id in [foreign.clone(), uuid::Uuid::new_v4().to_string()] {
        let (status, body) = app
            .post(
                "/api/billings",
                &clerk,
                json!({
                    "medicineId": medicine_id,
                    "storeId": central,
                    "frequency": "morning",
                    "name": "John Doe",
                    "number": "555-0100",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Medicine not found");

        let (status, body) = app.put(&uri, &clerk, json!({ "medicineId": medicine_id })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Medicine not found");
    }

    let (status, body) = app.get(&format!("/api/billings/medicine/{}", foreign), &clerk).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Medicine not found");

    // Admins still get the descriptive mismatch
    let (status, body) = app.put(&uri, &admin, json!({ "medicineId": foreign })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Medicine does not belong to the specified store");
}

#[tokio::test]
async fn store_users_update_only_their_prescriptions() {
    let app = TestApp::new();
    let admin = app.admin_token().await;
    let central = app.create_store(&admin, "Central").await;
    let westside = app.create_store(&admin, "Westside").await;
    let own = app.create_medicine(&admin, &central, "Paracetamol", 5).await;
    let foreign = app.create_medicine(&admin, &westside, "Aspirin", 5).await;
    let own_billing = app.create_billing(&admin, &own, &central, "Jane Smith").await;
    let foreign_billing = app.create_billing(&admin, &foreign, &westside, "John Doe").await;
    let clerk = app.store_user_token(&admin, "clerk@example.com", &central).await;

    let (status, billing) = app
        .put(&format!("/api/billings/{}", own_billing), &clerk, json!({ "frequency": "evening" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(billing["frequency"], "evening");

    let (status, body) = app
        .put(&format!("/api/billings/{}", own_billing), &clerk, json!({ "storeId": westside }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden: store access denied");

    let (status, body) = app
        .put(&format!("/api/billings/{}", foreign_billing), &clerk, json!({ "name": "Mallory" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Prescription not found");

    let (_, billing) = app.get(&format!("/api/billings/{}", foreign_billing), &admin).await;
    assert_eq!(billing["name"], "John Doe");
}
