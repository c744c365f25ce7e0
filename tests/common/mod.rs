#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use medstore::{config::AuthConfig, create_router, repository::MemoryRepository, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-secret";
pub const FUTURE_DATE: &str = "2099-12-31";

pub fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-secret".to_string(),
        token_ttl_hours: 1,
        bcrypt_cost: 4,
        admin_username: ADMIN_USERNAME.to_string(),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
    }
}

/// The full router over an in-memory repository.
pub struct TestApp {
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_auth(auth_config())
    }

    pub fn with_auth(auth: AuthConfig) -> Self {
        let state = AppState::new(Arc::new(MemoryRepository::new()), auth);
        Self {
            router: create_router(state),
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        (status, body)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    pub async fn admin_token(&self) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": ADMIN_USERNAME, "pwd": ADMIN_PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    pub async fn login(&self, email: &str, pwd: &str) -> String {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "email": email, "pwd": pwd })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }

    /// Returns the new store's id.
    pub async fn create_store(&self, token: &str, name: &str) -> String {
        let (status, body) = self.post("/api/stores", token, json!({ "name": name })).await;
        assert_eq!(status, StatusCode::CREATED, "store creation failed: {}", body);
        body["_id"].as_str().unwrap().to_string()
    }

    /// Returns the new medicine's id.
    pub async fn create_medicine(&self, token: &str, store_id: &str, name: &str, stock: i32) -> String {
        let (status, body) = self
            .post(
                "/api/medicines",
                token,
                json!({
                    "name": name,
                    "storeId": store_id,
                    "expirydate": FUTURE_DATE,
                    "stock": stock,
                    "batchNumber": "B-001",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "medicine creation failed: {}", body);
        body["_id"].as_str().unwrap().to_string()
    }

    /// Returns the new prescription's id.
    pub async fn create_billing(
        &self,
        token: &str,
        medicine_id: &str,
        store_id: &str,
        patient: &str,
    ) -> String {
        let (status, body) = self
            .post(
                "/api/billings",
                token,
                json!({
                    "medicineId": medicine_id,
                    "storeId": store_id,
                    "frequency": "morning",
                    "name": patient,
                    "number": "555-0100",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "billing creation failed: {}", body);
        body["_id"].as_str().unwrap().to_string()
    }

    /// Creates a store user and logs in as them.
    pub async fn store_user_token(&self, admin: &str, email: &str, store_id: &str) -> String {
        let (status, body) = self
            .post(
                "/api/users",
                admin,
                json!({ "email": email, "pwd": "clerk-pass", "type": "user", "storeId": store_id }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "user creation failed: {}", body);
        self.login(email, "clerk-pass").await
    }
}
