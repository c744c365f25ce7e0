pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod utils;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, patch, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::AuthConfig;
use repository::Repository;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub auth: Arc<AuthConfig>,
}

impl AppState {
    pub fn new(repo: Arc<dyn Repository>, auth: AuthConfig) -> Self {
        Self {
            repo,
            auth: Arc::new(auth),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))

        // Auth
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/me", get(handlers::auth::me))

        // Stores
        .route(
            "/api/stores",
            get(handlers::stores::list_stores).post(handlers::stores::create_store),
        )
        .route(
            "/api/stores/:id",
            get(handlers::stores::get_store)
                .put(handlers::stores::update_store)
                .delete(handlers::stores::delete_store),
        )
        .route("/api/stores/:id/medicines", get(handlers::stores::store_medicines))

        // Medicines
        .route(
            "/api/medicines",
            get(handlers::medicines::list_medicines).post(handlers::medicines::create_medicine),
        )
        .route(
            "/api/medicines/store/:store_id",
            get(handlers::medicines::medicines_by_store),
        )
        .route(
            "/api/medicines/:id",
            get(handlers::medicines::get_medicine)
                .put(handlers::medicines::update_medicine)
                .delete(handlers::medicines::delete_medicine),
        )
        .route("/api/medicines/:id/stock", patch(handlers::medicines::update_stock))

        // Billings (prescriptions)
        .route(
            "/api/billings",
            get(handlers::billings::list_billings).post(handlers::billings::create_billing),
        )
        .route(
            "/api/billings/store/:store_id",
            get(handlers::billings::billings_by_store),
        )
        .route(
            "/api/billings/medicine/:medicine_id",
            get(handlers::billings::billings_by_medicine),
        )
        .route(
            "/api/billings/patient/:name",
            get(handlers::billings::billings_by_patient),
        )
        .route(
            "/api/billings/:id",
            get(handlers::billings::get_billing)
                .put(handlers::billings::update_billing)
                .delete(handlers::billings::delete_billing),
        )

        // Users (admin only)
        .route(
            "/api/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/api/users/:id",
            put(handlers::users::update_user).delete(handlers::users::delete_user),
        )

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(1024 * 1024)), // 1MB
        )
        .with_state(state)
}
