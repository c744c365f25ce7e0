use std::{error::Error, sync::Arc};

use dotenvy::dotenv;
use env_logger::Env;
use envconfig::Envconfig;

use medstore::{
    config::Config,
    create_router,
    database::{create_database_pool, run_migrations},
    repository::{MemoryRepository, PgRepository, Repository},
    AppState,
};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    if let Err(err) = run().await {
        log::error!("Server error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let config = Config::init_from_env()?;

    let repo: Arc<dyn Repository> = match &config.database_url {
        Some(url) => {
            let db = create_database_pool(url, config.max_connections).await?;
            run_migrations(&db).await?;
            Arc::new(PgRepository::new(db))
        }
        None => {
            log::warn!("DATABASE_URL not set, data is kept in memory only");
            Arc::new(MemoryRepository::new())
        }
    };

    if config.admin_password.is_none() {
        log::info!("ADMIN_PASSWORD not set, built-in admin login is disabled");
    }

    let app = create_router(AppState::new(repo, config.auth()));

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("Medical store API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}
