// src/main.rs
mod api;
mod config;
mod db;
mod error;
mod models;

use crate::config::Config;
use crate::db::PgStockStore;
use env_logger::Builder;
use log::{error, info, warn, LevelFilter};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Before the logger so RUST_LOG can come from the file too.
    let dotenv = config::load_dotenv();

    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    match dotenv {
        Ok(Some(path)) => info!("Loaded environment from {}", path.display()),
        Ok(None) => {}
        Err(e) => warn!("Failed to load .env file: {}", e),
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    let pool = match db::init(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return;
        }
    };
    let store = Arc::new(PgStockStore::new(pool));

    let api = api::routes(store.clone());

    let (addr, server) =
        match warp::serve(api).try_bind_with_graceful_shutdown(config.listen_addr(), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        }) {
            Ok(bound) => bound,
            Err(e) => {
                error!("Failed to bind {}: {}", config.listen_addr(), e);
                store.close().await;
                return;
            }
        };

    info!("Starting server on http://{}", addr);
    server.await;

    info!("Shutting down, closing database pool.");
    store.close().await;
}
