pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod permissions;
pub mod services;
pub mod types;
pub mod validation;

use std::sync::Arc;

use axum::{http::HeaderValue, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{TokenError, TokenService};
use crate::config::{AppConfig, StoreBackendKind};
use crate::database::{DatabaseManager, MemoryStore, PgStore, Store};

/// Shared state handed to every handler and middleware
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Store,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Store) -> Result<Self, TokenError> {
        let tokens = TokenService::from_config(&config.security)?;
        Ok(Self {
            config: Arc::new(config),
            store,
            tokens: Arc::new(tokens),
        })
    }

    /// Connect the configured backend and build the state
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let store = match config.store.backend {
            StoreBackendKind::Postgres => {
                let db = DatabaseManager::connect(&config.store).await?;
                Store::new(Arc::new(PgStore::new(db)))
            }
            StoreBackendKind::Memory => {
                tracing::warn!("Using the in-memory store; data is lost on restart");
                Store::new(Arc::new(MemoryStore::new()))
            }
        };
        Ok(Self::new(config, store)?)
    }
}

/// The complete HTTP application
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    handlers::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handlers::panic_response))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.server.cors_origins.is_empty() && config.is_development() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
