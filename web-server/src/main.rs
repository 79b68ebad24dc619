// Web Server - main.rs
mod api;
mod client_registry;
mod error;
mod middleware;
mod state;
mod static_files;
mod utils;


use actix::Actor;
use actix_web::{web, App, HttpServer};
use common::{open_store, setup_tracing, Config};

use crate::client_registry::ClientRegistryActor;
use crate::error::ApiError;
use crate::middleware::rate_limiter::RateLimiter;
use crate::state::AppState;

/// Routes and shared data, minus middleware
pub fn configure_app(cfg: &mut web::ServiceConfig, state: AppState) {
    let static_config = state.config.static_files.clone();

    cfg.app_data(web::Data::new(state))
        .app_data(web::JsonConfig::default().error_handler(|err, _req| {
            ApiError::BadRequest(err.to_string()).into()
        }))
        .configure(api::configure)
        .configure(|cfg| static_files::configure(cfg, &static_config));
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration
    let config = Config::from_env();

    if let Err(e) = setup_tracing(&config.log_level) {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }

    let store = open_store(&config.storage)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

    let registry = ClientRegistryActor::new(store.clone())
        .with_ttl(config.session.ttl_seconds)
        .with_cleanup_interval(config.session.cleanup_interval_seconds)
        .start();

    // Save address before moving config into the state
    let server_addr = config.web_server_addr.clone();
    let limiter = RateLimiter::from_config(&config.rate_limit);
    let state = AppState::new(store, config, registry);

    tracing::info!("Starting ChainVanguard web server on {}", server_addr);

    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(limiter.clone())
            .configure(|cfg| configure_app(cfg, state))
    })
    .bind(&server_addr)?
    .run()
    .await
}
