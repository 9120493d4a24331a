pub mod handlers;
pub mod state;
pub mod validate;

use crate::config::Config;
use axum::{Router, http::Method, routing::get};
use state::AppState;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Build the Axum router with all routes and the permissive CORS layer.
///
/// Every response carries `Access-Control-Allow-Origin: *` so that
/// browser-based players are never blocked by same-origin policy. The CORS
/// layer answers OPTIONS preflight requests itself.
pub fn build_router(config: Config) -> crate::error::Result<Router> {
    let state = AppState::new(config)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(86400));

    Ok(Router::new()
        .route("/", get(handlers::index::serve_index))
        .route("/health", get(handlers::health::health_check))
        .route("/proxy", get(handlers::proxy::serve_proxy))
        .layer(cors)
        .with_state(state))
}

/// Start the Axum HTTP server
pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);

    let app = build_router(config)?;

    // Bind TCP listener
    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("🚀 Relay listening on http://{}", addr);

    // Start serving
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
