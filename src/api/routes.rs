//! API Routes
//!
//! Configures the Axum router with all key-value service endpoints.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, health_handler, read_handler, stats_handler, upsert_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /api/data?key=K&val=V` - Create or overwrite a key
/// - `PUT /api/data?key=K&val=V` - Same as POST
/// - `GET /api/data?key=K` - Read a key (`X-Cache-Status: HIT|MISS`)
/// - `DELETE /api/data?key=K` - Delete a key
/// - `GET /stats` - Cache hit/miss statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS middleware
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            "/api/data",
            get(read_handler)
                .post(upsert_handler)
                .put(upsert_handler)
                .delete(delete_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
