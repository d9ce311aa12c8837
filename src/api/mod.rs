//! API Module
//!
//! HTTP handlers and routing for the key-value service.
//!
//! # Endpoints
//! - `POST|PUT /api/data?key=K&val=V` - Create or overwrite a key
//! - `GET /api/data?key=K` - Read a key through the cache
//! - `DELETE /api/data?key=K` - Delete a key
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
