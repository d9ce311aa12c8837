//! API Handlers
//!
//! HTTP request handlers mapping each endpoint onto the cache coordinator.
//!
//! The coordinator blocks on shard locks and pooled connections, so every
//! call into it runs on tokio's blocking thread pool.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use crate::config::Config;
use crate::coordinator::{CacheCoordinator, DeleteOutcome, ReadOutcome};
use crate::error::{CacheError, Result};
use crate::models::{
    DataParams, DeleteResponse, GetResponse, HealthResponse, SetResponse, StatsResponse,
};

/// Response header carrying the read provenance tag.
pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache-status");

/// Application state shared across all handlers.
///
/// Holds the single coordinator for this process; nothing is global.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<CacheCoordinator>,
}

impl AppState {
    /// Creates a new AppState around the given coordinator.
    pub fn new(coordinator: CacheCoordinator) -> Self {
        Self {
            coordinator: Arc::new(coordinator),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Opens the backing store and fills the connection pool.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(CacheCoordinator::from_config(config)?))
    }

    /// Runs `call` against the coordinator on the blocking pool.
    async fn run<T, F>(&self, call: F) -> Result<T>
    where
        F: FnOnce(&CacheCoordinator) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let coordinator = Arc::clone(&self.coordinator);
        tokio::task::spawn_blocking(move || call(&coordinator))
            .await
            .map_err(|e| CacheError::Internal(format!("Request task failed: {}", e)))?
    }
}

/// Handler for POST and PUT /api/data?key=K&val=V
///
/// Creates or overwrites a key; both methods share this path.
pub async fn upsert_handler(
    State(state): State<AppState>,
    Query(params): Query<DataParams>,
) -> Result<Json<SetResponse>> {
    let (key, value) = params.into_upsert()?;

    let stored_key = key.clone();
    state
        .run(move |coordinator| coordinator.write(&stored_key, value))
        .await?;

    Ok(Json(SetResponse::new(key)))
}

/// Handler for GET /api/data?key=K
///
/// Returns the value with an `X-Cache-Status` header of HIT or MISS.
pub async fn read_handler(
    State(state): State<AppState>,
    Query(params): Query<DataParams>,
) -> Result<Response> {
    let key = params.into_key()?;

    let lookup = key.clone();
    let outcome = state
        .run(move |coordinator| coordinator.read(&lookup))
        .await?;

    let source = outcome.source();
    match outcome {
        ReadOutcome::Hit(value) | ReadOutcome::Miss(value) => Ok((
            [(CACHE_STATUS_HEADER, HeaderValue::from_static(source))],
            Json(GetResponse::new(key, value, source)),
        )
            .into_response()),
        ReadOutcome::NotFound => Err(CacheError::NotFound(key)),
    }
}

/// Handler for DELETE /api/data?key=K
pub async fn delete_handler(
    State(state): State<AppState>,
    Query(params): Query<DataParams>,
) -> Result<Json<DeleteResponse>> {
    let key = params.into_key()?;

    let target = key.clone();
    let outcome = state
        .run(move |coordinator| coordinator.delete(&target))
        .await?;

    match outcome {
        DeleteOutcome::Deleted => Ok(Json(DeleteResponse::new(key))),
        DeleteOutcome::NotFound => Err(CacheError::NotFound(key)),
    }
}

/// Handler for GET /stats
///
/// Returns cumulative hit/miss counters and pool occupancy.
///
/// Takes every shard lock and the pool lock, so it runs on the blocking pool too.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let response = state
        .run(|coordinator| {
            Ok(StatsResponse {
                cache: coordinator.stats(),
                pool_size: coordinator.pool().size(),
                idle_connections: coordinator.pool().idle_count(),
            })
        })
        .await?;

    Ok(Json(response))
}

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreOp};

    fn test_state() -> (AppState, MemoryStore) {
        let store = MemoryStore::new();
        let config = Config {
            cache_capacity: 100,
            pool_size: 2,
            ..Config::default()
        };
        let coordinator = CacheCoordinator::with_store(&config, Arc::new(store.clone())).unwrap();
        (AppState::new(coordinator), store)
    }

    fn query(key: &str, val: Option<&str>) -> Query<DataParams> {
        Query(DataParams {
            key: Some(key.to_string()),
            val: val.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_upsert_and_read_handler() {
        let (state, store) = test_state();

        let result = upsert_handler(State(state.clone()), query("test_key", Some("v"))).await;
        assert_eq!(result.unwrap().key, "test_key");
        assert_eq!(store.peek("test_key"), Some("v".to_string()));

        let response = read_handler(State(state), query("test_key", None))
            .await
            .unwrap();
        assert_eq!(response.headers()[&CACHE_STATUS_HEADER], "HIT");
    }

    #[tokio::test]
    async fn test_read_miss_header() {
        let (state, store) = test_state();
        store.seed("cold", "value");

        let response = read_handler(State(state), query("cold", None)).await.unwrap();
        assert_eq!(response.headers()[&CACHE_STATUS_HEADER], "MISS");
    }

    #[tokio::test]
    async fn test_read_nonexistent_key() {
        let (state, _) = test_state();

        let result = read_handler(State(state), query("nonexistent", None)).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_handler() {
        let (state, _) = test_state();
        upsert_handler(State(state.clone()), query("to_delete", Some("v")))
            .await
            .unwrap();

        let result = delete_handler(State(state.clone()), query("to_delete", None)).await;
        assert!(result.is_ok());

        let result = delete_handler(State(state), query("to_delete", None)).await;
        assert!(matches!(result, Err(CacheError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_upsert_store_failure() {
        let (state, store) = test_state();
        store.inject_failures(
            StoreOp::Write,
            1,
            crate::error::StoreError::Query("read-only".into()),
        );

        let result = upsert_handler(State(state), query("k", Some("v"))).await;
        assert!(matches!(result, Err(CacheError::Store(_))));
    }

    #[tokio::test]
    async fn test_upsert_invalid_request() {
        let (state, _) = test_state();

        let result = upsert_handler(State(state.clone()), query("", Some("v"))).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));

        let result = upsert_handler(State(state), query("k", None)).await;
        assert!(matches!(result, Err(CacheError::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_stats_handler() {
        let (state, _) = test_state();

        let response = stats_handler(State(state)).await.unwrap();
        assert_eq!(response.cache.hits, 0);
        assert_eq!(response.cache.misses, 0);
        assert_eq!(response.pool_size, 2);
        assert_eq!(response.idle_connections, 2);
    }

    #[tokio::test]
    async fn test_stats_handler_reports_checked_out_connections() {
        let (state, _) = test_state();

        let held = state.coordinator.pool().acquire();
        let response = stats_handler(State(state.clone())).await.unwrap();
        assert_eq!(response.pool_size, 2);
        assert_eq!(response.idle_connections, 1);
        drop(held);

        let response = stats_handler(State(state)).await.unwrap();
        assert_eq!(response.idle_connections, 2);
    }

    #[tokio::test]
    async fn test_health_handler() {
        let response = health_handler().await;
        assert_eq!(response.status, "healthy");
    }
}
