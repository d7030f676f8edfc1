use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};

use crate::config::{Config, ConfigError};
use crate::estimation::WaitTimeEstimator;
use crate::store::cache::{CachedStore, QueryCache};
use crate::store::memory::MemoryStore;

pub mod handlers;
pub mod responses;

/// Shared wiring handed to every handler: the event store plus an
/// estimator reading it through the query cache.
pub struct ServiceState {
    store: Arc<MemoryStore>,
    estimator: WaitTimeEstimator<CachedStore<Arc<MemoryStore>>>,
}

impl ServiceState {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let slots = Arc::new(config.time_slot_index()?);
        let store = Arc::new(MemoryStore::new(config.pseudonym_salt(), Arc::clone(&slots)));
        let cache = QueryCache::new(config.cache_capacity(), config.cache_ttl());
        let repository = CachedStore::new(Arc::clone(&store), cache);
        let estimator = WaitTimeEstimator::new(
            repository,
            config.estimator_params(),
            slots,
            config.room_wait_table()?,
            config.default_wait_table()?,
        );
        Ok(Self { store, estimator })
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn estimator(&self) -> &WaitTimeEstimator<CachedStore<Arc<MemoryStore>>> {
        &self.estimator
    }
}

pub fn router(state: Arc<ServiceState>) -> Router {
    Router::new()
        .route("/api/health", get(handlers::get_health))
        .route("/api/events", post(handlers::post_event))
        .route("/api/estimate", post(handlers::post_estimate))
        .route("/api/estimates", get(handlers::get_all_estimates))
        .route(
            "/api/units",
            get(handlers::get_units).post(handlers::register_unit),
        )
        .with_state(state)
}
