// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::{
    config::Config,
    services::progress::{ProgressAggregator, ProgressStore},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub progress: ProgressAggregator,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config, store: Arc<dyn ProgressStore>) -> Self {
        Self {
            pool,
            config,
            progress: ProgressAggregator::new(store),
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for ProgressAggregator {
    fn from_ref(state: &AppState) -> Self {
        state.progress.clone()
    }
}
