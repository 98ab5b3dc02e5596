use std::sync::Arc;

use crate::config::Config;
use crate::oracle::ScoringOracle;
use crate::store::DocumentStore;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub oracle: Arc<dyn ScoringOracle>,
    pub config: Config,
}

impl FromRef<AppState> for Arc<dyn DocumentStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Arc<dyn ScoringOracle> {
    fn from_ref(state: &AppState) -> Self {
        state.oracle.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
