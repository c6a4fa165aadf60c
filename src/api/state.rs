//! Application state for the operational endpoints

use std::sync::Arc;

use crate::domain::model::SemanticModel;
use crate::domain::storage::Storage;
use crate::infrastructure::pool::ConnectionPool;
use crate::infrastructure::runtime::LaneQueue;

/// Shared handles the health endpoints inspect
#[derive(Debug, Clone)]
pub struct AppState {
    pub models: Arc<dyn Storage<SemanticModel>>,
    pub pool: Arc<ConnectionPool>,
    pub queue: Arc<LaneQueue>,
}

impl AppState {
    pub fn new(
        models: Arc<dyn Storage<SemanticModel>>,
        pool: Arc<ConnectionPool>,
        queue: Arc<LaneQueue>,
    ) -> Self {
        Self {
            models,
            pool,
            queue,
        }
    }
}
