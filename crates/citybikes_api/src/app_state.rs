use std::sync::Arc;

use citybikes_engine::CityBikesSource;

/// Shared handler state. The source is read concurrently without a lock.
#[derive(Debug, Clone)]
pub struct AppState {
    pub source: Arc<CityBikesSource>,
}

impl AppState {
    pub fn new(source: CityBikesSource) -> Self {
        Self {
            source: Arc::new(source),
        }
    }
}
