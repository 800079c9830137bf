use std::time::Duration;

use citybikes_core::{
    DEFAULT_BUFFER, DEFAULT_EXTENT, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM, MAX_SUPPORTED_ZOOM,
    TileIndexOptions,
};
use serde::{Deserialize, Serialize};

use crate::pack::STATIONS_LAYER;
use crate::{ConstructionError, RetryPolicy};

pub const DEFAULT_SOURCE_NAME: &str = "OTP Citybikes";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_MAX_JITTER_MS: u64 = 4000;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 120;
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 30;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Tunables of a citybikes tile source. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceConfig {
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Tile margin in tile-local units.
    pub buffer: u32,
    pub extent: u32,
    pub layer_name: String,
    /// Human-readable name reported by `get_info`.
    pub name: String,
    pub refresh_interval_secs: u64,
    /// Upper bound (exclusive) of the random delay before each scheduled fetch.
    pub max_jitter_ms: u64,
    pub retry_attempts: u32,
    pub retry_delay_secs: u64,
    /// Per-attempt HTTP timeout.
    pub request_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            buffer: DEFAULT_BUFFER,
            extent: DEFAULT_EXTENT,
            layer_name: STATIONS_LAYER.to_string(),
            name: DEFAULT_SOURCE_NAME.to_string(),
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            max_jitter_ms: DEFAULT_MAX_JITTER_MS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl SourceConfig {
    pub fn validate(&self) -> Result<(), ConstructionError> {
        let invalid = |message: String| Err(ConstructionError::InvalidConfig(message));

        if self.max_zoom == 0 || self.max_zoom > MAX_SUPPORTED_ZOOM {
            return invalid(format!(
                "maxZoom must be between 1 and {MAX_SUPPORTED_ZOOM}, got {}",
                self.max_zoom
            ));
        }
        if self.min_zoom > self.max_zoom {
            return invalid(format!(
                "minZoom ({}) is greater than maxZoom ({})",
                self.min_zoom, self.max_zoom
            ));
        }
        if self.extent == 0 {
            return invalid("extent must be positive".to_string());
        }
        if self.layer_name.is_empty() {
            return invalid("layerName must not be empty".to_string());
        }
        if self.refresh_interval_secs == 0 {
            return invalid("refreshIntervalSecs must be positive".to_string());
        }
        if self.retry_attempts == 0 {
            return invalid("retryAttempts must be positive".to_string());
        }
        Ok(())
    }

    pub fn index_options(&self) -> TileIndexOptions {
        TileIndexOptions {
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
            buffer: self.buffer,
            extent: self.extent,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(
            self.retry_attempts,
            Duration::from_secs(self.retry_delay_secs),
        )
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn max_jitter(&self) -> Duration {
        Duration::from_millis(self.max_jitter_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
