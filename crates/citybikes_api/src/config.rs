use std::path::Path;

use citybikes_engine::SourceConfig;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 3000;

/// Server settings loaded from an optional JSON file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Upstream GraphQL endpoint, usually an `otpcitybikes:` URI
    pub endpoint: Option<String>,
    pub port: Option<u16>,
    pub source: SourceConfig,
}

impl ServerConfig {
    pub async fn load(path: &Path) -> Result<Self, String> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))
    }

    /// Apply command line overrides. Flags win over the file.
    pub fn merge(mut self, endpoint: Option<String>, port: Option<u16>) -> Self {
        if endpoint.is_some() {
            self.endpoint = endpoint;
        }
        if port.is_some() {
            self.port = port;
        }
        self
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}
