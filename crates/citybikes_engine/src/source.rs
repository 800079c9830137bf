use std::sync::Arc;

use citybikes_core::TileIndex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::fetch::{GraphQlFetcher, StationFetcher, plaintext_endpoint};
use crate::pack::{compress, pack};
use crate::scheduler::RefreshScheduler;
use crate::{ConstructionError, EncodingError, LiveIndex, SourceConfig};

pub const TILE_FORMAT: &str = "pbf";
pub const CONTENT_ENCODING: &str = "content-encoding";
pub const GZIP: &str = "gzip";

/// A gzip-compressed vector tile ready to be sent to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TilePayload {
    pub data: Vec<u8>,
}

impl TilePayload {
    pub fn headers(&self) -> [(&'static str, &'static str); 1] {
        [(CONTENT_ENCODING, GZIP)]
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorLayer {
    pub id: String,
    pub description: String,
}

/// Source metadata in the TileJSON-like shape hosts expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileInfo {
    pub format: String,
    pub vector_layers: Vec<VectorLayer>,
    pub minzoom: u8,
    pub maxzoom: u8,
    pub name: String,
}

/// Vector tile source serving bike-rental stations.
///
/// Construction starts a background refresh scheduler and returns at once;
/// until the first refresh succeeds every tile is empty. Dropping the source
/// stops the scheduler.
#[derive(Debug)]
pub struct CityBikesSource {
    config: SourceConfig,
    live: LiveIndex,
    scheduler: JoinHandle<()>,
}

impl CityBikesSource {
    /// Create a source for an OpenTripPlanner GraphQL endpoint with default settings.
    ///
    /// The endpoint may use any scheme (typically `otpcitybikes:`); requests
    /// are always sent over plaintext HTTP.
    pub fn construct(endpoint: &str) -> Result<Self, ConstructionError> {
        Self::with_config(endpoint, SourceConfig::default())
    }

    pub fn with_config(endpoint: &str, config: SourceConfig) -> Result<Self, ConstructionError> {
        config.validate()?;
        let endpoint = plaintext_endpoint(endpoint)?;
        let fetcher = GraphQlFetcher::new(endpoint, config.request_timeout())?;

        tracing::info!(upstream = %fetcher.upstream(), "Creating city bikes source");
        Self::with_fetcher(config, fetcher)
    }

    /// Create a source fed by an arbitrary [`StationFetcher`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_fetcher<F: StationFetcher>(
        config: SourceConfig,
        fetcher: F,
    ) -> Result<Self, ConstructionError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| ConstructionError::NoRuntime)?;

        let live = LiveIndex::new();
        let scheduler = RefreshScheduler::new(fetcher, live.clone(), &config).start(&runtime);

        Ok(Self {
            config,
            live,
            scheduler,
        })
    }

    /// Encode tile `(z, x, y)`.
    ///
    /// Never waits for a refresh: the tile is cut from whichever index is live
    /// when the call starts. Missing index, out-of-range coordinates and empty
    /// tiles all produce a valid empty tile.
    pub fn get_tile(&self, z: u32, x: u32, y: u32) -> Result<TilePayload, EncodingError> {
        let snapshot = self.live.load();
        let features = match snapshot.as_deref() {
            Some(index) => index.lookup(z, x, y),
            None => Vec::new(),
        };

        let raw = pack(&features, &self.config.layer_name, self.config.extent)?;
        let data = compress(&raw)?;
        tracing::trace!(z, x, y, features = features.len(), bytes = data.len(), "Tile encoded");
        Ok(TilePayload { data })
    }

    pub fn get_info(&self) -> TileInfo {
        TileInfo {
            format: TILE_FORMAT.to_string(),
            vector_layers: vec![VectorLayer {
                id: self.config.layer_name.clone(),
                description: String::new(),
            }],
            minzoom: self.config.min_zoom,
            maxzoom: self.config.max_zoom,
            name: self.config.name.clone(),
        }
    }

    /// Whether at least one refresh has succeeded.
    pub fn is_ready(&self) -> bool {
        self.live.is_ready()
    }

    /// Snapshot of the live index, if any.
    pub fn index(&self) -> Option<Arc<TileIndex>> {
        self.live.load()
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

impl Drop for CityBikesSource {
    fn drop(&mut self) {
        self.scheduler.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FetchError;
    use crate::test_support::{ScriptedFetcher, decode_gzipped, property};
    use citybikes_core::StationRecord;
    use mvt_reader::feature::Value;
    use std::time::Duration;

    fn assert_empty_tile(payload: &TilePayload) {
        assert_eq!(payload.headers(), [("content-encoding", "gzip")]);
        let (layers, features) = decode_gzipped(&payload.data);
        assert_eq!(layers, vec!["stations"]);
        assert!(features.is_empty());
    }

    async fn wait_ready(source: &CityBikesSource) {
        while !source.is_ready() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    fn stations() -> Vec<StationRecord> {
        vec![
            StationRecord::new("center", "Center", &["A", "B"], 0.0, 0.0),
            StationRecord::new("north-east", "North East", &["A"], 10.0, 10.0),
            StationRecord::new("south-west", "South West", &[], -10.0, -10.0),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_tile_before_first_refresh_is_empty() {
        let fetcher = ScriptedFetcher::succeeding(stations()).with_delay(Duration::from_secs(60));
        let source = CityBikesSource::with_fetcher(SourceConfig::default(), fetcher).unwrap();

        assert!(!source.is_ready());
        let payload = source.get_tile(1, 0, 0).unwrap();
        assert_empty_tile(&payload);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_tile_returns_station_properties() {
        let source = CityBikesSource::with_fetcher(
            SourceConfig::default(),
            ScriptedFetcher::succeeding(stations()),
        )
        .unwrap();
        wait_ready(&source).await;

        let (layers, features) = decode_gzipped(&source.get_tile(1, 1, 1).unwrap().data);
        assert_eq!(layers, vec!["stations"]);
        assert!(!features.is_empty());

        let center = features
            .iter()
            .find(|feature| property(feature, "id") == Value::String("center".into()))
            .expect("center station missing from tile");
        assert_eq!(property(center, "name"), Value::String("Center".into()));
        assert_eq!(property(center, "networks"), Value::String("A,B".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_tile_out_of_range_is_empty() {
        let source = CityBikesSource::with_fetcher(
            SourceConfig::default(),
            ScriptedFetcher::succeeding(stations()),
        )
        .unwrap();
        wait_ready(&source).await;

        for (z, x, y) in [(0, 0, 0), (21, 0, 0), (1, 2, 0), (1, 0, 2), (5, 0, 0)] {
            assert_empty_tile(&source.get_tile(z, x, y).unwrap());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_upstream_serves_empty_tiles() {
        let source = CityBikesSource::with_fetcher(
            SourceConfig::default(),
            ScriptedFetcher::succeeding(vec![]),
        )
        .unwrap();
        wait_ready(&source).await;

        assert_empty_tile(&source.get_tile(1, 1, 1).unwrap());
        let info = source.get_info();
        assert_eq!(info.minzoom, 1);
        assert_eq!(info.maxzoom, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_upstream_serves_empty_tiles() {
        let source = CityBikesSource::with_fetcher(
            SourceConfig::default(),
            ScriptedFetcher::failing(FetchError::Status { status: 500 }),
        )
        .unwrap();
        tokio::time::sleep(Duration::from_secs(120)).await;

        assert!(!source.is_ready());
        assert_empty_tile(&source.get_tile(1, 1, 1).unwrap());
    }

    #[tokio::test]
    async fn test_get_info() {
        let source = CityBikesSource::with_fetcher(
            SourceConfig::default(),
            ScriptedFetcher::succeeding(vec![]),
        )
        .unwrap();

        let info = source.get_info();
        assert_eq!(
            serde_json::to_value(&info).unwrap(),
            serde_json::json!({
                "format": "pbf",
                "vector_layers": [{ "id": "stations", "description": "" }],
                "minzoom": 1,
                "maxzoom": 20,
                "name": "OTP Citybikes"
            })
        );
    }

    #[tokio::test]
    async fn test_construct_returns_before_network_io() {
        // Nothing listens on port 9; the failure is only seen by the scheduler.
        let source = CityBikesSource::construct("otpcitybikes://127.0.0.1:9/graphql").unwrap();

        assert!(!source.is_ready());
        assert_empty_tile(&source.get_tile(3, 1, 1).unwrap());
    }

    #[tokio::test]
    async fn test_construct_rejects_invalid_input() {
        assert!(matches!(
            CityBikesSource::construct("no scheme here"),
            Err(ConstructionError::InvalidEndpoint { .. })
        ));

        let config = SourceConfig {
            max_zoom: 30,
            ..SourceConfig::default()
        };
        assert!(matches!(
            CityBikesSource::with_config("otpcitybikes://localhost/graphql", config),
            Err(ConstructionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_construct_outside_runtime() {
        let result = CityBikesSource::with_fetcher(
            SourceConfig::default(),
            ScriptedFetcher::succeeding(vec![]),
        );
        assert!(matches!(result, Err(ConstructionError::NoRuntime)));
    }
}
