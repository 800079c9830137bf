use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use citybikes_core::StationRecord;
use flate2::read::GzDecoder;
use geo_types::Geometry;
use mvt_reader::Reader;
use mvt_reader::feature::{Feature, Value};

use crate::{FetchError, StationFetcher};

#[derive(Debug, Clone, Default)]
pub(crate) struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub(crate) fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Ungzip a served tile and return its layer names and first layer features.
pub(crate) fn decode_gzipped(data: &[u8]) -> (Vec<String>, Vec<Feature>) {
    let mut raw = Vec::new();
    GzDecoder::new(data).read_to_end(&mut raw).unwrap();
    let reader = Reader::new(raw).unwrap();
    let names = reader.get_layer_names().unwrap();
    let features = reader.get_features(0).unwrap();
    (names, features)
}

pub(crate) fn property(feature: &Feature, key: &str) -> Value {
    feature
        .properties
        .as_ref()
        .and_then(|properties| properties.get(key))
        .cloned()
        .unwrap_or_else(|| panic!("Missing property {key}"))
}

pub(crate) fn point_of(feature: &Feature) -> (f32, f32) {
    match feature.get_geometry() {
        Geometry::Point(point) => (point.x(), point.y()),
        other => panic!("Expected a point, got {other:?}"),
    }
}

/// In-memory upstream returning a fixed outcome.
pub(crate) struct ScriptedFetcher {
    outcome: Result<Vec<StationRecord>, FetchError>,
    fail_first: usize,
    delay: Duration,
    calls: Counter,
    in_flight: Counter,
    max_in_flight: Counter,
    started_at: Arc<std::sync::Mutex<Vec<tokio::time::Instant>>>,
}

impl ScriptedFetcher {
    fn with_outcome(outcome: Result<Vec<StationRecord>, FetchError>) -> Self {
        ScriptedFetcher {
            outcome,
            fail_first: 0,
            delay: Duration::ZERO,
            calls: Counter::default(),
            in_flight: Counter::default(),
            max_in_flight: Counter::default(),
            started_at: Arc::default(),
        }
    }

    pub(crate) fn succeeding(records: Vec<StationRecord>) -> Self {
        Self::with_outcome(Ok(records))
    }

    pub(crate) fn failing(error: FetchError) -> Self {
        Self::with_outcome(Err(error))
    }

    /// Fail the first `attempts` calls with a connection error.
    pub(crate) fn failing_first(mut self, attempts: usize) -> Self {
        self.fail_first = attempts;
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> Counter {
        self.calls.clone()
    }

    pub(crate) fn max_in_flight(&self) -> Counter {
        self.max_in_flight.clone()
    }

    /// Start instants of every call, in call order.
    pub(crate) fn started_at(&self) -> Arc<std::sync::Mutex<Vec<tokio::time::Instant>>> {
        Arc::clone(&self.started_at)
    }
}

impl StationFetcher for ScriptedFetcher {
    async fn fetch_stations(&self) -> Result<Vec<StationRecord>, FetchError> {
        self.started_at
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        let call = self.calls.0.fetch_add(1, Ordering::SeqCst) + 1;
        let in_flight = self.in_flight.0.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.0.fetch_max(in_flight, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.0.fetch_sub(1, Ordering::SeqCst);

        if call <= self.fail_first {
            return Err(FetchError::Request("connection refused".to_string()));
        }
        self.outcome.clone()
    }

    fn upstream(&self) -> String {
        "scripted".to_string()
    }
}
