use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a bike-rental station as reported upstream.
///
/// OTP deployments report either a string or an integer; the original
/// representation is kept so that it survives packing unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StationId {
    Integer(i64),
    Text(String),
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationId::Integer(id) => write!(f, "{id}"),
            StationId::Text(id) => f.write_str(id),
        }
    }
}

impl From<&str> for StationId {
    fn from(id: &str) -> Self {
        StationId::Text(id.to_string())
    }
}

impl From<i64> for StationId {
    fn from(id: i64) -> Self {
        StationId::Integer(id)
    }
}

/// A station as returned by the `bikeRentalStations` query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationRecord {
    pub station_id: StationId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub networks: Option<Vec<String>>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub lat: Option<f64>,
}

impl StationRecord {
    pub fn new(
        station_id: impl Into<StationId>,
        name: &str,
        networks: &[&str],
        lon: f64,
        lat: f64,
    ) -> Self {
        StationRecord {
            station_id: station_id.into(),
            name: Some(name.to_string()),
            networks: Some(networks.iter().map(|n| n.to_string()).collect()),
            lon: Some(lon),
            lat: Some(lat),
        }
    }
}

/// WGS84 position, longitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    pub id: StationId,
    pub name: String,
    /// Station networks joined with `,`.
    pub networks: String,
}

/// Point feature derived from exactly one [`StationRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub geometry: LonLat,
    pub properties: FeatureProperties,
}

/// Ordered features produced by one refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        FeatureCollection { features }
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        FeatureCollection {
            features: iter.into_iter().collect(),
        }
    }
}
