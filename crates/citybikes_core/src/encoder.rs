use crate::{
    Feature, FeatureCollection, FeatureProperties, LonLat, MalformedRecordError, StationRecord,
};

/// Separator used to flatten the `networks` list. Embedded commas are not escaped.
pub const NETWORK_SEPARATOR: &str = ",";

/// Convert a single station into a point feature.
pub fn encode_record(record: &StationRecord) -> Result<Feature, MalformedRecordError> {
    let lon = coordinate(record, "lon", record.lon)?;
    let lat = coordinate(record, "lat", record.lat)?;

    Ok(Feature {
        geometry: LonLat { lon, lat },
        properties: FeatureProperties {
            id: record.station_id.clone(),
            name: record.name.clone().unwrap_or_default(),
            networks: record
                .networks
                .as_deref()
                .unwrap_or_default()
                .join(NETWORK_SEPARATOR),
        },
    })
}

/// Convert stations into a feature collection, preserving input order.
///
/// Records without usable coordinates are skipped with a warning; the rest
/// of the batch is still encoded.
pub fn encode(records: &[StationRecord]) -> FeatureCollection {
    records
        .iter()
        .filter_map(|record| match encode_record(record) {
            Ok(feature) => Some(feature),
            Err(error) => {
                tracing::warn!(
                    station_id = %record.station_id,
                    error = %error,
                    "Skipping malformed station record"
                );
                None
            }
        })
        .collect()
}

fn coordinate(
    record: &StationRecord,
    axis: &'static str,
    value: Option<f64>,
) -> Result<f64, MalformedRecordError> {
    match value {
        None => Err(MalformedRecordError::MissingCoordinate {
            station_id: record.station_id.clone(),
            axis,
        }),
        Some(value) if !value.is_finite() => Err(MalformedRecordError::NonFiniteCoordinate {
            station_id: record.station_id.clone(),
            axis,
            value,
        }),
        Some(value) => Ok(value),
    }
}
