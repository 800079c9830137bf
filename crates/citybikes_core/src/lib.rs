//! Station data model, GeoJSON-style feature encoding and the spatial tile index.

mod encoder;
mod models;
mod tile_index;

pub use crate::encoder::{NETWORK_SEPARATOR, encode, encode_record};
pub use crate::models::*;
pub use crate::tile_index::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MalformedRecordError {
    #[error("Station {station_id} has no {axis} coordinate")]
    MissingCoordinate {
        station_id: StationId,
        axis: &'static str,
    },
    #[error("Station {station_id} has a non-finite {axis} coordinate ({value})")]
    NonFiniteCoordinate {
        station_id: StationId,
        axis: &'static str,
        value: f64,
    },
}
