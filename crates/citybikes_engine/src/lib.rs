//! Citybikes tile engine.
//!
//! Periodically pulls bike-rental stations from an OpenTripPlanner GraphQL
//! endpoint, indexes them into a tile pyramid and serves gzip-compressed
//! Mapbox vector tiles through [`CityBikesSource`].

mod config;
mod error;
mod fetch;
mod live;
mod pack;
mod retry;
mod scheduler;
mod source;
#[cfg(test)]
mod test_support;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::fetch::{
    BIKE_RENTALS_QUERY, GraphQlFetcher, PROTOCOL, StationFetcher, parse_response,
    plaintext_endpoint,
};
pub use crate::live::LiveIndex;
pub use crate::pack::{STATIONS_LAYER, compress, pack};
pub use crate::retry::RetryPolicy;
pub use crate::scheduler::{CycleOutcome, RefreshScheduler, RefreshState};
pub use crate::source::*;
