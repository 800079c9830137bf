use thiserror::Error;

/// Failure of a single upstream fetch attempt.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Connection, timeout or body transfer failure.
    #[error("Request failed: {0}")]
    Request(String),
    #[error("Upstream answered HTTP {status}")]
    Status { status: u16 },
    /// The body is not the expected `bikeRentalStations` payload.
    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),
}

/// Failure to turn tile features into served bytes.
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Failed to encode vector tile: {0}")]
    Tile(#[from] mvt::Error),
    #[error("Failed to compress tile: {0}")]
    Compression(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConstructionError {
    #[error("Invalid endpoint '{uri}': {reason}")]
    InvalidEndpoint { uri: String, reason: String },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("A tokio runtime is required to start the refresh scheduler")]
    NoRuntime,
}

/// Terminal outcome of a bounded retry run.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Gave up after {attempts} attempts: {last_error}")]
pub struct RetryError<E> {
    pub attempts: u32,
    pub last_error: E,
}
