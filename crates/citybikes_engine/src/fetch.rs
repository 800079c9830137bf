//! Upstream station fetching.
//!
//! [`StationFetcher`] abstracts the upstream so the scheduler can be driven by
//! an in-memory source in tests. [`GraphQlFetcher`] is the production client:
//! it POSTs the `bikerentals` query to an OpenTripPlanner GraphQL endpoint.

use std::future::Future;
use std::time::Duration;

use citybikes_core::StationRecord;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::{ConstructionError, FetchError};

/// URI scheme under which a host registers this source.
pub const PROTOCOL: &str = "otpcitybikes:";

pub const BIKE_RENTALS_QUERY: &str = r#"
  query bikerentals {
    bikeRentalStations {
      stationId
      name
      networks
      lon
      lat
    }
  }"#;

const GRAPHQL_CONTENT_TYPE: &str = "application/graphql";

pub trait StationFetcher: Send + Sync + 'static {
    /// Perform one fetch attempt. Retrying is left to the caller.
    fn fetch_stations(&self) -> impl Future<Output = Result<Vec<StationRecord>, FetchError>> + Send;

    /// Short description of the upstream for logs, e.g. `host/path`.
    fn upstream(&self) -> String;
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<BikeRentalData>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BikeRentalData {
    bike_rental_stations: Vec<StationRecord>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

/// Parse a `{ data: { bikeRentalStations: [...] } }` response body.
pub fn parse_response(body: &[u8]) -> Result<Vec<StationRecord>, FetchError> {
    let response: GraphQlResponse = serde_json::from_slice(body)
        .map_err(|e| FetchError::MalformedResponse(e.to_string()))?;

    match (response.data, response.errors) {
        (Some(data), _) => Ok(data.bike_rental_stations),
        (None, Some(errors)) if !errors.is_empty() => {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            Err(FetchError::MalformedResponse(format!(
                "upstream reported errors: {}",
                messages.join("; ")
            )))
        }
        (None, _) => Err(FetchError::MalformedResponse(
            "response has no data".to_string(),
        )),
    }
}

/// Rewrite an endpoint URI to plaintext HTTP, whatever its original scheme.
pub fn plaintext_endpoint(uri: &str) -> Result<Url, ConstructionError> {
    let invalid = |reason: String| ConstructionError::InvalidEndpoint {
        uri: uri.to_string(),
        reason,
    };

    let parsed = Url::parse(uri).map_err(|e| invalid(e.to_string()))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }

    // Everything after the scheme name, starting at "://"
    let rest = &parsed.as_str()[parsed.scheme().len()..];
    Url::parse(&format!("http{rest}")).map_err(|e| invalid(e.to_string()))
}

/// OpenTripPlanner GraphQL client.
#[derive(Debug, Clone)]
pub struct GraphQlFetcher {
    http: reqwest::Client,
    endpoint: Url,
}

impl GraphQlFetcher {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, ConstructionError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConstructionError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// `host` followed by `path` of an upstream URL.
fn host_and_path(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or_default(), url.path())
}

impl StationFetcher for GraphQlFetcher {
    async fn fetch_stations(&self) -> Result<Vec<StationRecord>, FetchError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, GRAPHQL_CONTENT_TYPE)
            .body(BIKE_RENTALS_QUERY)
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(
                    url = %self.endpoint,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "Station request failed"
                );
                FetchError::Request(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Request(format!("Failed to read response: {e}")))?;

        let stations = parse_response(&body)?;
        tracing::debug!(
            url = %self.endpoint,
            stations = stations.len(),
            "Station list fetched"
        );
        Ok(stations)
    }

    fn upstream(&self) -> String {
        host_and_path(&self.endpoint)
    }
}
