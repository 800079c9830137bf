use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use citybikes_engine::{EncodingError, TileInfo};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;

pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

const TILE_SUFFIXES: [&str; 2] = [".pbf", ".mvt"];

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

fn encoding_error_to_response(error: EncodingError) -> Response {
    tracing::error!(error = %error, "Tile encoding failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
}

/// Parse `z`, `x` and `y` path segments. `y` may carry a tile file extension.
fn parse_coordinates(z: &str, x: &str, y: &str) -> Option<(u32, u32, u32)> {
    let y = TILE_SUFFIXES
        .iter()
        .find_map(|suffix| y.strip_suffix(suffix))
        .unwrap_or(y);
    Some((z.parse().ok()?, x.parse().ok()?, y.parse().ok()?))
}

/// Serve one gzip-compressed vector tile
pub async fn get_tile(
    State(app_state): State<AppState>,
    Path((z, x, y)): Path<(String, String, String)>,
) -> Response {
    let Some((z, x, y)) = parse_coordinates(&z, &x, &y) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Invalid tile coordinates {}/{}/{}", z, x, y),
        );
    };

    match app_state.source.get_tile(z, x, y) {
        Ok(payload) => {
            let [(encoding_name, encoding)] = payload.headers();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, PROTOBUF_CONTENT_TYPE),
                    (header::HeaderName::from_static(encoding_name), encoding),
                ],
                payload.into_bytes(),
            )
                .into_response()
        }
        Err(error) => encoding_error_to_response(error),
    }
}

/// Source metadata
pub async fn get_info(State(app_state): State<AppState>) -> Json<TileInfo> {
    tracing::debug!("Getting source info");
    Json(app_state.source.get_info())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coordinates() {
        assert_eq!(parse_coordinates("3", "4", "2"), Some((3, 4, 2)));
        assert_eq!(parse_coordinates("3", "4", "2.pbf"), Some((3, 4, 2)));
        assert_eq!(parse_coordinates("3", "4", "2.mvt"), Some((3, 4, 2)));
    }

    #[test]
    fn test_parse_coordinates_rejects_garbage() {
        assert_eq!(parse_coordinates("a", "4", "2"), None);
        assert_eq!(parse_coordinates("3", "-1", "2"), None);
        assert_eq!(parse_coordinates("3", "4", "2.png"), None);
        assert_eq!(parse_coordinates("3", "4", ".pbf"), None);
    }

    #[test]
    fn test_encoding_error_maps_to_500() {
        let error = EncodingError::Compression(std::io::Error::other("disk on fire"));
        let response = encoding_error_to_response(error);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
