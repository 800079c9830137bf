use std::io::Write;

use citybikes_core::{StationId, TileFeature};
use flate2::Compression;
use flate2::write::GzEncoder;
use mvt::{GeomEncoder, GeomType, Tile};

use crate::EncodingError;

/// Layer name used for every tile served by this crate.
pub const STATIONS_LAYER: &str = "stations";

/// Serialize tile features into a single-layer vector tile.
///
/// An empty slice yields a valid tile holding one empty layer.
pub fn pack(
    features: &[TileFeature<'_>],
    layer_name: &str,
    extent: u32,
) -> Result<Vec<u8>, EncodingError> {
    let mut tile = Tile::new(extent);
    let mut layer = tile.create_layer(layer_name);

    for tile_feature in features {
        let geom = GeomEncoder::new(GeomType::Point)
            .point(f64::from(tile_feature.x), f64::from(tile_feature.y))?
            .encode()?;

        let properties = &tile_feature.feature.properties;
        let mut feature = layer.into_feature(geom);
        match &properties.id {
            StationId::Integer(id) => match u64::try_from(*id) {
                Ok(id) => feature.add_tag_uint("id", id),
                Err(_) => feature.add_tag_sint("id", *id),
            },
            StationId::Text(id) => feature.add_tag_string("id", id),
        }
        feature.add_tag_string("name", &properties.name);
        feature.add_tag_string("networks", &properties.networks);
        layer = feature.into_layer();
    }

    tile.add_layer(layer)?;
    Ok(tile.to_bytes()?)
}

/// Gzip a packed tile.
pub fn compress(bytes: &[u8]) -> Result<Vec<u8>, EncodingError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 2), Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}
