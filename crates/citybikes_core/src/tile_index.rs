use std::collections::HashMap;
use std::f64::consts::PI;

use crate::{Feature, FeatureCollection, LonLat};

pub const DEFAULT_MIN_ZOOM: u8 = 1;
pub const DEFAULT_MAX_ZOOM: u8 = 20;
pub const DEFAULT_BUFFER: u32 = 256;
pub const DEFAULT_EXTENT: u32 = 4096;
/// Deepest zoom for which tile coordinates still fit in `u32` arithmetic.
pub const MAX_SUPPORTED_ZOOM: u8 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileIndexOptions {
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Margin around each tile, in the same units as `extent`.
    pub buffer: u32,
    /// Tile-local coordinate resolution.
    pub extent: u32,
}

impl Default for TileIndexOptions {
    fn default() -> Self {
        TileIndexOptions {
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            buffer: DEFAULT_BUFFER,
            extent: DEFAULT_EXTENT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    const ROOT: TileKey = TileKey { z: 0, x: 0, y: 0 };

    fn children(self) -> [TileKey; 4] {
        let (z, x, y) = (self.z + 1, self.x * 2, self.y * 2);
        [
            TileKey { z, x, y },
            TileKey { z, x: x + 1, y },
            TileKey { z, x, y: y + 1 },
            TileKey { z, x: x + 1, y: y + 1 },
        ]
    }
}

/// A feature as it appears inside one tile, with tile-local coordinates.
///
/// Coordinates range over `[0, extent]` for features inside the tile proper
/// and may fall slightly outside that range for features kept by the buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileFeature<'a> {
    pub feature: &'a Feature,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MercatorPoint {
    x: f64,
    y: f64,
}

/// Immutable quadtree over a feature collection.
///
/// Every non-empty tile from zoom 0 down to `max_zoom` is materialised at
/// build time and stores the positions of its members in the collection.
#[derive(Debug)]
pub struct TileIndex {
    features: FeatureCollection,
    projected: Vec<MercatorPoint>,
    tiles: HashMap<TileKey, Vec<u32>>,
    options: TileIndexOptions,
}

impl TileIndex {
    /// Index `features`. Zoom levels above [`MAX_SUPPORTED_ZOOM`] are clamped.
    pub fn build(features: FeatureCollection, mut options: TileIndexOptions) -> Self {
        options.max_zoom = options.max_zoom.min(MAX_SUPPORTED_ZOOM);
        options.min_zoom = options.min_zoom.min(options.max_zoom);

        let projected: Vec<MercatorPoint> = features
            .iter()
            .map(|feature| {
                let (x, y) = project(feature.geometry);
                MercatorPoint { x, y }
            })
            .collect();

        let mut tiles = HashMap::new();
        let all: Vec<u32> = (0..projected.len() as u32).collect();
        if !all.is_empty() {
            split(&mut tiles, &projected, &options, TileKey::ROOT, &all);
        }

        tracing::debug!(
            features = projected.len(),
            tiles = tiles.len(),
            max_zoom = options.max_zoom,
            "Tile index built"
        );

        TileIndex {
            features,
            projected,
            tiles,
            options,
        }
    }

    /// Return the features intersecting tile `(z, x, y)`.
    ///
    /// Zoom levels outside `[min_zoom, max_zoom]`, coordinates outside the
    /// grid of that zoom and tiles without features all yield an empty list.
    pub fn lookup(&self, z: u32, x: u32, y: u32) -> Vec<TileFeature<'_>> {
        if z < u32::from(self.options.min_zoom) || z > u32::from(self.options.max_zoom) {
            return Vec::new();
        }
        let dim = 1u32 << z;
        if x >= dim || y >= dim {
            return Vec::new();
        }

        let key = TileKey { z: z as u8, x, y };
        let Some(members) = self.tiles.get(&key) else {
            return Vec::new();
        };

        let scale = f64::from(dim);
        let extent = f64::from(self.options.extent);
        members
            .iter()
            .map(|&idx| {
                let point = self.projected[idx as usize];
                TileFeature {
                    feature: &self.features.features()[idx as usize],
                    x: ((point.x * scale - f64::from(x)) * extent).round() as i32,
                    y: ((point.y * scale - f64::from(y)) * extent).round() as i32,
                }
            })
            .collect()
    }

    pub fn options(&self) -> &TileIndexOptions {
        &self.options
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}

fn split(
    tiles: &mut HashMap<TileKey, Vec<u32>>,
    projected: &[MercatorPoint],
    options: &TileIndexOptions,
    key: TileKey,
    candidates: &[u32],
) {
    let margin = f64::from(options.buffer) / f64::from(options.extent);
    let scale = f64::from(1u32 << key.z);
    let min_x = (f64::from(key.x) - margin) / scale;
    let max_x = (f64::from(key.x) + 1.0 + margin) / scale;
    let min_y = (f64::from(key.y) - margin) / scale;
    let max_y = (f64::from(key.y) + 1.0 + margin) / scale;

    let members: Vec<u32> = candidates
        .iter()
        .copied()
        .filter(|&idx| {
            let point = projected[idx as usize];
            point.x >= min_x && point.x <= max_x && point.y >= min_y && point.y <= max_y
        })
        .collect();
    if members.is_empty() {
        return;
    }

    if key.z < options.max_zoom {
        for child in key.children() {
            split(tiles, projected, options, child, &members);
        }
    }
    tiles.insert(key, members);
}

/// Project a position to normalised Web Mercator, both axes in `[0, 1]`.
pub fn project(position: LonLat) -> (f64, f64) {
    let x = position.lon / 360.0 + 0.5;
    let sin = position.lat.to_radians().sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0))
}
