//! Web Mercator conversions and DEM tile addressing

use crate::LatLng;
use geo::Point;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Web Mercator bounds in meters (EPSG:3857)
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;
pub const EARTH_MERCATOR_MIN: f64 = -20037508.34;
pub const EARTH_SIZE_METERS: f64 = EARTH_MERCATOR_MAX - EARTH_MERCATOR_MIN;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Precomputed constant: EARTH_MERCATOR_MAX / 180.0
const LON_TO_X_FACTOR: f64 = EARTH_MERCATOR_MAX / 180.0;

/// Precomputed constant: EARTH_MERCATOR_MAX / PI
const Y_FACTOR: f64 = EARTH_MERCATOR_MAX / std::f64::consts::PI;

/// Precomputed constant: 180.0 / EARTH_MERCATOR_MAX
const X_TO_LON_FACTOR: f64 = 180.0 / EARTH_MERCATOR_MAX;

/// Precomputed constant: PI / EARTH_MERCATOR_MAX
const Y_TO_LAT_FACTOR: f64 = std::f64::consts::PI / EARTH_MERCATOR_MAX;

/// Convert WGS84 (lat, lon) to Web Mercator (x, y) in meters
///
/// Latitudes beyond [`MAX_LATITUDE`] are clamped.
#[inline(always)]
pub fn wgs84_to_mercator(lat: f64, lon: f64) -> Point<f64> {
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = lon * LON_TO_X_FACTOR;
    let y = (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() * Y_FACTOR;
    Point::new(x, y)
}

/// Convert Web Mercator (x, y) in meters to WGS84 (lat, lon) in degrees
#[inline(always)]
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = x * X_TO_LON_FACTOR;
    let lat =
        (std::f64::consts::PI / 2.0 - 2.0 * ((-y * Y_TO_LAT_FACTOR).exp()).atan()).to_degrees();
    (lat, lon)
}

/// Address of a slippy-map tile (XYZ scheme, y grows southward)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileKey {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    /// Tile containing `position` at zoom `z`
    pub fn containing(position: LatLng, z: u8) -> Self {
        let tiles = 1u64 << z;
        let point = wgs84_to_mercator(position.lat, position.lng);
        let max = tiles - 1;

        let fx = (point.x() - EARTH_MERCATOR_MIN) / EARTH_SIZE_METERS * tiles as f64;
        let fy = (EARTH_MERCATOR_MAX - point.y()) / EARTH_SIZE_METERS * tiles as f64;
        let x = (fx.floor().max(0.0) as u64).min(max);
        let y = (fy.floor().max(0.0) as u64).min(max);

        Self {
            z,
            x: x as u32,
            y: y as u32,
        }
    }

    /// North-west corner of the tile
    pub fn north_west(&self) -> LatLng {
        let size = EARTH_SIZE_METERS / (1u64 << self.z) as f64;
        let x = EARTH_MERCATOR_MIN + self.x as f64 * size;
        let y = EARTH_MERCATOR_MAX - self.y as f64 * size;
        let (lat, lng) = mercator_to_wgs84(x, y);
        LatLng::new(lat, lng)
    }
}
