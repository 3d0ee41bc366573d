//! Point types shared by the codec, the route model and the service boundaries

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

static NEXT_POINT_ID: AtomicU64 = AtomicU64::new(1);

/// Highest altitude a route point may carry, in meters
pub const MAX_ALTITUDE: f64 = 100_000.0;

/// Opaque identity of a route point
///
/// Ids come from a process-wide counter, so they are never reused and stay stable across every
/// edit that does not delete the point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointId(u64);

impl PointId {
    pub(crate) fn next() -> Self {
        Self(NEXT_POINT_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A bare coordinate in degrees, as exchanged with external services
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and within ±90° latitude and ±180° longitude
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat.abs() <= 90.0
            && self.lng.abs() <= 180.0
    }
}

impl From<LatLng> for geo::Point<f64> {
    fn from(value: LatLng) -> Self {
        geo::Point::new(value.lng, value.lat)
    }
}

/// A decoded polyline sample: position plus optional altitude in meters
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathPoint {
    pub lat: f64,
    pub lng: f64,
    pub alt: Option<f64>,
}

impl PathPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            alt: None,
        }
    }

    pub fn with_alt(lat: f64, lng: f64, alt: f64) -> Self {
        Self {
            lat,
            lng,
            alt: Some(alt),
        }
    }

    #[inline]
    pub fn lat_lng(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// One GPS sample owned by a [`crate::Route`]
///
/// Only the route mutates points; callers get shared references from queries and refer to
/// points across edits by [`PointId`].
#[derive(Clone, Debug)]
pub struct RoutePoint {
    pub(crate) id: PointId,
    pub(crate) lat: f64,
    pub(crate) lng: f64,
    pub(crate) alt: Option<f64>,
    pub(crate) smooth_alt: Option<f64>,
    pub(crate) excluded: bool,
    pub(crate) editable: bool,
    pub(crate) weight: u8,
    pub(crate) dem_cached: bool,
    pub(crate) alt_corrected: bool,
    pub(crate) alt_smoothed: bool,
    pub(crate) point_distance: f64,
    pub(crate) route_distance: f64,
    pub(crate) brm_distance: f64,
    pub(crate) pre_slope: f64,
    pub(crate) post_slope: f64,
}

impl RoutePoint {
    /// Create a fresh point with a new id and no derived data
    pub(crate) fn new(path_point: PathPoint, weight: u8) -> Self {
        Self {
            id: PointId::next(),
            lat: path_point.lat,
            lng: path_point.lng,
            alt: path_point.alt,
            smooth_alt: path_point.alt,
            excluded: false,
            editable: false,
            weight,
            dem_cached: false,
            alt_corrected: false,
            alt_smoothed: false,
            point_distance: 0.0,
            route_distance: 0.0,
            brm_distance: 0.0,
            pre_slope: 0.0,
            post_slope: 0.0,
        }
    }

    /// Whether this point lies on `other` once both are rounded to `decimals` places
    pub(crate) fn coincides_with(&self, other: &PathPoint, decimals: u32) -> bool {
        let scale = 10f64.powi(decimals as i32);
        (self.lat * scale).round() == (other.lat * scale).round()
            && (self.lng * scale).round() == (other.lng * scale).round()
    }

    #[inline]
    pub fn id(&self) -> PointId {
        self.id
    }

    #[inline]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[inline]
    pub fn lng(&self) -> f64 {
        self.lng
    }

    #[inline]
    pub fn lat_lng(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    /// Raw altitude in meters, `None` until resolved
    #[inline]
    pub fn alt(&self) -> Option<f64> {
        self.alt
    }

    /// Altitude after outlier correction
    #[inline]
    pub fn smooth_alt(&self) -> Option<f64> {
        self.smooth_alt
    }

    #[inline]
    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    #[inline]
    pub fn is_editable(&self) -> bool {
        self.editable
    }

    #[inline]
    pub fn weight(&self) -> u8 {
        self.weight
    }

    #[inline]
    pub fn is_dem_cached(&self) -> bool {
        self.dem_cached
    }

    #[inline]
    pub fn is_alt_corrected(&self) -> bool {
        self.alt_corrected
    }

    #[inline]
    pub fn is_alt_smoothed(&self) -> bool {
        self.alt_smoothed
    }

    /// Distance from the previous point in meters
    #[inline]
    pub fn point_distance(&self) -> f64 {
        self.point_distance
    }

    /// Cumulative distance from the route start, excluded sections included
    #[inline]
    pub fn route_distance(&self) -> f64 {
        self.route_distance
    }

    /// Cumulative course distance, excluded sections skipped
    #[inline]
    pub fn brm_distance(&self) -> f64 {
        self.brm_distance
    }

    #[inline]
    pub fn pre_slope(&self) -> f64 {
        self.pre_slope
    }

    #[inline]
    pub fn post_slope(&self) -> f64 {
        self.post_slope
    }

    pub fn to_path_point(&self) -> PathPoint {
        PathPoint {
            lat: self.lat,
            lng: self.lng,
            alt: self.alt,
        }
    }
}
