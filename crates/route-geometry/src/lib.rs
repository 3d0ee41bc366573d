//! Route Geometry Library - Core Data Structures for Editing Event Routes
//!
//! This library owns the geometry of a single cycling event route while an organizer edits it:
//! the ordered GPS samples, their render priority, cumulative course distances, excluded and
//! editable sections, altitude smoothing and the elevation profile shown next to the map.
//!
//! # Architecture
//!
//! - **[`polyline`]**: Compact reversible string codec for (lat, lng, alt) sequences
//! - **[`geodesic`]**: Ellipsoidal (Hubeny) surface distance between two coordinates
//! - **[`simplify`]**: Douglas-Peucker reduction returning retained indices
//! - **[`Route`]**: Owns the points and runs the weight / distance / slope / smoothing pipeline
//! - **[`profile`]**: Rasterizes altitude samples into per-pixel mean/min/max bands
//! - **[`services`]**: Async boundaries to elevation, DEM tile and routing services
//!
//! # Performance Characteristics
//!
//! - **Weighting**: O(L × N log N) for a ladder of L tolerances
//! - **Distance update**: O(k) geodesic evaluations for an edit touching k points, plus one O(N) pass
//! - **Profile**: O(N + B) for B buckets

mod config;
pub mod geodesic;
mod gpx_io;
mod point;
pub mod polyline;
pub mod profile;
mod ranges;
mod route;
pub mod services;
pub mod simplify;
mod snapshot;
mod splice;
pub mod utils;

// Public API exports
pub use config::{ElevationConfig, EngineConfig, TileConfig, WeightStep};
pub use gpx_io::{read_gpx, write_gpx};
pub use point::{LatLng, MAX_ALTITUDE, PathPoint, PointId, RoutePoint};
pub use polyline::{PolylineCodec, PolylineError};
pub use profile::{CourseBands, ProfileBand, ProfileBucket, ProfileSample};
pub use ranges::{BoundaryContext, IndexRange, PartKind, RoutePart};
pub use route::{Invalidation, Location, Route};
pub use services::ServiceError;
pub use snapshot::{PointProperties, RouteSnapshot};
pub use splice::SpliceOutcome;

/// Error types for the route engine
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("Invalid range [{begin}, {end}] for a route of {len} points")]
    InvalidRange { begin: usize, end: usize, len: usize },

    #[error("Distance {distance} m is beyond one reflection of a {total} m route")]
    DistanceOutOfRange { distance: f64, total: f64 },

    #[error("Invalid position ({lat}, {lng}) at index {index}")]
    InvalidPosition { index: usize, lat: f64, lng: f64 },

    #[error("Invalid altitude {alt} m at index {index}")]
    InvalidAltitude { index: usize, alt: f64 },

    #[error("Polyline error: {0}")]
    Polyline(#[from] PolylineError),

    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Snapshot mismatch: {property} has {actual} entries for {expected} points")]
    SnapshotMismatch {
        property: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("GPX parsing error: {0}")]
    GpxParse(#[from] gpx::errors::GpxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Empty route")]
    EmptyRoute,
}

pub type Result<T> = std::result::Result<T, GeometryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that the main entry points are accessible
        let _: fn(&str, EngineConfig) -> Result<Route> = Route::from_encoded;
        let _: fn() -> EngineConfig = EngineConfig::default;
    }

    #[test]
    fn test_range_error_message() {
        let err = GeometryError::InvalidRange {
            begin: 4,
            end: 2,
            len: 10,
        };
        assert_eq!(err.to_string(), "Invalid range [4, 2] for a route of 10 points");
    }
}
