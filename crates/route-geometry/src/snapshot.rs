//! Persisted route snapshot
//!
//! The snapshot stores positions and altitudes as one polyline string plus parallel per-point
//! flag arrays. Unpacking reproduces point count, positions and flags; ids are always new.

use crate::polyline::PolylineCodec;
use crate::route::{Invalidation, known_altitude, validate_path};
use crate::{EngineConfig, GeometryError, Result, Route, RoutePoint};
use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-point flags stored next to the encoded path, one entry per point
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PointProperties {
    pub excluded: Vec<u8>,
    pub weight: Vec<u8>,
    pub dem_cached: Vec<u8>,
    pub alt_corrected: Vec<u8>,
}

/// Serializable form of a [`Route`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct RouteSnapshot {
    /// Polyline with altitude channel; unknown altitudes hold the sentinel value
    pub encoded_path_alt: String,
    pub point_properties: PointProperties,
}

fn flag(value: bool) -> u8 {
    u8::from(value)
}

fn check_len(property: &'static str, values: &[u8], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(GeometryError::SnapshotMismatch {
            property,
            expected,
            actual: values.len(),
        });
    }
    Ok(())
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Route {
    /// Capture the route for persistence
    pub fn pack(&self) -> Result<RouteSnapshot> {
        let points = &self.points;
        Ok(RouteSnapshot {
            encoded_path_alt: self.to_encoded()?,
            point_properties: PointProperties {
                excluded: points.iter().map(|p| flag(p.excluded)).collect(),
                weight: points.iter().map(|p| p.weight).collect(),
                dem_cached: points.iter().map(|p| flag(p.dem_cached)).collect(),
                alt_corrected: points.iter().map(|p| flag(p.alt_corrected)).collect(),
            },
        })
    }

    /// Rebuild a route from a snapshot
    ///
    /// Stored weights are installed as-is; distances, slopes and smoothing are recomputed.
    pub fn unpack(snapshot: &RouteSnapshot, config: EngineConfig) -> Result<Self> {
        let path = PolylineCodec::with_altitude(config.altitude_scale)
            .decode(&snapshot.encoded_path_alt)?;
        if path.is_empty() {
            return Err(GeometryError::EmptyRoute);
        }
        validate_path(&path, 0)?;

        let properties = &snapshot.point_properties;
        let len = path.len();
        check_len("excluded", &properties.excluded, len)?;
        check_len("weight", &properties.weight, len)?;
        check_len("demCached", &properties.dem_cached, len)?;
        check_len("altCorrected", &properties.alt_corrected, len)?;

        let points: Vec<RoutePoint> = path
            .into_iter()
            .enumerate()
            .map(|(i, mut p)| {
                p.alt = known_altitude(p.alt);
                let mut point = RoutePoint::new(p, properties.weight[i]);
                point.excluded = properties.excluded[i] != 0;
                point.dem_cached = properties.dem_cached[i] != 0;
                point.alt_corrected = properties.alt_corrected[i] != 0;
                point
            })
            .collect();

        let mut route = Self {
            points,
            index_by_id: HashMap::new(),
            config,
        };
        route.rebuild_index();
        route.update(Invalidation {
            weights: false,
            ..Invalidation::everything(len)
        });

        tracing::info!("Unpacked route with {} points", route.len());
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathPoint;

    fn sample_route() -> Route {
        let path = (0..6)
            .map(|i| {
                let alt = if i == 2 { None } else { Some(i as f64 * 2.5) };
                PathPoint {
                    lat: 35.0 + (i as f64 * 0.7).sin() * 0.001,
                    lng: 139.0 + i as f64 * 0.001,
                    alt,
                }
            })
            .collect();
        Route::from_path(path, EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_pack_unpack_preserves_points_and_flags() {
        let mut route = sample_route();
        route.set_exclude(3, 3).unwrap();
        let id = route.point(1).unwrap().id();
        route.pin_point(id);
        route.mark_dem_cached(&[id]);

        let snapshot = route.pack().unwrap();
        assert_eq!(snapshot.point_properties.weight.len(), 6);
        assert_eq!(snapshot.point_properties.weight[1], 20);

        let restored = Route::unpack(&snapshot, EngineConfig::default()).unwrap();
        assert_eq!(restored.len(), route.len());
        for (a, b) in route.points().iter().zip(restored.points()) {
            assert!((a.lat() - b.lat()).abs() < 1e-5);
            assert!((a.lng() - b.lng()).abs() < 1e-5);
            assert_eq!(a.alt().is_some(), b.alt().is_some());
            assert_eq!(a.is_excluded(), b.is_excluded());
            assert_eq!(a.weight(), b.weight());
            assert_eq!(a.is_dem_cached(), b.is_dem_cached());
            assert_eq!(a.is_alt_corrected(), b.is_alt_corrected());
            assert_ne!(a.id(), b.id());
        }
        assert!((restored.brm_distance() - route.brm_distance()).abs() < 5.0);
    }

    #[test]
    fn test_unknown_altitude_survives() {
        let route = sample_route();
        let restored = Route::unpack(&route.pack().unwrap(), EngineConfig::default()).unwrap();
        assert_eq!(restored.point(2).unwrap().alt(), None);
        assert_eq!(restored.point(3).unwrap().alt(), Some(7.5));
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let mut snapshot = sample_route().pack().unwrap();
        snapshot.point_properties.dem_cached.pop();
        let err = Route::unpack(&snapshot, EngineConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            GeometryError::SnapshotMismatch {
                property: "demCached",
                expected: 6,
                actual: 5,
            }
        ));
    }

    #[test]
    fn test_empty_snapshot_is_rejected() {
        let snapshot = RouteSnapshot::default();
        assert!(matches!(
            Route::unpack(&snapshot, EngineConfig::default()),
            Err(GeometryError::EmptyRoute)
        ));
    }

    #[test]
    fn test_stored_weights_are_not_recomputed() {
        let mut snapshot = sample_route().pack().unwrap();
        snapshot.point_properties.weight = vec![7; 6];
        let restored = Route::unpack(&snapshot, EngineConfig::default()).unwrap();
        assert!(restored.points().iter().all(|p| p.weight() == 7));
    }
}
