//! Subpath replacement preserving point identity
//!
//! A replacement path (typically a routing service detour) is spliced over an index range. Any
//! new coordinate that coincides with an original point in that range, at the configured number
//! of decimals, keeps the original `RoutePoint` and with it its id, altitude and flags.
//!
//! # Architecture
//!
//! Reconciliation is a greedy two-pointer walk: two cursors close in on the original range from
//! both ends and two cursors close in on the new path. Each step scans the remaining original
//! window outward from its edges, trying the front pair before the back pair. A match reuses the
//! original point and moves both matched cursors inward; no match advances both new-path cursors
//! and leaves those slots to fresh points. Matches on the front side are taken in increasing
//! order and on the back side in decreasing order, so reused points keep their relative order.

use crate::route::{Invalidation, known_altitude, validate_path};
use crate::{GeometryError, IndexRange, PathPoint, PointId, Result, Route, RoutePoint};

/// What a subpath replacement did to the route
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpliceOutcome {
    /// Original points kept in place of a coinciding new coordinate
    pub reused: usize,
    /// Fresh points created for the rest of the new path
    pub inserted: usize,
    /// Ids of original points that no longer exist
    pub removed: Vec<PointId>,
}

/// For every new-path slot, the index into `original` of the point it reuses
fn reconcile(original: &[RoutePoint], new_path: &[PathPoint], decimals: u32) -> Vec<Option<usize>> {
    let mut reuse = vec![None; new_path.len()];

    // Half-open windows that still need reconciling
    let (mut lo, mut hi) = (0usize, original.len());
    let (mut ns, mut ne) = (0usize, new_path.len());

    while ns < ne {
        let mut matched = false;
        for d in 0..hi.saturating_sub(lo) {
            if original[lo + d].coincides_with(&new_path[ns], decimals) {
                reuse[ns] = Some(lo + d);
                lo += d + 1;
                ns += 1;
                matched = true;
                break;
            }
            if original[hi - 1 - d].coincides_with(&new_path[ne - 1], decimals) {
                reuse[ne - 1] = Some(hi - 1 - d);
                hi -= d + 1;
                ne -= 1;
                matched = true;
                break;
            }
        }

        if !matched {
            ns += 1;
            ne = ne.saturating_sub(1);
        }
    }

    reuse
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Route {
    /// Replace the points in `[begin, end]` with `new_path`
    ///
    /// Coordinates of `new_path` that coincide with an original point in the range reuse that
    /// point. Fresh points inherit the editable flag of the range and are excluded only when both
    /// range ends were. An empty `new_path` deletes the range.
    ///
    /// # Returns
    /// Counts of reused and inserted points plus the ids that disappeared, or an error (with the
    /// route untouched) if the range is invalid or the route would become empty
    pub fn subpath_replace(
        &mut self,
        begin: usize,
        end: usize,
        new_path: &[PathPoint],
    ) -> Result<SpliceOutcome> {
        let range = IndexRange::new(begin, end).validate(self.len())?;
        if new_path.is_empty() && range.len() == self.len() {
            return Err(GeometryError::EmptyRoute);
        }
        validate_path(new_path, begin)?;

        let decimals = self.config.coincidence_decimals;
        let reuse = reconcile(&self.points[begin..=end], new_path, decimals);

        let mut originals: Vec<Option<RoutePoint>> =
            self.points.drain(begin..=end).map(Some).collect();
        let editable = originals
            .first()
            .and_then(|p| p.as_ref())
            .is_some_and(|p| p.editable);
        let excluded = originals
            .first()
            .and_then(|p| p.as_ref())
            .zip(originals.last().and_then(|p| p.as_ref()))
            .is_some_and(|(first, last)| first.excluded && last.excluded);

        let mut outcome = SpliceOutcome::default();
        let mut replacement = Vec::with_capacity(new_path.len());
        for (path_point, slot) in new_path.iter().zip(reuse) {
            match slot.and_then(|index| originals[index].take()) {
                Some(point) => {
                    outcome.reused += 1;
                    replacement.push(point);
                }
                None => {
                    let path_point = PathPoint {
                        alt: known_altitude(path_point.alt),
                        ..*path_point
                    };
                    let mut point = RoutePoint::new(path_point, self.config.base_weight);
                    point.editable = editable;
                    point.excluded = excluded;
                    outcome.inserted += 1;
                    replacement.push(point);
                }
            }
        }
        outcome.removed = originals.into_iter().flatten().map(|p| p.id).collect();

        let new_len = replacement.len();
        self.points.splice(begin..begin, replacement);
        self.rebuild_index();

        let last = self.len() - 1;
        let touched = IndexRange::new(
            begin.min(last),
            (begin + new_len).saturating_sub(1).clamp(begin.min(last), last),
        );
        self.update(Invalidation::geometry(touched));

        tracing::debug!(
            begin,
            end,
            reused = outcome.reused,
            inserted = outcome.inserted,
            removed = outcome.removed.len(),
            "Replaced subpath"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EngineConfig;

    fn straight_route(len: usize) -> Route {
        let path = (0..len)
            .map(|i| PathPoint::with_alt(0.0, i as f64 * 0.001, 10.0))
            .collect();
        Route::from_path(path, EngineConfig::default()).unwrap()
    }

    fn ids(route: &Route) -> Vec<PointId> {
        route.points().iter().map(|p| p.id()).collect()
    }

    #[test]
    fn test_detour_keeps_endpoint_ids() {
        let mut route = straight_route(5);
        let before = ids(&route);

        let detour = [
            PathPoint::new(0.0, 0.001),
            PathPoint::new(0.0005, 0.0015),
            PathPoint::new(0.0005, 0.0025),
            PathPoint::new(0.0, 0.003),
        ];
        let outcome = route.subpath_replace(1, 3, &detour).unwrap();

        assert_eq!(outcome.reused, 2);
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.removed, vec![before[2]]);

        let after = ids(&route);
        assert_eq!(after.len(), 6);
        assert_eq!(after[0], before[0]);
        assert_eq!(after[1], before[1]);
        assert_eq!(after[4], before[3]);
        assert_eq!(after[5], before[4]);
        assert_eq!(route.index_of(before[2]), None);
        assert_eq!(route.index_of(before[3]), Some(4));

        // Reused points keep their altitude, fresh ones wait for the elevation service
        assert_eq!(route.point(1).unwrap().alt(), Some(10.0));
        assert_eq!(route.point(2).unwrap().alt(), None);
    }

    #[test]
    fn test_identical_path_keeps_every_id() {
        let mut route = straight_route(6);
        let before = ids(&route);
        let same: Vec<PathPoint> = route.points()[1..=4]
            .iter()
            .map(|p| PathPoint::new(p.lat() + 1e-7, p.lng() - 1e-7))
            .collect();

        let outcome = route.subpath_replace(1, 4, &same).unwrap();
        assert_eq!(outcome.reused, 4);
        assert_eq!(outcome.inserted, 0);
        assert!(outcome.removed.is_empty());
        assert_eq!(ids(&route), before);
    }

    #[test]
    fn test_disjoint_path_replaces_everything() {
        let mut route = straight_route(5);
        let before = ids(&route);
        let elsewhere = [
            PathPoint::new(0.01, 0.001),
            PathPoint::new(0.01, 0.002),
            PathPoint::new(0.01, 0.003),
        ];

        let outcome = route.subpath_replace(1, 3, &elsewhere).unwrap();
        assert_eq!(outcome.reused, 0);
        assert_eq!(outcome.inserted, 3);
        assert_eq!(outcome.removed, before[1..=3].to_vec());
        assert_eq!(route.len(), 5);
    }

    #[test]
    fn test_reused_points_stay_ordered() {
        let mut route = straight_route(6);
        let before = ids(&route);
        // New path revisits original coordinates in order with extra points in between
        let path = [
            PathPoint::new(0.0, 0.001),
            PathPoint::new(0.0003, 0.0015),
            PathPoint::new(0.0, 0.002),
            PathPoint::new(0.0003, 0.0035),
            PathPoint::new(0.0, 0.004),
        ];
        let outcome = route.subpath_replace(1, 4, &path).unwrap();
        assert_eq!(outcome.reused, 3);
        assert_eq!(outcome.removed, vec![before[3]]);

        let positions: Vec<usize> = [before[1], before[2], before[4]]
            .iter()
            .map(|id| route.index_of(*id).unwrap())
            .collect();
        assert_eq!(positions, vec![1, 3, 5]);
    }

    #[test]
    fn test_empty_path_deletes_range() {
        let mut route = straight_route(5);
        let before = ids(&route);
        let outcome = route.subpath_replace(1, 2, &[]).unwrap();
        assert_eq!(outcome.removed, before[1..=2].to_vec());
        assert_eq!(ids(&route), vec![before[0], before[3], before[4]]);

        let expected = crate::geodesic::distance(0.0, 0.0, 0.0, 0.004) * 1.0013;
        assert!((route.total_distance() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_requests_leave_route_untouched() {
        let mut route = straight_route(4);
        let before = ids(&route);

        assert!(route.subpath_replace(2, 1, &[PathPoint::new(0.0, 0.0)]).is_err());
        assert!(route.subpath_replace(0, 4, &[PathPoint::new(0.0, 0.0)]).is_err());
        assert!(matches!(
            route.subpath_replace(0, 3, &[]),
            Err(GeometryError::EmptyRoute)
        ));
        assert_eq!(ids(&route), before);
    }

    #[test]
    fn test_off_globe_detour_is_rejected() {
        let mut route = straight_route(5);
        let before = ids(&route);

        let path = [
            PathPoint::new(0.0, 0.001),
            PathPoint::new(1e14, 0.002),
            PathPoint::new(0.0, 0.003),
        ];
        let err = route.subpath_replace(1, 3, &path).unwrap_err();
        assert!(matches!(err, GeometryError::InvalidPosition { index: 2, .. }));
        assert_eq!(ids(&route), before);
        assert!(route.to_encoded().is_ok());
    }

    #[test]
    fn test_fresh_points_inherit_range_flags() {
        let mut route = straight_route(6);
        route.set_edit_range(1, 4).unwrap();
        route.set_exclude(2, 3).unwrap();

        let path = [
            PathPoint::new(0.0, 0.001),
            PathPoint::new(0.001, 0.0025),
            PathPoint::new(0.0, 0.004),
        ];
        route.subpath_replace(1, 4, &path).unwrap();

        let fresh = route.point(2).unwrap();
        assert!(fresh.is_editable());
        // Range ends (points 1 and 4) were not excluded
        assert!(!fresh.is_excluded());
    }

    #[test]
    fn test_distances_match_full_recompute() {
        let mut route = straight_route(8);
        let path = [
            PathPoint::new(0.0, 0.002),
            PathPoint::new(0.0004, 0.003),
            PathPoint::new(0.0, 0.004),
        ];
        route.subpath_replace(2, 5, &path).unwrap();

        let mut full = route.clone();
        full.set_distance(0, full.len() - 1).unwrap();
        for (a, b) in route.points().iter().zip(full.points()) {
            assert!((a.route_distance() - b.route_distance()).abs() < 1e-9);
            assert!((a.brm_distance() - b.brm_distance()).abs() < 1e-9);
        }
    }
}
