//! Route model
//!
//! This module provides the `Route` struct which owns the ordered point sequence of one event
//! route and keeps its derived data (weights, distances, slopes, smoothed altitude) consistent
//! across edits.
//!
//! Every mutation states which derived fields it invalidates through an [`Invalidation`], and
//! [`Route::update`] recomputes exactly those, in pipeline order.

use crate::polyline::{ALTITUDE_SENTINEL, PolylineCodec};
use crate::ranges::{self, IndexRange, PartKind, RoutePart};
use crate::simplify::{self, SimplifyPoint};
use crate::{
    EngineConfig, GeometryError, LatLng, MAX_ALTITUDE, PathPoint, PointId, Result, RoutePoint,
    geodesic,
};
use geo::{Coord, LineString, Rect};
use std::collections::HashMap;

/// Half-length of the span used to derive a heading around a distance
const HEADING_SPAN_METERS: f64 = 10.0;

/// Altitude as stored on a point; the sentinel and anything below it mean unknown
pub(crate) fn known_altitude(alt: Option<f64>) -> Option<f64> {
    alt.filter(|&alt| alt > ALTITUDE_SENTINEL)
}

fn is_valid_altitude(alt: f64) -> bool {
    alt.is_finite() && alt > ALTITUDE_SENTINEL && alt <= MAX_ALTITUDE
}

/// Check every sample of `path` before it becomes a route point
///
/// Positions must be on the globe; known altitudes must be finite and at most
/// [`MAX_ALTITUDE`]. Error indices count from `first_index`, the route index `path` would
/// start at.
pub(crate) fn validate_path(path: &[PathPoint], first_index: usize) -> Result<()> {
    for (offset, point) in path.iter().enumerate() {
        let index = first_index + offset;
        if !point.lat_lng().is_valid() {
            return Err(GeometryError::InvalidPosition {
                index,
                lat: point.lat,
                lng: point.lng,
            });
        }
        if let Some(alt) = known_altitude(point.alt) {
            if !is_valid_altitude(alt) {
                return Err(GeometryError::InvalidAltitude { index, alt });
            }
        }
    }
    Ok(())
}

/// Derived fields a mutation invalidates
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Invalidation {
    /// Re-run the weight ladder
    pub weights: bool,
    /// Recompute `point_distance` around these indices (the point after `end` included)
    pub point_distance: Option<IndexRange>,
    /// Re-accumulate route and course distances over the whole route
    pub accumulate: bool,
    /// Recompute pre/post slopes
    pub slope: bool,
    /// Recompute smoothed altitudes
    pub smooth: bool,
}

impl Invalidation {
    /// Nothing to recompute
    pub fn none() -> Self {
        Self::default()
    }

    /// Positions changed around `range`: everything downstream of the geometry is stale
    pub fn geometry(range: IndexRange) -> Self {
        Self {
            weights: true,
            point_distance: Some(range),
            accumulate: true,
            slope: true,
            smooth: true,
        }
    }

    /// Whole route is new
    pub fn everything(len: usize) -> Self {
        Self::geometry(IndexRange::new(0, len.saturating_sub(1)))
    }

    /// Exclusion flags changed: only the course distance moves
    pub fn course() -> Self {
        Self {
            accumulate: true,
            ..Self::default()
        }
    }

    /// Altitudes changed: slopes and smoothing are stale
    pub fn altitude() -> Self {
        Self {
            slope: true,
            smooth: true,
            ..Self::default()
        }
    }
}

/// Result of a distance query
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub alt: Option<f64>,
    /// Index of the point starting the segment the location falls on
    pub index: usize,
    /// Requested route distance in meters
    pub distance: f64,
    /// Location was reflected through a route endpoint
    pub is_mirror: bool,
}

/// One event route: an ordered, non-empty sequence of points plus derived data
#[derive(Clone, Debug)]
pub struct Route {
    pub(crate) points: Vec<RoutePoint>,
    pub(crate) index_by_id: HashMap<PointId, usize>,
    pub(crate) config: EngineConfig,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Route {
    /// Create a route from a polyline string with an altitude channel
    ///
    /// # Arguments
    /// * `encoded` - Polyline with (lat, lng, alt) triples at scale 1e5/1e5/`altitude_scale`
    /// * `config` - Engine configuration
    ///
    /// # Returns
    /// The route with every derived field computed, or an error if the string is malformed or
    /// holds no points
    pub fn from_encoded(encoded: &str, config: EngineConfig) -> Result<Self> {
        let path = PolylineCodec::with_altitude(config.altitude_scale).decode(encoded)?;
        Self::from_path(path, config)
    }

    /// Create a route from decoded samples
    pub fn from_path(path: Vec<PathPoint>, config: EngineConfig) -> Result<Self> {
        if path.is_empty() {
            return Err(GeometryError::EmptyRoute);
        }
        validate_path(&path, 0)?;

        let points = Self::fresh_points(path, &config);
        let mut route = Self {
            points,
            index_by_id: HashMap::new(),
            config,
        };
        route.rebuild_index();
        route.update(Invalidation::everything(route.len()));

        tracing::info!(
            "Loaded route with {} points, {:.0} m",
            route.len(),
            route.total_distance()
        );
        Ok(route)
    }

    /// Replace all points with the contents of a polyline string
    ///
    /// Every point gets a new id. On error the route is left untouched.
    pub fn set_points(&mut self, encoded: &str) -> Result<()> {
        let path = PolylineCodec::with_altitude(self.config.altitude_scale).decode(encoded)?;
        if path.is_empty() {
            return Err(GeometryError::EmptyRoute);
        }
        validate_path(&path, 0)?;

        self.points = Self::fresh_points(path, &self.config);
        self.rebuild_index();
        self.update(Invalidation::everything(self.len()));
        Ok(())
    }

    pub(crate) fn fresh_points(path: Vec<PathPoint>, config: &EngineConfig) -> Vec<RoutePoint> {
        path.into_iter()
            .map(|mut p| {
                p.alt = known_altitude(p.alt);
                RoutePoint::new(p, config.base_weight)
            })
            .collect()
    }

    /// Encode the points (with altitude) back into a polyline string
    ///
    /// Unknown altitudes are written as [`ALTITUDE_SENTINEL`]. Fails only on values the codec
    /// cannot represent, which point validation keeps out of the route.
    pub fn to_encoded(&self) -> Result<String> {
        let path: Vec<PathPoint> = self
            .points
            .iter()
            .map(|p| PathPoint {
                alt: Some(p.alt.unwrap_or(ALTITUDE_SENTINEL)),
                ..p.to_path_point()
            })
            .collect();

        Ok(PolylineCodec::with_altitude(self.config.altitude_scale).encode(&path)?)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Routes always hold at least one point
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    #[inline]
    pub fn point(&self, index: usize) -> Option<&RoutePoint> {
        self.points.get(index)
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current index of a point, if it still exists
    #[inline]
    pub fn index_of(&self, id: PointId) -> Option<usize> {
        self.index_by_id.get(&id).copied()
    }

    pub fn point_by_id(&self, id: PointId) -> Option<&RoutePoint> {
        self.index_of(id).and_then(|index| self.points.get(index))
    }

    /// Rebuild the id lookup after a structural edit
    pub(crate) fn rebuild_index(&mut self) {
        self.index_by_id.clear();
        self.index_by_id.reserve(self.points.len());
        for (index, point) in self.points.iter().enumerate() {
            self.index_by_id.insert(point.id, index);
        }
    }

    /// Total route length in meters, excluded sections included
    pub fn total_distance(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.route_distance)
    }

    /// Course length in meters, excluded sections skipped
    pub fn brm_distance(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.brm_distance)
    }

    /// Total ascent and descent in meters over the smoothed altitude
    pub fn ascent_descent(&self) -> (f64, f64) {
        let mut ascent = 0.0;
        let mut descent = 0.0;
        let mut previous: Option<f64> = None;

        for alt in self.points.iter().filter_map(|p| p.smooth_alt) {
            if let Some(prev) = previous {
                let diff = alt - prev;
                if diff > 0.0 {
                    ascent += diff;
                } else {
                    descent -= diff;
                }
            }
            previous = Some(alt);
        }

        (ascent, descent)
    }

    /// Bounding box in degrees (x = longitude, y = latitude)
    pub fn bounding_box(&self) -> Rect<f64> {
        let mut min = Coord {
            x: f64::INFINITY,
            y: f64::INFINITY,
        };
        let mut max = Coord {
            x: f64::NEG_INFINITY,
            y: f64::NEG_INFINITY,
        };
        for point in &self.points {
            min.x = min.x.min(point.lng);
            min.y = min.y.min(point.lat);
            max.x = max.x.max(point.lng);
            max.y = max.y.max(point.lat);
        }
        Rect::new(min, max)
    }

    /// Points with at least `min_weight`, as a line for the renderer
    pub fn line_string(&self, min_weight: u8) -> LineString<f64> {
        self.points
            .iter()
            .filter(|p| p.weight >= min_weight)
            .map(|p| Coord { x: p.lng, y: p.lat })
            .collect()
    }

    // ------------------------------------------------------------------
    // Update pipeline
    // ------------------------------------------------------------------

    /// Recompute the derived fields named by `invalidation`
    ///
    /// Order is weights, distances, slopes, smoothing; each stage only reads fields produced by
    /// the earlier ones.
    pub fn update(&mut self, invalidation: Invalidation) {
        #[cfg(feature = "profiling")]
        profiling::scope!("route::update");

        tracing::debug!(?invalidation, points = self.points.len(), "Updating route");

        if invalidation.weights {
            self.set_weight();
        }
        if let Some(range) = invalidation.point_distance {
            self.recompute_point_distances(range.begin, range.end);
        }
        if invalidation.accumulate || invalidation.point_distance.is_some() {
            self.accumulate_distances();
        }
        if invalidation.slope {
            self.set_slope();
        }
        if invalidation.smooth {
            self.set_smooth();
        }
    }

    /// Assign each point the highest ladder weight among the tolerances that retain it
    ///
    /// Pinned points keep their weight; everything else restarts from the base weight, so
    /// calling this twice yields the same weights.
    pub fn set_weight(&mut self) {
        let base = self.config.base_weight;
        let pinned = self.config.pinned_weight;
        for point in &mut self.points {
            if point.weight < pinned {
                point.weight = base;
            }
        }

        let samples: Vec<SimplifyPoint> = self
            .points
            .iter()
            .enumerate()
            .map(|(index, p)| SimplifyPoint::new(p.lng, p.lat, index))
            .collect();

        for step in &self.config.weight_ladder {
            let retained = simplify::simplify(&samples, step.tolerance);
            tracing::trace!(
                weight = step.weight,
                retained = retained.len(),
                "Applied weight step"
            );
            for index in retained {
                let point = &mut self.points[index];
                point.weight = point.weight.max(step.weight);
            }
        }
    }

    /// Recompute `point_distance` for `[max(1, begin), min(end + 1, len - 1)]`, then
    /// re-accumulate route and course distances over the whole route
    ///
    /// Fails without touching the route if `begin > end`.
    pub fn set_distance(&mut self, begin: usize, end: usize) -> Result<()> {
        if begin > end {
            return Err(GeometryError::InvalidRange {
                begin,
                end,
                len: self.len(),
            });
        }
        self.recompute_point_distances(begin, end);
        self.accumulate_distances();
        Ok(())
    }

    fn recompute_point_distances(&mut self, begin: usize, end: usize) {
        let last = self.points.len().saturating_sub(1);
        let first = begin.max(1);
        let stop = end.saturating_add(1).min(last);
        if first > stop {
            return;
        }

        let correction = self.config.distance_correction;
        for index in first..=stop {
            let (prev_lat, prev_lng) = {
                let prev = &self.points[index - 1];
                (prev.lat, prev.lng)
            };
            let point = &mut self.points[index];
            point.point_distance =
                geodesic::distance(prev_lat, prev_lng, point.lat, point.lng) * correction;
        }
        tracing::trace!(first, stop, "Recomputed point distances");
    }

    /// Forward pass over the whole route; exclusion flags anywhere affect everything after
    fn accumulate_distances(&mut self) {
        let Some(first) = self.points.first_mut() else {
            return;
        };
        first.point_distance = 0.0;
        first.route_distance = 0.0;
        first.brm_distance = 0.0;

        for index in 1..self.points.len() {
            let (prev_route, prev_brm, prev_excluded) = {
                let prev = &self.points[index - 1];
                (prev.route_distance, prev.brm_distance, prev.excluded)
            };
            let point = &mut self.points[index];
            point.route_distance = prev_route + point.point_distance;
            point.brm_distance = if prev_excluded || point.excluded {
                prev_brm
            } else {
                prev_brm + point.point_distance
            };
        }
    }

    /// Grade of every segment, stored as `pre_slope` on its end point and negated as
    /// `post_slope` on its start point
    pub fn set_slope(&mut self) {
        for point in &mut self.points {
            point.pre_slope = 0.0;
            point.post_slope = 0.0;
        }

        for index in 1..self.points.len() {
            let prev = &self.points[index - 1];
            let point = &self.points[index];
            let run = point.route_distance - prev.route_distance;
            let slope = match (prev.alt, point.alt) {
                (Some(from), Some(to)) if run > 0.0 => (to - from) / run,
                _ => 0.0,
            };
            self.points[index - 1].post_slope = -slope;
            self.points[index].pre_slope = slope;
        }
    }

    /// Replace outlier altitudes by interpolating between the nearest valid neighbors
    ///
    /// A point is valid when it has an altitude and its grade change `|pre_slope + post_slope|`
    /// (incoming grade minus outgoing grade) stays under the configured threshold. Without a
    /// valid neighbor on one side the route endpoint on that side is used instead.
    pub fn set_smooth(&mut self) {
        let len = self.points.len();
        if len == 0 {
            return;
        }
        let threshold = self.config.outlier_slope_threshold;
        let valid: Vec<bool> = self
            .points
            .iter()
            .map(|p| p.alt.is_some() && (p.pre_slope + p.post_slope).abs() < threshold)
            .collect();

        // Nearest valid neighbor strictly before / after each index
        let mut before = vec![0usize; len];
        let mut last_valid = None;
        for index in 0..len {
            before[index] = last_valid.unwrap_or(0);
            if valid[index] {
                last_valid = Some(index);
            }
        }
        let mut after = vec![len - 1; len];
        let mut next_valid = None;
        for index in (0..len).rev() {
            after[index] = next_valid.unwrap_or(len - 1);
            if valid[index] {
                next_valid = Some(index);
            }
        }

        let smoothed: Vec<Option<f64>> = (0..len)
            .map(|index| {
                if valid[index] {
                    self.points[index].alt
                } else {
                    self.interpolate_altitude(before[index], index, after[index])
                }
            })
            .collect();

        let outliers = valid.iter().filter(|v| !**v).count();
        for (point, smooth_alt) in self.points.iter_mut().zip(smoothed) {
            point.smooth_alt = smooth_alt;
            point.alt_smoothed = true;
        }
        tracing::debug!(outliers, "Smoothed altitude");
    }

    fn interpolate_altitude(&self, left: usize, index: usize, right: usize) -> Option<f64> {
        let a = &self.points[left];
        let b = &self.points[right];
        match (a.alt, b.alt) {
            (Some(from), Some(to)) => {
                let span = b.route_distance - a.route_distance;
                if span > 0.0 {
                    let t = (self.points[index].route_distance - a.route_distance) / span;
                    Some(from + (to - from) * t)
                } else {
                    Some(from)
                }
            }
            (Some(alt), None) | (None, Some(alt)) => Some(alt),
            (None, None) => self.points[index].alt,
        }
    }

    // ------------------------------------------------------------------
    // Exclusion and editable window
    // ------------------------------------------------------------------

    /// Mark `[begin, end]` as excluded from the course
    ///
    /// The range grows outward by one index on each side whose neighbor is already excluded or
    /// is the first/last point of the route, so blocks coalesce instead of fragmenting.
    ///
    /// # Returns
    /// The range actually marked
    pub fn set_exclude(&mut self, begin: usize, end: usize) -> Result<IndexRange> {
        let range = IndexRange::new(begin, end).validate(self.len())?;
        let widened = self.widen_exclusion(range);
        for point in &mut self.points[widened.begin..=widened.end] {
            point.excluded = true;
        }
        tracing::debug!(?range, ?widened, "Excluded points");
        self.update(Invalidation::course());
        Ok(widened)
    }

    fn widen_exclusion(&self, range: IndexRange) -> IndexRange {
        let last = self.points.len() - 1;
        let mut widened = range;
        if range.begin > 0 {
            let outside = range.begin - 1;
            if outside == 0 || self.points[outside].excluded {
                widened.begin = outside;
            }
        }
        if range.end < last {
            let outside = range.end + 1;
            if outside == last || self.points[outside].excluded {
                widened.end = outside;
            }
        }
        widened
    }

    /// Clear the exclusion flag on exactly `[begin, end]`
    pub fn restore_exclude(&mut self, begin: usize, end: usize) -> Result<()> {
        let range = IndexRange::new(begin, end).validate(self.len())?;
        for point in &mut self.points[range.begin..=range.end] {
            point.excluded = false;
        }
        self.update(Invalidation::course());
        Ok(())
    }

    /// Make `[begin, end]` the only editable window
    pub fn set_edit_range(&mut self, begin: usize, end: usize) -> Result<()> {
        let range = IndexRange::new(begin, end).validate(self.len())?;
        for (index, point) in self.points.iter_mut().enumerate() {
            point.editable = range.contains(index);
        }
        Ok(())
    }

    pub fn clear_edit_range(&mut self) {
        for point in &mut self.points {
            point.editable = false;
        }
    }

    /// Contiguous exclusion blocks, each widened by one boundary point
    pub fn excluded_ranges(&self) -> Vec<RoutePart> {
        ranges::excluded_ranges(&self.points)
            .into_iter()
            .map(|range| RoutePart::new(PartKind::Excluded, range))
            .collect()
    }

    /// Up to three parts: before the editable window, the window, after it
    pub fn editable_ranges(&self) -> Vec<RoutePart> {
        ranges::editable_ranges(&self.points)
    }

    // ------------------------------------------------------------------
    // Point edits
    // ------------------------------------------------------------------

    /// Insert a new point before `index` (`index == len` appends)
    pub fn insert_point(&mut self, index: usize, point: PathPoint) -> Result<PointId> {
        let len = self.len();
        if index > len {
            return Err(GeometryError::InvalidRange {
                begin: index,
                end: index,
                len,
            });
        }
        validate_path(std::slice::from_ref(&point), index)?;

        let point = PathPoint {
            alt: known_altitude(point.alt),
            ..point
        };
        let mut fresh = RoutePoint::new(point, self.config.base_weight);
        let prev = index.checked_sub(1).and_then(|i| self.points.get(i));
        let next = self.points.get(index);
        if let (Some(prev), Some(next)) = (prev, next) {
            fresh.excluded = prev.excluded && next.excluded;
            fresh.editable = prev.editable && next.editable;
        }
        let id = fresh.id;

        self.points.insert(index, fresh);
        self.rebuild_index();
        self.update(Invalidation::geometry(IndexRange::new(index, index)));
        Ok(id)
    }

    /// Remove the point at `index`; the last remaining point cannot be removed
    pub fn remove_point(&mut self, index: usize) -> Result<PointId> {
        let len = self.len();
        IndexRange::new(index, index).validate(len)?;
        if len == 1 {
            return Err(GeometryError::EmptyRoute);
        }

        let removed = self.points.remove(index);
        self.rebuild_index();
        let successor = index.min(self.len() - 1);
        self.update(Invalidation::geometry(IndexRange::new(successor, successor)));
        Ok(removed.id)
    }

    /// Move the point at `index`, keeping its identity
    ///
    /// Its altitude becomes unverified until the elevation service resolves it again.
    pub fn move_point(&mut self, index: usize, position: LatLng) -> Result<()> {
        IndexRange::new(index, index).validate(self.len())?;
        if !position.is_valid() {
            return Err(GeometryError::InvalidPosition {
                index,
                lat: position.lat,
                lng: position.lng,
            });
        }

        let point = &mut self.points[index];
        point.lat = position.lat;
        point.lng = position.lng;
        point.alt_corrected = false;
        point.dem_cached = false;
        point.alt_smoothed = false;

        self.update(Invalidation::geometry(IndexRange::new(index, index)));
        Ok(())
    }

    /// Give a point the pinned weight so it is rendered at every zoom level
    pub fn pin_point(&mut self, id: PointId) -> bool {
        let pinned = self.config.pinned_weight;
        match self.index_of(id) {
            Some(index) => {
                self.points[index].weight = pinned;
                true
            }
            None => false,
        }
    }

    /// Return a pinned point to the weight the ladder gives it
    pub fn unpin_point(&mut self, id: PointId) -> bool {
        let base = self.config.base_weight;
        match self.index_of(id) {
            Some(index) => {
                self.points[index].weight = base;
                self.update(Invalidation {
                    weights: true,
                    ..Invalidation::none()
                });
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Altitude bookkeeping
    // ------------------------------------------------------------------

    /// Up to `limit` points whose altitude has not been resolved yet
    pub fn pending_altitudes(&self, limit: usize) -> Vec<(PointId, LatLng)> {
        self.points
            .iter()
            .filter(|p| !p.alt_corrected)
            .take(limit)
            .map(|p| (p.id, p.lat_lng()))
            .collect()
    }

    /// Points whose DEM tile has not been primed yet
    pub fn pending_dem(&self) -> Vec<(PointId, LatLng)> {
        self.points
            .iter()
            .filter(|p| !p.dem_cached)
            .map(|p| (p.id, p.lat_lng()))
            .collect()
    }

    /// Install resolved altitudes by point id
    ///
    /// Points deleted in the meantime are skipped, as are unusable values (non-finite, at or
    /// below the unknown-altitude sentinel, above [`MAX_ALTITUDE`]); those points stay pending.
    ///
    /// # Returns
    /// Number of points updated
    pub fn apply_altitudes(&mut self, altitudes: &[(PointId, f64)]) -> usize {
        let mut applied = 0;
        for &(id, alt) in altitudes {
            let Some(index) = self.index_of(id) else {
                continue;
            };
            if !is_valid_altitude(alt) {
                tracing::warn!("Ignoring altitude {} for point {}", alt, id);
                continue;
            }
            let point = &mut self.points[index];
            point.alt = Some(alt);
            point.smooth_alt = Some(alt);
            point.alt_corrected = true;
            point.alt_smoothed = false;
            applied += 1;
        }

        if applied > 0 {
            self.update(Invalidation::altitude());
        }
        applied
    }

    /// Mark points whose DEM tile has been primed
    pub fn mark_dem_cached(&mut self, ids: &[PointId]) -> usize {
        let mut marked = 0;
        for id in ids {
            if let Some(index) = self.index_of(*id) {
                self.points[index].dem_cached = true;
                marked += 1;
            }
        }
        marked
    }

    // ------------------------------------------------------------------
    // Distance queries
    // ------------------------------------------------------------------

    /// Location at a route distance
    ///
    /// Distances before the start or past the end are reflected through that endpoint, up to
    /// one full route length; further out the query fails.
    pub fn location_at(&self, distance: f64) -> Result<Location> {
        let total = self.total_distance();
        let last = self.points.len() - 1;

        let (target, anchor) = if distance < 0.0 {
            (-distance, Some(0))
        } else if distance > total {
            (2.0 * total - distance, Some(last))
        } else {
            (distance, None)
        };

        if !(0.0..=total).contains(&target) {
            return Err(GeometryError::DistanceOutOfRange { distance, total });
        }

        let mut location = self.interpolate(target);
        location.distance = distance;
        if let Some(anchor) = anchor {
            let pivot = &self.points[anchor];
            location.lat = 2.0 * pivot.lat - location.lat;
            location.lng = 2.0 * pivot.lng - location.lng;
            location.is_mirror = true;
        }
        Ok(location)
    }

    /// Heading in degrees (clockwise from north) of the route around `distance`
    pub fn heading_at(&self, distance: f64) -> Result<f64> {
        let total = self.total_distance();
        if total <= 0.0 {
            return Err(GeometryError::DistanceOutOfRange { distance, total });
        }
        let span = HEADING_SPAN_METERS.min(total / 2.0);
        let from = self.location_at(distance - span)?;
        let to = self.location_at(distance + span)?;
        Ok(geodesic::bearing(from.lat, from.lng, to.lat, to.lng))
    }

    /// Interpolate along the route; `distance` must lie within `[0, total]`
    fn interpolate(&self, distance: f64) -> Location {
        let upper = self
            .points
            .partition_point(|p| p.route_distance <= distance);

        if upper == 0 || upper >= self.points.len() {
            let index = upper.saturating_sub(1).min(self.points.len() - 1);
            let point = &self.points[index];
            return Location {
                lat: point.lat,
                lng: point.lng,
                alt: point.smooth_alt,
                index,
                distance,
                is_mirror: false,
            };
        }

        let a = &self.points[upper - 1];
        let b = &self.points[upper];
        let span = b.route_distance - a.route_distance;
        let t = if span > 0.0 {
            (distance - a.route_distance) / span
        } else {
            0.0
        };
        let alt = match (a.smooth_alt, b.smooth_alt) {
            (Some(from), Some(to)) => Some(from + (to - from) * t),
            (from, to) => from.or(to),
        };

        Location {
            lat: a.lat + (b.lat - a.lat) * t,
            lng: a.lng + (b.lng - a.lng) * t,
            alt,
            index: upper - 1,
            distance,
            is_mirror: false,
        }
    }
}
