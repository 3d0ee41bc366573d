//! Index ranges and the derived route parts used for rendering
//!
//! Excluded and editable sections are never stored: they are recomputed from the point flags
//! on every query, so callers must treat the returned parts as a snapshot.

use crate::{GeometryError, Result, Route, RoutePoint};

/// Inclusive range of point indices
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexRange {
    pub begin: usize,
    pub end: usize,
}

impl IndexRange {
    pub fn new(begin: usize, end: usize) -> Self {
        Self { begin, end }
    }

    /// Check that the range is ordered and lies within a route of `len` points
    pub fn validate(self, len: usize) -> Result<Self> {
        if self.begin > self.end || self.end >= len {
            return Err(GeometryError::InvalidRange {
                begin: self.begin,
                end: self.end,
                len,
            });
        }
        Ok(self)
    }

    /// Number of points covered
    #[inline]
    pub fn len(&self) -> usize {
        self.end + 1 - self.begin
    }

    /// Inclusive ranges always hold at least one point
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        (self.begin..=self.end).contains(&index)
    }
}

/// What a route part represents
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartKind {
    /// Contiguous exclusion block, widened by one boundary point on each side
    Excluded,
    /// Non-editable points before the editable window
    BeforeEdit,
    /// The editable window
    Editable,
    /// Non-editable points after the editable window
    AfterEdit,
}

/// A contiguous slice of the route produced by a range query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoutePart {
    pub kind: PartKind,
    pub range: IndexRange,
}

/// Boundary context for rendering continuous lines
#[derive(Debug)]
pub struct BoundaryContext<'a> {
    /// Point immediately before this part (if exists)
    pub prev_point: Option<&'a RoutePoint>,
    /// Point immediately after this part (if exists)
    pub next_point: Option<&'a RoutePoint>,
}

impl RoutePart {
    pub fn new(kind: PartKind, range: IndexRange) -> Self {
        Self { kind, range }
    }

    /// Points of this part
    pub fn points<'a>(&self, route: &'a Route) -> &'a [RoutePoint] {
        route
            .points()
            .get(self.range.begin..=self.range.end)
            .unwrap_or(&[])
    }

    /// Get the point immediately before this part (if exists)
    pub fn get_prev_point<'a>(&self, route: &'a Route) -> Option<&'a RoutePoint> {
        if self.range.begin == 0 {
            return None;
        }
        route.points().get(self.range.begin - 1)
    }

    /// Get the point immediately after this part (if exists)
    pub fn get_next_point<'a>(&self, route: &'a Route) -> Option<&'a RoutePoint> {
        route.points().get(self.range.end + 1)
    }

    /// Get boundary context for continuous rendering
    pub fn get_boundary_context<'a>(&self, route: &'a Route) -> BoundaryContext<'a> {
        BoundaryContext {
            prev_point: self.get_prev_point(route),
            next_point: self.get_next_point(route),
        }
    }

    /// Get all points including boundary context for rendering
    pub fn get_points_with_context<'a>(&self, route: &'a Route) -> Vec<&'a RoutePoint> {
        let mut points = Vec::with_capacity(self.range.len() + 2);
        points.extend(self.get_prev_point(route));
        points.extend(self.points(route));
        points.extend(self.get_next_point(route));
        points
    }
}

/// Contiguous exclusion blocks, each widened by one point in either direction
///
/// The widening makes an excluded polyline meet the included one at a shared vertex.
pub(crate) fn excluded_ranges(points: &[RoutePoint]) -> Vec<IndexRange> {
    let last = points.len().saturating_sub(1);
    let mut ranges = Vec::new();
    let mut block_start: Option<usize> = None;

    for (index, point) in points.iter().enumerate() {
        match (point.excluded, block_start) {
            (true, None) => block_start = Some(index),
            (false, Some(start)) => {
                ranges.push(IndexRange::new(start.saturating_sub(1), index));
                block_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = block_start {
        ranges.push(IndexRange::new(start.saturating_sub(1), last));
    }

    ranges
}

/// Split the route into before / editable / after parts, omitting empty ones
///
/// Without an editable window the whole route is returned as a single `BeforeEdit` part.
pub(crate) fn editable_ranges(points: &[RoutePoint]) -> Vec<RoutePart> {
    if points.is_empty() {
        return Vec::new();
    }
    let last = points.len() - 1;

    let window = points
        .iter()
        .position(|p| p.editable)
        .zip(points.iter().rposition(|p| p.editable));

    let Some((begin, end)) = window else {
        return vec![RoutePart::new(PartKind::BeforeEdit, IndexRange::new(0, last))];
    };

    let mut parts = Vec::with_capacity(3);
    if begin > 0 {
        parts.push(RoutePart::new(
            PartKind::BeforeEdit,
            IndexRange::new(0, begin - 1),
        ));
    }
    parts.push(RoutePart::new(PartKind::Editable, IndexRange::new(begin, end)));
    if end < last {
        parts.push(RoutePart::new(
            PartKind::AfterEdit,
            IndexRange::new(end + 1, last),
        ));
    }
    parts
}
