//! Elevation profile rasterization
//!
//! Altitude samples are treated as a piecewise-linear function of distance. Each bucket of the
//! output receives the mean of that function over its width, computed exactly as the sum of the
//! trapezoid areas overlapping the bucket.
//!
//! # Architecture
//!
//! - [`rasterize`]: fixed number of equal-width buckets over the whole sample range, one pass
//!   over segments with each segment visiting only the buckets it overlaps
//! - [`CourseBands`]: lazy iterator of fixed-width bands over the course (BRM) distance of a
//!   route, also tracking raw min/max altitude; a point cursor persists between bands so a full
//!   profile is a single linear pass
//!
//! # Performance Characteristics
//!
//! Both modes are O(N + B) for N samples and B buckets.

use crate::{GeometryError, Result, Route, RoutePoint};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Segments narrower than this, in bucket units, contribute nothing
const DEGENERATE_WIDTH: f64 = 1e-6;

/// One altitude sample at a distance along the route
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProfileSample {
    pub distance: f64,
    pub altitude: f64,
}

impl ProfileSample {
    pub fn new(distance: f64, altitude: f64) -> Self {
        Self { distance, altitude }
    }
}

/// Output of [`rasterize`]: distance span and mean altitude of one bucket
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProfileBucket {
    pub begin: f64,
    pub end: f64,
    pub mean: f64,
}

/// Output of [`CourseBands`]
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProfileBand {
    /// Course distance at the start of the band in meters
    pub begin: f64,
    /// Course distance at the end of the band in meters
    pub end: f64,
    /// Mean smoothed altitude, `None` when no segment with known altitude covers the band
    pub mean: Option<f64>,
    /// Lowest raw altitude observed in the band
    pub min: Option<f64>,
    /// Highest raw altitude observed in the band
    pub max: Option<f64>,
}

/// Rasterize `samples` into `bucket_count` equal-width buckets
///
/// The first sample maps to the start of bucket 0 and the last sample to the end of the last
/// bucket. Samples must be ordered by non-decreasing distance and span a positive distance.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn rasterize(samples: &[ProfileSample], bucket_count: usize) -> Result<Vec<ProfileBucket>> {
    if bucket_count == 0 {
        return Err(GeometryError::InvalidProfile(
            "bucket count must be positive".to_string(),
        ));
    }
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return Err(GeometryError::InvalidProfile("no samples".to_string()));
    };
    let span = last.distance - first.distance;
    if samples.len() < 2 || !(span > 0.0) {
        return Err(GeometryError::InvalidProfile(format!(
            "samples must span a positive distance, got {span}"
        )));
    }
    if samples.windows(2).any(|w| w[1].distance < w[0].distance) {
        return Err(GeometryError::InvalidProfile(
            "sample distances must be non-decreasing".to_string(),
        ));
    }

    let buckets = bucket_count as f64;
    let scale = buckets / span;
    let mut sums = vec![0.0; bucket_count];

    for pair in samples.windows(2) {
        let xa = (pair[0].distance - first.distance) * scale;
        let xb = (pair[1].distance - first.distance) * scale;
        if xb - xa < DEGENERATE_WIDTH {
            continue;
        }
        let (ya, yb) = (pair[0].altitude, pair[1].altitude);
        let at = |x: f64| ya + (yb - ya) * (x - xa) / (xb - xa);

        let start = (xa.floor() as usize).min(bucket_count - 1);
        let stop = (xb.ceil() as usize).min(bucket_count);
        for (px, sum) in sums.iter_mut().enumerate().take(stop).skip(start) {
            let lo = xa.max(px as f64);
            let hi = xb.min(px as f64 + 1.0);
            let width = hi - lo;
            if width < DEGENERATE_WIDTH {
                continue;
            }
            *sum += width * (at(lo) + at(hi)) / 2.0;
        }
    }

    let bucket_width = span / buckets;
    Ok(sums
        .into_iter()
        .enumerate()
        .map(|(px, mean)| {
            let begin = first.distance + px as f64 * bucket_width;
            ProfileBucket {
                begin,
                end: begin + bucket_width,
                mean,
            }
        })
        .collect())
}

/// Fixed-width bands over the course distance of a route
///
/// Created by [`Route::course_bands`].
#[derive(Clone, Debug)]
pub struct CourseBands<'a> {
    points: &'a [RoutePoint],
    bucket_width: f64,
    total: f64,
    band: usize,
    /// Index of the first segment that may still overlap a coming band
    cursor: usize,
}

impl<'a> CourseBands<'a> {
    fn new(points: &'a [RoutePoint], bucket_width: f64) -> Result<Self> {
        if !(bucket_width > 0.0) {
            return Err(GeometryError::InvalidProfile(format!(
                "band width must be positive, got {bucket_width}"
            )));
        }
        let total = points.last().map_or(0.0, |p| p.brm_distance);
        Ok(Self {
            points,
            bucket_width,
            total,
            band: 0,
            cursor: 0,
        })
    }
}

impl Iterator for CourseBands<'_> {
    type Item = ProfileBand;

    fn next(&mut self) -> Option<Self::Item> {
        let begin = self.band as f64 * self.bucket_width;
        if begin >= self.total {
            return None;
        }
        let end = (begin + self.bucket_width).min(self.total);
        let min_width = self.bucket_width * DEGENERATE_WIDTH;

        let mut area = 0.0;
        let mut covered = 0.0;
        let mut min: Option<f64> = None;
        let mut max: Option<f64> = None;
        let mut observe = |alt: Option<f64>| {
            if let Some(alt) = alt {
                min = Some(min.map_or(alt, |m: f64| m.min(alt)));
                max = Some(max.map_or(alt, |m: f64| m.max(alt)));
            }
        };

        let mut index = self.cursor;
        while index + 1 < self.points.len() && self.points[index].brm_distance < end {
            let a = &self.points[index];
            let b = &self.points[index + 1];
            let lo = a.brm_distance.max(begin);
            let hi = b.brm_distance.min(end);

            if hi - lo >= min_width {
                if a.brm_distance >= begin {
                    observe(a.alt);
                }
                if b.brm_distance <= end {
                    observe(b.alt);
                }
                if let (Some(ya), Some(yb)) = (a.smooth_alt, b.smooth_alt) {
                    let run = b.brm_distance - a.brm_distance;
                    let at = |x: f64| ya + (yb - ya) * (x - a.brm_distance) / run;
                    area += (hi - lo) * (at(lo) + at(hi)) / 2.0;
                    covered += hi - lo;
                }
            }

            if b.brm_distance > end {
                break;
            }
            index += 1;
        }
        self.cursor = index;
        self.band += 1;

        Some(ProfileBand {
            begin,
            end,
            mean: (covered > 0.0).then(|| area / covered),
            min,
            max,
        })
    }
}

impl Route {
    /// `(route distance, smoothed altitude)` for every point with a known altitude
    pub fn profile_samples(&self) -> Vec<ProfileSample> {
        self.points
            .iter()
            .filter_map(|p| p.smooth_alt.map(|alt| ProfileSample::new(p.route_distance, alt)))
            .collect()
    }

    /// Mean smoothed altitude over `bucket_count` equal slices of the route
    pub fn elevation_profile(&self, bucket_count: usize) -> Result<Vec<ProfileBucket>> {
        rasterize(&self.profile_samples(), bucket_count)
    }

    /// Bands of `bucket_width` meters of course distance; excluded sections take no space
    pub fn course_bands(&self, bucket_width: f64) -> Result<CourseBands<'_>> {
        CourseBands::new(&self.points, bucket_width)
    }
}
