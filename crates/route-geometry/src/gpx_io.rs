//! GPX import and export
//!
//! Track segments are concatenated in document order; files without tracks fall back to their
//! first route element.

use crate::{EngineConfig, GeometryError, LatLng, PathPoint, Result, Route};
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Read and parse a GPX file
pub fn read_gpx<P: AsRef<Path>>(path: P) -> Result<Gpx> {
    let file = File::open(path.as_ref())?;
    let reader = BufReader::new(file);
    Ok(gpx::read(reader)?)
}

/// Write a GPX document to a file
pub fn write_gpx<P: AsRef<Path>>(path: P, document: &Gpx) -> Result<()> {
    let file = File::create(path.as_ref())?;
    gpx::write(document, BufWriter::new(file))?;
    Ok(())
}

fn path_from_waypoints<'a>(waypoints: impl Iterator<Item = &'a Waypoint>) -> Vec<PathPoint> {
    let mut path = Vec::new();
    for waypoint in waypoints {
        let point = waypoint.point();
        let (lat, lng) = (point.y(), point.x());
        if !LatLng::new(lat, lng).is_valid() {
            tracing::warn!("Skipping point with invalid position: ({}, {})", lat, lng);
            continue;
        }
        path.push(PathPoint {
            lat,
            lng,
            alt: waypoint.elevation,
        });
    }
    path
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Route {
    /// Create a route from a parsed GPX document
    pub fn from_gpx(document: &Gpx, config: EngineConfig) -> Result<Self> {
        let track_points = document
            .tracks
            .iter()
            .flat_map(|track| &track.segments)
            .flat_map(|segment| &segment.points);
        let mut path = path_from_waypoints(track_points);

        if path.is_empty() {
            if let Some(route) = document.routes.first() {
                path = path_from_waypoints(route.points.iter());
            }
        }
        if path.is_empty() {
            return Err(GeometryError::EmptyRoute);
        }

        Self::from_path(path, config)
    }

    /// Export the route as a single-track GPX 1.1 document
    ///
    /// Raw altitudes are written; unknown altitudes are omitted.
    pub fn to_gpx(&self, name: Option<&str>) -> Gpx {
        let mut segment = TrackSegment::default();
        segment.points = self
            .points
            .iter()
            .map(|p| {
                let mut waypoint = Waypoint::new(geo::Point::new(p.lng, p.lat));
                waypoint.elevation = p.alt;
                waypoint
            })
            .collect();

        let mut track = Track::default();
        track.name = name.map(str::to_string);
        track.segments.push(segment);

        let mut document = Gpx::default();
        document.version = GpxVersion::Gpx11;
        document.creator = Some(env!("CARGO_PKG_NAME").to_string());
        document.tracks.push(track);
        document
    }
}
