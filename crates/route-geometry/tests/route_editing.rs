//! End-to-end editing session over the public API

use route_geometry::{
    EngineConfig, GeometryError, LatLng, PartKind, PathPoint, PolylineCodec, Route, profile,
};

/// Eleven points heading east along 35°N, altitudes rising then falling
fn encoded_course() -> String {
    let path: Vec<PathPoint> = (0..11)
        .map(|i| {
            let alt = 100.0 + 2.0 * (5.0 - (i as f64 - 5.0).abs());
            PathPoint::with_alt(35.0, 139.0 + i as f64 * 0.0011, alt)
        })
        .collect();
    PolylineCodec::default().encode(&path).unwrap()
}

fn load() -> Route {
    Route::from_encoded(&encoded_course(), EngineConfig::default()).unwrap()
}

#[test]
fn test_import_computes_derived_data() {
    let route = load();
    assert_eq!(route.len(), 11);
    // 0.011 degrees of longitude at 35°N is about 1 km
    assert!((route.total_distance() - 1004.0).abs() < 10.0, "{}", route.total_distance());
    assert_eq!(route.brm_distance(), route.total_distance());
    assert!(route.points().iter().all(|p| p.is_alt_smoothed()));

    let (ascent, descent) = route.ascent_descent();
    assert!((ascent - 10.0).abs() < 1e-6);
    assert!((descent - 10.0).abs() < 1e-6);
}

#[test]
fn test_exclusion_shortens_course_only() {
    let mut route = load();
    let total = route.total_distance();

    let widened = route.set_exclude(4, 5).unwrap();
    assert_eq!((widened.begin, widened.end), (4, 5));
    assert_eq!(route.total_distance(), total);

    let points = route.points();
    let skipped = points[6].route_distance() - points[3].route_distance();
    assert!((route.brm_distance() - (total - skipped)).abs() < 1e-6);

    let parts = route.excluded_ranges();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].kind, PartKind::Excluded);
    assert_eq!((parts[0].range.begin, parts[0].range.end), (3, 6));
    let context = parts[0].get_boundary_context(&route);
    assert_eq!(context.prev_point.unwrap().id(), route.point(2).unwrap().id());

    route.restore_exclude(4, 5).unwrap();
    assert!((route.brm_distance() - total).abs() < 1e-6);
    assert!(route.excluded_ranges().is_empty());
}

#[test]
fn test_detour_keeps_cue_references() {
    let mut route = load();
    route.set_edit_range(2, 8).unwrap();

    // Cue points refer to route points by id
    let cue_start = route.point(3).unwrap().id();
    let cue_end = route.point(7).unwrap().id();
    let total = route.total_distance();

    let start = route.point(3).unwrap().lat_lng();
    let end = route.point(7).unwrap().lat_lng();
    let detour = vec![
        PathPoint::new(start.lat, start.lng),
        PathPoint::new(35.002, 139.0040),
        PathPoint::new(35.003, 139.0055),
        PathPoint::new(35.002, 139.0070),
        PathPoint::new(end.lat, end.lng),
    ];
    let outcome = route.subpath_replace(3, 7, &detour).unwrap();
    assert_eq!(outcome.reused, 2);
    assert_eq!(outcome.inserted, 3);
    assert_eq!(outcome.removed.len(), 3);

    assert_eq!(route.index_of(cue_start), Some(3));
    assert_eq!(route.index_of(cue_end), Some(7));
    assert!(route.total_distance() > total);

    let editable: Vec<PartKind> = route.editable_ranges().iter().map(|p| p.kind).collect();
    assert_eq!(
        editable,
        vec![PartKind::BeforeEdit, PartKind::Editable, PartKind::AfterEdit]
    );
    // Fresh points need altitude from the elevation service
    assert_eq!(route.pending_altitudes(100).len(), route.len());
    assert!(route.point(4).unwrap().alt().is_none());
}

#[test]
fn test_snapshot_round_trip_after_edits() {
    let mut route = load();
    route.set_exclude(7, 8).unwrap();
    route.move_point(2, LatLng::new(35.0005, 139.0022)).unwrap();
    let id = route.point(5).unwrap().id();
    route.pin_point(id);

    let snapshot = route.pack().unwrap();
    let restored = Route::unpack(&snapshot, EngineConfig::default()).unwrap();
    assert_eq!(restored.len(), route.len());
    assert_eq!(restored.point(5).unwrap().weight(), 20);
    let flags = |r: &Route| r.points().iter().map(|p| p.is_excluded()).collect::<Vec<_>>();
    assert_eq!(flags(&restored), flags(&route));
    assert!((restored.brm_distance() - route.brm_distance()).abs() < 5.0);

    // Repacking the restored route gives the same snapshot
    assert_eq!(restored.pack().unwrap(), snapshot);
}

#[test]
fn test_profile_over_route() {
    let route = load();
    let buckets = route.elevation_profile(10).unwrap();
    assert_eq!(buckets.len(), 10);
    // Mean over the first tenth of a 2 m per point ramp starting at 100 m
    assert!((buckets[0].mean - 101.0).abs() < 0.1);
    assert!((buckets[9].mean - 101.0).abs() < 0.1);

    let peak = buckets
        .iter()
        .map(|b| b.mean)
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(peak < 110.0 && peak > 108.0);

    let bands: Vec<_> = route.course_bands(250.0).unwrap().collect();
    assert_eq!(bands.len(), 5);
    assert_eq!(bands.iter().filter_map(|b| b.max).fold(0.0, f64::max), 110.0);

    let ramp = [
        profile::ProfileSample::new(0.0, 0.0),
        profile::ProfileSample::new(100.0, 100.0),
    ];
    let halves = profile::rasterize(&ramp, 2).unwrap();
    assert!((halves[0].mean - 25.0).abs() < 1e-9);
    assert!((halves[1].mean - 75.0).abs() < 1e-9);
}

#[test]
fn test_mirrored_locations() {
    let route = load();
    let total = route.total_distance();

    let before = route.location_at(-50.0).unwrap();
    assert!(before.is_mirror);
    assert!(before.lng < 139.0);

    let after = route.location_at(total + 50.0).unwrap();
    assert!(after.is_mirror);
    assert!(after.lng > route.point(10).unwrap().lng());

    let inside = route.location_at(total * 0.55).unwrap();
    assert!(!inside.is_mirror);
    assert_eq!(inside.index, 5);

    let err = route.location_at(-(total + 50.0)).unwrap_err();
    assert!(matches!(err, GeometryError::DistanceOutOfRange { .. }));
}

#[test]
fn test_invalid_edits_leave_route_untouched() {
    let mut route = load();
    let snapshot = route.pack().unwrap();

    assert!(route.set_exclude(6, 2).is_err());
    assert!(route.set_exclude(0, 11).is_err());
    assert!(route.set_edit_range(3, 20).is_err());
    assert!(route.subpath_replace(5, 4, &[]).is_err());
    assert!(route.set_points("~").is_err());
    assert!(route.move_point(11, LatLng::new(0.0, 0.0)).is_err());

    assert_eq!(route.pack().unwrap(), snapshot);
}
