//! Ellipsoidal surface distance (Hubeny's formula on WGS84)
//!
//! Accurate to well under 0.1% for the point spacing of a GPS route and still usable for
//! national-scale distances, at the cost of a few trigonometric calls per pair.

/// WGS84 semi-major axis in meters
pub const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// WGS84 flattening
pub const FLATTENING: f64 = 1.0 / 298.257_223_563;

/// WGS84 semi-minor axis in meters
pub const SEMI_MINOR_AXIS: f64 = SEMI_MAJOR_AXIS * (1.0 - FLATTENING);

/// First eccentricity squared: (a² - b²) / a²
const ECCENTRICITY_SQ: f64 = (SEMI_MAJOR_AXIS * SEMI_MAJOR_AXIS
    - SEMI_MINOR_AXIS * SEMI_MINOR_AXIS)
    / (SEMI_MAJOR_AXIS * SEMI_MAJOR_AXIS);

/// Meridian radius numerator: a (1 - e²)
const MERIDIAN_NUMERATOR: f64 = SEMI_MAJOR_AXIS * (1.0 - ECCENTRICITY_SQ);

/// Surface distance in meters between two coordinates given in degrees
///
/// Symmetric and never negative.
#[inline]
pub fn distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let delta_lat = lat1 - lat2;
    let delta_lng = (lng1 - lng2).to_radians();
    let mean_lat = (lat1 + lat2) / 2.0;

    let sin_mean = mean_lat.sin();
    let w = (1.0 - ECCENTRICITY_SQ * sin_mean * sin_mean).sqrt();
    let meridian_radius = MERIDIAN_NUMERATOR / (w * w * w);
    let prime_vertical_radius = SEMI_MAJOR_AXIS / w;

    let north = delta_lat * meridian_radius;
    let east = delta_lng * prime_vertical_radius * mean_lat.cos();
    (north * north + east * east).sqrt()
}

/// Initial bearing in degrees clockwise from north, in `[0, 360)`
pub fn bearing(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let y = delta_lng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * delta_lng.cos();
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        assert_eq!(distance(35.0, 139.0, 35.0, 139.0), 0.0);
    }

    #[test]
    fn test_symmetric() {
        let a = distance(35.6581, 139.7017, 34.7025, 135.4959);
        let b = distance(34.7025, 135.4959, 35.6581, 139.7017);
        assert!((a - b).abs() < 1e-6);
    }

    #[test]
    fn test_one_degree_of_latitude_at_equator() {
        // Meridian arc of one degree at the equator is about 110.57 km on WGS84
        let d = distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 110_574.0).abs() < 150.0, "got {d}");
    }

    #[test]
    fn test_not_spherical() {
        // On an ellipsoid a degree of latitude is longer near the poles than at the equator
        let equator = distance(0.0, 0.0, 1.0, 0.0);
        let polar = distance(80.0, 0.0, 81.0, 0.0);
        assert!(polar > equator + 500.0);
    }

    #[test]
    fn test_tokyo_osaka() {
        // Tokyo station to Osaka station is roughly 403 km
        let d = distance(35.6812, 139.7671, 34.7025, 135.4959);
        assert!((d - 403_000.0).abs() < 3_000.0, "got {d}");
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        assert!((bearing(0.0, 0.0, 1.0, 0.0) - 0.0).abs() < 1e-9);
        assert!((bearing(0.0, 0.0, 0.0, 1.0) - 90.0).abs() < 1e-9);
        assert!((bearing(1.0, 0.0, 0.0, 0.0) - 180.0).abs() < 1e-9);
        assert!((bearing(0.0, 1.0, 0.0, 0.0) - 270.0).abs() < 1e-9);
    }
}
