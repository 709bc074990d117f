//! Small geodesy helpers. Coordinates are (longitude, latitude) in degrees,
//! distances in kilometres.

use crate::global_variables::EARTH_RADIUS_KM;

/// Kilometres per degree of latitude.
pub const KM_PER_DEGREE: f64 = 111.32;

/// Great-circle distance between two points.
pub fn haversine_km(lng1: f64, lat1: f64, lng2: f64, lat2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Distance from point P to the segment A-B.
///
/// Works in a local equirectangular projection centred on P, which is accurate
/// for road-sized segments. The projection parameter is clamped so points past
/// either end measure to the nearest endpoint.
pub fn point_to_segment_km(
    p_lng: f64,
    p_lat: f64,
    a_lng: f64,
    a_lat: f64,
    b_lng: f64,
    b_lat: f64,
) -> f64 {
    let kx = KM_PER_DEGREE * p_lat.to_radians().cos();
    let ky = KM_PER_DEGREE;

    let (ax, ay) = ((a_lng - p_lng) * kx, (a_lat - p_lat) * ky);
    let (bx, by) = ((b_lng - p_lng) * kx, (b_lat - p_lat) * ky);
    let (dx, dy) = (bx - ax, by - ay);

    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return (ax * ax + ay * ay).sqrt();
    }

    // P sits at the origin.
    let t = (-(ax * dx + ay * dy) / len_sq).clamp(0.0, 1.0);
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    (cx * cx + cy * cy).sqrt()
}

/// Bearing from A to B in degrees, 0 = north, clockwise, in `[0, 360)`.
pub fn bearing_deg(a_lng: f64, a_lat: f64, b_lng: f64, b_lat: f64) -> f64 {
    let d_lng = (b_lng - a_lng) * a_lat.to_radians().cos();
    let d_lat = b_lat - a_lat;
    let deg = d_lng.atan2(d_lat).to_degrees();
    if deg < 0.0 {
        deg + 360.0
    } else {
        deg
    }
}

/// Point reached from (lng, lat) after `distance_km` along `bearing` degrees.
pub fn destination(lng: f64, lat: f64, bearing: f64, distance_km: f64) -> (f64, f64) {
    let rad = bearing.to_radians();
    let d_lat = distance_km * rad.cos() / KM_PER_DEGREE;
    let cos_lat = lat.to_radians().cos().max(1e-6);
    let d_lng = distance_km * rad.sin() / (KM_PER_DEGREE * cos_lat);
    (lng + d_lng, lat + d_lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_one_degree_of_latitude() {
        let d = haversine_km(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111.19).abs() < 0.05, "got {d}");
        assert_eq!(haversine_km(10.0, 10.0, 10.0, 10.0), 0.0);
    }

    #[test]
    fn point_beside_segment_measures_perpendicular() {
        // Segment along the equator, point 0.01 deg north of its middle.
        let d = point_to_segment_km(0.5, 0.01, 0.0, 0.0, 1.0, 0.0);
        assert!((d - 1.1132).abs() < 0.001, "got {d}");
    }

    #[test]
    fn point_past_the_end_measures_to_endpoint() {
        let d = point_to_segment_km(2.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        assert!((d - KM_PER_DEGREE).abs() < 0.01, "got {d}");
    }

    #[test]
    fn degenerate_segment_is_a_point() {
        let d = point_to_segment_km(0.0, 0.01, 0.0, 0.0, 0.0, 0.0);
        assert!((d - 1.1132).abs() < 0.001);
    }

    #[test]
    fn bearings_cover_the_compass() {
        assert!((bearing_deg(0.0, 0.0, 0.0, 1.0) - 0.0).abs() < 1e-9);
        assert!((bearing_deg(0.0, 0.0, 1.0, 0.0) - 90.0).abs() < 1e-9);
        assert!((bearing_deg(0.0, 0.0, 0.0, -1.0) - 180.0).abs() < 1e-9);
        assert!((bearing_deg(0.0, 0.0, -1.0, 0.0) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn destination_moves_along_bearing() {
        let (lng, lat) = destination(116.4, 39.9, 0.0, KM_PER_DEGREE);
        assert!((lat - 40.9).abs() < 1e-9);
        assert!((lng - 116.4).abs() < 1e-9);
        let (lng, _) = destination(116.4, 39.9, 90.0, 1.0);
        assert!(lng > 116.4);
    }
}
