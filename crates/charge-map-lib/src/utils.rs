//! Coordinate conversions and zoom arithmetic shared across the crate

use geo::Point;

/// Web Mercator easting/northing bounds in meters (EPSG:3857)
pub const MERCATOR_MAX: f64 = 20037508.34;
pub const MERCATOR_MIN: f64 = -20037508.34;
pub const WORLD_SIZE_METERS: f64 = MERCATOR_MAX - MERCATOR_MIN;

/// Latitude beyond which Web Mercator is undefined
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Project WGS84 (lat, lon) degrees to Web Mercator (x, y) meters.
///
/// Latitude is clamped to the representable range, matching what map
/// renderers do with near-polar coordinates.
#[inline(always)]
pub fn wgs84_to_mercator(lat: f64, lon: f64) -> Point<f64> {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = lon / 180.0 * MERCATOR_MAX;
    let lat_rad = lat.to_radians();
    let y = (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI * MERCATOR_MAX;
    Point::new(x, y)
}

/// Unproject Web Mercator (x, y) meters back to WGS84 (lat, lon) degrees.
#[inline(always)]
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = x / MERCATOR_MAX * 180.0;
    let lat = (std::f64::consts::FRAC_PI_2
        - 2.0 * (-y * std::f64::consts::PI / MERCATOR_MAX).exp().atan())
    .to_degrees();
    (lat, lon)
}

/// Ground resolution in meters per screen pixel at a given zoom level.
///
/// At zoom `z` the world is `2^z` tiles wide, each `tile_size` pixels.
#[inline(always)]
pub fn meters_per_pixel(zoom: f64, tile_size: u32) -> f64 {
    WORLD_SIZE_METERS / (tile_size as f64 * 2f64.powf(zoom))
}

/// Check that a projected point landed inside the Web Mercator square.
#[inline(always)]
pub fn is_valid_mercator(point: &Point<f64>) -> bool {
    let (x, y) = (point.x(), point.y());
    (MERCATOR_MIN..=MERCATOR_MAX).contains(&x) && (MERCATOR_MIN..=MERCATOR_MAX).contains(&y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_origin() {
        let point = wgs84_to_mercator(0.0, 0.0);
        assert!(point.x().abs() < 0.01);
        assert!(point.y().abs() < 0.01);
    }

    #[test]
    fn test_projection_bounds() {
        let west = wgs84_to_mercator(0.0, -180.0);
        assert!((west.x() - MERCATOR_MIN).abs() < 1.0);

        let east = wgs84_to_mercator(0.0, 180.0);
        assert!((east.x() - MERCATOR_MAX).abs() < 1.0);
    }

    #[test]
    fn test_projection_roundtrip() {
        // Connaught Place, New Delhi
        let lat = 28.6315;
        let lon = 77.2167;

        let mercator = wgs84_to_mercator(lat, lon);
        let (lat2, lon2) = mercator_to_wgs84(mercator.x(), mercator.y());

        assert!((lat - lat2).abs() < 0.0001);
        assert!((lon - lon2).abs() < 0.0001);
    }

    #[test]
    fn test_polar_latitude_is_clamped() {
        let point = wgs84_to_mercator(90.0, 0.0);
        assert!(is_valid_mercator(&point));
    }

    #[test]
    fn test_meters_per_pixel_halves_per_zoom_level() {
        let z10 = meters_per_pixel(10.0, 256);
        let z11 = meters_per_pixel(11.0, 256);
        assert!((z10 / z11 - 2.0).abs() < 1e-9);

        // Well-known value: ~152.87 m/px at zoom 10 with 256 px tiles
        assert!((z10 - 152.87).abs() < 0.01);
    }

    #[test]
    fn test_is_valid_mercator() {
        assert!(is_valid_mercator(&Point::new(0.0, 0.0)));
        assert!(is_valid_mercator(&Point::new(MERCATOR_MAX, MERCATOR_MAX)));
        assert!(!is_valid_mercator(&Point::new(MERCATOR_MAX + 1.0, 0.0)));
    }
}
