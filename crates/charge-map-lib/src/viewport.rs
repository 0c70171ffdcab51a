//! The visible map region as reported by the map widget

use crate::utils;
use geo::{Coord, Rect};

/// A bounding box in WGS84 degrees plus a zoom level.
///
/// Produced by the map widget on every pan/zoom frame. A viewport that has
/// not been initialized yet (or that the widget reports with inverted or
/// non-finite bounds) is treated as "nothing visible", never as an error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(west: f64, south: f64, east: f64, north: f64, zoom: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
            zoom,
        }
    }

    /// A viewport covering the whole Web Mercator world.
    pub fn world(zoom: f64) -> Self {
        Self::new(
            -180.0,
            -utils::MAX_LATITUDE,
            180.0,
            utils::MAX_LATITUDE,
            zoom,
        )
    }

    /// The bounding box projected to Web Mercator meters, or `None` when the
    /// box is degenerate. Antimeridian-wrapping boxes (west > east) are also
    /// rejected here; the map widget this crate is paired with never emits
    /// them.
    pub(crate) fn mercator_rect(&self) -> Option<Rect<f64>> {
        let finite = [self.west, self.south, self.east, self.north, self.zoom]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.west > self.east || self.south > self.north || self.zoom < 0.0 {
            return None;
        }

        let min = utils::wgs84_to_mercator(self.south, self.west);
        let max = utils::wgs84_to_mercator(self.north, self.east);
        Some(Rect::new(
            Coord {
                x: min.x(),
                y: min.y(),
            },
            Coord {
                x: max.x(),
                y: max.y(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_viewport_projects() {
        let viewport = Viewport::new(76.9, 28.4, 77.5, 28.9, 11.0);
        let rect = viewport.mercator_rect().unwrap();
        assert!(rect.width() > 0.0);
        assert!(rect.height() > 0.0);
    }

    #[test]
    fn test_inverted_bounds_are_degenerate() {
        assert!(
            Viewport::new(77.5, 28.4, 76.9, 28.9, 11.0)
                .mercator_rect()
                .is_none()
        );
        assert!(
            Viewport::new(76.9, 28.9, 77.5, 28.4, 11.0)
                .mercator_rect()
                .is_none()
        );
    }

    #[test]
    fn test_non_finite_bounds_are_degenerate() {
        assert!(
            Viewport::new(f64::NAN, 28.4, 77.5, 28.9, 11.0)
                .mercator_rect()
                .is_none()
        );
        assert!(
            Viewport::new(76.9, 28.4, 77.5, 28.9, f64::NEG_INFINITY)
                .mercator_rect()
                .is_none()
        );
    }

    #[test]
    fn test_negative_zoom_is_degenerate() {
        assert!(
            Viewport::new(76.9, 28.4, 77.5, 28.9, -1.0)
                .mercator_rect()
                .is_none()
        );
    }

    #[test]
    fn test_world_viewport_spans_mercator_square() {
        let rect = Viewport::world(3.0).mercator_rect().unwrap();
        assert!((rect.min().x - utils::MERCATOR_MIN).abs() < 1.0);
        assert!((rect.max().x - utils::MERCATOR_MAX).abs() < 1.0);
    }
}
