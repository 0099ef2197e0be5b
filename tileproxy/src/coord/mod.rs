//! Coordinate conversion module
//!
//! Provides conversions between slippy-map tile indices, geographic bounds
//! and Web Mercator (EPSG:3857) bounding boxes, plus the XYZ/TMS row flip.

mod types;

pub use types::{
    BoundingBox, CoordError, LonLatBounds, Tile, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
    MIN_ZOOM,
};

use std::f64::consts::PI;

/// Earth radius used by the spherical Web Mercator projection, in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Converts between XYZ (top-left origin) and TMS (bottom-left origin) rows.
///
/// The conversion is its own inverse. `y` must be below `2^zoom`.
#[inline]
pub fn flip_y(y: u32, zoom: u8) -> u32 {
    (1u32 << zoom) - y - 1
}

/// Returns the geographic bounds of a tile.
#[inline]
pub fn tile_lonlat_bounds(zoom: u8, x: u32, y: u32) -> LonLatBounds {
    let n = 2.0_f64.powi(zoom as i32);

    LonLatBounds {
        west: col_to_lon(x as f64, n),
        south: row_to_lat(y as f64 + 1.0, n),
        east: col_to_lon(x as f64 + 1.0, n),
        north: row_to_lat(y as f64, n),
    }
}

/// Returns the Web Mercator bounding box of a tile in meters.
///
/// The tile's corners are computed in degrees with the standard slippy-map
/// formulas and then projected onto the sphere.
#[inline]
pub fn tile_bbox(zoom: u8, x: u32, y: u32) -> BoundingBox {
    let bounds = tile_lonlat_bounds(zoom, x, y);
    let (left, bottom) = lonlat_to_mercator(bounds.west, bounds.south);
    let (right, top) = lonlat_to_mercator(bounds.east, bounds.north);

    BoundingBox {
        left,
        bottom,
        right,
        top,
    }
}

/// Projects a longitude/latitude pair in degrees to Web Mercator meters.
#[inline]
pub fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

#[inline]
fn col_to_lon(col: f64, n: f64) -> f64 {
    col / n * 360.0 - 180.0
}

#[inline]
fn row_to_lat(row: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * row / n)).sinh().atan().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Half the circumference of the Web Mercator world, in meters.
    const ORIGIN_SHIFT: f64 = 20_037_508.342789244;

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!(
            (actual - expected).abs() < tolerance,
            "expected {} to be within {} of {}",
            actual,
            tolerance,
            expected
        );
    }

    #[test]
    fn test_world_tile_covers_mercator_extent() {
        let bbox = tile_bbox(0, 0, 0);

        assert_close(bbox.left, -ORIGIN_SHIFT, 1e-3);
        assert_close(bbox.right, ORIGIN_SHIFT, 1e-3);
        assert_close(bbox.bottom, -ORIGIN_SHIFT, 1e-3);
        assert_close(bbox.top, ORIGIN_SHIFT, 1e-3);
    }

    #[test]
    fn test_zoom_one_quadrants() {
        // North-west quadrant
        let nw = tile_bbox(1, 0, 0);
        assert_close(nw.left, -ORIGIN_SHIFT, 1e-3);
        assert_close(nw.right, 0.0, 1e-6);
        assert_close(nw.bottom, 0.0, 1e-6);
        assert_close(nw.top, ORIGIN_SHIFT, 1e-3);

        // South-east quadrant
        let se = tile_bbox(1, 1, 1);
        assert_close(se.left, 0.0, 1e-6);
        assert_close(se.right, ORIGIN_SHIFT, 1e-3);
        assert_close(se.bottom, -ORIGIN_SHIFT, 1e-3);
        assert_close(se.top, 0.0, 1e-6);
    }

    #[test]
    fn test_lonlat_bounds_of_world_tile() {
        let bounds = tile_lonlat_bounds(0, 0, 0);
        assert_close(bounds.west, -180.0, 1e-9);
        assert_close(bounds.east, 180.0, 1e-9);
        assert_close(bounds.north, MAX_LAT, 1e-6);
        assert_close(bounds.south, MIN_LAT, 1e-6);
    }

    #[test]
    fn test_flip_y_examples() {
        assert_eq!(flip_y(0, 0), 0);
        assert_eq!(flip_y(0, 1), 1);
        assert_eq!(flip_y(1, 1), 0);
        assert_eq!(flip_y(0, 3), 7);
        assert_eq!(flip_y(5, 3), 2);
    }

    #[test]
    fn test_validate_rejects_column_out_of_range() {
        let tile = Tile::new("demo", 3, 8, 0);
        assert_eq!(
            tile.validate(),
            Err(CoordError::InvalidX {
                x: 8,
                zoom: 3,
                max: 8
            })
        );
    }

    #[test]
    fn test_validate_accepts_last_tile() {
        let tile = Tile::new("demo", 3, 7, 7);
        assert!(tile.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_row_out_of_range() {
        let tile = Tile::new("demo", 0, 0, 1);
        assert!(matches!(tile.validate(), Err(CoordError::InvalidY { .. })));
    }

    #[test]
    fn test_validate_rejects_excessive_zoom() {
        let tile = Tile::new("demo", 31, 0, 0);
        assert_eq!(tile.validate(), Err(CoordError::InvalidZoom(31)));
    }

    #[test]
    fn test_with_provider_keeps_coordinates() {
        let tile = Tile::new("sea", 4, 3, 2);
        let other = tile.with_provider("base");
        assert_eq!(other.provider, "base");
        assert_eq!((other.z, other.x, other.y), (4, 3, 2));
        assert_eq!(tile.provider, "sea");
    }

    #[test]
    fn test_tile_display() {
        assert_eq!(Tile::new("osm", 2, 1, 3).to_string(), "osm/2/1/3");
    }

    #[test]
    fn test_bounds_intersection() {
        let a = LonLatBounds {
            west: 0.0,
            south: 0.0,
            east: 10.0,
            north: 10.0,
        };
        let b = LonLatBounds {
            west: 5.0,
            south: 5.0,
            east: 15.0,
            north: 15.0,
        };
        let touching = LonLatBounds {
            west: 10.0,
            south: 0.0,
            east: 20.0,
            north: 10.0,
        };

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&touching));
        assert!(LonLatBounds::WORLD.intersects(&a));
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_flip_y_is_involution(
                zoom in 0u8..=MAX_ZOOM,
                raw in any::<u32>()
            ) {
                let y = raw % (1u32 << zoom);
                prop_assert_eq!(flip_y(flip_y(y, zoom), zoom), y);
            }

            #[test]
            fn test_bbox_is_well_formed(
                zoom in 0u8..=20,
                raw_x in any::<u32>(),
                raw_y in any::<u32>()
            ) {
                let max = 1u32 << zoom;
                let (x, y) = (raw_x % max, raw_y % max);
                let bbox = tile_bbox(zoom, x, y);

                prop_assert!(bbox.left < bbox.right, "left {} >= right {}", bbox.left, bbox.right);
                prop_assert!(bbox.bottom < bbox.top, "bottom {} >= top {}", bbox.bottom, bbox.top);
            }

            #[test]
            fn test_vertical_neighbours_share_only_an_edge(
                zoom in 1u8..=20,
                raw_x in any::<u32>(),
                raw_y in any::<u32>()
            ) {
                let max = 1u32 << zoom;
                let x = raw_x % max;
                let y = raw_y % (max - 1);

                let upper = tile_bbox(zoom, x, y);
                let lower = tile_bbox(zoom, x, y + 1);

                prop_assert_eq!(upper.bottom, lower.top);
                prop_assert!(lower.bottom < upper.bottom);
                prop_assert!(upper.top > lower.top);
                prop_assert_eq!(upper.left, lower.left);
                prop_assert_eq!(upper.right, lower.right);
            }

            #[test]
            fn test_validate_matches_grid_size(
                zoom in 0u8..=MAX_ZOOM,
                x in any::<u32>(),
                y in any::<u32>()
            ) {
                let max = 1u32 << zoom;
                let tile = Tile::new("p", zoom, x, y);
                prop_assert_eq!(tile.validate().is_ok(), x < max && y < max);
            }
        }
    }
}
