//! Coordinate type definitions

use std::fmt;

use thiserror::Error;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Supported zoom range. Level 30 is the deepest level whose grid size
/// (`2^z`) still fits comfortably in a `u32`.
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 30;

/// Errors raised by tile coordinate validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Zoom level outside the supported range
    #[error("Invalid zoom level: {0} (must be between 0 and 30)")]
    InvalidZoom(u8),

    /// Column outside `[0, 2^z)`
    #[error("Invalid x: {x} at zoom {zoom} (must be below {max})")]
    InvalidX { x: u32, zoom: u8, max: u32 },

    /// Row outside `[0, 2^z)`
    #[error("Invalid y: {y} at zoom {zoom} (must be below {max})")]
    InvalidY { y: u32, zoom: u8, max: u32 },
}

/// A single tile request identity.
///
/// Tiles are addressed in XYZ convention (row 0 at the north edge). The
/// provider name is part of the identity: the same `(z, x, y)` from two
/// providers are two different tiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tile {
    /// Name of the provider serving this tile
    pub provider: String,
    /// Zoom level
    pub z: u8,
    /// Column (west to east)
    pub x: u32,
    /// Row (north to south)
    pub y: u32,
}

impl Tile {
    /// Creates a new tile identity.
    pub fn new(provider: impl Into<String>, z: u8, x: u32, y: u32) -> Self {
        Self {
            provider: provider.into(),
            z,
            x,
            y,
        }
    }

    /// Returns a copy of this tile addressed to another provider.
    pub fn with_provider(&self, provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            ..self.clone()
        }
    }

    /// Checks that `0 <= x, y < 2^z` and that the zoom level is supported.
    pub fn validate(&self) -> Result<(), CoordError> {
        if self.z > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(self.z));
        }
        let max = 1u32 << self.z;
        if self.x >= max {
            return Err(CoordError::InvalidX {
                x: self.x,
                zoom: self.z,
                max,
            });
        }
        if self.y >= max {
            return Err(CoordError::InvalidY {
                y: self.y,
                zoom: self.z,
                max,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.provider, self.z, self.x, self.y)
    }
}

/// Bounding box in Web Mercator meters (EPSG:3857).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

/// Bounding box in geographic degrees (EPSG:4326).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LonLatBounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl LonLatBounds {
    /// The whole Web Mercator world.
    pub const WORLD: LonLatBounds = LonLatBounds {
        west: MIN_LON,
        south: MIN_LAT,
        east: MAX_LON,
        north: MAX_LAT,
    };

    /// Returns true if the two boxes overlap with a non-empty area.
    ///
    /// Boxes that only touch along an edge do not intersect.
    pub fn intersects(&self, other: &LonLatBounds) -> bool {
        self.west < other.east
            && other.west < self.east
            && self.south < other.north
            && other.south < self.north
    }
}
