//! Well-Known-Text geometry wrapper and coordinate primitives.

use std::{fmt, sync::LazyLock};

use regex::Regex;

/// Number of decimal places kept for latitude and longitude values.
pub const COORDINATE_PRECISION: i32 = 5;

static COORDINATE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?\s+-?\d+(?:\.\d+)?(?:[eE][-+]?\d+)?")
        .unwrap_or_else(|err| panic!("invalid pattern: {err}"))
});

/// Round a latitude or longitude to five decimal places, half away from zero.
///
/// # Examples
/// ```
/// use geodata_core::geography::round_coordinate;
///
/// assert_eq!(round_coordinate(47.123456), 47.12346);
/// assert_eq!(round_coordinate(-122.123456), -122.12346);
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "fixed precision rounding is part of the wire format"
)]
pub fn round_coordinate(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10_f64.powi(COORDINATE_PRECISION);
    (value * scale).round() / scale
}

/// A geometry stored as Well-Known-Text.
///
/// # Examples
/// ```
/// use geodata_core::Geography;
///
/// let line = Geography::new("LINESTRING(-122.1 47.6, -122.2 47.7)");
/// assert_eq!(line.point_count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Geography(String);

impl Geography {
    /// Wrap a WKT string.
    #[must_use]
    pub fn new(wkt: impl Into<String>) -> Self {
        Self(wkt.into())
    }

    /// The WKT text.
    #[must_use]
    pub fn wkt(&self) -> &str {
        &self.0
    }

    /// Whether the WKT text is blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Number of coordinate pairs in the WKT text.
    #[must_use]
    pub fn point_count(&self) -> usize {
        COORDINATE_PAIR.find_iter(&self.0).count()
    }

    /// Consume the wrapper and return the WKT text.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Geography {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Geography {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A latitude/longitude pair rounded to five decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    /// Construct a coordinate, rounding both components.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: round_coordinate(latitude),
            longitude: round_coordinate(longitude),
        }
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Replace the latitude, rounding it.
    pub fn set_latitude(&mut self, latitude: f64) {
        self.latitude = round_coordinate(latitude);
    }

    /// Replace the longitude, rounding it.
    pub fn set_longitude(&mut self, longitude: f64) {
        self.longitude = round_coordinate(longitude);
    }
}

/// A bounding box whose edges are rounded like [`Coordinate`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
}

impl BoundingBox {
    /// Construct a bounding box from its four edges.
    #[must_use]
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self {
            south: round_coordinate(south),
            west: round_coordinate(west),
            north: round_coordinate(north),
            east: round_coordinate(east),
        }
    }

    /// Southern latitude.
    #[must_use]
    pub const fn south(&self) -> f64 {
        self.south
    }

    /// Western longitude.
    #[must_use]
    pub const fn west(&self) -> f64 {
        self.west
    }

    /// Northern latitude.
    #[must_use]
    pub const fn north(&self) -> f64 {
        self.north
    }

    /// Eastern longitude.
    #[must_use]
    pub const fn east(&self) -> f64 {
        self.east
    }

    /// Replace the southern edge.
    pub fn set_south(&mut self, value: f64) {
        self.south = round_coordinate(value);
    }

    /// Replace the western edge.
    pub fn set_west(&mut self, value: f64) {
        self.west = round_coordinate(value);
    }

    /// Replace the northern edge.
    pub fn set_north(&mut self, value: f64) {
        self.north = round_coordinate(value);
    }

    /// Replace the eastern edge.
    pub fn set_east(&mut self, value: f64) {
        self.east = round_coordinate(value);
    }
}
