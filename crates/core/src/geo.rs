//! Spatial base values. The engine treats points as bare coordinate tuples
//! plus an SRID; projections and serialized geometry blobs belong to the
//! surrounding geometry library.

use std::fmt;

use crate::datum::Datum;
use crate::errors::{TemporalError, TemporalResult};
use crate::span::Span;

/// Mean Earth radius in meters, for geodetic great-circle distance.
const EARTH_RADIUS: f64 = 6_371_008.8;

pub const SRID_DEFAULT: i32 = 0;
pub const SRID_WGS84: i32 = 4326;

/// A 2-D or 3-D point with an SRID. `geodetic` marks geography points,
/// whose coordinates are lon/lat degrees and whose distance is measured
/// on the sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub srid: i32,
    pub geodetic: bool,
}

impl GeoPoint {
    pub fn new_2d(x: f64, y: f64, srid: i32) -> Self {
        Self {
            x,
            y,
            z: None,
            srid,
            geodetic: false,
        }
    }

    pub fn new_3d(x: f64, y: f64, z: f64, srid: i32) -> Self {
        Self {
            x,
            y,
            z: Some(z),
            srid,
            geodetic: false,
        }
    }

    pub fn new_geodetic(lon: f64, lat: f64, srid: i32) -> Self {
        Self {
            x: lon,
            y: lat,
            z: None,
            srid,
            geodetic: true,
        }
    }

    pub fn has_z(&self) -> bool {
        self.z.is_some()
    }

    pub fn ensure_same_frame(&self, other: &Self) -> TemporalResult<()> {
        if self.srid != other.srid {
            return Err(TemporalError::mismatch(format!(
                "SRID mismatch: {} vs {}",
                self.srid, other.srid
            )));
        }
        if self.geodetic != other.geodetic {
            return Err(TemporalError::mismatch(
                "cannot mix geodetic and non-geodetic points",
            ));
        }
        if self.has_z() != other.has_z() {
            return Err(TemporalError::mismatch(
                "cannot mix 2D and 3D points",
            ));
        }
        Ok(())
    }

    /// Euclidean distance for geometry, great-circle distance in meters
    /// for geography.
    pub fn distance(&self, other: &Self) -> TemporalResult<f64> {
        self.ensure_same_frame(other)?;
        if self.geodetic {
            return Ok(haversine(self.y, self.x, other.y, other.x));
        }
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = match (self.z, other.z) {
            (Some(z1), Some(z2)) => z1 - z2,
            _ => 0.0,
        };
        Ok((dx * dx + dy * dy + dz * dz).sqrt())
    }

    /// Affine interpolation at `ratio` in [0, 1] toward `other`.
    pub fn lerp(&self, other: &Self, ratio: f64) -> Self {
        Self {
            x: self.x + (other.x - self.x) * ratio,
            y: self.y + (other.y - self.y) * ratio,
            z: match (self.z, other.z) {
                (Some(z1), Some(z2)) => Some(z1 + (z2 - z1) * ratio),
                _ => None,
            },
            srid: self.srid,
            geodetic: self.geodetic,
        }
    }

    /// Ratio in [0, 1] locating the closest point to `self` on the segment
    /// from `start` to `end`, in coordinate space.
    pub fn closest_point_ratio(&self, start: &Self, end: &Self) -> f64 {
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        let dz = match (start.z, end.z) {
            (Some(z1), Some(z2)) => z2 - z1,
            _ => 0.0,
        };
        let len2 = dx * dx + dy * dy + dz * dz;
        if len2 == 0.0 {
            return 0.0;
        }
        let pz = match (self.z, start.z) {
            (Some(z), Some(z1)) => (z - z1) * dz,
            _ => 0.0,
        };
        let r = ((self.x - start.x) * dx + (self.y - start.y) * dy + pz) / len2;
        r.clamp(0.0, 1.0)
    }

    /// Distance from `self` to the segment from `start` to `end`.
    pub fn distance_to_segment(&self, start: &Self, end: &Self) -> TemporalResult<f64> {
        let ratio = self.closest_point_ratio(start, end);
        self.distance(&start.lerp(end, ratio))
    }
}

fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS * a.sqrt().atan2((1.0 - a).sqrt())
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(z) = self.z {
            write!(f, "Point Z ({} {} {})", self.x, self.y, z)
        } else {
            write!(f, "Point({} {})", self.x, self.y)
        }
    }
}

/// A network point: a position along a route, as a fraction in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Npoint {
    pub route: i64,
    pub pos: f64,
}

impl Npoint {
    pub fn new(route: i64, pos: f64) -> TemporalResult<Self> {
        if !(0.0..=1.0).contains(&pos) {
            return Err(TemporalError::invariant(format!(
                "network position {pos} is outside [0, 1]"
            )));
        }
        Ok(Self { route, pos })
    }

    /// Fractional distance along the shared route. Positions on different
    /// routes are incomparable without the route geometry, which lives
    /// outside the core.
    pub fn distance(&self, other: &Self) -> TemporalResult<f64> {
        if self.route != other.route {
            return Err(TemporalError::mismatch(format!(
                "network points on different routes: {} vs {}",
                self.route, other.route
            )));
        }
        Ok((self.pos - other.pos).abs())
    }

    pub fn lerp(&self, other: &Self, ratio: f64) -> Self {
        Self {
            route: self.route,
            pos: self.pos + (other.pos - self.pos) * ratio,
        }
    }

    /// The degenerate route-position span. Resolving a network point to
    /// coordinates needs the route geometry, which lives outside the
    /// core; the position span is what the box layer can know.
    pub fn position_span(&self) -> Span {
        Span::closed_unchecked(Datum::Float(self.pos), Datum::Float(self.pos))
    }
}

impl fmt::Display for Npoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NPoint({},{})", self.route, self.pos)
    }
}

/// A network segment: a position range along a route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nsegment {
    pub route: i64,
    pub pos1: f64,
    pub pos2: f64,
}

impl Nsegment {
    pub fn new(route: i64, pos1: f64, pos2: f64) -> TemporalResult<Self> {
        if !(0.0..=1.0).contains(&pos1) || !(0.0..=1.0).contains(&pos2) {
            return Err(TemporalError::invariant(
                "network segment positions are outside [0, 1]",
            ));
        }
        // Stored low-to-high regardless of the argument order.
        let (pos1, pos2) = if pos1 <= pos2 { (pos1, pos2) } else { (pos2, pos1) };
        Ok(Self { route, pos1, pos2 })
    }

    /// The covered route-position span.
    pub fn position_span(&self) -> Span {
        Span::closed_unchecked(Datum::Float(self.pos1), Datum::Float(self.pos2))
    }
}

impl fmt::Display for Nsegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NSegment({},{},{})", self.route, self.pos1, self.pos2)
    }
}

/// A circular buffer: a point with a radius, both interpolating linearly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cbuffer {
    pub center: GeoPoint,
    pub radius: f64,
}

impl Cbuffer {
    pub fn new(center: GeoPoint, radius: f64) -> TemporalResult<Self> {
        if radius < 0.0 {
            return Err(TemporalError::invariant("buffer radius is negative"));
        }
        Ok(Self { center, radius })
    }

    /// Distance between the closest points of two buffers, floored at zero
    /// when they overlap.
    pub fn distance(&self, other: &Self) -> TemporalResult<f64> {
        let between = self.center.distance(&other.center)?;
        Ok((between - self.radius - other.radius).max(0.0))
    }

    pub fn lerp(&self, other: &Self, ratio: f64) -> Self {
        Self {
            center: self.center.lerp(&other.center, ratio),
            radius: self.radius + (other.radius - self.radius) * ratio,
        }
    }
}

impl fmt::Display for Cbuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cbuffer({},{})", self.center, self.radius)
    }
}
