//! The polymorphic scalar. A [`Datum`] is a small tagged union keyed by
//! [`BaseType`]; the per-tag operation set of the registry (compare, hash,
//! arithmetic, distance, interpolation) lives here as match arms.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use smol_str::SmolStr;

use crate::errors::{TemporalError, TemporalResult};
use crate::geo::{Cbuffer, GeoPoint, Npoint, Nsegment};
use crate::timestamp::{Date, TimestampTz};
use crate::types::BaseType;

/// Internal two-component accumulator, used by the average aggregate as
/// (sum, count). Never user-visible.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Double2 {
    pub a: f64,
    pub b: f64,
}

/// Internal three-component accumulator for 2-D centroids: (x, y, count).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Double3 {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

/// Internal four-component accumulator for 3-D centroids: (x, y, z, count).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Double4 {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Double2 {
    pub fn add(self, other: Self) -> Self {
        Self {
            a: self.a + other.a,
            b: self.b + other.b,
        }
    }
}

impl Double3 {
    pub fn add(self, other: Self) -> Self {
        Self {
            a: self.a + other.a,
            b: self.b + other.b,
            c: self.c + other.c,
        }
    }
}

impl Double4 {
    pub fn add(self, other: Self) -> Self {
        Self {
            a: self.a + other.a,
            b: self.b + other.b,
            c: self.c + other.c,
            d: self.d + other.d,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Bool(bool),
    Int(i32),
    Float(f64),
    Text(SmolStr),
    Timestamp(TimestampTz),
    Date(Date),
    Geom(GeoPoint),
    Geog(GeoPoint),
    Npoint(Npoint),
    Nsegment(Nsegment),
    Cbuffer(Cbuffer),
    Double2(Double2),
    Double3(Double3),
    Double4(Double4),
}

impl Datum {
    pub fn basetype(&self) -> BaseType {
        match self {
            Self::Bool(_) => BaseType::Bool,
            Self::Int(_) => BaseType::Int,
            Self::Float(_) => BaseType::Float,
            Self::Text(_) => BaseType::Text,
            Self::Timestamp(_) => BaseType::Timestamp,
            Self::Date(_) => BaseType::Date,
            Self::Geom(_) => BaseType::Geom,
            Self::Geog(_) => BaseType::Geog,
            Self::Npoint(_) => BaseType::Npoint,
            Self::Nsegment(_) => BaseType::Nsegment,
            Self::Cbuffer(_) => BaseType::Cbuffer,
            Self::Double2(_) => BaseType::Double2,
            Self::Double3(_) => BaseType::Double3,
            Self::Double4(_) => BaseType::Double4,
        }
    }

    pub fn text(value: &str) -> Self {
        Self::Text(SmolStr::new(value))
    }

    /// Numbers widen to f64; everything else is `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<TimestampTz> {
        match self {
            Self::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_point(&self) -> Option<&GeoPoint> {
        match self {
            Self::Geom(p) | Self::Geog(p) => Some(p),
            _ => None,
        }
    }

    /// Total order over two datums of compatible base types. Numbers
    /// compare across int/float; dates compare against timestamps through
    /// their midnight instant.
    pub fn cmp(&self, other: &Self) -> TemporalResult<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Ok(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Ok(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Ok(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Ok(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Ok(a.cmp(b)),
            (Self::Date(a), Self::Timestamp(b)) => Ok(a.to_timestamp().cmp(b)),
            (Self::Timestamp(a), Self::Date(b)) => Ok(a.cmp(&b.to_timestamp())),
            (Self::Npoint(a), Self::Npoint(b)) => Ok(a
                .route
                .cmp(&b.route)
                .then(a.pos.total_cmp(&b.pos))),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => Ok(a.total_cmp(&b)),
                _ => Err(TemporalError::mismatch(format!(
                    "cannot order {} against {}",
                    <&'static str>::from(self.basetype()),
                    <&'static str>::from(other.basetype())
                ))),
            },
        }
    }

    /// Equality across compatible base types; falls back to structural
    /// equality for the unordered spatial types.
    pub fn datum_eq(&self, other: &Self) -> bool {
        match self.cmp(other) {
            Ok(ordering) => ordering == Ordering::Equal,
            Err(_) => self == other,
        }
    }

    pub fn datum_hash(&self) -> u64 {
        let mut hasher = ahash::AHasher::default();
        self.hash(&mut hasher);
        hasher.finish()
    }

    pub fn add(&self, other: &Self) -> TemporalResult<Self> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a
                .checked_add(*b)
                .map(Self::Int)
                .ok_or(TemporalError::Arithmetic("integer overflow")),
            (Self::Double2(a), Self::Double2(b)) => Ok(Self::Double2(a.add(*b))),
            (Self::Double3(a), Self::Double3(b)) => Ok(Self::Double3(a.add(*b))),
            (Self::Double4(a), Self::Double4(b)) => Ok(Self::Double4(a.add(*b))),
            _ => self.float_binop(other, "+", |a, b| Ok(a + b)),
        }
    }

    pub fn sub(&self, other: &Self) -> TemporalResult<Self> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a
                .checked_sub(*b)
                .map(Self::Int)
                .ok_or(TemporalError::Arithmetic("integer overflow")),
            _ => self.float_binop(other, "-", |a, b| Ok(a - b)),
        }
    }

    pub fn mul(&self, other: &Self) -> TemporalResult<Self> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a
                .checked_mul(*b)
                .map(Self::Int)
                .ok_or(TemporalError::Arithmetic("integer overflow")),
            _ => self.float_binop(other, "*", |a, b| Ok(a * b)),
        }
    }

    pub fn div(&self, other: &Self) -> TemporalResult<Self> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => {
                if *b == 0 {
                    return Err(TemporalError::Arithmetic("division by zero"));
                }
                Ok(Self::Int(a / b))
            }
            _ => self.float_binop(other, "/", |a, b| {
                if b == 0.0 {
                    Err(TemporalError::Arithmetic("division by zero"))
                } else {
                    Ok(a / b)
                }
            }),
        }
    }

    fn float_binop(
        &self,
        other: &Self,
        op: &str,
        f: impl FnOnce(f64, f64) -> TemporalResult<f64>,
    ) -> TemporalResult<Self> {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => Ok(Self::Float(f(a, b)?)),
            _ => Err(TemporalError::mismatch(format!(
                "{} {op} {} is not defined",
                <&'static str>::from(self.basetype()),
                <&'static str>::from(other.basetype())
            ))),
        }
    }

    pub fn min(&self, other: &Self) -> TemporalResult<Self> {
        Ok(if self.cmp(other)? == Ordering::Greater {
            other.clone()
        } else {
            self.clone()
        })
    }

    pub fn max(&self, other: &Self) -> TemporalResult<Self> {
        Ok(if self.cmp(other)? == Ordering::Less {
            other.clone()
        } else {
            self.clone()
        })
    }

    /// Base distance between two datums: absolute difference for numbers,
    /// seconds for timestamps, spatial distance for the spatial types.
    pub fn distance(&self, other: &Self) -> TemporalResult<f64> {
        match (self, other) {
            (Self::Timestamp(a), Self::Timestamp(b)) => Ok(a.seconds_between(*b)),
            (Self::Date(a), Self::Date(b)) => Ok((a.days() - b.days()).abs() as f64),
            (Self::Geom(a), Self::Geom(b)) | (Self::Geog(a), Self::Geog(b)) => a.distance(b),
            (Self::Npoint(a), Self::Npoint(b)) => a.distance(b),
            (Self::Cbuffer(a), Self::Cbuffer(b)) => a.distance(b),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => Ok((a - b).abs()),
                _ => Err(TemporalError::mismatch(format!(
                    "no distance between {} and {}",
                    <&'static str>::from(self.basetype()),
                    <&'static str>::from(other.basetype())
                ))),
            },
        }
    }

    /// Affine interpolation toward `other` at `ratio` in [0, 1], defined
    /// for continuous base types only.
    pub fn lerp(&self, other: &Self, ratio: f64) -> TemporalResult<Self> {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => Ok(Self::Float(a + (b - a) * ratio)),
            (Self::Geom(a), Self::Geom(b)) => Ok(Self::Geom(a.lerp(b, ratio))),
            (Self::Geog(a), Self::Geog(b)) => Ok(Self::Geog(a.lerp(b, ratio))),
            (Self::Npoint(a), Self::Npoint(b)) if a.route == b.route => {
                Ok(Self::Npoint(a.lerp(b, ratio)))
            }
            (Self::Cbuffer(a), Self::Cbuffer(b)) => Ok(Self::Cbuffer(a.lerp(b, ratio))),
            _ => Err(TemporalError::mismatch(format!(
                "cannot interpolate between {} and {}",
                <&'static str>::from(self.basetype()),
                <&'static str>::from(other.basetype())
            ))),
        }
    }

    /// Ratio in (0, 1) at which a linear segment from `start` to `end`
    /// passes through `target`, if it does so strictly inside the segment.
    pub fn segment_at_value(start: &Self, end: &Self, target: &Self) -> Option<f64> {
        match (start.as_number(), end.as_number(), target.as_number()) {
            (Some(v0), Some(v1), Some(v)) => {
                if v0 == v1 {
                    return None;
                }
                let ratio = (v - v0) / (v1 - v0);
                (0.0..=1.0).contains(&ratio).then_some(ratio)
            }
            _ => None,
        }
    }

    /// Ratio in [0, 1] at which two linear segments cross, if they do.
    pub fn segment_crossing(
        start1: &Self,
        end1: &Self,
        start2: &Self,
        end2: &Self,
    ) -> Option<f64> {
        match (
            start1.as_number(),
            end1.as_number(),
            start2.as_number(),
            end2.as_number(),
        ) {
            (Some(a0), Some(a1), Some(b0), Some(b1)) => {
                // Parallel segments never cross strictly.
                let denom = (a1 - a0) - (b1 - b0);
                if denom == 0.0 {
                    return None;
                }
                let ratio = (b0 - a0) / denom;
                (ratio > 0.0 && ratio < 1.0).then_some(ratio)
            }
            _ => segment_point_crossing(start1, end1, start2, end2),
        }
    }

}

/// Crossing of two linear point trajectories: the ratio where all
/// coordinates coincide, if a single such ratio exists.
fn segment_point_crossing(
    start1: &Datum,
    end1: &Datum,
    start2: &Datum,
    end2: &Datum,
) -> Option<f64> {
    let (p0, p1, q0, q1) = match (start1, end1, start2, end2) {
        (Datum::Geom(a), Datum::Geom(b), Datum::Geom(c), Datum::Geom(d))
        | (Datum::Geog(a), Datum::Geog(b), Datum::Geog(c), Datum::Geog(d)) => (a, b, c, d),
        _ => return None,
    };
    let mut ratio = None;
    let axes = [
        (p0.x, p1.x, q0.x, q1.x),
        (p0.y, p1.y, q0.y, q1.y),
        (
            p0.z.unwrap_or(0.0),
            p1.z.unwrap_or(0.0),
            q0.z.unwrap_or(0.0),
            q1.z.unwrap_or(0.0),
        ),
    ];
    for (a0, a1, b0, b1) in axes {
        let denom = (a1 - a0) - (b1 - b0);
        if denom == 0.0 {
            if a0 != b0 {
                return None;
            }
            continue;
        }
        let r = (b0 - a0) / denom;
        if !(0.0..=1.0).contains(&r) {
            return None;
        }
        match ratio {
            None => ratio = Some(r),
            Some(prev) if (prev - r).abs() > f64::EPSILON * 8.0 => return None,
            Some(_) => {}
        }
    }
    ratio.filter(|r| *r > 0.0 && *r < 1.0)
}

impl Hash for Datum {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Bool(v) => v.hash(state),
            Self::Int(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::Text(v) => v.hash(state),
            Self::Timestamp(v) => v.hash(state),
            Self::Date(v) => v.hash(state),
            Self::Geom(p) | Self::Geog(p) => {
                p.x.to_bits().hash(state);
                p.y.to_bits().hash(state);
                p.z.map(f64::to_bits).hash(state);
                p.srid.hash(state);
            }
            Self::Npoint(n) => {
                n.route.hash(state);
                n.pos.to_bits().hash(state);
            }
            Self::Nsegment(n) => {
                n.route.hash(state);
                n.pos1.to_bits().hash(state);
                n.pos2.to_bits().hash(state);
            }
            Self::Cbuffer(c) => {
                c.center.x.to_bits().hash(state);
                c.center.y.to_bits().hash(state);
                c.radius.to_bits().hash(state);
            }
            Self::Double2(d) => {
                d.a.to_bits().hash(state);
                d.b.to_bits().hash(state);
            }
            Self::Double3(d) => {
                d.a.to_bits().hash(state);
                d.b.to_bits().hash(state);
                d.c.to_bits().hash(state);
            }
            Self::Double4(d) => {
                d.a.to_bits().hash(state);
                d.b.to_bits().hash(state);
                d.c.to_bits().hash(state);
                d.d.to_bits().hash(state);
            }
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", if *v { "t" } else { "f" }),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "\"{v}\""),
            Self::Timestamp(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{v}"),
            Self::Geom(p) | Self::Geog(p) => write!(f, "{p}"),
            Self::Npoint(n) => write!(f, "{n}"),
            Self::Nsegment(n) => write!(f, "{n}"),
            Self::Cbuffer(c) => write!(f, "{c}"),
            Self::Double2(d) => write!(f, "({},{})", d.a, d.b),
            Self::Double3(d) => write!(f, "({},{},{})", d.a, d.b, d.c),
            Self::Double4(d) => write!(f, "({},{},{},{})", d.a, d.b, d.c, d.d),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use std::cmp::Ordering;

    use super::*;

    #[test]
    fn cross_type_number_order() {
        let two = Datum::Int(2);
        let two_and_a_half = Datum::Float(2.5);
        assert_eq!(two.cmp(&two_and_a_half).unwrap(), Ordering::Less);
        assert!(Datum::Int(3).datum_eq(&Datum::Float(3.0)));
        Datum::Int(1).cmp(&Datum::text("one")).unwrap_err();
    }

    #[test]
    fn arithmetic_widens_and_checks() {
        assert_eq!(
            Datum::Int(2).add(&Datum::Int(3)).unwrap(),
            Datum::Int(5)
        );
        assert_eq!(
            Datum::Int(2).add(&Datum::Float(0.5)).unwrap(),
            Datum::Float(2.5)
        );
        assert_eq!(
            Datum::Float(1.0).div(&Datum::Float(0.0)).unwrap_err(),
            TemporalError::Arithmetic("division by zero")
        );
        Datum::Int(i32::MAX).add(&Datum::Int(1)).unwrap_err();
    }

    #[test]
    fn segment_value_hit() {
        // 1.0 -> 5.0 passes through 3.0 at the midpoint.
        let ratio =
            Datum::segment_at_value(&Datum::Float(1.0), &Datum::Float(5.0), &Datum::Float(3.0))
                .unwrap();
        assert_eq!(ratio, 0.5);
        assert_eq!(
            Datum::segment_at_value(&Datum::Float(1.0), &Datum::Float(5.0), &Datum::Float(7.0)),
            None
        );
    }

    #[test]
    fn segment_crossing_of_two_floats() {
        // 0->4 and 4->0 cross at the midpoint.
        let r = Datum::segment_crossing(
            &Datum::Float(0.0),
            &Datum::Float(4.0),
            &Datum::Float(4.0),
            &Datum::Float(0.0),
        )
        .unwrap();
        assert_eq!(r, 0.5);

        // Parallel segments never cross.
        assert_eq!(
            Datum::segment_crossing(
                &Datum::Float(0.0),
                &Datum::Float(1.0),
                &Datum::Float(2.0),
                &Datum::Float(3.0),
            ),
            None
        );
    }

    #[test]
    fn point_trajectories_crossing() {
        let p = |x: f64, y: f64| Datum::Geom(GeoPoint::new_2d(x, y, 0));
        // Two diagonals of the unit square meet in the middle.
        let r = Datum::segment_crossing(&p(0.0, 0.0), &p(1.0, 1.0), &p(0.0, 1.0), &p(1.0, 0.0))
            .unwrap();
        assert_eq!(r, 0.5);

        // Same direction, different tracks.
        assert_eq!(
            Datum::segment_crossing(&p(0.0, 0.0), &p(1.0, 0.0), &p(0.0, 1.0), &p(1.0, 1.0)),
            None
        );
    }

    #[test]
    fn lerp_is_type_directed() {
        assert_eq!(
            Datum::Float(1.0).lerp(&Datum::Float(5.0), 0.5).unwrap(),
            Datum::Float(3.0)
        );
        Datum::Int(1).lerp(&Datum::Int(5), 0.5).unwrap_err();
    }
}
