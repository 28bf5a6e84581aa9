//! The spatiotemporal box: optional x/y extent, optional z extent, optional
//! period, an SRID and a geodetic flag. Spatial extents are closed
//! intervals; the time dimension reuses [`Span`] bound semantics.

use std::fmt;

use crate::errors::{TemporalError, TemporalResult};
use crate::geo::{Cbuffer, GeoPoint};
use crate::span::Span;
use crate::timestamp::{TimestampTz, TsDuration};

/// The x/y (and optional z) extent of an STBox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialDims {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub z: Option<(f64, f64)>,
}

impl SpatialDims {
    fn axes(&self, other: &Self) -> Vec<((f64, f64), (f64, f64))> {
        let mut axes = vec![
            ((self.xmin, self.xmax), (other.xmin, other.xmax)),
            ((self.ymin, self.ymax), (other.ymin, other.ymax)),
        ];
        if let (Some(a), Some(b)) = (self.z, other.z) {
            axes.push((a, b));
        }
        axes
    }
}

fn axis_overlaps(a: (f64, f64), b: (f64, f64)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

fn axis_contains(a: (f64, f64), b: (f64, f64)) -> bool {
    a.0 <= b.0 && a.1 >= b.1
}

fn axis_gap(a: (f64, f64), b: (f64, f64)) -> f64 {
    if axis_overlaps(a, b) {
        0.0
    } else if a.1 < b.0 {
        b.0 - a.1
    } else {
        a.0 - b.1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct STBox {
    space: Option<SpatialDims>,
    t: Option<Span>,
    srid: i32,
    geodetic: bool,
}

impl STBox {
    pub fn new(
        space: Option<SpatialDims>,
        t: Option<Span>,
        srid: i32,
        geodetic: bool,
    ) -> TemporalResult<Self> {
        if space.is_none() && t.is_none() {
            return Err(TemporalError::invariant(
                "a spatiotemporal box needs at least one dimension",
            ));
        }
        if let Some(dims) = &space {
            let ordered = dims.xmin <= dims.xmax
                && dims.ymin <= dims.ymax
                && dims.z.is_none_or(|(zmin, zmax)| zmin <= zmax);
            if !ordered {
                return Err(TemporalError::invariant(
                    "box minima must not exceed maxima",
                ));
            }
        }
        if let Some(period) = &t {
            if !period.is_period() {
                return Err(TemporalError::mismatch(
                    "the time dimension of a spatiotemporal box must be a period",
                ));
            }
        }
        Ok(Self {
            space,
            t,
            srid,
            geodetic,
        })
    }

    pub fn from_point(point: &GeoPoint) -> TemporalResult<Self> {
        Self::new(
            Some(SpatialDims {
                xmin: point.x,
                xmax: point.x,
                ymin: point.y,
                ymax: point.y,
                z: point.z.map(|z| (z, z)),
            }),
            None,
            point.srid,
            point.geodetic,
        )
    }

    pub fn from_point_timestamp(point: &GeoPoint, t: TimestampTz) -> TemporalResult<Self> {
        let mut result = Self::from_point(point)?;
        result.t = Some(Span::period(t, t, true, true)?);
        Ok(result)
    }

    /// A circular buffer covers its center expanded by the radius.
    pub fn from_cbuffer(cbuffer: &Cbuffer) -> TemporalResult<Self> {
        Self::from_point(&cbuffer.center)?.expand_space(cbuffer.radius)
    }

    pub fn from_period(period: Span) -> TemporalResult<Self> {
        Self::new(None, Some(period), 0, false)
    }

    pub fn has_space(&self) -> bool {
        self.space.is_some()
    }

    pub fn has_z(&self) -> bool {
        self.space.is_some_and(|dims| dims.z.is_some())
    }

    pub fn has_t(&self) -> bool {
        self.t.is_some()
    }

    pub fn srid(&self) -> i32 {
        self.srid
    }

    pub fn is_geodetic(&self) -> bool {
        self.geodetic
    }

    pub fn space(&self) -> Option<&SpatialDims> {
        self.space.as_ref()
    }

    pub fn t(&self) -> Option<&Span> {
        self.t.as_ref()
    }

    pub fn space_required(&self) -> TemporalResult<&SpatialDims> {
        self.space
            .as_ref()
            .ok_or(TemporalError::DimensionMissing("spatial"))
    }

    pub fn t_required(&self) -> TemporalResult<&Span> {
        self.t.as_ref().ok_or(TemporalError::DimensionMissing("time"))
    }

    fn z_required(&self) -> TemporalResult<(f64, f64)> {
        self.space_required()?
            .z
            .ok_or(TemporalError::DimensionMissing("z"))
    }

    pub fn ensure_same_frame(&self, other: &Self) -> TemporalResult<()> {
        if self.has_space() && other.has_space() {
            if self.srid != other.srid {
                return Err(TemporalError::mismatch(format!(
                    "SRID mismatch: {} vs {}",
                    self.srid, other.srid
                )));
            }
            if self.geodetic != other.geodetic {
                return Err(TemporalError::mismatch(
                    "cannot mix geodetic and non-geodetic boxes",
                ));
            }
        }
        Ok(())
    }

    /// Project semantics: every dimension present in both must pass.
    fn project_dims(
        &self,
        other: &Self,
        axis_pred: impl Fn((f64, f64), (f64, f64)) -> bool,
        span_pred: impl Fn(&Span, &Span) -> TemporalResult<bool>,
    ) -> TemporalResult<bool> {
        self.ensure_same_frame(other)?;
        let mut shared = false;
        if let (Some(a), Some(b)) = (&self.space, &other.space) {
            shared = true;
            for (axis_a, axis_b) in a.axes(b) {
                if !axis_pred(axis_a, axis_b) {
                    return Ok(false);
                }
            }
        }
        if let (Some(a), Some(b)) = (&self.t, &other.t) {
            shared = true;
            if !span_pred(a, b)? {
                return Ok(false);
            }
        }
        if !shared {
            return Err(TemporalError::mismatch(
                "the boxes share no dimension to compare",
            ));
        }
        Ok(true)
    }

    pub fn contains(&self, other: &Self) -> TemporalResult<bool> {
        self.project_dims(other, axis_contains, |a, b| a.contains(b))
    }

    pub fn contained_in(&self, other: &Self) -> TemporalResult<bool> {
        other.contains(self)
    }

    pub fn overlaps(&self, other: &Self) -> TemporalResult<bool> {
        self.project_dims(other, axis_overlaps, |a, b| a.overlaps(b))
    }

    /// Strict: identical dimension sets and identical extents.
    pub fn same(&self, other: &Self) -> TemporalResult<bool> {
        if self.has_space() != other.has_space()
            || self.has_z() != other.has_z()
            || self.has_t() != other.has_t()
        {
            return Ok(false);
        }
        self.ensure_same_frame(other)?;
        Ok(self == other)
    }

    pub fn adjacent(&self, other: &Self) -> TemporalResult<bool> {
        if !self.project_dims(
            other,
            |a, b| axis_overlaps(a, b) || a.1 == b.0 || b.1 == a.0,
            |a, b| Ok(a.overlaps(b)? || a.adjacent(b)?),
        )? {
            return Ok(false);
        }
        let mut touches = false;
        if let (Some(a), Some(b)) = (&self.space, &other.space) {
            for (axis_a, axis_b) in a.axes(b) {
                touches |= axis_a.1 == axis_b.0 || axis_b.1 == axis_a.0;
            }
        }
        if let (Some(a), Some(b)) = (&self.t, &other.t) {
            touches |= a.adjacent(b)?;
        }
        Ok(touches)
    }

    /*********************** position predicates ***********************/

    fn x_axis(&self) -> TemporalResult<(f64, f64)> {
        let dims = self.space_required()?;
        Ok((dims.xmin, dims.xmax))
    }

    fn y_axis(&self) -> TemporalResult<(f64, f64)> {
        let dims = self.space_required()?;
        Ok((dims.ymin, dims.ymax))
    }

    pub fn is_left(&self, other: &Self) -> TemporalResult<bool> {
        Ok(self.x_axis()?.1 < other.x_axis()?.0)
    }

    pub fn is_overleft(&self, other: &Self) -> TemporalResult<bool> {
        Ok(self.x_axis()?.1 <= other.x_axis()?.1)
    }

    pub fn is_right(&self, other: &Self) -> TemporalResult<bool> {
        Ok(self.x_axis()?.0 > other.x_axis()?.1)
    }

    pub fn is_overright(&self, other: &Self) -> TemporalResult<bool> {
        Ok(self.x_axis()?.0 >= other.x_axis()?.0)
    }

    pub fn is_below(&self, other: &Self) -> TemporalResult<bool> {
        Ok(self.y_axis()?.1 < other.y_axis()?.0)
    }

    pub fn is_overbelow(&self, other: &Self) -> TemporalResult<bool> {
        Ok(self.y_axis()?.1 <= other.y_axis()?.1)
    }

    pub fn is_above(&self, other: &Self) -> TemporalResult<bool> {
        Ok(self.y_axis()?.0 > other.y_axis()?.1)
    }

    pub fn is_overabove(&self, other: &Self) -> TemporalResult<bool> {
        Ok(self.y_axis()?.0 >= other.y_axis()?.0)
    }

    pub fn is_front(&self, other: &Self) -> TemporalResult<bool> {
        Ok(self.z_required()?.1 < other.z_required()?.0)
    }

    pub fn is_overfront(&self, other: &Self) -> TemporalResult<bool> {
        Ok(self.z_required()?.1 <= other.z_required()?.1)
    }

    pub fn is_back(&self, other: &Self) -> TemporalResult<bool> {
        Ok(self.z_required()?.0 > other.z_required()?.1)
    }

    pub fn is_overback(&self, other: &Self) -> TemporalResult<bool> {
        Ok(self.z_required()?.0 >= other.z_required()?.0)
    }

    pub fn is_before(&self, other: &Self) -> TemporalResult<bool> {
        self.t_required()?.is_left(other.t_required()?)
    }

    pub fn is_overbefore(&self, other: &Self) -> TemporalResult<bool> {
        self.t_required()?.is_overleft(other.t_required()?)
    }

    pub fn is_after(&self, other: &Self) -> TemporalResult<bool> {
        self.t_required()?.is_right(other.t_required()?)
    }

    pub fn is_overafter(&self, other: &Self) -> TemporalResult<bool> {
        self.t_required()?.is_overright(other.t_required()?)
    }

    /*********************** set operations ***********************/

    pub fn expand(&mut self, other: &Self) -> TemporalResult<()> {
        self.ensure_same_frame(other)?;
        if self.has_space() != other.has_space()
            || self.has_z() != other.has_z()
            || self.has_t() != other.has_t()
        {
            return Err(TemporalError::mismatch(
                "cannot expand boxes with different dimensions",
            ));
        }
        if let (Some(a), Some(b)) = (&mut self.space, &other.space) {
            a.xmin = a.xmin.min(b.xmin);
            a.xmax = a.xmax.max(b.xmax);
            a.ymin = a.ymin.min(b.ymin);
            a.ymax = a.ymax.max(b.ymax);
            if let (Some(za), Some(zb)) = (&mut a.z, &b.z) {
                za.0 = za.0.min(zb.0);
                za.1 = za.1.max(zb.1);
            }
        }
        if let (Some(a), Some(b)) = (&mut self.t, &other.t) {
            a.expand(b);
        }
        Ok(())
    }

    pub fn union(&self, other: &Self) -> TemporalResult<Self> {
        let mut result = self.clone();
        result.expand(other)?;
        Ok(result)
    }

    pub fn intersection(&self, other: &Self) -> TemporalResult<Option<Self>> {
        self.ensure_same_frame(other)?;
        let space = match (&self.space, &other.space) {
            (Some(a), Some(b)) => {
                let xmin = a.xmin.max(b.xmin);
                let xmax = a.xmax.min(b.xmax);
                let ymin = a.ymin.max(b.ymin);
                let ymax = a.ymax.min(b.ymax);
                if xmin > xmax || ymin > ymax {
                    return Ok(None);
                }
                let z = match (a.z, b.z) {
                    (Some(za), Some(zb)) => {
                        let zmin = za.0.max(zb.0);
                        let zmax = za.1.min(zb.1);
                        if zmin > zmax {
                            return Ok(None);
                        }
                        Some((zmin, zmax))
                    }
                    _ => None,
                };
                Some(SpatialDims {
                    xmin,
                    xmax,
                    ymin,
                    ymax,
                    z,
                })
            }
            _ => None,
        };
        let t = match (&self.t, &other.t) {
            (Some(a), Some(b)) => match a.intersection(b)? {
                Some(period) => Some(period),
                None => return Ok(None),
            },
            _ => None,
        };
        if space.is_none() && t.is_none() {
            return Err(TemporalError::mismatch(
                "the boxes share no dimension to intersect",
            ));
        }
        Self::new(space, t, self.srid, self.geodetic).map(Some)
    }

    /// Widen every spatial axis by `margin` on both sides.
    pub fn expand_space(&self, margin: f64) -> TemporalResult<Self> {
        let dims = self.space_required()?;
        Self::new(
            Some(SpatialDims {
                xmin: dims.xmin - margin,
                xmax: dims.xmax + margin,
                ymin: dims.ymin - margin,
                ymax: dims.ymax + margin,
                z: dims.z.map(|(zmin, zmax)| (zmin - margin, zmax + margin)),
            }),
            self.t.clone(),
            self.srid,
            self.geodetic,
        )
    }

    pub fn expand_time(&self, margin: TsDuration) -> TemporalResult<Self> {
        let period = self.t_required()?;
        let lower = period
            .lower
            .as_timestamp()
            .unwrap_or_default()
            .checked_add(TsDuration(-margin.micros()))?;
        let upper = period
            .upper
            .as_timestamp()
            .unwrap_or_default()
            .checked_add(margin)?;
        Self::new(
            self.space,
            Some(Span::period(lower, upper, period.lower_inc, period.upper_inc)?),
            self.srid,
            self.geodetic,
        )
    }

    pub fn shift_tscale(
        &self,
        shift: Option<TsDuration>,
        duration: Option<TsDuration>,
    ) -> TemporalResult<Self> {
        Self::new(
            self.space,
            Some(self.t_required()?.shift_tscale(shift, duration)?),
            self.srid,
            self.geodetic,
        )
    }

    /// Nearest distance over the shared spatial axes, or the time gap in
    /// seconds when only time is shared.
    pub fn distance(&self, other: &Self) -> TemporalResult<f64> {
        self.ensure_same_frame(other)?;
        if let (Some(a), Some(b)) = (&self.space, &other.space) {
            let mut sum = 0.0;
            for (axis_a, axis_b) in a.axes(b) {
                let gap = axis_gap(axis_a, axis_b);
                sum += gap * gap;
            }
            return Ok(sum.sqrt());
        }
        if let (Some(a), Some(b)) = (&self.t, &other.t) {
            return a.distance(b);
        }
        Err(TemporalError::mismatch(
            "the boxes share no dimension to measure",
        ))
    }
}

impl fmt::Display for STBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.geodetic { "GEODSTBOX" } else { "STBOX" };
        match (&self.space, &self.t) {
            (Some(dims), t) => {
                let zt = match (dims.z, t) {
                    (Some(_), Some(_)) => "ZT",
                    (Some(_), None) => "Z",
                    (None, Some(_)) => "XT",
                    (None, None) => "X",
                };
                write!(f, "{tag} {zt}((")?;
                write!(f, "{} {}", dims.xmin, dims.ymin)?;
                if let Some((zmin, _)) = dims.z {
                    write!(f, " {zmin}")?;
                }
                write!(f, "),({} {}", dims.xmax, dims.ymax)?;
                if let Some((_, zmax)) = dims.z {
                    write!(f, " {zmax}")?;
                }
                write!(f, ")")?;
                if let Some(period) = t {
                    write!(f, ",{period}")?;
                }
                write!(f, ")")
            }
            (None, Some(period)) => write!(f, "{tag} T({period})"),
            (None, None) => write!(f, "{tag}()"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sbox(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> STBox {
        STBox::new(
            Some(SpatialDims {
                xmin,
                xmax,
                ymin,
                ymax,
                z: None,
            }),
            None,
            0,
            false,
        )
        .unwrap()
    }

    #[test]
    fn topology_over_shared_axes() {
        let a = sbox(0.0, 10.0, 0.0, 10.0);
        let b = sbox(2.0, 3.0, 2.0, 3.0);
        assert!(a.contains(&b).unwrap());
        assert!(a.overlaps(&b).unwrap());
        assert!(!b.contains(&a).unwrap());

        let right = sbox(11.0, 12.0, 0.0, 10.0);
        assert!(a.is_left(&right).unwrap());
        assert!(right.is_right(&a).unwrap());
        assert!(!a.overlaps(&right).unwrap());
    }

    #[test]
    fn frame_mismatches_are_rejected() {
        let a = sbox(0.0, 1.0, 0.0, 1.0);
        let mut b = sbox(0.0, 1.0, 0.0, 1.0);
        b.srid = 4326;
        a.overlaps(&b).unwrap_err();
    }

    #[test]
    fn cbuffer_expands_by_radius() {
        let buffer = Cbuffer::new(GeoPoint::new_2d(5.0, 5.0, 0), 2.0).unwrap();
        let bbox = STBox::from_cbuffer(&buffer).unwrap();
        let dims = bbox.space().unwrap();
        assert_eq!(
            (dims.xmin, dims.xmax, dims.ymin, dims.ymax),
            (3.0, 7.0, 3.0, 7.0)
        );
    }

    #[test]
    fn distance_over_axis_gaps() {
        let a = sbox(0.0, 1.0, 0.0, 1.0);
        let b = sbox(4.0, 5.0, 5.0, 6.0);
        // Gaps of 3 and 4.
        assert_eq!(a.distance(&b).unwrap(), 5.0);
        assert_eq!(a.distance(&a).unwrap(), 0.0);
    }

    #[test]
    fn z_predicates_require_z() {
        let flat = sbox(0.0, 1.0, 0.0, 1.0);
        assert_eq!(
            flat.is_front(&flat).unwrap_err(),
            TemporalError::DimensionMissing("z")
        );
    }
}
