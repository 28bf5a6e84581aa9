//! The temporal box: an optional numeric span times an optional period.
//! At least one dimension is always present. Topological predicates use
//! project semantics on missing dimensions; `same` is strict.

use std::fmt;

use crate::datum::Datum;
use crate::errors::{TemporalError, TemporalResult};
use crate::span::Span;
use crate::timestamp::{TimestampTz, TsDuration};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TBox {
    x: Option<Span>,
    t: Option<Span>,
}

impl TBox {
    pub fn new(x: Option<Span>, t: Option<Span>) -> TemporalResult<Self> {
        if x.is_none() && t.is_none() {
            return Err(TemporalError::invariant(
                "a temporal box needs at least one dimension",
            ));
        }
        if let Some(span) = &x {
            if !span.basetype.is_number() {
                return Err(TemporalError::mismatch(
                    "the value dimension of a temporal box must be numeric",
                ));
            }
        }
        if let Some(span) = &t {
            if !span.is_period() {
                return Err(TemporalError::mismatch(
                    "the time dimension of a temporal box must be a period",
                ));
            }
        }
        Ok(Self { x, t })
    }

    /// A box whose dimensions are already known to be well formed.
    pub(crate) fn new_unchecked(x: Option<Span>, t: Option<Span>) -> Self {
        Self { x, t }
    }

    pub fn from_value(value: &Datum) -> TemporalResult<Self> {
        Self::new(Some(Span::singleton(value.clone())?), None)
    }

    pub fn from_timestamp(t: TimestampTz) -> TemporalResult<Self> {
        Self::new(None, Some(Span::period(t, t, true, true)?))
    }

    pub fn from_value_timestamp(value: &Datum, t: TimestampTz) -> TemporalResult<Self> {
        Self::new(
            Some(Span::singleton(value.clone())?),
            Some(Span::period(t, t, true, true)?),
        )
    }

    pub fn from_span(span: Span) -> TemporalResult<Self> {
        Self::new(Some(span), None)
    }

    pub fn from_period(period: Span) -> TemporalResult<Self> {
        Self::new(None, Some(period))
    }

    pub fn has_x(&self) -> bool {
        self.x.is_some()
    }

    pub fn has_t(&self) -> bool {
        self.t.is_some()
    }

    pub fn x(&self) -> Option<&Span> {
        self.x.as_ref()
    }

    pub fn t(&self) -> Option<&Span> {
        self.t.as_ref()
    }

    pub fn x_required(&self) -> TemporalResult<&Span> {
        self.x.as_ref().ok_or(TemporalError::DimensionMissing("value"))
    }

    pub fn t_required(&self) -> TemporalResult<&Span> {
        self.t.as_ref().ok_or(TemporalError::DimensionMissing("time"))
    }

    /// Run `pred` on every dimension present in both boxes; errors when
    /// the boxes share no dimension at all.
    fn project_dims(
        &self,
        other: &Self,
        mut pred: impl FnMut(&Span, &Span) -> TemporalResult<bool>,
    ) -> TemporalResult<bool> {
        let mut shared = false;
        if let (Some(a), Some(b)) = (&self.x, &other.x) {
            shared = true;
            if !pred(a, b)? {
                return Ok(false);
            }
        }
        if let (Some(a), Some(b)) = (&self.t, &other.t) {
            shared = true;
            if !pred(a, b)? {
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
        self.project_dims(other, |a, b| a.contains(b))
    }

    pub fn contained_in(&self, other: &Self) -> TemporalResult<bool> {
        other.contains(self)
    }

    pub fn overlaps(&self, other: &Self) -> TemporalResult<bool> {
        self.project_dims(other, |a, b| a.overlaps(b))
    }

    /// Strict: both boxes must carry exactly the same dimensions.
    pub fn same(&self, other: &Self) -> TemporalResult<bool> {
        if self.has_x() != other.has_x() || self.has_t() != other.has_t() {
            return Ok(false);
        }
        Ok(self == other)
    }

    pub fn adjacent(&self, other: &Self) -> TemporalResult<bool> {
        // Adjacent means touching on some shared dimension while
        // overlapping on every other shared one.
        if !self.project_dims(other, |a, b| {
            Ok(a.overlaps(b)? || a.adjacent(b)?)
        })? {
            return Ok(false);
        }
        let mut touches = false;
        if let (Some(a), Some(b)) = (&self.x, &other.x) {
            touches |= a.adjacent(b)?;
        }
        if let (Some(a), Some(b)) = (&self.t, &other.t) {
            touches |= a.adjacent(b)?;
        }
        Ok(touches)
    }

    /*********************** position predicates ***********************/

    pub fn is_left(&self, other: &Self) -> TemporalResult<bool> {
        self.x_required()?.is_left(other.x_required()?)
    }

    pub fn is_overleft(&self, other: &Self) -> TemporalResult<bool> {
        self.x_required()?.is_overleft(other.x_required()?)
    }

    pub fn is_right(&self, other: &Self) -> TemporalResult<bool> {
        self.x_required()?.is_right(other.x_required()?)
    }

    pub fn is_overright(&self, other: &Self) -> TemporalResult<bool> {
        self.x_required()?.is_overright(other.x_required()?)
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

    /// Grow `self` to cover `other`. Dimension sets must match.
    pub fn expand(&mut self, other: &Self) -> TemporalResult<()> {
        if self.has_x() != other.has_x() || self.has_t() != other.has_t() {
            return Err(TemporalError::mismatch(
                "cannot expand boxes with different dimensions",
            ));
        }
        if let (Some(a), Some(b)) = (&mut self.x, &other.x) {
            a.expand(b);
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

    /// Intersect the dimensions present in both operands; `None` when any
    /// shared dimension comes out empty.
    pub fn intersection(&self, other: &Self) -> TemporalResult<Option<Self>> {
        let x = match (&self.x, &other.x) {
            (Some(a), Some(b)) => match a.intersection(b)? {
                Some(span) => Some(span),
                None => return Ok(None),
            },
            _ => None,
        };
        let t = match (&self.t, &other.t) {
            (Some(a), Some(b)) => match a.intersection(b)? {
                Some(span) => Some(span),
                None => return Ok(None),
            },
            _ => None,
        };
        if x.is_none() && t.is_none() {
            return Err(TemporalError::mismatch(
                "the boxes share no dimension to intersect",
            ));
        }
        Ok(Some(Self { x, t }))
    }

    /// Widen the value dimension by `margin` on both sides.
    pub fn expand_value(&self, margin: f64) -> TemporalResult<Self> {
        let span = self.x_required()?;
        let lower = span.lower.add(&Datum::Float(-margin))?;
        let upper = span.upper.add(&Datum::Float(margin))?;
        Ok(Self {
            x: Some(Span::new(lower, upper, span.lower_inc, span.upper_inc)?),
            t: self.t.clone(),
        })
    }

    /// Widen the time dimension by `margin` on both sides.
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
        Ok(Self {
            x: self.x.clone(),
            t: Some(Span::period(lower, upper, period.lower_inc, period.upper_inc)?),
        })
    }

    pub fn shift_tscale(
        &self,
        shift: Option<TsDuration>,
        duration: Option<TsDuration>,
    ) -> TemporalResult<Self> {
        Ok(Self {
            x: self.x.clone(),
            t: Some(self.t_required()?.shift_tscale(shift, duration)?),
        })
    }

    /// Nearest distance between two boxes over their shared dimensions:
    /// the hypotenuse of the value gap and the time gap in seconds.
    pub fn distance(&self, other: &Self) -> TemporalResult<f64> {
        let mut dx = 0.0;
        let mut dt = 0.0;
        let mut shared = false;
        if let (Some(a), Some(b)) = (&self.x, &other.x) {
            shared = true;
            dx = a.distance(b)?;
        }
        if let (Some(a), Some(b)) = (&self.t, &other.t) {
            shared = true;
            dt = a.distance(b)?;
        }
        if !shared {
            return Err(TemporalError::mismatch(
                "the boxes share no dimension to measure",
            ));
        }
        Ok((dx * dx + dt * dt).sqrt())
    }
}

impl fmt::Display for TBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.x, &self.t) {
            (Some(x), Some(t)) => write!(f, "TBOX XT({x}, {t})"),
            (Some(x), None) => write!(f, "TBOX X({x})"),
            (None, Some(t)) => write!(f, "TBOX T({t})"),
            (None, None) => write!(f, "TBOX()"),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn xt(lo: f64, hi: f64, t1: &str, t2: &str) -> TBox {
        let ts = |s: &str| TimestampTz::parse(s).unwrap();
        TBox::new(
            Some(Span::float(lo, hi, true, true).unwrap()),
            Some(Span::period(ts(t1), ts(t2), true, true).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn needs_a_dimension() {
        TBox::new(None, None).unwrap_err();
    }

    #[test]
    fn project_semantics_on_missing_dimensions() {
        let full = xt(1.0, 5.0, "2000-01-01", "2000-01-05");
        let x_only = TBox::from_span(Span::float(2.0, 3.0, true, true).unwrap()).unwrap();

        // Only the value dimension is compared.
        assert!(full.contains(&x_only).unwrap());
        assert!(full.overlaps(&x_only).unwrap());

        // Strict equality needs identical dimension sets.
        assert!(!full.same(&x_only).unwrap());

        // Time-position predicates demand the time dimension.
        assert_eq!(
            full.is_before(&x_only).unwrap_err(),
            TemporalError::DimensionMissing("time")
        );
    }

    #[test]
    fn union_and_intersection() {
        let a = xt(1.0, 3.0, "2000-01-01", "2000-01-03");
        let b = xt(2.0, 5.0, "2000-01-02", "2000-01-05");

        assert_eq!(a.union(&b).unwrap(), xt(1.0, 5.0, "2000-01-01", "2000-01-05"));
        assert_eq!(
            a.intersection(&b).unwrap().unwrap(),
            xt(2.0, 3.0, "2000-01-02", "2000-01-03")
        );

        let disjoint = xt(7.0, 9.0, "2000-01-01", "2000-01-03");
        assert_eq!(a.intersection(&disjoint).unwrap(), None);
    }

    #[test]
    fn expansion() {
        let a = xt(1.0, 3.0, "2000-01-01", "2000-01-03");
        let widened = a.expand_value(1.0).unwrap();
        assert_eq!(widened.x().unwrap(), &Span::float(0.0, 4.0, true, true).unwrap());

        let longer = a.expand_time(TsDuration::from_days(1)).unwrap();
        assert_eq!(
            longer.t().unwrap(),
            &Span::period(
                TimestampTz::parse("1999-12-31").unwrap(),
                TimestampTz::parse("2000-01-04").unwrap(),
                true,
                true
            )
            .unwrap()
        );
    }

    #[test]
    fn distance_is_a_hypotenuse() {
        let a = xt(0.0, 1.0, "2000-01-01 00:00:00+00", "2000-01-01 00:00:01+00");
        let b = xt(4.0, 5.0, "2000-01-01 00:00:05+00", "2000-01-01 00:00:06+00");
        // 3 apart in value, 4 seconds apart in time.
        assert_eq!(a.distance(&b).unwrap(), 5.0);
    }
}
