//! Bounded intervals over an ordered base type.
//!
//! The four-way [`SpanBound`] comparator is the single source of truth for
//! every topological predicate here and in the span-set and box layers;
//! nothing re-derives the inclusivity rules inline.

use std::cmp::Ordering;
use std::fmt;

use crate::datum::Datum;
use crate::errors::{TemporalError, TemporalResult};
use crate::timestamp::{TimestampTz, TsDuration};
use crate::types::BaseType;

/// One bound of a span: its value, inclusivity, and whether it plays the
/// lower or the upper role.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanBound {
    pub val: Datum,
    pub inclusive: bool,
    pub lower: bool,
}

impl SpanBound {
    pub fn lower(val: Datum, inclusive: bool) -> Self {
        Self {
            val,
            inclusive,
            lower: true,
        }
    }

    pub fn upper(val: Datum, inclusive: bool) -> Self {
        Self {
            val,
            inclusive,
            lower: false,
        }
    }

    /// Compare two bounds: values first, then inclusivity crossed with the
    /// lower/upper role. Two equal-valued exclusive bounds differ iff one
    /// is a lower and the other an upper; an exclusive lower sorts after
    /// and an exclusive upper sorts before an inclusive bound at the same
    /// value.
    pub fn cmp(&self, other: &Self) -> TemporalResult<Ordering> {
        let cmp = self.val.cmp(&other.val)?;
        if cmp != Ordering::Equal {
            return Ok(cmp);
        }
        if !self.inclusive && !other.inclusive {
            return Ok(if self.lower == other.lower {
                Ordering::Equal
            } else if self.lower {
                Ordering::Greater
            } else {
                Ordering::Less
            });
        }
        if !self.inclusive {
            return Ok(if self.lower {
                Ordering::Greater
            } else {
                Ordering::Less
            });
        }
        if !other.inclusive {
            return Ok(if other.lower {
                Ordering::Less
            } else {
                Ordering::Greater
            });
        }
        Ok(Ordering::Equal)
    }
}

/// A non-empty interval over an ordered base type, with per-bound
/// inclusivity. Empty spans are unrepresentable; "empty" is absence.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub lower: Datum,
    pub upper: Datum,
    pub lower_inc: bool,
    pub upper_inc: bool,
    pub basetype: BaseType,
}

/// The timestamptz-backed span. A naming alias, not a distinct type.
pub type Period = Span;

impl Span {
    pub fn new(
        lower: Datum,
        upper: Datum,
        lower_inc: bool,
        upper_inc: bool,
    ) -> TemporalResult<Self> {
        let basetype = lower.basetype();
        basetype.ensure_span_basetype()?;
        let cmp = lower.cmp(&upper)?;
        if cmp == Ordering::Greater {
            return Err(TemporalError::invariant(
                "span lower bound must be less than or equal to its upper bound",
            ));
        }
        if cmp == Ordering::Equal && !(lower_inc && upper_inc) {
            return Err(TemporalError::invariant("span cannot be empty"));
        }
        Ok(Self {
            lower,
            upper,
            lower_inc,
            upper_inc,
            basetype,
        })
    }

    pub fn period(
        lower: TimestampTz,
        upper: TimestampTz,
        lower_inc: bool,
        upper_inc: bool,
    ) -> TemporalResult<Self> {
        Self::new(
            Datum::Timestamp(lower),
            Datum::Timestamp(upper),
            lower_inc,
            upper_inc,
        )
    }

    /// A period whose bounds are already known to be ordered.
    pub(crate) fn period_unchecked(
        lower: TimestampTz,
        upper: TimestampTz,
        lower_inc: bool,
        upper_inc: bool,
    ) -> Self {
        Self {
            lower: Datum::Timestamp(lower),
            upper: Datum::Timestamp(upper),
            lower_inc,
            upper_inc,
            basetype: BaseType::Timestamp,
        }
    }

    /// A closed span whose bounds are already known to be ordered.
    pub(crate) fn closed_unchecked(lower: Datum, upper: Datum) -> Self {
        let basetype = lower.basetype();
        Self {
            lower,
            upper,
            lower_inc: true,
            upper_inc: true,
            basetype,
        }
    }

    /// The closed single-value span `[value, value]`.
    pub fn singleton(value: Datum) -> TemporalResult<Self> {
        let upper = value.clone();
        Self::new(value, upper, true, true)
    }

    pub fn float(lower: f64, upper: f64, lower_inc: bool, upper_inc: bool) -> TemporalResult<Self> {
        Self::new(
            Datum::Float(lower),
            Datum::Float(upper),
            lower_inc,
            upper_inc,
        )
    }

    pub fn int(lower: i32, upper: i32, lower_inc: bool, upper_inc: bool) -> TemporalResult<Self> {
        Self::new(Datum::Int(lower), Datum::Int(upper), lower_inc, upper_inc)
    }

    pub fn lower_bound(&self) -> SpanBound {
        SpanBound::lower(self.lower.clone(), self.lower_inc)
    }

    pub fn upper_bound(&self) -> SpanBound {
        SpanBound::upper(self.upper.clone(), self.upper_inc)
    }

    pub fn is_period(&self) -> bool {
        self.basetype == BaseType::Timestamp
    }

    /// Width of a numeric span as a float, or duration of a period in
    /// seconds. Used by the index penalty functions.
    pub fn width(&self) -> f64 {
        self.lower.distance(&self.upper).unwrap_or(0.0)
    }

    pub fn duration(&self) -> TemporalResult<TsDuration> {
        match (&self.lower, &self.upper) {
            (Datum::Timestamp(lo), Datum::Timestamp(hi)) => Ok(*hi - *lo),
            _ => Err(TemporalError::mismatch("span is not a period")),
        }
    }

    fn lower_cmp(&self, other: &Self) -> TemporalResult<Ordering> {
        self.lower_bound().cmp(&other.lower_bound())
    }

    fn upper_cmp(&self, other: &Self) -> TemporalResult<Ordering> {
        self.upper_bound().cmp(&other.upper_bound())
    }

    /// Total order for sorting: lower bounds first, upper bounds break ties.
    pub fn cmp_spans(&self, other: &Self) -> Ordering {
        match self.lower_cmp(other) {
            Ok(Ordering::Equal) => self.upper_cmp(other).unwrap_or(Ordering::Equal),
            Ok(ordering) => ordering,
            Err(_) => Ordering::Equal,
        }
    }

    /*************************** topology ***************************/

    pub fn contains_value(&self, value: &Datum) -> TemporalResult<bool> {
        let lo = self.lower.cmp(value)?;
        let hi = self.upper.cmp(value)?;
        Ok((lo == Ordering::Less || (lo == Ordering::Equal && self.lower_inc))
            && (hi == Ordering::Greater || (hi == Ordering::Equal && self.upper_inc)))
    }

    pub fn contains(&self, other: &Self) -> TemporalResult<bool> {
        Ok(self.lower_cmp(other)? != Ordering::Greater
            && self.upper_cmp(other)? != Ordering::Less)
    }

    pub fn contained_in(&self, other: &Self) -> TemporalResult<bool> {
        other.contains(self)
    }

    pub fn overlaps(&self, other: &Self) -> TemporalResult<bool> {
        let c1 = self.lower.cmp(&other.upper)?;
        let c2 = other.lower.cmp(&self.upper)?;
        Ok((c1 == Ordering::Less
            || (c1 == Ordering::Equal && self.lower_inc && other.upper_inc))
            && (c2 == Ordering::Less
                || (c2 == Ordering::Equal && other.lower_inc && self.upper_inc)))
    }

    /// Two spans are adjacent when they touch at one bound with
    /// complementary inclusivity and do not overlap.
    pub fn adjacent(&self, other: &Self) -> TemporalResult<bool> {
        Ok((self.upper.cmp(&other.lower)? == Ordering::Equal
            && self.upper_inc != other.lower_inc)
            || (other.upper.cmp(&self.lower)? == Ordering::Equal
                && other.upper_inc != self.lower_inc))
    }

    pub fn is_left(&self, other: &Self) -> TemporalResult<bool> {
        let cmp = self.upper.cmp(&other.lower)?;
        Ok(cmp == Ordering::Less
            || (cmp == Ordering::Equal && !(self.upper_inc && other.lower_inc)))
    }

    pub fn is_right(&self, other: &Self) -> TemporalResult<bool> {
        other.is_left(self)
    }

    /// Does not extend to the right of `other`.
    pub fn is_overleft(&self, other: &Self) -> TemporalResult<bool> {
        let cmp = self.upper.cmp(&other.upper)?;
        Ok(cmp == Ordering::Less
            || (cmp == Ordering::Equal && (!self.upper_inc || other.upper_inc)))
    }

    /// Does not extend to the left of `other`.
    pub fn is_overright(&self, other: &Self) -> TemporalResult<bool> {
        let cmp = other.lower.cmp(&self.lower)?;
        Ok(cmp == Ordering::Less
            || (cmp == Ordering::Equal && (!other.lower_inc || self.lower_inc)))
    }

    pub fn is_before(&self, t: TimestampTz) -> TemporalResult<bool> {
        let cmp = self.upper.cmp(&Datum::Timestamp(t))?;
        Ok(cmp == Ordering::Less || (cmp == Ordering::Equal && !self.upper_inc))
    }

    pub fn is_after(&self, t: TimestampTz) -> TemporalResult<bool> {
        let cmp = Datum::Timestamp(t).cmp(&self.lower)?;
        Ok(cmp == Ordering::Less || (cmp == Ordering::Equal && !self.lower_inc))
    }

    /*************************** set operations ***************************/

    /// Grow `self` so it covers `other` as well.
    pub fn expand(&mut self, other: &Self) {
        if matches!(self.lower_cmp(other), Ok(Ordering::Greater)) {
            self.lower = other.lower.clone();
            self.lower_inc = other.lower_inc;
        }
        if matches!(self.upper_cmp(other), Ok(Ordering::Less)) {
            self.upper = other.upper.clone();
            self.upper_inc = other.upper_inc;
        }
    }

    /// The smallest span covering both operands, absorbing any gap.
    pub fn super_union(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.expand(other);
        result
    }

    /// Union of overlapping or adjacent spans; anything else raises
    /// `NotContiguous`.
    pub fn union(&self, other: &Self) -> TemporalResult<Self> {
        if !self.overlaps(other)? && !self.adjacent(other)? {
            return Err(TemporalError::NotContiguous(
                "the union of the two spans would have a gap",
            ));
        }
        Ok(self.super_union(other))
    }

    pub fn intersection(&self, other: &Self) -> TemporalResult<Option<Self>> {
        if !self.overlaps(other)? {
            return Ok(None);
        }
        let (lower, lower_inc) = match self.lower.cmp(&other.lower)? {
            Ordering::Less => (other.lower.clone(), other.lower_inc),
            Ordering::Greater => (self.lower.clone(), self.lower_inc),
            Ordering::Equal => (self.lower.clone(), self.lower_inc && other.lower_inc),
        };
        let (upper, upper_inc) = match self.upper.cmp(&other.upper)? {
            Ordering::Less => (self.upper.clone(), self.upper_inc),
            Ordering::Greater => (other.upper.clone(), other.upper_inc),
            Ordering::Equal => (self.upper.clone(), self.upper_inc && other.upper_inc),
        };
        Ok(Some(Span::new(lower, upper, lower_inc, upper_inc)?))
    }

    /// Difference `self \ other` as at most one span. When `other` is
    /// strictly interior the result would be two spans, which raises
    /// `NotContiguous`; the span-set layer handles that shape.
    pub fn minus(&self, other: &Self) -> TemporalResult<Option<Self>> {
        let cmp_l1l2 = self.lower_bound().cmp(&other.lower_bound())?;
        let cmp_l1u2 = self.lower_bound().cmp(&other.upper_bound())?;
        let cmp_u1l2 = self.upper_bound().cmp(&other.lower_bound())?;
        let cmp_u1u2 = self.upper_bound().cmp(&other.upper_bound())?;

        if cmp_l1l2 == Ordering::Less && cmp_u1u2 == Ordering::Greater {
            return Err(TemporalError::NotContiguous(
                "the span difference would be two disjoint spans",
            ));
        }
        if cmp_l1l2 != Ordering::Less && cmp_u1u2 != Ordering::Greater {
            return Ok(None);
        }
        if cmp_l1u2 == Ordering::Greater || cmp_u1l2 == Ordering::Less {
            return Ok(Some(self.clone()));
        }
        if cmp_l1l2 != Ordering::Greater && cmp_u1u2 != Ordering::Greater {
            return Ok(Some(Span::new(
                self.lower.clone(),
                other.lower.clone(),
                self.lower_inc,
                !other.lower_inc,
            )?));
        }
        Ok(Some(Span::new(
            other.upper.clone(),
            self.upper.clone(),
            !other.upper_inc,
            self.upper_inc,
        )?))
    }

    /// Zero when the spans overlap, else the base distance between the
    /// nearest bounds (seconds for periods).
    pub fn distance(&self, other: &Self) -> TemporalResult<f64> {
        if self.overlaps(other)? {
            return Ok(0.0);
        }
        if self.is_left(other)? {
            self.upper.distance(&other.lower)
        } else {
            other.upper.distance(&self.lower)
        }
    }

    pub fn distance_to_value(&self, value: &Datum) -> TemporalResult<f64> {
        if self.contains_value(value)? {
            return Ok(0.0);
        }
        let to_lower = self.lower.distance(value)?;
        let to_upper = self.upper.distance(value)?;
        Ok(to_lower.min(to_upper))
    }

    /*************************** transformations ***************************/

    /// Translate both bounds by a delta of the base type's difference type.
    pub fn shift_by(&self, delta: &Datum) -> TemporalResult<Self> {
        let shift_bound = |bound: &Datum| -> TemporalResult<Datum> {
            match (bound, delta) {
                (Datum::Timestamp(t), Datum::Timestamp(d)) => {
                    Ok(Datum::Timestamp(t.checked_add(TsDuration(d.micros()))?))
                }
                _ => bound.add(delta),
            }
        };
        Span::new(
            shift_bound(&self.lower)?,
            shift_bound(&self.upper)?,
            self.lower_inc,
            self.upper_inc,
        )
    }

    /// Shift and/or rescale a period, keeping the lower bound anchored
    /// when only a new duration is given.
    pub fn shift_tscale(
        &self,
        shift: Option<TsDuration>,
        duration: Option<TsDuration>,
    ) -> TemporalResult<Self> {
        let (lower, upper) = match (&self.lower, &self.upper) {
            (Datum::Timestamp(lo), Datum::Timestamp(hi)) => (*lo, *hi),
            _ => return Err(TemporalError::mismatch("span is not a period")),
        };
        if let Some(duration) = duration {
            if !duration.is_positive() {
                return Err(TemporalError::invariant("duration must be positive"));
            }
        }
        let lower = match shift {
            Some(delta) => lower.checked_add(delta)?,
            None => lower,
        };
        // The shifted lower bound anchors the new duration.
        let upper = match (shift, duration) {
            (_, Some(duration)) => lower.checked_add(duration)?,
            (Some(delta), None) => upper.checked_add(delta)?,
            (None, None) => upper,
        };
        Span::period(lower, upper, self.lower_inc, self.upper_inc)
    }

    /// Sort by lower bound and fold every overlapping or adjacent pair;
    /// the result is disjoint, non-adjacent and ordered.
    pub fn normalize_array(spans: &[Span]) -> Vec<Span> {
        if spans.is_empty() {
            return Vec::new();
        }
        let mut sorted = spans.to_vec();
        sorted.sort_by(Span::cmp_spans);

        let mut result: Vec<Span> = Vec::with_capacity(sorted.len());
        let mut current = sorted[0].clone();
        for next in &sorted[1..] {
            let merge = current.overlaps(next).unwrap_or(false)
                || current.adjacent(next).unwrap_or(false);
            if merge {
                current.expand(next);
            } else {
                result.push(std::mem::replace(&mut current, next.clone()));
            }
        }
        result.push(current);
        result
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}, {}{}",
            if self.lower_inc { '[' } else { '(' },
            self.lower,
            self.upper,
            if self.upper_inc { ']' } else { ')' },
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn fspan(lo: f64, hi: f64, li: bool, ui: bool) -> Span {
        Span::float(lo, hi, li, ui).unwrap()
    }

    #[test]
    fn construction_rejects_empty_and_inverted() {
        Span::float(5.0, 1.0, true, true).unwrap_err();
        Span::float(1.0, 1.0, true, false).unwrap_err();
        Span::float(1.0, 1.0, true, true).unwrap();
    }

    #[test]
    fn bound_comparator_four_way_rules() {
        let v = Datum::Float(1.0);
        let excl_lower = SpanBound::lower(v.clone(), false);
        let excl_upper = SpanBound::upper(v.clone(), false);
        let incl_lower = SpanBound::lower(v.clone(), true);
        let incl_upper = SpanBound::upper(v.clone(), true);

        assert_eq!(excl_lower.cmp(&excl_upper).unwrap(), Ordering::Greater);
        assert_eq!(excl_upper.cmp(&excl_lower).unwrap(), Ordering::Less);
        assert_eq!(excl_lower.cmp(&incl_lower).unwrap(), Ordering::Greater);
        assert_eq!(excl_upper.cmp(&incl_upper).unwrap(), Ordering::Less);
        assert_eq!(incl_lower.cmp(&incl_upper).unwrap(), Ordering::Equal);
    }

    #[test]
    fn float_span_topology_scenario() {
        // A = [1.0, 5.0), B = (3.0, 7.0]
        let a = fspan(1.0, 5.0, true, false);
        let b = fspan(3.0, 7.0, false, true);

        assert!(!a.contains(&b).unwrap());
        assert!(a.overlaps(&b).unwrap());
        assert!(!a.adjacent(&b).unwrap());
        assert_eq!(
            a.intersection(&b).unwrap().unwrap(),
            fspan(3.0, 5.0, false, false)
        );
        assert_eq!(a.union(&b).unwrap(), fspan(1.0, 7.0, true, true));
        assert_eq!(a.distance(&b).unwrap(), 0.0);
    }

    #[test]
    fn adjacency_needs_complementary_bounds() {
        let a = fspan(1.0, 2.0, true, false);
        let b = fspan(2.0, 3.0, true, false);
        assert!(a.adjacent(&b).unwrap());
        assert!(!a.overlaps(&b).unwrap());
        assert_eq!(a.union(&b).unwrap(), fspan(1.0, 3.0, true, false));

        // Both exclusive at the shared value: a gap of one point.
        let c = fspan(2.0, 3.0, false, true);
        assert!(!a.adjacent(&c).unwrap());
        a.union(&c).unwrap_err();
    }

    #[test]
    fn minus_shapes() {
        let a = fspan(1.0, 5.0, true, false);

        // Interior hole is not contiguous.
        assert_eq!(
            a.minus(&fspan(2.0, 3.0, true, true)).unwrap_err(),
            TemporalError::NotContiguous("the span difference would be two disjoint spans")
        );

        // Right overlap trims the upper side.
        assert_eq!(
            a.minus(&fspan(3.0, 7.0, true, true)).unwrap().unwrap(),
            fspan(1.0, 3.0, true, false)
        );

        // Left overlap trims the lower side.
        assert_eq!(
            a.minus(&fspan(0.0, 2.0, true, true)).unwrap().unwrap(),
            fspan(2.0, 5.0, false, false)
        );

        // Disjoint spans leave the operand untouched.
        assert_eq!(a.minus(&fspan(8.0, 9.0, true, true)).unwrap().unwrap(), a);

        // Full cover empties the result.
        assert_eq!(a.minus(&fspan(0.0, 9.0, true, true)).unwrap(), None);
    }

    #[test]
    fn self_intersection_is_identity() {
        let s = fspan(1.0, 5.0, true, false);
        assert_eq!(s.intersection(&s).unwrap().unwrap(), s);
    }

    #[test]
    fn distance_between_disjoint_spans() {
        let a = fspan(1.0, 2.0, true, true);
        let b = fspan(5.0, 6.0, true, true);
        assert_eq!(a.distance(&b).unwrap(), 3.0);
        assert_eq!(b.distance(&a).unwrap(), 3.0);
        assert_eq!(a.distance_to_value(&Datum::Float(8.0)).unwrap(), 2.0);
    }

    #[test]
    fn mixed_numeric_membership() {
        let s = fspan(1.0, 5.0, true, false);
        assert!(s.contains_value(&Datum::Int(3)).unwrap());
        assert!(!s.contains_value(&Datum::Int(5)).unwrap());
    }

    #[test]
    fn normalization_folds_neighbours() {
        let spans = vec![
            fspan(6.0, 7.0, true, true),
            fspan(1.0, 3.0, true, false),
            fspan(3.0, 4.0, true, true),
            fspan(3.5, 5.0, true, false),
        ];
        let normalized = Span::normalize_array(&spans);
        assert_eq!(
            normalized,
            vec![fspan(1.0, 5.0, true, false), fspan(6.0, 7.0, true, true)]
        );
    }

    #[test]
    fn period_bound_semantics_scenario() {
        let t = |s: &str| TimestampTz::parse(s).unwrap();
        let p = Span::period(t("2000-01-01"), t("2000-01-02"), true, false).unwrap();
        let q = Span::period(t("2000-01-02"), t("2000-01-03"), true, false).unwrap();

        assert!(!p.overlaps(&q).unwrap());
        assert!(p.adjacent(&q).unwrap());
        let union = p.union(&q).unwrap();
        assert_eq!(
            union,
            Span::period(t("2000-01-01"), t("2000-01-03"), true, false).unwrap()
        );
        assert_eq!(p.distance(&q).unwrap(), 0.0);
    }

    #[test]
    fn shift_tscale_keeps_lower_anchored() {
        let t = |s: &str| TimestampTz::parse(s).unwrap();
        let p = Span::period(t("2000-01-01"), t("2000-01-02"), true, false).unwrap();

        let scaled = p.shift_tscale(None, Some(TsDuration::from_hours(6))).unwrap();
        assert_eq!(
            scaled,
            Span::period(t("2000-01-01"), t("2000-01-01 06:00:00+00"), true, false).unwrap()
        );

        let shifted = p.shift_tscale(Some(TsDuration::from_days(1)), None).unwrap();
        assert_eq!(
            shifted,
            Span::period(t("2000-01-02"), t("2000-01-03"), true, false).unwrap()
        );
    }
}
