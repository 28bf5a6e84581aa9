//! Ordered arrays of disjoint, non-adjacent spans, kept normalized at
//! construction, with a precomputed bounding span.

use std::cmp::Ordering;
use std::fmt;

use itertools::Itertools;

use crate::datum::Datum;
use crate::errors::{TemporalError, TemporalResult};
use crate::span::Span;
use crate::timestamp::{TimestampTz, TsDuration};
use crate::types::BaseType;

#[derive(Debug, Clone, PartialEq)]
pub struct SpanSet {
    spans: Vec<Span>,
    bounds: Span,
}

/// The timestamptz-backed span set. A naming alias, not a distinct type.
pub type PeriodSet = SpanSet;

impl SpanSet {
    /// Build from arbitrary spans: sorts by lower bound and folds every
    /// overlapping or adjacent pair.
    pub fn new(spans: Vec<Span>) -> TemporalResult<Self> {
        let Some(first) = spans.first() else {
            return Err(TemporalError::invariant("a span set cannot be empty"));
        };
        let basetype = first.basetype;
        if let Some(odd) = spans.iter().find(|s| {
            s.basetype != basetype && !(s.basetype.is_number() && basetype.is_number())
        }) {
            return Err(TemporalError::mismatch(format!(
                "span set mixes {} with {}",
                <&'static str>::from(basetype),
                <&'static str>::from(odd.basetype)
            )));
        }
        let normalized = Span::normalize_array(&spans);
        Ok(Self::from_normalized(normalized))
    }

    /// Build from spans already known to be sorted, disjoint and
    /// non-adjacent. Callers inside the crate only.
    pub(crate) fn from_normalized(spans: Vec<Span>) -> Self {
        debug_assert!(!spans.is_empty());
        let bounds = spans[0].super_union(&spans[spans.len() - 1]);
        Self { spans, bounds }
    }

    pub fn from_span(span: Span) -> Self {
        Self::from_normalized(vec![span])
    }

    pub fn basetype(&self) -> BaseType {
        self.bounds.basetype
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn span_n(&self, n: usize) -> Option<&Span> {
        self.spans.get(n)
    }

    /// The compact span over the whole union.
    pub fn bounds(&self) -> &Span {
        &self.bounds
    }

    pub fn is_period_set(&self) -> bool {
        self.bounds.is_period()
    }

    /// Total duration of a period set, summed over its periods.
    pub fn duration(&self) -> TemporalResult<TsDuration> {
        let mut total = TsDuration::default();
        for span in &self.spans {
            total = total + span.duration()?;
        }
        Ok(total)
    }

    /// Index of the first span whose upper bound is not left of `value`,
    /// i.e. the candidate span that could contain it.
    fn locate_value(&self, value: &Datum) -> usize {
        self.spans.partition_point(|s| {
            match s.upper.cmp(value) {
                Ok(Ordering::Less) => true,
                Ok(Ordering::Equal) => !s.upper_inc,
                _ => false,
            }
        })
    }

    pub fn contains_value(&self, value: &Datum) -> TemporalResult<bool> {
        if !self.bounds.contains_value(value)? {
            return Ok(false);
        }
        let pos = self.locate_value(value);
        match self.spans.get(pos) {
            Some(span) => span.contains_value(value),
            None => Ok(false),
        }
    }

    pub fn contains_timestamp(&self, t: TimestampTz) -> bool {
        self.contains_value(&Datum::Timestamp(t)).unwrap_or(false)
    }

    pub fn contains_span(&self, other: &Span) -> TemporalResult<bool> {
        if !self.bounds.contains(other)? {
            return Ok(false);
        }
        for span in &self.spans {
            if span.contains(other)? {
                return Ok(true);
            }
            if span.overlaps(other)? {
                // Partial overlap cannot become full containment later.
                return Ok(false);
            }
        }
        Ok(false)
    }

    pub fn contains(&self, other: &Self) -> TemporalResult<bool> {
        for span in &other.spans {
            if !self.contains_span(span)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn overlaps_span(&self, other: &Span) -> TemporalResult<bool> {
        if !self.bounds.overlaps(other)? {
            return Ok(false);
        }
        for span in &self.spans {
            if span.overlaps(other)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn overlaps(&self, other: &Self) -> TemporalResult<bool> {
        if !self.bounds.overlaps(&other.bounds)? {
            return Ok(false);
        }
        let mut i = 0;
        let mut j = 0;
        while i < self.spans.len() && j < other.spans.len() {
            if self.spans[i].overlaps(&other.spans[j])? {
                return Ok(true);
            }
            if self.spans[i].is_left(&other.spans[j])? {
                i += 1;
            } else {
                j += 1;
            }
        }
        Ok(false)
    }

    pub fn adjacent_span(&self, other: &Span) -> TemporalResult<bool> {
        // Only the fringe spans can touch without overlapping.
        Ok(self.spans[0].adjacent(other)?
            || self.spans[self.spans.len() - 1].adjacent(other)?)
    }

    pub fn is_left(&self, other: &Self) -> TemporalResult<bool> {
        self.bounds.is_left(&other.bounds)
    }

    pub fn is_overleft(&self, other: &Self) -> TemporalResult<bool> {
        self.bounds.is_overleft(&other.bounds)
    }

    pub fn is_right(&self, other: &Self) -> TemporalResult<bool> {
        self.bounds.is_right(&other.bounds)
    }

    pub fn is_overright(&self, other: &Self) -> TemporalResult<bool> {
        self.bounds.is_overright(&other.bounds)
    }

    /*************************** set operations ***************************/

    pub fn union_span(&self, other: &Span) -> TemporalResult<Self> {
        let mut spans = self.spans.clone();
        spans.push(other.clone());
        Self::new(spans)
    }

    pub fn union(&self, other: &Self) -> TemporalResult<Self> {
        let mut spans = self.spans.clone();
        spans.extend(other.spans.iter().cloned());
        Self::new(spans)
    }

    pub fn intersection_span(&self, other: &Span) -> TemporalResult<Option<Self>> {
        let mut pieces = Vec::new();
        for span in &self.spans {
            if let Some(piece) = span.intersection(other)? {
                pieces.push(piece);
            }
        }
        if pieces.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::from_normalized(pieces)))
    }

    pub fn intersection(&self, other: &Self) -> TemporalResult<Option<Self>> {
        if !self.bounds.overlaps(&other.bounds)? {
            return Ok(None);
        }
        let mut pieces = Vec::new();
        let mut i = 0;
        let mut j = 0;
        while i < self.spans.len() && j < other.spans.len() {
            if let Some(piece) = self.spans[i].intersection(&other.spans[j])? {
                pieces.push(piece);
            }
            // Advance the side that ends first.
            match self.spans[i].upper_bound().cmp(&other.spans[j].upper_bound())? {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                }
            }
        }
        if pieces.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::from_normalized(pieces)))
    }

    /// Difference of one span against many, allowing multi-piece results.
    fn span_minus_spans(span: &Span, others: &[Span]) -> TemporalResult<Vec<Span>> {
        let mut pieces = vec![span.clone()];
        for other in others {
            let mut next = Vec::with_capacity(pieces.len() + 1);
            for piece in &pieces {
                if !piece.overlaps(other)? {
                    next.push(piece.clone());
                    continue;
                }
                match piece.minus(other) {
                    Ok(Some(rest)) => next.push(rest),
                    Ok(None) => {}
                    Err(TemporalError::NotContiguous(_)) => {
                        // Interior hole: keep both sides.
                        next.push(Span::new(
                            piece.lower.clone(),
                            other.lower.clone(),
                            piece.lower_inc,
                            !other.lower_inc,
                        )?);
                        next.push(Span::new(
                            other.upper.clone(),
                            piece.upper.clone(),
                            !other.upper_inc,
                            piece.upper_inc,
                        )?);
                    }
                    Err(e) => return Err(e),
                }
            }
            pieces = next;
            if pieces.is_empty() {
                break;
            }
        }
        Ok(pieces)
    }

    pub fn minus_span(&self, other: &Span) -> TemporalResult<Option<Self>> {
        let mut pieces = Vec::new();
        for span in &self.spans {
            pieces.extend(Self::span_minus_spans(span, std::slice::from_ref(other))?);
        }
        if pieces.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::from_normalized(pieces)))
    }

    pub fn minus(&self, other: &Self) -> TemporalResult<Option<Self>> {
        let mut pieces = Vec::new();
        for span in &self.spans {
            pieces.extend(Self::span_minus_spans(span, &other.spans)?);
        }
        if pieces.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::from_normalized(pieces)))
    }

    pub fn distance_span(&self, other: &Span) -> TemporalResult<f64> {
        if self.overlaps_span(other)? {
            return Ok(0.0);
        }
        let mut best = f64::INFINITY;
        for span in &self.spans {
            best = best.min(span.distance(other)?);
        }
        Ok(best)
    }

    pub fn distance(&self, other: &Self) -> TemporalResult<f64> {
        if self.overlaps(other)? {
            return Ok(0.0);
        }
        let mut best = f64::INFINITY;
        for span in &other.spans {
            best = best.min(self.distance_span(span)?);
        }
        Ok(best)
    }

    pub fn shift_tscale(
        &self,
        shift: Option<TsDuration>,
        duration: Option<TsDuration>,
    ) -> TemporalResult<Self> {
        // Scaling maps the whole extent onto the new duration, keeping the
        // relative layout of the member periods.
        let old_bounds = &self.bounds;
        let new_bounds = old_bounds.shift_tscale(shift, duration)?;
        let old_width = old_bounds.width();
        let new_width = new_bounds.width();

        let old_start = old_bounds.lower.as_timestamp().unwrap_or_default();
        let new_start = new_bounds.lower.as_timestamp().unwrap_or_default();

        let remap = |t: TimestampTz| -> TimestampTz {
            if old_width == 0.0 {
                return new_start;
            }
            let offset = (t.micros() - old_start.micros()) as f64 / (old_width * 1e6);
            TimestampTz::from_micros(
                new_start.micros() + (offset * new_width * 1e6).round() as i64,
            )
        };

        let spans = self
            .spans
            .iter()
            .map(|s| {
                let lo = s.lower.as_timestamp().ok_or_else(|| {
                    TemporalError::mismatch("span set is not a period set")
                })?;
                let hi = s.upper.as_timestamp().ok_or_else(|| {
                    TemporalError::mismatch("span set is not a period set")
                })?;
                Span::period(remap(lo), remap(hi), s.lower_inc, s.upper_inc)
            })
            .collect::<TemporalResult<Vec<_>>>()?;
        Ok(Self::from_normalized(spans))
    }
}

impl fmt::Display for SpanSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.spans.iter().join(", "))
    }
}
