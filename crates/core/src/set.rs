//! Ordered, duplicate-free sets of base values, with a bounding span kept
//! alongside so span predicates run on the bounds before touching the
//! elements.

use std::cmp::Ordering;
use std::fmt;

use itertools::Itertools;

use crate::datum::Datum;
use crate::errors::{TemporalError, TemporalResult};
use crate::span::Span;
use crate::timestamp::TimestampTz;
use crate::types::BaseType;

#[derive(Debug, Clone, PartialEq)]
pub struct Set {
    values: Vec<Datum>,
    basetype: BaseType,
    /// Closed span from the first to the last element; absent for base
    /// types that do not support spans (e.g. text).
    bounds: Option<Span>,
}

impl Set {
    /// Build a set from arbitrary values of one base type: sorts,
    /// deduplicates, and computes the bounding span.
    pub fn new(values: Vec<Datum>) -> TemporalResult<Self> {
        let Some(first) = values.first() else {
            return Err(TemporalError::invariant("a set cannot be empty"));
        };
        let basetype = first.basetype();
        if !basetype.is_ordered() {
            return Err(TemporalError::mismatch(format!(
                "sets require an ordered base type, got {}",
                <&'static str>::from(basetype)
            )));
        }
        if let Some(odd) = values.iter().find(|v| v.basetype() != basetype) {
            return Err(TemporalError::mismatch(format!(
                "set mixes {} with {}",
                <&'static str>::from(basetype),
                <&'static str>::from(odd.basetype())
            )));
        }

        let mut values = values;
        values.sort_by(|a, b| a.cmp(b).unwrap_or(Ordering::Equal));
        values.dedup_by(|a, b| a.datum_eq(b));

        let bounds = if basetype.is_span_basetype() {
            Some(Span::new(
                values[0].clone(),
                values[values.len() - 1].clone(),
                true,
                true,
            )?)
        } else {
            None
        };
        Ok(Self {
            values,
            basetype,
            bounds,
        })
    }

    pub fn timestamps(values: Vec<TimestampTz>) -> TemporalResult<Self> {
        Self::new(values.into_iter().map(Datum::Timestamp).collect())
    }

    pub fn basetype(&self) -> BaseType {
        self.basetype
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Datum] {
        &self.values
    }

    pub fn value_n(&self, n: usize) -> Option<&Datum> {
        self.values.get(n)
    }

    pub fn start_value(&self) -> &Datum {
        &self.values[0]
    }

    pub fn end_value(&self) -> &Datum {
        &self.values[self.values.len() - 1]
    }

    /// The closed bounding span, for base types that have one.
    pub fn bounds(&self) -> Option<&Span> {
        self.bounds.as_ref()
    }

    fn locate(&self, value: &Datum) -> Result<usize, usize> {
        self.values
            .binary_search_by(|probe| probe.cmp(value).unwrap_or(Ordering::Equal))
    }

    pub fn contains_value(&self, value: &Datum) -> bool {
        self.locate(value).is_ok()
    }

    pub fn contains(&self, other: &Self) -> bool {
        other.values.iter().all(|v| self.contains_value(v))
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        // Linear merge over the two sorted arrays.
        let mut i = 0;
        let mut j = 0;
        while i < self.values.len() && j < other.values.len() {
            match self.values[i].cmp(&other.values[j]).unwrap_or(Ordering::Equal) {
                Ordering::Equal => return true,
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
            }
        }
        false
    }

    pub fn union(&self, other: &Self) -> TemporalResult<Self> {
        self.ensure_compatible(other)?;
        let merged = self
            .values
            .iter()
            .merge_by(other.values.iter(), |a, b| {
                a.cmp(b).unwrap_or(Ordering::Equal) != Ordering::Greater
            })
            .cloned()
            .collect_vec();
        Self::new(merged)
    }

    pub fn intersection(&self, other: &Self) -> TemporalResult<Option<Self>> {
        self.ensure_compatible(other)?;
        let common = self
            .values
            .iter()
            .filter(|v| other.contains_value(v))
            .cloned()
            .collect_vec();
        if common.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::new(common)?))
    }

    pub fn minus(&self, other: &Self) -> TemporalResult<Option<Self>> {
        self.ensure_compatible(other)?;
        let rest = self
            .values
            .iter()
            .filter(|v| !other.contains_value(v))
            .cloned()
            .collect_vec();
        if rest.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::new(rest)?))
    }

    /// Project the set through a span, keeping the members inside it.
    pub fn at_span(&self, span: &Span) -> TemporalResult<Option<Self>> {
        if let Some(bounds) = &self.bounds {
            if !bounds.overlaps(span)? {
                return Ok(None);
            }
        }
        let kept = self
            .values
            .iter()
            .filter(|v| span.contains_value(v).unwrap_or(false))
            .cloned()
            .collect_vec();
        if kept.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::new(kept)?))
    }

    pub fn minus_span(&self, span: &Span) -> TemporalResult<Option<Self>> {
        let kept = self
            .values
            .iter()
            .filter(|v| !span.contains_value(v).unwrap_or(false))
            .cloned()
            .collect_vec();
        if kept.is_empty() {
            return Ok(None);
        }
        Ok(Some(Self::new(kept)?))
    }

    pub fn distance_to_value(&self, value: &Datum) -> TemporalResult<f64> {
        match self.locate(value) {
            Ok(_) => Ok(0.0),
            Err(pos) => {
                let mut best = f64::INFINITY;
                if pos < self.values.len() {
                    best = best.min(self.values[pos].distance(value)?);
                }
                if pos > 0 {
                    best = best.min(self.values[pos - 1].distance(value)?);
                }
                Ok(best)
            }
        }
    }

    pub fn shift_by(&self, delta: &Datum) -> TemporalResult<Self> {
        let shifted = self
            .values
            .iter()
            .map(|v| match (v, delta) {
                (Datum::Timestamp(t), Datum::Timestamp(d)) => t
                    .checked_add(crate::timestamp::TsDuration(d.micros()))
                    .map(Datum::Timestamp),
                _ => v.add(delta),
            })
            .collect::<TemporalResult<Vec<_>>>()?;
        Self::new(shifted)
    }

    fn ensure_compatible(&self, other: &Self) -> TemporalResult<()> {
        // Numbers mix freely; everything else must match exactly.
        if self.basetype == other.basetype
            || (self.basetype.is_number() && other.basetype.is_number())
        {
            Ok(())
        } else {
            Err(TemporalError::mismatch(format!(
                "cannot combine a {} set with a {} set",
                <&'static str>::from(self.basetype),
                <&'static str>::from(other.basetype)
            )))
        }
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.values.iter().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn iset(values: &[i32]) -> Set {
        Set::new(values.iter().map(|v| Datum::Int(*v)).collect()).unwrap()
    }

    #[test]
    fn construction_sorts_and_dedups() {
        let s = Set::new(vec![Datum::Int(3), Datum::Int(1), Datum::Int(3), Datum::Int(2)]).unwrap();
        assert_eq!(s.values(), &[Datum::Int(1), Datum::Int(2), Datum::Int(3)]);
        assert_eq!(s.bounds().unwrap(), &Span::int(1, 3, true, true).unwrap());

        Set::new(vec![]).unwrap_err();
        Set::new(vec![Datum::Int(1), Datum::Float(2.0)]).unwrap_err();
    }

    #[test]
    fn membership_is_binary_search() {
        let s = iset(&[1, 3, 5, 7]);
        assert!(s.contains_value(&Datum::Int(5)));
        assert!(!s.contains_value(&Datum::Int(4)));
    }

    #[test]
    fn set_algebra() {
        let a = iset(&[1, 2, 3]);
        let b = iset(&[3, 4]);

        assert_eq!(a.union(&b).unwrap(), iset(&[1, 2, 3, 4]));
        assert_eq!(a.intersection(&b).unwrap().unwrap(), iset(&[3]));
        assert_eq!(a.minus(&b).unwrap().unwrap(), iset(&[1, 2]));
        assert_eq!(b.minus(&a).unwrap().unwrap(), iset(&[4]));
        assert_eq!(a.intersection(&iset(&[9])).unwrap(), None);
        assert!(a.overlaps(&b));
    }

    #[test]
    fn span_projection() {
        let s = iset(&[1, 3, 5, 7]);
        let span = Span::int(2, 6, true, true).unwrap();
        assert_eq!(s.at_span(&span).unwrap().unwrap(), iset(&[3, 5]));
        assert_eq!(s.minus_span(&span).unwrap().unwrap(), iset(&[1, 7]));
    }

    #[test]
    fn distance_uses_neighbours() {
        let s = iset(&[10, 20]);
        assert_eq!(s.distance_to_value(&Datum::Int(13)).unwrap(), 3.0);
        assert_eq!(s.distance_to_value(&Datum::Int(20)).unwrap(), 0.0);
    }

    #[test]
    fn text_sets_have_no_bounding_span() {
        let s = Set::new(vec![Datum::text("b"), Datum::text("a")]).unwrap();
        assert_eq!(s.bounds(), None);
        assert_eq!(s.to_string(), "{\"a\", \"b\"}");
    }
}
