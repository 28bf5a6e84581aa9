//! The instant-set subtype: discrete observations at strictly increasing
//! timestamps. Values between instants are undefined.

use std::fmt;

use itertools::Itertools;

use crate::datum::Datum;
use crate::errors::{TemporalError, TemporalResult};
use crate::span::Span;
use crate::spanset::SpanSet;
use crate::temporal::{Bbox, TInstant, TemporalOps};
use crate::timestamp::{TimestampTz, TsDuration};
use crate::types::{Interp, TempSubtype, TempType};

#[derive(Debug, Clone, PartialEq)]
pub struct TInstantSet {
    temptype: TempType,
    instants: Vec<TInstant>,
    bbox: Bbox,
}

impl TInstantSet {
    pub fn new(instants: Vec<TInstant>) -> TemporalResult<Self> {
        let Some(first) = instants.first() else {
            return Err(TemporalError::invariant(
                "an instant set cannot be empty",
            ));
        };
        let temptype = first.temptype();
        for pair in instants.windows(2) {
            if pair[0].temptype() != temptype || pair[1].temptype() != temptype {
                return Err(TemporalError::mismatch(
                    "instant set mixes temporal types",
                ));
            }
            if pair[0].timestamp() >= pair[1].timestamp() {
                return Err(TemporalError::invariant(
                    "instant set timestamps must be strictly increasing",
                ));
            }
        }
        let bbox = Bbox::of_instants(temptype, &instants, None);
        Ok(Self {
            temptype,
            instants,
            bbox,
        })
    }

    pub fn instants(&self) -> &[TInstant] {
        &self.instants
    }

    fn locate(&self, t: TimestampTz) -> Result<usize, usize> {
        self.instants
            .binary_search_by(|inst| inst.timestamp().cmp(&t))
    }

    fn rebuild(&self, kept: Vec<TInstant>) -> Option<Self> {
        if kept.is_empty() {
            return None;
        }
        // Filtering preserves the ordering invariants.
        let bbox = Bbox::of_instants(self.temptype, &kept, None);
        Some(Self {
            temptype: self.temptype,
            instants: kept,
            bbox,
        })
    }

    /*********************** restriction ***********************/

    pub fn at_value(&self, value: &Datum) -> Option<Self> {
        let kept = self
            .instants
            .iter()
            .filter(|inst| inst.value().datum_eq(value))
            .cloned()
            .collect_vec();
        self.rebuild(kept)
    }

    pub fn minus_value(&self, value: &Datum) -> Option<Self> {
        let kept = self
            .instants
            .iter()
            .filter(|inst| !inst.value().datum_eq(value))
            .cloned()
            .collect_vec();
        self.rebuild(kept)
    }

    pub fn at_span(&self, span: &Span) -> TemporalResult<Option<Self>> {
        let mut kept = Vec::new();
        for inst in &self.instants {
            if span.contains_value(inst.value())? {
                kept.push(inst.clone());
            }
        }
        Ok(self.rebuild(kept))
    }

    pub fn at_period(&self, period: &Span) -> TemporalResult<Option<Self>> {
        let mut kept = Vec::new();
        for inst in &self.instants {
            if period.contains_value(&Datum::Timestamp(inst.timestamp()))? {
                kept.push(inst.clone());
            }
        }
        Ok(self.rebuild(kept))
    }

    pub fn minus_period(&self, period: &Span) -> TemporalResult<Option<Self>> {
        let mut kept = Vec::new();
        for inst in &self.instants {
            if !period.contains_value(&Datum::Timestamp(inst.timestamp()))? {
                kept.push(inst.clone());
            }
        }
        Ok(self.rebuild(kept))
    }
}

impl TemporalOps for TInstantSet {
    fn temptype(&self) -> TempType {
        self.temptype
    }

    fn subtype(&self) -> TempSubtype {
        TempSubtype::InstantSet
    }

    fn interp(&self) -> Interp {
        Interp::Discrete
    }

    fn bbox(&self) -> Bbox {
        self.bbox.clone()
    }

    fn time_span(&self) -> Span {
        Span::period_unchecked(self.start_timestamp(), self.end_timestamp(), true, true)
    }

    fn time(&self) -> SpanSet {
        SpanSet::from_normalized(
            self.instants
                .iter()
                .map(|inst| {
                    Span::period_unchecked(inst.timestamp(), inst.timestamp(), true, true)
                })
                .collect(),
        )
    }

    fn num_instants(&self) -> usize {
        self.instants.len()
    }

    fn inst_n(&self, n: usize) -> Option<&TInstant> {
        self.instants.get(n)
    }

    fn start_timestamp(&self) -> TimestampTz {
        self.instants[0].timestamp()
    }

    fn end_timestamp(&self) -> TimestampTz {
        self.instants[self.instants.len() - 1].timestamp()
    }

    fn timestamps(&self) -> Vec<TimestampTz> {
        self.instants.iter().map(TInstant::timestamp).collect()
    }

    fn value_at(&self, t: TimestampTz) -> Option<Datum> {
        self.locate(t)
            .ok()
            .map(|pos| self.instants[pos].value().clone())
    }

    fn values(&self) -> Vec<Datum> {
        self.instants
            .iter()
            .map(|inst| inst.value().clone())
            .collect()
    }

    fn duration(&self) -> TsDuration {
        TsDuration::default()
    }
}

impl fmt::Display for TInstantSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.instants.iter().join(", "))
    }
}
