//! The instant subtype: a single observation at a timestamp.

use std::fmt;

use crate::datum::Datum;
use crate::errors::{TemporalError, TemporalResult};
use crate::span::Span;
use crate::spanset::SpanSet;
use crate::temporal::{Bbox, TemporalOps};
use crate::timestamp::{TimestampTz, TsDuration};
use crate::types::{Interp, TempSubtype, TempType};

#[derive(Debug, Clone, PartialEq)]
pub struct TInstant {
    temptype: TempType,
    value: Datum,
    t: TimestampTz,
}

impl TInstant {
    pub fn new(temptype: TempType, value: Datum, t: TimestampTz) -> TemporalResult<Self> {
        if value.basetype() != temptype.basetype() {
            return Err(TemporalError::mismatch(format!(
                "a {} instant cannot hold a {} value",
                <&'static str>::from(temptype),
                <&'static str>::from(value.basetype())
            )));
        }
        Ok(Self { temptype, value, t })
    }

    pub fn tfloat(value: f64, t: TimestampTz) -> Self {
        Self {
            temptype: TempType::Tfloat,
            value: Datum::Float(value),
            t,
        }
    }

    pub fn tint(value: i32, t: TimestampTz) -> Self {
        Self {
            temptype: TempType::Tint,
            value: Datum::Int(value),
            t,
        }
    }

    pub fn tbool(value: bool, t: TimestampTz) -> Self {
        Self {
            temptype: TempType::Tbool,
            value: Datum::Bool(value),
            t,
        }
    }

    pub fn value(&self) -> &Datum {
        &self.value
    }

    pub fn timestamp(&self) -> TimestampTz {
        self.t
    }

    /// A copy carrying the same timestamp with another value, used by the
    /// lifting machinery.
    pub fn with_value(&self, temptype: TempType, value: Datum) -> TemporalResult<Self> {
        Self::new(temptype, value, self.t)
    }

    /*********************** restriction ***********************/

    pub fn at_value(&self, value: &Datum) -> Option<Self> {
        self.value.datum_eq(value).then(|| self.clone())
    }

    pub fn minus_value(&self, value: &Datum) -> Option<Self> {
        (!self.value.datum_eq(value)).then(|| self.clone())
    }

    pub fn at_span(&self, span: &Span) -> TemporalResult<Option<Self>> {
        Ok(span.contains_value(&self.value)?.then(|| self.clone()))
    }

    pub fn at_period(&self, period: &Span) -> TemporalResult<Option<Self>> {
        Ok(period
            .contains_value(&Datum::Timestamp(self.t))?
            .then(|| self.clone()))
    }

    pub fn minus_period(&self, period: &Span) -> TemporalResult<Option<Self>> {
        Ok((!period.contains_value(&Datum::Timestamp(self.t))?).then(|| self.clone()))
    }
}

impl TemporalOps for TInstant {
    fn temptype(&self) -> TempType {
        self.temptype
    }

    fn subtype(&self) -> TempSubtype {
        TempSubtype::Instant
    }

    fn interp(&self) -> Interp {
        Interp::Discrete
    }

    fn bbox(&self) -> Bbox {
        Bbox::of_instants(self.temptype, std::slice::from_ref(self), None)
    }

    fn time_span(&self) -> Span {
        Span::period_unchecked(self.t, self.t, true, true)
    }

    fn time(&self) -> SpanSet {
        SpanSet::from_span(self.time_span())
    }

    fn num_instants(&self) -> usize {
        1
    }

    fn inst_n(&self, n: usize) -> Option<&TInstant> {
        (n == 0).then_some(self)
    }

    fn start_timestamp(&self) -> TimestampTz {
        self.t
    }

    fn end_timestamp(&self) -> TimestampTz {
        self.t
    }

    fn timestamps(&self) -> Vec<TimestampTz> {
        vec![self.t]
    }

    fn value_at(&self, t: TimestampTz) -> Option<Datum> {
        (t == self.t).then(|| self.value.clone())
    }

    fn values(&self) -> Vec<Datum> {
        vec![self.value.clone()]
    }

    fn duration(&self) -> TsDuration {
        TsDuration::default()
    }
}

impl fmt::Display for TInstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.value, self.t)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn value_type_must_match() {
        let t = TimestampTz::parse("2000-01-01").unwrap();
        TInstant::new(TempType::Tint, Datum::Float(1.0), t).unwrap_err();
        let inst = TInstant::new(TempType::Tint, Datum::Int(1), t).unwrap();
        assert_eq!(inst.value_at(t), Some(Datum::Int(1)));
        assert_eq!(inst.value_at(TimestampTz::from_micros(0)), None);
    }

    #[test]
    fn display_is_value_at_time() {
        let t = TimestampTz::parse("2000-01-01").unwrap();
        assert_eq!(
            TInstant::tfloat(1.5, t).to_string(),
            "1.5@2000-01-01 00:00:00+00"
        );
    }
}
