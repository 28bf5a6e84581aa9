//! The sequence-set subtype: an ordered array of sequences with pairwise
//! disjoint periods, all under the same interpolation.

use std::fmt;

use itertools::Itertools;

use crate::datum::Datum;
use crate::errors::{TemporalError, TemporalResult};
use crate::span::Span;
use crate::spanset::SpanSet;
use crate::temporal::{Bbox, TInstant, TSequence, Temporal, TemporalOps};
use crate::timestamp::{TimestampTz, TsDuration};
use crate::types::{Interp, TempSubtype, TempType};

#[derive(Debug, Clone, PartialEq)]
pub struct TSequenceSet {
    temptype: TempType,
    interp: Interp,
    sequences: Vec<TSequence>,
    bbox: Bbox,
}

impl TSequenceSet {
    /// Build from sequences with pairwise disjoint periods. The input is
    /// sorted; overlaps are rejected.
    pub fn new(sequences: Vec<TSequence>) -> TemporalResult<Self> {
        let Some(first) = sequences.first() else {
            return Err(TemporalError::invariant("a sequence set cannot be empty"));
        };
        let temptype = first.temptype();
        let interp = first.interp();
        let mut sequences = sequences;
        sequences.sort_by(|a, b| a.time_span().cmp_spans(&b.time_span()));
        for pair in sequences.windows(2) {
            if pair[1].temptype() != temptype {
                return Err(TemporalError::mismatch(
                    "sequence set mixes temporal types",
                ));
            }
            if pair[1].interp() != interp {
                return Err(TemporalError::mismatch(
                    "sequence set mixes interpolations",
                ));
            }
            if pair[0].time_span().overlaps(&pair[1].time_span())? {
                return Err(TemporalError::invariant(
                    "sequence set periods must be disjoint",
                ));
            }
        }
        let bbox = Self::bbox_of(temptype, &sequences);
        Ok(Self {
            temptype,
            interp,
            sequences,
            bbox,
        })
    }

    /// Build, folding sequences that touch (sharing at most their
    /// boundary instant) and agree on the shared value. Runs before the
    /// disjointness check so touching closed sequences merge instead of
    /// being rejected.
    pub fn new_merging(sequences: Vec<TSequence>) -> TemporalResult<Self> {
        if sequences.is_empty() {
            return Err(TemporalError::invariant("a sequence set cannot be empty"));
        }
        let mut sequences = sequences;
        sequences.sort_by(|a, b| a.time_span().cmp_spans(&b.time_span()));

        let mut merged: Vec<TSequence> = Vec::with_capacity(sequences.len());
        for seq in sequences {
            if let Some(prev) = merged.last_mut() {
                let touches = prev.end_timestamp() == seq.start_timestamp()
                    && (prev.upper_inc() || seq.lower_inc());
                let agrees = prev
                    .instants()
                    .last()
                    .zip(seq.instants().first())
                    .is_some_and(|(a, b)| a.value().datum_eq(b.value()));
                if touches && agrees {
                    let mut instants = prev.instants().to_vec();
                    instants.extend(
                        seq.instants()
                            .iter()
                            .filter(|inst| inst.timestamp() > prev.end_timestamp())
                            .cloned(),
                    );
                    *prev = TSequence::new_normalized(
                        instants,
                        prev.interp(),
                        prev.lower_inc(),
                        seq.upper_inc(),
                    )?;
                    continue;
                }
            }
            merged.push(seq);
        }
        Self::new(merged)
    }

    fn bbox_of(temptype: TempType, sequences: &[TSequence]) -> Bbox {
        let instants = sequences
            .iter()
            .flat_map(|seq| seq.instants().iter().cloned())
            .collect_vec();
        let period = Span::period_unchecked(
            sequences[0].start_timestamp(),
            sequences[sequences.len() - 1].end_timestamp(),
            sequences[0].lower_inc(),
            sequences[sequences.len() - 1].upper_inc(),
        );
        Bbox::of_instants(temptype, &instants, Some(period))
    }

    pub fn sequences(&self) -> &[TSequence] {
        &self.sequences
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Index of the sequence whose period contains `t`, if any.
    fn locate(&self, t: TimestampTz) -> Option<usize> {
        let pos = self
            .sequences
            .partition_point(|seq| seq.end_timestamp() < t);
        let seq = self.sequences.get(pos)?;
        seq.time_span()
            .contains_value(&Datum::Timestamp(t))
            .unwrap_or(false)
            .then_some(pos)
    }

    /*********************** restriction ***********************/

    pub fn at_value(&self, value: &Datum) -> TemporalResult<Vec<TSequence>> {
        let mut pieces = Vec::new();
        for seq in &self.sequences {
            pieces.extend(seq.at_value(value)?);
        }
        Ok(pieces)
    }

    pub fn minus_value(&self, value: &Datum) -> TemporalResult<Vec<TSequence>> {
        let mut pieces = Vec::new();
        for seq in &self.sequences {
            pieces.extend(seq.minus_value(value)?);
        }
        Ok(pieces)
    }

    pub fn at_span(&self, span: &Span) -> TemporalResult<Vec<TSequence>> {
        let mut pieces = Vec::new();
        for seq in &self.sequences {
            pieces.extend(seq.at_span(span)?);
        }
        Ok(pieces)
    }

    pub fn minus_span(&self, span: &Span) -> TemporalResult<Vec<TSequence>> {
        let mut pieces = Vec::new();
        for seq in &self.sequences {
            pieces.extend(seq.minus_span(span)?);
        }
        Ok(pieces)
    }

    pub fn at_period(&self, period: &Span) -> TemporalResult<Vec<TSequence>> {
        let mut pieces = Vec::new();
        for seq in &self.sequences {
            if seq.time_span().is_left(period)? {
                continue;
            }
            if seq.time_span().is_right(period)? {
                break;
            }
            if let Some(piece) = seq.at_period(period)? {
                pieces.push(piece);
            }
        }
        Ok(pieces)
    }

    pub fn minus_period(&self, period: &Span) -> TemporalResult<Vec<TSequence>> {
        let mut pieces = Vec::new();
        for seq in &self.sequences {
            pieces.extend(seq.minus_period(period)?);
        }
        Ok(pieces)
    }

    /*********************** append ***********************/

    pub fn append_instant(
        &self,
        inst: TInstant,
        maxdist: Option<f64>,
        maxt: Option<TsDuration>,
    ) -> TemporalResult<Temporal> {
        let last = &self.sequences[self.sequences.len() - 1];
        let appended = last.append_instant(inst, maxdist, maxt)?;
        let mut sequences = self.sequences[..self.sequences.len() - 1].to_vec();
        match appended {
            Temporal::Sequence(seq) => sequences.push(seq),
            Temporal::SequenceSet(tail) => sequences.extend(tail.sequences.iter().cloned()),
            _ => unreachable!("sequence append yields sequences"),
        }
        Ok(Temporal::SequenceSet(Self::new(sequences)?))
    }
}

impl TemporalOps for TSequenceSet {
    fn temptype(&self) -> TempType {
        self.temptype
    }

    fn subtype(&self) -> TempSubtype {
        TempSubtype::SequenceSet
    }

    fn interp(&self) -> Interp {
        self.interp
    }

    fn bbox(&self) -> Bbox {
        self.bbox.clone()
    }

    fn time_span(&self) -> Span {
        Span::period_unchecked(
            self.start_timestamp(),
            self.end_timestamp(),
            self.sequences[0].lower_inc(),
            self.sequences[self.sequences.len() - 1].upper_inc(),
        )
    }

    fn time(&self) -> SpanSet {
        SpanSet::from_normalized(
            self.sequences
                .iter()
                .map(|seq| seq.time_span())
                .collect(),
        )
    }

    fn num_instants(&self) -> usize {
        self.sequences.iter().map(TSequence::num_instants).sum()
    }

    fn inst_n(&self, n: usize) -> Option<&TInstant> {
        let mut n = n;
        for seq in &self.sequences {
            if n < seq.num_instants() {
                return seq.inst_n(n);
            }
            n -= seq.num_instants();
        }
        None
    }

    fn start_timestamp(&self) -> TimestampTz {
        self.sequences[0].start_timestamp()
    }

    fn end_timestamp(&self) -> TimestampTz {
        self.sequences[self.sequences.len() - 1].end_timestamp()
    }

    fn timestamps(&self) -> Vec<TimestampTz> {
        self.sequences
            .iter()
            .flat_map(|seq| seq.timestamps())
            .collect()
    }

    fn value_at(&self, t: TimestampTz) -> Option<Datum> {
        let pos = self.locate(t)?;
        self.sequences[pos].value_at(t)
    }

    fn values(&self) -> Vec<Datum> {
        self.sequences.iter().flat_map(TSequence::values).collect()
    }

    fn duration(&self) -> TsDuration {
        self.sequences
            .iter()
            .fold(TsDuration::default(), |acc, seq| acc + seq.duration())
    }
}

impl fmt::Display for TSequenceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.sequences.iter().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ts(s: &str) -> TimestampTz {
        TimestampTz::parse(s).unwrap()
    }

    fn two_part() -> TSequenceSet {
        let a = TSequence::tfloat_linear(&[
            (1.0, ts("2000-01-01")),
            (3.0, ts("2000-01-03")),
        ])
        .unwrap();
        let b = TSequence::tfloat_linear(&[
            (10.0, ts("2000-01-05")),
            (12.0, ts("2000-01-07")),
        ])
        .unwrap();
        TSequenceSet::new(vec![a, b]).unwrap()
    }

    #[test]
    fn overlapping_periods_are_rejected() {
        let a = TSequence::tfloat_linear(&[(1.0, ts("2000-01-01")), (3.0, ts("2000-01-05"))])
            .unwrap();
        let b = TSequence::tfloat_linear(&[(2.0, ts("2000-01-03")), (4.0, ts("2000-01-07"))])
            .unwrap();
        TSequenceSet::new(vec![a, b]).unwrap_err();
    }

    #[test]
    fn value_lookup_respects_gaps() {
        let ss = two_part();
        assert_eq!(ss.value_at(ts("2000-01-02")), Some(Datum::Float(2.0)));
        // Inside the gap the value is undefined.
        assert_eq!(ss.value_at(ts("2000-01-04")), None);
        assert_eq!(ss.value_at(ts("2000-01-06")), Some(Datum::Float(11.0)));
    }

    #[test]
    fn time_is_a_period_set() {
        let ss = two_part();
        assert_eq!(ss.time().len(), 2);
        assert_eq!(ss.duration(), TsDuration::from_days(4));
    }

    #[test]
    fn merging_folds_touching_sequences() {
        let a = TSequence::new(
            vec![
                TInstant::tfloat(1.0, ts("2000-01-01")),
                TInstant::tfloat(2.0, ts("2000-01-02")),
            ],
            Interp::Linear,
            true,
            false,
        )
        .unwrap();
        let b = TSequence::tfloat_linear(&[(2.0, ts("2000-01-02")), (3.0, ts("2000-01-03"))])
            .unwrap();
        let merged = TSequenceSet::new_merging(vec![a, b]).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.num_instants(), 2); // collinear run normalizes
    }

    #[test]
    fn restriction_delegates_per_sequence() {
        let ss = two_part();
        let period = Span::period(ts("2000-01-02"), ts("2000-01-06"), true, true).unwrap();
        let pieces = ss.at_period(&period).unwrap();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].start_timestamp(), ts("2000-01-02"));
        assert_eq!(pieces[1].end_timestamp(), ts("2000-01-06"));
    }
}
