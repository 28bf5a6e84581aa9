//! Temporal values: the four subtypes, their shared polymorphic surface,
//! and the bounding-box discipline. Every constructor and transformation
//! recomputes the bounding box from its instants; boxes are never patched
//! incrementally.

pub mod instant;
pub mod instant_set;
pub mod lift;
pub mod sequence;
pub mod sequence_set;
pub mod sync;

use enum_dispatch::enum_dispatch;

pub use instant::TInstant;
pub use instant_set::TInstantSet;
pub use sequence::TSequence;
pub use sequence_set::TSequenceSet;

use crate::datum::Datum;
use crate::errors::{TemporalError, TemporalResult};
use crate::set::Set;
use crate::span::Span;
use crate::spanset::SpanSet;
use crate::stbox::{STBox, SpatialDims};
use crate::tbox::TBox;
use crate::timestamp::{TimestampTz, TsDuration};
use crate::types::{BaseType, Interp, TempSubtype, TempType};

/// The bounding box of a temporal value: a bare period for base types
/// without a value dimension, a TBox for numbers, an STBox for the
/// spatial types.
#[derive(Debug, Clone, PartialEq)]
pub enum Bbox {
    Period(Span),
    TBox(TBox),
    STBox(STBox),
}

impl Bbox {
    /// Recompute the box of a run of instants. `period` overrides the
    /// default closed period from the first to the last timestamp.
    pub fn of_instants(temptype: TempType, instants: &[TInstant], period: Option<Span>) -> Bbox {
        debug_assert!(!instants.is_empty());
        let period = period.unwrap_or_else(|| {
            Span::period_unchecked(
                instants[0].timestamp(),
                instants[instants.len() - 1].timestamp(),
                true,
                true,
            )
        });
        match temptype.basetype() {
            BaseType::Int | BaseType::Float => {
                let mut min = instants[0].value().clone();
                let mut max = min.clone();
                for inst in &instants[1..] {
                    min = min.min(inst.value()).unwrap_or(min);
                    max = max.max(inst.value()).unwrap_or(max);
                }
                let span = Span::closed_unchecked(min, max);
                Bbox::TBox(TBox::new_unchecked(Some(span), Some(period)))
            }
            BaseType::Geom | BaseType::Geog | BaseType::Cbuffer => {
                let mut xmin = f64::INFINITY;
                let mut xmax = f64::NEG_INFINITY;
                let mut ymin = f64::INFINITY;
                let mut ymax = f64::NEG_INFINITY;
                let mut zmin = f64::INFINITY;
                let mut zmax = f64::NEG_INFINITY;
                let mut any_z = false;
                let mut srid = 0;
                let mut geodetic = false;
                for inst in instants {
                    let (point, margin) = match inst.value() {
                        Datum::Geom(p) | Datum::Geog(p) => (*p, 0.0),
                        Datum::Cbuffer(c) => (c.center, c.radius),
                        _ => continue,
                    };
                    srid = point.srid;
                    geodetic = point.geodetic;
                    xmin = xmin.min(point.x - margin);
                    xmax = xmax.max(point.x + margin);
                    ymin = ymin.min(point.y - margin);
                    ymax = ymax.max(point.y + margin);
                    if let Some(z) = point.z {
                        any_z = true;
                        zmin = zmin.min(z - margin);
                        zmax = zmax.max(z + margin);
                    }
                }
                let dims = SpatialDims {
                    xmin,
                    xmax,
                    ymin,
                    ymax,
                    z: any_z.then_some((zmin, zmax)),
                };
                match STBox::new(Some(dims), Some(period.clone()), srid, geodetic) {
                    Ok(bbox) => Bbox::STBox(bbox),
                    Err(_) => Bbox::Period(period),
                }
            }
            _ => Bbox::Period(period),
        }
    }

    /// The time dimension, present in every variant.
    pub fn period(&self) -> Option<&Span> {
        match self {
            Bbox::Period(period) => Some(period),
            Bbox::TBox(tbox) => tbox.t(),
            Bbox::STBox(stbox) => stbox.t(),
        }
    }

    /// The value span of a numeric box.
    pub fn value_span(&self) -> Option<&Span> {
        match self {
            Bbox::TBox(tbox) => tbox.x(),
            _ => None,
        }
    }

    pub fn as_tbox(&self) -> Option<&TBox> {
        match self {
            Bbox::TBox(tbox) => Some(tbox),
            _ => None,
        }
    }

    pub fn as_stbox(&self) -> Option<&STBox> {
        match self {
            Bbox::STBox(stbox) => Some(stbox),
            _ => None,
        }
    }
}

/// Comparison operators liftable over temporals and used by ever/always.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// `always op` is the negation of `ever (inverse op)`.
    pub fn inverse(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Le => Self::Gt,
            Self::Gt => Self::Le,
            Self::Ge => Self::Lt,
        }
    }

    pub fn eval(self, a: &Datum, b: &Datum) -> TemporalResult<bool> {
        use std::cmp::Ordering::*;
        if matches!(self, Self::Eq) {
            return Ok(a.datum_eq(b));
        }
        if matches!(self, Self::Ne) {
            return Ok(!a.datum_eq(b));
        }
        let ordering = a.cmp(b)?;
        Ok(match self {
            Self::Lt => ordering == Less,
            Self::Le => ordering != Greater,
            Self::Gt => ordering == Greater,
            Self::Ge => ordering != Less,
            Self::Eq | Self::Ne => unreachable!(),
        })
    }
}

/// The polymorphic surface shared by the four subtypes.
#[enum_dispatch]
pub trait TemporalOps {
    fn temptype(&self) -> TempType;
    fn subtype(&self) -> TempSubtype;
    fn interp(&self) -> Interp;
    fn bbox(&self) -> Bbox;
    /// The bounding period of the value's time extent.
    fn time_span(&self) -> Span;
    /// The exact time extent, as a normalized period set.
    fn time(&self) -> SpanSet;
    fn num_instants(&self) -> usize;
    fn inst_n(&self, n: usize) -> Option<&TInstant>;
    fn start_timestamp(&self) -> TimestampTz;
    fn end_timestamp(&self) -> TimestampTz;
    fn timestamps(&self) -> Vec<TimestampTz>;
    /// Value at a timestamp under the subtype's interpolation; `None`
    /// where the temporal is undefined.
    fn value_at(&self, t: TimestampTz) -> Option<Datum>;
    /// The observed values, in instant order, without deduplication.
    fn values(&self) -> Vec<Datum>;
    fn duration(&self) -> TsDuration;
}

/// A temporal value of any subtype.
#[enum_dispatch(TemporalOps)]
#[derive(Debug, Clone, PartialEq)]
pub enum Temporal {
    Instant(TInstant),
    InstantSet(TInstantSet),
    Sequence(TSequence),
    SequenceSet(TSequenceSet),
}

impl Temporal {
    /// All instants, in order, as borrowing views.
    pub fn instants(&self) -> Vec<&TInstant> {
        (0..self.num_instants())
            .filter_map(|n| self.inst_n(n))
            .collect()
    }

    /// The sequences of a continuous temporal; instants and instant sets
    /// become instantaneous sequences under their own interpolation.
    pub fn sequences(&self) -> Vec<TSequence> {
        match self {
            Temporal::Instant(inst) => vec![TSequence::from_instant(inst.clone())],
            Temporal::InstantSet(iset) => iset
                .instants()
                .iter()
                .map(|inst| TSequence::from_instant(inst.clone()))
                .collect(),
            Temporal::Sequence(seq) => vec![seq.clone()],
            Temporal::SequenceSet(ss) => ss.sequences().to_vec(),
        }
    }

    /// Wrap restriction results back into the leanest subtype that keeps
    /// the original's class: discrete stays discrete, continuous becomes
    /// a sequence set (or a bare sequence when single).
    pub fn from_sequences(sequences: Vec<TSequence>) -> Option<Temporal> {
        match sequences.len() {
            0 => None,
            1 => Some(Temporal::Sequence(sequences.into_iter().next().unwrap())),
            _ => TSequenceSet::new(sequences).ok().map(Temporal::SequenceSet),
        }
    }

    /*********************** ever / always ***********************/

    /// Cheap conservative pre-filter on the bounding box: `false` means
    /// the comparison can never hold.
    fn ever_possible(&self, op: CmpOp, value: &Datum) -> bool {
        let Some(span) = self.bbox_value_span_owned() else {
            return true;
        };
        match op {
            CmpOp::Eq => span.contains_value(value).unwrap_or(true),
            CmpOp::Lt | CmpOp::Le => {
                matches!(span.lower.cmp(value), Ok(std::cmp::Ordering::Less))
                    || (op == CmpOp::Le && span.lower.datum_eq(value))
            }
            CmpOp::Gt | CmpOp::Ge => {
                matches!(span.upper.cmp(value), Ok(std::cmp::Ordering::Greater))
                    || (op == CmpOp::Ge && span.upper.datum_eq(value))
            }
            CmpOp::Ne => true,
        }
    }

    fn bbox_value_span_owned(&self) -> Option<Span> {
        match self.bbox() {
            Bbox::TBox(tbox) => tbox.x().cloned(),
            _ => None,
        }
    }

    /// Is there an instant (or a point inside a linear segment) where
    /// `self op value` holds?
    pub fn ever_cmp(&self, op: CmpOp, value: &Datum) -> TemporalResult<bool> {
        if !self.ever_possible(op, value) {
            return Ok(false);
        }
        let linear = self.interp() == Interp::Linear;
        let instants = self.instants();
        if !linear {
            for inst in &instants {
                if op.eval(inst.value(), value)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }
        // Linear: a segment attains every value between its endpoints.
        for pair in instants.windows(2) {
            let (v1, v2) = (pair[0].value(), pair[1].value());
            if v1.cmp(v2).is_err() {
                // Unordered continuous bases (points): equality holds at
                // an endpoint or where the trajectory passes through the
                // target.
                let holds = match op {
                    CmpOp::Eq => {
                        v1.datum_eq(value)
                            || v2.datum_eq(value)
                            || Datum::segment_crossing(v1, v2, value, value).is_some()
                    }
                    CmpOp::Ne => !(v1.datum_eq(value) && v2.datum_eq(value)),
                    _ => op.eval(v1, value)?,
                };
                if holds {
                    return Ok(true);
                }
                continue;
            }
            let (lo, hi) = (v1.min(v2)?, v2.max(v1)?);
            let holds = match op {
                CmpOp::Eq => {
                    Span::new(lo.clone(), hi.clone(), true, true)
                        .and_then(|range| range.contains_value(value))
                        .unwrap_or(lo.datum_eq(value) || hi.datum_eq(value))
                }
                CmpOp::Ne => !(lo.datum_eq(value) && hi.datum_eq(value)),
                CmpOp::Lt => op.eval(&lo, value)?,
                CmpOp::Le => op.eval(&lo, value)?,
                CmpOp::Gt => op.eval(&hi, value)?,
                CmpOp::Ge => op.eval(&hi, value)?,
            };
            if holds {
                return Ok(true);
            }
        }
        // A single-instant value has no windows.
        if instants.len() == 1 {
            return op.eval(instants[0].value(), value);
        }
        Ok(false)
    }

    pub fn always_cmp(&self, op: CmpOp, value: &Datum) -> TemporalResult<bool> {
        Ok(!self.ever_cmp(op.inverse(), value)?)
    }

    pub fn ever_eq(&self, value: &Datum) -> TemporalResult<bool> {
        self.ever_cmp(CmpOp::Eq, value)
    }

    pub fn always_eq(&self, value: &Datum) -> TemporalResult<bool> {
        self.always_cmp(CmpOp::Eq, value)
    }

    /*********************** restriction ***********************/

    pub fn at_value(&self, value: &Datum) -> TemporalResult<Option<Temporal>> {
        match self {
            Temporal::Instant(inst) => Ok(inst.at_value(value).map(Temporal::Instant)),
            Temporal::InstantSet(iset) => Ok(iset.at_value(value).map(Temporal::InstantSet)),
            Temporal::Sequence(seq) => Ok(Temporal::from_sequences(seq.at_value(value)?)),
            Temporal::SequenceSet(ss) => Ok(Temporal::from_sequences(ss.at_value(value)?)),
        }
    }

    pub fn minus_value(&self, value: &Datum) -> TemporalResult<Option<Temporal>> {
        match self {
            Temporal::Instant(inst) => Ok(inst.minus_value(value).map(Temporal::Instant)),
            Temporal::InstantSet(iset) => Ok(iset.minus_value(value).map(Temporal::InstantSet)),
            Temporal::Sequence(seq) => Ok(Temporal::from_sequences(seq.minus_value(value)?)),
            Temporal::SequenceSet(ss) => Ok(Temporal::from_sequences(ss.minus_value(value)?)),
        }
    }

    pub fn at_values(&self, values: &Set) -> TemporalResult<Option<Temporal>> {
        let mut pieces: Vec<Temporal> = Vec::new();
        for value in values.values() {
            if let Some(piece) = self.at_value(value)? {
                pieces.push(piece);
            }
        }
        Temporal::merge_array(pieces)
    }

    pub fn minus_values(&self, values: &Set) -> TemporalResult<Option<Temporal>> {
        let mut current = Some(self.clone());
        for value in values.values() {
            current = match current {
                Some(temp) => temp.minus_value(value)?,
                None => return Ok(None),
            };
        }
        Ok(current)
    }

    /// Restrict a temporal number to the values inside a span.
    pub fn at_span(&self, span: &Span) -> TemporalResult<Option<Temporal>> {
        match self {
            Temporal::Instant(inst) => Ok(inst.at_span(span)?.map(Temporal::Instant)),
            Temporal::InstantSet(iset) => Ok(iset.at_span(span)?.map(Temporal::InstantSet)),
            Temporal::Sequence(seq) => Ok(Temporal::from_sequences(seq.at_span(span)?)),
            Temporal::SequenceSet(ss) => Ok(Temporal::from_sequences(ss.at_span(span)?)),
        }
    }

    pub fn minus_span(&self, span: &Span) -> TemporalResult<Option<Temporal>> {
        let complement = self.at_span(span)?;
        match complement {
            None => Ok(Some(self.clone())),
            Some(inside) => {
                let time_inside = inside.time();
                self.minus_period_set(&time_inside)
            }
        }
    }

    pub fn at_span_set(&self, spans: &SpanSet) -> TemporalResult<Option<Temporal>> {
        let mut pieces: Vec<Temporal> = Vec::new();
        for span in spans.spans() {
            if let Some(piece) = self.at_span(span)? {
                pieces.push(piece);
            }
        }
        Temporal::merge_array(pieces)
    }

    pub fn at_timestamp(&self, t: TimestampTz) -> TemporalResult<Option<TInstant>> {
        let value = self.value_at(t);
        match value {
            Some(value) => Ok(Some(TInstant::new(self.temptype(), value, t)?)),
            None => Ok(None),
        }
    }

    pub fn minus_timestamp(&self, t: TimestampTz) -> TemporalResult<Option<Temporal>> {
        let period = Span::period(t, t, true, true)?;
        self.minus_period(&period)
    }

    pub fn at_timestamp_set(&self, set: &Set) -> TemporalResult<Option<Temporal>> {
        let mut kept = Vec::new();
        for value in set.values() {
            let Datum::Timestamp(t) = value else {
                return Err(TemporalError::mismatch("expected a timestamp set"));
            };
            if let Some(inst) = self.at_timestamp(*t)? {
                kept.push(inst);
            }
        }
        match kept.len() {
            0 => Ok(None),
            1 => Ok(Some(Temporal::Instant(kept.into_iter().next().unwrap()))),
            _ => Ok(Some(Temporal::InstantSet(TInstantSet::new(kept)?))),
        }
    }

    pub fn at_period(&self, period: &Span) -> TemporalResult<Option<Temporal>> {
        match self {
            Temporal::Instant(inst) => Ok(inst.at_period(period)?.map(Temporal::Instant)),
            Temporal::InstantSet(iset) => Ok(iset.at_period(period)?.map(Temporal::InstantSet)),
            Temporal::Sequence(seq) => Ok(seq.at_period(period)?.map(Temporal::Sequence)),
            Temporal::SequenceSet(ss) => Ok(Temporal::from_sequences(ss.at_period(period)?)),
        }
    }

    pub fn minus_period(&self, period: &Span) -> TemporalResult<Option<Temporal>> {
        match self {
            Temporal::Instant(inst) => Ok(inst.minus_period(period)?.map(Temporal::Instant)),
            Temporal::InstantSet(iset) => Ok(iset.minus_period(period)?.map(Temporal::InstantSet)),
            Temporal::Sequence(seq) => Ok(Temporal::from_sequences(seq.minus_period(period)?)),
            Temporal::SequenceSet(ss) => Ok(Temporal::from_sequences(ss.minus_period(period)?)),
        }
    }

    pub fn at_period_set(&self, periods: &SpanSet) -> TemporalResult<Option<Temporal>> {
        let mut pieces: Vec<Temporal> = Vec::new();
        for period in periods.spans() {
            if let Some(piece) = self.at_period(period)? {
                pieces.push(piece);
            }
        }
        Temporal::merge_array(pieces)
    }

    pub fn minus_period_set(&self, periods: &SpanSet) -> TemporalResult<Option<Temporal>> {
        let mut current = Some(self.clone());
        for period in periods.spans() {
            current = match current {
                Some(temp) => temp.minus_period(period)?,
                None => return Ok(None),
            };
        }
        Ok(current)
    }

    /*********************** merge / append ***********************/

    /// Merge two temporals of the same type. Shared timestamps must carry
    /// equal values.
    pub fn merge(&self, other: &Temporal) -> TemporalResult<Temporal> {
        Temporal::merge_array(vec![self.clone(), other.clone()])?
            .ok_or_else(|| TemporalError::invariant("merge of no values"))
    }

    /// Merge any number of temporals by interleaving on time.
    pub fn merge_array(values: Vec<Temporal>) -> TemporalResult<Option<Temporal>> {
        let mut iter = values.into_iter();
        let Some(first) = iter.next() else {
            return Ok(None);
        };
        let temptype = first.temptype();
        let mut discrete = matches!(
            first.subtype(),
            TempSubtype::Instant | TempSubtype::InstantSet
        );
        let mut parts = vec![first];
        for value in iter {
            if value.temptype() != temptype {
                return Err(TemporalError::mismatch(format!(
                    "cannot merge {} with {}",
                    <&'static str>::from(temptype),
                    <&'static str>::from(value.temptype())
                )));
            }
            discrete &= matches!(
                value.subtype(),
                TempSubtype::Instant | TempSubtype::InstantSet
            );
            parts.push(value);
        }

        if discrete {
            let mut instants: Vec<TInstant> = Vec::new();
            for part in &parts {
                instants.extend(part.instants().into_iter().cloned());
            }
            instants.sort_by_key(TInstant::timestamp);
            // Equal timestamps must agree on the value.
            for pair in instants.windows(2) {
                if pair[0].timestamp() == pair[1].timestamp()
                    && !pair[0].value().datum_eq(pair[1].value())
                {
                    return Err(TemporalError::mismatch(format!(
                        "conflicting values at {}",
                        pair[0].timestamp()
                    )));
                }
            }
            instants.dedup_by(|a, b| a.timestamp() == b.timestamp());
            return Ok(Some(match instants.len() {
                1 => Temporal::Instant(instants.into_iter().next().unwrap()),
                _ => Temporal::InstantSet(TInstantSet::new(instants)?),
            }));
        }

        let mut sequences: Vec<TSequence> = Vec::new();
        for part in &parts {
            sequences.extend(part.sequences());
        }
        log::trace!("merging {} parts, {} sequences", parts.len(), sequences.len());
        sequences.sort_by(|a, b| a.time_span().cmp_spans(&b.time_span()));

        // Overlapping sequences must agree pointwise; agreeing overlaps
        // collapse into the union of their instants.
        let mut merged: Vec<TSequence> = Vec::with_capacity(sequences.len());
        for seq in sequences {
            if let Some(prev) = merged.last_mut() {
                if prev.time_span().overlaps(&seq.time_span())? {
                    if let Some((sa, sb)) = sync::synchronize(prev, &seq, false, None)? {
                        for (ia, ib) in sa.instants().iter().zip(sb.instants()) {
                            if !ia.value().datum_eq(ib.value()) {
                                return Err(TemporalError::mismatch(format!(
                                    "conflicting values at {}",
                                    ia.timestamp()
                                )));
                            }
                        }
                    }
                    let mut instants = prev.instants().to_vec();
                    for inst in seq.instants() {
                        if !instants
                            .iter()
                            .any(|existing| existing.timestamp() == inst.timestamp())
                        {
                            instants.push(inst.clone());
                        }
                    }
                    instants.sort_by_key(TInstant::timestamp);
                    let lower_inc = prev.lower_inc()
                        || (seq.start_timestamp() == prev.start_timestamp() && seq.lower_inc());
                    let upper_inc = match seq.end_timestamp().cmp(&prev.end_timestamp()) {
                        std::cmp::Ordering::Greater => seq.upper_inc(),
                        std::cmp::Ordering::Equal => prev.upper_inc() || seq.upper_inc(),
                        std::cmp::Ordering::Less => prev.upper_inc(),
                    };
                    *prev = TSequence::new_normalized(
                        instants,
                        prev.interp(),
                        lower_inc,
                        upper_inc,
                    )?;
                    continue;
                }
            }
            merged.push(seq);
        }

        let merged = TSequenceSet::new_merging(merged)?;
        Ok(Some(match merged.len() {
            1 => Temporal::Sequence(merged.sequences()[0].clone()),
            _ => Temporal::SequenceSet(merged),
        }))
    }

    /// Append a later instant, optionally starting a new sequence when the
    /// spatial or temporal gap to the previous instant is too large.
    pub fn append_instant(
        &self,
        inst: TInstant,
        maxdist: Option<f64>,
        maxt: Option<TsDuration>,
    ) -> TemporalResult<Temporal> {
        match self {
            Temporal::Instant(prev) => {
                let iset = TInstantSet::new(vec![prev.clone(), inst])?;
                Ok(Temporal::InstantSet(iset))
            }
            Temporal::InstantSet(iset) => {
                let mut instants = iset.instants().to_vec();
                instants.push(inst);
                Ok(Temporal::InstantSet(TInstantSet::new(instants)?))
            }
            Temporal::Sequence(seq) => seq.append_instant(inst, maxdist, maxt),
            Temporal::SequenceSet(ss) => ss.append_instant(inst, maxdist, maxt),
        }
    }

    /*********************** subtype and interpolation casts ***********************/

    pub fn to_instant(&self) -> TemporalResult<TInstant> {
        match self {
            Temporal::Instant(inst) => Ok(inst.clone()),
            other if other.num_instants() == 1 => Ok(other.instants()[0].clone()),
            _ => Err(TemporalError::mismatch(
                "only a single-instant value casts to an instant",
            )),
        }
    }

    pub fn to_instant_set(&self) -> TemporalResult<TInstantSet> {
        match self {
            Temporal::Instant(inst) => TInstantSet::new(vec![inst.clone()]),
            Temporal::InstantSet(iset) => Ok(iset.clone()),
            other => {
                // Continuous values cast only when no time is lost: every
                // sequence must be instantaneous.
                let sequences = other.sequences();
                if sequences.iter().any(|seq| seq.num_instants() > 1) {
                    return Err(TemporalError::mismatch(
                        "a continuous value does not cast to discrete instants",
                    ));
                }
                TInstantSet::new(
                    sequences
                        .iter()
                        .map(|seq| seq.instants()[0].clone())
                        .collect(),
                )
            }
        }
    }

    pub fn to_sequence(&self) -> TemporalResult<TSequence> {
        match self {
            Temporal::Instant(inst) => Ok(TSequence::from_instant(inst.clone())),
            Temporal::InstantSet(iset) if iset.num_instants() == 1 => {
                Ok(TSequence::from_instant(iset.instants()[0].clone()))
            }
            Temporal::Sequence(seq) => Ok(seq.clone()),
            Temporal::SequenceSet(ss) if ss.len() == 1 => Ok(ss.sequences()[0].clone()),
            _ => Err(TemporalError::mismatch(
                "the value does not fit in a single sequence",
            )),
        }
    }

    pub fn to_sequence_set(&self) -> TemporalResult<TSequenceSet> {
        TSequenceSet::new(self.sequences())
    }

    /// Re-express the value under another interpolation.
    ///
    /// Discrete targets require instantaneous sequences; a step target on
    /// a linear value requires every segment to be constant. A linear
    /// target splits each step sequence at its jumps.
    pub fn set_interp(&self, interp: Interp) -> TemporalResult<Temporal> {
        if self.interp() == interp {
            return Ok(self.clone());
        }
        match interp {
            Interp::Discrete => self.to_instant_set().map(Temporal::InstantSet),
            Interp::Step => {
                for seq in self.sequences() {
                    if seq.is_linear() {
                        for pair in seq.instants().windows(2) {
                            if !pair[0].value().datum_eq(pair[1].value()) {
                                return Err(TemporalError::mismatch(
                                    "a non-constant linear value cannot become step",
                                ));
                            }
                        }
                    }
                }
                let sequences = self
                    .sequences()
                    .iter()
                    .map(|seq| {
                        TSequence::new(
                            seq.instants().to_vec(),
                            Interp::Step,
                            seq.lower_inc(),
                            seq.upper_inc(),
                        )
                    })
                    .collect::<TemporalResult<Vec<_>>>()?;
                Ok(Temporal::from_sequences(sequences)
                    .ok_or_else(|| TemporalError::invariant("empty value"))?)
            }
            Interp::Linear => {
                Interp::Linear.ensure_valid(self.temptype())?;
                let mut pieces: Vec<TSequence> = Vec::new();
                for seq in self.sequences() {
                    if seq.is_linear() {
                        pieces.push(seq);
                        continue;
                    }
                    // Each constant step stretch becomes a flat linear
                    // piece, open where the value jumps away.
                    let instants = seq.instants();
                    for (i, pair) in instants.windows(2).enumerate() {
                        let upper_inc = pair[0].value().datum_eq(pair[1].value())
                            && (i + 2 == instants.len() && seq.upper_inc());
                        let closing = TInstant::new(
                            seq.temptype(),
                            pair[0].value().clone(),
                            pair[1].timestamp(),
                        )?;
                        let lower_inc = if i == 0 { seq.lower_inc() } else { true };
                        pieces.push(TSequence::new(
                            vec![pair[0].clone(), closing],
                            Interp::Linear,
                            lower_inc,
                            upper_inc,
                        )?);
                    }
                    // The final instant survives as its own point when
                    // the last jump lands on an inclusive bound.
                    let last = &instants[instants.len() - 1];
                    if seq.upper_inc()
                        && instants.len() > 1
                        && !instants[instants.len() - 2].value().datum_eq(last.value())
                    {
                        pieces.push(TSequence::from_instant(last.clone()));
                    }
                    if instants.len() == 1 {
                        pieces.push(TSequence::new(
                            vec![instants[0].clone()],
                            Interp::Linear,
                            true,
                            true,
                        )?);
                    }
                }
                Temporal::from_sequences(pieces)
                    .ok_or_else(|| TemporalError::invariant("empty value"))
            }
        }
    }

    /*********************** transformations ***********************/

    pub fn shift_tscale(
        &self,
        shift: Option<TsDuration>,
        duration: Option<TsDuration>,
    ) -> TemporalResult<Temporal> {
        let old = self.time_span();
        let new = old.shift_tscale(shift, duration)?;
        let old_start = old.lower.as_timestamp().unwrap_or_default();
        let old_width = (old.upper.as_timestamp().unwrap_or_default() - old_start).micros();
        let new_start = new.lower.as_timestamp().unwrap_or_default();
        let new_width = (new.upper.as_timestamp().unwrap_or_default() - new_start).micros();

        let remap = |t: TimestampTz| -> TimestampTz {
            if old_width == 0 {
                return new_start;
            }
            let offset = (t.micros() - old_start.micros()) as f64 / old_width as f64;
            TimestampTz::from_micros(new_start.micros() + (offset * new_width as f64).round() as i64)
        };
        self.map_timestamps(&remap)
    }

    fn map_timestamps(
        &self,
        remap: &impl Fn(TimestampTz) -> TimestampTz,
    ) -> TemporalResult<Temporal> {
        let rebuild_instant = |inst: &TInstant| {
            TInstant::new(inst.temptype(), inst.value().clone(), remap(inst.timestamp()))
        };
        match self {
            Temporal::Instant(inst) => Ok(Temporal::Instant(rebuild_instant(inst)?)),
            Temporal::InstantSet(iset) => {
                let instants = iset
                    .instants()
                    .iter()
                    .map(rebuild_instant)
                    .collect::<TemporalResult<Vec<_>>>()?;
                Ok(Temporal::InstantSet(TInstantSet::new(instants)?))
            }
            Temporal::Sequence(seq) => {
                let instants = seq
                    .instants()
                    .iter()
                    .map(rebuild_instant)
                    .collect::<TemporalResult<Vec<_>>>()?;
                Ok(Temporal::Sequence(TSequence::new(
                    instants,
                    seq.interp(),
                    seq.lower_inc(),
                    seq.upper_inc(),
                )?))
            }
            Temporal::SequenceSet(ss) => {
                let sequences = ss
                    .sequences()
                    .iter()
                    .map(|seq| {
                        let instants = seq
                            .instants()
                            .iter()
                            .map(rebuild_instant)
                            .collect::<TemporalResult<Vec<_>>>()?;
                        TSequence::new(instants, seq.interp(), seq.lower_inc(), seq.upper_inc())
                    })
                    .collect::<TemporalResult<Vec<_>>>()?;
                Ok(Temporal::SequenceSet(TSequenceSet::new(sequences)?))
            }
        }
    }
}
