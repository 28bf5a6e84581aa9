//! The sequence subtype: a contiguous trajectory of instants over a
//! period, under step or linear interpolation.
//!
//! Restriction to a value or a value span on linear sequences inserts
//! turning points: the sequence is broken at every timestamp where the
//! interpolated value reaches the restriction boundary.

use std::fmt;

use itertools::Itertools;

use crate::datum::Datum;
use crate::errors::{TemporalError, TemporalResult};
use crate::span::Span;
use crate::spanset::SpanSet;
use crate::temporal::{Bbox, TInstant, Temporal, TemporalOps};
use crate::timestamp::{TimestampTz, TsDuration};
use crate::types::{Interp, TempSubtype, TempType};

#[derive(Debug, Clone, PartialEq)]
pub struct TSequence {
    temptype: TempType,
    interp: Interp,
    lower_inc: bool,
    upper_inc: bool,
    instants: Vec<TInstant>,
    bbox: Bbox,
}

impl TSequence {
    /// Build a sequence, validating the ordering invariants. Instants are
    /// stored verbatim; use [`TSequence::new_normalized`] to collapse
    /// redundant ones.
    pub fn new(
        instants: Vec<TInstant>,
        interp: Interp,
        lower_inc: bool,
        upper_inc: bool,
    ) -> TemporalResult<Self> {
        let Some(first) = instants.first() else {
            return Err(TemporalError::invariant("a sequence cannot be empty"));
        };
        let temptype = first.temptype();
        let interp = match interp {
            // Discrete belongs to instant sets; a sequence is continuous.
            Interp::Discrete => Interp::default_for(temptype),
            other => other,
        };
        interp.ensure_valid(temptype)?;
        for pair in instants.windows(2) {
            if pair[1].temptype() != temptype {
                return Err(TemporalError::mismatch("sequence mixes temporal types"));
            }
            if pair[0].timestamp() >= pair[1].timestamp() {
                return Err(TemporalError::invariant(
                    "sequence timestamps must be strictly increasing",
                ));
            }
        }
        if instants.len() == 1 && !(lower_inc && upper_inc) {
            return Err(TemporalError::invariant(
                "a single-instant sequence must be inclusive on both bounds",
            ));
        }
        let period = Span::period_unchecked(
            instants[0].timestamp(),
            instants[instants.len() - 1].timestamp(),
            lower_inc,
            upper_inc,
        );
        let bbox = Bbox::of_instants(temptype, &instants, Some(period));
        Ok(Self {
            temptype,
            interp,
            lower_inc,
            upper_inc,
            instants,
            bbox,
        })
    }

    /// Build and collapse redundant instants: consecutive equal values
    /// under step, collinear runs under linear interpolation.
    pub fn new_normalized(
        instants: Vec<TInstant>,
        interp: Interp,
        lower_inc: bool,
        upper_inc: bool,
    ) -> TemporalResult<Self> {
        let seq = Self::new(instants, interp, lower_inc, upper_inc)?;
        Ok(seq.normalized())
    }

    pub fn from_instant(inst: TInstant) -> Self {
        let interp = Interp::default_for(inst.temptype());
        // A single-instant sequence never fails validation.
        Self::new(vec![inst], interp, true, true).unwrap()
    }

    pub fn tfloat_linear(values: &[(f64, TimestampTz)]) -> TemporalResult<Self> {
        Self::new(
            values
                .iter()
                .map(|(v, t)| TInstant::tfloat(*v, *t))
                .collect(),
            Interp::Linear,
            true,
            true,
        )
    }

    pub fn instants(&self) -> &[TInstant] {
        &self.instants
    }

    pub fn lower_inc(&self) -> bool {
        self.lower_inc
    }

    pub fn upper_inc(&self) -> bool {
        self.upper_inc
    }

    pub fn is_linear(&self) -> bool {
        self.interp == Interp::Linear
    }

    /// Drop interior instants that the interpolation re-derives exactly.
    pub fn normalized(&self) -> Self {
        if self.instants.len() <= 2 {
            return self.clone();
        }
        let mut kept: Vec<TInstant> = vec![self.instants[0].clone()];
        for i in 1..self.instants.len() - 1 {
            let prev = kept.last().unwrap();
            let curr = &self.instants[i];
            let next = &self.instants[i + 1];
            let redundant = match self.interp {
                Interp::Linear => {
                    let ratio = ratio_between(
                        prev.timestamp(),
                        curr.timestamp(),
                        next.timestamp(),
                    );
                    prev.value()
                        .lerp(next.value(), ratio)
                        .map(|expected| expected.datum_eq(curr.value()))
                        .unwrap_or(false)
                }
                _ => prev.value().datum_eq(curr.value()),
            };
            if !redundant {
                kept.push(curr.clone());
            }
        }
        kept.push(self.instants[self.instants.len() - 1].clone());
        // The kept instants keep every invariant of the original.
        Self::new(kept, self.interp, self.lower_inc, self.upper_inc).unwrap()
    }

    /// Index of the segment containing `t`: the last instant at or before
    /// it. `None` when `t` is outside the period bounds.
    fn locate(&self, t: TimestampTz) -> Option<usize> {
        let period = self.time_span();
        if !period
            .contains_value(&Datum::Timestamp(t))
            .unwrap_or(false)
        {
            return None;
        }
        let pos = self
            .instants
            .partition_point(|inst| inst.timestamp() <= t);
        Some(pos.saturating_sub(1))
    }

    /// Value at `t` ignoring bound exclusivity: at an exclusive bound this
    /// is the limit value the stored instant carries. Synchronization and
    /// period slicing need it; user-facing lookups go through
    /// [`TemporalOps::value_at`].
    pub fn value_at_closed(&self, t: TimestampTz) -> Option<Datum> {
        if t < self.start_timestamp() || t > self.end_timestamp() {
            return None;
        }
        let pos = self
            .instants
            .partition_point(|inst| inst.timestamp() <= t);
        let i = pos.saturating_sub(1);
        let inst = &self.instants[i];
        if inst.timestamp() == t {
            return Some(inst.value().clone());
        }
        match self.interp {
            Interp::Linear => {
                let next = self.instants.get(i + 1)?;
                let ratio = ratio_between(inst.timestamp(), t, next.timestamp());
                inst.value().lerp(next.value(), ratio).ok()
            }
            _ => Some(inst.value().clone()),
        }
    }

    /*********************** restriction ***********************/

    /// Slice to the part of the sequence inside `period`, interpolating
    /// fresh boundary instants where the period cuts a segment.
    pub fn at_period(&self, period: &Span) -> TemporalResult<Option<Self>> {
        let Some(inter) = self.time_span().intersection(period)? else {
            return Ok(None);
        };
        let lower_t = inter.lower.as_timestamp().unwrap_or_default();
        let upper_t = inter.upper.as_timestamp().unwrap_or_default();

        if lower_t == upper_t {
            let value = self.value_at_closed(lower_t).ok_or_else(|| {
                TemporalError::invariant("period intersection outside the sequence")
            })?;
            let inst = TInstant::new(self.temptype, value, lower_t)?;
            return Ok(Some(Self::new(vec![inst], self.interp, true, true)?));
        }

        let mut kept: Vec<TInstant> = Vec::new();
        let lower_value = self.value_at_closed(lower_t).ok_or_else(|| {
            TemporalError::invariant("period intersection outside the sequence")
        })?;
        kept.push(TInstant::new(self.temptype, lower_value, lower_t)?);
        for inst in &self.instants {
            if inst.timestamp() > lower_t && inst.timestamp() < upper_t {
                kept.push(inst.clone());
            }
        }
        let upper_value = match self.interp {
            Interp::Linear => self.value_at_closed(upper_t).ok_or_else(|| {
                TemporalError::invariant("period intersection outside the sequence")
            })?,
            // Step: an inclusive cut lands on the value attained at the
            // bound; an exclusive cut closes with the running value.
            _ if inter.upper_inc => self.value_at_closed(upper_t).ok_or_else(|| {
                TemporalError::invariant("period intersection outside the sequence")
            })?,
            _ => kept.last().unwrap().value().clone(),
        };
        kept.push(TInstant::new(self.temptype, upper_value, upper_t)?);

        Ok(Some(Self::new(
            kept,
            self.interp,
            inter.lower_inc,
            inter.upper_inc,
        )?))
    }

    pub fn minus_period(&self, period: &Span) -> TemporalResult<Vec<Self>> {
        let own = self.time_span();
        let remainders = match own.minus(period) {
            Ok(Some(rest)) => vec![rest],
            Ok(None) => vec![],
            Err(TemporalError::NotContiguous(_)) => vec![
                Span::new(
                    own.lower.clone(),
                    period.lower.clone(),
                    own.lower_inc,
                    !period.lower_inc,
                )?,
                Span::new(
                    period.upper.clone(),
                    own.upper.clone(),
                    !period.upper_inc,
                    own.upper_inc,
                )?,
            ],
            Err(e) => return Err(e),
        };
        let mut pieces = Vec::with_capacity(remainders.len());
        for rest in &remainders {
            if let Some(piece) = self.at_period(rest)? {
                pieces.push(piece);
            }
        }
        Ok(pieces)
    }

    pub fn at_period_set(&self, periods: &SpanSet) -> TemporalResult<Vec<Self>> {
        let mut pieces = Vec::new();
        for period in periods.spans() {
            if let Some(piece) = self.at_period(period)? {
                pieces.push(piece);
            }
        }
        Ok(pieces)
    }

    /// Restrict to the instants (and linear hits) where the value equals
    /// `value`. Linear sequences get turning-point instants at every
    /// interior crossing.
    pub fn at_value(&self, value: &Datum) -> TemporalResult<Vec<Self>> {
        self.at_value_span(&ValueWindow::Exact(value.clone()))
    }

    pub fn minus_value(&self, value: &Datum) -> TemporalResult<Vec<Self>> {
        let hits = self.at_value(value)?;
        self.minus_pieces(&hits)
    }

    /// Restrict a temporal number to the values inside `span`.
    pub fn at_span(&self, span: &Span) -> TemporalResult<Vec<Self>> {
        self.at_value_span(&ValueWindow::Range(span.clone()))
    }

    pub fn minus_span(&self, span: &Span) -> TemporalResult<Vec<Self>> {
        let hits = self.at_span(span)?;
        self.minus_pieces(&hits)
    }

    /// Complement of restriction results within this sequence's period.
    fn minus_pieces(&self, pieces: &[Self]) -> TemporalResult<Vec<Self>> {
        if pieces.is_empty() {
            return Ok(vec![self.clone()]);
        }
        let mut remainders = vec![self.time_span()];
        for piece in pieces {
            let cut = piece.time_span();
            let mut next = Vec::with_capacity(remainders.len() + 1);
            for rest in &remainders {
                if !rest.overlaps(&cut)? {
                    next.push(rest.clone());
                    continue;
                }
                match rest.minus(&cut) {
                    Ok(Some(span)) => next.push(span),
                    Ok(None) => {}
                    Err(TemporalError::NotContiguous(_)) => {
                        next.push(Span::new(
                            rest.lower.clone(),
                            cut.lower.clone(),
                            rest.lower_inc,
                            !cut.lower_inc,
                        )?);
                        next.push(Span::new(
                            cut.upper.clone(),
                            rest.upper.clone(),
                            !cut.upper_inc,
                            rest.upper_inc,
                        )?);
                    }
                    Err(e) => return Err(e),
                }
            }
            remainders = next;
        }
        let mut result = Vec::with_capacity(remainders.len());
        for rest in &remainders {
            if let Some(piece) = self.at_period(rest)? {
                result.push(piece);
            }
        }
        Ok(result)
    }

    fn at_value_span(&self, window: &ValueWindow) -> TemporalResult<Vec<Self>> {
        // Bounding-box pre-filter for numbers.
        if let Some(span) = self.bbox.value_span() {
            let possible = match window {
                ValueWindow::Exact(value) => span.contains_value(value).unwrap_or(true),
                ValueWindow::Range(range) => span.overlaps(range).unwrap_or(true),
            };
            if !possible {
                return Ok(vec![]);
            }
        }

        let pieces = if self.interp == Interp::Linear {
            match window {
                ValueWindow::Range(span) => self.linear_range_pieces(span)?,
                ValueWindow::Exact(value) => self.linear_exact_pieces(value)?,
            }
        } else {
            self.step_pieces(window)?
        };

        // Drop instantaneous hits excluded by the sequence bounds.
        let pieces = pieces
            .into_iter()
            .filter(|p| {
                let t = p.start_timestamp();
                if p.num_instants() == 1 {
                    if t == self.start_timestamp() && !self.lower_inc {
                        return false;
                    }
                    if t == self.end_timestamp() && !self.upper_inc {
                        return false;
                    }
                }
                true
            })
            .collect_vec();
        Ok(merge_contiguous(pieces))
    }

    /// Linear restriction to a value span: clip every segment, then fold
    /// the touching pieces.
    fn linear_range_pieces(&self, span: &Span) -> TemporalResult<Vec<Self>> {
        if self.instants.len() == 1 {
            return Ok(if span.contains_value(self.instants[0].value())? {
                vec![self.clone()]
            } else {
                vec![]
            });
        }
        let mut pieces = Vec::new();
        for i in 0..self.instants.len() - 1 {
            if let Some(piece) =
                clip_linear_segment(self, &self.instants[i], &self.instants[i + 1], span)?
            {
                // A clip starting at the segment end belongs to the next
                // segment's clip.
                if i + 2 < self.instants.len()
                    && piece.num_instants() == 1
                    && piece.start_timestamp() == self.instants[i + 1].timestamp()
                {
                    continue;
                }
                pieces.push(piece);
            }
        }
        Ok(pieces)
    }

    /// Linear restriction to one value: constant runs stay sequences,
    /// every other hit is a turning-point instant.
    fn linear_exact_pieces(&self, value: &Datum) -> TemporalResult<Vec<Self>> {
        let mut pieces: Vec<Self> = Vec::new();
        let mut run_start: Option<usize> = None;
        let n = self.instants.len();

        for i in 0..n {
            let inside = self.instants[i].value().datum_eq(value);
            if inside {
                if run_start.is_none() {
                    run_start = Some(i);
                }
                let stays = i + 1 < n && self.instants[i + 1].value().datum_eq(value);
                if !stays {
                    let start = run_start.take().unwrap();
                    let instants = self.instants[start..=i].to_vec();
                    if instants.len() == 1 {
                        pieces.push(Self::new(instants, self.interp, true, true)?);
                    } else {
                        let lower_inc = if start == 0 { self.lower_inc } else { true };
                        let upper_inc = if i == n - 1 { self.upper_inc } else { true };
                        pieces.push(Self::new(instants, self.interp, lower_inc, upper_inc)?);
                    }
                }
            } else if i + 1 < n {
                // Strictly interior crossing: linear segments are
                // monotone, so at most one.
                let a = &self.instants[i];
                let b = &self.instants[i + 1];
                if let Some(ratio) = Datum::segment_at_value(a.value(), b.value(), value) {
                    if ratio > 0.0 && ratio < 1.0 {
                        let t = lerp_timestamp(a.timestamp(), b.timestamp(), ratio);
                        let inst = TInstant::new(self.temptype, value.clone(), t)?;
                        pieces.push(Self::new(vec![inst], self.interp, true, true)?);
                    }
                }
            }
        }
        Ok(pieces)
    }

    /// Step restriction: runs persist until the value changes, closing
    /// with an exclusive boundary instant at the change.
    fn step_pieces(&self, window: &ValueWindow) -> TemporalResult<Vec<Self>> {
        let mut pieces: Vec<Self> = Vec::new();
        let mut run_start: Option<usize> = None;
        let n = self.instants.len();

        for i in 0..n {
            let inside = window.contains(self.instants[i].value())?;
            if inside {
                if run_start.is_none() {
                    run_start = Some(i);
                }
                let stays = i + 1 < n && window.contains(self.instants[i + 1].value())?;
                if !stays {
                    let start = run_start.take().unwrap();
                    if i + 1 < n {
                        // The run holds its value up to (not at) the next
                        // instant.
                        let mut instants = self.instants[start..=i].to_vec();
                        let held = instants[instants.len() - 1].value().clone();
                        instants.push(TInstant::new(
                            self.temptype,
                            held,
                            self.instants[i + 1].timestamp(),
                        )?);
                        let lower_inc = if start == 0 { self.lower_inc } else { true };
                        pieces.push(Self::new(instants, self.interp, lower_inc, false)?);
                    } else {
                        let instants = self.instants[start..=i].to_vec();
                        if instants.len() == 1 {
                            pieces.push(Self::new(instants, self.interp, true, true)?);
                        } else {
                            let lower_inc = if start == 0 { self.lower_inc } else { true };
                            pieces.push(Self::new(
                                instants,
                                self.interp,
                                lower_inc,
                                self.upper_inc,
                            )?);
                        }
                    }
                }
            }
        }
        Ok(pieces)
    }

    /*********************** append ***********************/

    /// Extend with a strictly later instant, starting a new sequence when
    /// the value gap exceeds `maxdist` or the time gap exceeds `maxt`.
    pub fn append_instant(
        &self,
        inst: TInstant,
        maxdist: Option<f64>,
        maxt: Option<TsDuration>,
    ) -> TemporalResult<Temporal> {
        if inst.temptype() != self.temptype {
            return Err(TemporalError::mismatch("appended instant has another type"));
        }
        let last = &self.instants[self.instants.len() - 1];
        if inst.timestamp() < last.timestamp() {
            return Err(TemporalError::invariant(format!(
                "appended instant at {} precedes the sequence end {}",
                inst.timestamp(),
                last.timestamp()
            )));
        }
        if inst.timestamp() == last.timestamp() {
            if last.value().datum_eq(inst.value()) {
                return Ok(Temporal::Sequence(self.clone()));
            }
            return Err(TemporalError::mismatch(format!(
                "conflicting values at {}",
                inst.timestamp()
            )));
        }

        let split = {
            let too_far = match maxdist {
                Some(maxdist) => last.value().distance(inst.value())? > maxdist,
                None => false,
            };
            let too_late = match maxt {
                Some(maxt) => (inst.timestamp() - last.timestamp()).micros() > maxt.micros(),
                None => false,
            };
            too_far || too_late
        };

        if split {
            let fresh = Self::new(vec![inst], self.interp, true, true)?;
            let set = super::TSequenceSet::new(vec![self.clone(), fresh])?;
            return Ok(Temporal::SequenceSet(set));
        }

        let mut instants = self.instants.clone();
        instants.push(inst);
        Ok(Temporal::Sequence(Self::new_normalized(
            instants,
            self.interp,
            self.lower_inc,
            true,
        )?))
    }
}

/// How `at_value`/`at_span` see their restriction: one value or a span.
enum ValueWindow {
    Exact(Datum),
    Range(Span),
}

impl ValueWindow {
    fn contains(&self, value: &Datum) -> TemporalResult<bool> {
        match self {
            Self::Exact(target) => Ok(value.datum_eq(target)),
            Self::Range(span) => span.contains_value(value),
        }
    }
}

/// Clip a single linear segment to the sub-interval whose values lie in
/// `span`. Works on numeric sequences.
fn clip_linear_segment(
    seq: &TSequence,
    a: &TInstant,
    b: &TInstant,
    span: &Span,
) -> TemporalResult<Option<TSequence>> {
    let (Some(v1), Some(v2)) = (a.value().as_number(), b.value().as_number()) else {
        return Ok(None);
    };
    let (Some(lo), Some(hi)) = (span.lower.as_number(), span.upper.as_number()) else {
        return Ok(None);
    };
    // A constant segment is in or out as a whole, inclusivity included.
    if v1 == v2 {
        if !span.contains_value(a.value())? {
            return Ok(None);
        }
        return Ok(Some(TSequence::new(
            vec![a.clone(), b.clone()],
            seq.interp,
            true,
            true,
        )?));
    }
    // Ratio interval where the linear value is within [lo, hi].
    let ratio_at = |target: f64| -> Option<f64> {
        let r = (target - v1) / (v2 - v1);
        (0.0..=1.0).contains(&r).then_some(r)
    };
    let inside = |v: f64| v >= lo && v <= hi;

    let (mut r1, mut r2) = (0.0_f64, 1.0_f64);
    if !inside(v1) {
        let Some(enter) = ratio_at(if v1 < lo { lo } else { hi }) else {
            return Ok(None);
        };
        r1 = enter;
    }
    if !inside(v2) {
        let Some(exit) = ratio_at(if v2 < lo { lo } else { hi }) else {
            return Ok(None);
        };
        r2 = exit;
    }
    if r1 > r2 {
        return Ok(None);
    }

    let t1 = lerp_timestamp(a.timestamp(), b.timestamp(), r1);
    let t2 = lerp_timestamp(a.timestamp(), b.timestamp(), r2);
    let value_at = |r: f64| -> TemporalResult<Datum> {
        a.value().lerp(b.value(), r)
    };
    if t1 == t2 {
        let inst = TInstant::new(seq.temptype, value_at(r1)?, t1)?;
        return Ok(Some(TSequence::new(vec![inst], seq.interp, true, true)?));
    }
    let first = TInstant::new(seq.temptype, value_at(r1)?, t1)?;
    let second = TInstant::new(seq.temptype, value_at(r2)?, t2)?;
    // Boundary inclusivity follows the span bounds where the clip cut the
    // segment, and span membership of the endpoint values where it did not.
    let lower_inc = if r1 > 0.0 {
        span_bound_inclusive(span, v1 < v2, true)
    } else {
        span.contains_value(a.value())?
    };
    let upper_inc = if r2 < 1.0 {
        span_bound_inclusive(span, v1 < v2, false)
    } else {
        span.contains_value(b.value())?
    };
    Ok(Some(TSequence::new(
        vec![first, second],
        seq.interp,
        lower_inc,
        upper_inc,
    )?))
}

/// Which span bound a rising/falling segment meets on entry or exit.
fn span_bound_inclusive(span: &Span, rising: bool, entry: bool) -> bool {
    if rising == entry {
        span.lower_inc
    } else {
        span.upper_inc
    }
}

fn ratio_between(start: TimestampTz, mid: TimestampTz, end: TimestampTz) -> f64 {
    let total = (end - start).micros();
    if total == 0 {
        return 0.0;
    }
    (mid - start).micros() as f64 / total as f64
}

fn lerp_timestamp(start: TimestampTz, end: TimestampTz, ratio: f64) -> TimestampTz {
    TimestampTz::from_micros(
        start.micros() + ((end - start).micros() as f64 * ratio).round() as i64,
    )
}

/// Fold restriction pieces that touch with complementary bounds back into
/// single sequences.
fn merge_contiguous(pieces: Vec<TSequence>) -> Vec<TSequence> {
    let mut result: Vec<TSequence> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        if let Some(prev) = result.last_mut() {
            let touching = prev.end_timestamp() == piece.start_timestamp()
                && (prev.upper_inc() || piece.lower_inc())
                && prev
                    .instants()
                    .last()
                    .zip(piece.instants().first())
                    .is_some_and(|(a, b)| a.value().datum_eq(b.value()));
            if touching {
                let mut instants = prev.instants().to_vec();
                instants.extend(piece.instants().iter().skip(1).cloned());
                if let Ok(merged) = TSequence::new(
                    instants,
                    prev.interp(),
                    prev.lower_inc(),
                    piece.upper_inc(),
                ) {
                    *prev = merged;
                    continue;
                }
            }
        }
        result.push(piece);
    }
    result
}

impl TemporalOps for TSequence {
    fn temptype(&self) -> TempType {
        self.temptype
    }

    fn subtype(&self) -> TempSubtype {
        TempSubtype::Sequence
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
            self.lower_inc,
            self.upper_inc,
        )
    }

    fn time(&self) -> SpanSet {
        SpanSet::from_span(self.time_span())
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
        let i = self.locate(t)?;
        let inst = &self.instants[i];
        if inst.timestamp() == t {
            return Some(inst.value().clone());
        }
        match self.interp {
            Interp::Linear => {
                let next = self.instants.get(i + 1)?;
                let ratio = ratio_between(inst.timestamp(), t, next.timestamp());
                inst.value().lerp(next.value(), ratio).ok()
            }
            _ => Some(inst.value().clone()),
        }
    }

    fn values(&self) -> Vec<Datum> {
        self.instants
            .iter()
            .map(|inst| inst.value().clone())
            .collect()
    }

    fn duration(&self) -> TsDuration {
        self.end_timestamp() - self.start_timestamp()
    }
}

impl fmt::Display for TSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.interp == Interp::Step && self.temptype.is_continuous() {
            write!(f, "Interp=Step;")?;
        }
        write!(
            f,
            "{}{}{}",
            if self.lower_inc { '[' } else { '(' },
            self.instants.iter().join(", "),
            if self.upper_inc { ']' } else { ')' },
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ts(s: &str) -> TimestampTz {
        TimestampTz::parse(s).unwrap()
    }

    fn linear(values: &[(f64, &str)]) -> TSequence {
        TSequence::tfloat_linear(
            &values
                .iter()
                .map(|(v, t)| (*v, ts(t)))
                .collect_vec(),
        )
        .unwrap()
    }

    fn step_int(values: &[(i32, &str)], upper_inc: bool) -> TSequence {
        TSequence::new(
            values
                .iter()
                .map(|(v, t)| TInstant::tint(*v, ts(t)))
                .collect(),
            Interp::Step,
            true,
            upper_inc,
        )
        .unwrap()
    }

    #[test]
    fn invariants() {
        TSequence::new(vec![], Interp::Step, true, true).unwrap_err();
        // Linear over a discrete base is rejected.
        TSequence::new(
            vec![TInstant::tint(1, ts("2000-01-01"))],
            Interp::Linear,
            true,
            true,
        )
        .unwrap_err();
        // A single instant needs inclusive bounds.
        TSequence::new(
            vec![TInstant::tfloat(1.0, ts("2000-01-01"))],
            Interp::Linear,
            true,
            false,
        )
        .unwrap_err();
    }

    #[test]
    fn linear_value_at_interpolates() {
        let seq = linear(&[(1.0, "2000-01-01"), (5.0, "2000-01-03")]);
        assert_eq!(seq.value_at(ts("2000-01-02")), Some(Datum::Float(3.0)));
        assert_eq!(seq.value_at(ts("2000-01-03")), Some(Datum::Float(5.0)));
        assert_eq!(seq.value_at(ts("2000-01-04")), None);
    }

    #[test]
    fn step_value_at_holds_previous() {
        let seq = step_int(&[(2, "2000-01-01"), (5, "2000-01-03")], true);
        assert_eq!(seq.value_at(ts("2000-01-02")), Some(Datum::Int(2)));
        assert_eq!(seq.value_at(ts("2000-01-03")), Some(Datum::Int(5)));
    }

    #[test]
    fn normalization_drops_collinear_instants() {
        let seq = linear(&[
            (1.0, "2000-01-01"),
            (2.0, "2000-01-02"),
            (3.0, "2000-01-03"),
        ])
        .normalized();
        assert_eq!(seq.num_instants(), 2);

        let step = step_int(
            &[(2, "2000-01-01"), (2, "2000-01-02"), (3, "2000-01-03")],
            true,
        )
        .normalized();
        assert_eq!(step.num_instants(), 2);
    }

    #[test]
    fn at_period_interpolates_boundaries() {
        let seq = linear(&[(1.0, "2000-01-01"), (5.0, "2000-01-05")]);
        let period = Span::period(ts("2000-01-02"), ts("2000-01-04"), true, false).unwrap();
        let clipped = seq.at_period(&period).unwrap().unwrap();

        assert_eq!(clipped.start_timestamp(), ts("2000-01-02"));
        assert_eq!(clipped.end_timestamp(), ts("2000-01-04"));
        assert!(!clipped.upper_inc());
        assert_eq!(clipped.value_at(ts("2000-01-02")), Some(Datum::Float(2.0)));
        assert_eq!(clipped.value_at(ts("2000-01-04")), None);
    }

    #[test]
    fn minus_period_leaves_the_complement() {
        let seq = linear(&[(1.0, "2000-01-01"), (5.0, "2000-01-05")]);
        let period = Span::period(ts("2000-01-02"), ts("2000-01-03"), true, true).unwrap();
        let pieces = seq.minus_period(&period).unwrap();
        assert_eq!(pieces.len(), 2);
        assert!(!pieces[0].upper_inc());
        assert!(!pieces[1].lower_inc());
        assert_eq!(pieces[0].end_timestamp(), ts("2000-01-02"));
        assert_eq!(pieces[1].start_timestamp(), ts("2000-01-03"));
    }

    #[test]
    fn restriction_inserts_crossing() {
        // T = [(1.0)@t0, (5.0)@t2]; at 3.0 the hit is the interpolated
        // midpoint.
        let seq = linear(&[(1.0, "2000-01-01"), (5.0, "2000-01-05")]);
        let hits = seq.at_value(&Datum::Float(3.0)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].num_instants(), 1);
        assert_eq!(hits[0].start_timestamp(), ts("2000-01-03"));
        assert_eq!(
            hits[0].value_at(ts("2000-01-03")),
            Some(Datum::Float(3.0))
        );
    }

    #[test]
    fn minus_value_splits_at_the_crossing() {
        let seq = linear(&[(1.0, "2000-01-01"), (5.0, "2000-01-05")]);
        let pieces = seq.minus_value(&Datum::Float(3.0)).unwrap();
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].end_timestamp(), ts("2000-01-03"));
        assert!(!pieces[0].upper_inc());
        assert!(!pieces[1].lower_inc());

        // merge(at, minus) time extents cover the original period.
        let hits = seq.at_value(&Datum::Float(3.0)).unwrap();
        let mut all: Vec<Span> = pieces.iter().map(|p| p.time_span()).collect();
        all.extend(hits.iter().map(|p| p.time_span()));
        let unioned = Span::normalize_array(&all);
        assert_eq!(unioned, vec![seq.time_span()]);
    }

    #[test]
    fn step_at_value_closes_with_exclusive_bound() {
        let seq = step_int(&[(2, "2000-01-01"), (5, "2000-01-03"), (2, "2000-01-04")], true);
        let twos = seq.at_value(&Datum::Int(2)).unwrap();
        assert_eq!(twos.len(), 2);
        assert_eq!(twos[0].time_span().upper_inc, false);
        assert_eq!(twos[0].end_timestamp(), ts("2000-01-03"));
        assert_eq!(twos[1].start_timestamp(), ts("2000-01-04"));
    }

    #[test]
    fn at_span_clips_linear_segments() {
        let seq = linear(&[(0.0, "2000-01-01"), (10.0, "2000-01-11")]);
        let span = Span::float(2.0, 4.0, true, true).unwrap();
        let pieces = seq.at_span(&span).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].start_timestamp(), ts("2000-01-03"));
        assert_eq!(pieces[0].end_timestamp(), ts("2000-01-05"));
    }

    #[test]
    fn append_extends_or_splits() {
        let seq = linear(&[(1.0, "2000-01-01"), (2.0, "2000-01-02")]);

        let extended = seq
            .append_instant(TInstant::tfloat(3.0, ts("2000-01-03")), None, None)
            .unwrap();
        assert_eq!(extended.num_instants(), 2); // collinear, so normalized

        let split = seq
            .append_instant(
                TInstant::tfloat(9.0, ts("2000-01-10")),
                None,
                Some(TsDuration::from_days(2)),
            )
            .unwrap();
        assert_eq!(split.subtype(), TempSubtype::SequenceSet);

        seq.append_instant(TInstant::tfloat(0.0, ts("1999-01-01")), None, None)
            .unwrap_err();
    }
}
