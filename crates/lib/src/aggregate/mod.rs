//! Streaming temporal aggregation over skiplist states.
//!
//! A transition folds one temporal value into the state chunk by chunk;
//! combine folds the smaller of two states into the larger; the final
//! function materializes a fresh temporal value. The logical result is
//! independent of how the inputs were partitioned across workers.

pub mod skiplist;

use itertools::Itertools;
use log::trace;

use tempora_core::datum::{Datum, Double2};
use tempora_core::errors::{TemporalError, TemporalResult};
use tempora_core::set::Set;
use tempora_core::span::Span;
use tempora_core::spanset::SpanSet;
use tempora_core::temporal::sync::synchronize;
use tempora_core::temporal::{
    TInstant, TInstantSet, TSequence, TSequenceSet, Temporal, TemporalOps,
};
use tempora_core::timestamp::{TimestampTz, TsDuration};
use tempora_core::types::{Interp, TempType};
use tempora_helpers::CancelToken;

pub use skiplist::{AggChunk, SkipList};

type CombineFn<'a> = &'a dyn Fn(&Datum, &Datum) -> TemporalResult<Datum>;

/*************************** chunk decomposition ***************************/

/// Split a temporal into aggregation chunks, optionally rewriting every
/// value through `map` (tCount promotes to 1, tAvg to (sum, count)).
fn decompose(
    temp: &Temporal,
    map: Option<(&dyn Fn(&Datum) -> Datum, TempType, Interp)>,
) -> TemporalResult<Vec<AggChunk>> {
    let rebuild_instant = |inst: &TInstant| -> TemporalResult<TInstant> {
        match map {
            Some((f, restype, _)) => TInstant::new(restype, f(inst.value()), inst.timestamp()),
            None => Ok(inst.clone()),
        }
    };
    match temp {
        Temporal::Instant(inst) => Ok(vec![AggChunk::Instant(rebuild_instant(inst)?)]),
        Temporal::InstantSet(iset) => iset
            .instants()
            .iter()
            .map(|inst| Ok(AggChunk::Instant(rebuild_instant(inst)?)))
            .collect(),
        Temporal::Sequence(_) | Temporal::SequenceSet(_) => temp
            .sequences()
            .into_iter()
            .map(|seq| {
                let interp = match map {
                    Some((_, _, interp)) => interp,
                    None => seq.interp(),
                };
                let instants = seq
                    .instants()
                    .iter()
                    .map(rebuild_instant)
                    .collect::<TemporalResult<Vec<_>>>()?;
                Ok(AggChunk::Sequence(TSequence::new(
                    instants,
                    interp,
                    seq.lower_inc(),
                    seq.upper_inc(),
                )?))
            })
            .collect(),
    }
}

/*************************** chunk folding ***************************/

/// The portion of `outer` strictly before `cut`, if any.
fn before_part(outer: &Span, cut: &Span) -> Option<Span> {
    Span::new(
        outer.lower.clone(),
        cut.lower.clone(),
        outer.lower_inc,
        !cut.lower_inc,
    )
    .ok()
}

/// The portion of `outer` strictly after `cut`, if any.
fn after_part(outer: &Span, cut: &Span) -> Option<Span> {
    Span::new(
        cut.upper.clone(),
        outer.upper.clone(),
        !cut.upper_inc,
        outer.upper_inc,
    )
    .ok()
}

/// Pointwise combination of two synchronized sequences.
fn combine_synced(
    a: &TSequence,
    b: &TSequence,
    f: CombineFn<'_>,
) -> TemporalResult<TSequence> {
    let mut instants = Vec::with_capacity(a.num_instants());
    for t in a.timestamps() {
        let (Some(va), Some(vb)) = (a.value_at_closed(t), b.value_at_closed(t)) else {
            continue;
        };
        instants.push(TInstant::new(a.temptype(), f(&va, &vb)?, t)?);
    }
    let interp = if a.is_linear() && b.is_linear() {
        Interp::Linear
    } else {
        Interp::Step
    };
    TSequence::new(instants, interp, a.lower_inc(), a.upper_inc())
}

/// Fold one instant chunk into the state.
fn fold_instant(
    list: &mut SkipList,
    inst: TInstant,
    f: CombineFn<'_>,
) -> TemporalResult<()> {
    let t = inst.timestamp();
    let pos = list.locate(t);
    let window: Vec<AggChunk> = list.iter().skip(pos).take(1).cloned().collect();
    match window.first() {
        Some(AggChunk::Instant(existing)) if existing.timestamp() == t => {
            let combined = TInstant::new(
                existing.temptype(),
                f(existing.value(), inst.value())?,
                t,
            )?;
            list.splice(pos, 1, vec![AggChunk::Instant(combined)]);
        }
        Some(AggChunk::Sequence(_)) => {
            return Err(TemporalError::mismatch(
                "cannot aggregate instants into a sequence state",
            ));
        }
        _ => list.insert(AggChunk::Instant(inst)),
    }
    Ok(())
}

/// Fold one sequence chunk into the state: synchronize with every
/// overlapping node, combine pointwise, keep the non-overlapping fringes
/// of both sides verbatim.
fn fold_sequence(
    list: &mut SkipList,
    seq: TSequence,
    f: CombineFn<'_>,
    crossings: bool,
) -> TemporalResult<()> {
    let chunk_span = seq.time_span();
    let mut start = list.locate(seq.start_timestamp());

    // The contiguous window of nodes overlapping the chunk's period.
    // A leading node can end exactly where the chunk starts without
    // overlapping it; slide past those instead of stopping.
    let mut window: Vec<TSequence> = Vec::new();
    for chunk in list.iter().skip(start) {
        match chunk {
            AggChunk::Instant(_) => {
                return Err(TemporalError::mismatch(
                    "cannot aggregate sequences into an instant state",
                ));
            }
            AggChunk::Sequence(node) => {
                let node_span = node.time_span();
                if window.is_empty() && node_span.is_left(&chunk_span)? {
                    start += 1;
                    continue;
                }
                if !node_span.overlaps(&chunk_span)? {
                    break;
                }
                window.push(node.clone());
            }
        }
    }
    trace!(
        "folding chunk over {} into a window of {} nodes",
        chunk_span,
        window.len()
    );

    let mut pieces: Vec<TSequence> = Vec::new();
    let mut work: Option<TSequence> = Some(seq);
    for node in &window {
        let Some(w) = work.take() else {
            pieces.push(node.clone());
            continue;
        };
        let overlap = match w.time_span().intersection(&node.time_span())? {
            Some(overlap) => overlap,
            None => {
                // Defensive: window nodes always overlap the chunk.
                pieces.push(node.clone());
                work = Some(w);
                continue;
            }
        };
        if let Some(span) = before_part(&node.time_span(), &overlap) {
            if let Some(piece) = node.at_period(&span)? {
                pieces.push(piece);
            }
        }
        if let Some(span) = before_part(&w.time_span(), &overlap) {
            if let Some(piece) = w.at_period(&span)? {
                pieces.push(piece);
            }
        }
        if let Some((sa, sb)) = synchronize(node, &w, crossings, None)? {
            pieces.push(combine_synced(&sa, &sb, f)?);
        }
        if let Some(span) = after_part(&node.time_span(), &overlap) {
            if let Some(piece) = node.at_period(&span)? {
                pieces.push(piece);
            }
        }
        work = match after_part(&w.time_span(), &overlap) {
            Some(span) => w.at_period(&span)?,
            None => None,
        };
    }
    if let Some(w) = work {
        pieces.push(w);
    }

    list.splice(
        start,
        window.len(),
        pieces.into_iter().map(AggChunk::Sequence).collect(),
    );
    Ok(())
}

/*************************** generic transitions ***************************/

pub fn tagg_transfn(
    state: Option<SkipList>,
    temp: &Temporal,
    f: CombineFn<'_>,
    crossings: bool,
    map: Option<(&dyn Fn(&Datum) -> Datum, TempType, Interp)>,
) -> TemporalResult<SkipList> {
    let mut list = state.unwrap_or_default();
    for chunk in decompose(temp, map)? {
        match chunk {
            AggChunk::Instant(inst) => fold_instant(&mut list, inst, f)?,
            AggChunk::Sequence(seq) => fold_sequence(&mut list, seq, f, crossings)?,
        }
    }
    Ok(list)
}

/// Fold the smaller state into the larger. Associative up to skiplist
/// representation: the pointwise result is independent of partitioning.
pub fn tagg_combinefn(
    state1: Option<SkipList>,
    state2: Option<SkipList>,
    f: CombineFn<'_>,
    crossings: bool,
    token: &CancelToken,
) -> TemporalResult<Option<SkipList>> {
    let (mut target, source) = match (state1, state2) {
        (None, None) => return Ok(None),
        (Some(s1), None) => return Ok(Some(s1)),
        (None, Some(s2)) => return Ok(Some(s2)),
        (Some(s1), Some(s2)) => {
            if s1.len() >= s2.len() {
                (s1, s2)
            } else {
                (s2, s1)
            }
        }
    };
    for chunk in source.into_values() {
        if token.is_cancelled() {
            return Err(TemporalError::Cancelled);
        }
        match chunk {
            AggChunk::Instant(inst) => fold_instant(&mut target, inst, f)?,
            AggChunk::Sequence(seq) => fold_sequence(&mut target, seq, f, crossings)?,
        }
    }
    Ok(Some(target))
}

/// Materialize the state into a temporal value and consume it.
pub fn tagg_finalfn(state: Option<SkipList>) -> TemporalResult<Option<Temporal>> {
    let Some(state) = state else {
        return Ok(None);
    };
    if state.is_empty() {
        return Ok(None);
    }
    let chunks = state.into_values();
    let discrete = matches!(chunks[0], AggChunk::Instant(_));
    if discrete {
        let instants = chunks
            .into_iter()
            .map(|chunk| match chunk {
                AggChunk::Instant(inst) => Ok(inst),
                AggChunk::Sequence(_) => Err(TemporalError::invariant(
                    "aggregation state mixes instants and sequences",
                )),
            })
            .collect::<TemporalResult<Vec<_>>>()?;
        return Ok(Some(match instants.len() {
            1 => Temporal::Instant(instants.into_iter().next().unwrap()),
            _ => Temporal::InstantSet(TInstantSet::new(instants)?),
        }));
    }
    let sequences = chunks
        .into_iter()
        .map(|chunk| match chunk {
            AggChunk::Sequence(seq) => Ok(seq.normalized()),
            AggChunk::Instant(_) => Err(TemporalError::invariant(
                "aggregation state mixes instants and sequences",
            )),
        })
        .collect::<TemporalResult<Vec<_>>>()?;
    let set = TSequenceSet::new_merging(sequences)?;
    Ok(Some(if set.len() == 1 {
        Temporal::Sequence(set.sequences()[0].clone())
    } else {
        Temporal::SequenceSet(set)
    }))
}

/*************************** specializations ***************************/

fn datum_and(a: &Datum, b: &Datum) -> TemporalResult<Datum> {
    match (a.as_bool(), b.as_bool()) {
        (Some(x), Some(y)) => Ok(Datum::Bool(x && y)),
        _ => Err(TemporalError::mismatch("boolean aggregate over non-booleans")),
    }
}

fn datum_or(a: &Datum, b: &Datum) -> TemporalResult<Datum> {
    match (a.as_bool(), b.as_bool()) {
        (Some(x), Some(y)) => Ok(Datum::Bool(x || y)),
        _ => Err(TemporalError::mismatch("boolean aggregate over non-booleans")),
    }
}

fn datum_strict_eq(a: &Datum, b: &Datum) -> TemporalResult<Datum> {
    if a.datum_eq(b) {
        Ok(a.clone())
    } else {
        Err(TemporalError::mismatch(
            "merged temporals disagree on a shared timestamp",
        ))
    }
}

pub fn tcount_transfn(state: Option<SkipList>, temp: &Temporal) -> TemporalResult<SkipList> {
    tagg_transfn(
        state,
        temp,
        &|a, b| a.add(b),
        false,
        Some((&|_| Datum::Int(1), TempType::Tint, Interp::Step)),
    )
}

pub fn tsum_transfn(state: Option<SkipList>, temp: &Temporal) -> TemporalResult<SkipList> {
    tagg_transfn(state, temp, &|a, b| a.add(b), false, None)
}

pub fn tmin_transfn(state: Option<SkipList>, temp: &Temporal) -> TemporalResult<SkipList> {
    tagg_transfn(state, temp, &|a, b| a.min(b), true, None)
}

pub fn tmax_transfn(state: Option<SkipList>, temp: &Temporal) -> TemporalResult<SkipList> {
    tagg_transfn(state, temp, &|a, b| a.max(b), true, None)
}

pub fn tand_transfn(state: Option<SkipList>, temp: &Temporal) -> TemporalResult<SkipList> {
    tagg_transfn(state, temp, &datum_and, false, None)
}

pub fn tor_transfn(state: Option<SkipList>, temp: &Temporal) -> TemporalResult<SkipList> {
    tagg_transfn(state, temp, &datum_or, false, None)
}

/// Merge aggregate: union of the inputs, which must agree wherever they
/// overlap.
pub fn merge_transfn(state: Option<SkipList>, temp: &Temporal) -> TemporalResult<SkipList> {
    tagg_transfn(state, temp, &datum_strict_eq, false, None)
}

pub fn tavg_transfn(state: Option<SkipList>, temp: &Temporal) -> TemporalResult<SkipList> {
    if !temp.temptype().is_number() {
        return Err(TemporalError::mismatch("tavg needs a temporal number"));
    }
    let promote = |value: &Datum| {
        Datum::Double2(Double2 {
            a: value.as_number().unwrap_or_default(),
            b: 1.0,
        })
    };
    let interp = if temp.interp() == Interp::Linear {
        Interp::Linear
    } else {
        Interp::Step
    };
    tagg_transfn(
        state,
        temp,
        &|a, b| a.add(b),
        false,
        Some((&promote, TempType::Tdouble2, interp)),
    )
}

/// Final function for tavg: divide the accumulated sums by the counts.
pub fn tavg_finalfn(state: Option<SkipList>) -> TemporalResult<Option<Temporal>> {
    let Some(accumulated) = tagg_finalfn(state)? else {
        return Ok(None);
    };
    let divide = |inst: &TInstant| -> TemporalResult<TInstant> {
        let Datum::Double2(acc) = inst.value() else {
            return Err(TemporalError::invariant("tavg state holds a non-accumulator"));
        };
        if acc.b == 0.0 {
            return Err(TemporalError::Arithmetic("division by zero"));
        }
        TInstant::new(TempType::Tfloat, Datum::Float(acc.a / acc.b), inst.timestamp())
    };
    let result = match &accumulated {
        Temporal::Instant(inst) => Temporal::Instant(divide(inst)?),
        Temporal::InstantSet(iset) => Temporal::InstantSet(TInstantSet::new(
            iset.instants().iter().map(divide).collect::<TemporalResult<Vec<_>>>()?,
        )?),
        Temporal::Sequence(_) | Temporal::SequenceSet(_) => {
            let sequences = accumulated
                .sequences()
                .iter()
                .map(|seq| {
                    TSequence::new(
                        seq.instants().iter().map(divide).collect::<TemporalResult<Vec<_>>>()?,
                        seq.interp(),
                        seq.lower_inc(),
                        seq.upper_inc(),
                    )
                })
                .collect::<TemporalResult<Vec<_>>>()?;
            Temporal::from_sequences(sequences)
                .ok_or_else(|| TemporalError::invariant("empty tavg state"))?
        }
    };
    Ok(Some(result))
}

/*************************** time-type counts ***************************/

pub fn timestamptz_tcount_transfn(
    state: Option<SkipList>,
    t: TimestampTz,
) -> TemporalResult<SkipList> {
    let inst = Temporal::Instant(TInstant::tint(1, t));
    tcount_transfn(state, &inst)
}

pub fn tstzset_tcount_transfn(state: Option<SkipList>, set: &Set) -> TemporalResult<SkipList> {
    let mut state = state;
    for value in set.values() {
        let Datum::Timestamp(t) = value else {
            return Err(TemporalError::mismatch("expected a timestamp set"));
        };
        state = Some(timestamptz_tcount_transfn(state, *t)?);
    }
    state.ok_or_else(|| TemporalError::invariant("empty timestamp set"))
}

pub fn tstzspan_tcount_transfn(state: Option<SkipList>, span: &Span) -> TemporalResult<SkipList> {
    let (lower, upper) = (
        span.lower.as_timestamp().ok_or_else(|| TemporalError::mismatch("expected a period"))?,
        span.upper.as_timestamp().ok_or_else(|| TemporalError::mismatch("expected a period"))?,
    );
    let seq = if lower == upper {
        TSequence::new(vec![TInstant::tint(1, lower)], Interp::Step, true, true)?
    } else {
        TSequence::new(
            vec![TInstant::tint(1, lower), TInstant::tint(1, upper)],
            Interp::Step,
            span.lower_inc,
            span.upper_inc,
        )?
    };
    tcount_transfn(state, &Temporal::Sequence(seq))
}

pub fn tstzspanset_tcount_transfn(
    state: Option<SkipList>,
    spans: &SpanSet,
) -> TemporalResult<SkipList> {
    let mut state = state;
    for span in spans.spans() {
        state = Some(tstzspan_tcount_transfn(state, span)?);
    }
    state.ok_or_else(|| TemporalError::invariant("empty period set"))
}

/*************************** append aggregates ***************************/

/// Extend an in-progress temporal with one more instant, amortized O(1)
/// per call; gap parameters start a new sequence as in
/// [`Temporal::append_instant`].
pub fn app_tinst_transfn(
    state: Option<Temporal>,
    inst: TInstant,
    maxdist: Option<f64>,
    maxt: Option<TsDuration>,
) -> TemporalResult<Temporal> {
    match state {
        None => Ok(Temporal::Instant(inst)),
        Some(state) => state.append_instant(inst, maxdist, maxt),
    }
}

/// Extend an in-progress temporal with a whole sequence.
pub fn app_tseq_transfn(state: Option<Temporal>, seq: TSequence) -> TemporalResult<Temporal> {
    match state {
        None => Ok(Temporal::Sequence(seq)),
        Some(state) => state.merge(&Temporal::Sequence(seq)),
    }
}

/// Final function for the append aggregates: compact the accumulated
/// value into its canonical form.
pub fn app_finalfn(state: Option<Temporal>) -> TemporalResult<Option<Temporal>> {
    let Some(state) = state else {
        return Ok(None);
    };
    Ok(Some(match state {
        Temporal::Sequence(seq) => Temporal::Sequence(seq.normalized()),
        Temporal::SequenceSet(ss) => {
            let normalized = ss.sequences().iter().map(TSequence::normalized).collect_vec();
            Temporal::SequenceSet(TSequenceSet::new(normalized)?)
        }
        other => other,
    }))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ts(s: &str) -> TimestampTz {
        TimestampTz::parse(s).unwrap()
    }

    fn step_tint(values: &[(i32, &str)], lower_inc: bool, upper_inc: bool) -> Temporal {
        Temporal::Sequence(
            TSequence::new(
                values
                    .iter()
                    .map(|(v, t)| TInstant::tint(*v, ts(t)))
                    .collect(),
                Interp::Step,
                lower_inc,
                upper_inc,
            )
            .unwrap(),
        )
    }

    #[test]
    fn tmin_of_two_overlapping_step_tints() {
        // T1 = {2@t0, 5@t2, 2@t3}, T2 = {3@t1, 1@t2} over [t0, t3].
        let t1 = step_tint(
            &[(2, "2000-01-01"), (5, "2000-01-03"), (2, "2000-01-04")],
            true,
            true,
        );
        let t2 = step_tint(&[(3, "2000-01-02"), (1, "2000-01-03")], true, true);

        let state = tmin_transfn(None, &t1).unwrap();
        let state = tmin_transfn(Some(state), &t2).unwrap();
        let result = tagg_finalfn(Some(state)).unwrap().unwrap();

        // Before T2 starts the minimum is T1 alone.
        assert_eq!(result.value_at(ts("2000-01-01")), Some(Datum::Int(2)));
        // Overlap: min(2, 3) = 2.
        assert_eq!(result.value_at(ts("2000-01-02")), Some(Datum::Int(2)));
        assert_eq!(
            result.value_at(ts("2000-01-02 12:00:00+00")),
            Some(Datum::Int(2))
        );
        // At t2 both change: min(5, 1) = 1.
        assert_eq!(result.value_at(ts("2000-01-03")), Some(Datum::Int(1)));
        // After T2 ends, T1 alone again.
        assert_eq!(
            result.value_at(ts("2000-01-03 12:00:00+00")),
            Some(Datum::Int(5))
        );
        assert_eq!(result.value_at(ts("2000-01-04")), Some(Datum::Int(2)));
    }

    #[test]
    fn partitioning_does_not_change_the_result() {
        let parts = [
            step_tint(&[(1, "2000-01-01"), (4, "2000-01-03")], true, true),
            step_tint(&[(2, "2000-01-02"), (3, "2000-01-04")], true, true),
            step_tint(&[(5, "2000-01-01 12:00:00+00")], true, true),
        ];

        // All through one state.
        let mut single = None;
        for part in &parts {
            single = Some(tsum_transfn(single, part).unwrap());
        }
        let sequential = tagg_finalfn(single).unwrap().unwrap();

        // Split across two workers, then combined.
        let w1 = tsum_transfn(None, &parts[0]).unwrap();
        let mut w2 = tsum_transfn(None, &parts[1]).unwrap();
        w2 = tsum_transfn(Some(w2), &parts[2]).unwrap();
        let combined = tagg_combinefn(
            Some(w1),
            Some(w2),
            &|a, b| a.add(b),
            false,
            &CancelToken::ignored(),
        )
        .unwrap();
        let parallel = tagg_finalfn(combined).unwrap().unwrap();

        for probe in [
            "2000-01-01",
            "2000-01-01 12:00:00+00",
            "2000-01-02",
            "2000-01-02 12:00:00+00",
            "2000-01-03",
            "2000-01-04",
        ] {
            assert_eq!(
                sequential.value_at(ts(probe)),
                parallel.value_at(ts(probe)),
                "diverged at {probe}"
            );
        }
    }

    #[test]
    fn tcount_promotes_everything_to_one() {
        let t1 = step_tint(&[(7, "2000-01-01"), (9, "2000-01-03")], true, true);
        let t2 = step_tint(&[(4, "2000-01-02"), (4, "2000-01-04")], true, true);

        let state = tcount_transfn(None, &t1).unwrap();
        let state = tcount_transfn(Some(state), &t2).unwrap();
        let result = tagg_finalfn(Some(state)).unwrap().unwrap();

        assert_eq!(result.value_at(ts("2000-01-01")), Some(Datum::Int(1)));
        assert_eq!(
            result.value_at(ts("2000-01-02 12:00:00+00")),
            Some(Datum::Int(2))
        );
        assert_eq!(
            result.value_at(ts("2000-01-03 12:00:00+00")),
            Some(Datum::Int(1))
        );
    }

    #[test]
    fn tavg_divides_at_the_end() {
        let t1 = step_tint(&[(2, "2000-01-01"), (2, "2000-01-03")], true, true);
        let t2 = step_tint(&[(4, "2000-01-01"), (4, "2000-01-03")], true, true);

        let state = tavg_transfn(None, &t1).unwrap();
        let state = tavg_transfn(Some(state), &t2).unwrap();
        let result = tavg_finalfn(Some(state)).unwrap().unwrap();

        assert_eq!(result.value_at(ts("2000-01-02")), Some(Datum::Float(3.0)));
    }

    #[test]
    fn tand_over_booleans() {
        let mk = |v1: bool, v2: bool| {
            Temporal::Sequence(
                TSequence::new(
                    vec![
                        TInstant::tbool(v1, ts("2000-01-01")),
                        TInstant::tbool(v2, ts("2000-01-03")),
                    ],
                    Interp::Step,
                    true,
                    true,
                )
                .unwrap(),
            )
        };
        let state = tand_transfn(None, &mk(true, true)).unwrap();
        let state = tand_transfn(Some(state), &mk(false, true)).unwrap();
        let result = tagg_finalfn(Some(state)).unwrap().unwrap();
        assert_eq!(result.value_at(ts("2000-01-01")), Some(Datum::Bool(false)));
        assert_eq!(result.value_at(ts("2000-01-03")), Some(Datum::Bool(true)));
    }

    #[test]
    fn instants_aggregate_discretely() {
        let a = Temporal::Instant(TInstant::tint(1, ts("2000-01-01")));
        let b = Temporal::Instant(TInstant::tint(2, ts("2000-01-01")));
        let c = Temporal::Instant(TInstant::tint(5, ts("2000-01-02")));

        let state = tsum_transfn(None, &a).unwrap();
        let state = tsum_transfn(Some(state), &b).unwrap();
        let state = tsum_transfn(Some(state), &c).unwrap();
        let result = tagg_finalfn(Some(state)).unwrap().unwrap();

        assert_eq!(result.value_at(ts("2000-01-01")), Some(Datum::Int(3)));
        assert_eq!(result.value_at(ts("2000-01-02")), Some(Datum::Int(5)));
    }

    #[test]
    fn merge_aggregate_rejects_conflicts() {
        let a = Temporal::Instant(TInstant::tint(1, ts("2000-01-01")));
        let conflicting = Temporal::Instant(TInstant::tint(2, ts("2000-01-01")));
        let state = merge_transfn(None, &a).unwrap();
        merge_transfn(Some(state), &conflicting).unwrap_err();
    }

    #[test]
    fn append_aggregate_builds_trajectories() {
        let state = app_tinst_transfn(None, TInstant::tfloat(1.0, ts("2000-01-01")), None, None)
            .unwrap();
        let state = app_tinst_transfn(
            Some(state),
            TInstant::tfloat(2.0, ts("2000-01-02")),
            None,
            None,
        )
        .unwrap();
        let result = app_finalfn(Some(state)).unwrap().unwrap();
        assert_eq!(result.num_instants(), 2);
    }
}
