//! Trajectory simplification for linear temporal floats and points:
//! minimum-distance and minimum-time-delta thinning, a single-pass
//! maximum-distance filter, and full Douglas-Peucker.

use tempora_core::datum::Datum;
use tempora_core::errors::{TemporalError, TemporalResult};
use tempora_core::temporal::{TInstant, TSequence, TSequenceSet, Temporal, TemporalOps};
use tempora_core::timestamp::TsDuration;
use tempora_core::types::TempType;
use tempora_helpers::CancelToken;

fn ensure_simplifiable(temp: &Temporal) -> TemporalResult<()> {
    match temp.temptype() {
        TempType::Tfloat | TempType::Tgeompoint | TempType::Tgeogpoint => Ok(()),
        other => Err(TemporalError::mismatch(format!(
            "simplification is not defined for {}",
            <&'static str>::from(other)
        ))),
    }
}

/// Apply a per-sequence simplifier across the continuous subtypes;
/// instants and instant sets pass through unchanged.
fn map_sequences(
    temp: &Temporal,
    simplify: impl Fn(&TSequence) -> TemporalResult<TSequence>,
) -> TemporalResult<Temporal> {
    match temp {
        Temporal::Instant(_) | Temporal::InstantSet(_) => Ok(temp.clone()),
        Temporal::Sequence(seq) => {
            if !seq.is_linear() {
                return Ok(temp.clone());
            }
            Ok(Temporal::Sequence(simplify(seq)?))
        }
        Temporal::SequenceSet(ss) => {
            if !ss.sequences().iter().any(TSequence::is_linear) {
                return Ok(temp.clone());
            }
            let simplified = ss
                .sequences()
                .iter()
                .map(&simplify)
                .collect::<TemporalResult<Vec<_>>>()?;
            Ok(Temporal::SequenceSet(TSequenceSet::new(simplified)?))
        }
    }
}

fn rebuild(seq: &TSequence, kept: Vec<TInstant>) -> TemporalResult<TSequence> {
    if kept.len() == 1 {
        return TSequence::new(kept, seq.interp(), true, true);
    }
    TSequence::new_normalized(kept, seq.interp(), seq.lower_inc(), seq.upper_inc())
}

/*************************** thinning ***************************/

/// Keep an instant only when its distance to the last kept one exceeds
/// `dist`; the first and last instants always survive.
pub fn simplify_min_dist(temp: &Temporal, dist: f64) -> TemporalResult<Temporal> {
    ensure_simplifiable(temp)?;
    if dist <= 0.0 {
        return Err(TemporalError::invariant("distance must be positive"));
    }
    map_sequences(temp, |seq| {
        let instants = seq.instants();
        let mut kept = vec![instants[0].clone()];
        let mut last_kept = 0;
        for (i, inst) in instants.iter().enumerate().skip(1) {
            if instants[last_kept].value().distance(inst.value())? > dist {
                kept.push(inst.clone());
                last_kept = i;
            }
        }
        if instants.len() > 1 && last_kept != instants.len() - 1 {
            kept.push(instants[instants.len() - 1].clone());
        }
        rebuild(seq, kept)
    })
}

/// Keep an instant only when its time gap to the last kept one exceeds
/// `mint`.
pub fn simplify_min_tdelta(temp: &Temporal, mint: TsDuration) -> TemporalResult<Temporal> {
    ensure_simplifiable(temp)?;
    if !mint.is_positive() {
        return Err(TemporalError::invariant("time delta must be positive"));
    }
    map_sequences(temp, |seq| {
        let instants = seq.instants();
        let mut kept = vec![instants[0].clone()];
        let mut last_kept = 0;
        for (i, inst) in instants.iter().enumerate().skip(1) {
            let gap = inst.timestamp() - instants[last_kept].timestamp();
            if gap.micros() > mint.micros() {
                kept.push(inst.clone());
                last_kept = i;
            }
        }
        if instants.len() > 1 && last_kept != instants.len() - 1 {
            kept.push(instants[instants.len() - 1].clone());
        }
        rebuild(seq, kept)
    })
}

/*************************** find_split ***************************/

/// Index and size of the worst deviation strictly between `i1` and `i2`
/// against the straight interpolation from `i1` to `i2`.
///
/// Temporal floats always use the synchronized distance; points use it
/// when `syncdist` is set and the classical point-to-segment distance
/// otherwise.
fn find_split(
    seq: &TSequence,
    i1: usize,
    i2: usize,
    syncdist: bool,
) -> TemporalResult<(usize, f64)> {
    if i1 + 1 >= i2 {
        return Ok((i1, -1.0));
    }
    let instants = seq.instants();
    let start = &instants[i1];
    let end = &instants[i2];
    let total = (end.timestamp() - start.timestamp()).micros() as f64;

    let mut split = i1;
    let mut worst = -1.0_f64;
    for (offset, inst) in instants[i1 + 1..i2].iter().enumerate() {
        let d = match inst.value() {
            Datum::Float(value) => {
                let ratio = (inst.timestamp() - start.timestamp()).micros() as f64 / total;
                let interp = start
                    .value()
                    .as_number()
                    .zip(end.value().as_number())
                    .map(|(v1, v2)| v1 + (v2 - v1) * ratio)
                    .unwrap_or_default();
                (value - interp).abs()
            }
            Datum::Geom(point) | Datum::Geog(point) => {
                let (Some(p1), Some(p2)) = (start.value().as_point(), end.value().as_point())
                else {
                    continue;
                };
                if syncdist {
                    let ratio =
                        (inst.timestamp() - start.timestamp()).micros() as f64 / total;
                    point.distance(&p1.lerp(p2, ratio))?
                } else {
                    point.distance_to_segment(p1, p2)?
                }
            }
            _ => continue,
        };
        if d > worst {
            worst = d;
            split = i1 + 1 + offset;
        }
    }
    Ok((split, worst))
}

/*************************** max-dist single pass ***************************/

/// Single-pass simplification: walk once and whenever the deviation over
/// the open window exceeds `dist`, keep the worst point and restart the
/// window there.
pub fn simplify_max_dist(temp: &Temporal, dist: f64, syncdist: bool) -> TemporalResult<Temporal> {
    ensure_simplifiable(temp)?;
    if dist <= 0.0 {
        return Err(TemporalError::invariant("distance must be positive"));
    }
    map_sequences(temp, |seq| {
        let instants = seq.instants();
        let mut kept = vec![instants[0].clone()];
        let mut start = 0;
        for i in 1..instants.len() {
            let (split, worst) = find_split(seq, start, i, syncdist)?;
            if worst >= 0.0 && worst > dist {
                kept.push(instants[split].clone());
                start = split;
            }
        }
        if kept
            .last()
            .is_none_or(|inst| inst.timestamp() != instants[instants.len() - 1].timestamp())
        {
            kept.push(instants[instants.len() - 1].clone());
        }
        rebuild(seq, kept)
    })
}

/*************************** Douglas-Peucker ***************************/

/// Full Douglas-Peucker over a stack of index ranges. `minpts` keeps
/// splitting until at least that many points survive.
pub fn simplify_dp(
    temp: &Temporal,
    dist: f64,
    syncdist: bool,
    token: &CancelToken,
) -> TemporalResult<Temporal> {
    ensure_simplifiable(temp)?;
    if dist < 0.0 {
        return Err(TemporalError::invariant("distance must not be negative"));
    }
    let minpts = 2;
    map_sequences(temp, |seq| {
        if seq.num_instants() < 3 {
            return Ok(seq.clone());
        }
        let instants = seq.instants();
        let mut stack = vec![instants.len() - 1];
        let mut outlist = vec![0_usize];
        let mut i1 = 0;
        while let Some(&top) = stack.last() {
            if token.is_cancelled() {
                return Err(TemporalError::Cancelled);
            }
            let (split, worst) = find_split(seq, i1, top, syncdist)?;
            let dosplit = worst >= 0.0 && (worst > dist || outlist.len() + stack.len() < minpts);
            if dosplit {
                stack.push(split);
            } else {
                outlist.push(top);
                i1 = top;
                stack.pop();
            }
        }
        outlist.sort_unstable();
        outlist.dedup();
        let kept = outlist
            .into_iter()
            .map(|idx| instants[idx].clone())
            .collect();
        rebuild(seq, kept)
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use tempora_core::timestamp::TimestampTz;

    fn ts(s: &str) -> TimestampTz {
        TimestampTz::parse(s).unwrap()
    }

    fn tfloat(values: &[(f64, &str)]) -> Temporal {
        Temporal::Sequence(
            TSequence::tfloat_linear(
                &values.iter().map(|(v, t)| (*v, ts(t))).collect::<Vec<_>>(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn dp_keeps_significant_deviations() {
        // T = (0)@0, (1)@1, (0)@2 with eps = 0.5: the spike survives.
        let spike = tfloat(&[
            (0.0, "2000-01-01"),
            (1.0, "2000-01-02"),
            (0.0, "2000-01-03"),
        ]);
        let token = CancelToken::ignored();

        let kept = simplify_dp(&spike, 0.5, true, &token).unwrap();
        assert_eq!(kept.num_instants(), 3);

        // With eps = 2.0 the middle deviation (1.0) is dropped.
        let dropped = simplify_dp(&spike, 2.0, true, &token).unwrap();
        assert_eq!(dropped.num_instants(), 2);
        assert_eq!(dropped.value_at(ts("2000-01-01")), Some(Datum::Float(0.0)));
        assert_eq!(dropped.value_at(ts("2000-01-03")), Some(Datum::Float(0.0)));
    }

    #[test]
    fn dp_with_zero_epsilon_is_identity() {
        let t = tfloat(&[
            (0.0, "2000-01-01"),
            (3.0, "2000-01-02"),
            (1.0, "2000-01-03"),
            (4.0, "2000-01-04"),
        ]);
        let kept = simplify_dp(&t, 0.0, true, &CancelToken::ignored()).unwrap();
        assert_eq!(kept, t);
    }

    #[test]
    fn dp_never_grows_the_sequence() {
        let t = tfloat(&[
            (0.0, "2000-01-01"),
            (2.0, "2000-01-02"),
            (1.5, "2000-01-03"),
            (5.0, "2000-01-04"),
            (4.8, "2000-01-05"),
        ]);
        for eps in [0.1, 0.5, 1.0, 10.0] {
            let kept = simplify_dp(&t, eps, true, &CancelToken::ignored()).unwrap();
            assert!(kept.num_instants() <= t.num_instants());
        }
    }

    #[test]
    fn min_dist_thins_nearby_values() {
        let t = tfloat(&[
            (0.0, "2000-01-01"),
            (0.1, "2000-01-02"),
            (0.2, "2000-01-03"),
            (5.0, "2000-01-04"),
        ]);
        let thinned = simplify_min_dist(&t, 1.0).unwrap();
        // The close-by middle values collapse; first and last survive.
        assert_eq!(thinned.start_timestamp(), ts("2000-01-01"));
        assert_eq!(thinned.end_timestamp(), ts("2000-01-04"));
        assert_eq!(thinned.num_instants(), 2);
    }

    #[test]
    fn min_tdelta_thins_rapid_samples() {
        let t = tfloat(&[
            (0.0, "2000-01-01 00:00:00+00"),
            (1.0, "2000-01-01 00:00:01+00"),
            (9.0, "2000-01-01 06:00:00+00"),
        ]);
        let thinned = simplify_min_tdelta(&t, TsDuration::from_hours(1)).unwrap();
        assert_eq!(thinned.num_instants(), 2);
        assert_eq!(thinned.end_timestamp(), ts("2000-01-01 06:00:00+00"));
    }

    #[test]
    fn max_dist_single_pass_matches_threshold() {
        let spike = tfloat(&[
            (0.0, "2000-01-01"),
            (1.0, "2000-01-02"),
            (0.0, "2000-01-03"),
        ]);
        let kept = simplify_max_dist(&spike, 0.5, true).unwrap();
        assert_eq!(kept.num_instants(), 3);

        let dropped = simplify_max_dist(&spike, 2.0, true).unwrap();
        assert_eq!(dropped.num_instants(), 2);
    }

    #[test]
    fn non_linear_values_pass_through() {
        let inst = Temporal::Instant(TInstant::tfloat(1.0, ts("2000-01-01")));
        assert_eq!(simplify_dp(&inst, 1.0, true, &CancelToken::ignored()).unwrap(), inst);
    }
}
