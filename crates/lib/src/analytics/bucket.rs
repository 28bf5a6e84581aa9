//! Time-precision bucketing and temporal sampling: projecting values onto
//! a regular grid of time buckets anchored at an origin.

use itertools::Itertools;

use tempora_core::datum::Datum;
use tempora_core::errors::{TemporalError, TemporalResult};
use tempora_core::geo::GeoPoint;
use tempora_core::set::Set;
use tempora_core::span::Span;
use tempora_core::spanset::SpanSet;
use tempora_core::temporal::{
    TInstant, TInstantSet, TSequence, Temporal, TemporalOps,
};
use tempora_core::timestamp::{TimestampTz, TsDuration};
use tempora_core::types::{Interp, TempType};

/// Truncate a timestamp to the start of its bucket.
pub fn timestamptz_tprecision(
    t: TimestampTz,
    duration: TsDuration,
    origin: TimestampTz,
) -> TemporalResult<TimestampTz> {
    t.bucket(duration, origin)
}

/// Truncate every member of a timestamp set to its bucket start.
pub fn tstzset_tprecision(
    set: &Set,
    duration: TsDuration,
    origin: TimestampTz,
) -> TemporalResult<Set> {
    let mut bucketed = Vec::with_capacity(set.len());
    for value in set.values() {
        let Datum::Timestamp(t) = value else {
            return Err(TemporalError::mismatch("expected a timestamp set"));
        };
        bucketed.push(t.bucket(duration, origin)?);
    }
    Set::timestamps(bucketed)
}

/// Widen a period to the buckets it touches.
pub fn tstzspan_tprecision(
    span: &Span,
    duration: TsDuration,
    origin: TimestampTz,
) -> TemporalResult<Span> {
    let lower = span
        .lower
        .as_timestamp()
        .ok_or_else(|| TemporalError::mismatch("expected a period"))?;
    let upper = span
        .upper
        .as_timestamp()
        .ok_or_else(|| TemporalError::mismatch("expected a period"))?;
    let lower_bucket = lower.bucket(duration, origin)?;
    let upper_bucket = upper.bucket(duration, origin)?.checked_add(duration)?;
    Span::period(lower_bucket, upper_bucket, true, false)
}

pub fn tstzspanset_tprecision(
    spans: &SpanSet,
    duration: TsDuration,
    origin: TimestampTz,
) -> TemporalResult<SpanSet> {
    let widened = spans
        .spans()
        .iter()
        .map(|span| tstzspan_tprecision(span, duration, origin))
        .collect::<TemporalResult<Vec<_>>>()?;
    SpanSet::new(widened)
}

/*************************** time-weighted means ***************************/

/// Time-weighted average of a temporal number over its whole extent.
/// Discrete values average plainly; step and linear integrate.
pub fn twavg(temp: &Temporal) -> TemporalResult<f64> {
    if !temp.temptype().is_number() {
        return Err(TemporalError::mismatch("twavg needs a temporal number"));
    }
    let mut weighted = 0.0;
    let mut total = 0.0;
    for seq in temp.sequences() {
        let (w, t) = seq_integral(&seq, |d| d.as_number().unwrap_or_default())?;
        weighted += w;
        total += t;
    }
    if total == 0.0 {
        // Instantaneous extent: plain average of the observed values.
        let values = temp.values();
        let sum: f64 = values.iter().filter_map(Datum::as_number).sum();
        return Ok(sum / values.len() as f64);
    }
    Ok(weighted / total)
}

/// Time-weighted centroid of a temporal point.
pub fn twcentroid(temp: &Temporal) -> TemporalResult<GeoPoint> {
    let Some(sample) = temp.inst_n(0).and_then(|inst| inst.value().as_point().copied())
    else {
        return Err(TemporalError::mismatch("twcentroid needs a temporal point"));
    };
    let mut x = 0.0;
    let mut y = 0.0;
    let mut z = 0.0;
    let mut total = 0.0;
    for seq in temp.sequences() {
        let (wx, t) = seq_integral(&seq, |d| d.as_point().map(|p| p.x).unwrap_or_default())?;
        let (wy, _) = seq_integral(&seq, |d| d.as_point().map(|p| p.y).unwrap_or_default())?;
        let (wz, _) = seq_integral(&seq, |d| {
            d.as_point().and_then(|p| p.z).unwrap_or_default()
        })?;
        x += wx;
        y += wy;
        z += wz;
        total += t;
    }
    if total == 0.0 {
        let points = temp
            .instants()
            .iter()
            .filter_map(|inst| inst.value().as_point().copied())
            .collect_vec();
        let n = points.len() as f64;
        let mut centroid = sample;
        centroid.x = points.iter().map(|p| p.x).sum::<f64>() / n;
        centroid.y = points.iter().map(|p| p.y).sum::<f64>() / n;
        if sample.has_z() {
            centroid.z = Some(points.iter().filter_map(|p| p.z).sum::<f64>() / n);
        }
        return Ok(centroid);
    }
    let mut centroid = sample;
    centroid.x = x / total;
    centroid.y = y / total;
    if sample.has_z() {
        centroid.z = Some(z / total);
    }
    Ok(centroid)
}

/// Integral and duration (both in seconds) of a scalar projection of one
/// sequence: rectangles under step, trapezoids under linear.
fn seq_integral(
    seq: &TSequence,
    project: impl Fn(&Datum) -> f64,
) -> TemporalResult<(f64, f64)> {
    let instants = seq.instants();
    let mut weighted = 0.0;
    let mut total = 0.0;
    for pair in instants.windows(2) {
        let dt = pair[0].timestamp().seconds_between(pair[1].timestamp());
        let v1 = project(pair[0].value());
        let contribution = if seq.is_linear() {
            let v2 = project(pair[1].value());
            (v1 + v2) / 2.0 * dt
        } else {
            v1 * dt
        };
        weighted += contribution;
        total += dt;
    }
    Ok((weighted, total))
}

/*************************** tprecision ***************************/

/// Project a temporal value onto time buckets: one instant per non-empty
/// bucket at the bucket start, carrying the time-weighted average
/// (numbers) or centroid (points) of the bucket.
pub fn temporal_tprecision(
    temp: &Temporal,
    duration: TsDuration,
    origin: TimestampTz,
) -> TemporalResult<Temporal> {
    if !duration.is_positive() {
        return Err(TemporalError::invariant("bucket width must be positive"));
    }
    let out_type = match temp.temptype() {
        TempType::Tint | TempType::Tfloat => TempType::Tfloat,
        spatial @ (TempType::Tgeompoint | TempType::Tgeogpoint) => spatial,
        other => {
            return Err(TemporalError::mismatch(format!(
                "tprecision is not defined for {}",
                <&'static str>::from(other)
            )));
        }
    };

    match temp {
        Temporal::Instant(inst) => {
            let lower = inst.timestamp().bucket(duration, origin)?;
            Ok(Temporal::Instant(TInstant::new(
                inst.temptype(),
                inst.value().clone(),
                lower,
            )?))
        }
        Temporal::InstantSet(iset) => {
            // Group the observations per bucket and average each group.
            let mut grouped: Vec<(TimestampTz, Vec<&TInstant>)> = Vec::new();
            for inst in iset.instants() {
                let bucket = inst.timestamp().bucket(duration, origin)?;
                match grouped.last_mut() {
                    Some((current, group)) if *current == bucket => group.push(inst),
                    _ => grouped.push((bucket, vec![inst])),
                }
            }
            let mut out = Vec::with_capacity(grouped.len());
            for (bucket, group) in grouped {
                let members = group.into_iter().cloned().collect_vec();
                let piece = match members.len() {
                    1 => Temporal::Instant(members.into_iter().next().unwrap()),
                    _ => Temporal::InstantSet(TInstantSet::new(members)?),
                };
                out.push(TInstant::new(out_type, bucket_value(&piece, out_type)?, bucket)?);
            }
            Ok(match out.len() {
                1 => Temporal::Instant(out.into_iter().next().unwrap()),
                _ => Temporal::InstantSet(TInstantSet::new(out)?),
            })
        }
        Temporal::Sequence(_) | Temporal::SequenceSet(_) => {
            let mut out: Vec<TInstant> = Vec::new();
            for seq in temp.sequences() {
                out.extend(sequence_tprecision(&seq, duration, origin, out_type)?);
            }
            out.sort_by_key(TInstant::timestamp);
            out.dedup_by(|a, b| a.timestamp() == b.timestamp());
            let interp = match temp.interp() {
                Interp::Linear => Interp::Linear,
                _ => Interp::Step,
            };
            Ok(Temporal::Sequence(TSequence::new_normalized(
                out, interp, true, true,
            )?))
        }
    }
}

fn bucket_value(piece: &Temporal, out_type: TempType) -> TemporalResult<Datum> {
    Ok(match out_type {
        TempType::Tfloat => Datum::Float(twavg(piece)?),
        TempType::Tgeompoint => Datum::Geom(twcentroid(piece)?),
        TempType::Tgeogpoint => Datum::Geog(twcentroid(piece)?),
        _ => unreachable!("tprecision output is a float or a point"),
    })
}

/// One output instant per bucket overlapped by the sequence.
fn sequence_tprecision(
    seq: &TSequence,
    duration: TsDuration,
    origin: TimestampTz,
    out_type: TempType,
) -> TemporalResult<Vec<TInstant>> {
    let start = seq.start_timestamp();
    let end = seq.end_timestamp();
    let mut lower = start.bucket(duration, origin)?;
    let mut out = Vec::new();
    while lower <= end {
        let upper = lower.checked_add(duration)?;
        // Clip the sequence to the bucket; empty buckets emit nothing.
        let window = Span::period(lower, upper, true, seq.upper_inc() && upper == end)?;
        if let Some(piece) = seq.at_period(&window)? {
            let value = bucket_value(&Temporal::Sequence(piece), out_type)?;
            out.push(TInstant::new(out_type, value, lower)?);
        }
        lower = upper;
    }
    Ok(out)
}

/*************************** tsample ***************************/

/// Sample a temporal value at every bucket start where it is defined,
/// yielding a discrete instant set. `interp` overrides the lookup
/// discipline: a step override reads the running value instead of the
/// interpolated one; `Discrete` keeps the value's own interpolation.
pub fn temporal_tsample(
    temp: &Temporal,
    duration: TsDuration,
    origin: TimestampTz,
    interp: Interp,
) -> TemporalResult<Option<Temporal>> {
    if !duration.is_positive() {
        return Err(TemporalError::invariant("bucket width must be positive"));
    }
    let start = temp.start_timestamp().bucket(duration, origin)?;
    let end = temp.end_timestamp();

    let value_under = |t: TimestampTz| -> Option<Datum> {
        if interp != Interp::Step {
            return temp.value_at(t);
        }
        // Step override: the latest observation at or before `t`, as
        // long as `t` is inside the definition time.
        temp.value_at(t)?;
        temp.instants()
            .iter()
            .take_while(|inst| inst.timestamp() <= t)
            .last()
            .map(|inst| inst.value().clone())
    };

    let mut out = Vec::new();
    let mut lower = start;
    while lower <= end {
        if let Some(value) = value_under(lower) {
            out.push(TInstant::new(temp.temptype(), value, lower)?);
        }
        lower = lower.checked_add(duration)?;
    }
    Ok(match out.len() {
        0 => None,
        1 => Some(Temporal::Instant(out.into_iter().next().unwrap())),
        _ => Some(Temporal::InstantSet(TInstantSet::new(out)?)),
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn ts(s: &str) -> TimestampTz {
        TimestampTz::parse(s).unwrap()
    }

    #[test]
    fn twavg_of_step_and_linear() {
        let step = Temporal::Sequence(
            TSequence::new(
                vec![
                    TInstant::tint(2, ts("2000-01-01 00:00:00+00")),
                    TInstant::tint(4, ts("2000-01-01 00:00:10+00")),
                    TInstant::tint(4, ts("2000-01-01 00:00:20+00")),
                ],
                Interp::Step,
                true,
                true,
            )
            .unwrap(),
        );
        // 2 for ten seconds, then 4 for ten seconds.
        assert_eq!(twavg(&step).unwrap(), 3.0);

        let linear = Temporal::Sequence(
            TSequence::tfloat_linear(&[
                (0.0, ts("2000-01-01 00:00:00+00")),
                (4.0, ts("2000-01-01 00:00:10+00")),
            ])
            .unwrap(),
        );
        assert_eq!(twavg(&linear).unwrap(), 2.0);
    }

    #[test]
    fn tprecision_emits_one_instant_per_bucket() {
        let linear = Temporal::Sequence(
            TSequence::tfloat_linear(&[
                (0.0, ts("2000-01-01 00:00:00+00")),
                (4.0, ts("2000-01-01 02:00:00+00")),
            ])
            .unwrap(),
        );
        let result = temporal_tprecision(
            &linear,
            TsDuration::from_hours(1),
            ts("2000-01-01"),
        )
        .unwrap();

        // Two full buckets plus the degenerate one holding the endpoint.
        assert_eq!(result.num_instants(), 3);
        assert_eq!(result.start_timestamp(), ts("2000-01-01 00:00:00+00"));
        assert_eq!(
            result.value_at(ts("2000-01-01 00:00:00+00")),
            Some(Datum::Float(1.0))
        );
        assert_eq!(
            result.value_at(ts("2000-01-01 01:00:00+00")),
            Some(Datum::Float(3.0))
        );
        assert_eq!(
            result.value_at(ts("2000-01-01 02:00:00+00")),
            Some(Datum::Float(4.0))
        );
    }

    #[test]
    fn tsample_walks_bucket_starts() {
        let linear = Temporal::Sequence(
            TSequence::tfloat_linear(&[
                (0.0, ts("2000-01-01 00:30:00+00")),
                (6.0, ts("2000-01-01 03:30:00+00")),
            ])
            .unwrap(),
        );
        let sampled = temporal_tsample(
            &linear,
            TsDuration::from_hours(1),
            ts("2000-01-01"),
            Interp::Discrete,
        )
        .unwrap()
        .unwrap();

        // Defined at 01:00, 02:00, 03:00; the 00:00 bucket start precedes
        // the trajectory.
        assert_eq!(sampled.num_instants(), 3);
        assert_eq!(
            sampled.value_at(ts("2000-01-01 01:00:00+00")),
            Some(Datum::Float(1.0))
        );
        assert_eq!(sampled.interp(), Interp::Discrete);
    }

    #[test]
    fn tsample_step_override_reads_the_running_value() {
        let linear = Temporal::Sequence(
            TSequence::tfloat_linear(&[
                (0.0, ts("2000-01-01 00:30:00+00")),
                (6.0, ts("2000-01-01 03:30:00+00")),
            ])
            .unwrap(),
        );
        let sampled = temporal_tsample(
            &linear,
            TsDuration::from_hours(1),
            ts("2000-01-01"),
            Interp::Step,
        )
        .unwrap()
        .unwrap();
        // Under the step override the 01:00 sample holds the last
        // observation instead of interpolating.
        assert_eq!(
            sampled.value_at(ts("2000-01-01 01:00:00+00")),
            Some(Datum::Float(0.0))
        );
    }

    #[test]
    fn time_type_precision() {
        let hour = TsDuration::from_hours(1);
        let origin = ts("2000-01-01");
        assert_eq!(
            timestamptz_tprecision(ts("2000-01-01 08:44:00+00"), hour, origin).unwrap(),
            ts("2000-01-01 08:00:00+00")
        );

        let span = Span::period(
            ts("2000-01-01 08:44:00+00"),
            ts("2000-01-01 09:10:00+00"),
            true,
            true,
        )
        .unwrap();
        let widened = tstzspan_tprecision(&span, hour, origin).unwrap();
        assert_eq!(
            widened,
            Span::period(
                ts("2000-01-01 08:00:00+00"),
                ts("2000-01-01 10:00:00+00"),
                true,
                false
            )
            .unwrap()
        );
    }
}
