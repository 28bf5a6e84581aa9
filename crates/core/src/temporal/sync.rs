//! Synchronization: rewriting two temporals onto a common domain of
//! break-points before pointwise evaluation.
//!
//! With crossings requested and both inputs linear, the crossing time of
//! the two trajectories is inserted too, so derived values stay
//! piecewise-monotone. When either input is step or discrete, crossing
//! mode degrades to plain synchronization.

use crate::datum::Datum;
use crate::errors::TemporalResult;
use crate::temporal::sequence::TSequence;
use crate::temporal::{TInstant, TemporalOps};
use crate::timestamp::TimestampTz;

/// Extra break-point generator: given the two segment endpoint value
/// pairs, yield a ratio in (0, 1) where the derived value has a kink
/// (product extremum, closest approach of two trajectories).
pub type TurnpointFn = fn(&Datum, &Datum, &Datum, &Datum) -> Option<f64>;

/// Align two sequences on the intersection of their periods and the
/// union of their break-points. Returns `None` when the periods are
/// disjoint. Both results carry identical timestamps and bounds.
pub fn synchronize(
    a: &TSequence,
    b: &TSequence,
    cross: bool,
    turnpoint: Option<TurnpointFn>,
) -> TemporalResult<Option<(TSequence, TSequence)>> {
    let Some(inter) = a.time_span().intersection(&b.time_span())? else {
        return Ok(None);
    };
    let Some(a_clip) = a.at_period(&inter)? else {
        return Ok(None);
    };
    let Some(b_clip) = b.at_period(&inter)? else {
        return Ok(None);
    };

    // Union of break-points inside the shared period.
    let mut times: Vec<TimestampTz> = a_clip.timestamps();
    times.extend(b_clip.timestamps());
    times.sort_unstable();
    times.dedup();

    let both_linear = a.is_linear() && b.is_linear();
    if (cross && both_linear) || turnpoint.is_some() {
        let mut extra: Vec<TimestampTz> = Vec::new();
        for pair in times.windows(2) {
            let (t1, t2) = (pair[0], pair[1]);
            let (Some(a1), Some(a2)) = (a_clip.value_at_closed(t1), a_clip.value_at_closed(t2))
            else {
                continue;
            };
            let (Some(b1), Some(b2)) = (b_clip.value_at_closed(t1), b_clip.value_at_closed(t2))
            else {
                continue;
            };
            if cross && both_linear {
                if let Some(ratio) = Datum::segment_crossing(&a1, &a2, &b1, &b2) {
                    extra.push(lerp_timestamp(t1, t2, ratio));
                }
            }
            if let Some(turnpoint) = turnpoint {
                if let Some(ratio) = turnpoint(&a1, &a2, &b1, &b2) {
                    if ratio > 0.0 && ratio < 1.0 {
                        extra.push(lerp_timestamp(t1, t2, ratio));
                    }
                }
            }
        }
        times.extend(extra);
        times.sort_unstable();
        times.dedup();
    }

    let rebuild = |clip: &TSequence| -> TemporalResult<TSequence> {
        let mut instants = Vec::with_capacity(times.len());
        for &t in &times {
            // Every break-point lies inside the clipped period.
            if let Some(value) = clip.value_at_closed(t) {
                instants.push(TInstant::new(clip.temptype(), value, t)?);
            }
        }
        TSequence::new(instants, clip.interp(), inter.lower_inc, inter.upper_inc)
    };

    Ok(Some((rebuild(&a_clip)?, rebuild(&b_clip)?)))
}

pub(crate) fn lerp_timestamp(start: TimestampTz, end: TimestampTz, ratio: f64) -> TimestampTz {
    TimestampTz::from_micros(
        start.micros() + ((end - start).micros() as f64 * ratio).round() as i64,
    )
}

/// Turning point of a product of two linear segments: the extremum of
/// the quadratic, where the linear approximation of the result kinks.
pub fn product_turnpoint(a1: &Datum, a2: &Datum, b1: &Datum, b2: &Datum) -> Option<f64> {
    let (a1, a2, b1, b2) = (
        a1.as_number()?,
        a2.as_number()?,
        b1.as_number()?,
        b2.as_number()?,
    );
    let quad = (a2 - a1) * (b2 - b1);
    if quad == 0.0 {
        return None;
    }
    let slope = a1 * (b2 - b1) + b1 * (a2 - a1);
    let ratio = -slope / (2.0 * quad);
    (ratio > 0.0 && ratio < 1.0).then_some(ratio)
}

/// Turning point of the distance between two moving points: the time of
/// closest approach of the relative trajectory.
pub fn closest_approach_turnpoint(
    a1: &Datum,
    a2: &Datum,
    b1: &Datum,
    b2: &Datum,
) -> Option<f64> {
    let (p1, p2, q1, q2) = match (a1, a2, b1, b2) {
        (Datum::Geom(p1), Datum::Geom(p2), Datum::Geom(q1), Datum::Geom(q2))
        | (Datum::Geog(p1), Datum::Geog(p2), Datum::Geog(q1), Datum::Geog(q2)) => {
            (p1, p2, q1, q2)
        }
        _ => return None,
    };
    // Relative motion: d(r) = (p1 - q1) + r ((p2 - p1) - (q2 - q1)).
    let ox = p1.x - q1.x;
    let oy = p1.y - q1.y;
    let oz = p1.z.unwrap_or(0.0) - q1.z.unwrap_or(0.0);
    let vx = (p2.x - p1.x) - (q2.x - q1.x);
    let vy = (p2.y - p1.y) - (q2.y - q1.y);
    let vz = (p2.z.unwrap_or(0.0) - p1.z.unwrap_or(0.0))
        - (q2.z.unwrap_or(0.0) - q1.z.unwrap_or(0.0));
    let speed2 = vx * vx + vy * vy + vz * vz;
    if speed2 == 0.0 {
        return None;
    }
    let ratio = -(ox * vx + oy * vy + oz * vz) / speed2;
    (ratio > 0.0 && ratio < 1.0).then_some(ratio)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::geo::GeoPoint;

    fn ts(s: &str) -> TimestampTz {
        TimestampTz::parse(s).unwrap()
    }

    #[test]
    fn aligns_breakpoints_over_the_shared_period() {
        let a = TSequence::tfloat_linear(&[
            (0.0, ts("2000-01-01")),
            (4.0, ts("2000-01-05")),
        ])
        .unwrap();
        let b = TSequence::tfloat_linear(&[
            (10.0, ts("2000-01-03")),
            (10.0, ts("2000-01-07")),
        ])
        .unwrap();

        let (sa, sb) = synchronize(&a, &b, false, None).unwrap().unwrap();
        assert_eq!(sa.timestamps(), sb.timestamps());
        assert_eq!(sa.timestamps(), vec![ts("2000-01-03"), ts("2000-01-05")]);
        assert_eq!(sa.values(), vec![Datum::Float(2.0), Datum::Float(4.0)]);
    }

    #[test]
    fn disjoint_periods_yield_nothing() {
        let a = TSequence::tfloat_linear(&[(0.0, ts("2000-01-01")), (1.0, ts("2000-01-02"))])
            .unwrap();
        let b = TSequence::tfloat_linear(&[(0.0, ts("2000-02-01")), (1.0, ts("2000-02-02"))])
            .unwrap();
        assert_eq!(synchronize(&a, &b, false, None).unwrap(), None);
    }

    #[test]
    fn crossing_mode_inserts_the_crossing_time() {
        let a = TSequence::tfloat_linear(&[(0.0, ts("2000-01-01")), (4.0, ts("2000-01-05"))])
            .unwrap();
        let b = TSequence::tfloat_linear(&[(4.0, ts("2000-01-01")), (0.0, ts("2000-01-05"))])
            .unwrap();
        let (sa, sb) = synchronize(&a, &b, true, None).unwrap().unwrap();
        assert_eq!(
            sa.timestamps(),
            vec![ts("2000-01-01"), ts("2000-01-03"), ts("2000-01-05")]
        );
        assert_eq!(sa.value_at(ts("2000-01-03")), sb.value_at(ts("2000-01-03")));
    }

    #[test]
    fn product_turnpoint_finds_the_extremum() {
        // (r)(1 - r) peaks at r = 1/2.
        let ratio = product_turnpoint(
            &Datum::Float(0.0),
            &Datum::Float(1.0),
            &Datum::Float(1.0),
            &Datum::Float(0.0),
        )
        .unwrap();
        assert_eq!(ratio, 0.5);
    }

    #[test]
    fn closest_approach_of_two_tracks() {
        let p = |x: f64, y: f64| Datum::Geom(GeoPoint::new_2d(x, y, 0));
        // One point moves east along y=0, the other stands at (5, 3).
        let ratio = closest_approach_turnpoint(
            &p(0.0, 0.0),
            &p(10.0, 0.0),
            &p(5.0, 3.0),
            &p(5.0, 3.0),
        )
        .unwrap();
        assert_eq!(ratio, 0.5);
    }
}
