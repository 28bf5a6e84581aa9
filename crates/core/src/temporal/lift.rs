//! Lifting scalar operations to temporal operations.
//!
//! A lifted binary operation synchronizes its operands, evaluates the
//! scalar function at every common break-point, and assembles a result
//! whose subtype is the coarser of the two inputs. The result is linear
//! only when both inputs are linear and the function preserves
//! linearity; otherwise it is step, split at crossings so each piece is
//! constant where it must be.

use crate::datum::Datum;
use crate::errors::{TemporalError, TemporalResult};
use crate::temporal::sync::{
    closest_approach_turnpoint, lerp_timestamp, product_turnpoint, synchronize, TurnpointFn,
};
use crate::temporal::{CmpOp, TInstant, TInstantSet, TSequence, Temporal, TemporalOps};
use crate::timestamp::TimestampTz;
use crate::types::{Interp, TempSubtype, TempType};

type ScalarFn<'a> = &'a dyn Fn(&Datum, &Datum) -> TemporalResult<Datum>;

/// How a scalar function behaves under lifting.
pub struct LiftedOp {
    pub restype: TempType,
    pub preserves_linear: bool,
    pub cross: bool,
    pub turnpoint: Option<TurnpointFn>,
}

pub fn lift_binary(
    f: ScalarFn<'_>,
    a: &Temporal,
    b: &Temporal,
    op: &LiftedOp,
) -> TemporalResult<Option<Temporal>> {
    use TempSubtype::*;
    match (a.subtype(), b.subtype()) {
        (Instant, _) => {
            let inst = match a {
                Temporal::Instant(inst) => inst,
                _ => unreachable!(),
            };
            lift_at_instant(f, inst, b, op, false)
        }
        (_, Instant) => {
            let inst = match b {
                Temporal::Instant(inst) => inst,
                _ => unreachable!(),
            };
            lift_at_instant(f, inst, a, op, true)
        }
        (InstantSet, _) | (_, InstantSet) => {
            let (discrete, other, swapped) = if a.subtype() == InstantSet {
                (a, b, false)
            } else {
                (b, a, true)
            };
            let mut instants = Vec::new();
            for inst in discrete.instants() {
                let t = inst.timestamp();
                let Some(other_value) = other.value_at(t) else {
                    continue;
                };
                let value = if swapped {
                    f(&other_value, inst.value())?
                } else {
                    f(inst.value(), &other_value)?
                };
                instants.push(TInstant::new(op.restype, value, t)?);
            }
            Ok(match instants.len() {
                0 => None,
                1 => Some(Temporal::Instant(instants.into_iter().next().unwrap())),
                _ => Some(Temporal::InstantSet(TInstantSet::new(instants)?)),
            })
        }
        _ => {
            // Both continuous: pairwise over overlapping sequences.
            let mut pieces = Vec::new();
            for sa in a.sequences() {
                for sb in b.sequences() {
                    let Some((xa, xb)) = synchronize(&sa, &sb, op.cross, op.turnpoint)? else {
                        continue;
                    };
                    pieces.extend(eval_synced(f, &xa, &xb, op)?);
                }
            }
            Ok(Temporal::from_sequences(pieces))
        }
    }
}

fn lift_at_instant(
    f: ScalarFn<'_>,
    inst: &TInstant,
    other: &Temporal,
    op: &LiftedOp,
    swapped: bool,
) -> TemporalResult<Option<Temporal>> {
    let t = inst.timestamp();
    let Some(other_value) = other.value_at(t) else {
        return Ok(None);
    };
    let value = if swapped {
        f(&other_value, inst.value())?
    } else {
        f(inst.value(), &other_value)?
    };
    Ok(Some(Temporal::Instant(TInstant::new(op.restype, value, t)?)))
}

/// Evaluate over two synchronized sequences sharing their timestamps.
fn eval_synced(
    f: ScalarFn<'_>,
    a: &TSequence,
    b: &TSequence,
    op: &LiftedOp,
) -> TemporalResult<Vec<TSequence>> {
    let times = a.timestamps();
    let res_linear = op.preserves_linear && a.is_linear() && b.is_linear();
    let lower_inc = a.lower_inc();
    let upper_inc = a.upper_inc();

    if res_linear || !(a.is_linear() && b.is_linear()) {
        // Break-point evaluation is exact: linear-preserving over linear
        // inputs, or step over step inputs.
        let interp = if res_linear { Interp::Linear } else { Interp::Step };
        let mut instants = Vec::with_capacity(times.len());
        for &t in &times {
            let (Some(va), Some(vb)) = (a.value_at_closed(t), b.value_at_closed(t)) else {
                continue;
            };
            instants.push(TInstant::new(op.restype, f(&va, &vb)?, t)?);
        }
        if instants.len() == 1 {
            return Ok(vec![TSequence::new(instants, interp, true, true)?]);
        }
        return Ok(vec![TSequence::new_normalized(
            instants, interp, lower_inc, upper_inc,
        )?]);
    }

    // Linear inputs with a non-linear result (comparisons, boolean
    // reductions): the value is constant strictly between break-points
    // but may differ exactly at them, so every break-point gets its own
    // instantaneous piece when needed.
    let mut pieces: Vec<TSequence> = Vec::new();
    let n = times.len();
    if n == 1 {
        let (va, vb) = (
            a.value_at_closed(times[0]).unwrap(),
            b.value_at_closed(times[0]).unwrap(),
        );
        return Ok(vec![TSequence::new(
            vec![TInstant::new(op.restype, f(&va, &vb)?, times[0])?],
            Interp::Step,
            true,
            true,
        )?]);
    }
    for i in 0..n - 1 {
        let (t1, t2) = (times[i], times[i + 1]);
        let (va1, vb1) = (
            a.value_at_closed(t1).unwrap(),
            b.value_at_closed(t1).unwrap(),
        );
        let at_start = f(&va1, &vb1)?;
        // The open interior of the segment is constant; sample its middle.
        let tm = lerp_timestamp(t1, t2, 0.5);
        let (vam, vbm) = (
            a.value_at_closed(tm).unwrap_or_else(|| va1.clone()),
            b.value_at_closed(tm).unwrap_or_else(|| vb1.clone()),
        );
        let interior = f(&vam, &vbm)?;

        let start_included = if i == 0 { lower_inc } else { true };
        if at_start.datum_eq(&interior) {
            pieces.push(step_piece(op.restype, &interior, t1, t2, start_included, false)?);
        } else {
            if start_included {
                pieces.push(instant_piece(op.restype, &at_start, t1)?);
            }
            pieces.push(step_piece(op.restype, &interior, t1, t2, false, false)?);
        }
    }
    // The final break-point.
    if upper_inc {
        let t = times[n - 1];
        let (va, vb) = (
            a.value_at_closed(t).unwrap(),
            b.value_at_closed(t).unwrap(),
        );
        let at_end = f(&va, &vb)?;
        match pieces.last() {
            Some(last)
                if last.end_timestamp() == t
                    && last
                        .instants()
                        .last()
                        .is_some_and(|inst| inst.value().datum_eq(&at_end)) =>
            {
                // Extend the trailing piece to a closed bound instead.
                let prev = pieces.pop().unwrap();
                pieces.push(TSequence::new(
                    prev.instants().to_vec(),
                    Interp::Step,
                    prev.lower_inc(),
                    true,
                )?);
            }
            _ => pieces.push(instant_piece(op.restype, &at_end, t)?),
        }
    }
    Ok(coalesce_step_pieces(pieces))
}

fn instant_piece(restype: TempType, value: &Datum, t: TimestampTz) -> TemporalResult<TSequence> {
    TSequence::new(
        vec![TInstant::new(restype, value.clone(), t)?],
        Interp::Step,
        true,
        true,
    )
}

fn step_piece(
    restype: TempType,
    value: &Datum,
    t1: TimestampTz,
    t2: TimestampTz,
    lower_inc: bool,
    upper_inc: bool,
) -> TemporalResult<TSequence> {
    TSequence::new(
        vec![
            TInstant::new(restype, value.clone(), t1)?,
            TInstant::new(restype, value.clone(), t2)?,
        ],
        Interp::Step,
        lower_inc,
        upper_inc,
    )
}

/// Fold touching step pieces carrying the same value.
fn coalesce_step_pieces(pieces: Vec<TSequence>) -> Vec<TSequence> {
    let mut result: Vec<TSequence> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        if let Some(prev) = result.last_mut() {
            let same_value = prev
                .instants()
                .last()
                .zip(piece.instants().first())
                .is_some_and(|(x, y)| x.value().datum_eq(y.value()));
            let touching = prev.end_timestamp() == piece.start_timestamp()
                && (prev.upper_inc() || piece.lower_inc());
            if same_value && touching {
                let mut instants = prev.instants().to_vec();
                instants.extend(
                    piece
                        .instants()
                        .iter()
                        .filter(|inst| inst.timestamp() > prev.end_timestamp())
                        .cloned(),
                );
                if let Ok(merged) = TSequence::new_normalized(
                    instants,
                    Interp::Step,
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

/// A temporal carrying `value` wherever `shape` is defined, used to lift
/// temporal-versus-base operations through the binary machinery.
fn constant_like(shape: &Temporal, temptype: TempType, value: &Datum) -> TemporalResult<Temporal> {
    let rebuild_instant =
        |inst: &TInstant| TInstant::new(temptype, value.clone(), inst.timestamp());
    match shape {
        Temporal::Instant(inst) => Ok(Temporal::Instant(rebuild_instant(inst)?)),
        Temporal::InstantSet(iset) => {
            let instants = iset
                .instants()
                .iter()
                .map(rebuild_instant)
                .collect::<TemporalResult<Vec<_>>>()?;
            Ok(Temporal::InstantSet(TInstantSet::new(instants)?))
        }
        Temporal::Sequence(_) | Temporal::SequenceSet(_) => {
            let sequences = shape
                .sequences()
                .iter()
                .map(|seq| {
                    let first = rebuild_instant(&seq.instants()[0])?;
                    let interp = if temptype.is_continuous() {
                        seq.interp()
                    } else {
                        Interp::Step
                    };
                    if seq.num_instants() == 1 {
                        TSequence::new(vec![first], interp, true, true)
                    } else {
                        let last =
                            rebuild_instant(&seq.instants()[seq.num_instants() - 1])?;
                        TSequence::new(
                            vec![first, last],
                            interp,
                            seq.lower_inc(),
                            seq.upper_inc(),
                        )
                    }
                })
                .collect::<TemporalResult<Vec<_>>>()?;
            Temporal::from_sequences(sequences)
                .ok_or_else(|| TemporalError::invariant("constant shape has no extent"))
        }
    }
}

/*************************** public surface ***************************/

fn number_restype(a: TempType, b: TempType) -> TemporalResult<TempType> {
    match (a, b) {
        (TempType::Tint, TempType::Tint) => Ok(TempType::Tint),
        (TempType::Tint | TempType::Tfloat, TempType::Tint | TempType::Tfloat) => {
            Ok(TempType::Tfloat)
        }
        _ => Err(TemporalError::mismatch(format!(
            "arithmetic needs temporal numbers, got {} and {}",
            <&'static str>::from(a),
            <&'static str>::from(b)
        ))),
    }
}

pub fn tnumber_add(a: &Temporal, b: &Temporal) -> TemporalResult<Option<Temporal>> {
    let op = LiftedOp {
        restype: number_restype(a.temptype(), b.temptype())?,
        preserves_linear: true,
        cross: false,
        turnpoint: None,
    };
    lift_binary(&|x, y| x.add(y), a, b, &op)
}

pub fn tnumber_sub(a: &Temporal, b: &Temporal) -> TemporalResult<Option<Temporal>> {
    let op = LiftedOp {
        restype: number_restype(a.temptype(), b.temptype())?,
        preserves_linear: true,
        cross: false,
        turnpoint: None,
    };
    lift_binary(&|x, y| x.sub(y), a, b, &op)
}

pub fn tnumber_mul(a: &Temporal, b: &Temporal) -> TemporalResult<Option<Temporal>> {
    let op = LiftedOp {
        restype: number_restype(a.temptype(), b.temptype())?,
        preserves_linear: true,
        cross: false,
        turnpoint: Some(product_turnpoint),
    };
    lift_binary(&|x, y| x.mul(y), a, b, &op)
}

pub fn tnumber_div(a: &Temporal, b: &Temporal) -> TemporalResult<Option<Temporal>> {
    let op = LiftedOp {
        restype: number_restype(a.temptype(), b.temptype())?,
        preserves_linear: true,
        // Split where the operands cross so the quotient stays monotone
        // per piece.
        cross: true,
        turnpoint: None,
    };
    lift_binary(&|x, y| x.div(y), a, b, &op)
}

pub fn tnumber_arith_base(
    a: &Temporal,
    value: &Datum,
    f: impl Fn(&Datum, &Datum) -> TemporalResult<Datum>,
) -> TemporalResult<Option<Temporal>> {
    let value_type = TempType::from_basetype(value.basetype()).ok_or_else(|| {
        TemporalError::mismatch("base value has no temporal counterpart")
    })?;
    let constant = constant_like(a, value_type, value)?;
    let op = LiftedOp {
        restype: number_restype(a.temptype(), value_type)?,
        preserves_linear: true,
        cross: false,
        turnpoint: None,
    };
    lift_binary(&f, a, &constant, &op)
}

/// Lifted comparison producing a temporal boolean.
pub fn temporal_cmp(op: CmpOp, a: &Temporal, b: &Temporal) -> TemporalResult<Option<Temporal>> {
    let lifted = LiftedOp {
        restype: TempType::Tbool,
        preserves_linear: false,
        cross: true,
        turnpoint: None,
    };
    lift_binary(
        &|x, y| Ok(Datum::Bool(op.eval(x, y)?)),
        a,
        b,
        &lifted,
    )
}

pub fn temporal_cmp_base(
    op: CmpOp,
    a: &Temporal,
    value: &Datum,
) -> TemporalResult<Option<Temporal>> {
    let value_type = TempType::from_basetype(value.basetype()).ok_or_else(|| {
        TemporalError::mismatch("base value has no temporal counterpart")
    })?;
    let constant = constant_like(a, value_type, value)?;
    temporal_cmp(op, a, &constant)
}

/// Lifted minimum/maximum of two temporals of one type.
pub fn temporal_minmax(a: &Temporal, b: &Temporal, is_min: bool) -> TemporalResult<Option<Temporal>> {
    if a.temptype() != b.temptype() {
        return Err(TemporalError::mismatch("min/max needs matching types"));
    }
    let op = LiftedOp {
        restype: a.temptype(),
        preserves_linear: true,
        cross: true,
        turnpoint: None,
    };
    if is_min {
        lift_binary(&|x, y| x.min(y), a, b, &op)
    } else {
        lift_binary(&|x, y| x.max(y), a, b, &op)
    }
}

/// Lifted distance: a temporal float with turning points at crossings
/// (numbers) or closest approaches (points).
pub fn temporal_distance(a: &Temporal, b: &Temporal) -> TemporalResult<Option<Temporal>> {
    let spatial = a.temptype().is_spatial();
    let op = LiftedOp {
        restype: TempType::Tfloat,
        preserves_linear: true,
        cross: !spatial,
        turnpoint: spatial.then_some(closest_approach_turnpoint as TurnpointFn),
    };
    lift_binary(&|x, y| Ok(Datum::Float(x.distance(y)?)), a, b, &op)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::timestamp::TimestampTz;

    fn ts(s: &str) -> TimestampTz {
        TimestampTz::parse(s).unwrap()
    }

    fn linear(values: &[(f64, &str)]) -> Temporal {
        Temporal::Sequence(
            TSequence::tfloat_linear(
                &values.iter().map(|(v, t)| (*v, ts(t))).collect::<Vec<_>>(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn add_of_two_linear_floats() {
        let a = linear(&[(1.0, "2000-01-01"), (3.0, "2000-01-03")]);
        let b = linear(&[(10.0, "2000-01-01"), (10.0, "2000-01-03")]);
        let sum = tnumber_add(&a, &b).unwrap().unwrap();
        assert_eq!(sum.interp(), Interp::Linear);
        assert_eq!(sum.value_at(ts("2000-01-02")), Some(Datum::Float(12.0)));
    }

    #[test]
    fn add_over_disjoint_periods_is_empty() {
        let a = linear(&[(1.0, "2000-01-01"), (3.0, "2000-01-02")]);
        let b = linear(&[(1.0, "2000-02-01"), (3.0, "2000-02-02")]);
        assert_eq!(tnumber_add(&a, &b).unwrap(), None);
    }

    #[test]
    fn comparison_splits_at_the_crossing() {
        let a = linear(&[(0.0, "2000-01-01"), (4.0, "2000-01-05")]);
        let b = linear(&[(4.0, "2000-01-01"), (0.0, "2000-01-05")]);
        let lt = temporal_cmp(CmpOp::Lt, &a, &b).unwrap().unwrap();

        assert_eq!(lt.value_at(ts("2000-01-02")), Some(Datum::Bool(true)));
        // Exactly at the crossing the operands are equal.
        assert_eq!(lt.value_at(ts("2000-01-03")), Some(Datum::Bool(false)));
        assert_eq!(lt.value_at(ts("2000-01-04")), Some(Datum::Bool(false)));

        let eq = temporal_cmp(CmpOp::Eq, &a, &b).unwrap().unwrap();
        assert_eq!(eq.value_at(ts("2000-01-03")), Some(Datum::Bool(true)));
        assert_eq!(eq.value_at(ts("2000-01-04")), Some(Datum::Bool(false)));
    }

    #[test]
    fn min_takes_the_lower_branch_per_piece() {
        let a = linear(&[(0.0, "2000-01-01"), (4.0, "2000-01-05")]);
        let b = linear(&[(4.0, "2000-01-01"), (0.0, "2000-01-05")]);
        let min = temporal_minmax(&a, &b, true).unwrap().unwrap();

        assert_eq!(min.value_at(ts("2000-01-02")), Some(Datum::Float(1.0)));
        assert_eq!(min.value_at(ts("2000-01-03")), Some(Datum::Float(2.0)));
        assert_eq!(min.value_at(ts("2000-01-04")), Some(Datum::Float(1.0)));
        assert_eq!(min.interp(), Interp::Linear);
    }

    #[test]
    fn instant_against_sequence() {
        let a = Temporal::Instant(TInstant::tfloat(5.0, ts("2000-01-02")));
        let b = linear(&[(0.0, "2000-01-01"), (4.0, "2000-01-05")]);
        let sum = tnumber_add(&a, &b).unwrap().unwrap();
        assert_eq!(sum.subtype(), TempSubtype::Instant);
        assert_eq!(sum.value_at(ts("2000-01-02")), Some(Datum::Float(6.0)));
    }

    #[test]
    fn arith_against_base_value() {
        let a = linear(&[(1.0, "2000-01-01"), (3.0, "2000-01-03")]);
        let doubled = tnumber_arith_base(&a, &Datum::Float(2.0), |x, y| x.mul(y))
            .unwrap()
            .unwrap();
        assert_eq!(doubled.value_at(ts("2000-01-02")), Some(Datum::Float(4.0)));
    }

    #[test]
    fn division_evaluates_at_breakpoints() {
        let a = linear(&[(1.0, "2000-01-01"), (1.0, "2000-01-03")]);
        let b = linear(&[(2.0, "2000-01-01"), (4.0, "2000-01-03")]);
        let quot = tnumber_div(&a, &b).unwrap().unwrap();
        assert_eq!(quot.value_at(ts("2000-01-01")), Some(Datum::Float(0.5)));
        assert_eq!(quot.value_at(ts("2000-01-03")), Some(Datum::Float(0.25)));
    }

    #[test]
    fn distance_between_moving_floats_has_a_kink() {
        let a = linear(&[(0.0, "2000-01-01"), (4.0, "2000-01-05")]);
        let b = linear(&[(4.0, "2000-01-01"), (0.0, "2000-01-05")]);
        let dist = temporal_distance(&a, &b).unwrap().unwrap();
        assert_eq!(dist.value_at(ts("2000-01-03")), Some(Datum::Float(0.0)));
        assert_eq!(dist.value_at(ts("2000-01-01")), Some(Datum::Float(4.0)));
        assert_eq!(dist.value_at(ts("2000-01-02")), Some(Datum::Float(2.0)));
    }
}
