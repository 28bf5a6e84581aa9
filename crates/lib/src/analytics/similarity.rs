//! Similarity measures between temporal trajectories: discrete Fréchet,
//! dynamic time warping and discrete Hausdorff.
//!
//! Each measure has a distance form (two-row rolling matrix, O(n·m) time
//! and O(min(n, m)) space) and, for Fréchet and DTW, a path form (full
//! matrix plus a backtrack that prefers the diagonal on ties).

use tempora_core::datum::Datum;
use tempora_core::errors::{TemporalError, TemporalResult};
use tempora_core::temporal::{Temporal, TemporalOps};
use tempora_helpers::CancelToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimFunc {
    Frechet,
    DynTimeWarp,
}

/// One matched pair of instant indexes along a warping path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub i: usize,
    pub j: usize,
}

fn instant_values(temp: &Temporal) -> Vec<Datum> {
    temp.instants()
        .into_iter()
        .map(|inst| inst.value().clone())
        .collect()
}

fn ensure_comparable(a: &Temporal, b: &Temporal) -> TemporalResult<()> {
    if a.temptype() != b.temptype() {
        return Err(TemporalError::mismatch(
            "similarity needs matching temporal types",
        ));
    }
    Ok(())
}

/// Rolling two-row dynamic program over the value arrays.
fn similarity_rolling(
    long: &[Datum],
    short: &[Datum],
    simfunc: SimFunc,
    token: &CancelToken,
) -> TemporalResult<f64> {
    let width = short.len();
    let mut dist = vec![-1.0; 2 * width];
    for i in 0..long.len() {
        if token.is_cancelled() {
            return Err(TemporalError::Cancelled);
        }
        let (row, prev) = (i % 2, (i + 1) % 2);
        for j in 0..width {
            let d = long[i].distance(&short[j])?;
            dist[row * width + j] = match (i, j) {
                (0, 0) => d,
                (_, 0) => match simfunc {
                    SimFunc::Frechet => d.max(dist[prev * width]),
                    SimFunc::DynTimeWarp => d + dist[prev * width],
                },
                (0, _) => match simfunc {
                    SimFunc::Frechet => d.max(dist[j - 1]),
                    SimFunc::DynTimeWarp => d + dist[j - 1],
                },
                _ => {
                    let best = dist[prev * width + j - 1]
                        .min(dist[prev * width + j])
                        .min(dist[row * width + j - 1]);
                    match simfunc {
                        SimFunc::Frechet => d.max(best),
                        SimFunc::DynTimeWarp => d + best,
                    }
                }
            };
        }
    }
    Ok(dist[(long.len() - 1) % 2 * width + width - 1])
}

/// The similarity distance between two temporal values. The argument
/// with fewer instants indexes the rolling buffer.
pub fn similarity_distance(
    a: &Temporal,
    b: &Temporal,
    simfunc: SimFunc,
    token: &CancelToken,
) -> TemporalResult<f64> {
    ensure_comparable(a, b)?;
    let va = instant_values(a);
    let vb = instant_values(b);
    if va.len() >= vb.len() {
        similarity_rolling(&va, &vb, simfunc, token)
    } else {
        similarity_rolling(&vb, &va, simfunc, token)
    }
}

pub fn frechet_distance(a: &Temporal, b: &Temporal, token: &CancelToken) -> TemporalResult<f64> {
    similarity_distance(a, b, SimFunc::Frechet, token)
}

pub fn dyntimewarp_distance(
    a: &Temporal,
    b: &Temporal,
    token: &CancelToken,
) -> TemporalResult<f64> {
    similarity_distance(a, b, SimFunc::DynTimeWarp, token)
}

/// Full-matrix computation plus backtrack. The path runs from `(0, 0)`
/// to `(n-1, m-1)`; ties prefer the diagonal.
pub fn similarity_path(
    a: &Temporal,
    b: &Temporal,
    simfunc: SimFunc,
    token: &CancelToken,
) -> TemporalResult<Vec<Match>> {
    ensure_comparable(a, b)?;
    let va = instant_values(a);
    let vb = instant_values(b);
    // The longer trajectory indexes the rows.
    let (rows, cols, swapped) = if va.len() >= vb.len() {
        (&va, &vb, false)
    } else {
        (&vb, &va, true)
    };
    let (n, m) = (rows.len(), cols.len());
    let mut dist = vec![-1.0_f64; n * m];
    for i in 0..n {
        if token.is_cancelled() {
            return Err(TemporalError::Cancelled);
        }
        for j in 0..m {
            let d = rows[i].distance(&cols[j])?;
            dist[i * m + j] = match (i, j) {
                (0, 0) => d,
                (_, 0) => match simfunc {
                    SimFunc::Frechet => d.max(dist[(i - 1) * m]),
                    SimFunc::DynTimeWarp => d + dist[(i - 1) * m],
                },
                (0, _) => match simfunc {
                    SimFunc::Frechet => d.max(dist[j - 1]),
                    SimFunc::DynTimeWarp => d + dist[j - 1],
                },
                _ => {
                    let best = dist[(i - 1) * m + j - 1]
                        .min(dist[(i - 1) * m + j])
                        .min(dist[i * m + j - 1]);
                    match simfunc {
                        SimFunc::Frechet => d.max(best),
                        SimFunc::DynTimeWarp => d + best,
                    }
                }
            };
        }
    }

    let mut path = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n - 1, m - 1);
    loop {
        path.push(if swapped {
            Match { i: j, j: i }
        } else {
            Match { i, j }
        });
        if i == 0 && j == 0 {
            break;
        }
        if i > 0 && j > 0 {
            let diagonal = dist[(i - 1) * m + j - 1];
            let up = dist[(i - 1) * m + j];
            let best = diagonal.min(up).min(dist[i * m + j - 1]);
            if diagonal == best {
                i -= 1;
                j -= 1;
            } else if up == best {
                i -= 1;
            } else {
                j -= 1;
            }
        } else if i > 0 {
            i -= 1;
        } else {
            j -= 1;
        }
    }
    path.reverse();
    Ok(path)
}

/// Discrete Hausdorff distance, with the early-out that abandons an
/// inner scan as soon as the running minimum cannot improve the maximum.
pub fn hausdorff_distance(
    a: &Temporal,
    b: &Temporal,
    token: &CancelToken,
) -> TemporalResult<f64> {
    ensure_comparable(a, b)?;
    let va = instant_values(a);
    let vb = instant_values(b);

    let mut cmax = 0.0_f64;
    for (outer, inner) in [(&va, &vb), (&vb, &va)] {
        for x in outer.iter() {
            if token.is_cancelled() {
                return Err(TemporalError::Cancelled);
            }
            let mut cmin = f64::MAX;
            for y in inner.iter() {
                let d = x.distance(y)?;
                if d < cmin {
                    cmin = d;
                }
                if cmin < cmax {
                    break;
                }
            }
            if cmax < cmin && cmin < f64::MAX {
                cmax = cmin;
            }
        }
    }
    Ok(cmax)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use tempora_core::temporal::TSequence;
    use tempora_core::timestamp::TimestampTz;

    fn ts(s: &str) -> TimestampTz {
        TimestampTz::parse(s).unwrap()
    }

    fn tfloat(values: &[f64]) -> Temporal {
        let base = ts("2000-01-01").micros();
        let step = 86_400_000_000;
        Temporal::Sequence(
            TSequence::tfloat_linear(
                &values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (*v, TimestampTz::from_micros(base + step * i as i64)))
                    .collect::<Vec<_>>(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn identical_trajectories_have_zero_distance() {
        let t = tfloat(&[1.0, 5.0, 2.0, 8.0]);
        let token = CancelToken::ignored();
        assert_eq!(frechet_distance(&t, &t, &token).unwrap(), 0.0);
        assert_eq!(dyntimewarp_distance(&t, &t, &token).unwrap(), 0.0);
        assert_eq!(hausdorff_distance(&t, &t, &token).unwrap(), 0.0);
    }

    #[test]
    fn measures_are_symmetric() {
        let a = tfloat(&[0.0, 1.0, 4.0]);
        let b = tfloat(&[1.0, 3.0, 3.0, 5.0]);
        let token = CancelToken::ignored();
        assert_eq!(
            frechet_distance(&a, &b, &token).unwrap(),
            frechet_distance(&b, &a, &token).unwrap()
        );
        assert_eq!(
            dyntimewarp_distance(&a, &b, &token).unwrap(),
            dyntimewarp_distance(&b, &a, &token).unwrap()
        );
        assert_eq!(
            hausdorff_distance(&a, &b, &token).unwrap(),
            hausdorff_distance(&b, &a, &token).unwrap()
        );
    }

    #[test]
    fn frechet_of_shifted_tracks() {
        let a = tfloat(&[0.0, 1.0, 2.0]);
        let b = tfloat(&[1.0, 2.0, 3.0]);
        // The leash never needs to stretch beyond the constant offset.
        assert_eq!(
            frechet_distance(&a, &b, &CancelToken::ignored()).unwrap(),
            1.0
        );
    }

    #[test]
    fn dtw_warps_around_repeats() {
        let a = tfloat(&[0.0, 2.0, 4.0]);
        let b = tfloat(&[0.0, 2.0, 2.0, 4.0]);
        // The doubled middle sample matches for free under warping.
        assert_eq!(
            dyntimewarp_distance(&a, &b, &CancelToken::ignored()).unwrap(),
            0.0
        );
    }

    #[test]
    fn path_starts_and_ends_at_the_corners() {
        let a = tfloat(&[0.0, 2.0, 4.0]);
        let b = tfloat(&[0.0, 4.0]);
        let path = similarity_path(&a, &b, SimFunc::DynTimeWarp, &CancelToken::ignored())
            .unwrap();
        assert_eq!(path.first(), Some(&Match { i: 0, j: 0 }));
        assert_eq!(path.last(), Some(&Match { i: 2, j: 1 }));
        // Each step advances i, j, or both by one.
        for pair in path.windows(2) {
            let di = pair[1].i - pair[0].i;
            let dj = pair[1].j - pair[0].j;
            assert!(di <= 1 && dj <= 1 && di + dj >= 1);
        }
    }

    #[test]
    fn cancellation_aborts() {
        let a = tfloat(&[0.0, 1.0, 2.0]);
        let token = CancelToken::new();
        token.cancel();
        assert_eq!(
            frechet_distance(&a, &a, &token).unwrap_err(),
            TemporalError::Cancelled
        );
    }

    #[test]
    fn hausdorff_takes_the_worst_nearest_pair() {
        let a = tfloat(&[0.0, 10.0]);
        let b = tfloat(&[0.0, 6.0, 10.0]);
        // Every b-sample is near an a-sample within 4; symmetric worst is 4.
        assert_eq!(
            hausdorff_distance(&a, &b, &CancelToken::ignored()).unwrap(),
            4.0
        );
    }
}
