//! Weighted local outlier factor over point samples, used to screen
//! trajectories for positioning glitches. Duplicate points are grouped
//! and weighted by their multiplicity.

use tempora_core::datum::Datum;
use tempora_core::errors::{TemporalError, TemporalResult};
use tempora_core::geo::GeoPoint;
use tempora_helpers::IndexMap;

/// LOF scores aligned with the input points: a score near 1 means the
/// point sits in a density similar to its neighbours'; scores well above
/// 1 flag outliers.
pub fn geo_wlof(points: &[GeoPoint], k: usize) -> TemporalResult<Vec<f64>> {
    if k == 0 {
        return Err(TemporalError::invariant("k must be positive"));
    }
    if points.is_empty() {
        return Ok(Vec::new());
    }

    // Group duplicates: each distinct point carries its multiplicity.
    let mut index_of: IndexMap<u64, usize> = IndexMap::default();
    let mut distinct: Vec<GeoPoint> = Vec::new();
    let mut weight: Vec<f64> = Vec::new();
    let mut assignment = Vec::with_capacity(points.len());
    for point in points {
        let key = Datum::Geom(*point).datum_hash();
        let idx = *index_of.entry(key).or_insert_with(|| {
            distinct.push(*point);
            weight.push(0.0);
            distinct.len() - 1
        });
        weight[idx] += 1.0;
        assignment.push(idx);
    }

    let n = distinct.len();
    if n == 1 {
        return Ok(vec![1.0; points.len()]);
    }

    // Pairwise distances between distinct points.
    let mut dist = vec![0.0_f64; n * n];
    for i in 0..n {
        for j in i + 1..n {
            let d = distinct[i].distance(&distinct[j])?;
            dist[i * n + j] = d;
            dist[j * n + i] = d;
        }
    }

    // The k nearest distinct neighbours of each point, by cumulative
    // weight, and its k-distance.
    let mut neighbours: Vec<Vec<usize>> = Vec::with_capacity(n);
    let mut kdist = vec![0.0_f64; n];
    for i in 0..n {
        let mut order: Vec<usize> = (0..n).filter(|&j| j != i).collect();
        order.sort_by(|&a, &b| dist[i * n + a].total_cmp(&dist[i * n + b]));
        let mut cumulative = 0.0;
        let mut kept = Vec::new();
        for j in order {
            kept.push(j);
            cumulative += weight[j];
            kdist[i] = dist[i * n + j];
            if cumulative >= k as f64 {
                break;
            }
        }
        neighbours.push(kept);
    }

    // Local reachability density of each distinct point.
    let mut lrd = vec![0.0_f64; n];
    for i in 0..n {
        let mut reach_sum = 0.0;
        let mut weight_sum = 0.0;
        for &j in &neighbours[i] {
            reach_sum += weight[j] * kdist[j].max(dist[i * n + j]);
            weight_sum += weight[j];
        }
        lrd[i] = if reach_sum == 0.0 {
            f64::INFINITY
        } else {
            weight_sum / reach_sum
        };
    }

    // LOF: average density ratio against the neighbourhood.
    let mut scores = vec![1.0_f64; n];
    for i in 0..n {
        let mut ratio_sum = 0.0;
        let mut weight_sum = 0.0;
        for &j in &neighbours[i] {
            let ratio = if lrd[i].is_infinite() {
                1.0
            } else if lrd[j].is_infinite() {
                // A denser (duplicated) neighbour inflates the score.
                f64::MAX.sqrt()
            } else {
                lrd[j] / lrd[i]
            };
            ratio_sum += weight[j] * ratio;
            weight_sum += weight[j];
        }
        if weight_sum > 0.0 {
            scores[i] = ratio_sum / weight_sum;
        }
    }

    Ok(assignment.into_iter().map(|idx| scores[idx]).collect())
}
