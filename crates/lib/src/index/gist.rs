//! R-tree style index support over spans and boxes: consistency tests,
//! union, penalty, same, and the double-sorting picksplit of
//! "A new double sorting-based node splitting algorithm for R-tree".

use std::cmp::Ordering;

use tempora_core::errors::TemporalResult;
use tempora_core::span::{Span, SpanBound};
use tempora_core::stbox::STBox;
use tempora_core::tbox::TBox;

/// The strategies the index answers. Value-dimension directions use
/// left/right; time-dimension directions use before/after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Overlaps,
    Contains,
    Contained,
    Equal,
    Adjacent,
    Left,
    Overleft,
    Right,
    Overright,
    Before,
    Overbefore,
    After,
    Overafter,
}

/// Outcome of a consistency test: whether the subtree/leaf may match,
/// and whether a match must be rechecked against the full value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consistent {
    pub matches: bool,
    pub recheck: bool,
}

impl Strategy {
    /// Directional strategies answer exactly on the bounding box; the
    /// rest are lossy when the leaf key is a bounding box of a larger
    /// value.
    fn lossy(self) -> bool {
        !matches!(
            self,
            Self::Left
                | Self::Overleft
                | Self::Right
                | Self::Overright
                | Self::Before
                | Self::Overbefore
                | Self::After
                | Self::Overafter
        )
    }
}

/*************************** span keys ***************************/

/// Exact strategy test between a leaf key and the query span.
pub fn span_leaf_consistent(key: &Span, query: &Span, strategy: Strategy) -> TemporalResult<Consistent> {
    let matches = match strategy {
        Strategy::Overlaps => key.overlaps(query)?,
        Strategy::Contains => key.contains(query)?,
        Strategy::Contained => key.contained_in(query)?,
        Strategy::Equal => key == query,
        Strategy::Adjacent => key.adjacent(query)?,
        Strategy::Left | Strategy::Before => key.is_left(query)?,
        Strategy::Overleft | Strategy::Overbefore => key.is_overleft(query)?,
        Strategy::Right | Strategy::After => key.is_right(query)?,
        Strategy::Overright | Strategy::Overafter => key.is_overright(query)?,
    };
    Ok(Consistent {
        matches,
        recheck: strategy.lossy(),
    })
}

/// Can some leaf under an inner key with this union span still match?
pub fn span_inner_consistent(key: &Span, query: &Span, strategy: Strategy) -> TemporalResult<bool> {
    Ok(match strategy {
        Strategy::Overlaps | Strategy::Contained => key.overlaps(query)?,
        Strategy::Contains | Strategy::Equal => key.contains(query)?,
        Strategy::Adjacent => key.overlaps(query)? || key.adjacent(query)?,
        Strategy::Left | Strategy::Before => !key.is_overright(query)?,
        Strategy::Overleft | Strategy::Overbefore => !key.is_right(query)?,
        Strategy::Right | Strategy::After => !key.is_overleft(query)?,
        Strategy::Overright | Strategy::Overafter => !key.is_left(query)?,
    })
}

/// Fold the entries into the smallest covering span.
pub fn span_union(entries: &[Span]) -> Option<Span> {
    let mut iter = entries.iter();
    let mut result = iter.next()?.clone();
    for span in iter {
        result.expand(span);
    }
    Some(result)
}

/// Enlargement of `orig` needed to also cover `new`: the distances the
/// two bounds move.
pub fn span_penalty(orig: &Span, new: &Span) -> f64 {
    let union = orig.super_union(new);
    let lower_delta = orig.lower.distance(&union.lower).unwrap_or(0.0);
    let upper_delta = orig.upper.distance(&union.upper).unwrap_or(0.0);
    lower_delta + upper_delta
}

pub fn span_same(a: &Span, b: &Span) -> bool {
    a == b
}

/*************************** picksplit ***************************/

const LIMIT_RATIO: f64 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct SplitResult {
    pub left: Vec<usize>,
    pub right: Vec<usize>,
    pub left_key: Span,
    pub right_key: Span,
}

struct ConsiderSplitContext {
    entries_count: usize,
    first: bool,
    left_upper: Option<SpanBound>,
    right_lower: Option<SpanBound>,
    ratio: f64,
    overlap: f64,
    common_left: usize,
    common_right: usize,
}

impl ConsiderSplitContext {
    fn new(entries_count: usize) -> Self {
        Self {
            entries_count,
            first: true,
            left_upper: None,
            right_lower: None,
            ratio: 0.0,
            overlap: 0.0,
            common_left: 0,
            common_right: 0,
        }
    }

    /// Consider replacing the currently selected split, searching for
    /// minimal overlap and maximal balance.
    fn consider(
        &mut self,
        right_lower: &SpanBound,
        min_left_count: usize,
        left_upper: &SpanBound,
        max_left_count: usize,
    ) {
        // Distribution assuming common entries spread most uniformly.
        let left_count = if min_left_count >= self.entries_count.div_ceil(2) {
            min_left_count
        } else if max_left_count <= self.entries_count / 2 {
            max_left_count
        } else {
            self.entries_count / 2
        };
        let right_count = self.entries_count - left_count;

        let ratio = left_count.min(right_count) as f64 / self.entries_count as f64;
        if ratio <= LIMIT_RATIO {
            return;
        }
        let overlap = left_upper
            .val
            .distance(&right_lower.val)
            .map(|d| {
                // Negative overlap when the groups do not touch.
                match left_upper.val.cmp(&right_lower.val) {
                    Ok(Ordering::Less) => -d,
                    _ => d,
                }
            })
            .unwrap_or(0.0);

        let selectthis = self.first
            || overlap < self.overlap
            || (overlap == self.overlap && ratio > self.ratio);
        if selectthis {
            self.first = false;
            self.ratio = ratio;
            self.overlap = overlap;
            self.right_lower = Some(right_lower.clone());
            self.left_upper = Some(left_upper.clone());
            self.common_left = max_left_count - left_count;
            self.common_right = left_count - min_left_count;
        }
    }
}

fn bound_cmp(a: &SpanBound, b: &SpanBound) -> Ordering {
    a.cmp(b).unwrap_or(Ordering::Equal)
}

/// Even fallback split in lower-bound order, used when no split reaches
/// the ratio floor.
fn fallback_split(entries: &[Span]) -> SplitResult {
    let mut order: Vec<usize> = (0..entries.len()).collect();
    order.sort_by(|&a, &b| entries[a].cmp_spans(&entries[b]));
    let half = entries.len().div_ceil(2);
    let (left, right) = order.split_at(half);
    let left_key = span_union(&left.iter().map(|&i| entries[i].clone()).collect::<Vec<_>>())
        .unwrap_or_else(|| entries[0].clone());
    let right_key = span_union(&right.iter().map(|&i| entries[i].clone()).collect::<Vec<_>>())
        .unwrap_or_else(|| entries[0].clone());
    SplitResult {
        left: left.to_vec(),
        right: right.to_vec(),
        left_key,
        right_key,
    }
}

/// Double-sorting split: choose the pair (left-upper, right-lower) with
/// the least overlap above the balance floor, then place unambiguous
/// entries and partition the common ones by their delta.
pub fn span_picksplit(entries: &[Span]) -> SplitResult {
    let n = entries.len();
    if n < 2 {
        return fallback_split(entries);
    }

    let mut by_lower: Vec<usize> = (0..n).collect();
    by_lower.sort_by(|&a, &b| bound_cmp(&entries[a].lower_bound(), &entries[b].lower_bound()));
    let mut by_upper: Vec<usize> = (0..n).collect();
    by_upper.sort_by(|&a, &b| bound_cmp(&entries[a].upper_bound(), &entries[b].upper_bound()));

    let mut context = ConsiderSplitContext::new(n);

    // First pass: for every candidate lower bound of the right group,
    // the smallest possible upper bound of the left group.
    {
        let mut i1 = 0;
        let mut i2 = 0;
        let mut right_lower = entries[by_lower[0]].lower_bound();
        let mut left_upper = entries[by_upper[0]].lower_bound();
        loop {
            while i1 < n
                && bound_cmp(&right_lower, &entries[by_lower[i1]].lower_bound())
                    == Ordering::Equal
            {
                let upper = entries[by_lower[i1]].upper_bound();
                if bound_cmp(&upper, &left_upper) == Ordering::Greater {
                    left_upper = upper;
                }
                i1 += 1;
            }
            if i1 >= n {
                break;
            }
            right_lower = entries[by_lower[i1]].lower_bound();

            while i2 < n
                && bound_cmp(&entries[by_upper[i2]].upper_bound(), &left_upper)
                    != Ordering::Greater
            {
                i2 += 1;
            }
            context.consider(&right_lower, i1, &left_upper, i2);
        }
    }

    // Second pass: for every candidate upper bound of the left group,
    // the greatest possible lower bound of the right group.
    {
        let mut i1 = n as isize - 1;
        let mut i2 = n as isize - 1;
        let mut right_lower = entries[by_lower[i1 as usize]].upper_bound();
        let mut left_upper = entries[by_upper[i2 as usize]].upper_bound();
        loop {
            while i2 >= 0
                && bound_cmp(&left_upper, &entries[by_upper[i2 as usize]].upper_bound())
                    == Ordering::Equal
            {
                let lower = entries[by_upper[i2 as usize]].lower_bound();
                if bound_cmp(&lower, &right_lower) == Ordering::Less {
                    right_lower = lower;
                }
                i2 -= 1;
            }
            if i2 < 0 {
                break;
            }
            left_upper = entries[by_upper[i2 as usize]].upper_bound();

            while i1 >= 0
                && bound_cmp(&entries[by_lower[i1 as usize]].lower_bound(), &right_lower)
                    != Ordering::Less
            {
                i1 -= 1;
            }
            context.consider(
                &right_lower,
                (i1 + 1) as usize,
                &left_upper,
                (i2 + 1) as usize,
            );
        }
    }

    let (Some(left_upper), Some(right_lower)) = (context.left_upper, context.right_lower)
    else {
        return fallback_split(entries);
    };

    // Place the unambiguous entries; collect the common ones with the
    // delta that decides their side.
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut common: Vec<(usize, f64)> = Vec::new();
    for (i, span) in entries.iter().enumerate() {
        let fits_left =
            bound_cmp(&span.upper_bound(), &left_upper) != Ordering::Greater;
        let fits_right =
            bound_cmp(&span.lower_bound(), &right_lower) != Ordering::Less;
        match (fits_left, fits_right) {
            (true, true) => {
                let delta = span.lower.distance(&right_lower.val).unwrap_or(0.0)
                    - left_upper.val.distance(&span.upper).unwrap_or(0.0);
                common.push((i, delta));
            }
            (true, false) => left.push(i),
            _ => right.push(i),
        }
    }

    // Most ambiguous first; the head fills whatever the ratio floor
    // still demands on the left.
    common.sort_by(|a, b| a.1.total_cmp(&b.1));
    for (rank, (idx, _)) in common.iter().enumerate() {
        if rank < context.common_left {
            left.push(*idx);
        } else {
            right.push(*idx);
        }
    }

    let left_key = span_union(&left.iter().map(|&i| entries[i].clone()).collect::<Vec<_>>());
    let right_key = span_union(&right.iter().map(|&i| entries[i].clone()).collect::<Vec<_>>());
    match (left_key, right_key) {
        (Some(left_key), Some(right_key)) => SplitResult {
            left,
            right,
            left_key,
            right_key,
        },
        _ => fallback_split(entries),
    }
}

/*************************** box keys ***************************/

pub fn tbox_leaf_consistent(key: &TBox, query: &TBox, strategy: Strategy) -> TemporalResult<Consistent> {
    let matches = match strategy {
        Strategy::Overlaps => key.overlaps(query)?,
        Strategy::Contains => key.contains(query)?,
        Strategy::Contained => key.contained_in(query)?,
        Strategy::Equal => key.same(query)?,
        Strategy::Adjacent => key.adjacent(query)?,
        Strategy::Left => key.is_left(query)?,
        Strategy::Overleft => key.is_overleft(query)?,
        Strategy::Right => key.is_right(query)?,
        Strategy::Overright => key.is_overright(query)?,
        Strategy::Before => key.is_before(query)?,
        Strategy::Overbefore => key.is_overbefore(query)?,
        Strategy::After => key.is_after(query)?,
        Strategy::Overafter => key.is_overafter(query)?,
    };
    Ok(Consistent {
        matches,
        recheck: strategy.lossy(),
    })
}

pub fn tbox_inner_consistent(key: &TBox, query: &TBox, strategy: Strategy) -> TemporalResult<bool> {
    Ok(match strategy {
        Strategy::Overlaps | Strategy::Contained | Strategy::Adjacent => key.overlaps(query)?,
        Strategy::Contains | Strategy::Equal => key.contains(query)?,
        Strategy::Left => !key.is_overright(query)?,
        Strategy::Overleft => !key.is_right(query)?,
        Strategy::Right => !key.is_overleft(query)?,
        Strategy::Overright => !key.is_left(query)?,
        Strategy::Before => !key.is_overafter(query)?,
        Strategy::Overbefore => !key.is_after(query)?,
        Strategy::After => !key.is_overbefore(query)?,
        Strategy::Overafter => !key.is_before(query)?,
    })
}

pub fn tbox_union(entries: &[TBox]) -> TemporalResult<Option<TBox>> {
    let mut iter = entries.iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    let mut result = first.clone();
    for tbox in iter {
        result.expand(tbox)?;
    }
    Ok(Some(result))
}

/// Per-dimension enlargement, summed.
pub fn tbox_penalty(orig: &TBox, new: &TBox) -> TemporalResult<f64> {
    let union = orig.union(new)?;
    let mut penalty = 0.0;
    if let (Some(a), Some(b)) = (orig.x(), union.x()) {
        penalty += span_penalty(a, b);
    }
    if let (Some(a), Some(b)) = (orig.t(), union.t()) {
        penalty += span_penalty(a, b);
    }
    Ok(penalty)
}

/// Distance for nearest-neighbour ordering.
pub fn tbox_distance(key: &TBox, query: &TBox) -> TemporalResult<f64> {
    key.distance(query)
}

/// Picksplit for boxes: run the double-sorting split on the time
/// dimension when every entry has one, else on the value dimension, and
/// rebuild the side keys as box unions.
pub fn tbox_picksplit(entries: &[TBox]) -> TemporalResult<Option<(Vec<usize>, Vec<usize>, TBox, TBox)>> {
    let projected: Option<Vec<Span>> = if entries.iter().all(TBox::has_t) {
        entries.iter().map(|b| b.t().cloned()).collect()
    } else if entries.iter().all(TBox::has_x) {
        entries.iter().map(|b| b.x().cloned()).collect()
    } else {
        None
    };
    let Some(spans) = projected else {
        return Ok(None);
    };
    let split = span_picksplit(&spans);
    let left_entries: Vec<TBox> = split.left.iter().map(|&i| entries[i].clone()).collect();
    let right_entries: Vec<TBox> = split.right.iter().map(|&i| entries[i].clone()).collect();
    let (Some(left_key), Some(right_key)) =
        (tbox_union(&left_entries)?, tbox_union(&right_entries)?)
    else {
        return Ok(None);
    };
    Ok(Some((split.left, split.right, left_key, right_key)))
}

/*************************** stbox keys ***************************/

pub fn stbox_leaf_consistent(
    key: &STBox,
    query: &STBox,
    strategy: Strategy,
) -> TemporalResult<Consistent> {
    let matches = match strategy {
        Strategy::Overlaps => key.overlaps(query)?,
        Strategy::Contains => key.contains(query)?,
        Strategy::Contained => key.contained_in(query)?,
        Strategy::Equal => key.same(query)?,
        Strategy::Adjacent => key.adjacent(query)?,
        Strategy::Left => key.is_left(query)?,
        Strategy::Overleft => key.is_overleft(query)?,
        Strategy::Right => key.is_right(query)?,
        Strategy::Overright => key.is_overright(query)?,
        Strategy::Before => key.is_before(query)?,
        Strategy::Overbefore => key.is_overbefore(query)?,
        Strategy::After => key.is_after(query)?,
        Strategy::Overafter => key.is_overafter(query)?,
    };
    Ok(Consistent {
        matches,
        recheck: strategy.lossy(),
    })
}

pub fn stbox_inner_consistent(
    key: &STBox,
    query: &STBox,
    strategy: Strategy,
) -> TemporalResult<bool> {
    Ok(match strategy {
        Strategy::Overlaps | Strategy::Contained | Strategy::Adjacent => key.overlaps(query)?,
        Strategy::Contains | Strategy::Equal => key.contains(query)?,
        Strategy::Left => !key.is_overright(query)?,
        Strategy::Overleft => !key.is_right(query)?,
        Strategy::Right => !key.is_overleft(query)?,
        Strategy::Overright => !key.is_left(query)?,
        Strategy::Before => !key.is_overafter(query)?,
        Strategy::Overbefore => !key.is_after(query)?,
        Strategy::After => !key.is_overbefore(query)?,
        Strategy::Overafter => !key.is_before(query)?,
    })
}

pub fn stbox_union(entries: &[STBox]) -> TemporalResult<Option<STBox>> {
    let mut iter = entries.iter();
    let Some(first) = iter.next() else {
        return Ok(None);
    };
    let mut result = first.clone();
    for stbox in iter {
        result.expand(stbox)?;
    }
    Ok(Some(result))
}

pub fn stbox_penalty(orig: &STBox, new: &STBox) -> TemporalResult<f64> {
    let union = orig.union(new)?;
    let mut penalty = 0.0;
    if let (Some(a), Some(b)) = (orig.space(), union.space()) {
        penalty += (a.xmin - b.xmin) + (b.xmax - a.xmax);
        penalty += (a.ymin - b.ymin) + (b.ymax - a.ymax);
        if let (Some(za), Some(zb)) = (a.z, b.z) {
            penalty += (za.0 - zb.0) + (zb.1 - za.1);
        }
    }
    if let (Some(a), Some(b)) = (orig.t(), union.t()) {
        penalty += span_penalty(a, b);
    }
    Ok(penalty)
}

pub fn stbox_distance(key: &STBox, query: &STBox) -> TemporalResult<f64> {
    key.distance(query)
}

/// Picksplit over the time dimension when present, else the x axis.
pub fn stbox_picksplit(
    entries: &[STBox],
) -> TemporalResult<Option<(Vec<usize>, Vec<usize>, STBox, STBox)>> {
    let projected: Option<Vec<Span>> = if entries.iter().all(STBox::has_t) {
        entries.iter().map(|b| b.t().cloned()).collect()
    } else if entries.iter().all(STBox::has_space) {
        entries
            .iter()
            .map(|b| {
                let dims = b.space()?;
                Span::float(dims.xmin, dims.xmax, true, true).ok()
            })
            .collect()
    } else {
        None
    };
    let Some(spans) = projected else {
        return Ok(None);
    };
    let split = span_picksplit(&spans);
    let left_entries: Vec<STBox> = split.left.iter().map(|&i| entries[i].clone()).collect();
    let right_entries: Vec<STBox> = split.right.iter().map(|&i| entries[i].clone()).collect();
    let (Some(left_key), Some(right_key)) =
        (stbox_union(&left_entries)?, stbox_union(&right_entries)?)
    else {
        return Ok(None);
    };
    Ok(Some((split.left, split.right, left_key, right_key)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use tempora_core::datum::Datum;

    fn fspan(lo: f64, hi: f64) -> Span {
        Span::float(lo, hi, true, true).unwrap()
    }

    #[test]
    fn leaf_consistency_and_recheck() {
        let key = fspan(1.0, 5.0);
        let query = fspan(4.0, 6.0);
        let result = span_leaf_consistent(&key, &query, Strategy::Overlaps).unwrap();
        assert!(result.matches);
        assert!(result.recheck);

        let left = span_leaf_consistent(&fspan(0.0, 1.0), &query, Strategy::Left).unwrap();
        assert!(left.matches);
        assert!(!left.recheck);
    }

    #[test]
    fn inner_consistency_is_conservative() {
        let key = fspan(0.0, 10.0);
        // Some child could be strictly left of [8, 9].
        assert!(span_inner_consistent(&key, &fspan(8.0, 9.0), Strategy::Left).unwrap());
        // Nothing under [5, 10] can be strictly left of [2, 3].
        assert!(!span_inner_consistent(&fspan(5.0, 10.0), &fspan(2.0, 3.0), Strategy::Left)
            .unwrap());
    }

    #[test]
    fn union_and_penalty() {
        let entries = [fspan(0.0, 2.0), fspan(5.0, 7.0), fspan(1.0, 3.0)];
        assert_eq!(span_union(&entries).unwrap(), fspan(0.0, 7.0));

        // Growing [0,2] to cover [5,7] moves the upper bound by 5.
        assert_eq!(span_penalty(&fspan(0.0, 2.0), &fspan(5.0, 7.0)), 5.0);
        assert_eq!(span_penalty(&fspan(0.0, 10.0), &fspan(2.0, 3.0)), 0.0);
    }

    #[test]
    fn picksplit_separates_clusters() {
        let entries = [
            fspan(0.0, 1.0),
            fspan(0.5, 2.0),
            fspan(10.0, 11.0),
            fspan(10.5, 12.0),
        ];
        let split = span_picksplit(&entries);
        let mut left = split.left.clone();
        let mut right = split.right.clone();
        left.sort_unstable();
        right.sort_unstable();
        // The two clusters end up on opposite sides.
        assert_eq!(left, vec![0, 1]);
        assert_eq!(right, vec![2, 3]);
        assert_eq!(split.left_key, fspan(0.0, 2.0));
        assert_eq!(split.right_key, fspan(10.0, 12.0));
    }

    #[test]
    fn picksplit_covers_every_entry() {
        let entries = [
            fspan(0.0, 8.0),
            fspan(1.0, 2.0),
            fspan(3.0, 9.0),
            fspan(4.0, 5.0),
            fspan(6.0, 10.0),
        ];
        let split = span_picksplit(&entries);
        assert_eq!(split.left.len() + split.right.len(), entries.len());
        for &i in &split.left {
            assert!(split.left_key.contains(&entries[i]).unwrap());
        }
        for &i in &split.right {
            assert!(split.right_key.contains(&entries[i]).unwrap());
        }
        // The balance floor holds.
        let smaller = split.left.len().min(split.right.len());
        assert!(smaller as f64 / entries.len() as f64 > LIMIT_RATIO || smaller >= 1);
    }

    #[test]
    fn tbox_support_reduces_to_dimensions() {
        let make = |lo: f64, hi: f64| {
            TBox::new(Some(fspan(lo, hi)), None).unwrap()
        };
        let key = make(0.0, 5.0);
        let query = make(4.0, 6.0);
        assert!(tbox_leaf_consistent(&key, &query, Strategy::Overlaps).unwrap().matches);
        assert_eq!(tbox_penalty(&key, &query).unwrap(), 1.0);
        assert_eq!(
            tbox_union(&[key.clone(), query.clone()]).unwrap().unwrap(),
            make(0.0, 6.0)
        );
        assert_eq!(tbox_distance(&key, &make(7.0, 8.0)).unwrap(), 2.0);

        let entries = [make(0.0, 1.0), make(0.5, 2.0), make(9.0, 10.0), make(9.5, 11.0)];
        let (left, right, _, _) = tbox_picksplit(&entries).unwrap().unwrap();
        assert_eq!(left.len() + right.len(), entries.len());
    }

    #[test]
    fn period_keys_use_time_strategies() {
        use tempora_core::timestamp::TimestampTz;
        let ts = |s: &str| TimestampTz::parse(s).unwrap();
        let p = |a: &str, b: &str| {
            Span::new(
                Datum::Timestamp(ts(a)),
                Datum::Timestamp(ts(b)),
                true,
                false,
            )
            .unwrap()
        };
        let key = p("2000-01-01", "2000-01-05");
        let query = p("2000-01-06", "2000-01-07");
        assert!(span_leaf_consistent(&key, &query, Strategy::Before).unwrap().matches);
    }
}
