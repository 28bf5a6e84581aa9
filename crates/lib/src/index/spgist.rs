//! Quadtree (SP-GiST style) index support over spans and boxes.
//!
//! Inner nodes store a centroid span; each entry is routed to one of
//! four quadrants by comparing its two bounds against the centroid's.
//! Inner consistency maintains a traversal value bounding the subtree
//! (the span of possible lower bounds and the span of possible upper
//! bounds), refined quadrant by quadrant.

use std::cmp::Ordering;

use tempora_core::datum::Datum;
use tempora_core::errors::{TemporalError, TemporalResult};
use tempora_core::span::Span;
use tempora_core::stbox::STBox;
use tempora_core::tbox::TBox;
use tempora_core::timestamp::{Date, TimestampTz};
use tempora_core::types::BaseType;

use crate::index::gist::{span_leaf_consistent, Consistent, Strategy};

/// The traversal value: where the lower and upper bounds of every span
/// in the subtree can still lie.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanNode {
    pub left: Span,
    pub right: Span,
}

fn extreme_values(basetype: BaseType) -> Option<(Datum, Datum)> {
    match basetype {
        BaseType::Int => Some((Datum::Int(i32::MIN), Datum::Int(i32::MAX))),
        BaseType::Float => Some((
            Datum::Float(f64::NEG_INFINITY),
            Datum::Float(f64::INFINITY),
        )),
        // Half-range sentinels keep bound arithmetic clear of overflow.
        BaseType::Timestamp => Some((
            Datum::Timestamp(TimestampTz(i64::MIN / 2)),
            Datum::Timestamp(TimestampTz(i64::MAX / 2)),
        )),
        BaseType::Date => Some((
            Datum::Date(Date(i32::MIN / 2)),
            Datum::Date(Date(i32::MAX / 2)),
        )),
        _ => None,
    }
}

impl SpanNode {
    /// The unconstrained traversal value for the root.
    pub fn unbounded(basetype: BaseType) -> TemporalResult<Self> {
        let (min, max) = extreme_values(basetype).ok_or_else(|| {
            TemporalError::mismatch("quadtree indexing needs a span base type")
        })?;
        Ok(Self {
            left: Span::new(min.clone(), max.clone(), true, true)?,
            right: Span::new(min, max, true, true)?,
        })
    }

    /// The widest span any subtree member can cover.
    fn extent(&self) -> Span {
        let mut extent = self.left.clone();
        extent.expand(&self.right);
        extent
    }

    /// Refine for the given child quadrant of `centroid`.
    pub fn quadtree_next(&self, centroid: &Span, quadrant: u8) -> Self {
        let mut next = self.clone();
        if quadrant & 0x2 != 0 {
            next.left.lower = centroid.lower.clone();
            next.left.lower_inc = centroid.lower_inc;
        } else {
            next.left.upper = centroid.lower.clone();
            next.left.upper_inc = centroid.lower_inc;
        }
        if quadrant & 0x1 != 0 {
            next.right.lower = centroid.upper.clone();
            next.right.lower_inc = centroid.upper_inc;
        } else {
            next.right.upper = centroid.upper.clone();
            next.right.upper_inc = centroid.upper_inc;
        }
        next
    }

    /// Can any span in the subtree satisfy the strategy against the
    /// query? Errors never surface: ambiguity reports `true` so the
    /// scan degrades to a recheck instead of missing results.
    pub fn may_contain_matches(&self, query: &Span, strategy: Strategy) -> bool {
        let result = self.try_consistency(query, strategy);
        result.unwrap_or(true)
    }

    fn try_consistency(&self, query: &Span, strategy: Strategy) -> TemporalResult<bool> {
        Ok(match strategy {
            Strategy::Overlaps | Strategy::Contained => self.extent().overlaps(query)?,
            Strategy::Contains | Strategy::Equal => self.extent().contains(query)?,
            Strategy::Adjacent => {
                let extent = self.extent();
                extent.overlaps(query)? || extent.adjacent(query)?
            }
            Strategy::Left | Strategy::Before => self.right.is_left(query)?,
            Strategy::Overleft | Strategy::Overbefore => self.right.is_overleft(query)?,
            Strategy::Right | Strategy::After => self.left.is_right(query)?,
            Strategy::Overright | Strategy::Overafter => self.left.is_overright(query)?,
        })
    }

    /// Lower bound on the distance from the query to any subtree member,
    /// for nearest-first ordering.
    pub fn distance_lower_bound(&self, query: &Span) -> f64 {
        self.extent().distance(query).unwrap_or(0.0)
    }
}

/// Which quadrant of `centroid` the entry belongs to: bit 1 set when its
/// lower bound is greater, bit 0 set when its upper bound is greater.
pub fn quadrant_of(centroid: &Span, entry: &Span) -> u8 {
    let mut quadrant = 0;
    if matches!(
        entry.lower_bound().cmp(&centroid.lower_bound()),
        Ok(Ordering::Greater)
    ) {
        quadrant |= 0x2;
    }
    if matches!(
        entry.upper_bound().cmp(&centroid.upper_bound()),
        Ok(Ordering::Greater)
    ) {
        quadrant |= 0x1;
    }
    quadrant
}

/// Route an entry at an inner node.
pub fn choose(centroid: &Span, entry: &Span) -> u8 {
    quadrant_of(centroid, entry)
}

/// Split a page of spans: the centroid takes the medians of the lower
/// and of the upper bounds, and every entry goes to its quadrant.
pub fn picksplit(entries: &[Span]) -> Option<(Span, Vec<u8>)> {
    if entries.is_empty() {
        return None;
    }
    let mut lowers: Vec<&Datum> = entries.iter().map(|s| &s.lower).collect();
    let mut uppers: Vec<&Datum> = entries.iter().map(|s| &s.upper).collect();
    let datum_cmp =
        |a: &&Datum, b: &&Datum| a.cmp(b).unwrap_or(Ordering::Equal);
    lowers.sort_by(datum_cmp);
    uppers.sort_by(datum_cmp);

    let median_lower = lowers[lowers.len() / 2].clone();
    let median_upper = uppers[uppers.len() / 2].clone();
    // The medians may be inverted for span-shaped data; widen to a
    // valid centroid in that case.
    let centroid = Span::new(median_lower.clone(), median_upper.clone(), true, true)
        .or_else(|_| Span::new(median_upper, median_lower, true, true))
        .ok()?;

    let quadrants = entries
        .iter()
        .map(|entry| quadrant_of(&centroid, entry))
        .collect();
    Some((centroid, quadrants))
}

/// Leaf test: the exact predicate of the strategy.
pub fn leaf_consistent(key: &Span, query: &Span, strategy: Strategy) -> TemporalResult<Consistent> {
    span_leaf_consistent(key, query, strategy)
}

/*************************** box quadtrees ***************************/

/// One axis of a box quadtree traversal value: the interval where the
/// subtree minima can lie and the interval where the maxima can lie.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisNode {
    pub min: (f64, f64),
    pub max: (f64, f64),
}

impl AxisNode {
    fn unbounded() -> Self {
        Self {
            min: (f64::NEG_INFINITY, f64::INFINITY),
            max: (f64::NEG_INFINITY, f64::INFINITY),
        }
    }

    fn next(&self, centroid: (f64, f64), bits: u8) -> Self {
        let mut next = *self;
        if bits & 0x2 != 0 {
            next.min.0 = centroid.0;
        } else {
            next.min.1 = centroid.0;
        }
        if bits & 0x1 != 0 {
            next.max.0 = centroid.1;
        } else {
            next.max.1 = centroid.1;
        }
        next
    }

    /// The widest interval any subtree member can cover on this axis.
    fn extent(&self) -> (f64, f64) {
        (self.min.0, self.max.1)
    }
}

/// Traversal value of a quadtree over N-axis boxes (4-D for TBox, 6-D or
/// 8-D for STBox): one [`AxisNode`] per axis, refined quadrant by
/// quadrant. The quadrant number carries two bits per axis.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxNode {
    axes: Vec<AxisNode>,
}

impl BoxNode {
    pub fn unbounded(num_axes: usize) -> Self {
        Self {
            axes: vec![AxisNode::unbounded(); num_axes],
        }
    }

    pub fn num_axes(&self) -> usize {
        self.axes.len()
    }

    /// Quadrant of `entry` relative to `centroid`: per axis, bit 1 when
    /// the entry minimum is greater, bit 0 when its maximum is greater.
    pub fn quadrant(centroid: &[(f64, f64)], entry: &[(f64, f64)]) -> u16 {
        let mut quadrant = 0u16;
        for (axis, (c, e)) in centroid.iter().zip(entry).enumerate() {
            let mut bits = 0u16;
            if e.0 > c.0 {
                bits |= 0x2;
            }
            if e.1 > c.1 {
                bits |= 0x1;
            }
            quadrant |= bits << (2 * axis);
        }
        quadrant
    }

    pub fn quadtree_next(&self, centroid: &[(f64, f64)], quadrant: u16) -> Self {
        let axes = self
            .axes
            .iter()
            .enumerate()
            .map(|(axis, node)| {
                node.next(centroid[axis], ((quadrant >> (2 * axis)) & 0x3) as u8)
            })
            .collect();
        Self { axes }
    }

    pub fn may_overlap(&self, query: &[(f64, f64)]) -> bool {
        self.axes.iter().zip(query).all(|(node, q)| {
            let extent = node.extent();
            extent.0 <= q.1 && q.0 <= extent.1
        })
    }

    pub fn may_contain(&self, query: &[(f64, f64)]) -> bool {
        self.axes.iter().zip(query).all(|(node, q)| {
            let extent = node.extent();
            extent.0 <= q.0 && extent.1 >= q.1
        })
    }

    /// Can some member lie strictly before the query on `axis`?
    pub fn may_be_left(&self, axis: usize, query: (f64, f64)) -> bool {
        // The smallest possible maximum decides.
        self.axes[axis].max.0 < query.0
    }

    pub fn may_be_overleft(&self, axis: usize, query: (f64, f64)) -> bool {
        self.axes[axis].max.0 <= query.1
    }

    pub fn may_be_right(&self, axis: usize, query: (f64, f64)) -> bool {
        self.axes[axis].min.1 > query.1
    }

    pub fn may_be_overright(&self, axis: usize, query: (f64, f64)) -> bool {
        self.axes[axis].min.1 >= query.0
    }

    /// Euclidean lower bound on the distance from the query box to any
    /// subtree member, for nearest-first traversal.
    pub fn distance_lower_bound(&self, query: &[(f64, f64)]) -> f64 {
        let mut sum = 0.0;
        for (node, q) in self.axes.iter().zip(query) {
            let extent = node.extent();
            let gap = if extent.1 < q.0 {
                q.0 - extent.1
            } else if q.1 < extent.0 {
                extent.0 - q.1
            } else {
                0.0
            };
            sum += gap * gap;
        }
        sum.sqrt()
    }
}

/// Centroid (per-axis medians of minima and maxima) and quadrant
/// assignment for a page of boxes.
pub fn picksplit_boxes(entries: &[Vec<(f64, f64)>]) -> Option<(Vec<(f64, f64)>, Vec<u16>)> {
    let first = entries.first()?;
    let num_axes = first.len();
    let mut centroid = Vec::with_capacity(num_axes);
    for axis in 0..num_axes {
        let mut mins: Vec<f64> = entries.iter().map(|e| e[axis].0).collect();
        let mut maxs: Vec<f64> = entries.iter().map(|e| e[axis].1).collect();
        mins.sort_by(f64::total_cmp);
        maxs.sort_by(f64::total_cmp);
        centroid.push((mins[mins.len() / 2], maxs[maxs.len() / 2]));
    }
    let quadrants = entries
        .iter()
        .map(|entry| BoxNode::quadrant(&centroid, entry))
        .collect();
    Some((centroid, quadrants))
}

fn span_axis(span: &Span) -> (f64, f64) {
    let lo = span.lower.as_number().unwrap_or_else(|| {
        span.lower
            .as_timestamp()
            .map(|t| t.micros() as f64 / 1e6)
            .unwrap_or(0.0)
    });
    let hi = span.upper.as_number().unwrap_or_else(|| {
        span.upper
            .as_timestamp()
            .map(|t| t.micros() as f64 / 1e6)
            .unwrap_or(0.0)
    });
    (lo, hi)
}

/// Axis extraction for TBox keys: the value axis, then time in seconds.
pub fn tbox_axes(tbox: &TBox) -> Vec<(f64, f64)> {
    let mut axes = Vec::with_capacity(2);
    if let Some(span) = tbox.x() {
        axes.push(span_axis(span));
    }
    if let Some(period) = tbox.t() {
        axes.push(span_axis(period));
    }
    axes
}

/// Axis extraction for STBox keys: x, y, optional z, then time in
/// seconds.
pub fn stbox_axes(stbox: &STBox) -> Vec<(f64, f64)> {
    let mut axes = Vec::with_capacity(4);
    if let Some(dims) = stbox.space() {
        axes.push((dims.xmin, dims.xmax));
        axes.push((dims.ymin, dims.ymax));
        if let Some(z) = dims.z {
            axes.push(z);
        }
    }
    if let Some(period) = stbox.t() {
        axes.push(span_axis(period));
    }
    axes
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn fspan(lo: f64, hi: f64) -> Span {
        Span::float(lo, hi, true, true).unwrap()
    }

    #[test]
    fn quadrant_routing_scenario() {
        // Centroid [10, 20]; entry [5, 25]: lower-less, upper-greater.
        let centroid = fspan(10.0, 20.0);
        assert_eq!(quadrant_of(&centroid, &fspan(5.0, 25.0)), 1);
        assert_eq!(quadrant_of(&centroid, &fspan(12.0, 25.0)), 3);
        assert_eq!(quadrant_of(&centroid, &fspan(5.0, 15.0)), 0);
        assert_eq!(quadrant_of(&centroid, &fspan(12.0, 15.0)), 2);
        assert_eq!(quadrant_of(&centroid, &centroid), 0);
    }

    #[test]
    fn picksplit_uses_bound_medians() {
        let entries = [
            fspan(0.0, 1.0),
            fspan(2.0, 3.0),
            fspan(4.0, 5.0),
            fspan(6.0, 7.0),
            fspan(8.0, 9.0),
        ];
        let (centroid, quadrants) = picksplit(&entries).unwrap();
        assert_eq!(centroid, fspan(4.0, 5.0));
        assert_eq!(quadrants, vec![0, 0, 0, 3, 3]);
    }

    #[test]
    fn traversal_refinement_narrows_the_extent() {
        let root = SpanNode::unbounded(BaseType::Float).unwrap();
        let centroid = fspan(10.0, 20.0);

        // Quadrant 3: lower > 10, upper > 20.
        let q3 = root.quadtree_next(&centroid, 3);
        assert_eq!(q3.left.lower, Datum::Float(10.0));
        assert_eq!(q3.right.lower, Datum::Float(20.0));

        // Nothing in quadrant 3 can be strictly left of [0, 5].
        assert!(!q3.may_contain_matches(&fspan(0.0, 5.0), Strategy::Left));
        assert!(q3.may_contain_matches(&fspan(30.0, 40.0), Strategy::Overlaps));

        // Quadrant 0: lower <= 10, upper <= 20.
        let q0 = root.quadtree_next(&centroid, 0);
        assert!(q0.may_contain_matches(&fspan(0.0, 5.0), Strategy::Overlaps));
    }

    #[test]
    fn distance_ordering_lower_bound() {
        let root = SpanNode::unbounded(BaseType::Float).unwrap();
        let centroid = fspan(10.0, 20.0);
        let q3 = root.quadtree_next(&centroid, 3);
        // Everything in quadrant 3 starts after 10.
        assert_eq!(q3.distance_lower_bound(&fspan(0.0, 4.0)), 6.0);
        assert_eq!(q3.distance_lower_bound(&fspan(15.0, 16.0)), 0.0);
    }

    #[test]
    fn box_quadrants_pack_two_bits_per_axis() {
        let centroid = vec![(0.0, 10.0), (100.0, 200.0)];
        // Greater minimum and maximum on both axes.
        let entry = vec![(5.0, 20.0), (150.0, 300.0)];
        assert_eq!(BoxNode::quadrant(&centroid, &entry), 0b1111);
        // Below on the first axis, straddling on the second.
        let entry = vec![(-5.0, 5.0), (50.0, 300.0)];
        assert_eq!(BoxNode::quadrant(&centroid, &entry), 0b0100);
    }

    #[test]
    fn box_node_refinement_prunes() {
        let centroid = vec![(0.0, 10.0), (0.0, 10.0)];
        let root = BoxNode::unbounded(2);
        // All-greater quadrant: minima above (0, 0).
        let q = BoxNode::quadrant(&centroid, &[(5.0, 20.0), (5.0, 20.0)]);
        let node = root.quadtree_next(&centroid, q);

        assert!(node.may_overlap(&[(50.0, 60.0), (50.0, 60.0)]));
        // Nothing in this quadrant can lie strictly before x = -5.
        assert!(!node.may_be_left(0, (-10.0, -5.0)));
        assert!(node.may_be_right(0, (-10.0, -5.0)));
        assert_eq!(node.distance_lower_bound(&[(-4.0, -3.0), (0.0, 1.0)]), 3.0);
    }

    #[test]
    fn tbox_axes_project_value_and_time() {
        use tempora_core::timestamp::TsDuration;
        let ts = |s: &str| TimestampTz::parse(s).unwrap();
        let tbox = TBox::new(
            Some(fspan(1.0, 2.0)),
            Some(
                Span::period(ts("2000-01-01 00:00:00+00"), ts("2000-01-01 00:00:10+00"), true, true)
                    .unwrap(),
            ),
        )
        .unwrap();
        let axes = tbox_axes(&tbox);
        assert_eq!(axes.len(), 2);
        assert_eq!(axes[0], (1.0, 2.0));
        assert_eq!(axes[1].1 - axes[1].0, TsDuration::from_seconds(10).micros() as f64 / 1e6);

        let (centroid, quadrants) = picksplit_boxes(&[axes.clone(), axes]).unwrap();
        assert_eq!(centroid.len(), 2);
        assert_eq!(quadrants, vec![0, 0]);
    }
}
