//! The aggregation state container: a skiplist ordered by time, holding
//! either instants or whole sequences. Promotion is deterministic (the
//! tower height of the n-th insertion follows the binary carry sequence),
//! so a state built from the same chunks always has the same shape.

use tempora_core::temporal::{TInstant, TSequence, TemporalOps};
use tempora_core::timestamp::TimestampTz;

const MAX_HEIGHT: usize = 12;

/// One aggregated chunk: a lone instant or a sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum AggChunk {
    Instant(TInstant),
    Sequence(TSequence),
}

impl AggChunk {
    /// The ordering key: the instant's timestamp or the sequence's start.
    pub fn key(&self) -> TimestampTz {
        match self {
            Self::Instant(inst) => inst.timestamp(),
            Self::Sequence(seq) => seq.start_timestamp(),
        }
    }

    pub fn end_key(&self) -> TimestampTz {
        match self {
            Self::Instant(inst) => inst.timestamp(),
            Self::Sequence(seq) => seq.end_timestamp(),
        }
    }
}

struct Node {
    value: AggChunk,
    /// `next[level]` indexes into the arena; `usize::MAX` is nil.
    next: Vec<usize>,
}

const NIL: usize = usize::MAX;

/// An order-preserving skiplist over aggregation chunks.
///
/// The cursor surface is deliberately small: [`SkipList::locate`] finds
/// the insertion window, [`SkipList::splice`] replaces a contiguous run,
/// and [`SkipList::iter`] walks the chunks in time order.
pub struct SkipList {
    arena: Vec<Option<Node>>,
    /// Head tower; heads[level] is the first node at that level.
    heads: Vec<usize>,
    free: Vec<usize>,
    inserted: u64,
    len: usize,
}

impl std::fmt::Debug for SkipList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkipList")
            .field("len", &self.len)
            .field("height", &self.heads.len())
            .finish()
    }
}

impl Default for SkipList {
    fn default() -> Self {
        Self::new()
    }
}

impl SkipList {
    pub fn new() -> Self {
        Self {
            arena: Vec::new(),
            heads: vec![NIL],
            free: Vec::new(),
            inserted: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Deterministic geometric promotion: the n-th insertion gets a tower
    /// one taller than the number of trailing zeros of n, capped.
    fn next_height(&mut self) -> usize {
        self.inserted += 1;
        let height = self.inserted.trailing_zeros() as usize + 1;
        height.min(MAX_HEIGHT)
    }

    fn node(&self, idx: usize) -> &Node {
        self.arena[idx].as_ref().unwrap()
    }

    /// For each level, the last node whose key is strictly below `key`
    /// (`NIL` when the level has none).
    fn predecessors(&self, key: TimestampTz) -> Vec<usize> {
        let mut preds = vec![NIL; self.heads.len()];
        let mut current = NIL;
        for level in (0..self.heads.len()).rev() {
            let mut next = match current {
                NIL => self.heads[level],
                idx => self.node(idx).next[level],
            };
            while next != NIL && self.node(next).value.key() < key {
                current = next;
                next = self.node(next).next[level];
            }
            preds[level] = current;
        }
        preds
    }

    /// Index of the first chunk whose end reaches `key`, i.e. the start of
    /// the window that could interact with a chunk starting at `key`.
    pub fn locate(&self, key: TimestampTz) -> usize {
        let mut position = 0;
        for chunk in self.iter() {
            if chunk.end_key() >= key {
                break;
            }
            position += 1;
        }
        position
    }

    pub fn insert(&mut self, value: AggChunk) {
        let key = value.key();
        let height = self.next_height();
        while self.heads.len() < height {
            self.heads.push(NIL);
        }
        let preds = self.predecessors(key);

        let idx = match self.free.pop() {
            Some(idx) => idx,
            None => {
                self.arena.push(None);
                self.arena.len() - 1
            }
        };
        let mut next = vec![NIL; height];
        for level in 0..height {
            let pred = preds.get(level).copied().unwrap_or(NIL);
            if pred == NIL {
                next[level] = self.heads[level];
                self.heads[level] = idx;
            } else {
                next[level] = self.node(pred).next[level];
                self.arena[pred].as_mut().unwrap().next[level] = idx;
            }
        }
        self.arena[idx] = Some(Node { value, next });
        self.len += 1;
    }

    fn remove(&mut self, idx: usize) {
        let key = self.node(idx).value.key();
        let preds = self.predecessors(key);
        for level in 0..self.heads.len() {
            // The predecessor chain may point at an equal-keyed sibling;
            // walk forward until the target is the immediate next.
            let mut pred = preds.get(level).copied().unwrap_or(NIL);
            loop {
                let next = match pred {
                    NIL => self.heads[level],
                    p => self.node(p).next[level],
                };
                if next == idx {
                    let skip = self.node(idx).next.get(level).copied().unwrap_or(NIL);
                    match pred {
                        NIL => self.heads[level] = skip,
                        p => self.arena[p].as_mut().unwrap().next[level] = skip,
                    }
                    break;
                }
                if next == NIL || self.node(next).value.key() > key {
                    break;
                }
                pred = next;
            }
        }
        self.arena[idx] = None;
        self.free.push(idx);
        self.len -= 1;
    }

    /// Replace the `count` chunks starting at position `start` (in time
    /// order) with `replacement`.
    pub fn splice(&mut self, start: usize, count: usize, replacement: Vec<AggChunk>) {
        let doomed: Vec<usize> = self
            .indices()
            .skip(start)
            .take(count)
            .collect();
        for idx in doomed {
            self.remove(idx);
        }
        for chunk in replacement {
            self.insert(chunk);
        }
    }

    fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        let mut current = self.heads.first().copied().unwrap_or(NIL);
        std::iter::from_fn(move || {
            if current == NIL {
                return None;
            }
            let idx = current;
            current = self.node(idx).next[0];
            Some(idx)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &AggChunk> + '_ {
        self.indices().map(|idx| &self.node(idx).value)
    }

    pub fn into_values(self) -> Vec<AggChunk> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use tempora_core::timestamp::TimestampTz;

    fn inst(v: f64, micros: i64) -> AggChunk {
        AggChunk::Instant(TInstant::tfloat(v, TimestampTz::from_micros(micros)))
    }

    fn keys(list: &SkipList) -> Vec<i64> {
        list.iter().map(|c| c.key().micros()).collect()
    }

    #[test]
    fn insertion_keeps_time_order() {
        let mut list = SkipList::new();
        for micros in [50, 10, 30, 20, 40] {
            list.insert(inst(0.0, micros));
        }
        assert_eq!(keys(&list), vec![10, 20, 30, 40, 50]);
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn deterministic_shape() {
        let build = || {
            let mut list = SkipList::new();
            for micros in [5, 1, 4, 2, 3] {
                list.insert(inst(0.0, micros));
            }
            list.heads.clone()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn locate_finds_the_window_start() {
        let mut list = SkipList::new();
        for micros in [10, 20, 30] {
            list.insert(inst(0.0, micros));
        }
        assert_eq!(list.locate(TimestampTz::from_micros(15)), 1);
        assert_eq!(list.locate(TimestampTz::from_micros(10)), 0);
        assert_eq!(list.locate(TimestampTz::from_micros(35)), 3);
    }

    #[test]
    fn splice_replaces_a_window() {
        let mut list = SkipList::new();
        for micros in [10, 20, 30, 40] {
            list.insert(inst(0.0, micros));
        }
        list.splice(1, 2, vec![inst(1.0, 22), inst(1.0, 25), inst(1.0, 28)]);
        assert_eq!(keys(&list), vec![10, 22, 25, 28, 40]);

        // Nodes from the free list are reused without corrupting order.
        list.splice(0, 1, vec![inst(2.0, 5)]);
        assert_eq!(keys(&list), vec![5, 22, 25, 28, 40]);
    }
}
