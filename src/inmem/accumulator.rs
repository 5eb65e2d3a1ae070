use std::collections::HashMap;

use crate::record::Key;

/// In-memory grouping of the entries seen since the last spill.
///
/// The capacity counts entries, not distinct keys, so a single hot key cannot
/// grow the accumulator past its bound.
pub(crate) struct Accumulator<K, V> {
    data: HashMap<K, Vec<V>>,
    len: usize,
    capacity: usize,
}

impl<K, V> Accumulator<K, V>
where
    K: Key,
{
    pub(crate) fn new(capacity: usize) -> Self {
        Accumulator {
            data: HashMap::new(),
            len: 0,
            capacity,
        }
    }

    pub(crate) fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
    }

    pub(crate) fn offer(&mut self, key: K, value: V) {
        self.data.entry(key).or_default().push(value);
        self.len += 1;
    }

    pub(crate) fn is_full(&self) -> bool {
        self.len >= self.capacity
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Takes every group out in ascending key order and leaves the
    /// accumulator empty.
    pub(crate) fn drain_sorted(&mut self) -> Vec<(K, Vec<V>)> {
        self.len = 0;
        let mut groups = self.data.drain().collect::<Vec<_>>();
        groups.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::Accumulator;

    #[test]
    fn test_offer_and_drain() {
        let mut accumulator = Accumulator::new(4);
        assert!(accumulator.is_empty());

        accumulator.offer(3_u64, "x");
        accumulator.offer(1_u64, "y");
        accumulator.offer(3_u64, "z");
        assert_eq!(accumulator.len(), 3);
        assert!(!accumulator.is_full());

        accumulator.offer(2_u64, "w");
        assert!(accumulator.is_full());

        let groups = accumulator.drain_sorted();
        assert_eq!(groups, vec![(1, vec!["y"]), (2, vec!["w"]), (3, vec!["x", "z"])]);
        assert!(accumulator.is_empty());
        assert!(!accumulator.is_full());
    }

    #[test]
    fn test_capacity_counts_entries() {
        let mut accumulator = Accumulator::new(2);
        accumulator.offer(7_u64, 1_u64);
        accumulator.offer(7_u64, 2_u64);

        assert!(accumulator.is_full());
    }
}
