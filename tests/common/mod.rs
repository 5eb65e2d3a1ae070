#![allow(dead_code)]

use std::{collections::BTreeMap, convert::Infallible, path::Path};

use futures::{stream, Stream};

/// Walks keys through `0..key_range` and values through `0..value_range`,
/// stepping by the given jumps after every pair.
pub fn incremental(
    nr_pairs: usize,
    key_range: u64,
    value_range: u64,
    key_jump: u64,
    value_jump: u64,
) -> Vec<(u64, u64)> {
    let (mut key, mut value) = (0, 0);
    let mut entries = Vec::with_capacity(nr_pairs);
    for _ in 0..nr_pairs {
        entries.push((key, value));
        key = (key + key_jump) % key_range;
        value = (value + value_jump) % value_range;
    }
    entries
}

pub fn random_entries(rng: &mut fastrand::Rng, nr_pairs: usize, key_range: u64) -> Vec<(u64, u64)> {
    (0..nr_pairs)
        .map(|_| (rng.u64(0..key_range), rng.u64(..)))
        .collect()
}

pub fn input<K, V>(entries: Vec<(K, V)>) -> impl Stream<Item = Result<(K, V), Infallible>> + Send
where
    K: Send,
    V: Send,
{
    stream::iter(entries.into_iter().map(Ok))
}

/// Groups in ascending key order, values in arrival order.
pub fn expected<K, V>(entries: Vec<(K, V)>) -> Vec<(K, Vec<V>)>
where
    K: Ord,
{
    let mut groups = BTreeMap::<K, Vec<V>>::new();
    for (key, value) in entries {
        groups.entry(key).or_default().push(value);
    }
    groups.into_iter().collect()
}

pub fn dir_entries(path: &Path) -> usize {
    match std::fs::read_dir(path) {
        Ok(dir) => dir.count(),
        Err(_) => 0,
    }
}
