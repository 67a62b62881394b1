use std::collections::BTreeMap;

/// Sort `items` by `rank` descending and keep the first `n`.
///
/// The sort is stable: equal ranks keep their input order.
pub fn top_n<T>(mut items: Vec<T>, n: usize, rank: impl Fn(&T) -> f64) -> Vec<T> {
    items.sort_by(|a, b| rank(b).total_cmp(&rank(a)));
    items.truncate(n);
    items
}

/// Named buckets that each get their own top-N cut.
#[derive(Debug)]
pub struct Partitions<P, T> {
    buckets: BTreeMap<P, Vec<T>>,
}

impl<P: Ord, T> Default for Partitions<P, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Ord, T> Partitions<P, T> {
    pub fn new() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, partition: P, item: T) {
        self.buckets.entry(partition).or_default().push(item);
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Sort and truncate every bucket, consuming the partitions.
    pub fn select(self, n: usize, rank: impl Fn(&T) -> f64) -> BTreeMap<P, Vec<T>> {
        self.buckets
            .into_iter()
            .map(|(partition, items)| (partition, top_n(items, n, &rank)))
            .collect()
    }
}
