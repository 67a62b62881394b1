//! Keyed running totals.
//!
//! An [`Aggregator`] maps a composite key to an [`Accumulator`] holding a
//! fixed-shape set of sums plus a row count. Batches are folded in arrival
//! order; a key may reappear in any later batch. The map is never bounded: for
//! the bilateral flow series it is the dominant memory consumer, roughly one
//! entry per (year, category, origin, destination) present in the data.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use crate::breakdown::CategoryBreakdown;
use crate::schema::labels;

/// A fixed set of summable measures.
pub trait Sums: Default + Clone {
    fn absorb(&mut self, other: &Self);
}

/// Measures carried by every bilateral flow record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlowSums {
    pub wtw: f64,
    pub ttw: f64,
    pub wtt: f64,
    pub food_miles: f64,
    pub cost: f64,
}

impl Sums for FlowSums {
    fn absorb(&mut self, other: &Self) {
        self.wtw += other.wtw;
        self.ttw += other.ttw;
        self.wtt += other.wtt;
        self.food_miles += other.food_miles;
        self.cost += other.cost;
    }
}

/// Per-route intensity measures from the transport-factor files.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FactorSums {
    pub wtw: f64,
    pub ttw: f64,
    pub distance: f64,
}

impl Sums for FactorSums {
    fn absorb(&mut self, other: &Self) {
        self.wtw += other.wtw;
        self.ttw += other.ttw;
        self.distance += other.distance;
    }
}

// ── Composite keys ──────────────────────────────────────────────────────────

/// (year, mode, origin, destination)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModeFlowKey {
    pub year: i32,
    pub mode: String,
    pub origin: String,
    pub destination: String,
}

/// (commodity, year, origin, destination)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommodityFlowKey {
    pub commodity: String,
    pub year: i32,
    pub origin: String,
    pub destination: String,
}

/// (year, origin, destination): the mode-independent prefix used by the rollup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorridorKey {
    pub year: i32,
    pub origin: String,
    pub destination: String,
}

/// (commodity, mode) for transport-factor averages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactorKey {
    pub commodity: String,
    pub mode: String,
}

// ── Accumulator ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Accumulator<S> {
    pub sums: S,
    pub count: u64,
    breakdown: Option<CategoryBreakdown>,
}

impl<S: Sums> Accumulator<S> {
    pub fn add(&mut self, sums: &S) {
        self.sums.absorb(sums);
        self.count += 1;
    }

    pub fn record_category(&mut self, category: &str, value: f64) {
        self.breakdown
            .get_or_insert_with(CategoryBreakdown::new)
            .add(category, value);
    }

    pub fn breakdown(&self) -> Option<&CategoryBreakdown> {
        self.breakdown.as_ref()
    }

    /// Dominant category, `"unknown"` when none was ever recorded.
    pub fn dominant(&self) -> &str {
        match &self.breakdown {
            Some(b) => b.dominant(),
            None => labels::UNKNOWN_MODE,
        }
    }

    pub fn mean(&self, pick: impl Fn(&S) -> f64) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(pick(&self.sums) / self.count as f64)
    }
}

// ── Aggregator ──────────────────────────────────────────────────────────────

pub struct Aggregator<K, S> {
    groups: HashMap<K, Accumulator<S>>,
    rows: u64,
}

impl<K: Eq + Hash, S: Sums> Default for Aggregator<K, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, S: Sums> Aggregator<K, S> {
    pub fn new() -> Self {
        Self {
            groups: HashMap::new(),
            rows: 0,
        }
    }

    fn slot(&mut self, key: K) -> &mut Accumulator<S> {
        match self.groups.entry(key) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(Accumulator::default()),
        }
    }

    /// Add one row's measures under `key`.
    pub fn accumulate(&mut self, key: K, sums: &S) {
        self.rows += 1;
        self.slot(key).add(sums);
    }

    /// Add one row and credit `ranking` to `category` in the key's breakdown.
    pub fn accumulate_with_category(&mut self, key: K, sums: &S, category: &str, ranking: f64) {
        self.rows += 1;
        let acc = self.slot(key);
        acc.add(sums);
        acc.record_category(category, ranking);
    }

    /// Fold a finalized accumulator from another aggregation under `key`,
    /// crediting `ranking` to `category`. Rows carry over with it.
    pub fn absorb_as(&mut self, key: K, other: &Accumulator<S>, category: &str, ranking: f64) {
        self.rows += other.count;
        let acc = self.slot(key);
        acc.sums.absorb(&other.sums);
        acc.count += other.count;
        acc.record_category(category, ranking);
    }

    pub fn get(&self, key: &K) -> Option<&Accumulator<S>> {
        self.groups.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &Accumulator<S>)> {
        self.groups.iter()
    }

    /// Groups in key order, so ties downstream resolve the same way every run.
    pub fn sorted(&self) -> Vec<(&K, &Accumulator<S>)>
    where
        K: Ord,
    {
        let mut groups: Vec<_> = self.groups.iter().collect();
        groups.sort_by(|a, b| a.0.cmp(b.0));
        groups
    }

    /// Distinct keys seen so far.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Rows folded in so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(year: i32, mode: &str) -> ModeFlowKey {
        ModeFlowKey {
            year,
            mode: mode.to_string(),
            origin: "USA".to_string(),
            destination: "DEU".to_string(),
        }
    }

    fn ttw(v: f64) -> FlowSums {
        FlowSums {
            ttw: v,
            wtw: v * 2.0,
            ..FlowSums::default()
        }
    }

    #[test]
    fn repeated_keys_accumulate() {
        let mut agg = Aggregator::new();
        agg.accumulate(key(2022, "air"), &ttw(5.0));
        agg.accumulate(key(2022, "sea"), &ttw(100.0));
        agg.accumulate(key(2022, "air"), &ttw(3.0));

        assert_eq!(agg.len(), 2);
        assert_eq!(agg.rows(), 3);
        let air = agg.get(&key(2022, "air")).unwrap();
        assert_eq!(air.sums.ttw, 8.0);
        assert_eq!(air.sums.wtw, 16.0);
        assert_eq!(air.count, 2);
    }

    #[test]
    fn chunk_boundaries_do_not_change_totals() {
        let values: Vec<(i32, &str, f64)> = (0..97)
            .map(|i| {
                let mode = ["air", "sea", "land"][i % 3];
                (2020 + (i % 4) as i32, mode, 0.1 * i as f64 + 1.0 / 3.0)
            })
            .collect();

        let fold = |chunk: usize| {
            let mut agg = Aggregator::new();
            for batch in values.chunks(chunk) {
                for (year, mode, v) in batch {
                    agg.accumulate(key(*year, mode), &ttw(*v));
                }
            }
            agg
        };

        let whole = fold(values.len());
        for chunk in [1, 7, 32] {
            let split = fold(chunk);
            assert_eq!(split.len(), whole.len());
            for (k, acc) in whole.iter() {
                let other = split.get(k).unwrap();
                assert_eq!(other.count, acc.count);
                assert!((other.sums.ttw - acc.sums.ttw).abs() < 1e-9);
                assert!((other.sums.wtw - acc.sums.wtw).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn category_breakdown_tracks_ranking_measure() {
        let mut agg = Aggregator::new();
        let k = CommodityFlowKey {
            commodity: "Wheat".to_string(),
            year: 2021,
            origin: "FRA".to_string(),
            destination: "EGY".to_string(),
        };
        agg.accumulate_with_category(k.clone(), &ttw(4.0), "maritime", 4.0);
        agg.accumulate_with_category(k.clone(), &ttw(1.0), "land", 1.0);
        agg.accumulate_with_category(k.clone(), &ttw(2.0), "land", 2.0);

        let acc = agg.get(&k).unwrap();
        assert_eq!(acc.count, 3);
        assert_eq!(acc.sums.ttw, 7.0);
        assert_eq!(acc.dominant(), "maritime");
    }

    #[test]
    fn accumulator_without_breakdown_is_unknown() {
        let acc: Accumulator<FlowSums> = Accumulator::default();
        assert_eq!(acc.dominant(), "unknown");
        assert_eq!(acc.mean(|s| s.ttw), None);
    }

    #[test]
    fn factor_means() {
        let mut agg = Aggregator::new();
        let k = FactorKey {
            commodity: "Rice".to_string(),
            mode: "air".to_string(),
        };
        for (w, d) in [(10.0, 100.0), (20.0, 300.0)] {
            agg.accumulate(
                k.clone(),
                &FactorSums {
                    wtw: w,
                    ttw: w / 2.0,
                    distance: d,
                },
            );
        }
        let acc = agg.get(&k).unwrap();
        assert_eq!(acc.mean(|s| s.wtw), Some(15.0));
        assert_eq!(acc.mean(|s| s.distance), Some(200.0));
    }
}
