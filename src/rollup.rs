use std::hash::Hash;

use crate::aggregate::{Aggregator, CorridorKey, FlowSums, ModeFlowKey, Sums};

/// Second-level aggregation over finalized accumulators.
///
/// `split` maps each source key to its category-independent prefix and its
/// category label; every accumulator sharing a prefix is summed into one, and
/// `ranking` of each source accumulator is credited to its category so the
/// result can still name a dominant category. Sources are visited in key
/// order.
pub fn rollup<K, P, S>(
    source: &Aggregator<K, S>,
    split: impl Fn(&K) -> (P, &str),
    ranking: impl Fn(&S) -> f64,
) -> Aggregator<P, S>
where
    K: Eq + Hash + Ord,
    P: Eq + Hash,
    S: Sums,
{
    let mut out = Aggregator::new();
    for (key, acc) in source.sorted() {
        let (prefix, category) = split(key);
        out.absorb_as(prefix, acc, category, ranking(&acc.sums));
    }
    out
}

/// Collapse per-mode corridors into one "all modes" corridor per year,
/// ranked by TTW.
pub fn across_modes(
    per_mode: &Aggregator<ModeFlowKey, FlowSums>,
) -> Aggregator<CorridorKey, FlowSums> {
    rollup(
        per_mode,
        |k: &ModeFlowKey| {
            (
                CorridorKey {
                    year: k.year,
                    origin: k.origin.clone(),
                    destination: k.destination.clone(),
                },
                k.mode.as_str(),
            )
        },
        |s| s.ttw,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode_key(mode: &str) -> ModeFlowKey {
        ModeFlowKey {
            year: 2022,
            mode: mode.to_string(),
            origin: "USA".to_string(),
            destination: "DEU".to_string(),
        }
    }

    fn corridor() -> CorridorKey {
        CorridorKey {
            year: 2022,
            origin: "USA".to_string(),
            destination: "DEU".to_string(),
        }
    }

    fn sums(ttw: f64, cost: f64) -> FlowSums {
        FlowSums {
            ttw,
            cost,
            ..FlowSums::default()
        }
    }

    #[test]
    fn totals_and_dominant_mode() {
        let mut per_mode = Aggregator::new();
        per_mode.accumulate(mode_key("air"), &sums(3.0, 1.0));
        per_mode.accumulate(mode_key("sea"), &sums(7.0, 2.0));

        let all = across_modes(&per_mode);
        assert_eq!(all.len(), 1);
        let acc = all.get(&corridor()).unwrap();
        assert_eq!(acc.sums.ttw, 10.0);
        assert_eq!(acc.sums.cost, 3.0);
        assert_eq!(acc.count, 2);
        assert_eq!(acc.dominant(), "sea");

        let breakdown = acc.breakdown().unwrap();
        assert_eq!(breakdown.get("air"), Some(3.0));
        assert_eq!(breakdown.get("sea"), Some(7.0));
    }

    #[test]
    fn counts_carry_over_from_source_rows() {
        let mut per_mode = Aggregator::new();
        per_mode.accumulate(mode_key("air"), &sums(5.0, 0.0));
        per_mode.accumulate(mode_key("air"), &sums(3.0, 0.0));
        per_mode.accumulate(mode_key("sea"), &sums(100.0, 0.0));

        let all = across_modes(&per_mode);
        let acc = all.get(&corridor()).unwrap();
        assert_eq!(acc.count, 3);
        assert_eq!(acc.sums.ttw, 108.0);
        assert_eq!(acc.dominant(), "sea");
        assert_eq!(all.rows(), 3);
    }

    #[test]
    fn distinct_years_stay_apart() {
        let mut per_mode = Aggregator::new();
        per_mode.accumulate(mode_key("air"), &sums(1.0, 0.0));
        let mut later = mode_key("air");
        later.year = 2023;
        per_mode.accumulate(later, &sums(2.0, 0.0));

        assert_eq!(across_modes(&per_mode).len(), 2);
    }
}
