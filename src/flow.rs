use serde::Serialize;

use crate::aggregate::{Accumulator, FlowSums};
use crate::sanitize::{sanitize, Number};

/// A finalized corridor: one accumulator, rounded for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Flow {
    pub from: String,
    pub to: String,
    pub wtw: Number,
    pub ttw: Number,
    pub wtt: Number,
    pub food_miles: Number,
    pub cost: Number,
    /// Source rows folded into the corridor.
    pub n_commodities: u64,
    pub dominant_mode: String,
}

impl Flow {
    pub fn finalize(
        origin: &str,
        destination: &str,
        acc: &Accumulator<FlowSums>,
        dominant_mode: &str,
    ) -> Self {
        let s = &acc.sums;
        Self {
            from: origin.to_string(),
            to: destination.to_string(),
            wtw: sanitize(s.wtw, Some(1)),
            ttw: sanitize(s.ttw, Some(1)),
            wtt: sanitize(s.wtt, Some(1)),
            food_miles: sanitize(s.food_miles, Some(0)),
            cost: sanitize(s.cost, Some(1)),
            n_commodities: acc.count,
            dominant_mode: dominant_mode.to_string(),
        }
    }

    /// Ranking measure for top-N selection.
    pub fn rank(&self) -> f64 {
        self.ttw.as_f64()
    }
}
