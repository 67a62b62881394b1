use crate::schema::labels;

/// Per-group running sums of one ranking measure, split by category label.
///
/// Groups see a handful of categories at most (transport modes), so a small
/// vector beats a map here and keeps first-recorded order for free.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryBreakdown {
    entries: Vec<(String, f64)>,
}

impl CategoryBreakdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, category: &str, value: f64) {
        match self.entries.iter_mut().find(|(label, _)| label == category) {
            Some((_, sum)) => *sum += value,
            None => self.entries.push((category.to_string(), value)),
        }
    }

    /// Label with the largest sum. Exact ties keep the first-recorded label.
    /// An empty breakdown resolves to `"unknown"`.
    pub fn dominant(&self) -> &str {
        let mut best: Option<&(String, f64)> = None;
        for entry in &self.entries {
            match best {
                Some((_, top)) if entry.1 <= *top => {}
                _ => best = Some(entry),
            }
        }
        best.map(|(label, _)| label.as_str())
            .unwrap_or(labels::UNKNOWN_MODE)
    }

    pub fn get(&self, category: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(label, _)| label == category)
            .map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
