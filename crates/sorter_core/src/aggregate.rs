use std::collections::BTreeMap;
use std::time::Duration;

use crate::Outcome;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimingStats {
    pub mean: Duration,
    pub min: Duration,
    pub max: Duration,
    pub wall_clock: Duration,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// `succeeded / total`, or 0 for an empty run.
    pub success_rate: f64,
    /// Successful items per category.
    pub category_distribution: BTreeMap<String, usize>,
    /// Successful items whose classification degraded to `Other`.
    pub degraded: usize,
    pub timing: TimingStats,
}

/// Append-only collection of per-item outcomes.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    outcomes: Vec<Outcome>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn summary(&self, wall_clock: Duration) -> RunSummary {
        let total = self.outcomes.len();
        let succeeded = self.outcomes.iter().filter(|o| o.success).count();

        let mut category_distribution = BTreeMap::new();
        let mut degraded = 0;
        for outcome in self.outcomes.iter().filter(|o| o.success) {
            *category_distribution
                .entry(outcome.category.clone())
                .or_insert(0) += 1;
            if outcome.classification_error.is_some() {
                degraded += 1;
            }
        }

        let success_rate = if total == 0 {
            0.0
        } else {
            succeeded as f64 / total as f64
        };

        RunSummary {
            total,
            succeeded,
            failed: total - succeeded,
            success_rate,
            category_distribution,
            degraded,
            timing: self.timing(wall_clock),
        }
    }

    fn timing(&self, wall_clock: Duration) -> TimingStats {
        let elapsed = self.outcomes.iter().map(|o| o.elapsed);
        let (Some(min), Some(max)) = (elapsed.clone().min(), elapsed.clone().max()) else {
            return TimingStats {
                wall_clock,
                ..TimingStats::default()
            };
        };
        let sum: Duration = elapsed.sum();
        TimingStats {
            mean: sum / self.outcomes.len() as u32,
            min,
            max,
            wall_clock,
        }
    }
}
