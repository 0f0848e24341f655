use std::collections::HashMap;

use chrono::NaiveDate;

use crate::models::driver::Driver;

/// Per-driver aggregate over the trailing lookback window. Recomputed fresh
/// at the start of every run; never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalMetric {
    pub count: i64,
    pub weighted_count: f64,
    pub last_assignment_date: Option<NaiveDate>,
}

/// Fairness state for one generation run.
///
/// Seeded from the historical aggregator, then mutated sequentially as slots
/// are assigned so later slots in the same run see earlier picks. Owned by
/// the orchestrator; the engine only reads it. The sequential dependency is
/// the point: this must not be shared across concurrent slot processing.
#[derive(Debug, Clone)]
pub struct FairnessState {
    metrics: HashMap<String, HistoricalMetric>,
}

impl FairnessState {
    /// Build from aggregated history, filling a zero metric for every roster
    /// driver with no historical rows.
    pub fn new(mut metrics: HashMap<String, HistoricalMetric>, drivers: &[Driver]) -> Self {
        for driver in drivers {
            metrics.entry(driver.id.clone()).or_default();
        }
        Self { metrics }
    }

    pub fn metric(&self, driver_id: &str) -> HistoricalMetric {
        self.metrics.get(driver_id).cloned().unwrap_or_default()
    }

    /// Fairness score for a candidate driver on the given date; higher is
    /// better (least recently / least frequently used wins).
    pub fn score(&self, driver_id: &str, on_date: NaiveDate) -> f64 {
        let metric = self.metric(driver_id);

        let mut score = -10.0 * metric.weighted_count;

        score += match metric.last_assignment_date {
            // Never assigned gets a large bonus
            None => 50.0,
            Some(last) => {
                let days_since = (on_date - last).num_days();
                days_since.min(30) as f64
            }
        };

        score - metric.count as f64
    }

    /// Record an assignment made during this run. New same-run assignments
    /// carry full recency weight.
    pub fn record_assignment(&mut self, driver_id: &str, on_date: NaiveDate) {
        let metric = self.metrics.entry(driver_id.to_string()).or_default();
        metric.count += 1;
        metric.weighted_count += 1.0;
        metric.last_assignment_date = Some(on_date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver(id: &str) -> Driver {
        Driver {
            id: id.to_string(),
            full_name: format!("Driver {id}"),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn drivers_without_history_get_zero_metrics() {
        let state = FairnessState::new(HashMap::new(), &[driver("d1")]);
        assert_eq!(state.metric("d1"), HistoricalMetric::default());
    }

    #[test]
    fn never_assigned_scores_above_recently_assigned() {
        let mut metrics = HashMap::new();
        metrics.insert(
            "busy".to_string(),
            HistoricalMetric {
                count: 2,
                weighted_count: 1.5,
                last_assignment_date: Some(date(2025, 5, 19)),
            },
        );
        let state = FairnessState::new(metrics, &[driver("busy"), driver("fresh")]);

        let on = date(2025, 5, 26);
        assert!(state.score("fresh", on) > state.score("busy", on));
    }

    #[test]
    fn days_since_last_bonus_caps_at_thirty() {
        let mut metrics = HashMap::new();
        metrics.insert(
            "d1".to_string(),
            HistoricalMetric {
                count: 0,
                weighted_count: 0.0,
                last_assignment_date: Some(date(2025, 1, 1)),
            },
        );
        let state = FairnessState::new(metrics, &[]);

        // 90 days out, bonus is capped at 30
        assert_eq!(state.score("d1", date(2025, 4, 1)), 30.0);
    }

    #[test]
    fn recording_an_assignment_lowers_the_next_score() {
        let mut state = FairnessState::new(HashMap::new(), &[driver("d1")]);
        let on = date(2025, 6, 2);

        let before = state.score("d1", on);
        state.record_assignment("d1", on);
        let after = state.score("d1", on);

        assert!(after < before);
        assert_eq!(state.metric("d1").count, 1);
        assert_eq!(state.metric("d1").last_assignment_date, Some(on));
    }
}
