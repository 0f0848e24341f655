use std::collections::HashMap;

use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use tracing::debug;

use crate::db::repositories::assignment_repository::AssignmentRepository;
use crate::error::AppResult;
use crate::models::history::HistoricalMetric;

/// Trailing window, in weeks, over which past assignments count toward
/// fairness.
pub const DEFAULT_LOOKBACK_WEEKS: i64 = 4;

/// Builds per-driver fairness metrics from past assignments.
///
/// Scans assignments dated in `[week_start - lookback, week_start)`; the
/// target week itself never contributes. Drivers absent from the result
/// simply have no history.
pub struct HistoryAggregator;

impl HistoryAggregator {
    pub fn aggregate(
        conn: &Connection,
        week_start: NaiveDate,
        lookback_weeks: i64,
    ) -> AppResult<HashMap<String, HistoricalMetric>> {
        let window_start = week_start - Duration::days(7 * lookback_weeks);
        let rows = AssignmentRepository::list_in_range(conn, window_start, week_start)?;

        let mut history = Vec::with_capacity(rows.len());
        for row in rows {
            let record = row.into_record()?;
            history.push((record.driver_id, record.assigned_date));
        }

        let metrics = Self::accumulate(&history, week_start, lookback_weeks);
        debug!(
            target: "app::schedule",
            %week_start,
            lookback_weeks,
            drivers_with_history = metrics.len(),
            rows = history.len(),
            "historical metrics aggregated"
        );
        Ok(metrics)
    }

    /// Fold (driver, date) pairs into metrics. Recency weight decays linearly
    /// from 1.0 at the week boundary to 0 at one and a half lookback windows
    /// back, floored at zero.
    pub fn accumulate(
        history: &[(String, NaiveDate)],
        week_start: NaiveDate,
        lookback_weeks: i64,
    ) -> HashMap<String, HistoricalMetric> {
        let mut metrics: HashMap<String, HistoricalMetric> = HashMap::new();

        for (driver_id, assigned_date) in history {
            let days_ago = (week_start - *assigned_date).num_days();
            let recency_weight =
                (1.0 - days_ago as f64 / (lookback_weeks as f64 * 7.0 * 1.5)).max(0.0);

            let metric = metrics.entry(driver_id.clone()).or_default();
            metric.count += 1;
            metric.weighted_count += recency_weight;

            if metric
                .last_assignment_date
                .map_or(true, |last| *assigned_date > last)
            {
                metric.last_assignment_date = Some(*assigned_date);
            }
        }

        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_history_yields_empty_metrics() {
        let metrics = HistoryAggregator::accumulate(&[], date(2025, 5, 26), 4);
        assert!(metrics.is_empty());
    }

    #[test]
    fn counts_and_last_date_accumulate_per_driver() {
        let week_start = date(2025, 5, 26);
        let history = vec![
            ("driver1".to_string(), date(2025, 5, 19)),
            ("driver1".to_string(), date(2025, 5, 12)),
            ("driver2".to_string(), date(2025, 5, 5)),
        ];

        let metrics = HistoryAggregator::accumulate(&history, week_start, 4);

        let d1 = &metrics["driver1"];
        assert_eq!(d1.count, 2);
        assert_eq!(d1.last_assignment_date, Some(date(2025, 5, 19)));

        let d2 = &metrics["driver2"];
        assert_eq!(d2.count, 1);
        assert_eq!(d2.last_assignment_date, Some(date(2025, 5, 5)));
    }

    #[test]
    fn recent_assignments_weigh_more_than_old_ones() {
        let week_start = date(2025, 5, 26);
        let history = vec![
            ("recent".to_string(), date(2025, 5, 25)),
            ("old".to_string(), date(2025, 4, 28)),
        ];

        let metrics = HistoryAggregator::accumulate(&history, week_start, 4);
        assert!(metrics["recent"].weighted_count > metrics["old"].weighted_count);
    }

    #[test]
    fn recency_weight_matches_linear_decay() {
        let week_start = date(2025, 5, 26);
        // 7 days ago with a 4-week lookback: 1 - 7/42 = 5/6
        let history = vec![("driver1".to_string(), date(2025, 5, 19))];

        let metrics = HistoryAggregator::accumulate(&history, week_start, 4);
        let expected = 1.0 - 7.0 / (4.0 * 7.0 * 1.5);
        assert!((metrics["driver1"].weighted_count - expected).abs() < 1e-9);
    }

    #[test]
    fn weight_floors_at_zero_but_count_still_accrues() {
        let week_start = date(2025, 5, 26);
        // 100 days ago is past the decay horizon
        let history = vec![("driver1".to_string(), week_start - Duration::days(100))];

        let metrics = HistoryAggregator::accumulate(&history, week_start, 4);
        assert_eq!(metrics["driver1"].count, 1);
        assert_eq!(metrics["driver1"].weighted_count, 0.0);
    }
}
