use std::collections::HashSet;

use chrono::NaiveDate;
use serde_json::json;
use tracing::info;

use crate::db::repositories::preference_repository::{PreferenceRepository, PreferenceRow};
use crate::db::repositories::slot_repository::SlotRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::preference::{PreferenceLevel, WeeklyPreference};

const MAX_PREFERRED: usize = 3;
const MAX_LESS_PREFERRED: usize = 2;
const MAX_UNAVAILABLE: usize = 2;

/// One entry of a weekly submission batch
#[derive(Debug, Clone)]
pub struct PreferenceEntry {
    pub template_slot_id: String,
    pub preference_level: PreferenceLevel,
}

/// Weekly preference submission. A batch replaces any prior batch for the
/// same driver and week; per-level limits are enforced here, not in the
/// assignment engine.
#[derive(Clone)]
pub struct PreferenceService {
    db: DbPool,
}

impl PreferenceService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn submit_weekly(
        &self,
        driver_id: &str,
        week_start: NaiveDate,
        entries: Vec<PreferenceEntry>,
    ) -> AppResult<Vec<WeeklyPreference>> {
        Self::validate_batch(&entries)?;

        let records: Vec<WeeklyPreference> = entries
            .iter()
            .map(|entry| {
                WeeklyPreference::new(
                    driver_id,
                    week_start,
                    entry.template_slot_id.clone(),
                    entry.preference_level,
                )
            })
            .collect();

        self.db.with_transaction(|tx| {
            for entry in &entries {
                if SlotRepository::find_by_id(tx, &entry.template_slot_id)?.is_none() {
                    return Err(AppError::validation(format!(
                        "unknown template slot: {}",
                        entry.template_slot_id
                    )));
                }
            }

            let replaced = PreferenceRepository::delete_for_driver_week(tx, driver_id, week_start)?;
            for record in &records {
                PreferenceRepository::insert(tx, &PreferenceRow::from_record(record))?;
            }

            info!(
                target: "app::preferences",
                driver_id,
                %week_start,
                submitted = records.len(),
                replaced,
                "weekly preferences submitted"
            );
            Ok(())
        })?;

        Ok(records)
    }

    pub fn get_for_driver_week(
        &self,
        driver_id: &str,
        week_start: NaiveDate,
    ) -> AppResult<Vec<WeeklyPreference>> {
        self.db.with_connection(|conn| {
            PreferenceRepository::list_for_driver_week(conn, driver_id, week_start)?
                .into_iter()
                .map(|row| row.into_record())
                .collect()
        })
    }

    fn validate_batch(entries: &[PreferenceEntry]) -> AppResult<()> {
        let mut seen = HashSet::new();
        for entry in entries {
            if !seen.insert(entry.template_slot_id.as_str()) {
                return Err(AppError::validation(format!(
                    "duplicate slot in submission: {}",
                    entry.template_slot_id
                )));
            }
        }

        let limits = [
            (PreferenceLevel::Preferred, MAX_PREFERRED),
            (PreferenceLevel::LessPreferred, MAX_LESS_PREFERRED),
            (PreferenceLevel::Unavailable, MAX_UNAVAILABLE),
        ];
        for (level, limit) in limits {
            let submitted = entries
                .iter()
                .filter(|e| e.preference_level == level)
                .count();
            if submitted > limit {
                return Err(AppError::validation_with_details(
                    format!("maximum {limit} {} slots allowed", level.as_str()),
                    json!({
                        "level": level.as_str(),
                        "limit": limit,
                        "submitted": submitted,
                    }),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(slot_id: &str, level: PreferenceLevel) -> PreferenceEntry {
        PreferenceEntry {
            template_slot_id: slot_id.to_string(),
            preference_level: level,
        }
    }

    #[test]
    fn batch_within_limits_passes() {
        let entries = vec![
            entry("s1", PreferenceLevel::Preferred),
            entry("s2", PreferenceLevel::Preferred),
            entry("s3", PreferenceLevel::Preferred),
            entry("s4", PreferenceLevel::LessPreferred),
            entry("s5", PreferenceLevel::Unavailable),
            entry("s6", PreferenceLevel::AvailableNeutral),
        ];
        assert!(PreferenceService::validate_batch(&entries).is_ok());
    }

    #[test]
    fn too_many_preferred_rejected() {
        let entries = vec![
            entry("s1", PreferenceLevel::Preferred),
            entry("s2", PreferenceLevel::Preferred),
            entry("s3", PreferenceLevel::Preferred),
            entry("s4", PreferenceLevel::Preferred),
        ];
        assert!(PreferenceService::validate_batch(&entries).is_err());
    }

    #[test]
    fn too_many_less_preferred_rejected() {
        let entries = vec![
            entry("s1", PreferenceLevel::LessPreferred),
            entry("s2", PreferenceLevel::LessPreferred),
            entry("s3", PreferenceLevel::LessPreferred),
        ];
        assert!(PreferenceService::validate_batch(&entries).is_err());
    }

    #[test]
    fn too_many_unavailable_rejected() {
        let entries = vec![
            entry("s1", PreferenceLevel::Unavailable),
            entry("s2", PreferenceLevel::Unavailable),
            entry("s3", PreferenceLevel::Unavailable),
        ];
        assert!(PreferenceService::validate_batch(&entries).is_err());
    }

    #[test]
    fn limit_violation_carries_details_payload() {
        let entries = vec![
            entry("s1", PreferenceLevel::Unavailable),
            entry("s2", PreferenceLevel::Unavailable),
            entry("s3", PreferenceLevel::Unavailable),
        ];
        match PreferenceService::validate_batch(&entries) {
            Err(AppError::Validation {
                details: Some(details),
                ..
            }) => {
                assert_eq!(details["level"], "UNAVAILABLE");
                assert_eq!(details["limit"], 2);
                assert_eq!(details["submitted"], 3);
            }
            other => panic!("expected validation error with details, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_slot_rejected() {
        let entries = vec![
            entry("s1", PreferenceLevel::Preferred),
            entry("s1", PreferenceLevel::Unavailable),
        ];
        assert!(PreferenceService::validate_batch(&entries).is_err());
    }
}
