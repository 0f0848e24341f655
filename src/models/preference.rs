use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Driver-declared desirability of a slot for one week.
///
/// Ordered most-restrictive-first for processing: UNAVAILABLE excludes the
/// driver outright, then PREFERRED and LESS_PREFERRED form selection tiers,
/// and AVAILABLE_NEUTRAL is the implicit default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreferenceLevel {
    Preferred,
    LessPreferred,
    Unavailable,
    AvailableNeutral,
}

impl PreferenceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            PreferenceLevel::Preferred => "PREFERRED",
            PreferenceLevel::LessPreferred => "LESS_PREFERRED",
            PreferenceLevel::Unavailable => "UNAVAILABLE",
            PreferenceLevel::AvailableNeutral => "AVAILABLE_NEUTRAL",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "PREFERRED" => Ok(PreferenceLevel::Preferred),
            "LESS_PREFERRED" => Ok(PreferenceLevel::LessPreferred),
            "UNAVAILABLE" => Ok(PreferenceLevel::Unavailable),
            "AVAILABLE_NEUTRAL" => Ok(PreferenceLevel::AvailableNeutral),
            other => Err(AppError::validation(format!(
                "unknown preference level: {other}"
            ))),
        }
    }
}

/// What a driver said about a slot, keeping "said nothing" distinct from an
/// explicit AVAILABLE_NEUTRAL. Both filter identically; only the assignment
/// method tag differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotPreference {
    Declared(PreferenceLevel),
    Undeclared,
}

impl SlotPreference {
    /// Effective level used by the eligibility filter and tier selection.
    pub fn effective_level(self) -> PreferenceLevel {
        match self {
            SlotPreference::Declared(level) => level,
            SlotPreference::Undeclared => PreferenceLevel::AvailableNeutral,
        }
    }

    pub fn is_declared(self) -> bool {
        matches!(self, SlotPreference::Declared(_))
    }
}

/// One declared preference row: driver + week + slot + level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyPreference {
    pub id: String,
    pub driver_id: String,
    pub week_start_date: NaiveDate,
    pub template_slot_id: String,
    pub preference_level: PreferenceLevel,
    pub submitted_at: DateTime<Utc>,
}

impl WeeklyPreference {
    pub fn new(
        driver_id: impl Into<String>,
        week_start_date: NaiveDate,
        template_slot_id: impl Into<String>,
        preference_level: PreferenceLevel,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            driver_id: driver_id.into(),
            week_start_date,
            template_slot_id: template_slot_id.into(),
            preference_level,
            submitted_at: Utc::now(),
        }
    }
}

/// All declared preferences for one run: driver id -> slot id -> level.
#[derive(Debug, Clone, Default)]
pub struct PreferenceMap {
    by_driver: HashMap<String, HashMap<String, PreferenceLevel>>,
}

impl PreferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_driver(&mut self, driver_id: impl Into<String>, prefs: HashMap<String, PreferenceLevel>) {
        self.by_driver.insert(driver_id.into(), prefs);
    }

    pub fn for_slot(&self, driver_id: &str, slot_id: &str) -> SlotPreference {
        match self
            .by_driver
            .get(driver_id)
            .and_then(|slots| slots.get(slot_id))
        {
            Some(level) => SlotPreference::Declared(*level),
            None => SlotPreference::Undeclared,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preference_level_round_trips_through_wire_values() {
        for level in [
            PreferenceLevel::Preferred,
            PreferenceLevel::LessPreferred,
            PreferenceLevel::Unavailable,
            PreferenceLevel::AvailableNeutral,
        ] {
            assert_eq!(PreferenceLevel::parse(level.as_str()).unwrap(), level);
        }
        assert!(PreferenceLevel::parse("SOMETIMES").is_err());
    }

    #[test]
    fn undeclared_filters_as_neutral_but_stays_undeclared() {
        let map = PreferenceMap::new();
        let pref = map.for_slot("driver1", "slot1");
        assert_eq!(pref.effective_level(), PreferenceLevel::AvailableNeutral);
        assert!(!pref.is_declared());
    }

    #[test]
    fn declared_neutral_is_still_declared() {
        let mut map = PreferenceMap::new();
        let mut prefs = HashMap::new();
        prefs.insert("slot1".to_string(), PreferenceLevel::AvailableNeutral);
        map.insert_driver("driver1", prefs);

        let pref = map.for_slot("driver1", "slot1");
        assert_eq!(pref.effective_level(), PreferenceLevel::AvailableNeutral);
        assert!(pref.is_declared());
    }
}
