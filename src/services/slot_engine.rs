use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::models::assignment::{AssignmentMethod, RideAssignment};
use crate::models::driver::Driver;
use crate::models::history::FairnessState;
use crate::models::preference::{PreferenceLevel, PreferenceMap};
use crate::models::slot::TemplateSlot;

/// Per-slot driver selection: eligibility filter, tiered preference
/// selection, fairness tie-break.
///
/// Pure over its inputs; the caller owns the fairness state and records the
/// pick afterwards so later slots in the run see it.
pub struct SlotEngine;

impl SlotEngine {
    /// Pick one driver for `slot` on `assignment_date`, or `None` when no
    /// eligible driver exists. A driver who declared UNAVAILABLE is never
    /// assigned, even if the slot then goes unfilled.
    pub fn assign_driver_to_slot(
        slot: &TemplateSlot,
        drivers: &[Driver],
        preferences: &PreferenceMap,
        fairness: &FairnessState,
        assignment_date: NaiveDate,
    ) -> Option<RideAssignment> {
        let eligible: Vec<&Driver> = drivers
            .iter()
            .filter(|d| {
                preferences.for_slot(&d.id, &slot.id).effective_level()
                    != PreferenceLevel::Unavailable
            })
            .collect();

        if eligible.is_empty() {
            warn!(
                target: "app::schedule",
                slot_id = %slot.id,
                %assignment_date,
                "no eligible driver, slot left unfilled"
            );
            return None;
        }

        let tier = Self::select_tier(&eligible, preferences, &slot.id);

        // Highest fairness score wins; strict comparison keeps the first
        // candidate on ties, and the roster is ordered by driver id.
        let mut best = tier[0];
        let mut best_score = fairness.score(&best.id, assignment_date);
        for &candidate in &tier[1..] {
            let score = fairness.score(&candidate.id, assignment_date);
            if score > best_score {
                best = candidate;
                best_score = score;
            }
        }

        let method = if preferences.for_slot(&best.id, &slot.id).is_declared() {
            AssignmentMethod::PreferenceBased
        } else {
            AssignmentMethod::HistoricalBased
        };

        debug!(
            target: "app::schedule",
            slot_id = %slot.id,
            driver_id = %best.id,
            %assignment_date,
            score = best_score,
            method = method.as_str(),
            "driver selected for slot"
        );

        Some(RideAssignment::new(
            slot.id.clone(),
            best.id.clone(),
            assignment_date,
            method,
        ))
    }

    /// PREFERRED first, then LESS_PREFERRED, then every eligible driver
    /// (undeclared and explicit AVAILABLE_NEUTRAL alike).
    fn select_tier<'a>(
        eligible: &[&'a Driver],
        preferences: &PreferenceMap,
        slot_id: &str,
    ) -> Vec<&'a Driver> {
        for level in [PreferenceLevel::Preferred, PreferenceLevel::LessPreferred] {
            let tier: Vec<&Driver> = eligible
                .iter()
                .copied()
                .filter(|d| preferences.for_slot(&d.id, slot_id).effective_level() == level)
                .collect();
            if !tier.is_empty() {
                return tier;
            }
        }
        eligible.to_vec()
    }
}
