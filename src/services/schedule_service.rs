use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

use crate::db::repositories::assignment_repository::{AssignmentRepository, AssignmentRow};
use crate::db::repositories::driver_repository::DriverRepository;
use crate::db::repositories::preference_repository::PreferenceRepository;
use crate::db::repositories::slot_repository::SlotRepository;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::assignment::RideAssignment;
use crate::models::driver::Driver;
use crate::models::history::FairnessState;
use crate::models::preference::PreferenceMap;
use crate::models::slot::TemplateSlot;
use crate::services::history_aggregator::{HistoryAggregator, DEFAULT_LOOKBACK_WEEKS};
use crate::services::slot_engine::SlotEngine;

/// Knobs for one generation run
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Trailing fairness window, in weeks
    pub lookback_weeks: i64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            lookback_weeks: DEFAULT_LOOKBACK_WEEKS,
        }
    }
}

/// Orchestrates a weekly generation run: clear (optional), load inputs, walk
/// the days Monday through Sunday calling the engine per slot, persist, and
/// return the created assignments.
///
/// Slot processing is strictly sequential within a run: the fairness state is
/// mutated after every successful assignment so later slots see earlier
/// picks. Runs for the same week are serialized through a per-week lock;
/// runs for different weeks share nothing and may overlap. Deployments with
/// multiple processes still need an external lock keyed by week start.
#[derive(Clone)]
pub struct ScheduleService {
    db: DbPool,
    config: ScheduleConfig,
    week_locks: Arc<Mutex<HashMap<NaiveDate, Arc<Mutex<()>>>>>,
}

impl ScheduleService {
    pub fn new(db: DbPool) -> Self {
        Self::with_config(db, ScheduleConfig::default())
    }

    pub fn with_config(db: DbPool, config: ScheduleConfig) -> Self {
        Self {
            db,
            config,
            week_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Generate one week of assignments. `week_start` is expected to be a
    /// Monday; the caller is responsible for that.
    ///
    /// Returns the created assignments in creation order, or an empty list
    /// when there was legitimately nothing to assign (no slots, no drivers,
    /// or every slot unfillable). Persistence failures surface as `Err` and
    /// roll back the whole week.
    pub fn generate_schedule(
        &self,
        week_start: NaiveDate,
        clear_existing: bool,
    ) -> AppResult<Vec<RideAssignment>> {
        let week_lock = self.lock_for_week(week_start);
        let _run_guard = week_lock.lock().expect("week lock poisoned");

        info!(
            target: "app::schedule",
            %week_start,
            clear_existing,
            lookback_weeks = self.config.lookback_weeks,
            "starting schedule generation"
        );

        let (slots, drivers) = self.db.with_connection(|conn| {
            let slots = SlotRepository::list_all(conn)?
                .into_iter()
                .map(|row| row.into_record())
                .collect::<AppResult<Vec<_>>>()?;
            let drivers = DriverRepository::list_active_drivers(conn)?;
            Ok((slots, drivers))
        })?;

        if slots.is_empty() || drivers.is_empty() {
            warn!(
                target: "app::schedule",
                %week_start,
                slots = slots.len(),
                drivers = drivers.len(),
                "nothing to schedule, returning empty result"
            );
            return Ok(Vec::new());
        }

        let preferences = self.load_preferences(&drivers, week_start)?;
        let mut fairness = self.load_fairness(&drivers, week_start)?;

        let assignments =
            self.run_day_loop(&slots, &drivers, &preferences, &mut fairness, week_start);

        self.persist_week(week_start, clear_existing, &assignments)?;

        info!(
            target: "app::schedule",
            %week_start,
            created = assignments.len(),
            slots = slots.len(),
            "schedule generation finished"
        );

        Ok(assignments)
    }

    /// All assignments whose date falls within the week's 7-day span, without
    /// regenerating anything.
    pub fn get_existing_assignments(&self, week_start: NaiveDate) -> AppResult<Vec<RideAssignment>> {
        let week_end = week_start + Duration::days(7);
        self.db.with_connection(|conn| {
            AssignmentRepository::list_in_range(conn, week_start, week_end)?
                .into_iter()
                .map(|row| row.into_record())
                .collect()
        })
    }

    // The table grows by one entry per distinct week and is never pruned;
    // a long-lived service touches at most a handful of weeks.
    fn lock_for_week(&self, week_start: NaiveDate) -> Arc<Mutex<()>> {
        let mut locks = self.week_locks.lock().expect("week lock table poisoned");
        locks.entry(week_start).or_default().clone()
    }

    /// A failed per-driver lookup degrades that driver to "no declarations"
    /// instead of aborting the run.
    fn load_preferences(
        &self,
        drivers: &[Driver],
        week_start: NaiveDate,
    ) -> AppResult<PreferenceMap> {
        let mut preferences = PreferenceMap::new();
        self.db.with_connection(|conn| {
            for driver in drivers {
                match PreferenceRepository::map_for_driver_week(conn, &driver.id, week_start) {
                    Ok(map) => preferences.insert_driver(driver.id.clone(), map),
                    Err(err) => {
                        warn!(
                            target: "app::schedule",
                            driver_id = %driver.id,
                            %week_start,
                            error = %err,
                            "preference lookup failed, treating driver as undeclared"
                        );
                        preferences.insert_driver(driver.id.clone(), HashMap::new());
                    }
                }
            }
            Ok(())
        })?;
        Ok(preferences)
    }

    /// A history read failure degrades to an empty fairness map rather than
    /// aborting: availability over perfect fairness.
    fn load_fairness(&self, drivers: &[Driver], week_start: NaiveDate) -> AppResult<FairnessState> {
        let metrics = match self.db.with_connection(|conn| {
            HistoryAggregator::aggregate(conn, week_start, self.config.lookback_weeks)
        }) {
            Ok(metrics) => metrics,
            Err(err) => {
                warn!(
                    target: "app::schedule",
                    %week_start,
                    error = %err,
                    "historical aggregation failed, degrading to empty fairness map"
                );
                HashMap::new()
            }
        };
        Ok(FairnessState::new(metrics, drivers))
    }

    fn run_day_loop(
        &self,
        slots: &[TemplateSlot],
        drivers: &[Driver],
        preferences: &PreferenceMap,
        fairness: &mut FairnessState,
        week_start: NaiveDate,
    ) -> Vec<RideAssignment> {
        let mut slots_by_day: HashMap<u8, Vec<&TemplateSlot>> = HashMap::new();
        for slot in slots {
            slots_by_day.entry(slot.day_of_week).or_default().push(slot);
        }

        let mut assignments = Vec::new();

        for day_offset in 0..7u8 {
            let day_date = week_start + Duration::days(day_offset as i64);
            let Some(day_slots) = slots_by_day.get(&day_offset) else {
                continue;
            };

            for slot in day_slots {
                if let Some(assignment) = SlotEngine::assign_driver_to_slot(
                    slot, drivers, preferences, fairness, day_date,
                ) {
                    fairness.record_assignment(&assignment.driver_id, day_date);
                    assignments.push(assignment);
                }
            }
        }

        assignments
    }

    /// Clear-then-create for the target week, all inside one transaction so a
    /// failed create never leaves a half-written week behind.
    fn persist_week(
        &self,
        week_start: NaiveDate,
        clear_existing: bool,
        assignments: &[RideAssignment],
    ) -> AppResult<()> {
        let week_end = week_start + Duration::days(7);
        self.db.with_transaction(|tx| {
            if clear_existing {
                let removed = AssignmentRepository::delete_in_range(tx, week_start, week_end)?;
                debug!(
                    target: "app::schedule",
                    %week_start,
                    removed,
                    "cleared existing assignments for week"
                );
            }
            for assignment in assignments {
                AssignmentRepository::insert(tx, &AssignmentRow::from_record(assignment))?;
            }
            Ok(())
        })
    }
}
