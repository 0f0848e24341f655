use std::collections::HashMap;
use std::convert::TryFrom;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{named_params, Connection, Row};

use crate::error::{AppError, AppResult};
use crate::models::preference::{PreferenceLevel, WeeklyPreference};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        driver_id,
        week_start_date,
        template_slot_id,
        preference_level,
        submitted_at
    FROM weekly_preferences
"#;

#[derive(Debug, Clone)]
pub struct PreferenceRow {
    pub id: String,
    pub driver_id: String,
    pub week_start_date: String,
    pub template_slot_id: String,
    pub preference_level: String,
    pub submitted_at: String,
}

impl PreferenceRow {
    pub fn from_record(record: &WeeklyPreference) -> Self {
        Self {
            id: record.id.clone(),
            driver_id: record.driver_id.clone(),
            week_start_date: record.week_start_date.format("%Y-%m-%d").to_string(),
            template_slot_id: record.template_slot_id.clone(),
            preference_level: record.preference_level.as_str().to_string(),
            submitted_at: record.submitted_at.to_rfc3339(),
        }
    }

    pub fn into_record(self) -> AppResult<WeeklyPreference> {
        Ok(WeeklyPreference {
            id: self.id,
            driver_id: self.driver_id,
            week_start_date: parse_date(&self.week_start_date)?,
            template_slot_id: self.template_slot_id,
            preference_level: PreferenceLevel::parse(&self.preference_level)?,
            submitted_at: parse_timestamp(&self.submitted_at)?,
        })
    }
}

impl TryFrom<&Row<'_>> for PreferenceRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            driver_id: row.get("driver_id")?,
            week_start_date: row.get("week_start_date")?,
            template_slot_id: row.get("template_slot_id")?,
            preference_level: row.get("preference_level")?,
            submitted_at: row.get("submitted_at")?,
        })
    }
}

pub struct PreferenceRepository;

impl PreferenceRepository {
    pub fn insert(conn: &Connection, row: &PreferenceRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO weekly_preferences (
                    id,
                    driver_id,
                    week_start_date,
                    template_slot_id,
                    preference_level,
                    submitted_at
                ) VALUES (
                    :id,
                    :driver_id,
                    :week_start_date,
                    :template_slot_id,
                    :preference_level,
                    :submitted_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":driver_id": &row.driver_id,
                ":week_start_date": &row.week_start_date,
                ":template_slot_id": &row.template_slot_id,
                ":preference_level": &row.preference_level,
                ":submitted_at": &row.submitted_at,
            },
        )?;

        Ok(())
    }

    /// Remove a driver's whole batch for one week. A fresh submission replaces
    /// any prior one wholesale.
    pub fn delete_for_driver_week(
        conn: &Connection,
        driver_id: &str,
        week_start: NaiveDate,
    ) -> AppResult<usize> {
        let affected = conn.execute(
            "DELETE FROM weekly_preferences WHERE driver_id = ?1 AND week_start_date = ?2",
            (driver_id, week_start.format("%Y-%m-%d").to_string()),
        )?;
        Ok(affected)
    }

    /// One driver's declared levels for one week, keyed by slot id.
    pub fn map_for_driver_week(
        conn: &Connection,
        driver_id: &str,
        week_start: NaiveDate,
    ) -> AppResult<HashMap<String, PreferenceLevel>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE driver_id = ?1 AND week_start_date = ?2",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map(
                (driver_id, week_start.format("%Y-%m-%d").to_string()),
                |row| PreferenceRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut map = HashMap::with_capacity(rows.len());
        for row in rows {
            map.insert(
                row.template_slot_id.clone(),
                PreferenceLevel::parse(&row.preference_level)?,
            );
        }
        Ok(map)
    }

    pub fn list_for_driver_week(
        conn: &Connection,
        driver_id: &str,
        week_start: NaiveDate,
    ) -> AppResult<Vec<PreferenceRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE driver_id = ?1 AND week_start_date = ?2 ORDER BY template_slot_id ASC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map(
                (driver_id, week_start.format("%Y-%m-%d").to_string()),
                |row| PreferenceRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn parse_date(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|err| AppError::database(format!("invalid date '{raw}': {err}")))
}

fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| AppError::database(format!("invalid timestamp '{raw}': {err}")))
}
