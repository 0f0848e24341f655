use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::slot::TemplateSlot;

const BASE_SELECT: &str = r#"
    SELECT
        id,
        day_of_week,
        start_time,
        end_time,
        route_type,
        locations,
        max_capacity,
        created_at,
        updated_at
    FROM template_slots
"#;

#[derive(Debug, Clone)]
pub struct SlotRow {
    pub id: String,
    pub day_of_week: i64,
    pub start_time: String,
    pub end_time: String,
    pub route_type: String,
    pub locations: Option<String>,
    pub max_capacity: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl SlotRow {
    pub fn from_record(record: &TemplateSlot) -> AppResult<Self> {
        Ok(Self {
            id: record.id.clone(),
            day_of_week: record.day_of_week as i64,
            start_time: record.start_time.clone(),
            end_time: record.end_time.clone(),
            route_type: record.route_type.clone(),
            locations: serialize_vec(&record.locations)?,
            max_capacity: record.max_capacity,
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        })
    }

    pub fn into_record(self) -> AppResult<TemplateSlot> {
        Ok(TemplateSlot {
            id: self.id,
            day_of_week: u8::try_from(self.day_of_week)
                .map_err(|_| AppError::database(format!("day_of_week out of range: {}", self.day_of_week)))?,
            start_time: self.start_time,
            end_time: self.end_time,
            route_type: self.route_type,
            locations: deserialize_vec(self.locations)?,
            max_capacity: self.max_capacity,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

impl TryFrom<&Row<'_>> for SlotRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            day_of_week: row.get("day_of_week")?,
            start_time: row.get("start_time")?,
            end_time: row.get("end_time")?,
            route_type: row.get("route_type")?,
            locations: row.get("locations")?,
            max_capacity: row.get("max_capacity")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct SlotRepository;

impl SlotRepository {
    pub fn insert(conn: &Connection, row: &SlotRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO template_slots (
                    id,
                    day_of_week,
                    start_time,
                    end_time,
                    route_type,
                    locations,
                    max_capacity,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :day_of_week,
                    :start_time,
                    :end_time,
                    :route_type,
                    :locations,
                    :max_capacity,
                    :created_at,
                    :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":day_of_week": row.day_of_week,
                ":start_time": &row.start_time,
                ":end_time": &row.end_time,
                ":route_type": &row.route_type,
                ":locations": &row.locations,
                ":max_capacity": row.max_capacity,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let affected = conn.execute("DELETE FROM template_slots WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<SlotRow>> {
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", BASE_SELECT))?;
        let row = stmt
            .query_row([id], |row| SlotRow::try_from(row))
            .optional()?;
        Ok(row)
    }

    /// All template slots, ordered for a stable per-day iteration:
    /// day-of-week first, then start time, then id.
    pub fn list_all(conn: &Connection) -> AppResult<Vec<SlotRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY day_of_week ASC, start_time ASC, id ASC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map([], |row| SlotRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn serialize_vec(values: &[String]) -> AppResult<Option<String>> {
    if values.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(values)?))
    }
}

fn deserialize_vec(raw: Option<String>) -> AppResult<Vec<String>> {
    match raw {
        Some(value) if !value.is_empty() => Ok(serde_json::from_str(&value)?),
        _ => Ok(Vec::new()),
    }
}

fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| AppError::database(format!("invalid timestamp '{raw}': {err}")))
}
