use std::convert::TryFrom;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{named_params, Connection, Row};

use crate::error::{AppError, AppResult};
use crate::models::assignment::{AssignmentMethod, AssignmentStatus, RideAssignment};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        template_slot_id,
        driver_id,
        assigned_date,
        status,
        assignment_method,
        created_at,
        updated_at
    FROM ride_assignments
"#;

#[derive(Debug, Clone)]
pub struct AssignmentRow {
    pub id: String,
    pub template_slot_id: String,
    pub driver_id: String,
    pub assigned_date: String,
    pub status: String,
    pub assignment_method: String,
    pub created_at: String,
    pub updated_at: String,
}

impl AssignmentRow {
    pub fn from_record(record: &RideAssignment) -> Self {
        Self {
            id: record.id.clone(),
            template_slot_id: record.template_slot_id.clone(),
            driver_id: record.driver_id.clone(),
            assigned_date: record.assigned_date.format("%Y-%m-%d").to_string(),
            status: record.status.as_str().to_string(),
            assignment_method: record.assignment_method.as_str().to_string(),
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }

    pub fn into_record(self) -> AppResult<RideAssignment> {
        Ok(RideAssignment {
            id: self.id,
            template_slot_id: self.template_slot_id,
            driver_id: self.driver_id,
            assigned_date: parse_date(&self.assigned_date)?,
            status: AssignmentStatus::parse(&self.status)?,
            assignment_method: AssignmentMethod::parse(&self.assignment_method)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

impl TryFrom<&Row<'_>> for AssignmentRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            template_slot_id: row.get("template_slot_id")?,
            driver_id: row.get("driver_id")?,
            assigned_date: row.get("assigned_date")?,
            status: row.get("status")?,
            assignment_method: row.get("assignment_method")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct AssignmentRepository;

impl AssignmentRepository {
    pub fn insert(conn: &Connection, row: &AssignmentRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO ride_assignments (
                    id,
                    template_slot_id,
                    driver_id,
                    assigned_date,
                    status,
                    assignment_method,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :template_slot_id,
                    :driver_id,
                    :assigned_date,
                    :status,
                    :assignment_method,
                    :created_at,
                    :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":template_slot_id": &row.template_slot_id,
                ":driver_id": &row.driver_id,
                ":assigned_date": &row.assigned_date,
                ":status": &row.status,
                ":assignment_method": &row.assignment_method,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    pub fn delete(conn: &Connection, id: &str) -> AppResult<()> {
        let affected = conn.execute("DELETE FROM ride_assignments WHERE id = ?1", [id])?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    /// Assignments with `assigned_date` in `[range_start, range_end)`,
    /// ordered by creation.
    pub fn list_in_range(
        conn: &Connection,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> AppResult<Vec<AssignmentRow>> {
        let mut stmt = conn.prepare(&format!(
            "{} WHERE assigned_date >= ?1 AND assigned_date < ?2 ORDER BY created_at ASC, id ASC",
            BASE_SELECT
        ))?;
        let rows = stmt
            .query_map(
                (
                    range_start.format("%Y-%m-%d").to_string(),
                    range_end.format("%Y-%m-%d").to_string(),
                ),
                |row| AssignmentRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete_in_range(
        conn: &Connection,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> AppResult<usize> {
        let affected = conn.execute(
            "DELETE FROM ride_assignments WHERE assigned_date >= ?1 AND assigned_date < ?2",
            (
                range_start.format("%Y-%m-%d").to_string(),
                range_end.format("%Y-%m-%d").to_string(),
            ),
        )?;
        Ok(affected)
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
