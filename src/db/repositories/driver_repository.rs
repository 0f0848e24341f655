use std::convert::TryFrom;

use chrono::{DateTime, Utc};
use rusqlite::{named_params, Connection, Row};

use crate::error::{AppError, AppResult};
use crate::models::driver::{Driver, User};

const BASE_SELECT: &str = r#"
    SELECT
        id,
        email,
        full_name,
        role,
        phone_number,
        is_active_driver,
        home_address,
        created_at,
        updated_at
    FROM users
"#;

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub phone_number: Option<String>,
    pub is_active_driver: bool,
    pub home_address: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl UserRow {
    pub fn from_record(record: &User) -> Self {
        Self {
            id: record.id.clone(),
            email: record.email.clone(),
            full_name: record.full_name.clone(),
            role: record.role.clone(),
            phone_number: record.phone_number.clone(),
            is_active_driver: record.is_active_driver,
            home_address: record.home_address.clone(),
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }

    pub fn into_record(self) -> AppResult<User> {
        Ok(User {
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            role: self.role,
            phone_number: self.phone_number,
            is_active_driver: self.is_active_driver,
            home_address: self.home_address,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

impl TryFrom<&Row<'_>> for UserRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            email: row.get("email")?,
            full_name: row.get("full_name")?,
            role: row.get("role")?,
            phone_number: row.get("phone_number")?,
            is_active_driver: row.get("is_active_driver")?,
            home_address: row.get("home_address")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub struct DriverRepository;

impl DriverRepository {
    pub fn insert(conn: &Connection, row: &UserRow) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO users (
                    id,
                    email,
                    full_name,
                    role,
                    phone_number,
                    is_active_driver,
                    home_address,
                    created_at,
                    updated_at
                ) VALUES (
                    :id,
                    :email,
                    :full_name,
                    :role,
                    :phone_number,
                    :is_active_driver,
                    :home_address,
                    :created_at,
                    :updated_at
                )
            "#,
            named_params! {
                ":id": &row.id,
                ":email": &row.email,
                ":full_name": &row.full_name,
                ":role": &row.role,
                ":phone_number": &row.phone_number,
                ":is_active_driver": row.is_active_driver as i64,
                ":home_address": &row.home_address,
                ":created_at": &row.created_at,
                ":updated_at": &row.updated_at,
            },
        )?;

        Ok(())
    }

    pub fn set_active_driver(conn: &Connection, id: &str, active: bool) -> AppResult<()> {
        let affected = conn.execute(
            "UPDATE users SET is_active_driver = ?1, updated_at = ?2 WHERE id = ?3",
            (active as i64, Utc::now().to_rfc3339(), id),
        )?;
        if affected == 0 {
            return Err(AppError::not_found());
        }
        Ok(())
    }

    /// Active-driver roster, ordered by id so every run sees the same
    /// candidate order.
    pub fn list_active_drivers(conn: &Connection) -> AppResult<Vec<Driver>> {
        let mut stmt = conn.prepare(
            "SELECT id, full_name FROM users WHERE is_active_driver = 1 ORDER BY id ASC",
        )?;
        let drivers = stmt
            .query_map([], |row| {
                Ok(Driver {
                    id: row.get("id")?,
                    full_name: row.get("full_name")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(drivers)
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<UserRow>> {
        let mut stmt = conn.prepare(&format!("{} ORDER BY id ASC", BASE_SELECT))?;
        let rows = stmt
            .query_map([], |row| UserRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn parse_timestamp(raw: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| AppError::database(format!("invalid timestamp '{raw}': {err}")))
}
