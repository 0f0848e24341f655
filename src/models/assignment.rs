use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentStatus::Scheduled => "SCHEDULED",
            AssignmentStatus::Completed => "COMPLETED",
            AssignmentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "SCHEDULED" => Ok(AssignmentStatus::Scheduled),
            "COMPLETED" => Ok(AssignmentStatus::Completed),
            "CANCELLED" => Ok(AssignmentStatus::Cancelled),
            other => Err(AppError::validation(format!(
                "unknown assignment status: {other}"
            ))),
        }
    }
}

/// How a slot's driver was chosen: from an explicit declared preference, from
/// fairness defaults alone, or by a manual override after generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentMethod {
    PreferenceBased,
    HistoricalBased,
    Manual,
}

impl AssignmentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            AssignmentMethod::PreferenceBased => "PREFERENCE_BASED",
            AssignmentMethod::HistoricalBased => "HISTORICAL_BASED",
            AssignmentMethod::Manual => "MANUAL",
        }
    }

    pub fn parse(value: &str) -> AppResult<Self> {
        match value {
            "PREFERENCE_BASED" => Ok(AssignmentMethod::PreferenceBased),
            "HISTORICAL_BASED" => Ok(AssignmentMethod::HistoricalBased),
            "MANUAL" => Ok(AssignmentMethod::Manual),
            other => Err(AppError::validation(format!(
                "unknown assignment method: {other}"
            ))),
        }
    }
}

/// One driver driving one slot on one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideAssignment {
    pub id: String,
    pub template_slot_id: String,
    pub driver_id: String,
    pub assigned_date: NaiveDate,
    pub status: AssignmentStatus,
    pub assignment_method: AssignmentMethod,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RideAssignment {
    pub fn new(
        template_slot_id: impl Into<String>,
        driver_id: impl Into<String>,
        assigned_date: NaiveDate,
        assignment_method: AssignmentMethod,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            template_slot_id: template_slot_id.into(),
            driver_id: driver_id.into(),
            assigned_date,
            status: AssignmentStatus::Scheduled,
            assignment_method,
            created_at: now,
            updated_at: now,
        }
    }
}
