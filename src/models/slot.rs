use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recurring weekly template slot. Created by administrators and read-only to
/// the assignment engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSlot {
    pub id: String,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: u8,
    /// HH:MM in local time
    pub start_time: String,
    pub end_time: String,
    pub route_type: String,
    /// Ordered location ids along the route
    pub locations: Vec<String>,
    pub max_capacity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TemplateSlot {
    pub fn new(input: TemplateSlotCreate) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            day_of_week: input.day_of_week,
            start_time: input.start_time,
            end_time: input.end_time,
            route_type: input.route_type,
            locations: input.locations,
            max_capacity: input.max_capacity,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating a new template slot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSlotCreate {
    pub day_of_week: u8,
    pub start_time: String,
    pub end_time: String,
    pub route_type: String,
    pub locations: Vec<String>,
    pub max_capacity: i64,
}
