use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user. Only users with `is_active_driver` set participate in
/// schedule generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub phone_number: Option<String>,
    pub is_active_driver: bool,
    pub home_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, full_name: impl Into<String>, role: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.into(),
            full_name: full_name.into(),
            role: role.into(),
            phone_number: None,
            is_active_driver: false,
            home_address: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn as_driver(mut self) -> Self {
        self.is_active_driver = true;
        self
    }
}

/// Roster projection of an active driver, the only view the assignment engine
/// sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: String,
    pub full_name: String,
}
