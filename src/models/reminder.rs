use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ReminderKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: ReminderKind,
    pub text: String,
    /// YYYY-MM-DD; unparseable dates are skipped by due-listing, not errors.
    pub due_date: String,
    /// Optional HH:MM.
    pub due_time: Option<String>,
    pub dismissed: bool,
    pub created_at: NaiveDateTime,
}
