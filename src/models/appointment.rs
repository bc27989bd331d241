use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AppointmentStatus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub facility_id: Uuid,
    pub date: NaiveDate,
    /// Requested slot, e.g. "10:30 AM".
    pub time_slot: String,
    pub status: AppointmentStatus,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}
