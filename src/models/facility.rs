use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ApprovalStatus, FacilityKind};
use crate::opening_hours::OperatingSchedule;

/// A doctor, pharmacy, or lab entity with an operating schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub kind: FacilityKind,
    pub address: Option<String>,
    /// Weekday names the facility is open.
    pub days: Vec<String>,
    /// Raw hours-range string; may be malformed (rendered "Hours not listed").
    pub hours_range: String,
    pub approval_status: ApprovalStatus,
    pub created_at: NaiveDateTime,
}

impl Facility {
    pub fn schedule(&self) -> OperatingSchedule {
        OperatingSchedule::new(self.days.clone(), self.hours_range.clone())
    }
}
