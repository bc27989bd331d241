use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{ApprovalStatus, Role};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub approval_status: ApprovalStatus,
    /// Referral code owned by this user (agents only).
    pub referral_code: Option<String>,
    pub created_at: NaiveDateTime,
}
