use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Link between a referring agent and a user who signed up with the
/// agent's code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Referral {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub referred_user_id: Uuid,
    pub code: String,
    pub created_at: NaiveDateTime,
}
