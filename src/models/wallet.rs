use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{TransactionKind, WithdrawalStatus};

/// One row of the Health Points ledger. Credits are positive, debits
/// negative; a wallet balance is the sum of its rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsTransaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub kind: TransactionKind,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i64,
    pub status: WithdrawalStatus,
    pub requested_at: NaiveDateTime,
    pub decided_at: Option<NaiveDateTime>,
}
