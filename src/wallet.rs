//! Health Points wallet — append-only ledger, balances, withdrawals.
//!
//! A balance is never stored; it is the sum of a user's ledger rows.
//! Debits beyond the current balance are rejected, so a balance can never
//! go negative. Withdrawal requests debit immediately and are refunded if
//! an admin rejects them.

use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{PointsTransaction, TransactionKind, WithdrawalRequest, WithdrawalStatus};

/// Appends a credit to the ledger. `amount` must be positive.
pub fn credit(
    conn: &Connection,
    user_id: Uuid,
    amount: i64,
    kind: TransactionKind,
    note: Option<&str>,
) -> Result<PointsTransaction, DatabaseError> {
    if amount <= 0 {
        return Err(DatabaseError::ConstraintViolation(
            "Credit amount must be positive".into(),
        ));
    }
    insert_transaction(conn, user_id, amount, kind, note)
}

/// Appends a debit to the ledger, rejecting overdrafts.
pub fn debit(
    conn: &Connection,
    user_id: Uuid,
    amount: i64,
    kind: TransactionKind,
    note: Option<&str>,
) -> Result<PointsTransaction, DatabaseError> {
    if amount <= 0 {
        return Err(DatabaseError::ConstraintViolation(
            "Debit amount must be positive".into(),
        ));
    }
    let available = balance(conn, user_id)?;
    if available < amount {
        return Err(DatabaseError::ConstraintViolation(format!(
            "Insufficient points: balance {available}, requested {amount}"
        )));
    }
    insert_transaction(conn, user_id, -amount, kind, note)
}

fn insert_transaction(
    conn: &Connection,
    user_id: Uuid,
    amount: i64,
    kind: TransactionKind,
    note: Option<&str>,
) -> Result<PointsTransaction, DatabaseError> {
    let id = Uuid::new_v4();
    let created_at = Local::now().naive_local();
    conn.execute(
        "INSERT INTO points_transactions (id, user_id, amount, kind, note, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id.to_string(),
            user_id.to_string(),
            amount,
            kind.as_str(),
            note,
            created_at.to_string(),
        ],
    )?;
    Ok(PointsTransaction {
        id,
        user_id,
        amount,
        kind,
        note: note.map(|n| n.to_string()),
        created_at,
    })
}

/// Current balance: sum over the user's ledger rows.
pub fn balance(conn: &Connection, user_id: Uuid) -> Result<i64, DatabaseError> {
    let sum = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM points_transactions WHERE user_id = ?1",
        params![user_id.to_string()],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(sum)
}

/// Ledger history, newest first.
pub fn history(conn: &Connection, user_id: Uuid) -> Result<Vec<PointsTransaction>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, amount, kind, note, created_at
         FROM points_transactions
         WHERE user_id = ?1
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map(params![user_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut transactions = Vec::new();
    for row in rows {
        let (id, user_id, amount, kind, note, created_at) = row?;
        transactions.push(PointsTransaction {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            user_id: Uuid::parse_str(&user_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            amount,
            kind: TransactionKind::from_str(&kind)?,
            note,
            created_at: NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S%.f")
                .unwrap_or_default(),
        });
    }
    Ok(transactions)
}

// ─── Withdrawals ──────────────────────────────────────────────────────────────

/// Creates a withdrawal request, debiting the points up front.
pub fn request_withdrawal(
    conn: &Connection,
    user_id: Uuid,
    amount: i64,
) -> Result<WithdrawalRequest, DatabaseError> {
    let id = Uuid::new_v4();
    debit(
        conn,
        user_id,
        amount,
        TransactionKind::Redeem,
        Some(&format!("withdrawal {id}")),
    )?;

    let requested_at = Local::now().naive_local();
    conn.execute(
        "INSERT INTO withdrawal_requests (id, user_id, amount, status, requested_at)
         VALUES (?1, ?2, ?3, 'pending', ?4)",
        params![
            id.to_string(),
            user_id.to_string(),
            amount,
            requested_at.to_string(),
        ],
    )?;

    tracing::info!(user = %user_id, amount, request = %id, "withdrawal requested");

    Ok(WithdrawalRequest {
        id,
        user_id,
        amount,
        status: WithdrawalStatus::Pending,
        requested_at,
        decided_at: None,
    })
}

/// Pending withdrawal requests for the admin queue, oldest first.
pub fn list_pending_withdrawals(
    conn: &Connection,
) -> Result<Vec<WithdrawalRequest>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, amount, status, requested_at, decided_at
         FROM withdrawal_requests
         WHERE status = 'pending'
         ORDER BY requested_at ASC, rowid ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
        ))
    })?;

    let mut requests = Vec::new();
    for row in rows {
        let (id, user_id, amount, status, requested_at, decided_at) = row?;
        requests.push(WithdrawalRequest {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            user_id: Uuid::parse_str(&user_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            amount,
            status: WithdrawalStatus::from_str(&status)?,
            requested_at: NaiveDateTime::parse_from_str(&requested_at, "%Y-%m-%d %H:%M:%S%.f")
                .unwrap_or_default(),
            decided_at: decided_at.and_then(|d| {
                NaiveDateTime::parse_from_str(&d, "%Y-%m-%d %H:%M:%S%.f").ok()
            }),
        });
    }
    Ok(requests)
}

/// Admin approval: the debit already happened, so this only closes the
/// request.
pub fn approve_withdrawal(conn: &Connection, request_id: Uuid) -> Result<(), DatabaseError> {
    decide_withdrawal(conn, request_id, WithdrawalStatus::Approved)?;
    Ok(())
}

/// Admin rejection: refunds the up-front debit.
pub fn reject_withdrawal(conn: &Connection, request_id: Uuid) -> Result<(), DatabaseError> {
    let (user_id, amount) = decide_withdrawal(conn, request_id, WithdrawalStatus::Rejected)?;
    credit(
        conn,
        user_id,
        amount,
        TransactionKind::Refund,
        Some(&format!("withdrawal {request_id} rejected")),
    )?;
    Ok(())
}

/// Transitions a pending request and returns `(user_id, amount)`.
fn decide_withdrawal(
    conn: &Connection,
    request_id: Uuid,
    decision: WithdrawalStatus,
) -> Result<(Uuid, i64), DatabaseError> {
    let (user_id, amount): (String, i64) = conn
        .query_row(
            "SELECT user_id, amount FROM withdrawal_requests
             WHERE id = ?1 AND status = 'pending'",
            params![request_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
                entity_type: "Pending withdrawal".into(),
                id: request_id.to_string(),
            },
            other => DatabaseError::from(other),
        })?;

    conn.execute(
        "UPDATE withdrawal_requests SET status = ?1, decided_at = ?2 WHERE id = ?3",
        params![
            decision.as_str(),
            Local::now().naive_local().to_string(),
            request_id.to_string(),
        ],
    )?;

    tracing::info!(request = %request_id, decision = decision.as_str(), "withdrawal decided");

    let user_id = Uuid::parse_str(&user_id)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;
    Ok((user_id, amount))
}
