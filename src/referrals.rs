//! Agent referral codes and commission payouts.
//!
//! An agent owns one generated code. A user who signs up with that code is
//! linked to the agent; qualifying spends by the referred user pay the agent
//! a percentage commission into their Health Points wallet. An agent's
//! "commission wallet" is just the sum of their commission ledger rows.

use chrono::{Local, NaiveDateTime};
use rand::Rng;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{PointsTransaction, Referral, TransactionKind};
use crate::wallet;

/// Commission paid to the referring agent, as a percentage of the referred
/// user's qualifying spend. Fractions are floored.
pub const COMMISSION_RATE_PERCENT: i64 = 10;

const CODE_LEN: usize = 8;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generates a new referral code (8 chars, ambiguous glyphs excluded).
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Records that `referred_user_id` signed up with `code`. Unknown codes and
/// self-referral are rejected.
pub fn record_referral(
    conn: &Connection,
    code: &str,
    referred_user_id: Uuid,
) -> Result<Referral, DatabaseError> {
    let agent_id: String = conn
        .query_row(
            "SELECT id FROM users WHERE referral_code = ?1",
            params![code],
            |row| row.get(0),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                DatabaseError::ConstraintViolation(format!("Unknown referral code: {code}"))
            }
            other => DatabaseError::from(other),
        })?;
    let agent_id = Uuid::parse_str(&agent_id)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;

    if agent_id == referred_user_id {
        return Err(DatabaseError::ConstraintViolation(
            "Self-referral is not allowed".into(),
        ));
    }

    let id = Uuid::new_v4();
    let created_at = Local::now().naive_local();
    conn.execute(
        "INSERT INTO referrals (id, agent_id, referred_user_id, code, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            id.to_string(),
            agent_id.to_string(),
            referred_user_id.to_string(),
            code,
            created_at.to_string(),
        ],
    )?;

    tracing::info!(agent = %agent_id, referred = %referred_user_id, "referral recorded");

    Ok(Referral {
        id,
        agent_id,
        referred_user_id,
        code: code.to_string(),
        created_at,
    })
}

/// Pays the referring agent their cut of a qualifying spend. Returns `None`
/// when the spender was not referred or the commission rounds to zero.
pub fn pay_commission(
    conn: &Connection,
    referred_user_id: Uuid,
    spend_amount: i64,
    note: &str,
) -> Result<Option<PointsTransaction>, DatabaseError> {
    let agent_id: Option<String> = conn
        .query_row(
            "SELECT agent_id FROM referrals WHERE referred_user_id = ?1",
            params![referred_user_id.to_string()],
            |row| row.get(0),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(DatabaseError::from(other)),
        })?;

    let Some(agent_id) = agent_id else {
        return Ok(None);
    };
    let agent_id = Uuid::parse_str(&agent_id)
        .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?;

    let commission = spend_amount * COMMISSION_RATE_PERCENT / 100;
    if commission <= 0 {
        return Ok(None);
    }

    let transaction = wallet::credit(
        conn,
        agent_id,
        commission,
        TransactionKind::ReferralCommission,
        Some(note),
    )?;
    tracing::info!(agent = %agent_id, commission, "referral commission credited");
    Ok(Some(transaction))
}

/// Total commission an agent has earned.
pub fn commission_summary(conn: &Connection, agent_id: Uuid) -> Result<i64, DatabaseError> {
    let total = conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM points_transactions
         WHERE user_id = ?1 AND kind = 'referral_commission'",
        params![agent_id.to_string()],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(total)
}

/// Users an agent has referred, newest first.
pub fn referrals_for_agent(
    conn: &Connection,
    agent_id: Uuid,
) -> Result<Vec<Referral>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, agent_id, referred_user_id, code, created_at
         FROM referrals
         WHERE agent_id = ?1
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map(params![agent_id.to_string()], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
        ))
    })?;

    let mut referrals = Vec::new();
    for row in rows {
        let (id, agent_id, referred_user_id, code, created_at) = row?;
        referrals.push(Referral {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            agent_id: Uuid::parse_str(&agent_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            referred_user_id: Uuid::parse_str(&referred_user_id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            code,
            created_at: NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S%.f")
                .unwrap_or_default(),
        });
    }
    Ok(referrals)
}
