//! User accounts and role-based approval.
//!
//! Every platform participant (patient, doctor, pharmacy, lab, agent,
//! admin) is a `users` row. Provider-side roles start `pending` and sit in
//! the admin approval queue; patients and admins are active immediately.
//! Agents receive a generated referral code at registration.

use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{ApprovalStatus, Role, User};
use crate::referrals;

/// Request to register a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Referral code entered at signup, if any.
    pub referral_code: Option<String>,
}

/// Registers a user and, when a referral code was supplied, records the
/// referral link. Agents get a referral code of their own. The insert and
/// the referral link commit together: a bad referral code rolls the whole
/// signup back, so no user row (and no reserved email) survives a failure.
pub fn register_user(conn: &Connection, new_user: &NewUser) -> Result<User, DatabaseError> {
    let id = Uuid::new_v4();
    let approval = if new_user.role.requires_approval() {
        ApprovalStatus::Pending
    } else {
        ApprovalStatus::Approved
    };
    let own_code = match new_user.role {
        Role::Agent => Some(referrals::generate_code()),
        _ => None,
    };
    let created_at = Local::now().naive_local();

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO users (id, name, email, role, approval_status, referral_code, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id.to_string(),
            new_user.name,
            new_user.email,
            new_user.role.as_str(),
            approval.as_str(),
            own_code,
            created_at.to_string(),
        ],
    )?;

    if let Some(code) = new_user.referral_code.as_deref() {
        referrals::record_referral(&tx, code, id)?;
    }
    tx.commit()?;

    tracing::info!(role = new_user.role.as_str(), %id, "registered user");

    Ok(User {
        id,
        name: new_user.name.clone(),
        email: new_user.email.clone(),
        role: new_user.role,
        approval_status: approval,
        referral_code: own_code,
        created_at,
    })
}

pub fn get_user(conn: &Connection, user_id: Uuid) -> Result<User, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, email, role, approval_status, referral_code, created_at
             FROM users WHERE id = ?1",
            params![user_id.to_string()],
            user_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
                entity_type: "User".into(),
                id: user_id.to_string(),
            },
            other => DatabaseError::from(other),
        })?;
    user_from_row(row)
}

pub fn list_users_by_role(conn: &Connection, role: Role) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, role, approval_status, referral_code, created_at
         FROM users WHERE role = ?1 ORDER BY created_at DESC",
    )?;
    let rows = stmt.query_map(params![role.as_str()], user_row)?;

    let mut users = Vec::new();
    for row in rows {
        users.push(user_from_row(row?)?);
    }
    Ok(users)
}

/// Users awaiting admin approval, oldest first.
pub fn list_pending_approvals(conn: &Connection) -> Result<Vec<User>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, email, role, approval_status, referral_code, created_at
         FROM users WHERE approval_status = 'pending' ORDER BY created_at ASC, rowid ASC",
    )?;
    let rows = stmt.query_map([], user_row)?;

    let mut users = Vec::new();
    for row in rows {
        users.push(user_from_row(row?)?);
    }
    Ok(users)
}

/// Admin approve/reject. Only pending users transition.
pub fn set_approval(
    conn: &Connection,
    user_id: Uuid,
    decision: ApprovalStatus,
) -> Result<(), DatabaseError> {
    if decision == ApprovalStatus::Pending {
        return Err(DatabaseError::ConstraintViolation(
            "Approval decision must be approved or rejected".into(),
        ));
    }
    let changed = conn.execute(
        "UPDATE users SET approval_status = ?1
         WHERE id = ?2 AND approval_status = 'pending'",
        params![decision.as_str(), user_id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Pending user".into(),
            id: user_id.to_string(),
        });
    }
    tracing::info!(user = %user_id, decision = decision.as_str(), "approval decided");
    Ok(())
}

type UserRow = (String, String, String, String, String, Option<String>, String);

fn user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn user_from_row(row: UserRow) -> Result<User, DatabaseError> {
    let (id, name, email, role, approval, code, created_at) = row;
    Ok(User {
        id: Uuid::parse_str(&id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        name,
        email,
        role: Role::from_str(&role)?,
        approval_status: ApprovalStatus::from_str(&approval)?,
        referral_code: code,
        created_at: NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S%.f")
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    fn register(conn: &Connection, name: &str, role: Role) -> User {
        register_user(
            conn,
            &NewUser {
                name: name.into(),
                email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
                role,
                referral_code: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn patient_is_auto_approved() {
        let conn = open_memory_database().unwrap();
        let user = register(&conn, "Amina", Role::Patient);
        assert_eq!(user.approval_status, ApprovalStatus::Approved);
        assert!(user.referral_code.is_none());
    }

    #[test]
    fn doctor_starts_pending() {
        let conn = open_memory_database().unwrap();
        let user = register(&conn, "Dr Chen", Role::Doctor);
        assert_eq!(user.approval_status, ApprovalStatus::Pending);
    }

    #[test]
    fn agent_gets_referral_code() {
        let conn = open_memory_database().unwrap();
        let agent = register(&conn, "Agent Kofi", Role::Agent);
        let code = agent.referral_code.expect("agent should own a code");
        assert_eq!(code.len(), 8);
    }

    #[test]
    fn get_user_round_trip() {
        let conn = open_memory_database().unwrap();
        let user = register(&conn, "Amina", Role::Patient);
        let fetched = get_user(&conn, user.id).unwrap();
        assert_eq!(fetched.name, "Amina");
        assert_eq!(fetched.role, Role::Patient);
    }

    #[test]
    fn get_user_not_found() {
        let conn = open_memory_database().unwrap();
        let err = get_user(&conn, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn duplicate_email_rejected() {
        let conn = open_memory_database().unwrap();
        register(&conn, "Amina", Role::Patient);
        let err = register_user(
            &conn,
            &NewUser {
                name: "Amina Two".into(),
                email: "amina@example.com".into(),
                role: Role::Patient,
                referral_code: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::Sqlite(_)));
    }

    #[test]
    fn unknown_referral_code_rolls_back_signup() {
        let conn = open_memory_database().unwrap();
        let err = register_user(
            &conn,
            &NewUser {
                name: "Amina".into(),
                email: "amina@example.com".into(),
                role: Role::Patient,
                referral_code: Some("NOSUCH99".into()),
            },
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));

        // No orphaned user row, and the email is still free.
        assert!(list_users_by_role(&conn, Role::Patient).unwrap().is_empty());
        register(&conn, "Amina", Role::Patient);
    }

    #[test]
    fn valid_referral_code_registers_and_links() {
        let conn = open_memory_database().unwrap();
        let agent = register(&conn, "Agent Kofi", Role::Agent);
        let code = agent.referral_code.clone().unwrap();

        let patient = register_user(
            &conn,
            &NewUser {
                name: "Amina".into(),
                email: "amina@example.com".into(),
                role: Role::Patient,
                referral_code: Some(code),
            },
        )
        .unwrap();

        let referred = referrals::referrals_for_agent(&conn, agent.id).unwrap();
        assert_eq!(referred.len(), 1);
        assert_eq!(referred[0].referred_user_id, patient.id);
    }

    #[test]
    fn list_users_by_role_filters() {
        let conn = open_memory_database().unwrap();
        register(&conn, "Amina", Role::Patient);
        register(&conn, "Dr Chen", Role::Doctor);
        let patients = list_users_by_role(&conn, Role::Patient).unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].name, "Amina");
    }

    #[test]
    fn pending_queue_and_approval() {
        let conn = open_memory_database().unwrap();
        let doctor = register(&conn, "Dr Chen", Role::Doctor);
        register(&conn, "Amina", Role::Patient);

        let pending = list_pending_approvals(&conn).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, doctor.id);

        set_approval(&conn, doctor.id, ApprovalStatus::Approved).unwrap();
        assert!(list_pending_approvals(&conn).unwrap().is_empty());
        assert_eq!(
            get_user(&conn, doctor.id).unwrap().approval_status,
            ApprovalStatus::Approved
        );
    }

    #[test]
    fn approval_only_transitions_pending() {
        let conn = open_memory_database().unwrap();
        let patient = register(&conn, "Amina", Role::Patient);
        let err = set_approval(&conn, patient.id, ApprovalStatus::Rejected).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn approval_decision_cannot_be_pending() {
        let conn = open_memory_database().unwrap();
        let doctor = register(&conn, "Dr Chen", Role::Doctor);
        let err = set_approval(&conn, doctor.id, ApprovalStatus::Pending).unwrap_err();
        assert!(matches!(err, DatabaseError::ConstraintViolation(_)));
    }
}
