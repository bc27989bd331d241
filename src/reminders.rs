//! Medication and appointment reminders.
//!
//! Due-listing is a filter over stored date strings: a reminder is due when
//! its date is on or before today and it has not been dismissed. Rows whose
//! date fails to parse are skipped, never surfaced as errors.

use std::str::FromStr;

use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Reminder, ReminderKind};

/// Request to create a reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReminder {
    pub user_id: Uuid,
    pub kind: ReminderKind,
    pub text: String,
    /// YYYY-MM-DD.
    pub due_date: String,
    /// Optional HH:MM.
    pub due_time: Option<String>,
}

pub fn create_reminder(conn: &Connection, new: &NewReminder) -> Result<Reminder, DatabaseError> {
    let id = Uuid::new_v4();
    let created_at = Local::now().naive_local();
    conn.execute(
        "INSERT INTO reminders (id, user_id, kind, text, due_date, due_time, dismissed, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
        params![
            id.to_string(),
            new.user_id.to_string(),
            new.kind.as_str(),
            new.text,
            new.due_date,
            new.due_time,
            created_at.to_string(),
        ],
    )?;
    Ok(Reminder {
        id,
        user_id: new.user_id,
        kind: new.kind,
        text: new.text.clone(),
        due_date: new.due_date.clone(),
        due_time: new.due_time.clone(),
        dismissed: false,
        created_at,
    })
}

/// All of a user's reminders, soonest due date first.
pub fn list_reminders(conn: &Connection, user_id: Uuid) -> Result<Vec<Reminder>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, kind, text, due_date, due_time, dismissed, created_at
         FROM reminders WHERE user_id = ?1
         ORDER BY due_date ASC, due_time ASC",
    )?;
    let rows = stmt.query_map(params![user_id.to_string()], reminder_row)?;

    let mut reminders = Vec::new();
    for row in rows {
        reminders.push(reminder_from_row(row?)?);
    }
    Ok(reminders)
}

/// Reminders due on or before `today`, dismissed ones excluded. Rows with
/// unparseable dates are skipped.
pub fn due_reminders(
    conn: &Connection,
    user_id: Uuid,
    today: NaiveDate,
) -> Result<Vec<Reminder>, DatabaseError> {
    let all = list_reminders(conn, user_id)?;
    Ok(all
        .into_iter()
        .filter(|r| !r.dismissed)
        .filter(|r| {
            NaiveDate::parse_from_str(&r.due_date, "%Y-%m-%d")
                .map(|due| due <= today)
                .unwrap_or(false)
        })
        .collect())
}

pub fn dismiss_reminder(conn: &Connection, reminder_id: Uuid) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE reminders SET dismissed = 1 WHERE id = ?1",
        params![reminder_id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Reminder".into(),
            id: reminder_id.to_string(),
        });
    }
    Ok(())
}

type ReminderRow = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    i32,
    String,
);

fn reminder_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReminderRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn reminder_from_row(row: ReminderRow) -> Result<Reminder, DatabaseError> {
    let (id, user_id, kind, text, due_date, due_time, dismissed, created_at) = row;
    Ok(Reminder {
        id: Uuid::parse_str(&id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        user_id: Uuid::parse_str(&user_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        kind: ReminderKind::from_str(&kind)?,
        text,
        due_date,
        due_time,
        dismissed: dismissed != 0,
        created_at: NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S%.f")
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::models::Role;
    use crate::users::{register_user, NewUser};

    fn patient(conn: &Connection) -> Uuid {
        register_user(
            conn,
            &NewUser {
                name: "Amina".into(),
                email: "amina@example.com".into(),
                role: Role::Patient,
                referral_code: None,
            },
        )
        .unwrap()
        .id
    }

    fn reminder(user_id: Uuid, text: &str, due_date: &str) -> NewReminder {
        NewReminder {
            user_id,
            kind: ReminderKind::Medication,
            text: text.into(),
            due_date: due_date.into(),
            due_time: Some("08:00".into()),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    #[test]
    fn create_and_list() {
        let conn = open_memory_database().unwrap();
        let user = patient(&conn);
        create_reminder(&conn, &reminder(user, "Take Metformin", "2026-03-05")).unwrap();
        create_reminder(&conn, &reminder(user, "Refill Lisinopril", "2026-03-01")).unwrap();

        let all = list_reminders(&conn, user).unwrap();
        assert_eq!(all.len(), 2);
        // Soonest first
        assert_eq!(all[0].text, "Refill Lisinopril");
    }

    #[test]
    fn due_includes_today_and_overdue() {
        let conn = open_memory_database().unwrap();
        let user = patient(&conn);
        create_reminder(&conn, &reminder(user, "overdue", "2026-02-27")).unwrap();
        create_reminder(&conn, &reminder(user, "today", "2026-03-02")).unwrap();
        create_reminder(&conn, &reminder(user, "future", "2026-03-09")).unwrap();

        let due = due_reminders(&conn, user, today()).unwrap();
        let texts: Vec<&str> = due.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, vec!["overdue", "today"]);
    }

    #[test]
    fn unparseable_due_date_is_skipped() {
        let conn = open_memory_database().unwrap();
        let user = patient(&conn);
        create_reminder(&conn, &reminder(user, "bad date", "soonish")).unwrap();
        create_reminder(&conn, &reminder(user, "good", "2026-03-01")).unwrap();

        let due = due_reminders(&conn, user, today()).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].text, "good");
    }

    #[test]
    fn dismissed_reminders_are_not_due() {
        let conn = open_memory_database().unwrap();
        let user = patient(&conn);
        let created = create_reminder(&conn, &reminder(user, "done", "2026-03-01")).unwrap();
        dismiss_reminder(&conn, created.id).unwrap();

        assert!(due_reminders(&conn, user, today()).unwrap().is_empty());
        // Still listed, flagged dismissed
        let all = list_reminders(&conn, user).unwrap();
        assert!(all[0].dismissed);
    }

    #[test]
    fn dismiss_missing_reminder() {
        let conn = open_memory_database().unwrap();
        let err = dismiss_reminder(&conn, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
