//! Appointment booking and lifecycle.
//!
//! Patients book a slot at an approved facility; the requested date must
//! fall on one of the facility's operating weekdays. Lifecycle is
//! `booked → completed | cancelled`, nothing else. Completion credits the
//! patient's Health Points reward and pays the referring agent's commission
//! on the consultation fee (the payment itself is handled elsewhere).

use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{Appointment, AppointmentStatus, ApprovalStatus, TransactionKind};
use crate::{facilities, referrals, wallet};

/// Health Points credited to the patient when an appointment completes.
pub const APPOINTMENT_REWARD_POINTS: i64 = 25;

/// Books an appointment. The facility must be approved and open on the
/// requested weekday; a patient cannot hold the same slot twice.
pub fn book_appointment(
    conn: &Connection,
    patient_id: Uuid,
    facility_id: Uuid,
    date: NaiveDate,
    time_slot: &str,
    reason: Option<&str>,
) -> Result<Appointment, DatabaseError> {
    let facility = facilities::get_facility(conn, facility_id)?;
    if facility.approval_status != ApprovalStatus::Approved {
        return Err(DatabaseError::ConstraintViolation(format!(
            "Facility {} is not approved for booking",
            facility.name
        )));
    }

    let weekday = weekday_name(date);
    let open_that_day = facility
        .days
        .iter()
        .any(|d| d.trim().eq_ignore_ascii_case(weekday));
    if !open_that_day {
        return Err(DatabaseError::ConstraintViolation(format!(
            "{} is closed on {weekday}",
            facility.name
        )));
    }

    let taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM appointments
         WHERE patient_id = ?1 AND facility_id = ?2 AND date = ?3 AND time_slot = ?4",
        params![
            patient_id.to_string(),
            facility_id.to_string(),
            date.to_string(),
            time_slot,
        ],
        |row| row.get(0),
    )?;
    if taken > 0 {
        return Err(DatabaseError::ConstraintViolation(format!(
            "Slot {time_slot} on {date} is already booked"
        )));
    }

    let id = Uuid::new_v4();
    let created_at = Local::now().naive_local();
    conn.execute(
        "INSERT INTO appointments (id, patient_id, facility_id, date, time_slot, status,
                                   reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'booked', ?6, ?7)",
        params![
            id.to_string(),
            patient_id.to_string(),
            facility_id.to_string(),
            date.to_string(),
            time_slot,
            reason,
            created_at.to_string(),
        ],
    )?;

    tracing::info!(appointment = %id, facility = %facility_id, %date, "appointment booked");

    Ok(Appointment {
        id,
        patient_id,
        facility_id,
        date,
        time_slot: time_slot.to_string(),
        status: AppointmentStatus::Booked,
        reason: reason.map(|r| r.to_string()),
        created_at,
    })
}

pub fn get_appointment(
    conn: &Connection,
    appointment_id: Uuid,
) -> Result<Appointment, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, patient_id, facility_id, date, time_slot, status, reason, created_at
             FROM appointments WHERE id = ?1",
            params![appointment_id.to_string()],
            appointment_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
                entity_type: "Appointment".into(),
                id: appointment_id.to_string(),
            },
            other => DatabaseError::from(other),
        })?;
    appointment_from_row(row)
}

/// Cancels a booked appointment.
pub fn cancel_appointment(conn: &Connection, appointment_id: Uuid) -> Result<(), DatabaseError> {
    transition(conn, appointment_id, AppointmentStatus::Cancelled)?;
    tracing::info!(appointment = %appointment_id, "appointment cancelled");
    Ok(())
}

/// Completes a booked appointment: credits the patient's reward points and
/// pays referral commission on the consultation fee.
pub fn complete_appointment(
    conn: &Connection,
    appointment_id: Uuid,
    consultation_fee: i64,
) -> Result<(), DatabaseError> {
    let appointment = get_appointment(conn, appointment_id)?;
    transition(conn, appointment_id, AppointmentStatus::Completed)?;

    wallet::credit(
        conn,
        appointment.patient_id,
        APPOINTMENT_REWARD_POINTS,
        TransactionKind::Earn,
        Some(&format!("appointment {appointment_id} completed")),
    )?;
    referrals::pay_commission(
        conn,
        appointment.patient_id,
        consultation_fee,
        &format!("commission on appointment {appointment_id}"),
    )?;

    tracing::info!(appointment = %appointment_id, consultation_fee, "appointment completed");
    Ok(())
}

/// `booked` is the only state that transitions.
fn transition(
    conn: &Connection,
    appointment_id: Uuid,
    to: AppointmentStatus,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE appointments SET status = ?1 WHERE id = ?2 AND status = 'booked'",
        params![to.as_str(), appointment_id.to_string()],
    )?;
    if changed == 0 {
        // Distinguish a missing row from an invalid transition
        let current = get_appointment(conn, appointment_id)?;
        return Err(DatabaseError::ConstraintViolation(format!(
            "Appointment {appointment_id} is {}, cannot move to {}",
            current.status.as_str(),
            to.as_str()
        )));
    }
    Ok(())
}

/// A patient's appointments, newest date first.
pub fn list_for_patient(
    conn: &Connection,
    patient_id: Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    list_by_column(conn, "patient_id", patient_id)
}

/// A facility's appointments, newest date first.
pub fn list_for_facility(
    conn: &Connection,
    facility_id: Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    list_by_column(conn, "facility_id", facility_id)
}

fn list_by_column(
    conn: &Connection,
    column: &str,
    id: Uuid,
) -> Result<Vec<Appointment>, DatabaseError> {
    let sql = format!(
        "SELECT id, patient_id, facility_id, date, time_slot, status, reason, created_at
         FROM appointments WHERE {column} = ?1
         ORDER BY date DESC, time_slot DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![id.to_string()], appointment_row)?;

    let mut appointments = Vec::new();
    for row in rows {
        appointments.push(appointment_from_row(row?)?);
    }
    Ok(appointments)
}

fn weekday_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        chrono::Weekday::Mon => "Monday",
        chrono::Weekday::Tue => "Tuesday",
        chrono::Weekday::Wed => "Wednesday",
        chrono::Weekday::Thu => "Thursday",
        chrono::Weekday::Fri => "Friday",
        chrono::Weekday::Sat => "Saturday",
        chrono::Weekday::Sun => "Sunday",
    }
}

type AppointmentRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    String,
);

fn appointment_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AppointmentRow> {
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

fn appointment_from_row(row: AppointmentRow) -> Result<Appointment, DatabaseError> {
    let (id, patient_id, facility_id, date, time_slot, status, reason, created_at) = row;
    Ok(Appointment {
        id: Uuid::parse_str(&id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        patient_id: Uuid::parse_str(&patient_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        facility_id: Uuid::parse_str(&facility_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap_or_default(),
        time_slot,
        status: AppointmentStatus::from_str(&status)?,
        reason,
        created_at: NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S%.f")
            .unwrap_or_default(),
    })
}
