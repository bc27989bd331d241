//! Facility directory — doctors, pharmacies, labs.
//!
//! Facilities carry an operating schedule (weekday list + raw hours-range
//! string) and an approval status. Patients only see approved facilities;
//! directory cards are decorated with the current opening status from
//! `opening_hours`.

use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::{ApprovalStatus, Facility, FacilityKind};
use crate::opening_hours::{self, OperatingSchedule};

/// Request to register a facility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFacility {
    pub owner_id: Option<Uuid>,
    pub name: String,
    pub kind: FacilityKind,
    pub address: Option<String>,
    pub days: Vec<String>,
    pub hours_range: String,
}

/// Directory card: facility plus its opening-status badge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityCard {
    pub id: Uuid,
    pub name: String,
    pub kind: FacilityKind,
    pub address: Option<String>,
    pub is_open: bool,
    pub status: String,
}

/// Registers a facility. It stays out of the patient directory until an
/// admin approves it.
pub fn create_facility(conn: &Connection, new: &NewFacility) -> Result<Facility, DatabaseError> {
    let id = Uuid::new_v4();
    let created_at = Local::now().naive_local();
    conn.execute(
        "INSERT INTO facilities (id, owner_id, name, kind, address, days, hours_range,
                                 approval_status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'pending', ?8)",
        params![
            id.to_string(),
            new.owner_id.map(|o| o.to_string()),
            new.name,
            new.kind.as_str(),
            new.address,
            join_days(&new.days),
            new.hours_range,
            created_at.to_string(),
        ],
    )?;

    tracing::info!(%id, kind = new.kind.as_str(), "facility registered");

    Ok(Facility {
        id,
        owner_id: new.owner_id,
        name: new.name.clone(),
        kind: new.kind,
        address: new.address.clone(),
        days: new.days.clone(),
        hours_range: new.hours_range.clone(),
        approval_status: ApprovalStatus::Pending,
        created_at,
    })
}

pub fn get_facility(conn: &Connection, facility_id: Uuid) -> Result<Facility, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, owner_id, name, kind, address, days, hours_range,
                    approval_status, created_at
             FROM facilities WHERE id = ?1",
            params![facility_id.to_string()],
            facility_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DatabaseError::NotFound {
                entity_type: "Facility".into(),
                id: facility_id.to_string(),
            },
            other => DatabaseError::from(other),
        })?;
    facility_from_row(row)
}

/// Approved facilities of a kind, alphabetical.
pub fn list_facilities(
    conn: &Connection,
    kind: FacilityKind,
) -> Result<Vec<Facility>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, name, kind, address, days, hours_range,
                approval_status, created_at
         FROM facilities
         WHERE kind = ?1 AND approval_status = 'approved'
         ORDER BY name ASC",
    )?;
    let rows = stmt.query_map(params![kind.as_str()], facility_row)?;

    let mut facilities = Vec::new();
    for row in rows {
        facilities.push(facility_from_row(row?)?);
    }
    Ok(facilities)
}

/// Facilities awaiting admin approval, oldest first.
pub fn list_pending_facilities(conn: &Connection) -> Result<Vec<Facility>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, owner_id, name, kind, address, days, hours_range,
                approval_status, created_at
         FROM facilities
         WHERE approval_status = 'pending'
         ORDER BY created_at ASC, rowid ASC",
    )?;
    let rows = stmt.query_map([], facility_row)?;

    let mut facilities = Vec::new();
    for row in rows {
        facilities.push(facility_from_row(row?)?);
    }
    Ok(facilities)
}

/// Admin approve/reject. Only pending facilities transition.
pub fn set_approval(
    conn: &Connection,
    facility_id: Uuid,
    decision: ApprovalStatus,
) -> Result<(), DatabaseError> {
    if decision == ApprovalStatus::Pending {
        return Err(DatabaseError::ConstraintViolation(
            "Approval decision must be approved or rejected".into(),
        ));
    }
    let changed = conn.execute(
        "UPDATE facilities SET approval_status = ?1
         WHERE id = ?2 AND approval_status = 'pending'",
        params![decision.as_str(), facility_id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Pending facility".into(),
            id: facility_id.to_string(),
        });
    }
    tracing::info!(facility = %facility_id, decision = decision.as_str(), "facility approval decided");
    Ok(())
}

/// Replaces a facility's operating schedule. The hours string is stored as
/// given; a malformed value is legal and renders as "Hours not listed".
pub fn update_schedule(
    conn: &Connection,
    facility_id: Uuid,
    schedule: &OperatingSchedule,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE facilities SET days = ?1, hours_range = ?2 WHERE id = ?3",
        params![
            join_days(&schedule.days),
            schedule.hours_range,
            facility_id.to_string(),
        ],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Facility".into(),
            id: facility_id.to_string(),
        });
    }
    Ok(())
}

/// One facility with its opening-status badge at `now`.
pub fn facility_card(
    conn: &Connection,
    facility_id: Uuid,
    now: NaiveDateTime,
) -> Result<FacilityCard, DatabaseError> {
    let facility = get_facility(conn, facility_id)?;
    Ok(card_for(&facility, now))
}

/// Approved facilities of a kind, each decorated with its opening status
/// at `now`.
pub fn list_facility_cards(
    conn: &Connection,
    kind: FacilityKind,
    now: NaiveDateTime,
) -> Result<Vec<FacilityCard>, DatabaseError> {
    let facilities = list_facilities(conn, kind)?;
    Ok(facilities.iter().map(|f| card_for(f, now)).collect())
}

fn card_for(facility: &Facility, now: NaiveDateTime) -> FacilityCard {
    let status = opening_hours::evaluate_at(&facility.schedule(), now);
    FacilityCard {
        id: facility.id,
        name: facility.name.clone(),
        kind: facility.kind,
        address: facility.address.clone(),
        is_open: status.is_open(),
        status: status.as_str().to_string(),
    }
}

fn join_days(days: &[String]) -> String {
    days.join(",")
}

fn split_days(days: &str) -> Vec<String> {
    days.split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}

type FacilityRow = (
    String,
    Option<String>,
    String,
    String,
    Option<String>,
    String,
    String,
    String,
    String,
);

fn facility_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FacilityRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn facility_from_row(row: FacilityRow) -> Result<Facility, DatabaseError> {
    let (id, owner_id, name, kind, address, days, hours_range, approval, created_at) = row;
    Ok(Facility {
        id: Uuid::parse_str(&id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        owner_id: owner_id.and_then(|o| Uuid::parse_str(&o).ok()),
        name,
        kind: FacilityKind::from_str(&kind)?,
        address,
        days: split_days(&days),
        hours_range,
        approval_status: ApprovalStatus::from_str(&approval)?,
        created_at: NaiveDateTime::parse_from_str(&created_at, "%Y-%m-%d %H:%M:%S%.f")
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use chrono::NaiveDate;

    fn weekday_hours(days: &[&str], hours: &str) -> NewFacility {
        NewFacility {
            owner_id: None,
            name: "City Pharmacy".into(),
            kind: FacilityKind::Pharmacy,
            address: Some("12 Harbour Rd".into()),
            days: days.iter().map(|d| d.to_string()).collect(),
            hours_range: hours.into(),
        }
    }

    /// 2026-03-02 is a Monday.
    fn monday_at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 2)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn approved(conn: &Connection, new: &NewFacility) -> Facility {
        let facility = create_facility(conn, new).unwrap();
        set_approval(conn, facility.id, ApprovalStatus::Approved).unwrap();
        get_facility(conn, facility.id).unwrap()
    }

    #[test]
    fn create_and_get_round_trip() {
        let conn = open_memory_database().unwrap();
        let created =
            create_facility(&conn, &weekday_hours(&["Monday", "Tuesday"], "9:00 AM - 5:00 PM"))
                .unwrap();
        let fetched = get_facility(&conn, created.id).unwrap();
        assert_eq!(fetched.name, "City Pharmacy");
        assert_eq!(fetched.kind, FacilityKind::Pharmacy);
        assert_eq!(fetched.days, vec!["Monday", "Tuesday"]);
        assert_eq!(fetched.hours_range, "9:00 AM - 5:00 PM");
        assert_eq!(fetched.approval_status, ApprovalStatus::Pending);
    }

    #[test]
    fn get_facility_not_found() {
        let conn = open_memory_database().unwrap();
        let err = get_facility(&conn, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn directory_shows_only_approved() {
        let conn = open_memory_database().unwrap();
        create_facility(&conn, &weekday_hours(&["Monday"], "9:00 AM - 5:00 PM")).unwrap();
        let listed = list_facilities(&conn, FacilityKind::Pharmacy).unwrap();
        assert!(listed.is_empty());

        let facility = approved(&conn, &weekday_hours(&["Monday"], "9:00 AM - 5:00 PM"));
        let listed = list_facilities(&conn, FacilityKind::Pharmacy).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, facility.id);
    }

    #[test]
    fn directory_filters_by_kind() {
        let conn = open_memory_database().unwrap();
        approved(&conn, &weekday_hours(&["Monday"], "9:00 AM - 5:00 PM"));
        assert!(list_facilities(&conn, FacilityKind::Lab).unwrap().is_empty());
    }

    #[test]
    fn pending_queue_then_approve() {
        let conn = open_memory_database().unwrap();
        let facility =
            create_facility(&conn, &weekday_hours(&["Monday"], "9:00 AM - 5:00 PM")).unwrap();

        let pending = list_pending_facilities(&conn).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, facility.id);

        set_approval(&conn, facility.id, ApprovalStatus::Approved).unwrap();
        assert!(list_pending_facilities(&conn).unwrap().is_empty());
    }

    #[test]
    fn rejected_facility_stays_out_of_directory() {
        let conn = open_memory_database().unwrap();
        let facility =
            create_facility(&conn, &weekday_hours(&["Monday"], "9:00 AM - 5:00 PM")).unwrap();
        set_approval(&conn, facility.id, ApprovalStatus::Rejected).unwrap();
        assert!(list_facilities(&conn, FacilityKind::Pharmacy).unwrap().is_empty());
    }

    #[test]
    fn card_open_during_hours() {
        let conn = open_memory_database().unwrap();
        let facility = approved(&conn, &weekday_hours(&["Monday"], "9:00 AM - 5:00 PM"));
        let card = facility_card(&conn, facility.id, monday_at(10, 0)).unwrap();
        assert!(card.is_open);
        assert_eq!(card.status, "Open");
    }

    #[test]
    fn card_closed_after_hours() {
        let conn = open_memory_database().unwrap();
        let facility = approved(&conn, &weekday_hours(&["Monday"], "9:00 AM - 5:00 PM"));
        let card = facility_card(&conn, facility.id, monday_at(18, 0)).unwrap();
        assert!(!card.is_open);
        assert_eq!(card.status, "Closed");
    }

    #[test]
    fn card_with_malformed_hours() {
        let conn = open_memory_database().unwrap();
        let facility = approved(&conn, &weekday_hours(&["Monday"], "call for hours"));
        let card = facility_card(&conn, facility.id, monday_at(10, 0)).unwrap();
        assert!(!card.is_open);
        assert_eq!(card.status, "Hours not listed");
    }

    #[test]
    fn cards_list_decorates_every_facility() {
        let conn = open_memory_database().unwrap();
        approved(&conn, &weekday_hours(&["Monday"], "9:00 AM - 5:00 PM"));
        let mut always_open = weekday_hours(&["Monday"], "24 hours");
        always_open.name = "Night Pharmacy".into();
        approved(&conn, &always_open);

        let cards =
            list_facility_cards(&conn, FacilityKind::Pharmacy, monday_at(22, 0)).unwrap();
        assert_eq!(cards.len(), 2);
        // Alphabetical: City Pharmacy first
        assert_eq!(cards[0].status, "Closed");
        assert_eq!(cards[1].status, "Open 24 Hours");
    }

    #[test]
    fn update_schedule_changes_card() {
        let conn = open_memory_database().unwrap();
        let facility = approved(&conn, &weekday_hours(&["Monday"], "9:00 AM - 5:00 PM"));

        update_schedule(
            &conn,
            facility.id,
            &OperatingSchedule::new(vec!["Monday".into()], "9:00 AM - 9:00 PM"),
        )
        .unwrap();

        let card = facility_card(&conn, facility.id, monday_at(18, 0)).unwrap();
        assert!(card.is_open);
    }

    #[test]
    fn update_schedule_missing_facility() {
        let conn = open_memory_database().unwrap();
        let err = update_schedule(
            &conn,
            Uuid::new_v4(),
            &OperatingSchedule::new(vec!["Monday".into()], "24 hours"),
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }
}
