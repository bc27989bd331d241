//! Admin and clinical helper flows — refund verification, lab-test
//! suggestion.
//!
//! The flows are deterministic rule checks over data reached through
//! injected capability traits (`ConsultationHistoryProvider`,
//! `WalletBalanceProvider`), so callers can swap the SQLite-backed
//! implementations for anything else. Prompt templates are kept below for
//! a future LLM integration; generation today is rule-based.

use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::models::AppointmentStatus;
use crate::wallet;

// ─── Capability traits ────────────────────────────────────────────────────────

/// A past consultation as seen by the helper flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub appointment_id: Uuid,
    pub facility_name: String,
    pub date: NaiveDate,
    pub status: AppointmentStatus,
}

pub trait ConsultationHistoryProvider {
    fn consultation_history(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<ConsultationRecord>, DatabaseError>;
}

pub trait WalletBalanceProvider {
    fn wallet_balance(&self, user_id: Uuid) -> Result<i64, DatabaseError>;
}

/// SQLite-backed capability implementations.
pub struct SqliteAssistData<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteAssistData<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl ConsultationHistoryProvider for SqliteAssistData<'_> {
    fn consultation_history(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<ConsultationRecord>, DatabaseError> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, f.name, a.date, a.status
             FROM appointments a
             JOIN facilities f ON a.facility_id = f.id
             WHERE a.patient_id = ?1
             ORDER BY a.date DESC",
        )?;
        let rows = stmt.query_map(params![patient_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, facility_name, date, status) = row?;
            records.push(ConsultationRecord {
                appointment_id: Uuid::parse_str(&id)
                    .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
                facility_name,
                date: NaiveDate::parse_from_str(&date, "%Y-%m-%d").unwrap_or_default(),
                status: AppointmentStatus::from_str(&status)?,
            });
        }
        Ok(records)
    }
}

impl WalletBalanceProvider for SqliteAssistData<'_> {
    fn wallet_balance(&self, user_id: Uuid) -> Result<i64, DatabaseError> {
        wallet::balance(self.conn, user_id)
    }
}

// ─── Refund verification ──────────────────────────────────────────────────────

/// Cap on the refund a single cancelled consultation can justify.
pub const MAX_REFUND_PER_CANCELLATION: i64 = 500;

/// How far back a cancelled consultation still counts as refund evidence.
pub const CANCELLATION_EVIDENCE_WINDOW_DAYS: i64 = 90;

/// Structured outcome of a refund check. `approved` means every rule
/// passed; otherwise `reasons` lists what the reviewing admin should look
/// at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundAssessment {
    pub patient_id: Uuid,
    pub claimed_amount: i64,
    pub wallet_balance: i64,
    /// Cancellations inside the evidence window, not all-time.
    pub cancelled_consultations: u32,
    pub approved: bool,
    pub reasons: Vec<String>,
}

/// Verifies a refund claim against consultation history and wallet
/// balance. Deterministic; never free text. Only cancellations within
/// [`CANCELLATION_EVIDENCE_WINDOW_DAYS`] of `today` count as evidence;
/// cancelled appointments still in the future count too.
pub fn verify_refund_request(
    history: &impl ConsultationHistoryProvider,
    balances: &impl WalletBalanceProvider,
    patient_id: Uuid,
    claimed_amount: i64,
    today: NaiveDate,
) -> Result<RefundAssessment, DatabaseError> {
    let consultations = history.consultation_history(patient_id)?;
    let balance = balances.wallet_balance(patient_id)?;
    let horizon = today - chrono::Duration::days(CANCELLATION_EVIDENCE_WINDOW_DAYS);
    let cancelled = consultations
        .iter()
        .filter(|c| c.status == AppointmentStatus::Cancelled && c.date >= horizon)
        .count() as u32;

    let mut reasons = Vec::new();
    if claimed_amount <= 0 {
        reasons.push("Claimed amount must be positive".to_string());
    }
    if cancelled == 0 {
        reasons.push(format!(
            "No cancelled consultation within the last {CANCELLATION_EVIDENCE_WINDOW_DAYS} days"
        ));
    }
    let cap = i64::from(cancelled) * MAX_REFUND_PER_CANCELLATION;
    if cancelled > 0 && claimed_amount > cap {
        reasons.push(format!(
            "Claimed amount {claimed_amount} exceeds the cap of {cap} for {cancelled} cancellation(s)"
        ));
    }

    let approved = reasons.is_empty();
    tracing::info!(patient = %patient_id, claimed_amount, approved, "refund claim assessed");

    Ok(RefundAssessment {
        patient_id,
        claimed_amount,
        wallet_balance: balance,
        cancelled_consultations: cancelled,
        approved,
        reasons,
    })
}

// ─── Lab-test suggestion ──────────────────────────────────────────────────────

/// A suggested lab test with the symptom keywords that triggered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabTestSuggestion {
    pub test_name: String,
    pub matched_symptoms: Vec<String>,
}

/// Symptom keyword → test panel table. Intentionally coarse; a clinician
/// reviews every suggestion.
const SYMPTOM_TESTS: &[(&str, &[&str])] = &[
    ("fatigue", &["Complete Blood Count", "Thyroid Panel"]),
    ("fever", &["Complete Blood Count", "Malaria Smear"]),
    ("thirst", &["Fasting Blood Glucose", "HbA1c"]),
    ("urination", &["Fasting Blood Glucose", "Urinalysis"]),
    ("chest pain", &["Lipid Panel", "ECG"]),
    ("headache", &["Blood Pressure Check"]),
    ("dizziness", &["Blood Pressure Check", "Complete Blood Count"]),
    ("weight loss", &["Thyroid Panel", "HbA1c"]),
];

/// Maps reported symptoms to suggested tests, ranked by how many symptoms
/// point at each test. Unrecognized symptoms are ignored.
pub fn suggest_lab_tests(symptoms: &[&str]) -> Vec<LabTestSuggestion> {
    let mut suggestions: Vec<LabTestSuggestion> = Vec::new();

    for symptom in symptoms {
        let needle = symptom.trim().to_lowercase();
        if needle.is_empty() {
            continue;
        }
        for (keyword, tests) in SYMPTOM_TESTS {
            if !needle.contains(keyword) {
                continue;
            }
            for test in *tests {
                match suggestions.iter_mut().find(|s| s.test_name == *test) {
                    Some(existing) => {
                        if !existing.matched_symptoms.iter().any(|m| m == symptom) {
                            existing.matched_symptoms.push(symptom.to_string());
                        }
                    }
                    None => suggestions.push(LabTestSuggestion {
                        test_name: test.to_string(),
                        matched_symptoms: vec![symptom.to_string()],
                    }),
                }
            }
        }
    }

    suggestions.sort_by(|a, b| {
        b.matched_symptoms
            .len()
            .cmp(&a.matched_symptoms.len())
            .then_with(|| a.test_name.cmp(&b.test_name))
    });
    suggestions
}

// ─── Prompts (ready for future LLM integration) ───────────────────────────────

/// Prompt template for LLM-backed refund verification. Currently unused —
/// verification is rule-based above.
#[allow(dead_code)]
pub const REFUND_VERIFICATION_PROMPT: &str = r#"
You are helping an administrator verify a patient refund claim.

RULES:
- Base your assessment ONLY on the data below
- Output a decision and the evidence for it
- NEVER invent consultations or balances

CONSULTATION HISTORY:
{consultations}

WALLET BALANCE:
{balance}

CLAIMED AMOUNT:
{amount}

Output format (JSON):
{"approved": true/false, "reasons": ["..."]}
"#;

/// Prompt template for LLM-backed lab-test suggestion. Currently unused —
/// suggestion uses the keyword table above.
#[allow(dead_code)]
pub const LAB_TEST_SUGGESTION_PROMPT: &str = r#"
You are helping a clinician choose lab tests for reported symptoms.

RULES:
- Suggest at most 5 tests, ranked by relevance
- NEVER diagnose; tests only
- Flag anything urgent for immediate review

REPORTED SYMPTOMS:
{symptoms}

Output format (JSON array):
[{"test_name": "...", "matched_symptoms": ["..."]}]
"#;
