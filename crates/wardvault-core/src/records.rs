use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resuscitation status shown on the patient banner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CodeStatus {
    FullCode,
    Dnr,
    DnrDni,
    ComfortCare,
}

impl Default for CodeStatus {
    fn default() -> Self {
        CodeStatus::FullCode
    }
}

/// A scheduled medication line on the patient's chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Medication {
    pub name: String,
    pub dose: String,
    pub route: String,
    /// Free-form schedule ("BID", "q8h", "PRN pain").
    pub schedule: String,
}

/// Ward task status lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Done,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

/// A to-do item attached to a patient (bloods, imaging, chase results).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WardTask {
    pub id: Uuid,
    pub description: String,
    pub due: Option<DateTime<Utc>>,
    pub status: TaskStatus,
}

impl WardTask {
    pub fn new(description: String, due: Option<DateTime<Utc>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description,
            due,
            status: TaskStatus::Pending,
        }
    }
}

/// One patient on the ward list. This is the plaintext unit the encrypted
/// store persists; its serde_json encoding is the canonical byte form fed to
/// the cipher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientRecord {
    /// Stable business key (hospital number); doubles as the storage key.
    pub id: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub ward: String,
    pub bed: String,
    pub diagnosis: String,
    pub code_status: CodeStatus,
    /// Admission timestamp; ward lists are shown newest-admission-first.
    pub admitted_at: DateTime<Utc>,
    pub medications: Vec<Medication>,
    pub tasks: Vec<WardTask>,
    pub handoff_note: Option<String>,
}

impl PatientRecord {
    pub fn new(
        id: String,
        name: String,
        date_of_birth: NaiveDate,
        ward: String,
        bed: String,
        diagnosis: String,
        admitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            date_of_birth,
            ward,
            bed,
            diagnosis,
            code_status: CodeStatus::default(),
            admitted_at,
            medications: Vec::new(),
            tasks: Vec::new(),
            handoff_note: None,
        }
    }
}

/// Sort a ward list for display: newest admission first, id as tie-break so
/// the ordering is deterministic.
pub fn sort_for_display(records: &mut [PatientRecord]) {
    records.sort_by(|a, b| {
        b.admitted_at
            .cmp(&a.admitted_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, admitted_at: DateTime<Utc>) -> PatientRecord {
        PatientRecord::new(
            id.into(),
            "Test Patient".into(),
            NaiveDate::from_ymd_opt(1960, 4, 2).expect("valid date"),
            "A".into(),
            "1".into(),
            "observation".into(),
            admitted_at,
        )
    }

    #[test]
    fn serde_round_trip_preserves_all_fields() {
        let mut r = record("P-100", Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
        r.code_status = CodeStatus::Dnr;
        r.medications.push(Medication {
            name: "amoxicillin".into(),
            dose: "500 mg".into(),
            route: "PO".into(),
            schedule: "TDS".into(),
        });
        r.tasks.push(WardTask::new("chase cultures".into(), None));
        r.handoff_note = Some("stable overnight".into());

        let bytes = serde_json::to_vec(&r).expect("serialize");
        let back: PatientRecord = serde_json::from_slice(&bytes).expect("deserialize");
        assert_eq!(back, r);
    }

    #[test]
    fn display_sort_is_newest_first_with_id_tiebreak() {
        let t0 = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2025, 3, 2, 8, 0, 0).unwrap();
        let mut records = vec![record("P-2", t0), record("P-3", t1), record("P-1", t0)];

        sort_for_display(&mut records);

        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["P-3", "P-1", "P-2"]);
    }
}
