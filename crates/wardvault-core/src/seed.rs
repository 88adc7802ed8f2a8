//! Built-in demo dataset used to populate a freshly initialized store.
//!
//! The records here are fixtures, not real patients. Their ids are the only
//! ids the storage layer is ever allowed to auto-heal over: if every record in
//! a store fails to decrypt and every failing id is in [`SEED_RECORD_IDS`],
//! the data is disposable demo content and can be wiped and re-seeded.

use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use crate::records::{CodeStatus, Medication, PatientRecord, TaskStatus, WardTask};

/// Ids of the built-in demo records, in seed order.
pub const SEED_RECORD_IDS: [&str; 5] = [
    "WV-SEED-001",
    "WV-SEED-002",
    "WV-SEED-003",
    "WV-SEED-004",
    "WV-SEED-005",
];

/// True when every id in `ids` belongs to the demo dataset.
pub fn ids_are_seed_subset<'a>(ids: impl IntoIterator<Item = &'a str>) -> bool {
    ids.into_iter().all(|id| SEED_RECORD_IDS.contains(&id))
}

// Task ids must be stable so a re-seed reproduces the dataset exactly.
fn seed_task(n: u128, description: &str) -> WardTask {
    WardTask {
        id: Uuid::from_u128(n),
        description: description.into(),
        due: None,
        status: TaskStatus::Pending,
    }
}

fn med(name: &str, dose: &str, route: &str, schedule: &str) -> Medication {
    Medication {
        name: name.into(),
        dose: dose.into(),
        route: route.into(),
        schedule: schedule.into(),
    }
}

/// The fixed demo dataset. Deterministic: every call returns identical records.
pub fn seed_records() -> Vec<PatientRecord> {
    let dob = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).expect("valid seed date");
    let admitted = |y, m, d, h| {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0)
            .single()
            .expect("valid seed timestamp")
    };

    vec![
        PatientRecord {
            id: SEED_RECORD_IDS[0].into(),
            name: "Amara Okafor".into(),
            date_of_birth: dob(1948, 6, 12),
            ward: "Medical 3".into(),
            bed: "3-04".into(),
            diagnosis: "Community-acquired pneumonia".into(),
            code_status: CodeStatus::FullCode,
            admitted_at: admitted(2025, 2, 27, 14),
            medications: vec![
                med("co-amoxiclav", "1.2 g", "IV", "TDS"),
                med("paracetamol", "1 g", "PO", "QDS PRN"),
            ],
            tasks: vec![
                seed_task(1, "Repeat CXR"),
                seed_task(2, "Chase blood cultures"),
            ],
            handoff_note: Some("Weaning oxygen; aim for room air by Friday.".into()),
        },
        PatientRecord {
            id: SEED_RECORD_IDS[1].into(),
            name: "Dmitri Sokolov".into(),
            date_of_birth: dob(1971, 1, 30),
            ward: "Medical 3".into(),
            bed: "3-07".into(),
            diagnosis: "Decompensated heart failure".into(),
            code_status: CodeStatus::Dnr,
            admitted_at: admitted(2025, 3, 1, 9),
            medications: vec![
                med("furosemide", "80 mg", "IV", "BD"),
                med("bisoprolol", "2.5 mg", "PO", "OD"),
            ],
            tasks: vec![seed_task(3, "Daily weight and fluid balance")],
            handoff_note: Some("Target 1 L negative today; check U&E tomorrow.".into()),
        },
        PatientRecord {
            id: SEED_RECORD_IDS[2].into(),
            name: "Rosa Jimenez".into(),
            date_of_birth: dob(1992, 11, 5),
            ward: "Surgical 2".into(),
            bed: "2-01".into(),
            diagnosis: "Post-op day 1, laparoscopic appendicectomy".into(),
            code_status: CodeStatus::FullCode,
            admitted_at: admitted(2025, 3, 2, 22),
            medications: vec![med("morphine", "5 mg", "SC", "q4h PRN")],
            tasks: vec![
                seed_task(4, "Mobilise with physio"),
                seed_task(5, "Remove drain if output < 30 mL"),
            ],
            handoff_note: None,
        },
        PatientRecord {
            id: SEED_RECORD_IDS[3].into(),
            name: "Henrik Lindqvist".into(),
            date_of_birth: dob(1939, 3, 21),
            ward: "Medical 4".into(),
            bed: "4-11".into(),
            diagnosis: "Delirium on background dementia".into(),
            code_status: CodeStatus::DnrDni,
            admitted_at: admitted(2025, 2, 24, 11),
            medications: vec![med("lorazepam", "0.5 mg", "PO", "PRN agitation")],
            tasks: vec![seed_task(6, "Collateral history from family")],
            handoff_note: Some("Settled with 1:1 nursing overnight.".into()),
        },
        PatientRecord {
            id: SEED_RECORD_IDS[4].into(),
            name: "Priya Raman".into(),
            date_of_birth: dob(1985, 8, 17),
            ward: "Surgical 2".into(),
            bed: "2-09".into(),
            diagnosis: "Cellulitis, left leg".into(),
            code_status: CodeStatus::FullCode,
            admitted_at: admitted(2025, 3, 2, 7),
            medications: vec![med("flucloxacillin", "2 g", "IV", "QDS")],
            tasks: vec![seed_task(7, "Mark erythema border each shift")],
            handoff_note: Some("Switch to oral if afebrile 24 h.".into()),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_is_deterministic() {
        assert_eq!(seed_records(), seed_records());
    }

    #[test]
    fn seed_ids_match_the_id_set() {
        let records = seed_records();
        assert_eq!(records.len(), SEED_RECORD_IDS.len());
        for (record, id) in records.iter().zip(SEED_RECORD_IDS) {
            assert_eq!(record.id, id);
        }
    }

    #[test]
    fn subset_check_rejects_foreign_ids() {
        assert!(ids_are_seed_subset(SEED_RECORD_IDS));
        assert!(ids_are_seed_subset(["WV-SEED-002"]));
        assert!(!ids_are_seed_subset(["WV-SEED-001", "custom-patient-1"]));
        // Vacuously true; callers must handle the empty case themselves.
        assert!(ids_are_seed_subset([]));
    }
}
