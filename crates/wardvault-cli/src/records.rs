use color_eyre::Result;
use wardvault_core::{
    records::{PatientRecord, TaskStatus},
    store::RecordStore,
};

use crate::storage::friendly_error;

/// Print the decrypted ward list.
pub async fn list<S: RecordStore>(store: &S) -> Result<()> {
    let records = store.all_records().await.map_err(friendly_error)?;
    if records.is_empty() {
        println!("No patients on the ward.");
        return Ok(());
    }
    for record in &records {
        println!("{}", format_record(record));
    }
    Ok(())
}

/// Update (or clear) a patient's handoff note and persist the record.
pub async fn set_note<S: RecordStore>(store: &S, id: &str, text: &str) -> Result<()> {
    let records = store.all_records().await.map_err(friendly_error)?;
    let mut record = records
        .into_iter()
        .find(|r| r.id == id)
        .ok_or_else(|| color_eyre::eyre::eyre!("no record with id {id}"))?;

    record.handoff_note = if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    };
    store.save_record(&record).await.map_err(friendly_error)?;
    println!("Updated note for {} ({})", record.name, record.id);
    Ok(())
}

/// One-line ward list entry plus indented task/medication counts.
pub fn format_record(record: &PatientRecord) -> String {
    let pending = record
        .tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Pending)
        .count();
    let mut out = format!(
        "{} [{} {}] {}: {} (admitted {})",
        record.id,
        record.ward,
        record.bed,
        record.name,
        record.diagnosis,
        record.admitted_at.format("%Y-%m-%d %H:%M"),
    );
    out.push_str(&format!(
        "\n    meds: {}  tasks pending: {}",
        record.medications.len(),
        pending
    ));
    if let Some(note) = &record.handoff_note {
        out.push_str(&format!("\n    note: {note}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use wardvault_core::{seed::SEED_RECORD_IDS, store::InMemoryRecordStore};

    use super::*;

    #[tokio::test]
    async fn set_note_persists_through_the_store() {
        let store = InMemoryRecordStore::new();
        let id = SEED_RECORD_IDS[2];

        set_note(&store, id, "family meeting 14:00").await.expect("set");
        let records = store.all_records().await.expect("read");
        let record = records.iter().find(|r| r.id == id).expect("present");
        assert_eq!(record.handoff_note.as_deref(), Some("family meeting 14:00"));

        set_note(&store, id, "").await.expect("clear");
        let records = store.all_records().await.expect("read");
        let record = records.iter().find(|r| r.id == id).expect("present");
        assert_eq!(record.handoff_note, None);
    }

    #[tokio::test]
    async fn set_note_rejects_unknown_ids() {
        let store = InMemoryRecordStore::new();
        let err = set_note(&store, "MRN-nope", "x").await.expect_err("unknown id");
        assert!(err.to_string().contains("MRN-nope"));
    }

    #[tokio::test]
    async fn format_includes_pending_task_count_and_note() {
        let store = InMemoryRecordStore::new();
        let records = store.all_records().await.expect("read");
        let amara = records
            .iter()
            .find(|r| r.id == SEED_RECORD_IDS[0])
            .expect("seeded");

        let line = format_record(amara);
        assert!(line.contains("Amara Okafor"));
        assert!(line.contains("tasks pending: 2"));
        assert!(line.contains("note: Weaning oxygen"));
    }
}
