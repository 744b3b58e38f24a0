//! Shared fixtures and recording fakes for pipeline tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rosterflow_core::models::{FileRecord, Placement, TableFormat};
use rosterflow_core::{CreditPush, Notification, Notifier};
use rosterflow_db::MemoryStore;
use rosterflow_table::encode_payload;
use uuid::Uuid;

pub fn store_with() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub fn empty_placement() -> Placement {
    Placement {
        id: Uuid::new_v4(),
        officer_name: "T. Officer".to_string(),
        college: "Example College".to_string(),
        email: "officer@example.edu".to_string(),
        is_approved: true,
        is_active: true,
        credits: 100,
        student_data: None,
        student_data_format: None,
        file_history: Vec::new(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Seed a placement owning one pending CSV file built from `csv` bytes.
/// Returns the placement (as seeded) and the file id.
pub fn placement_with_csv_file(
    store: &Arc<MemoryStore>,
    csv: &[u8],
    file_credits: i32,
) -> (Placement, Uuid) {
    let payload = encode_payload(csv, "text/csv");
    let mut file = FileRecord::new("roster.csv", TableFormat::Csv, payload);
    file.credits = file_credits;
    let file_id = file.id;

    let mut placement = empty_placement();
    placement.file_history.push(file);
    store.add_placement(placement.clone());
    (placement, file_id)
}

/// Notifier fake that records every payload it is handed.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), String> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

/// Notifier fake that always fails delivery.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _notification: Notification) -> Result<(), String> {
        Err("delivery unavailable".to_string())
    }
}

/// Push fake recording each bulk credit update.
#[derive(Default)]
pub struct RecordingPush {
    pub pushes: Mutex<Vec<(Vec<Uuid>, i32)>>,
}

#[async_trait]
impl CreditPush for RecordingPush {
    async fn push_bulk_credit_update(
        &self,
        candidate_ids: &[Uuid],
        new_credits: i32,
    ) -> Result<(), String> {
        self.pushes
            .lock()
            .unwrap()
            .push((candidate_ids.to_vec(), new_credits));
        Ok(())
    }
}
