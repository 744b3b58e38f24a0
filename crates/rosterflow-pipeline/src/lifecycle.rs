//! File lifecycle: pending → processed | rejected.

use std::sync::Arc;

use chrono::Utc;
use rosterflow_core::models::{Placement, RowSnapshot};
use rosterflow_core::{AppError, Notification, Notifier};
use rosterflow_db::{CandidateStore, PlacementStore};
use rosterflow_table::{
    decode_payload, parse_table, CanonicalField, CellValue, FieldResolver, Table,
};
use uuid::Uuid;

use crate::provision::{AccountProvisioner, ProvisionOutcome, RowError};

/// Result of an approval run.
#[derive(Debug, Default)]
pub struct ApproveOutcome {
    pub created: i32,
    pub skipped: i32,
    pub errors: Vec<RowError>,
    /// True when the file was already terminal and nothing was reprocessed.
    pub already_processed: bool,
}

impl From<ProvisionOutcome> for ApproveOutcome {
    fn from(outcome: ProvisionOutcome) -> Self {
        Self {
            created: outcome.created,
            skipped: outcome.skipped,
            errors: outcome.errors,
            already_processed: false,
        }
    }
}

/// Owns the per-file status state machine and the structured snapshot cache.
pub struct FileLifecycleManager {
    placements: Arc<dyn PlacementStore>,
    provisioner: AccountProvisioner,
    notifier: Arc<dyn Notifier>,
}

impl FileLifecycleManager {
    pub fn new(
        placements: Arc<dyn PlacementStore>,
        candidates: Arc<dyn CandidateStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            placements,
            provisioner: AccountProvisioner::new(candidates),
            notifier,
        }
    }

    /// Approve a pending file: decode, parse, provision accounts, cache the
    /// structured snapshots, then transition exactly that record to
    /// processed.
    ///
    /// A terminal file is reported as already processed without touching it.
    /// Decode/parse failures leave the record pending and surface as
    /// [`AppError::FileProcessing`].
    #[tracing::instrument(skip(self), fields(lifecycle.operation = "approve"))]
    pub async fn approve(
        &self,
        placement_id: Uuid,
        file_id: Uuid,
    ) -> Result<ApproveOutcome, AppError> {
        let placement = self.placements.get_placement(placement_id).await?;
        let file = placement
            .file_by_id(file_id)
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))?;

        if file.is_terminal() {
            tracing::info!(status = ?file.status, "File already terminal; approval is a no-op");
            return Ok(ApproveOutcome {
                already_processed: true,
                ..ApproveOutcome::default()
            });
        }

        let payload = file
            .file_data
            .as_deref()
            .ok_or_else(|| AppError::file_processing(file_id, "file has no stored data"))?;

        let (bytes, _mime) =
            decode_payload(payload).map_err(|e| AppError::file_processing(file_id, e))?;
        let table =
            parse_table(&bytes, file.format).map_err(|e| AppError::file_processing(file_id, e))?;

        let outcome = self
            .provisioner
            .provision_from_rows(&placement, file, &table)
            .await;

        let snapshots = build_snapshots(&placement, file_id, &table);
        self.placements
            .store_file_snapshots(placement_id, file_id, &snapshots)
            .await?;

        let transitioned = self
            .placements
            .mark_file_processed(placement_id, file_id, outcome.created)
            .await?;
        if !transitioned {
            // Another admin finished the same approval first; the provisioning
            // above only skipped existing emails, so nothing was duplicated.
            tracing::info!("File reached a terminal status concurrently");
        }

        self.notify_best_effort(Notification {
            title: "Roster file approved".to_string(),
            message: format!(
                "{}: {} account(s) created, {} skipped, {} row error(s)",
                file.display_name(),
                outcome.created,
                outcome.skipped,
                outcome.errors.len()
            ),
            kind: "placement_file".to_string(),
            role: "placement".to_string(),
            related_id: Some(placement_id),
            created_by: None,
        })
        .await;

        Ok(outcome.into())
    }

    /// Reject a pending file. Candidate data is untouched. Returns whether
    /// the transition happened; a terminal file is left as-is.
    #[tracing::instrument(skip(self), fields(lifecycle.operation = "reject"))]
    pub async fn reject(&self, placement_id: Uuid, file_id: Uuid) -> Result<bool, AppError> {
        let placement = self.placements.get_placement(placement_id).await?;
        let file = placement
            .file_by_id(file_id)
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))?;

        if file.is_terminal() {
            tracing::info!(status = ?file.status, "File already terminal; rejection is a no-op");
            return Ok(false);
        }

        let rejected = self
            .placements
            .mark_file_rejected(placement_id, file_id)
            .await?;

        if rejected {
            self.notify_best_effort(Notification {
                title: "Roster file rejected".to_string(),
                message: format!("{} was rejected", file.display_name()),
                kind: "placement_file".to_string(),
                role: "placement".to_string(),
                related_id: Some(placement_id),
                created_by: None,
            })
            .await;
        }

        Ok(rejected)
    }

    async fn notify_best_effort(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify(notification).await {
            tracing::warn!(error = %e, "Notification delivery failed");
        }
    }
}

/// Resolve every row into its denormalized snapshot, keeping the raw mapping
/// for audit.
fn build_snapshots(placement: &Placement, file_id: Uuid, table: &Table) -> Vec<RowSnapshot> {
    table
        .rows
        .iter()
        .enumerate()
        .map(|(row_index, row)| RowSnapshot {
            row_index: row_index as i32,
            student_id: FieldResolver::resolve_text(row, CanonicalField::StudentId),
            name: FieldResolver::resolve_text(row, CanonicalField::Name),
            college: FieldResolver::resolve_text(row, CanonicalField::College),
            email: FieldResolver::resolve_text(row, CanonicalField::Email),
            phone: FieldResolver::resolve_text(row, CanonicalField::Phone),
            course: FieldResolver::resolve_text(row, CanonicalField::Course),
            password: FieldResolver::resolve_text(row, CanonicalField::Password),
            credits_assigned: FieldResolver::resolve_credits(row),
            raw: row_to_json(&table.headers, row),
            placement_id: placement.id,
            file_id,
            captured_at: Utc::now(),
        })
        .collect()
}

fn row_to_json(headers: &[String], row: &rosterflow_table::Row) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for header in headers {
        if header.is_empty() {
            continue;
        }
        let value = match row.get(header) {
            Some(CellValue::Text(s)) => serde_json::Value::String(s.clone()),
            Some(CellValue::Number(n)) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Some(CellValue::Empty) | None => serde_json::Value::Null,
        };
        map.insert(header.clone(), value);
    }
    serde_json::Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{
        placement_with_csv_file, store_with, FailingNotifier, RecordingNotifier,
    };
    use rosterflow_core::models::FileStatus;

    const ROSTER: &[u8] =
        b"Name,Email,Password,Credits\nAsha,asha@example.com,pw1,50\nRavi,ravi@example.com,,60\nMeena,meena@example.com,pw3,70\n";

    fn manager(
        store: &std::sync::Arc<rosterflow_db::MemoryStore>,
        notifier: Arc<dyn Notifier>,
    ) -> FileLifecycleManager {
        FileLifecycleManager::new(store.clone(), store.clone(), notifier)
    }

    #[tokio::test]
    async fn approve_provisions_and_transitions() {
        let store = store_with();
        let notifier = Arc::new(RecordingNotifier::default());
        let (placement, file_id) = placement_with_csv_file(&store, ROSTER, 0);

        let outcome = manager(&store, notifier.clone())
            .approve(placement.id, file_id)
            .await
            .unwrap();

        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(outcome.errors.len(), 1);
        assert!(!outcome.already_processed);

        let stored = store.get_placement(placement.id).await.unwrap();
        let file = stored.file_by_id(file_id).unwrap();
        assert_eq!(file.status, FileStatus::Processed);
        assert_eq!(file.candidates_created, 2);
        assert!(file.processed_at.is_some());
        // Snapshot cache covers every source row, including the errored one.
        assert_eq!(file.record_count, 3);
        assert_eq!(file.structured_data.len(), 3);
        assert_eq!(file.structured_data[1].password, None);
        assert_eq!(
            file.structured_data[0].email.as_deref(),
            Some("asha@example.com")
        );
        assert_eq!(file.structured_data[0].raw["Name"], "Asha");

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].message.contains("2 account(s) created"));
    }

    #[tokio::test]
    async fn reapprove_is_a_no_op() {
        let store = store_with();
        let notifier = Arc::new(RecordingNotifier::default());
        let (placement, file_id) = placement_with_csv_file(&store, ROSTER, 0);
        let manager = manager(&store, notifier);

        manager.approve(placement.id, file_id).await.unwrap();
        let first = store.get_placement(placement.id).await.unwrap();
        let first_processed_at = first.file_by_id(file_id).unwrap().processed_at;

        let second = manager.approve(placement.id, file_id).await.unwrap();
        assert!(second.already_processed);
        assert_eq!(second.created, 0);

        let after = store.get_placement(placement.id).await.unwrap();
        assert_eq!(
            after.file_by_id(file_id).unwrap().processed_at,
            first_processed_at
        );
        assert_eq!(store.candidates_by_placement(placement.id).len(), 2);
    }

    #[tokio::test]
    async fn malformed_payload_leaves_file_pending() {
        let store = store_with();
        let (mut placement, file_id) = placement_with_csv_file(&store, ROSTER, 0);
        placement.file_by_id_mut(file_id).unwrap().file_data =
            Some("not a data url".to_string());
        store.add_placement(placement.clone());

        let err = manager(&store, Arc::new(RecordingNotifier::default()))
            .approve(placement.id, file_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileProcessing { .. }));

        let stored = store.get_placement(placement.id).await.unwrap();
        assert_eq!(stored.file_by_id(file_id).unwrap().status, FileStatus::Pending);
        assert!(store.candidates_by_placement(placement.id).is_empty());
    }

    #[tokio::test]
    async fn unparseable_bytes_leave_file_pending() {
        let store = store_with();
        let (placement, file_id) = placement_with_csv_file(&store, b"", 0);

        let err = manager(&store, Arc::new(RecordingNotifier::default()))
            .approve(placement.id, file_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::FileProcessing { .. }));

        let stored = store.get_placement(placement.id).await.unwrap();
        assert_eq!(stored.file_by_id(file_id).unwrap().status, FileStatus::Pending);
    }

    #[tokio::test]
    async fn reject_is_terminal_and_leaves_candidates_alone() {
        let store = store_with();
        let notifier = Arc::new(RecordingNotifier::default());
        let (placement, file_id) = placement_with_csv_file(&store, ROSTER, 0);
        let manager = manager(&store, notifier.clone());

        assert!(manager.reject(placement.id, file_id).await.unwrap());
        let stored = store.get_placement(placement.id).await.unwrap();
        assert_eq!(stored.file_by_id(file_id).unwrap().status, FileStatus::Rejected);
        assert!(store.candidates_by_placement(placement.id).is_empty());

        // Second rejection and approval are both refused.
        assert!(!manager.reject(placement.id, file_id).await.unwrap());
        let outcome = manager.approve(placement.id, file_id).await.unwrap();
        assert!(outcome.already_processed);
        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_approval() {
        let store = store_with();
        let (placement, file_id) = placement_with_csv_file(&store, ROSTER, 0);

        let outcome = manager(&store, Arc::new(FailingNotifier))
            .approve(placement.id, file_id)
            .await
            .unwrap();
        assert_eq!(outcome.created, 2);
    }

    #[tokio::test]
    async fn unknown_file_is_not_found() {
        let store = store_with();
        let (placement, _file_id) = placement_with_csv_file(&store, ROSTER, 0);

        let err = manager(&store, Arc::new(RecordingNotifier::default()))
            .approve(placement.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
