//! Credit reconciliation across spreadsheet bytes, file records, the
//! placement record, and candidate accounts.
//!
//! Two deliberately separate operations:
//! - [`CreditReconciler::assign_credits`] overwrites every target with one
//!   officer-chosen value.
//! - [`CreditReconciler::sync_from_spreadsheet`] trusts the per-row values
//!   authored in the files.
//! Neither implies the other; admins invoke them explicitly.

use std::sync::Arc;

use rosterflow_core::models::TableFormat;
use rosterflow_core::{clamp_credits, AppError, CreditPush};
use rosterflow_db::{CandidateStore, PlacementStore};
use rosterflow_table::{
    decode_payload, encode_payload, parse_table, write_table, CanonicalField, FieldResolver,
    TableError,
};
use uuid::Uuid;

/// Which file records an assignment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditScope {
    SingleFile(Uuid),
    AllFiles,
}

/// Result of an officer-level credit assignment.
#[derive(Debug)]
pub struct AssignOutcome {
    /// The value actually written, after clamping.
    pub credits: i32,
    pub files_rewritten: usize,
    pub candidates_updated: usize,
}

/// Result of a spreadsheet-authored sync.
#[derive(Debug, Default)]
pub struct SyncOutcome {
    pub rows_applied: usize,
    /// Rows with no resolvable email plus rows whose email matched no
    /// candidate of this placement.
    pub rows_skipped: usize,
}

pub struct CreditReconciler {
    placements: Arc<dyn PlacementStore>,
    candidates: Arc<dyn CandidateStore>,
    push: Arc<dyn CreditPush>,
}

impl CreditReconciler {
    pub fn new(
        placements: Arc<dyn PlacementStore>,
        candidates: Arc<dyn CandidateStore>,
        push: Arc<dyn CreditPush>,
    ) -> Self {
        Self {
            placements,
            candidates,
            push,
        }
    }

    /// Overwrite credits everywhere the scope reaches.
    ///
    /// Files are rewritten sequentially; a per-file decode/write failure
    /// leaves that file unchanged and processing continues. The candidate
    /// bulk update covers every candidate of the placement regardless of
    /// source file — officer-level scope is coarse on purpose.
    #[tracing::instrument(skip(self), fields(reconcile.operation = "assign"))]
    pub async fn assign_credits(
        &self,
        placement_id: Uuid,
        requested: i32,
        scope: CreditScope,
    ) -> Result<AssignOutcome, AppError> {
        let credits = clamp_credits(requested);
        let placement = self.placements.get_placement(placement_id).await?;

        let targets: Vec<_> = match scope {
            CreditScope::SingleFile(file_id) => {
                let file = placement
                    .file_by_id(file_id)
                    .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))?;
                file.file_data.is_some().then_some(file).into_iter().collect()
            }
            CreditScope::AllFiles => placement.files_with_data().collect(),
        };

        let mut files_rewritten = 0usize;
        for file in targets {
            let payload = file.file_data.as_deref().unwrap_or_default();
            match rewrite_payload(payload, file.format, credits) {
                Ok(rewritten) => {
                    match self
                        .placements
                        .update_file_payload(placement_id, file.id, &rewritten, credits)
                        .await
                    {
                        Ok(()) => files_rewritten += 1,
                        Err(e) => {
                            tracing::error!(error = %e, file_id = %file.id, "File payload update failed");
                        }
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, file_id = %file.id, "File rewrite failed; leaving file unchanged");
                }
            }
        }

        // Legacy single-file payload, rewritten independently of the history.
        if let (Some(payload), Some(format)) =
            (placement.student_data.as_deref(), placement.student_data_format)
        {
            match rewrite_payload(payload, format, credits) {
                Ok(rewritten) => {
                    if let Err(e) = self
                        .placements
                        .update_student_data(placement_id, &rewritten)
                        .await
                    {
                        tracing::error!(error = %e, "Legacy payload update failed");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Legacy payload rewrite failed; leaving it unchanged");
                }
            }
        }

        if scope == CreditScope::AllFiles {
            self.placements
                .set_placement_credits(placement_id, credits)
                .await?;
        }

        let updated_ids = self
            .candidates
            .bulk_update_credits(placement_id, credits)
            .await?;

        if !updated_ids.is_empty() {
            if let Err(e) = self.push.push_bulk_credit_update(&updated_ids, credits).await {
                tracing::warn!(error = %e, "Bulk credit push failed");
            }
        }

        tracing::info!(
            credits,
            files_rewritten,
            candidates_updated = updated_ids.len(),
            "Credit assignment finished"
        );

        Ok(AssignOutcome {
            credits,
            files_rewritten,
            candidates_updated: updated_ids.len(),
        })
    }

    /// Apply the per-row credit/course values authored in the files to the
    /// matching candidates (normalized email within this placement).
    #[tracing::instrument(skip(self), fields(reconcile.operation = "sync"))]
    pub async fn sync_from_spreadsheet(
        &self,
        placement_id: Uuid,
    ) -> Result<SyncOutcome, AppError> {
        let placement = self.placements.get_placement(placement_id).await?;
        let mut outcome = SyncOutcome::default();

        for file in placement.files_with_data() {
            let payload = file.file_data.as_deref().unwrap_or_default();
            let table = match decode_payload(payload)
                .and_then(|(bytes, _)| parse_table(&bytes, file.format))
            {
                Ok(table) => table,
                Err(e) => {
                    tracing::error!(error = %e, file_id = %file.id, "File unreadable during sync; skipping");
                    continue;
                }
            };

            for row in &table.rows {
                let email = match FieldResolver::resolve_text(row, CanonicalField::Email) {
                    Some(email) => email,
                    None => {
                        outcome.rows_skipped += 1;
                        continue;
                    }
                };
                let credits = FieldResolver::resolve_credits(row).map(clamp_credits);
                let course = FieldResolver::resolve_text(row, CanonicalField::Course);

                match self
                    .candidates
                    .update_credits_course_by_email(
                        placement_id,
                        &email,
                        credits,
                        course.as_deref(),
                    )
                    .await
                {
                    Ok(true) => outcome.rows_applied += 1,
                    Ok(false) => outcome.rows_skipped += 1,
                    Err(e) => {
                        tracing::error!(error = %e, email = %email, "Candidate sync update failed");
                        outcome.rows_skipped += 1;
                    }
                }
            }
        }

        tracing::info!(
            rows_applied = outcome.rows_applied,
            rows_skipped = outcome.rows_skipped,
            "Spreadsheet sync finished"
        );

        Ok(outcome)
    }
}

/// decode → parse → rewrite-with-override → encode, preserving the source
/// format and its MIME tag.
fn rewrite_payload(
    payload: &str,
    format: TableFormat,
    credits: i32,
) -> Result<String, TableError> {
    let (bytes, _mime) = decode_payload(payload)?;
    let table = parse_table(&bytes, format)?;
    let rewritten = write_table(&table, format, Some(credits))?;
    Ok(encode_payload(&rewritten, format.mime_type()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::FileLifecycleManager;
    use crate::testutil::{
        empty_placement, placement_with_csv_file, store_with, RecordingNotifier, RecordingPush,
    };
    use rosterflow_core::models::{FileRecord, TableFormat};
    use rosterflow_core::NoOpCreditPush;

    const ROSTER: &[u8] =
        b"Name,Email,Password,Credits\nAsha,asha@example.com,pw1,50\nRavi,ravi@example.com,pw2,60\n";

    fn reconciler(
        store: &std::sync::Arc<rosterflow_db::MemoryStore>,
        push: Arc<dyn CreditPush>,
    ) -> CreditReconciler {
        CreditReconciler::new(store.clone(), store.clone(), push)
    }

    async fn approve_all(
        store: &std::sync::Arc<rosterflow_db::MemoryStore>,
        placement_id: Uuid,
        file_id: Uuid,
    ) {
        FileLifecycleManager::new(
            store.clone(),
            store.clone(),
            Arc::new(RecordingNotifier::default()),
        )
        .approve(placement_id, file_id)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn assign_credits_propagates_everywhere() {
        let store = store_with();
        let push = Arc::new(RecordingPush::default());
        let (placement, file_id) = placement_with_csv_file(&store, ROSTER, 0);
        approve_all(&store, placement.id, file_id).await;

        let outcome = reconciler(&store, push.clone())
            .assign_credits(placement.id, 77, CreditScope::AllFiles)
            .await
            .unwrap();

        assert_eq!(outcome.credits, 77);
        assert_eq!(outcome.files_rewritten, 1);
        assert_eq!(outcome.candidates_updated, 2);

        // Placement record and candidate records carry the new value.
        let stored = store.get_placement(placement.id).await.unwrap();
        assert_eq!(stored.credits, 77);
        for candidate in store.candidates_by_placement(placement.id) {
            assert_eq!(candidate.credits, 77);
        }

        // Rewritten bytes re-parse with every credit alias set to 77.
        let file = stored.file_by_id(file_id).unwrap();
        assert_eq!(file.credits, 77);
        let (bytes, mime) = decode_payload(file.file_data.as_deref().unwrap()).unwrap();
        assert_eq!(mime, "text/csv");
        let table = parse_table(&bytes, TableFormat::Csv).unwrap();
        for row in &table.rows {
            for alias in FieldResolver::aliases(CanonicalField::Credits) {
                assert_eq!(row.get(*alias).unwrap().as_number(), Some(77.0));
            }
        }

        // One push covering both candidates.
        let pushes = push.pushes.lock().unwrap();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0.len(), 2);
        assert_eq!(pushes[0].1, 77);
    }

    #[tokio::test]
    async fn assign_credits_clamps_out_of_range_input() {
        let store = store_with();
        let (placement, file_id) = placement_with_csv_file(&store, ROSTER, 0);
        approve_all(&store, placement.id, file_id).await;

        let outcome = reconciler(&store, Arc::new(NoOpCreditPush))
            .assign_credits(placement.id, 15_000, CreditScope::AllFiles)
            .await
            .unwrap();

        assert_eq!(outcome.credits, 10_000);
        let stored = store.get_placement(placement.id).await.unwrap();
        assert_eq!(stored.credits, 10_000);
        for candidate in store.candidates_by_placement(placement.id) {
            assert_eq!(candidate.credits, 10_000);
        }
    }

    #[tokio::test]
    async fn single_file_scope_leaves_officer_credits_alone() {
        let store = store_with();
        let (placement, file_id) = placement_with_csv_file(&store, ROSTER, 0);
        approve_all(&store, placement.id, file_id).await;

        let outcome = reconciler(&store, Arc::new(NoOpCreditPush))
            .assign_credits(placement.id, 55, CreditScope::SingleFile(file_id))
            .await
            .unwrap();

        assert_eq!(outcome.files_rewritten, 1);
        let stored = store.get_placement(placement.id).await.unwrap();
        // Officer-level default untouched, file and candidates updated.
        assert_eq!(stored.credits, 100);
        assert_eq!(stored.file_by_id(file_id).unwrap().credits, 55);
        for candidate in store.candidates_by_placement(placement.id) {
            assert_eq!(candidate.credits, 55);
        }
    }

    #[tokio::test]
    async fn corrupt_file_is_skipped_without_aborting() {
        let store = store_with();
        let push = Arc::new(RecordingPush::default());
        let (mut placement, file_id) = placement_with_csv_file(&store, ROSTER, 0);
        approve_all(&store, placement.id, file_id).await;

        // Second file with an unreadable payload.
        let mut broken = FileRecord::new(
            "broken.xlsx",
            TableFormat::Xlsx,
            rosterflow_table::encode_payload(b"not a workbook", TableFormat::Xlsx.mime_type()),
        );
        broken.credits = 0;
        let broken_id = broken.id;
        placement = store.get_placement(placement.id).await.unwrap();
        placement.file_history.push(broken);
        store.add_placement(placement.clone());

        let outcome = reconciler(&store, push)
            .assign_credits(placement.id, 40, CreditScope::AllFiles)
            .await
            .unwrap();

        // The readable file is rewritten, the corrupt one left unchanged.
        assert_eq!(outcome.files_rewritten, 1);
        let stored = store.get_placement(placement.id).await.unwrap();
        assert_eq!(stored.file_by_id(file_id).unwrap().credits, 40);
        assert_eq!(stored.file_by_id(broken_id).unwrap().credits, 0);
        assert_eq!(stored.credits, 40);
    }

    #[tokio::test]
    async fn legacy_student_data_is_rewritten() {
        let store = store_with();
        let mut placement = empty_placement();
        placement.student_data = Some(rosterflow_table::encode_payload(ROSTER, "text/csv"));
        placement.student_data_format = Some(TableFormat::Csv);
        store.add_placement(placement.clone());

        reconciler(&store, Arc::new(NoOpCreditPush))
            .assign_credits(placement.id, 33, CreditScope::AllFiles)
            .await
            .unwrap();

        let stored = store.get_placement(placement.id).await.unwrap();
        let (bytes, _) = decode_payload(stored.student_data.as_deref().unwrap()).unwrap();
        let table = parse_table(&bytes, TableFormat::Csv).unwrap();
        for row in &table.rows {
            assert_eq!(FieldResolver::resolve_credits(row), Some(33));
        }
    }

    #[tokio::test]
    async fn sync_applies_row_authored_values() {
        let store = store_with();
        let roster = b"Name,Email,Password,Credits,Course\n\
            Asha,asha@example.com,pw1,50,CSE\n\
            Ravi,RAVI@example.com,pw2,60,ECE\n\
            NoMail,,pw3,70,ME\n\
            Ghost,ghost@example.com,pw4,80,CE\n";
        let (placement, file_id) = placement_with_csv_file(&store, roster, 0);
        approve_all(&store, placement.id, file_id).await;

        let outcome = reconciler(&store, Arc::new(NoOpCreditPush))
            .sync_from_spreadsheet(placement.id)
            .await
            .unwrap();

        // Rows with emails match provisioned candidates (case-folded); the
        // email-less row is counted as skipped.
        assert_eq!(outcome.rows_applied, 3);
        assert_eq!(outcome.rows_skipped, 1);

        let by_email: std::collections::HashMap<String, i32> = store
            .candidates_by_placement(placement.id)
            .into_iter()
            .map(|c| (c.email.clone(), c.credits))
            .collect();
        assert_eq!(by_email["asha@example.com"], 50);
        assert_eq!(by_email["ravi@example.com"], 60);
        assert_eq!(by_email["ghost@example.com"], 80);
    }

    #[tokio::test]
    async fn sync_trusts_per_row_credits_and_course() {
        let store = store_with();
        let roster = b"Name,Email,Password,Credits,Course\n\
            Asha,asha@example.com,pw1,50,CSE\n\
            Ravi,ravi@example.com,pw2,60,ECE\n";
        let (placement, file_id) = placement_with_csv_file(&store, roster, 0);
        approve_all(&store, placement.id, file_id).await;

        // Drift the candidates away from the file-authored values.
        reconciler(&store, Arc::new(NoOpCreditPush))
            .assign_credits(placement.id, 999, CreditScope::SingleFile(file_id))
            .await
            .unwrap();

        // assign_credits rewrote the file too, so reseed the original bytes
        // to model a file whose rows disagree with the live records.
        store
            .update_file_payload(
                placement.id,
                file_id,
                &rosterflow_table::encode_payload(roster, "text/csv"),
                0,
            )
            .await
            .unwrap();

        let outcome = reconciler(&store, Arc::new(NoOpCreditPush))
            .sync_from_spreadsheet(placement.id)
            .await
            .unwrap();
        assert_eq!(outcome.rows_applied, 2);

        let by_email: std::collections::HashMap<String, (i32, Option<String>)> = store
            .candidates_by_placement(placement.id)
            .into_iter()
            .map(|c| (c.email.clone(), (c.credits, c.course.clone())))
            .collect();
        assert_eq!(
            by_email["asha@example.com"],
            (50, Some("CSE".to_string()))
        );
        assert_eq!(by_email["ravi@example.com"], (60, Some("ECE".to_string())));
    }

    #[tokio::test]
    async fn assign_on_unknown_file_is_not_found() {
        let store = store_with();
        let (placement, _file_id) = placement_with_csv_file(&store, ROSTER, 0);

        let err = reconciler(&store, Arc::new(NoOpCreditPush))
            .assign_credits(placement.id, 10, CreditScope::SingleFile(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
