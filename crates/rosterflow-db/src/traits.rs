//! Store abstraction traits.
//!
//! All backends must implement these. Emails are normalized (trimmed,
//! lower-cased) by the backend for every lookup and write so callers never
//! have to reason about case.

use async_trait::async_trait;
use rosterflow_core::models::{Candidate, NewCandidate, Placement, RowSnapshot};
use rosterflow_core::AppError;
use uuid::Uuid;

/// Persistence for the placement aggregate and its owned file history.
#[async_trait]
pub trait PlacementStore: Send + Sync {
    /// Load a placement with its full file history, in upload order.
    async fn get_placement(&self, id: Uuid) -> Result<Placement, AppError>;

    /// Pending→processed transition for exactly one file record, by id.
    /// Conditional on the record still being pending; returns whether the
    /// transition happened. Never touches sibling records.
    async fn mark_file_processed(
        &self,
        placement_id: Uuid,
        file_id: Uuid,
        candidates_created: i32,
    ) -> Result<bool, AppError>;

    /// Pending→rejected transition, same contract as `mark_file_processed`.
    async fn mark_file_rejected(&self, placement_id: Uuid, file_id: Uuid)
        -> Result<bool, AppError>;

    /// Replace the structured snapshot cache of one file record.
    /// `record_count` is kept equal to the snapshot list length.
    async fn store_file_snapshots(
        &self,
        placement_id: Uuid,
        file_id: Uuid,
        snapshots: &[RowSnapshot],
    ) -> Result<(), AppError>;

    /// Replace one file record's embedded payload and credit value.
    async fn update_file_payload(
        &self,
        placement_id: Uuid,
        file_id: Uuid,
        file_data: &str,
        credits: i32,
    ) -> Result<(), AppError>;

    /// Persist the officer-level credit value.
    async fn set_placement_credits(&self, placement_id: Uuid, credits: i32)
        -> Result<(), AppError>;

    /// Replace the legacy single-file payload.
    async fn update_student_data(&self, placement_id: Uuid, payload: &str)
        -> Result<(), AppError>;
}

/// Persistence for candidate accounts and their profiles.
#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// Lookup by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<Candidate>, AppError>;

    /// Insert a candidate account. The email is stored normalized.
    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate, AppError>;

    /// Create the empty linked profile record. This is a separate dependent
    /// write: if it fails after `insert_candidate`, the candidate remains.
    async fn create_profile(&self, candidate_id: Uuid) -> Result<(), AppError>;

    /// Set `credits` on every candidate of a placement in one conditional
    /// update. Returns the ids of the affected candidates.
    async fn bulk_update_credits(
        &self,
        placement_id: Uuid,
        credits: i32,
    ) -> Result<Vec<Uuid>, AppError>;

    /// Update the candidate matched by normalized email within a placement,
    /// setting whichever of credits/course the source row carried. Returns
    /// whether a candidate matched.
    async fn update_credits_course_by_email(
        &self,
        placement_id: Uuid,
        email: &str,
        credits: Option<i32>,
        course: Option<&str>,
    ) -> Result<bool, AppError>;
}
