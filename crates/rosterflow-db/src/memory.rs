//! In-memory store backend.
//!
//! Implements both store traits over mutex-held maps with the same semantics
//! as the Postgres backend (normalized emails, conditional status
//! transitions, targeted per-file updates). Pipeline tests run against this
//! backend; it is also handy for local development without a database.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rosterflow_core::models::{
    normalize_email, Candidate, CandidateProfile, NewCandidate, Placement, RowSnapshot,
};
use rosterflow_core::AppError;
use uuid::Uuid;

use crate::traits::{CandidateStore, PlacementStore};

#[derive(Default)]
struct Inner {
    placements: HashMap<Uuid, Placement>,
    candidates: HashMap<Uuid, Candidate>,
    profiles: HashMap<Uuid, CandidateProfile>,
}

/// Shared in-memory store implementing both store traits.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a placement (test/dev helper).
    pub fn add_placement(&self, placement: Placement) {
        let mut inner = self.inner.lock().unwrap();
        inner.placements.insert(placement.id, placement);
    }

    /// Snapshot of all candidates belonging to a placement (test helper).
    pub fn candidates_by_placement(&self, placement_id: Uuid) -> Vec<Candidate> {
        let inner = self.inner.lock().unwrap();
        let mut candidates: Vec<Candidate> = inner
            .candidates
            .values()
            .filter(|c| c.placement_id == Some(placement_id))
            .cloned()
            .collect();
        candidates.sort_by(|a, b| a.email.cmp(&b.email));
        candidates
    }

    /// Whether a profile record exists for the candidate (test helper).
    pub fn has_profile(&self, candidate_id: Uuid) -> bool {
        let inner = self.inner.lock().unwrap();
        inner
            .profiles
            .values()
            .any(|p| p.candidate_id == candidate_id)
    }

    fn with_file<R>(
        &self,
        placement_id: Uuid,
        file_id: Uuid,
        f: impl FnOnce(&mut rosterflow_core::models::FileRecord) -> R,
    ) -> Result<R, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let placement = inner
            .placements
            .get_mut(&placement_id)
            .ok_or_else(|| AppError::NotFound(format!("Placement {} not found", placement_id)))?;
        let file = placement
            .file_by_id_mut(file_id)
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))?;
        Ok(f(file))
    }
}

#[async_trait]
impl PlacementStore for MemoryStore {
    async fn get_placement(&self, id: Uuid) -> Result<Placement, AppError> {
        let inner = self.inner.lock().unwrap();
        inner
            .placements
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Placement {} not found", id)))
    }

    async fn mark_file_processed(
        &self,
        placement_id: Uuid,
        file_id: Uuid,
        candidates_created: i32,
    ) -> Result<bool, AppError> {
        self.with_file(placement_id, file_id, |file| {
            file.mark_processed(candidates_created)
        })
    }

    async fn mark_file_rejected(
        &self,
        placement_id: Uuid,
        file_id: Uuid,
    ) -> Result<bool, AppError> {
        self.with_file(placement_id, file_id, |file| file.mark_rejected())
    }

    async fn store_file_snapshots(
        &self,
        placement_id: Uuid,
        file_id: Uuid,
        snapshots: &[RowSnapshot],
    ) -> Result<(), AppError> {
        self.with_file(placement_id, file_id, |file| {
            file.store_snapshots(snapshots.to_vec())
        })
    }

    async fn update_file_payload(
        &self,
        placement_id: Uuid,
        file_id: Uuid,
        file_data: &str,
        credits: i32,
    ) -> Result<(), AppError> {
        self.with_file(placement_id, file_id, |file| {
            file.file_data = Some(file_data.to_string());
            file.credits = credits;
        })
    }

    async fn set_placement_credits(
        &self,
        placement_id: Uuid,
        credits: i32,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        let placement = inner
            .placements
            .get_mut(&placement_id)
            .ok_or_else(|| AppError::NotFound(format!("Placement {} not found", placement_id)))?;
        placement.credits = credits;
        placement.updated_at = Utc::now();
        Ok(())
    }

    async fn update_student_data(
        &self,
        placement_id: Uuid,
        payload: &str,
    ) -> Result<(), AppError> {
        let mut inner = self.inner.lock().unwrap();
        let placement = inner
            .placements
            .get_mut(&placement_id)
            .ok_or_else(|| AppError::NotFound(format!("Placement {} not found", placement_id)))?;
        placement.student_data = Some(payload.to_string());
        placement.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl CandidateStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Candidate>, AppError> {
        let normalized = normalize_email(email);
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .candidates
            .values()
            .find(|c| c.email == normalized)
            .cloned())
    }

    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate, AppError> {
        let normalized = normalize_email(&candidate.email);
        let mut inner = self.inner.lock().unwrap();
        if inner.candidates.values().any(|c| c.email == normalized) {
            return Err(AppError::InvalidInput(format!(
                "Candidate email {} already exists",
                normalized
            )));
        }

        let now = Utc::now();
        let inserted = Candidate {
            id: Uuid::new_v4(),
            name: candidate.name,
            email: normalized,
            phone: candidate.phone,
            course: candidate.course,
            credits: candidate.credits,
            registration_method: candidate.registration_method,
            placement_id: candidate.placement_id,
            file_id: candidate.file_id,
            password: candidate.password,
            status: candidate.status,
            is_verified: candidate.is_verified,
            created_at: now,
            updated_at: now,
        };
        inner.candidates.insert(inserted.id, inserted.clone());
        Ok(inserted)
    }

    async fn create_profile(&self, candidate_id: Uuid) -> Result<(), AppError> {
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        let profile = CandidateProfile {
            id: Uuid::new_v4(),
            candidate_id,
            resume_url: None,
            about: None,
            skills: None,
            created_at: now,
            updated_at: now,
        };
        inner.profiles.insert(profile.id, profile);
        Ok(())
    }

    async fn bulk_update_credits(
        &self,
        placement_id: Uuid,
        credits: i32,
    ) -> Result<Vec<Uuid>, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let mut updated = Vec::new();
        for candidate in inner.candidates.values_mut() {
            if candidate.placement_id == Some(placement_id) {
                candidate.credits = credits;
                candidate.updated_at = Utc::now();
                updated.push(candidate.id);
            }
        }
        Ok(updated)
    }

    async fn update_credits_course_by_email(
        &self,
        placement_id: Uuid,
        email: &str,
        credits: Option<i32>,
        course: Option<&str>,
    ) -> Result<bool, AppError> {
        let normalized = normalize_email(email);
        let mut inner = self.inner.lock().unwrap();
        let candidate = inner
            .candidates
            .values_mut()
            .find(|c| c.placement_id == Some(placement_id) && c.email == normalized);

        match candidate {
            Some(candidate) => {
                if let Some(credits) = credits {
                    candidate.credits = credits;
                }
                if let Some(course) = course {
                    candidate.course = Some(course.to_string());
                }
                candidate.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
