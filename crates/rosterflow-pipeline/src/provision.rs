//! Idempotent candidate provisioning from parsed roster rows.

use std::sync::Arc;

use rosterflow_core::models::{
    CandidateStatus, FileRecord, NewCandidate, Placement, RegistrationMethod,
};
use rosterflow_db::CandidateStore;
use rosterflow_table::{CanonicalField, FieldResolver, Table};

/// One row that could not be provisioned. Non-fatal: collected and returned
/// alongside the success counts.
#[derive(Debug, Clone)]
pub struct RowError {
    pub row_index: usize,
    pub message: String,
}

/// Aggregate result of a provisioning run.
#[derive(Debug, Default)]
pub struct ProvisionOutcome {
    pub created: i32,
    pub skipped: i32,
    pub errors: Vec<RowError>,
}

/// Creates candidate accounts from parsed rows. Existing emails are skipped,
/// so re-running over the same rows never creates duplicates.
pub struct AccountProvisioner {
    candidates: Arc<dyn CandidateStore>,
}

impl AccountProvisioner {
    pub fn new(candidates: Arc<dyn CandidateStore>) -> Self {
        Self { candidates }
    }

    /// Provision one account per row.
    ///
    /// Rows missing any of email/password/name produce a [`RowError`] and the
    /// batch continues; store-level failures on a single row are treated the
    /// same way. This method itself never fails — file-level decode/parse
    /// problems are the caller's to surface.
    #[tracing::instrument(skip_all, fields(placement_id = %placement.id, file_id = %file.id, rows = table.len()))]
    pub async fn provision_from_rows(
        &self,
        placement: &Placement,
        file: &FileRecord,
        table: &Table,
    ) -> ProvisionOutcome {
        let mut outcome = ProvisionOutcome::default();

        // File-level credits win over the officer default when present.
        let credits = if file.credits > 0 {
            file.credits
        } else {
            placement.credits
        };

        for (row_index, row) in table.rows.iter().enumerate() {
            let email = FieldResolver::resolve_text(row, CanonicalField::Email);
            let password = FieldResolver::resolve_text(row, CanonicalField::Password);
            let name = FieldResolver::resolve_text(row, CanonicalField::Name);

            let (email, password, name) = match (email, password, name) {
                (Some(email), Some(password), Some(name)) => (email, password, name),
                (email, password, name) => {
                    let mut missing = Vec::new();
                    if email.is_none() {
                        missing.push("email");
                    }
                    if password.is_none() {
                        missing.push("password");
                    }
                    if name.is_none() {
                        missing.push("name");
                    }
                    outcome.errors.push(RowError {
                        row_index,
                        message: format!("missing required field(s): {}", missing.join(", ")),
                    });
                    continue;
                }
            };

            match self.candidates.find_by_email(&email).await {
                Ok(Some(_)) => {
                    outcome.skipped += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(error = %e, row_index, "Candidate lookup failed");
                    outcome.errors.push(RowError {
                        row_index,
                        message: format!("lookup failed: {}", e),
                    });
                    continue;
                }
            }

            let new_candidate = NewCandidate {
                name,
                email,
                phone: FieldResolver::resolve_text(row, CanonicalField::Phone),
                course: FieldResolver::resolve_text(row, CanonicalField::Course),
                credits,
                registration_method: RegistrationMethod::Placement,
                placement_id: Some(placement.id),
                file_id: Some(file.id),
                password,
                status: CandidateStatus::Active,
                is_verified: true,
            };

            match self.candidates.insert_candidate(new_candidate).await {
                Ok(candidate) => {
                    // Dependent write: a failed profile insert leaves the
                    // candidate in place.
                    if let Err(e) = self.candidates.create_profile(candidate.id).await {
                        tracing::warn!(
                            error = %e,
                            candidate_id = %candidate.id,
                            "Profile creation failed; candidate kept"
                        );
                    }
                    outcome.created += 1;
                }
                Err(e) => {
                    tracing::error!(error = %e, row_index, "Candidate insert failed");
                    outcome.errors.push(RowError {
                        row_index,
                        message: format!("insert failed: {}", e),
                    });
                }
            }
        }

        tracing::info!(
            created = outcome.created,
            skipped = outcome.skipped,
            errors = outcome.errors.len(),
            "Provisioning run finished"
        );

        outcome
    }
}
