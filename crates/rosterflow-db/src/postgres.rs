//! Postgres store backend.
//!
//! Runtime-checked sqlx queries against the schema in `migrations/`.
//! File-history mutations are targeted single-row updates keyed by
//! `(placement_id, id)`; status transitions additionally condition on
//! `status = 'pending'` so the pending→terminal state machine holds even
//! under concurrent admin actions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rosterflow_core::models::{
    normalize_email, Candidate, FileRecord, FileStatus, NewCandidate, Placement, RowSnapshot,
    TableFormat,
};
use rosterflow_core::AppError;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::traits::{CandidateStore, PlacementStore};

/// Repository for the placement aggregate.
#[derive(Clone)]
pub struct PgPlacementStore {
    pool: PgPool,
}

impl PgPlacementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PlacementRow {
    id: Uuid,
    officer_name: String,
    college: String,
    email: String,
    is_approved: bool,
    is_active: bool,
    credits: i32,
    student_data: Option<String>,
    student_data_format: Option<TableFormat>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct FileRow {
    id: Uuid,
    file_name: String,
    custom_name: Option<String>,
    format: TableFormat,
    file_data: Option<String>,
    credits: i32,
    status: FileStatus,
    processed_at: Option<DateTime<Utc>>,
    candidates_created: i32,
    structured_data: serde_json::Value,
    record_count: i32,
    data_stored_at: Option<DateTime<Utc>>,
    uploaded_at: DateTime<Utc>,
}

impl FileRow {
    fn into_record(self) -> Result<FileRecord, AppError> {
        let structured_data: Vec<RowSnapshot> = serde_json::from_value(self.structured_data)?;
        Ok(FileRecord {
            id: self.id,
            file_name: self.file_name,
            custom_name: self.custom_name,
            format: self.format,
            file_data: self.file_data,
            credits: self.credits,
            status: self.status,
            processed_at: self.processed_at,
            candidates_created: self.candidates_created,
            structured_data,
            record_count: self.record_count,
            data_stored_at: self.data_stored_at,
            uploaded_at: self.uploaded_at,
        })
    }
}

#[async_trait]
impl PlacementStore for PgPlacementStore {
    #[tracing::instrument(skip(self), fields(db.table = "placements", db.operation = "select", db.record_id = %id))]
    async fn get_placement(&self, id: Uuid) -> Result<Placement, AppError> {
        let row = sqlx::query_as::<Postgres, PlacementRow>(
            r#"
            SELECT id, officer_name, college, email, is_approved, is_active, credits,
                   student_data, student_data_format, created_at, updated_at
            FROM placements WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Placement {} not found", id)))?;

        let files = sqlx::query_as::<Postgres, FileRow>(
            r#"
            SELECT id, file_name, custom_name, format, file_data, credits, status,
                   processed_at, candidates_created, structured_data, record_count,
                   data_stored_at, uploaded_at
            FROM placement_files WHERE placement_id = $1 ORDER BY uploaded_at ASC
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let file_history = files
            .into_iter()
            .map(FileRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Placement {
            id: row.id,
            officer_name: row.officer_name,
            college: row.college,
            email: row.email,
            is_approved: row.is_approved,
            is_active: row.is_active,
            credits: row.credits,
            student_data: row.student_data,
            student_data_format: row.student_data_format,
            file_history,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    #[tracing::instrument(skip(self), fields(db.table = "placement_files", db.operation = "update", db.record_id = %file_id))]
    async fn mark_file_processed(
        &self,
        placement_id: Uuid,
        file_id: Uuid,
        candidates_created: i32,
    ) -> Result<bool, AppError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE placement_files
            SET status = 'processed', processed_at = NOW(), candidates_created = $3
            WHERE placement_id = $1 AND id = $2 AND status = 'pending'
            "#,
        )
        .bind(placement_id)
        .bind(file_id)
        .bind(candidates_created)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    #[tracing::instrument(skip(self), fields(db.table = "placement_files", db.operation = "update", db.record_id = %file_id))]
    async fn mark_file_rejected(
        &self,
        placement_id: Uuid,
        file_id: Uuid,
    ) -> Result<bool, AppError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE placement_files
            SET status = 'rejected', processed_at = NOW()
            WHERE placement_id = $1 AND id = $2 AND status = 'pending'
            "#,
        )
        .bind(placement_id)
        .bind(file_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    #[tracing::instrument(skip(self, snapshots), fields(db.table = "placement_files", db.operation = "update", db.record_id = %file_id))]
    async fn store_file_snapshots(
        &self,
        placement_id: Uuid,
        file_id: Uuid,
        snapshots: &[RowSnapshot],
    ) -> Result<(), AppError> {
        let structured_data = serde_json::to_value(snapshots)?;
        sqlx::query(
            r#"
            UPDATE placement_files
            SET structured_data = $3, record_count = $4, data_stored_at = NOW()
            WHERE placement_id = $1 AND id = $2
            "#,
        )
        .bind(placement_id)
        .bind(file_id)
        .bind(structured_data)
        .bind(snapshots.len() as i32)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, file_data), fields(db.table = "placement_files", db.operation = "update", db.record_id = %file_id))]
    async fn update_file_payload(
        &self,
        placement_id: Uuid,
        file_id: Uuid,
        file_data: &str,
        credits: i32,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE placement_files
            SET file_data = $3, credits = $4
            WHERE placement_id = $1 AND id = $2
            "#,
        )
        .bind(placement_id)
        .bind(file_id)
        .bind(file_data)
        .bind(credits)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "placements", db.operation = "update", db.record_id = %placement_id))]
    async fn set_placement_credits(
        &self,
        placement_id: Uuid,
        credits: i32,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE placements SET credits = $2, updated_at = NOW() WHERE id = $1")
            .bind(placement_id)
            .bind(credits)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, payload), fields(db.table = "placements", db.operation = "update", db.record_id = %placement_id))]
    async fn update_student_data(
        &self,
        placement_id: Uuid,
        payload: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE placements SET student_data = $2, updated_at = NOW() WHERE id = $1")
            .bind(placement_id)
            .bind(payload)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Repository for candidate accounts.
#[derive(Clone)]
pub struct PgCandidateStore {
    pool: PgPool,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CANDIDATE_COLUMNS: &str = "id, name, email, phone, course, credits, registration_method, \
     placement_id, file_id, password, status, is_verified, created_at, updated_at";

#[async_trait]
impl CandidateStore for PgCandidateStore {
    #[tracing::instrument(skip(self, email), fields(db.table = "candidates", db.operation = "select"))]
    async fn find_by_email(&self, email: &str) -> Result<Option<Candidate>, AppError> {
        let candidate = sqlx::query_as::<Postgres, Candidate>(&format!(
            "SELECT {} FROM candidates WHERE email = $1",
            CANDIDATE_COLUMNS
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;

        Ok(candidate)
    }

    #[tracing::instrument(skip(self, candidate), fields(db.table = "candidates", db.operation = "insert"))]
    async fn insert_candidate(&self, candidate: NewCandidate) -> Result<Candidate, AppError> {
        let inserted = sqlx::query_as::<Postgres, Candidate>(&format!(
            r#"
            INSERT INTO candidates
                (name, email, phone, course, credits, registration_method,
                 placement_id, file_id, password, status, is_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            CANDIDATE_COLUMNS
        ))
        .bind(&candidate.name)
        .bind(normalize_email(&candidate.email))
        .bind(&candidate.phone)
        .bind(&candidate.course)
        .bind(candidate.credits)
        .bind(candidate.registration_method)
        .bind(candidate.placement_id)
        .bind(candidate.file_id)
        .bind(&candidate.password)
        .bind(candidate.status)
        .bind(candidate.is_verified)
        .fetch_one(&self.pool)
        .await?;

        Ok(inserted)
    }

    #[tracing::instrument(skip(self), fields(db.table = "candidate_profiles", db.operation = "insert", db.record_id = %candidate_id))]
    async fn create_profile(&self, candidate_id: Uuid) -> Result<(), AppError> {
        sqlx::query("INSERT INTO candidate_profiles (candidate_id) VALUES ($1)")
            .bind(candidate_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "candidates", db.operation = "update"))]
    async fn bulk_update_credits(
        &self,
        placement_id: Uuid,
        credits: i32,
    ) -> Result<Vec<Uuid>, AppError> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE candidates SET credits = $2, updated_at = NOW()
            WHERE placement_id = $1
            RETURNING id
            "#,
        )
        .bind(placement_id)
        .bind(credits)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    #[tracing::instrument(skip(self, email), fields(db.table = "candidates", db.operation = "update"))]
    async fn update_credits_course_by_email(
        &self,
        placement_id: Uuid,
        email: &str,
        credits: Option<i32>,
        course: Option<&str>,
    ) -> Result<bool, AppError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE candidates
            SET credits = COALESCE($3, credits),
                course = COALESCE($4, course),
                updated_at = NOW()
            WHERE placement_id = $1 AND email = $2
            "#,
        )
        .bind(placement_id)
        .bind(normalize_email(email))
        .bind(credits)
        .bind(course)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }
}
