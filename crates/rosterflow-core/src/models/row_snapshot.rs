//! Denormalized per-row snapshots cached on a file record after parsing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resolved view of one source row, kept alongside the original raw mapping
/// for audit. Persisted as JSONB on the owning file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowSnapshot {
    pub row_index: i32,
    pub student_id: Option<String>,
    pub name: Option<String>,
    pub college: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub course: Option<String>,
    pub password: Option<String>,
    pub credits_assigned: Option<i32>,
    /// Original row mapping exactly as parsed, before alias resolution.
    pub raw: serde_json::Value,
    pub placement_id: Uuid,
    pub file_id: Uuid,
    pub captured_at: DateTime<Utc>,
}
