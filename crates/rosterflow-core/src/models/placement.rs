//! Placement aggregate: one record per placement officer, owning the ordered
//! history of roster files that officer has uploaded.
//!
//! All status mutation goes through the accessor methods on [`FileRecord`] so
//! the pending→terminal state machine cannot be bypassed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::row_snapshot::RowSnapshot;

/// Source format of an uploaded roster file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "table_format", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// Native spreadsheet binary (first worksheet is read).
    Xlsx,
    /// Delimited text, decoded as UTF-8 before parsing.
    Csv,
}

impl TableFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            TableFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            TableFormat::Csv => "text/csv",
        }
    }

    /// Map a MIME tag back to a format. Legacy uploads used the older Excel
    /// MIME type and plain text for CSV, so those are accepted too.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            | "application/vnd.ms-excel" => Some(TableFormat::Xlsx),
            "text/csv" | "text/plain" => Some(TableFormat::Csv),
            _ => None,
        }
    }
}

/// Processing state of an uploaded file. Pending is the only non-terminal
/// state; there is no transition back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "file_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Processed,
    Rejected,
}

impl FileStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, FileStatus::Pending)
    }
}

/// One uploaded roster file and its processing state, owned by a Placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub file_name: String,
    pub custom_name: Option<String>,
    pub format: TableFormat,
    /// Encoded payload (`data:<mime>;base64,...`); None once purged.
    pub file_data: Option<String>,
    pub credits: i32,
    pub status: FileStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub candidates_created: i32,
    pub structured_data: Vec<RowSnapshot>,
    pub record_count: i32,
    pub data_stored_at: Option<DateTime<Utc>>,
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(file_name: impl Into<String>, format: TableFormat, file_data: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            custom_name: None,
            format,
            file_data: Some(file_data),
            credits: 0,
            status: FileStatus::Pending,
            processed_at: None,
            candidates_created: 0,
            structured_data: Vec::new(),
            record_count: 0,
            data_stored_at: None,
            uploaded_at: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transition pending→processed. Returns false (and changes nothing,
    /// including `processed_at`) when the file is already terminal.
    pub fn mark_processed(&mut self, candidates_created: i32) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = FileStatus::Processed;
        self.processed_at = Some(Utc::now());
        self.candidates_created = candidates_created;
        true
    }

    /// Transition pending→rejected. Returns false when already terminal.
    pub fn mark_rejected(&mut self) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = FileStatus::Rejected;
        self.processed_at = Some(Utc::now());
        true
    }

    /// Replace the structured snapshot cache. `record_count` always tracks
    /// the snapshot list length.
    pub fn store_snapshots(&mut self, snapshots: Vec<RowSnapshot>) {
        self.record_count = snapshots.len() as i32;
        self.structured_data = snapshots;
        self.data_stored_at = Some(Utc::now());
    }

    pub fn display_name(&self) -> &str {
        self.custom_name.as_deref().unwrap_or(&self.file_name)
    }
}

/// Placement officer account and its owned roster file history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placement {
    pub id: Uuid,
    pub officer_name: String,
    pub college: String,
    pub email: String,
    pub is_approved: bool,
    pub is_active: bool,
    /// Officer-level default credit value applied to newly provisioned
    /// candidates and by officer-wide credit assignment.
    pub credits: i32,
    /// Legacy single-file payload kept for placements that predate
    /// `file_history`; rewritten alongside the history on credit assignment.
    pub student_data: Option<String>,
    pub student_data_format: Option<TableFormat>,
    pub file_history: Vec<FileRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Placement {
    pub fn file_by_id(&self, file_id: Uuid) -> Option<&FileRecord> {
        self.file_history.iter().find(|f| f.id == file_id)
    }

    pub fn file_by_id_mut(&mut self, file_id: Uuid) -> Option<&mut FileRecord> {
        self.file_history.iter_mut().find(|f| f.id == file_id)
    }

    /// Files that still carry an embedded payload, in upload order.
    pub fn files_with_data(&self) -> impl Iterator<Item = &FileRecord> {
        self.file_history.iter().filter(|f| f.file_data.is_some())
    }
}
