//! Domain models shared across Rosterflow components.

pub mod candidate;
pub mod placement;
pub mod row_snapshot;

pub use candidate::{
    hash_password, normalize_email, Candidate, CandidateProfile, CandidateStatus, NewCandidate,
    RegistrationMethod,
};
pub use placement::{FileRecord, FileStatus, Placement, TableFormat};
pub use row_snapshot::RowSnapshot;
