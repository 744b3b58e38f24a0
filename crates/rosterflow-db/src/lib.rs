//! Rosterflow persistence layer.
//!
//! The pipeline talks to storage through the `PlacementStore` and
//! `CandidateStore` traits. Two backends implement them: Postgres (sqlx,
//! used in deployments) and an in-memory store (tests and local
//! development). File-status transitions use targeted conditional updates so
//! sibling file records are never clobbered by concurrent edits.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod traits;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::{PgCandidateStore, PgPlacementStore};
pub use traits::{CandidateStore, PlacementStore};
