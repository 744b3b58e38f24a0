//! Orchestration layer: account provisioning, file lifecycle transitions,
//! and credit reconciliation across the three credit representations
//! (embedded spreadsheet bytes, structured row snapshots, live candidate
//! records).
//!
//! Everything here operates on one placement aggregate at a time through the
//! store traits; notifications and real-time pushes go through the ports in
//! `rosterflow-core` and never fail the triggering operation.

pub mod lifecycle;
pub mod provision;
pub mod reconcile;

#[cfg(test)]
mod testutil;

pub use lifecycle::{ApproveOutcome, FileLifecycleManager};
pub use provision::{AccountProvisioner, ProvisionOutcome, RowError};
pub use reconcile::{AssignOutcome, CreditReconciler, CreditScope, SyncOutcome};
