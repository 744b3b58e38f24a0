//! Side-effect ports for the ingestion pipeline.
//!
//! The notification and real-time push subsystems live outside this codebase.
//! The pipeline calls these traits fire-and-forget: a failed delivery is
//! logged by the caller and never fails the triggering operation. Tests
//! substitute recording fakes.

use async_trait::async_trait;
use uuid::Uuid;

/// Notification payload handed to the external delivery subsystem.
#[derive(Debug, Clone)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: String,
    pub role: String,
    pub related_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

/// Outbound notification port.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), String>;
}

/// Real-time push port for bulk credit updates. Best-effort, no ack.
#[async_trait]
pub trait CreditPush: Send + Sync {
    async fn push_bulk_credit_update(
        &self,
        candidate_ids: &[Uuid],
        new_credits: i32,
    ) -> Result<(), String>;
}

/// No-op implementation for when notification delivery is disabled.
pub struct NoOpNotifier;

#[async_trait]
impl Notifier for NoOpNotifier {
    async fn notify(&self, _notification: Notification) -> Result<(), String> {
        Ok(())
    }
}

/// No-op implementation for when real-time push is disabled.
pub struct NoOpCreditPush;

#[async_trait]
impl CreditPush for NoOpCreditPush {
    async fn push_bulk_credit_update(
        &self,
        _candidate_ids: &[Uuid],
        _new_credits: i32,
    ) -> Result<(), String> {
        Ok(())
    }
}
