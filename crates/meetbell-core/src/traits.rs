//! Collaborator seams consumed by the reminder engine.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Meeting, MeetingFilter, MeetingUpdate, UpdateOutcome};

/// Meeting persistence. Implementations must apply [`MeetingUpdate`]s
/// atomically per field so concurrent flag writers never clobber each other.
#[async_trait]
pub trait MeetingStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    async fn insert(&self, meeting: &Meeting) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Meeting>>;

    /// Meetings matching the filter, ordered by start time.
    async fn find(&self, filter: &MeetingFilter) -> Result<Vec<Meeting>>;

    /// Apply a guarded, field-scoped update. A vanished record yields
    /// `UpdateOutcome::NotFound`, not an error.
    async fn update(&self, id: &str, update: MeetingUpdate) -> Result<UpdateOutcome>;

    /// Delete one meeting. Returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Delete every meeting matching the filter. Returns the count deleted.
    async fn delete_many(&self, filter: &MeetingFilter) -> Result<u64>;
}

/// Outbound notification transport (email, webhook, ...).
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Transport name for logs.
    fn name(&self) -> &str;

    /// Deliver one message to every recipient. Failures come back as
    /// `Err`, never as a panic.
    async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<()>;
}
