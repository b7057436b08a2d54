//! Keyed document-store collaborators.
//!
//! The notification core never touches persistence internals directly; it
//! talks to these traits. `PgStore` is the production backend, `MemoryStore`
//! backs the test suite. Per-operation atomicity is the store's job, so the
//! core needs no in-process locking.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::notification::{Notification, NotificationKind};

/// A conjunction of field predicates over notification records.
///
/// Every field is optional; an empty filter matches everything. Both the
/// foreground queries and the background sweeps are expressed through this
/// one type so the two paths cannot diverge in semantics.
#[derive(Debug, Clone, Default)]
pub struct NotificationFilter {
    /// Equality on tenant (project) id.
    pub tenant: Option<Uuid>,
    /// Equality on owner (user) id.
    pub owner: Option<Uuid>,
    /// Equality on kind.
    pub kind: Option<NotificationKind>,
    /// Restrict to unread records.
    pub unread_only: bool,
    /// Restrict to records active at this instant (`expires_at > t`).
    pub active_at: Option<DateTime<Utc>>,
    /// Restrict to records created at or after this instant.
    pub created_after: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: &Notification) -> anyhow::Result<()>;

    /// Matching records, newest-first by `created_at`, capped at `limit`.
    async fn find(
        &self,
        filter: &NotificationFilter,
        limit: i64,
    ) -> anyhow::Result<Vec<Notification>>;

    async fn count(&self, filter: &NotificationFilter) -> anyhow::Result<u64>;

    /// Set `is_read = true`. Returns whether a record with that id matched;
    /// an already-read record still matches.
    async fn mark_read(&self, id: Uuid) -> anyhow::Result<bool>;

    /// Bulk `is_read = true` over the filter. Returns the number modified.
    async fn mark_all_read(&self, filter: &NotificationFilter) -> anyhow::Result<u64>;

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;

    /// One bulk delete of every record with `expires_at < now`.
    /// Idempotent: a second immediate run deletes zero records.
    async fn delete_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64>;

    /// Record counts grouped by kind, across active and expired records.
    async fn count_by_kind(&self) -> anyhow::Result<Vec<(NotificationKind, u64)>>;
}

/// Collaborator stores the maintenance scheduler sweeps on fixed retention
/// windows. Prune-only from this crate's point of view.
#[async_trait]
pub trait RetentionStore: Send + Sync {
    /// Delete chat messages created before `cutoff`. Returns the count.
    async fn prune_chat_history(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64>;

    /// Delete usage log rows created before `cutoff`. Returns the count.
    async fn prune_usage_logs(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64>;
}
