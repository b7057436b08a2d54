use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::notification::{Notification, NotificationKind};
use crate::store::{NotificationFilter, NotificationStore, RetentionStore};

/// In-memory store with the same filter semantics as `PgStore`.
///
/// Backs the test suite; also usable as a single-node fallback when no
/// database is available. Chat history and usage logs are modeled as bare
/// timestamp rows since maintenance only ever prunes them.
#[derive(Default)]
pub struct MemoryStore {
    notifications: RwLock<Vec<Notification>>,
    chat_messages: RwLock<Vec<DateTime<Utc>>>,
    usage_logs: RwLock<Vec<DateTime<Utc>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_chat_message(&self, created_at: DateTime<Utc>) {
        self.chat_messages.write().await.push(created_at);
    }

    pub async fn push_usage_log(&self, created_at: DateTime<Utc>) {
        self.usage_logs.write().await.push(created_at);
    }

    pub async fn chat_message_count(&self) -> usize {
        self.chat_messages.read().await.len()
    }

    pub async fn usage_log_count(&self) -> usize {
        self.usage_logs.read().await.len()
    }
}

fn matches(n: &Notification, filter: &NotificationFilter) -> bool {
    if let Some(tenant) = filter.tenant {
        if n.tenant != Some(tenant) {
            return false;
        }
    }
    if let Some(owner) = filter.owner {
        if n.owner != Some(owner) {
            return false;
        }
    }
    if let Some(kind) = filter.kind {
        if n.kind != kind {
            return false;
        }
    }
    if filter.unread_only && n.is_read {
        return false;
    }
    if let Some(now) = filter.active_at {
        if !n.is_active_at(now) {
            return false;
        }
    }
    if let Some(since) = filter.created_after {
        if n.created_at < since {
            return false;
        }
    }
    true
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert(&self, notification: &Notification) -> anyhow::Result<()> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn find(
        &self,
        filter: &NotificationFilter,
        limit: i64,
    ) -> anyhow::Result<Vec<Notification>> {
        let guard = self.notifications.read().await;
        let mut found: Vec<Notification> = guard
            .iter()
            .filter(|n| matches(n, filter))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.truncate(limit.max(0) as usize);
        Ok(found)
    }

    async fn count(&self, filter: &NotificationFilter) -> anyhow::Result<u64> {
        let guard = self.notifications.read().await;
        Ok(guard.iter().filter(|n| matches(n, filter)).count() as u64)
    }

    async fn mark_read(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut guard = self.notifications.write().await;
        match guard.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_read(&self, filter: &NotificationFilter) -> anyhow::Result<u64> {
        let mut guard = self.notifications.write().await;
        let mut modified = 0;
        for n in guard.iter_mut().filter(|n| matches(n, filter)) {
            if !n.is_read {
                n.is_read = true;
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut guard = self.notifications.write().await;
        let before = guard.len();
        guard.retain(|n| n.id != id);
        Ok(guard.len() < before)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut guard = self.notifications.write().await;
        let before = guard.len();
        guard.retain(|n| n.expires_at >= now);
        Ok((before - guard.len()) as u64)
    }

    async fn count_by_kind(&self) -> anyhow::Result<Vec<(NotificationKind, u64)>> {
        let guard = self.notifications.read().await;
        let mut counts: Vec<(NotificationKind, u64)> = Vec::new();
        for n in guard.iter() {
            match counts.iter_mut().find(|(k, _)| *k == n.kind) {
                Some((_, c)) => *c += 1,
                None => counts.push((n.kind, 1)),
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl RetentionStore for MemoryStore {
    async fn prune_chat_history(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut guard = self.chat_messages.write().await;
        let before = guard.len();
        guard.retain(|ts| *ts >= cutoff);
        Ok((before - guard.len()) as u64)
    }

    async fn prune_usage_logs(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let mut guard = self.usage_logs.write().await;
        let before = guard.len();
        guard.retain(|ts| *ts >= cutoff);
        Ok((before - guard.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(owner: Option<Uuid>, kind: NotificationKind, expires_in: Duration) -> Notification {
        let now = Utc::now();
        Notification {
            id: Uuid::new_v4(),
            tenant: None,
            owner,
            kind,
            title: "t".into(),
            message: "m".into(),
            metadata: None,
            is_read: false,
            created_at: now,
            expires_at: now + expires_in,
        }
    }

    #[test]
    fn filter_is_a_conjunction() {
        let owner = Uuid::new_v4();
        let n = record(Some(owner), NotificationKind::Warning, Duration::hours(1));

        assert!(matches(&n, &NotificationFilter::default()));
        assert!(matches(
            &n,
            &NotificationFilter {
                owner: Some(owner),
                kind: Some(NotificationKind::Warning),
                unread_only: true,
                active_at: Some(Utc::now()),
                ..Default::default()
            }
        ));
        // One failing predicate rejects the record.
        assert!(!matches(
            &n,
            &NotificationFilter {
                owner: Some(owner),
                kind: Some(NotificationKind::Error),
                ..Default::default()
            }
        ));
    }

    #[test]
    fn owner_filter_excludes_system_records() {
        let system = record(None, NotificationKind::Info, Duration::hours(1));
        let filter = NotificationFilter {
            owner: Some(Uuid::new_v4()),
            ..Default::default()
        };
        assert!(!matches(&system, &filter));
    }

    #[tokio::test]
    async fn delete_expired_keeps_the_boundary_record() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let mut boundary = record(None, NotificationKind::Info, Duration::zero());
        boundary.expires_at = now;
        store.insert(&boundary).await.unwrap();

        // expires_at == now is retained for one more tick.
        assert_eq!(store.delete_expired(now).await.unwrap(), 0);
        assert_eq!(
            store.delete_expired(now + Duration::seconds(1)).await.unwrap(),
            1
        );
    }
}
