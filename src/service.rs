//! Notification service: creation, expiry, scoped listing, read-state, and
//! aggregate statistics over the store collaborator.
//!
//! The service holds no record state across calls; every read re-queries the
//! store, so callers never observe stale read-state. Each store call is
//! bounded by a timeout budget so a slow store cannot stall a worker or a
//! background task indefinitely.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::config::{Config, DEFAULT_EXPIRY_SECS};
use crate::errors::NotifyError;
use crate::models::notification::{Notification, NotificationKind};
use crate::store::{NotificationFilter, NotificationStore};
use crate::webhook::{WebhookDispatcher, WebhookEvent};

/// Timeout budgets per operation weight.
const READ_TIMEOUT: Duration = Duration::from_secs(5);
const WRITE_TIMEOUT: Duration = Duration::from_secs(10);
const BULK_TIMEOUT: Duration = Duration::from_secs(30);

/// Page caps for listings.
const GENERAL_PAGE_LIMIT: i64 = 50;
const TENANT_PAGE_LIMIT: i64 = 20;

/// Per-request identity supplied by the auth collaborator.
#[derive(Debug, Clone)]
pub struct Caller {
    /// Privileged (admin) callers may read across owners, including system
    /// notifications.
    pub privileged: bool,
    pub owner: Option<Uuid>,
}

impl Caller {
    pub fn admin() -> Self {
        Self {
            privileged: true,
            owner: None,
        }
    }

    pub fn user(owner: Uuid) -> Self {
        Self {
            privileged: false,
            owner: Some(owner),
        }
    }
}

/// Tuning knobs the service needs from configuration.
#[derive(Debug, Clone)]
pub struct NotificationSettings {
    pub default_expiry: Duration,
}

impl Default for NotificationSettings {
    /// Hard-coded fallback used when no configuration is present.
    fn default() -> Self {
        Self {
            default_expiry: Duration::from_secs(DEFAULT_EXPIRY_SECS),
        }
    }
}

impl From<&Config> for NotificationSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            default_expiry: cfg.default_expiry,
        }
    }
}

/// One page of active notifications plus counts over the same filter.
#[derive(Debug, Serialize)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    pub count: usize,
    pub unread_count: u64,
}

/// Aggregate counts for operational visibility. Sub-counts are independent
/// queries; mild temporal skew between them is acceptable.
#[derive(Debug, Serialize)]
pub struct NotificationStats {
    pub total: u64,
    pub unread: u64,
    pub active: u64,
    pub recent_24h: u64,
    pub by_type: HashMap<String, u64>,
}

pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    settings: NotificationSettings,
    webhook: WebhookDispatcher,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        settings: NotificationSettings,
        webhook: WebhookDispatcher,
    ) -> Self {
        Self {
            store,
            settings,
            webhook,
        }
    }

    /// Create a notification expiring `default_expiry` from now.
    /// No side effects beyond the insert.
    pub async fn create(
        &self,
        tenant: Option<Uuid>,
        owner: Option<Uuid>,
        kind: NotificationKind,
        title: &str,
        message: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<Uuid, NotifyError> {
        if title.trim().is_empty() {
            return Err(NotifyError::invalid("title must not be empty"));
        }
        if message.trim().is_empty() {
            return Err(NotifyError::invalid("message must not be empty"));
        }

        let now = Utc::now();
        let notification = Notification {
            id: Uuid::new_v4(),
            tenant,
            owner,
            kind,
            title: title.to_string(),
            message: message.to_string(),
            metadata,
            is_read: false,
            created_at: now,
            expires_at: now
                + chrono::Duration::from_std(self.settings.default_expiry)
                    .map_err(|_| NotifyError::invalid("default expiry out of range"))?,
        };

        let id = notification.id;
        self.bounded(WRITE_TIMEOUT, self.store.insert(&notification))
            .await?;
        Ok(id)
    }

    /// Specialization for usage-limit breaches: fixed title/message, a
    /// metadata bag describing the breach, and a fire-and-forget webhook
    /// alert. Webhook failure never fails or delays this call.
    pub async fn create_limit_notification(
        &self,
        tenant: Uuid,
        tenant_name: &str,
        limit_kind: &str,
        current_usage: i64,
        limit: i64,
    ) -> Result<Uuid, NotifyError> {
        let metadata = serde_json::json!({
            "limit_kind": limit_kind,
            "current_usage": current_usage,
            "limit": limit,
            "tenant_name": tenant_name,
            "severity": "warning",
            "auto_generated": true,
            "timestamp": Utc::now().timestamp(),
        });

        let title = format!("Usage Limit Reached - {}", tenant_name);
        let message = "Your limit has expired.";

        // System notification: no owner.
        let id = self
            .create(
                Some(tenant),
                None,
                NotificationKind::LimitExpired,
                &title,
                message,
                Some(metadata),
            )
            .await?;

        self.webhook.notify(WebhookEvent::limit_reached(
            tenant,
            tenant_name,
            limit_kind,
            current_usage,
            limit,
        ));

        Ok(id)
    }

    /// Active notifications visible to the caller, newest-first, with an
    /// unread count over the same filter. Non-privileged callers are always
    /// constrained to their own records.
    pub async fn list(
        &self,
        caller: &Caller,
        kind: Option<NotificationKind>,
        tenant: Option<Uuid>,
    ) -> Result<NotificationPage, NotifyError> {
        let mut filter = NotificationFilter {
            kind,
            tenant,
            active_at: Some(Utc::now()),
            ..Default::default()
        };
        if !caller.privileged {
            filter.owner = Some(caller.owner.ok_or(NotifyError::Unauthorized)?);
        }

        let limit = if tenant.is_some() {
            TENANT_PAGE_LIMIT
        } else {
            GENERAL_PAGE_LIMIT
        };

        let items = self
            .bounded(READ_TIMEOUT, self.store.find(&filter, limit))
            .await?;

        let unread_filter = NotificationFilter {
            unread_only: true,
            ..filter
        };
        let unread_count = self
            .bounded(READ_TIMEOUT, self.store.count(&unread_filter))
            .await?;

        Ok(NotificationPage {
            count: items.len(),
            items,
            unread_count,
        })
    }

    /// Idempotent read-state transition. Marking an already-read record
    /// succeeds; a missing record is `NotFound`.
    pub async fn mark_read(&self, id: &str) -> Result<(), NotifyError> {
        let id = parse_id(id)?;
        let matched = self
            .bounded(WRITE_TIMEOUT, self.store.mark_read(id))
            .await?;
        if matched {
            Ok(())
        } else {
            Err(NotifyError::NotFound)
        }
    }

    /// Bulk false→true transition over the caller's scope. Returns the number
    /// actually modified (may be zero).
    pub async fn mark_all_read(&self, caller: &Caller) -> Result<u64, NotifyError> {
        let mut filter = NotificationFilter {
            unread_only: true,
            ..Default::default()
        };
        if !caller.privileged {
            filter.owner = Some(caller.owner.ok_or(NotifyError::Unauthorized)?);
        }

        self.bounded(BULK_TIMEOUT, self.store.mark_all_read(&filter))
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), NotifyError> {
        let id = parse_id(id)?;
        let deleted = self.bounded(WRITE_TIMEOUT, self.store.delete(id)).await?;
        if deleted {
            Ok(())
        } else {
            Err(NotifyError::NotFound)
        }
    }

    /// Aggregate counts. Independent queries, not an atomic snapshot.
    pub async fn stats(&self) -> Result<NotificationStats, NotifyError> {
        let now = Utc::now();

        let total = self
            .bounded(
                READ_TIMEOUT,
                self.store.count(&NotificationFilter::default()),
            )
            .await?;
        let unread = self
            .bounded(
                READ_TIMEOUT,
                self.store.count(&NotificationFilter {
                    unread_only: true,
                    ..Default::default()
                }),
            )
            .await?;
        let active = self
            .bounded(
                READ_TIMEOUT,
                self.store.count(&NotificationFilter {
                    active_at: Some(now),
                    ..Default::default()
                }),
            )
            .await?;
        let recent_24h = self
            .bounded(
                READ_TIMEOUT,
                self.store.count(&NotificationFilter {
                    created_after: Some(now - chrono::Duration::hours(24)),
                    ..Default::default()
                }),
            )
            .await?;
        let by_type = self
            .bounded(READ_TIMEOUT, self.store.count_by_kind())
            .await?
            .into_iter()
            .map(|(kind, count)| (kind.as_str().to_string(), count))
            .collect();

        Ok(NotificationStats {
            total,
            unread,
            active,
            recent_24h,
            by_type,
        })
    }

    /// One bulk delete of everything with `expires_at < now`. Idempotent;
    /// shared by the reaper, the maintenance sweep, and on-demand
    /// administrative cleanup so the paths cannot diverge.
    pub async fn cleanup_expired(&self) -> Result<u64, NotifyError> {
        self.bounded(BULK_TIMEOUT, self.store.delete_expired(Utc::now()))
            .await
    }

    async fn bounded<T>(
        &self,
        budget: Duration,
        op: impl Future<Output = anyhow::Result<T>>,
    ) -> Result<T, NotifyError> {
        match tokio::time::timeout(budget, op).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(NotifyError::StoreUnavailable(e.to_string())),
            Err(_) => Err(NotifyError::StoreUnavailable(
                "store operation timed out".to_string(),
            )),
        }
    }
}

/// Validate the record-id shape before any store access.
fn parse_id(id: &str) -> Result<Uuid, NotifyError> {
    id.parse()
        .map_err(|_| NotifyError::invalid(format!("malformed notification id: {}", id)))
}
