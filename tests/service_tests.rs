//! Integration tests for the notification service against the in-memory
//! store: creation and expiry, caller scoping, read-state transitions, bulk
//! cleanup idempotence, and aggregate statistics.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use chat_notify::errors::NotifyError;
use chat_notify::models::notification::{Notification, NotificationKind};
use chat_notify::service::{Caller, NotificationService, NotificationSettings};
use chat_notify::store::memory::MemoryStore;
use chat_notify::store::NotificationStore;
use chat_notify::webhook::WebhookDispatcher;

fn service_with_store() -> (Arc<MemoryStore>, NotificationService) {
    let store = Arc::new(MemoryStore::new());
    let service = NotificationService::new(
        store.clone(),
        NotificationSettings::default(),
        WebhookDispatcher::disabled(),
    );
    (store, service)
}

/// Seed a record directly, bypassing the service's expiry computation.
fn seed(
    owner: Option<Uuid>,
    tenant: Option<Uuid>,
    kind: NotificationKind,
    is_read: bool,
    created_offset: Duration,
    expires_offset: Duration,
) -> Notification {
    let now = Utc::now();
    Notification {
        id: Uuid::new_v4(),
        tenant,
        owner,
        kind,
        title: "seeded".into(),
        message: "seeded message".into(),
        metadata: None,
        is_read,
        created_at: now + created_offset,
        expires_at: now + expires_offset,
    }
}

#[tokio::test]
async fn expiry_strictly_exceeds_creation() {
    let (store, service) = service_with_store();
    service
        .create(None, None, NotificationKind::Info, "hello", "world", None)
        .await
        .unwrap();

    let all = store.find(&Default::default(), 10).await.unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].expires_at > all[0].created_at);
    assert!(!all[0].is_read);
}

#[tokio::test]
async fn create_rejects_empty_title_and_message() {
    let (_store, service) = service_with_store();
    let err = service
        .create(None, None, NotificationKind::Info, "  ", "body", None)
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::InvalidArgument(_)));

    let err = service
        .create(None, None, NotificationKind::Info, "title", "", None)
        .await
        .unwrap_err();
    assert!(matches!(err, NotifyError::InvalidArgument(_)));
}

#[tokio::test]
async fn created_notification_is_listed_immediately() {
    let (_store, service) = service_with_store();
    let owner = Uuid::new_v4();
    service
        .create(
            None,
            Some(owner),
            NotificationKind::Success,
            "done",
            "it worked",
            None,
        )
        .await
        .unwrap();

    let page = service.list(&Caller::user(owner), None, None).await.unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.items[0].title, "done");
    assert_eq!(page.unread_count, 1);
}

#[tokio::test]
async fn expired_record_is_hidden_then_reaped() {
    let (store, service) = service_with_store();
    // Created an hour ago with a one-hour expiry that has just passed.
    store
        .insert(&seed(
            None,
            None,
            NotificationKind::Info,
            false,
            Duration::hours(-1),
            Duration::seconds(-1),
        ))
        .await
        .unwrap();

    let page = service.list(&Caller::admin(), None, None).await.unwrap();
    assert_eq!(page.count, 0);

    assert_eq!(service.cleanup_expired().await.unwrap(), 1);
    assert_eq!(store.count(&Default::default()).await.unwrap(), 0);
}

#[tokio::test]
async fn cleanup_expired_is_idempotent() {
    let (store, service) = service_with_store();
    store
        .insert(&seed(
            None,
            None,
            NotificationKind::Warning,
            false,
            Duration::hours(-2),
            Duration::hours(-1),
        ))
        .await
        .unwrap();

    assert_eq!(service.cleanup_expired().await.unwrap(), 1);
    assert_eq!(service.cleanup_expired().await.unwrap(), 0);
}

#[tokio::test]
async fn reaper_deletes_only_the_expired_record() {
    let (store, service) = service_with_store();
    let expired = seed(
        None,
        None,
        NotificationKind::Error,
        false,
        Duration::hours(-3),
        Duration::seconds(-5),
    );
    let soon = seed(
        None,
        None,
        NotificationKind::Warning,
        true,
        Duration::hours(-1),
        Duration::minutes(5),
    );
    let far = seed(
        None,
        None,
        NotificationKind::Info,
        false,
        Duration::minutes(-1),
        Duration::days(7),
    );
    for n in [&expired, &soon, &far] {
        store.insert(n).await.unwrap();
    }

    assert_eq!(service.cleanup_expired().await.unwrap(), 1);

    let remaining = store.find(&Default::default(), 10).await.unwrap();
    assert_eq!(remaining.len(), 2);
    let survivor_soon = remaining.iter().find(|n| n.id == soon.id).unwrap();
    let survivor_far = remaining.iter().find(|n| n.id == far.id).unwrap();
    // Survivors keep their read-state and content untouched.
    assert!(survivor_soon.is_read);
    assert_eq!(survivor_soon.message, "seeded message");
    assert!(!survivor_far.is_read);
}

#[tokio::test]
async fn mark_read_is_idempotent() {
    let (_store, service) = service_with_store();
    let id = service
        .create(None, None, NotificationKind::Info, "t", "m", None)
        .await
        .unwrap();

    service.mark_read(&id.to_string()).await.unwrap();
    // Second mark succeeds and reports no error.
    service.mark_read(&id.to_string()).await.unwrap();

    let page = service.list(&Caller::admin(), None, None).await.unwrap();
    assert!(page.items[0].is_read);
    assert_eq!(page.unread_count, 0);
}

#[tokio::test]
async fn mark_read_after_delete_is_not_found() {
    let (_store, service) = service_with_store();
    let id = service
        .create(None, None, NotificationKind::Info, "t", "m", None)
        .await
        .unwrap();

    service.delete(&id.to_string()).await.unwrap();
    let err = service.mark_read(&id.to_string()).await.unwrap_err();
    assert!(matches!(err, NotifyError::NotFound));
}

#[tokio::test]
async fn malformed_ids_fail_before_store_access() {
    let (_store, service) = service_with_store();
    assert!(matches!(
        service.mark_read("not-a-uuid").await.unwrap_err(),
        NotifyError::InvalidArgument(_)
    ));
    assert!(matches!(
        service.delete("").await.unwrap_err(),
        NotifyError::InvalidArgument(_)
    ));
}

#[tokio::test]
async fn delete_missing_record_is_not_found() {
    let (_store, service) = service_with_store();
    let err = service.delete(&Uuid::new_v4().to_string()).await.unwrap_err();
    assert!(matches!(err, NotifyError::NotFound));
}

#[tokio::test]
async fn non_privileged_caller_never_sees_foreign_records() {
    let (store, service) = service_with_store();
    let u1 = Uuid::new_v4();
    let u2 = Uuid::new_v4();
    for n in [
        seed(Some(u1), None, NotificationKind::Info, false, Duration::zero(), Duration::hours(1)),
        seed(Some(u2), None, NotificationKind::Info, false, Duration::zero(), Duration::hours(1)),
        // System notification, no owner.
        seed(None, None, NotificationKind::Warning, false, Duration::zero(), Duration::hours(1)),
    ] {
        store.insert(&n).await.unwrap();
    }

    let page = service.list(&Caller::user(u1), None, None).await.unwrap();
    assert_eq!(page.count, 1);
    assert!(page.items.iter().all(|n| n.owner == Some(u1)));

    // Privileged callers see everything, including the system record.
    let page = service.list(&Caller::admin(), None, None).await.unwrap();
    assert_eq!(page.count, 3);
}

#[tokio::test]
async fn non_privileged_caller_without_owner_is_unauthorized() {
    let (_store, service) = service_with_store();
    let caller = Caller {
        privileged: false,
        owner: None,
    };
    assert!(matches!(
        service.list(&caller, None, None).await.unwrap_err(),
        NotifyError::Unauthorized
    ));
    assert!(matches!(
        service.mark_all_read(&caller).await.unwrap_err(),
        NotifyError::Unauthorized
    ));
}

#[tokio::test]
async fn listing_is_newest_first_and_capped() {
    let (store, service) = service_with_store();
    let tenant = Uuid::new_v4();
    for i in 0..25 {
        store
            .insert(&seed(
                None,
                Some(tenant),
                NotificationKind::Info,
                false,
                Duration::seconds(-i),
                Duration::hours(1),
            ))
            .await
            .unwrap();
    }

    // Tenant-scoped listing caps at 20.
    let page = service
        .list(&Caller::admin(), None, Some(tenant))
        .await
        .unwrap();
    assert_eq!(page.count, 20);
    for pair in page.items.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }
    // The unread count covers the whole filter, not just the page.
    assert_eq!(page.unread_count, 25);
}

#[tokio::test]
async fn type_filter_narrows_listing() {
    let (store, service) = service_with_store();
    for kind in [
        NotificationKind::Error,
        NotificationKind::Error,
        NotificationKind::Info,
    ] {
        store
            .insert(&seed(None, None, kind, false, Duration::zero(), Duration::hours(1)))
            .await
            .unwrap();
    }

    let page = service
        .list(&Caller::admin(), Some(NotificationKind::Error), None)
        .await
        .unwrap();
    assert_eq!(page.count, 2);
}

#[tokio::test]
async fn mark_all_read_reports_modified_count() {
    let (store, service) = service_with_store();
    let owner = Uuid::new_v4();
    for is_read in [false, false, true] {
        store
            .insert(&seed(
                Some(owner),
                None,
                NotificationKind::Info,
                is_read,
                Duration::zero(),
                Duration::hours(1),
            ))
            .await
            .unwrap();
    }
    // A foreign unread record stays untouched.
    store
        .insert(&seed(
            Some(Uuid::new_v4()),
            None,
            NotificationKind::Info,
            false,
            Duration::zero(),
            Duration::hours(1),
        ))
        .await
        .unwrap();

    let caller = Caller::user(owner);
    assert_eq!(service.mark_all_read(&caller).await.unwrap(), 2);

    let page = service.list(&caller, None, None).await.unwrap();
    assert_eq!(page.unread_count, 0);

    // Nothing left to modify.
    assert_eq!(service.mark_all_read(&caller).await.unwrap(), 0);
}

#[tokio::test]
async fn limit_notification_shows_up_in_stats() {
    let (_store, service) = service_with_store();
    let tenant = Uuid::new_v4();
    service
        .create_limit_notification(tenant, "Acme Support", "monthly", 100, 100)
        .await
        .unwrap();

    let stats = service.stats().await.unwrap();
    assert!(stats.total >= 1);
    assert!(stats.active >= 1);
    assert!(stats.recent_24h >= 1);
    assert!(*stats.by_type.get("limit_expired").unwrap() >= 1);
}

#[tokio::test]
async fn limit_notification_carries_the_metadata_bag() {
    let (store, service) = service_with_store();
    let tenant = Uuid::new_v4();
    service
        .create_limit_notification(tenant, "Acme Support", "monthly", 90, 100)
        .await
        .unwrap();

    let all = store.find(&Default::default(), 1).await.unwrap();
    let n = &all[0];
    assert_eq!(n.kind, NotificationKind::LimitExpired);
    assert_eq!(n.tenant, Some(tenant));
    assert_eq!(n.owner, None, "limit notifications are system-scoped");
    assert_eq!(n.title, "Usage Limit Reached - Acme Support");

    let meta = n.metadata.as_ref().unwrap();
    assert_eq!(meta["limit_kind"], "monthly");
    assert_eq!(meta["current_usage"], 90);
    assert_eq!(meta["limit"], 100);
    assert_eq!(meta["tenant_name"], "Acme Support");
    assert_eq!(meta["severity"], "warning");
    assert_eq!(meta["auto_generated"], true);
}

#[tokio::test]
async fn stats_count_expired_records_by_type() {
    let (store, service) = service_with_store();
    store
        .insert(&seed(
            None,
            None,
            NotificationKind::Error,
            true,
            Duration::hours(-48),
            Duration::hours(-24),
        ))
        .await
        .unwrap();
    store
        .insert(&seed(None, None, NotificationKind::Error, false, Duration::zero(), Duration::hours(1)))
        .await
        .unwrap();

    let stats = service.stats().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.active, 1);
    assert_eq!(stats.unread, 1);
    // by_type spans active and expired records alike.
    assert_eq!(stats.by_type["error"], 2);
}
