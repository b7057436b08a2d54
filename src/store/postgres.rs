use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::Postgres;
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

use crate::models::notification::{Notification, NotificationKind};
use crate::store::{NotificationFilter, NotificationStore, RetentionStore};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

const SELECT_COLUMNS: &str = "id, project_id, user_id, kind, title, message, \
                              metadata, is_read, created_at, expires_at";

/// Append the filter's predicates as a WHERE clause. Shared by every query
/// that takes a filter so list, count, and bulk update stay in lockstep.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &NotificationFilter) {
    qb.push(" WHERE TRUE");
    if let Some(tenant) = filter.tenant {
        qb.push(" AND project_id = ").push_bind(tenant);
    }
    if let Some(owner) = filter.owner {
        qb.push(" AND user_id = ").push_bind(owner);
    }
    if let Some(kind) = filter.kind {
        qb.push(" AND kind = ").push_bind(kind.as_str());
    }
    if filter.unread_only {
        qb.push(" AND is_read = FALSE");
    }
    if let Some(now) = filter.active_at {
        qb.push(" AND expires_at > ").push_bind(now);
    }
    if let Some(since) = filter.created_after {
        qb.push(" AND created_at >= ").push_bind(since);
    }
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    project_id: Option<Uuid>,
    user_id: Option<Uuid>,
    kind: String,
    title: String,
    message: String,
    metadata: Option<serde_json::Value>,
    is_read: bool,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = anyhow::Error;

    fn try_from(row: NotificationRow) -> anyhow::Result<Self> {
        Ok(Notification {
            id: row.id,
            tenant: row.project_id,
            owner: row.user_id,
            kind: NotificationKind::from_str(&row.kind)?,
            title: row.title,
            message: row.message,
            metadata: row.metadata,
            is_read: row.is_read,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

#[async_trait]
impl NotificationStore for PgStore {
    async fn insert(&self, n: &Notification) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO notifications
               (id, project_id, user_id, kind, title, message, metadata, is_read, created_at, expires_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(n.id)
        .bind(n.tenant)
        .bind(n.owner)
        .bind(n.kind.as_str())
        .bind(&n.title)
        .bind(&n.message)
        .bind(&n.metadata)
        .bind(n.is_read)
        .bind(n.created_at)
        .bind(n.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(
        &self,
        filter: &NotificationFilter,
        limit: i64,
    ) -> anyhow::Result<Vec<Notification>> {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM notifications", SELECT_COLUMNS));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ").push_bind(limit);

        let rows: Vec<NotificationRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn count(&self, filter: &NotificationFilter) -> anyhow::Result<u64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM notifications");
        push_filter(&mut qb, filter);

        let count: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(count as u64)
    }

    async fn mark_read(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_read(&self, filter: &NotificationFilter) -> anyhow::Result<u64> {
        let mut qb = QueryBuilder::new("UPDATE notifications SET is_read = TRUE");
        push_filter(&mut qb, filter);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM notifications WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_by_kind(&self) -> anyhow::Result<Vec<(NotificationKind, u64)>> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT kind, COUNT(*) FROM notifications GROUP BY kind")
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(kind, count)| Ok((NotificationKind::from_str(&kind)?, count as u64)))
            .collect()
    }
}

#[async_trait]
impl RetentionStore for PgStore {
    async fn prune_chat_history(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM chat_messages WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn prune_usage_logs(&self, cutoff: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query("DELETE FROM usage_logs WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
