//! Audit log repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{AuditLogEntry, AuditLogQuery};

/// Append-only destination for audit entries
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: &AuditLogEntry) -> Result<()>;
}

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: String,
    user_id: Option<String>,
    route: String,
    action: String,
    ip_address: Option<String>,
    metadata: String,
    created_at: String,
}

#[derive(Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, entry: &AuditLogEntry) -> Result<()> {
        let metadata = serde_json::Value::Object(entry.metadata.clone()).to_string();

        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, user_id, route, action, ip_address, metadata, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.id.to_string())
        .bind(entry.user_id.as_deref())
        .bind(&entry.route)
        .bind(&entry.action)
        .bind(entry.ip_address.as_deref())
        .bind(metadata)
        .bind(entry.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to insert audit log entry")?;

        Ok(())
    }

    pub async fn list(&self, query: &AuditLogQuery) -> Result<Vec<AuditLogEntry>> {
        let mut sql = String::from(
            "SELECT id, user_id, route, action, ip_address, metadata, created_at FROM audit_logs WHERE 1 = 1",
        );

        if query.user_id.is_some() {
            sql.push_str(" AND user_id = ?");
        }
        if query.route.is_some() {
            sql.push_str(" AND route = ?");
        }
        if query.action.is_some() {
            sql.push_str(" AND action = ?");
        }

        sql.push_str(" ORDER BY created_at DESC");

        if query.limit.is_some() {
            sql.push_str(" LIMIT ?");
        } else {
            sql.push_str(" LIMIT 100");
        }
        if query.offset.is_some() {
            sql.push_str(" OFFSET ?");
        }

        let mut q = sqlx::query_as::<_, AuditRow>(&sql);
        if let Some(ref user_id) = query.user_id {
            q = q.bind(user_id);
        }
        if let Some(ref route) = query.route {
            q = q.bind(route);
        }
        if let Some(ref action) = query.action {
            q = q.bind(action);
        }
        if let Some(limit) = query.limit {
            q = q.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            q = q.bind(offset as i64);
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .context("Failed to list audit logs")?;

        Ok(rows.into_iter().map(row_to_audit).collect())
    }
}

#[async_trait]
impl AuditSink for AuditRepository {
    async fn record(&self, entry: &AuditLogEntry) -> Result<()> {
        self.insert(entry).await
    }
}

fn parse_db_timestamp(ts: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S") {
        return DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc);
    }
    Utc::now()
}

fn row_to_audit(row: AuditRow) -> AuditLogEntry {
    AuditLogEntry {
        id: Uuid::parse_str(&row.id).unwrap_or_else(|_| Uuid::nil()),
        user_id: row.user_id,
        route: row.route,
        action: row.action,
        ip_address: row.ip_address,
        metadata: serde_json::from_str(&row.metadata).unwrap_or_default(),
        created_at: parse_db_timestamp(&row.created_at),
    }
}
