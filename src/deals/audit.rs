// Audit logger for deal evaluation
//
// Records evaluation and selection outcomes to an audit trail. Failures are
// logged and swallowed so a broken audit table can never block a checkout.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Writes deal evaluation events to the audit trail
pub struct AuditLogger {
    pool: PgPool,
}

impl AuditLogger {
    /// Create a new AuditLogger
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Log a checkout evaluation (eligible set and selection outcome)
    pub async fn log_evaluation(&self, order_id: Uuid, event_data: JsonValue, effect: &str) {
        if let Err(e) = self
            .insert_audit_record(order_id, "evaluation", None, event_data, effect)
            .await
        {
            tracing::warn!("Failed to log deal evaluation audit record: {}", e);
        }
    }

    /// Log a usage commit for a single applied deal
    pub async fn log_usage_commit(
        &self,
        order_id: Uuid,
        deal_id: Uuid,
        event_data: JsonValue,
        effect: &str,
    ) {
        if let Err(e) = self
            .insert_audit_record(order_id, "usage_commit", Some(deal_id), event_data, effect)
            .await
        {
            tracing::warn!("Failed to log usage commit audit record: {}", e);
        }
    }

    async fn insert_audit_record(
        &self,
        order_id: Uuid,
        event_type: &str,
        deal_id: Option<Uuid>,
        event_data: JsonValue,
        effect: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO deal_audit_log (order_id, event_type, deal_id, event_data, effect)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order_id)
        .bind(event_type)
        .bind(deal_id)
        .bind(event_data)
        .bind(effect)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All audit records for an order, oldest first
    pub async fn records_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<AuditRecord>, sqlx::Error> {
        sqlx::query_as::<_, AuditRecord>(
            r#"
            SELECT id, order_id, event_type, deal_id, event_data, effect, created_at
            FROM deal_audit_log
            WHERE order_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
    }
}

/// One row of the deal audit trail
#[derive(Debug, Clone, serde::Serialize, sqlx::FromRow)]
pub struct AuditRecord {
    pub id: i64,
    pub order_id: Uuid,
    pub event_type: String,
    pub deal_id: Option<Uuid>,
    pub event_data: JsonValue,
    pub effect: String,
    pub created_at: DateTime<Utc>,
}
