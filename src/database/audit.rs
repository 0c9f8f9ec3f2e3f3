use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// One row of the audit log.
#[derive(Debug, Default)]
pub struct AuditRecord<'a> {
    pub user_id: Option<&'a Uuid>,
    pub event_type: &'a str,
    pub success: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub metadata: Option<JsonValue>,
}

impl PostgresRepository {
    /// Writes the event to the audit log and mirrors it to tracing.
    pub async fn record_audit_event(&self, record: AuditRecord<'_>) -> Result<(), AppError> {
        let user_id = record.user_id.map(Uuid::to_string);
        let user_id = user_id.as_deref().unwrap_or("-");
        let ip = record.ip_address.as_deref().unwrap_or("-");
        if record.success {
            tracing::info!(category = "audit", event_type = record.event_type, user_id, ip, "audit event");
        } else {
            tracing::warn!(category = "audit", event_type = record.event_type, user_id, ip, "audit event failed");
        }

        sqlx::query(
            r#"
            INSERT INTO audit_log (user_id, event_type, success, ip_address, user_agent, metadata)
            VALUES ($1, $2, $3, $4::inet, $5, $6)
            "#,
        )
        .bind(record.user_id)
        .bind(record.event_type)
        .bind(record.success)
        .bind(record.ip_address)
        .bind(record.user_agent)
        .bind(record.metadata)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Audit failures are logged and never fail the request being audited.
    pub async fn audit(&self, record: AuditRecord<'_>) {
        let event_type = record.event_type.to_string();
        if let Err(err) = self.record_audit_event(record).await {
            tracing::warn!(event_type, error = %err, "failed to write audit log entry");
        }
    }
}
