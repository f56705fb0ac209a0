use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// Append an audit record after the primary transaction has committed.
/// Fire-and-forget: a failed write is logged and never propagated, so it
/// can neither block nor roll back the transition it describes.
pub async fn record(
    pool: &PgPool,
    actor_id: Option<Uuid>,
    action_type: &str,
    entity_type: &str,
    entity_id: String,
    meta: Value,
) {
    let result = sqlx::query(
        "INSERT INTO audit_log (actor_id, action_type, entity_type, entity_id, meta)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(actor_id)
    .bind(action_type)
    .bind(entity_type)
    .bind(&entity_id)
    .bind(meta)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!(error = ?e, action_type, entity_id, "Failed to write audit record");
    }
}
