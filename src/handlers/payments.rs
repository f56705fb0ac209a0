use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;

use crate::auth::AuthUser;
use crate::models::{Payment, PaymentStatus, VoucherStatus};
use crate::services::paystack::verify_webhook_signature;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

const SIGNATURE_HEADER: &str = "x-paystack-signature";

/// Gateway webhook. Authenticated by HMAC-SHA512 over the raw payload;
/// nothing in the body is trusted before the signature passes. Replays
/// are no-ops because every update gates on the stored status.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !verify_webhook_signature(&state.config.paystack_secret_key, &body, signature) {
        return Err(AppError::Auth("Invalid webhook signature".to_string()));
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::Validation("Malformed webhook payload".to_string()))?;

    let event = payload.get("event").and_then(Value::as_str).unwrap_or("");
    let reference = payload
        .get("data")
        .and_then(|d| d.get("reference"))
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Validation("Missing reference".to_string()))?
        .to_string();

    if event == "charge.success" {
        settle_success(&state.pool, &reference, &payload).await?;
    } else {
        settle_failure_if_pending(&state.pool, &reference, &payload).await?;
    }

    Ok(empty_success("Webhook processed").into_response())
}

#[derive(Deserialize)]
pub struct VerifyPaymentQuery {
    pub reference: String,
}

#[derive(Serialize)]
struct VerifyPaymentResponse {
    payment_status: PaymentStatus,
    voucher_status: VoucherStatus,
}

/// Pull-side verification against the gateway, with the same idempotent
/// status gating as the webhook. An unrecognized gateway status is
/// surfaced to the caller after the payload has been stored.
pub async fn verify(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<VerifyPaymentQuery>,
) -> Result<Response, AppError> {
    user.require_customer()?;

    let data = state.payments.verify(&query.reference).await?;
    let status = data
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string();

    match status.as_str() {
        "success" => settle_success(&state.pool, &query.reference, &data).await?,
        "failed" | "abandoned" => {
            settle_failure_if_pending(&state.pool, &query.reference, &data).await?;
        }
        other => {
            store_payload(&state.pool, &query.reference, &data).await?;
            return Err(AppError::ExternalService(format!(
                "Unrecognized gateway status: {other}"
            )));
        }
    }

    let (payment_status, voucher_status): (PaymentStatus, VoucherStatus) = sqlx::query_as(
        r#"
        SELECT p.status, v.status FROM payments p
        JOIN vouchers v ON v.id = p.voucher_id
        WHERE p.reference = $1
        "#,
    )
    .bind(&query.reference)
    .fetch_one(&state.pool)
    .await?;

    let response = VerifyPaymentResponse {
        payment_status,
        voucher_status,
    };

    Ok(success(response, "Payment verified").into_response())
}

/// charge success: Payment PENDING -> SUCCESSFUL and Voucher CREATED ->
/// ACTIVE, both gated on current status so a replay changes nothing.
async fn settle_success(pool: &PgPool, reference: &str, payload: &Value) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let payment = lock_payment(&mut tx, reference).await?;
    sqlx::query("UPDATE payments SET gateway_payload = $1, updated_at = now() WHERE id = $2")
        .bind(payload)
        .bind(payment.id)
        .execute(&mut *tx)
        .await?;

    if payment.status != PaymentStatus::Successful {
        sqlx::query("UPDATE payments SET status = $1, updated_at = now() WHERE id = $2")
            .bind(PaymentStatus::Successful)
            .bind(payment.id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE vouchers SET status = $1 WHERE id = $2 AND status = $3")
            .bind(VoucherStatus::Active)
            .bind(payment.voucher_id)
            .bind(VoucherStatus::Created)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

async fn settle_failure_if_pending(
    pool: &PgPool,
    reference: &str,
    payload: &Value,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    let payment = lock_payment(&mut tx, reference).await?;
    sqlx::query("UPDATE payments SET gateway_payload = $1, updated_at = now() WHERE id = $2")
        .bind(payload)
        .bind(payment.id)
        .execute(&mut *tx)
        .await?;

    if payment.status == PaymentStatus::Pending {
        sqlx::query("UPDATE payments SET status = $1, updated_at = now() WHERE id = $2")
            .bind(PaymentStatus::Failed)
            .bind(payment.id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

async fn store_payload(pool: &PgPool, reference: &str, payload: &Value) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE payments SET gateway_payload = $1, updated_at = now() WHERE reference = $2",
    )
    .bind(payload)
    .bind(reference)
    .execute(pool)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Payment not found".to_string()));
    }
    Ok(())
}

async fn lock_payment(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    reference: &str,
) -> Result<Payment, AppError> {
    sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE reference = $1 FOR UPDATE")
        .bind(reference)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))
}
