use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::{Payout, PayoutStatus, VoucherProduct};
use crate::services::audit;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

const COVERAGE_HORIZON_DAYS: i64 = 30;
const SELLABLE_MIN_PROPERTIES: i64 = 3;
const SELLABLE_MIN_OFFERS: i64 = 10;

#[derive(Deserialize)]
pub struct CoverageQuery {
    pub sku: String,
}

#[derive(Serialize)]
struct CoverageResponse {
    sku: String,
    city: String,
    eligible_properties_next_30_days: i64,
    eligible_offers_next_30_days: i64,
    sell_enabled: bool,
}

/// Rough supply check for a SKU over the next 30 days. Counts offers
/// passing the static gates, not night-level inventory.
pub async fn coverage(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CoverageQuery>,
) -> Result<Response, AppError> {
    user.require_admin()?;

    let product =
        sqlx::query_as::<_, VoucherProduct>("SELECT * FROM voucher_products WHERE sku = $1")
            .bind(&query.sku)
            .fetch_optional(&state.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Voucher product not found".to_string()))?;

    let start = Utc::now().date_naive();
    let end = start + Duration::days(COVERAGE_HORIZON_DAYS);

    let (properties, offers): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(DISTINCT o.property_id), COUNT(*)
        FROM offers o
        JOIN properties p ON p.id = o.property_id
        WHERE o.is_active
          AND p.is_active
          AND p.approval_status = 'approved'
          AND p.city = $1
          AND $2 = ANY(o.eligible_skus)
          AND o.start_date <= $3
          AND o.end_date >= $4
          AND p.quality_score BETWEEN $5 AND $6
          AND p.tier BETWEEN $7 AND $8
        "#,
    )
    .bind(&product.city)
    .bind(&product.sku)
    .bind(end)
    .bind(start)
    .bind(product.min_property_score)
    .bind(product.max_property_score)
    .bind(product.tier_min)
    .bind(product.tier_max)
    .fetch_one(&state.pool)
    .await?;

    let response = CoverageResponse {
        sku: product.sku,
        city: product.city,
        eligible_properties_next_30_days: properties,
        eligible_offers_next_30_days: offers,
        sell_enabled: properties >= SELLABLE_MIN_PROPERTIES && offers >= SELLABLE_MIN_OFFERS,
    };

    Ok(success(response, "Coverage computed").into_response())
}

pub async fn approve_payout(
    State(state): State<AppState>,
    user: AuthUser,
    Path(payout_id): Path<Uuid>,
) -> Result<Response, AppError> {
    user.require_admin()?;

    let mut tx = state.pool.begin().await?;
    let payout = lock_payout(&mut tx, payout_id).await?;
    if payout.status != PayoutStatus::Pending {
        return Err(AppError::Conflict("Payout not pending".to_string()));
    }

    let payout = sqlx::query_as::<_, Payout>(
        "UPDATE payouts SET status = $1, approved_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(PayoutStatus::Approved)
    .bind(payout.id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    audit::record(
        &state.pool,
        Some(user.0.id),
        "payout_approved",
        "payout",
        payout.id.to_string(),
        json!({ "booking_id": payout.booking_id }),
    )
    .await;

    Ok(success(payout, "Payout approved").into_response())
}

#[derive(Deserialize, Default)]
pub struct MarkPaidRequest {
    #[serde(default)]
    pub payment_reference: String,
}

pub async fn mark_payout_paid(
    State(state): State<AppState>,
    user: AuthUser,
    Path(payout_id): Path<Uuid>,
    payload: Option<Json<MarkPaidRequest>>,
) -> Result<Response, AppError> {
    user.require_admin()?;
    let reference = payload.map(|Json(p)| p.payment_reference).unwrap_or_default();

    let mut tx = state.pool.begin().await?;
    let payout = lock_payout(&mut tx, payout_id).await?;
    if payout.status != PayoutStatus::Approved {
        return Err(AppError::Conflict("Payout not approved".to_string()));
    }

    let payout = sqlx::query_as::<_, Payout>(
        "UPDATE payouts SET status = $1, paid_at = now(), payment_reference = $2
         WHERE id = $3 RETURNING *",
    )
    .bind(PayoutStatus::Paid)
    .bind(&reference)
    .bind(payout.id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    audit::record(
        &state.pool,
        Some(user.0.id),
        "payout_paid",
        "payout",
        payout.id.to_string(),
        json!({ "booking_id": payout.booking_id, "payment_reference": reference }),
    )
    .await;

    Ok(success(payout, "Payout marked paid").into_response())
}

async fn lock_payout(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    payout_id: Uuid,
) -> Result<Payout, AppError> {
    sqlx::query_as::<_, Payout>("SELECT * FROM payouts WHERE id = $1 FOR UPDATE")
        .bind(payout_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Payout not found".to_string()))
}
