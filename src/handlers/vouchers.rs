use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::types::Json as SqlJson;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::{PolicySnapshot, Voucher, VoucherProduct, VoucherStatus};
use crate::services::eligibility::{self, RankedOffer};
use crate::services::{codes, timeutils};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

const VOUCHER_CODE_PREFIX: &str = "SV";

pub async fn list_vouchers(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    user.require_customer()?;

    let vouchers = sqlx::query_as::<_, Voucher>(
        "SELECT * FROM vouchers WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user.0.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(vouchers, "Vouchers retrieved").into_response())
}

#[derive(Deserialize)]
pub struct PurchaseVoucherRequest {
    pub sku: String,
    pub email: String,
}

#[derive(Serialize)]
struct PurchaseVoucherResponse {
    voucher_id: Uuid,
    voucher_code: String,
    payment_reference: String,
    authorization_url: String,
}

/// Creates Voucher(created) + Payment(pending) with the product's rules
/// frozen into the voucher, then initializes the gateway transaction.
pub async fn purchase_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<PurchaseVoucherRequest>,
) -> Result<Response, AppError> {
    user.require_customer()?;
    if !req.email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }

    let product = sqlx::query_as::<_, VoucherProduct>(
        "SELECT * FROM voucher_products WHERE sku = $1 AND is_active",
    )
    .bind(&req.sku)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Voucher product not found".to_string()))?;

    let now = Utc::now();
    let reference = format!("sv_{}", Uuid::new_v4().simple());
    let snapshot = PolicySnapshot::from_product(&product);

    let mut tx = state.pool.begin().await?;

    let code = unique_voucher_code(&mut tx).await?;
    let voucher = sqlx::query_as::<_, Voucher>(
        r#"
        INSERT INTO vouchers
            (sku, user_id, code, status, valid_from, valid_until,
             nights_included, sell_price_kobo, policy)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(&product.sku)
    .bind(user.0.id)
    .bind(&code)
    .bind(VoucherStatus::Created)
    .bind(now)
    .bind(now + Duration::days(i64::from(product.validity_days)))
    .bind(product.nights)
    .bind(product.sell_price_kobo)
    .bind(SqlJson(&snapshot))
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO payments (voucher_id, user_id, reference, amount_kobo)
         VALUES ($1, $2, $3, $4)",
    )
    .bind(voucher.id)
    .bind(user.0.id)
    .bind(&reference)
    .bind(product.sell_price_kobo)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    let init = state
        .payments
        .initialize(
            &req.email,
            product.sell_price_kobo,
            &reference,
            json!({ "voucher_id": voucher.id, "sku": product.sku, "user_id": user.0.id }),
        )
        .await?;

    let payload = PurchaseVoucherResponse {
        voucher_id: voucher.id,
        voucher_code: voucher.code,
        payment_reference: reference,
        authorization_url: init.authorization_url,
    };

    Ok(created(payload, "Voucher created, awaiting payment").into_response())
}

async fn unique_voucher_code(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
) -> Result<String, AppError> {
    loop {
        let code = codes::generate_voucher_code(VOUCHER_CODE_PREFIX);
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM vouchers WHERE code = $1)")
                .bind(&code)
                .fetch_one(&mut **tx)
                .await?;
        if !taken {
            return Ok(code);
        }
    }
}

#[derive(Deserialize)]
pub struct EligibilityRequest {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

#[derive(Serialize)]
struct EligibleOfferView {
    offer_id: Uuid,
    property_id: Uuid,
    property_name: String,
    room_type: String,
    rate_kobo: i64,
    auto_confirm: bool,
    effective_score: i32,
}

impl From<RankedOffer> for EligibleOfferView {
    fn from(ranked: RankedOffer) -> Self {
        Self {
            offer_id: ranked.offer.id,
            property_id: ranked.offer.property_id,
            property_name: ranked.offer.property_name,
            room_type: ranked.offer.room_type,
            rate_kobo: ranked.offer.rate_kobo,
            auto_confirm: ranked.offer.auto_confirm,
            effective_score: ranked.effective_score,
        }
    }
}

pub async fn voucher_eligibility(
    State(state): State<AppState>,
    user: AuthUser,
    Path(voucher_id): Path<Uuid>,
    Json(req): Json<EligibilityRequest>,
) -> Result<Response, AppError> {
    user.require_customer()?;
    if req.check_out <= req.check_in {
        return Err(AppError::Validation(
            "check_out must be after check_in".to_string(),
        ));
    }

    let voucher = sqlx::query_as::<_, Voucher>(
        "SELECT * FROM vouchers WHERE id = $1 AND user_id = $2",
    )
    .bind(voucher_id)
    .bind(user.0.id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Voucher not found".to_string()))?;

    eligibility::validate_voucher_active(&voucher, Utc::now())?;
    eligibility::validate_dates(&voucher, req.check_in, req.check_out)?;

    let ranked =
        eligibility::query_eligible_offers(&state.pool, &voucher, req.check_in, req.check_out)
            .await?;

    let nights = timeutils::nights_between(req.check_in, req.check_out);
    tracing::debug!(
        voucher_id = %voucher.id,
        nights,
        candidates = ranked.len(),
        "Eligibility query"
    );

    let views: Vec<EligibleOfferView> = ranked.into_iter().map(EligibleOfferView::from).collect();

    Ok(success(views, "Eligible offers retrieved").into_response())
}
