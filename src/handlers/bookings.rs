use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::Booking;
use crate::services::{booking, redemption};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

pub async fn list_bookings(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    user.require_customer()?;

    let bookings = sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user.0.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(bookings, "Bookings retrieved").into_response())
}

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub voucher_id: Uuid,
    pub offer_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Response, AppError> {
    user.require_customer()?;
    if req.check_out <= req.check_in {
        return Err(AppError::Validation(
            "check_out must be after check_in".to_string(),
        ));
    }

    let booking = booking::create_booking(
        &state.pool,
        &user.0,
        req.voucher_id,
        req.offer_id,
        req.check_in,
        req.check_out,
    )
    .await?;

    let message = if booking.confirmation_required {
        "Booking pending owner confirmation"
    } else {
        "Booking confirmed"
    };

    Ok(created(booking, message).into_response())
}

#[derive(Deserialize, Default)]
pub struct RequestCodeRequest {
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Serialize)]
struct RequestCodeResponse {
    expires_at: DateTime<Utc>,
    delivered_via: &'static str,
}

/// Issue a redemption code for the caller's CONFIRMED booking and
/// deliver it (WhatsApp first, SMS fallback). The profile phone wins
/// over the payload phone.
pub async fn request_code(
    State(state): State<AppState>,
    user: AuthUser,
    Path(booking_id): Path<Uuid>,
    payload: Option<Json<RequestCodeRequest>>,
) -> Result<Response, AppError> {
    user.require_customer()?;

    let booking = sqlx::query_as::<_, Booking>(
        "SELECT * FROM bookings WHERE id = $1 AND user_id = $2",
    )
    .bind(booking_id)
    .bind(user.0.id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let payload_phone = payload.and_then(|Json(p)| p.phone);
    let phone = if user.0.phone_e164.is_empty() {
        payload_phone.unwrap_or_default()
    } else {
        user.0.phone_e164.clone()
    };
    let phone = normalize_phone_e164(&phone)?;

    let code = redemption::issue_code(&state.pool, &booking, &phone).await?;

    let property_name: String = sqlx::query_scalar("SELECT name FROM properties WHERE id = $1")
        .bind(booking.property_id)
        .fetch_one(&state.pool)
        .await?;

    let delivered_via = state
        .notifier
        .send_code_with_fallback(&state.pool, &booking, &code, &phone, &property_name)
        .await?;

    let response = RequestCodeResponse {
        expires_at: code.expires_at,
        delivered_via,
    };

    Ok(success(response, "Redemption code sent").into_response())
}

/// Light E.164 shape check: leading '+', then 8-15 digits.
fn normalize_phone_e164(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or("");
    if digits.len() < 8 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "A valid E.164 phone number is required".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}
