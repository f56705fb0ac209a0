//! Time-boxed one-time codes gating the terminal booking transition.

use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Booking, BookingStatus, RedemptionCode, User};
use crate::services::{audit, booking, codes};
use crate::utils::error::AppError;

pub const CODE_TTL_HOURS: i64 = 12;
pub const MAX_ATTEMPTS: i32 = 5;

/// Issue (or re-issue) the booking's code. Only CONFIRMED bookings may
/// hold one. Re-issuing overwrites the prior code and resets the attempt
/// counter, so there is never more than one live code per booking.
pub async fn issue_code(
    pool: &PgPool,
    booking: &Booking,
    phone_e164: &str,
) -> Result<RedemptionCode, AppError> {
    if booking.status != BookingStatus::Confirmed {
        return Err(AppError::Redemption(
            "Booking must be confirmed to issue a code".to_string(),
        ));
    }

    let code = codes::generate_redemption_code();
    let expires_at = Utc::now() + Duration::hours(CODE_TTL_HOURS);

    let row = sqlx::query_as::<_, RedemptionCode>(
        r#"
        INSERT INTO redemption_codes (booking_id, phone_e164, code, expires_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (booking_id) DO UPDATE SET
            phone_e164 = EXCLUDED.phone_e164,
            code = EXCLUDED.code,
            expires_at = EXCLUDED.expires_at,
            is_verified = FALSE,
            verified_at = NULL,
            attempt_count = 0,
            last_attempt_at = NULL
        RETURNING *
        "#,
    )
    .bind(booking.id)
    .bind(phone_e164)
    .bind(&code)
    .bind(expires_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Verify a submitted code and, on success, drive the booking's terminal
/// transition in the same atomic unit as the attempt-count update.
///
/// The attempt counter and attempt time are recorded even when the
/// verdict is a failure: those paths commit the counter update before
/// surfacing the error. The 6th attempt is rejected regardless of
/// whether the code matches.
pub async fn verify_and_complete(
    pool: &PgPool,
    actor: &User,
    booking_id: Uuid,
    submitted_code: &str,
) -> Result<Booking, AppError> {
    let mut tx = pool.begin().await?;

    let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
        .bind(booking_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let code_row = sqlx::query_as::<_, RedemptionCode>(
        "SELECT * FROM redemption_codes WHERE booking_id = $1 FOR UPDATE",
    )
    .bind(booking.id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::Redemption("Code not issued".to_string()))?;

    // A retried verification of an already-verified code is a no-op
    // success, no matter how far the booking has moved since.
    if code_row.is_verified {
        tx.commit().await?;
        return Ok(booking);
    }

    if booking.status != BookingStatus::Confirmed {
        return Err(AppError::Conflict("Booking is not confirmed".to_string()));
    }

    let now = Utc::now();
    if now > code_row.expires_at {
        return Err(AppError::Redemption("Code expired".to_string()));
    }

    let attempts = code_row.attempt_count + 1;
    sqlx::query("UPDATE redemption_codes SET attempt_count = $1, last_attempt_at = $2 WHERE id = $3")
        .bind(attempts)
        .bind(now)
        .bind(code_row.id)
        .execute(&mut *tx)
        .await?;

    if attempts > MAX_ATTEMPTS {
        tx.commit().await?;
        return Err(AppError::Redemption("Too many attempts".to_string()));
    }
    if code_row.code != submitted_code {
        tx.commit().await?;
        return Err(AppError::Redemption("Invalid code".to_string()));
    }

    sqlx::query("UPDATE redemption_codes SET is_verified = TRUE, verified_at = $1 WHERE id = $2")
        .bind(now)
        .bind(code_row.id)
        .execute(&mut *tx)
        .await?;

    let completed = booking::complete_redemption(&mut tx, &booking).await?;

    tx.commit().await?;

    audit::record(
        pool,
        Some(actor.id),
        "code_verified",
        "booking",
        completed.id.to_string(),
        json!({ "voucher_id": completed.voucher_id }),
    )
    .await;

    Ok(completed)
}
