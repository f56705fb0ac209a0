use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::Booking;
use crate::services::{booking, redemption};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub async fn list_bookings(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    user.require_owner()?;

    let bookings = sqlx::query_as::<_, Booking>(
        r#"
        SELECT b.* FROM bookings b
        JOIN properties p ON p.id = b.property_id
        WHERE p.owner_id = $1
        ORDER BY b.created_at DESC
        "#,
    )
    .bind(user.0.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(success(bookings, "Bookings retrieved").into_response())
}

pub async fn confirm_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Response, AppError> {
    user.require_owner()?;

    let booking = booking::confirm_booking(&state.pool, &user.0, booking_id).await?;
    Ok(success(booking, "Booking confirmed").into_response())
}

pub async fn decline_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(booking_id): Path<Uuid>,
) -> Result<Response, AppError> {
    user.require_owner()?;

    let booking = booking::decline_booking(&state.pool, &user.0, booking_id).await?;
    Ok(success(booking, "Booking declined").into_response())
}

#[derive(Deserialize)]
pub struct RedeemCodeRequest {
    pub code: String,
}

/// Owner-side checkout: verify the guest's code and complete the
/// booking. Ownership is checked before the verification transaction.
pub async fn redeem_code(
    State(state): State<AppState>,
    user: AuthUser,
    Path(booking_id): Path<Uuid>,
    Json(req): Json<RedeemCodeRequest>,
) -> Result<Response, AppError> {
    user.require_owner()?;
    if req.code.len() < 4 || req.code.len() > 10 {
        return Err(AppError::Validation("Malformed code".to_string()));
    }

    let owner_id: Option<Uuid> = sqlx::query_scalar(
        r#"
        SELECT p.owner_id FROM bookings b
        JOIN properties p ON p.id = b.property_id
        WHERE b.id = $1
        "#,
    )
    .bind(booking_id)
    .fetch_optional(&state.pool)
    .await?;

    match owner_id {
        None => return Err(AppError::NotFound("Booking not found".to_string())),
        Some(id) if id != user.0.id => {
            return Err(AppError::Forbidden(
                "Booking belongs to another owner's property".to_string(),
            ))
        }
        Some(_) => {}
    }

    let booking =
        redemption::verify_and_complete(&state.pool, &user.0, booking_id, &req.code).await?;

    Ok(success(booking, "Booking completed").into_response())
}
