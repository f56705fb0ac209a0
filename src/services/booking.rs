//! Booking lifecycle state machine. Every transition runs as one atomic
//! transaction covering the voucher, the capacity ledger, and the
//! booking row; the voucher lock is always taken before any capacity
//! row lock.

use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::{
    Booking, BookingStatus, Offer, OfferWithProperty, User, Voucher, VoucherStatus,
};
use crate::services::inventory::{self, InventoryMode};
use crate::services::timeutils::nights_between;
use crate::services::{audit, eligibility};
use crate::utils::error::AppError;

/// Window an owner has to confirm a PENDING booking.
pub const OWNER_CONFIRM_SLA_HOURS: i64 = 2;

const CREATE_BOOKING_SQL: &str = r#"
    INSERT INTO bookings
        (voucher_id, offer_id, property_id, user_id, status, check_in, check_out,
         reserved_units, confirmation_required, confirm_by)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
    RETURNING *
"#;

/// Create a booking against an active voucher. The offer must be in the
/// eligible set recomputed here, server-side; a client-supplied offer id
/// is never trusted on its own.
pub async fn create_booking(
    pool: &PgPool,
    user: &User,
    voucher_id: Uuid,
    offer_id: Uuid,
    check_in: chrono::NaiveDate,
    check_out: chrono::NaiveDate,
) -> Result<Booking, AppError> {
    let voucher = sqlx::query_as::<_, Voucher>(
        "SELECT * FROM vouchers WHERE id = $1 AND user_id = $2",
    )
    .bind(voucher_id)
    .bind(user.id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Voucher not found".to_string()))?;

    let now = Utc::now();
    eligibility::validate_voucher_active(&voucher, now)?;
    eligibility::validate_dates(&voucher, check_in, check_out)?;

    let eligible = eligibility::query_eligible_offers(pool, &voucher, check_in, check_out).await?;
    let offer: OfferWithProperty = eligible
        .into_iter()
        .find(|ranked| ranked.offer.id == offer_id)
        .map(|ranked| ranked.offer)
        .ok_or_else(|| {
            AppError::Eligibility("Offer not eligible for this voucher and dates".to_string())
        })?;

    let units = 1;
    let nights = nights_between(check_in, check_out);

    let mut tx = pool.begin().await?;

    // Voucher row lock serializes concurrent create attempts on the same
    // voucher; only one can move it past ACTIVE.
    let voucher = sqlx::query_as::<_, Voucher>("SELECT * FROM vouchers WHERE id = $1 FOR UPDATE")
        .bind(voucher.id)
        .fetch_one(&mut *tx)
        .await?;
    if voucher.status != VoucherStatus::Active {
        return Err(AppError::Conflict("Voucher not active".to_string()));
    }

    let (status, confirmation_required, confirm_by) = if offer.auto_confirm {
        inventory::reserve_or_book(
            &mut tx,
            offer.id,
            offer.units_per_day,
            check_in,
            check_out,
            units,
            InventoryMode::Book,
        )
        .await?;
        (BookingStatus::Confirmed, false, None)
    } else {
        inventory::reserve_or_book(
            &mut tx,
            offer.id,
            offer.units_per_day,
            check_in,
            check_out,
            units,
            InventoryMode::Reserve,
        )
        .await?;
        (
            BookingStatus::Pending,
            true,
            Some(now + Duration::hours(OWNER_CONFIRM_SLA_HOURS)),
        )
    };

    let booking = sqlx::query_as::<_, Booking>(CREATE_BOOKING_SQL)
        .bind(voucher.id)
        .bind(offer.id)
        .bind(offer.property_id)
        .bind(user.id)
        .bind(status)
        .bind(check_in)
        .bind(check_out)
        .bind(units)
        .bind(confirmation_required)
        .bind(confirm_by)
        .fetch_one(&mut *tx)
        .await?;

    sqlx::query("UPDATE vouchers SET status = $1 WHERE id = $2")
        .bind(VoucherStatus::Reserved)
        .bind(voucher.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    audit::record(
        pool,
        Some(user.id),
        "booking_created",
        "booking",
        booking.id.to_string(),
        json!({
            "offer_id": offer.id,
            "auto_confirm": offer.auto_confirm,
            "nights": nights,
        }),
    )
    .await;

    Ok(booking)
}

/// PENDING -> CONFIRMED, converting the reserved units to booked. An
/// inventory failure here means capacity disappeared between reservation
/// and confirmation; the booking stays PENDING and the caller sees the
/// conflict.
pub async fn confirm_booking(
    pool: &PgPool,
    owner: &User,
    booking_id: Uuid,
) -> Result<Booking, AppError> {
    let mut tx = pool.begin().await?;

    let (booking, offer) = lock_booking_for_owner(&mut tx, owner, booking_id).await?;
    if booking.status != BookingStatus::Pending {
        return Err(AppError::Conflict("Booking not pending".to_string()));
    }

    inventory::convert_reserved_to_booked(
        &mut tx,
        offer.id,
        offer.units_per_day,
        booking.check_in,
        booking.check_out,
        booking.reserved_units,
    )
    .await?;

    let booking = sqlx::query_as::<_, Booking>(
        "UPDATE bookings SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(BookingStatus::Confirmed)
    .bind(booking.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    audit::record(
        pool,
        Some(owner.id),
        "owner_confirmed",
        "booking",
        booking.id.to_string(),
        json!({}),
    )
    .await;

    Ok(booking)
}

/// PENDING -> CANCELLED. Releases the reserved units and hands the
/// voucher back (RESERVED -> ACTIVE) so it can be redeemed elsewhere.
pub async fn decline_booking(
    pool: &PgPool,
    owner: &User,
    booking_id: Uuid,
) -> Result<Booking, AppError> {
    let mut tx = pool.begin().await?;

    let (booking, offer) = lock_booking_for_owner(&mut tx, owner, booking_id).await?;
    if booking.status != BookingStatus::Pending {
        return Err(AppError::Conflict("Booking not pending".to_string()));
    }

    inventory::release(
        &mut tx,
        offer.id,
        offer.units_per_day,
        booking.check_in,
        booking.check_out,
        booking.reserved_units,
        InventoryMode::Reserve,
    )
    .await?;

    let booking = sqlx::query_as::<_, Booking>(
        "UPDATE bookings SET status = $1, cancelled_reason = $2, updated_at = now()
         WHERE id = $3 RETURNING *",
    )
    .bind(BookingStatus::Cancelled)
    .bind("owner_declined")
    .bind(booking.id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE vouchers SET status = $1 WHERE id = $2")
        .bind(VoucherStatus::Active)
        .bind(booking.voucher_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    audit::record(
        pool,
        Some(owner.id),
        "owner_declined",
        "booking",
        booking.id.to_string(),
        json!({}),
    )
    .await;

    Ok(booking)
}

/// CONFIRMED -> COMPLETED, on the caller's transaction (driven by a
/// verified redemption code). Marks the voucher REDEEMED and creates the
/// payout obligation exactly once; the ON CONFLICT guard makes duplicate
/// redemption triggers idempotent.
///
/// The payout amount is computed from the offer's rate as it stands now,
/// not a rate frozen at booking creation. If offers ever become mutable
/// after a booking exists this is a consistency gap to revisit.
pub async fn complete_redemption(
    conn: &mut PgConnection,
    booking: &Booking,
) -> Result<Booking, AppError> {
    if booking.status != BookingStatus::Confirmed {
        return Err(AppError::Conflict("Booking is not confirmed".to_string()));
    }

    let completed = sqlx::query_as::<_, Booking>(
        "UPDATE bookings SET status = $1, updated_at = now() WHERE id = $2 RETURNING *",
    )
    .bind(BookingStatus::Completed)
    .bind(booking.id)
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("UPDATE vouchers SET status = $1 WHERE id = $2")
        .bind(VoucherStatus::Redeemed)
        .bind(booking.voucher_id)
        .execute(&mut *conn)
        .await?;

    let offer = sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE id = $1")
        .bind(booking.offer_id)
        .fetch_one(&mut *conn)
        .await?;
    let owner_id: Uuid = sqlx::query_scalar("SELECT owner_id FROM properties WHERE id = $1")
        .bind(booking.property_id)
        .fetch_one(&mut *conn)
        .await?;

    let nights = nights_between(booking.check_in, booking.check_out);
    let amount_kobo = offer.rate_kobo * nights * i64::from(booking.reserved_units);

    sqlx::query(
        "INSERT INTO payouts (booking_id, owner_id, amount_kobo)
         VALUES ($1, $2, $3)
         ON CONFLICT (booking_id) DO NOTHING",
    )
    .bind(booking.id)
    .bind(owner_id)
    .bind(amount_kobo)
    .execute(&mut *conn)
    .await?;

    Ok(completed)
}

/// Lock the booking row and verify the acting owner actually owns the
/// underlying property. Returns the offer alongside for ledger calls.
async fn lock_booking_for_owner(
    conn: &mut PgConnection,
    owner: &User,
    booking_id: Uuid,
) -> Result<(Booking, Offer), AppError> {
    let booking =
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
            .bind(booking_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    let property_owner: Uuid = sqlx::query_scalar("SELECT owner_id FROM properties WHERE id = $1")
        .bind(booking.property_id)
        .fetch_one(&mut *conn)
        .await?;
    if property_owner != owner.id {
        return Err(AppError::Forbidden(
            "Booking belongs to another owner's property".to_string(),
        ));
    }

    let offer = sqlx::query_as::<_, Offer>("SELECT * FROM offers WHERE id = $1")
        .bind(booking.offer_id)
        .fetch_one(&mut *conn)
        .await?;

    Ok((booking, offer))
}
