//! Per-night capacity ledger. Every mutation of reserved/booked counters
//! funnels through here, on a transaction owned by the caller.
//!
//! All four operations lock the affected rows `ORDER BY date` with
//! `FOR UPDATE`. The fixed date-ascending lock order across every caller
//! is what keeps two overlapping operations on the same offer from
//! deadlocking: they acquire common rows in the same relative order and
//! serialize instead.

use chrono::NaiveDate;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::InventoryDay;
use crate::services::timeutils::nights_between;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryMode {
    Reserve,
    Book,
}

/// Create missing ledger rows for `[check_in, check_out)`, seeded with
/// the offer's per-day unit count. Idempotent; the (offer_id, date)
/// uniqueness constraint turns concurrent duplicate inserts into no-ops.
pub async fn ensure_seeded(
    conn: &mut PgConnection,
    offer_id: Uuid,
    units_per_day: i32,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO offer_inventory_days (offer_id, date, capacity, reserved, booked)
        SELECT $1, d::date, $2, 0, 0
        FROM generate_series($3::date, $4::date - 1, '1 day') AS d
        ON CONFLICT (offer_id, date) DO NOTHING
        "#,
    )
    .bind(offer_id)
    .bind(units_per_day)
    .bind(check_in)
    .bind(check_out)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

async fn lock_range(
    conn: &mut PgConnection,
    offer_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<Vec<InventoryDay>, AppError> {
    let rows = sqlx::query_as::<_, InventoryDay>(
        r#"
        SELECT * FROM offer_inventory_days
        WHERE offer_id = $1 AND date >= $2 AND date < $3
        ORDER BY date
        FOR UPDATE
        "#,
    )
    .bind(offer_id)
    .bind(check_in)
    .bind(check_out)
    .fetch_all(&mut *conn)
    .await?;

    if rows.len() as i64 != nights_between(check_in, check_out) {
        return Err(AppError::Inventory(
            "Inventory rows missing for some nights".to_string(),
        ));
    }

    Ok(rows)
}

/// Increment `reserved` or `booked` by `units` for every night in the
/// range, or fail without touching anything. The first insufficient date
/// is named in the error; partial application is never observable.
pub async fn reserve_or_book(
    conn: &mut PgConnection,
    offer_id: Uuid,
    units_per_day: i32,
    check_in: NaiveDate,
    check_out: NaiveDate,
    units: i32,
    mode: InventoryMode,
) -> Result<(), AppError> {
    ensure_seeded(conn, offer_id, units_per_day, check_in, check_out).await?;
    let rows = lock_range(conn, offer_id, check_in, check_out).await?;

    for row in &rows {
        if row.available() < units {
            return Err(AppError::Inventory(format!("Sold out for {}", row.date)));
        }
    }

    let sql = match mode {
        InventoryMode::Reserve => {
            "UPDATE offer_inventory_days SET reserved = reserved + $1
             WHERE offer_id = $2 AND date >= $3 AND date < $4"
        }
        InventoryMode::Book => {
            "UPDATE offer_inventory_days SET booked = booked + $1
             WHERE offer_id = $2 AND date >= $3 AND date < $4"
        }
    };

    sqlx::query(sql)
        .bind(units)
        .bind(offer_id)
        .bind(check_in)
        .bind(check_out)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Shift `units` from reserved to booked on every night, requiring
/// `reserved >= units` throughout. Used by the owner-confirm transition.
pub async fn convert_reserved_to_booked(
    conn: &mut PgConnection,
    offer_id: Uuid,
    units_per_day: i32,
    check_in: NaiveDate,
    check_out: NaiveDate,
    units: i32,
) -> Result<(), AppError> {
    ensure_seeded(conn, offer_id, units_per_day, check_in, check_out).await?;
    let rows = lock_range(conn, offer_id, check_in, check_out).await?;

    for row in &rows {
        if row.reserved < units {
            return Err(AppError::Inventory(format!(
                "Not enough reserved inventory to convert for {}",
                row.date
            )));
        }
    }

    sqlx::query(
        "UPDATE offer_inventory_days SET reserved = reserved - $1, booked = booked + $1
         WHERE offer_id = $2 AND date >= $3 AND date < $4",
    )
    .bind(units)
    .bind(offer_id)
    .bind(check_in)
    .bind(check_out)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Symmetric decrement of reserved or booked; fails on underflow without
/// mutating anything.
pub async fn release(
    conn: &mut PgConnection,
    offer_id: Uuid,
    units_per_day: i32,
    check_in: NaiveDate,
    check_out: NaiveDate,
    units: i32,
    mode: InventoryMode,
) -> Result<(), AppError> {
    ensure_seeded(conn, offer_id, units_per_day, check_in, check_out).await?;
    let rows = lock_range(conn, offer_id, check_in, check_out).await?;

    for row in &rows {
        let held = match mode {
            InventoryMode::Reserve => row.reserved,
            InventoryMode::Book => row.booked,
        };
        if held < units {
            let counter = match mode {
                InventoryMode::Reserve => "Reserved",
                InventoryMode::Book => "Booked",
            };
            return Err(AppError::Inventory(format!(
                "{counter} underflow for {}",
                row.date
            )));
        }
    }

    let sql = match mode {
        InventoryMode::Reserve => {
            "UPDATE offer_inventory_days SET reserved = reserved - $1
             WHERE offer_id = $2 AND date >= $3 AND date < $4"
        }
        InventoryMode::Book => {
            "UPDATE offer_inventory_days SET booked = booked - $1
             WHERE offer_id = $2 AND date >= $3 AND date < $4"
        }
    };

    sqlx::query(sql)
        .bind(units)
        .bind(offer_id)
        .bind(check_in)
        .bind(check_out)
        .execute(&mut *conn)
        .await?;

    Ok(())
}
