//! Eligibility matcher: filters and ranks open capacity against a
//! voucher's frozen policy. Read-only; exclusions are not errors, only
//! precondition failures are.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::models::{OfferWithProperty, PolicySnapshot, Voucher, VoucherStatus};
use crate::services::timeutils::{midnight_utc, nights_between};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct RankedOffer {
    pub offer: OfferWithProperty,
    pub effective_score: i32,
}

pub fn validate_voucher_active(voucher: &Voucher, now: DateTime<Utc>) -> Result<(), AppError> {
    if voucher.status != VoucherStatus::Active {
        return Err(AppError::Eligibility("Voucher is not active".to_string()));
    }
    if now < voucher.valid_from || now > voucher.valid_until {
        return Err(AppError::Eligibility(
            "Voucher is not within validity window".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_dates(
    voucher: &Voucher,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<(), AppError> {
    let nights = nights_between(check_in, check_out);
    if nights <= 0 {
        return Err(AppError::Validation("Invalid date range".to_string()));
    }
    if nights != i64::from(voucher.nights_included) {
        return Err(AppError::Eligibility(
            "Requested nights do not match voucher nights".to_string(),
        ));
    }
    Ok(())
}

fn weekday_name(date: NaiveDate) -> &'static str {
    ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
        [date.weekday().num_days_from_monday() as usize]
}

fn is_blackout(policy: &PolicySnapshot, check_in: NaiveDate, check_out: NaiveDate) -> bool {
    let mut cur = check_in;
    while cur < check_out {
        if policy.blackout_dates.contains(&cur) {
            return true;
        }
        cur += Duration::days(1);
    }
    false
}

/// An empty restriction set means any arrival day is allowed.
fn allowed_days_ok(policy: &PolicySnapshot, check_in: NaiveDate) -> bool {
    policy.allowed_days.is_empty()
        || policy
            .allowed_days
            .iter()
            .any(|d| d == weekday_name(check_in))
}

/// Check-in at local midnight must be at least the stricter of the
/// policy's and the offer's lead hours after `now`. Only the check-in
/// boundary is validated; there is no check-out-side lead-time rule.
fn lead_time_ok(
    policy: &PolicySnapshot,
    offer_min_lead_hours: i32,
    check_in: NaiveDate,
    now: DateTime<Utc>,
) -> bool {
    let min_hours = policy.lead_time_hours.max(offer_min_lead_hours);
    midnight_utc(check_in) >= now + Duration::hours(i64::from(min_hours))
}

fn payout_cap_ok(policy: &PolicySnapshot, rate_kobo: i64, nights: i64) -> bool {
    rate_kobo * nights <= policy.payout_cap_kobo
}

/// Pure filter + rank over pre-narrowed candidates. Each filter is a
/// hard exclusion. Effective score is property quality plus the offer's
/// room boost; ties break on ascending rate, then offer id.
pub fn rank_candidates(
    policy: &PolicySnapshot,
    now: DateTime<Utc>,
    check_in: NaiveDate,
    check_out: NaiveDate,
    candidates: Vec<OfferWithProperty>,
) -> Vec<RankedOffer> {
    let nights = nights_between(check_in, check_out);

    let mut results: Vec<RankedOffer> = candidates
        .into_iter()
        .filter(|offer| {
            !is_blackout(policy, check_in, check_out)
                && allowed_days_ok(policy, check_in)
                && lead_time_ok(policy, offer.min_lead_time_hours, check_in, now)
                && payout_cap_ok(policy, offer.rate_kobo, nights)
        })
        .map(|offer| {
            let effective_score = offer.quality_score + offer.room_quality_boost;
            RankedOffer {
                offer,
                effective_score,
            }
        })
        .collect();

    results.sort_by(|a, b| {
        b.effective_score
            .cmp(&a.effective_score)
            .then(a.offer.rate_kobo.cmp(&b.offer.rate_kobo))
            .then(a.offer.id.cmp(&b.offer.id))
    });

    results
}

/// Candidate narrowing in SQL (city, activity, approval, availability
/// window, SKU, score/tier gates, max stay), then the pure filters and
/// ranking in memory.
pub async fn query_eligible_offers(
    pool: &PgPool,
    voucher: &Voucher,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<Vec<RankedOffer>, AppError> {
    let policy = &voucher.policy.0;
    let nights = nights_between(check_in, check_out);

    let candidates = sqlx::query_as::<_, OfferWithProperty>(
        r#"
        SELECT o.id, o.property_id, o.room_type, o.start_date, o.end_date,
               o.units_per_day, o.rate_kobo, o.room_quality_boost,
               o.min_lead_time_hours, o.max_stay_nights, o.auto_confirm,
               p.name AS property_name, p.owner_id AS property_owner_id,
               p.quality_score, p.tier
        FROM offers o
        JOIN properties p ON p.id = o.property_id
        WHERE o.is_active
          AND p.is_active
          AND p.approval_status = 'approved'
          AND p.city = $1
          AND o.start_date <= $2
          AND o.end_date >= $3
          AND $4 = ANY(o.eligible_skus)
          AND p.quality_score BETWEEN $5 AND $6
          AND p.tier BETWEEN $7 AND $8
          AND o.max_stay_nights >= $9
        "#,
    )
    .bind(&policy.city)
    .bind(check_in)
    .bind(check_out)
    .bind(&policy.sku)
    .bind(policy.min_property_score)
    .bind(policy.max_property_score)
    .bind(policy.tier_min)
    .bind(policy.tier_max)
    .bind(nights)
    .fetch_all(pool)
    .await?;

    Ok(rank_candidates(
        policy,
        Utc::now(),
        check_in,
        check_out,
        candidates,
    ))
}
