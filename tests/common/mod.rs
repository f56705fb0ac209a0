#![allow(dead_code)]

use chrono::{Duration, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use stayflex_server::models::{
    InventoryDay, PolicySnapshot, Role, User, Voucher, VoucherStatus,
};

pub const CITY: &str = "Lagos";
pub const SKU: &str = "LAG-2N";

pub async fn seed_user(pool: &PgPool, role: Role) -> User {
    sqlx::query_as::<_, User>(
        "INSERT INTO users (name, email, phone_e164, role) VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind("Test User")
    .bind(format!("{}@example.com", Uuid::new_v4().simple()))
    .bind("+2348012345678")
    .bind(role)
    .fetch_one(pool)
    .await
    .expect("seed user")
}

pub async fn seed_property(pool: &PgPool, owner: &User) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO properties
            (owner_id, name, city, quality_score, tier, is_active, approval_status)
        VALUES ($1, 'Test Lodge', $2, 50, 3, TRUE, 'approved')
        RETURNING id
        "#,
    )
    .bind(owner.id)
    .bind(CITY)
    .fetch_one(pool)
    .await
    .expect("seed property")
}

pub struct OfferSpec {
    pub rate_kobo: i64,
    pub units_per_day: i32,
    pub auto_confirm: bool,
    pub min_lead_time_hours: i32,
    pub room_quality_boost: i32,
    pub max_stay_nights: i32,
    pub eligible_skus: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Default for OfferSpec {
    fn default() -> Self {
        let today = Utc::now().date_naive();
        Self {
            rate_kobo: 40_000,
            units_per_day: 2,
            auto_confirm: false,
            min_lead_time_hours: 0,
            room_quality_boost: 0,
            max_stay_nights: 30,
            eligible_skus: vec![SKU.to_string()],
            start_date: today - Duration::days(1),
            end_date: today + Duration::days(365),
        }
    }
}

pub async fn seed_offer(pool: &PgPool, property_id: Uuid, spec: &OfferSpec) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO offers
            (property_id, room_type, start_date, end_date, units_per_day, rate_kobo,
             eligible_skus, room_quality_boost, min_lead_time_hours, max_stay_nights,
             auto_confirm, is_active)
        VALUES ($1, 'Standard', $2, $3, $4, $5, $6, $7, $8, $9, $10, TRUE)
        RETURNING id
        "#,
    )
    .bind(property_id)
    .bind(spec.start_date)
    .bind(spec.end_date)
    .bind(spec.units_per_day)
    .bind(spec.rate_kobo)
    .bind(&spec.eligible_skus)
    .bind(spec.room_quality_boost)
    .bind(spec.min_lead_time_hours)
    .bind(spec.max_stay_nights)
    .bind(spec.auto_confirm)
    .fetch_one(pool)
    .await
    .expect("seed offer")
}

pub fn default_policy() -> PolicySnapshot {
    PolicySnapshot {
        sku: SKU.to_string(),
        city: CITY.to_string(),
        min_property_score: 0,
        max_property_score: 100,
        tier_min: 1,
        tier_max: 10,
        payout_cap_kobo: 1_000_000,
        nights: 2,
        validity_days: 60,
        lead_time_hours: 0,
        blackout_dates: vec![],
        allowed_days: vec![],
    }
}

pub async fn seed_product(pool: &PgPool) -> String {
    let policy = default_policy();
    sqlx::query(
        r#"
        INSERT INTO voucher_products
            (sku, name, city, payout_cap_kobo, nights, validity_days, sell_price_kobo)
        VALUES ($1, 'Two Nights Lagos', $2, $3, $4, $5, 50000)
        ON CONFLICT (sku) DO NOTHING
        "#,
    )
    .bind(&policy.sku)
    .bind(&policy.city)
    .bind(policy.payout_cap_kobo)
    .bind(policy.nights)
    .bind(policy.validity_days)
    .execute(pool)
    .await
    .expect("seed product");
    policy.sku
}

pub async fn seed_voucher(
    pool: &PgPool,
    user: &User,
    status: VoucherStatus,
    policy: PolicySnapshot,
) -> Voucher {
    seed_product(pool).await;
    let now = Utc::now();
    sqlx::query_as::<_, Voucher>(
        r#"
        INSERT INTO vouchers
            (sku, user_id, code, status, valid_from, valid_until, nights_included,
             sell_price_kobo, policy)
        VALUES ($1, $2, $3, $4, $5, $6, $7, 50000, $8)
        RETURNING *
        "#,
    )
    .bind(SKU)
    .bind(user.id)
    .bind(format!("SV-{}", Uuid::new_v4().simple()))
    .bind(status)
    .bind(now - Duration::days(1))
    .bind(now + Duration::days(60))
    .bind(policy.nights)
    .bind(Json(policy))
    .fetch_one(pool)
    .await
    .expect("seed voucher")
}

pub async fn seed_active_voucher(pool: &PgPool, user: &User) -> Voucher {
    seed_voucher(pool, user, VoucherStatus::Active, default_policy()).await
}

/// A stay starting a week out, clear of any lead-time rule in play.
pub fn stay_range(nights: i64) -> (NaiveDate, NaiveDate) {
    let check_in = Utc::now().date_naive() + Duration::days(7);
    (check_in, check_in + Duration::days(nights))
}

pub async fn fetch_days(
    pool: &PgPool,
    offer_id: Uuid,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Vec<InventoryDay> {
    sqlx::query_as::<_, InventoryDay>(
        "SELECT * FROM offer_inventory_days
         WHERE offer_id = $1 AND date >= $2 AND date < $3
         ORDER BY date",
    )
    .bind(offer_id)
    .bind(check_in)
    .bind(check_out)
    .fetch_all(pool)
    .await
    .expect("fetch inventory days")
}

pub fn assert_ledger_invariant(days: &[InventoryDay]) {
    for day in days {
        assert!(day.reserved >= 0, "reserved negative on {}", day.date);
        assert!(day.booked >= 0, "booked negative on {}", day.date);
        assert!(
            day.reserved + day.booked <= day.capacity,
            "overallocation on {}: {} reserved + {} booked > {} capacity",
            day.date,
            day.reserved,
            day.booked,
            day.capacity
        );
    }
}
