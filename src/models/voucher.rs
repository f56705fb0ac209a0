use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "voucher_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VoucherStatus {
    Created,
    Active,
    Reserved,
    Redeemed,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VoucherProduct {
    pub sku: String,
    pub name: String,
    pub city: String,
    pub min_property_score: i32,
    pub max_property_score: i32,
    pub tier_min: i32,
    pub tier_max: i32,
    pub payout_cap_kobo: i64,
    pub nights: i32,
    pub validity_days: i32,
    pub lead_time_hours: i32,
    pub blackout_dates: Vec<NaiveDate>,
    pub allowed_days: Vec<String>,
    pub sell_price_kobo: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// The redemption rules frozen into a voucher at purchase time. Later
/// edits to the live product never touch an issued voucher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySnapshot {
    pub sku: String,
    pub city: String,
    pub min_property_score: i32,
    pub max_property_score: i32,
    pub tier_min: i32,
    pub tier_max: i32,
    pub payout_cap_kobo: i64,
    pub nights: i32,
    pub validity_days: i32,
    pub lead_time_hours: i32,
    pub blackout_dates: Vec<NaiveDate>,
    pub allowed_days: Vec<String>,
}

impl PolicySnapshot {
    pub fn from_product(product: &VoucherProduct) -> Self {
        Self {
            sku: product.sku.clone(),
            city: product.city.clone(),
            min_property_score: product.min_property_score,
            max_property_score: product.max_property_score,
            tier_min: product.tier_min,
            tier_max: product.tier_max,
            payout_cap_kobo: product.payout_cap_kobo,
            nights: product.nights,
            validity_days: product.validity_days,
            lead_time_hours: product.lead_time_hours,
            blackout_dates: product.blackout_dates.clone(),
            allowed_days: product.allowed_days.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Voucher {
    pub id: Uuid,
    pub sku: String,
    pub user_id: Uuid,
    pub code: String,
    pub status: VoucherStatus,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub nights_included: i32,
    pub sell_price_kobo: i64,
    pub policy: Json<PolicySnapshot>,
    pub created_at: DateTime<Utc>,
}
