use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Offer {
    pub id: Uuid,
    pub property_id: Uuid,
    pub room_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub units_per_day: i32,
    pub rate_kobo: i64,
    pub eligible_skus: Vec<String>,
    pub room_quality_boost: i32,
    pub min_lead_time_hours: i32,
    pub max_stay_nights: i32,
    pub auto_confirm: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Offer joined with the property columns the matcher and booking flow
/// need. One row per candidate, fetched in a single query.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct OfferWithProperty {
    pub id: Uuid,
    pub property_id: Uuid,
    pub room_type: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub units_per_day: i32,
    pub rate_kobo: i64,
    pub room_quality_boost: i32,
    pub min_lead_time_hours: i32,
    pub max_stay_nights: i32,
    pub auto_confirm: bool,
    pub property_name: String,
    pub property_owner_id: Uuid,
    pub quality_score: i32,
    pub tier: i32,
}
