use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The one live redemption code for a booking. Re-issuing overwrites the
/// row in place, so a booking never has two usable codes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RedemptionCode {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub phone_e164: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub attempt_count: i32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
