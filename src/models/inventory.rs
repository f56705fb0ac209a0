use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One night of ledger state for one offer. `reserved + booked` never
/// exceeds `capacity`; the database CHECK backs the same invariant.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InventoryDay {
    pub id: i64,
    pub offer_id: Uuid,
    pub date: NaiveDate,
    pub capacity: i32,
    pub reserved: i32,
    pub booked: i32,
}

impl InventoryDay {
    pub fn available(&self) -> i32 {
        self.capacity - self.reserved - self.booked
    }
}
