pub mod audit;
pub mod booking;
pub mod codes;
pub mod eligibility;
pub mod inventory;
pub mod notifications;
pub mod paystack;
pub mod redemption;
pub mod timeutils;
