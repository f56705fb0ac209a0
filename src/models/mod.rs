pub mod booking;
pub mod inventory;
pub mod message;
pub mod offer;
pub mod payment;
pub mod payout;
pub mod property;
pub mod redemption;
pub mod user;
pub mod voucher;

pub use booking::{Booking, BookingStatus};
pub use inventory::InventoryDay;
pub use message::{MessageChannel, MessageStatus};
pub use offer::{Offer, OfferWithProperty};
pub use payment::{Payment, PaymentStatus};
pub use payout::{Payout, PayoutStatus};
pub use property::{ApprovalStatus, Property};
pub use redemption::RedemptionCode;
pub use user::{Role, User};
pub use voucher::{PolicySnapshot, Voucher, VoucherProduct, VoucherStatus};
