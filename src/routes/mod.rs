use axum::middleware::map_response;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, set_security_headers};
use crate::handlers::{self, admin, bookings, owner, payments, vouchers};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Vouchers
        .route("/vouchers", get(vouchers::list_vouchers))
        .route("/vouchers/purchase", post(vouchers::purchase_voucher))
        .route(
            "/vouchers/:voucher_id/eligibility",
            post(vouchers::voucher_eligibility),
        )
        // Bookings
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route(
            "/bookings/:booking_id/code/request",
            post(bookings::request_code),
        )
        // Owner
        .route("/owners/bookings", get(owner::list_bookings))
        .route(
            "/owners/bookings/:booking_id/confirm",
            post(owner::confirm_booking),
        )
        .route(
            "/owners/bookings/:booking_id/decline",
            post(owner::decline_booking),
        )
        .route(
            "/owners/bookings/:booking_id/redeem",
            post(owner::redeem_code),
        )
        // Payments
        .route("/payments/webhook", post(payments::webhook))
        .route("/payments/verify", get(payments::verify))
        // Admin
        .route("/admin/coverage", get(admin::coverage))
        .route(
            "/admin/payouts/:payout_id/approve",
            post(admin::approve_payout),
        )
        .route(
            "/admin/payouts/:payout_id/mark-paid",
            post(admin::mark_payout_paid),
        )
        .layer(map_response(set_security_headers))
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
