mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use stayflex_server::config::Config;
use stayflex_server::models::{Role, User, Voucher};
use stayflex_server::routes::create_routes;
use stayflex_server::services::eligibility;
use stayflex_server::state::AppState;

use common::*;

async fn seed_property_with(
    pool: &PgPool,
    owner: &User,
    quality_score: i32,
    tier: i32,
    approval: &str,
) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO properties
            (owner_id, name, city, quality_score, tier, is_active, approval_status)
        VALUES ($1, 'Edge Lodge', $2, $3, $4, TRUE, $5::approval_status)
        RETURNING id
        "#,
    )
    .bind(owner.id)
    .bind(CITY)
    .bind(quality_score)
    .bind(tier)
    .bind(approval)
    .fetch_one(pool)
    .await
    .expect("seed property")
}

async fn eligible_offer_ids(pool: &PgPool, voucher: &Voucher) -> Vec<Uuid> {
    let (check_in, check_out) = stay_range(2);
    eligibility::query_eligible_offers(pool, voucher, check_in, check_out)
        .await
        .unwrap()
        .into_iter()
        .map(|ranked| ranked.offer.id)
        .collect()
}

#[sqlx::test]
async fn matching_offer_is_returned(pool: PgPool) {
    let customer = seed_user(&pool, Role::Customer).await;
    let owner = seed_user(&pool, Role::Owner).await;
    let property_id = seed_property(&pool, &owner).await;
    let offer_id = seed_offer(&pool, property_id, &OfferSpec::default()).await;
    let voucher = seed_active_voucher(&pool, &customer).await;

    assert_eq!(eligible_offer_ids(&pool, &voucher).await, vec![offer_id]);
}

#[sqlx::test]
async fn offer_without_the_sku_is_excluded(pool: PgPool) {
    let customer = seed_user(&pool, Role::Customer).await;
    let owner = seed_user(&pool, Role::Owner).await;
    let property_id = seed_property(&pool, &owner).await;
    let spec = OfferSpec {
        eligible_skus: vec!["OTHER-SKU".to_string()],
        ..OfferSpec::default()
    };
    seed_offer(&pool, property_id, &spec).await;
    let voucher = seed_active_voucher(&pool, &customer).await;

    assert!(eligible_offer_ids(&pool, &voucher).await.is_empty());
}

#[sqlx::test]
async fn unapproved_property_is_excluded(pool: PgPool) {
    let customer = seed_user(&pool, Role::Customer).await;
    let owner = seed_user(&pool, Role::Owner).await;
    let property_id = seed_property_with(&pool, &owner, 50, 3, "pending").await;
    seed_offer(&pool, property_id, &OfferSpec::default()).await;
    let voucher = seed_active_voucher(&pool, &customer).await;

    assert!(eligible_offer_ids(&pool, &voucher).await.is_empty());
}

#[sqlx::test]
async fn offer_window_must_cover_the_stay(pool: PgPool) {
    let customer = seed_user(&pool, Role::Customer).await;
    let owner = seed_user(&pool, Role::Owner).await;
    let property_id = seed_property(&pool, &owner).await;
    let today = chrono::Utc::now().date_naive();
    let spec = OfferSpec {
        start_date: today - chrono::Duration::days(30),
        end_date: today + chrono::Duration::days(7), // stay's last night falls outside
        ..OfferSpec::default()
    };
    seed_offer(&pool, property_id, &spec).await;
    let voucher = seed_active_voucher(&pool, &customer).await;

    assert!(eligible_offer_ids(&pool, &voucher).await.is_empty());
}

#[sqlx::test]
async fn property_score_outside_policy_band_is_excluded(pool: PgPool) {
    let customer = seed_user(&pool, Role::Customer).await;
    let owner = seed_user(&pool, Role::Owner).await;
    let voucher = {
        let mut policy = default_policy();
        policy.min_property_score = 60;
        seed_voucher(
            &pool,
            &customer,
            stayflex_server::models::VoucherStatus::Active,
            policy,
        )
        .await
    };

    let low = seed_property_with(&pool, &owner, 50, 3, "approved").await;
    seed_offer(&pool, low, &OfferSpec::default()).await;
    let high = seed_property_with(&pool, &owner, 75, 3, "approved").await;
    let kept = seed_offer(&pool, high, &OfferSpec::default()).await;

    assert_eq!(eligible_offer_ids(&pool, &voucher).await, vec![kept]);
}

#[sqlx::test]
async fn property_tier_outside_policy_band_is_excluded(pool: PgPool) {
    let customer = seed_user(&pool, Role::Customer).await;
    let owner = seed_user(&pool, Role::Owner).await;
    let voucher = {
        let mut policy = default_policy();
        policy.tier_max = 2;
        seed_voucher(
            &pool,
            &customer,
            stayflex_server::models::VoucherStatus::Active,
            policy,
        )
        .await
    };

    let tier3 = seed_property_with(&pool, &owner, 50, 3, "approved").await;
    seed_offer(&pool, tier3, &OfferSpec::default()).await;
    let tier2 = seed_property_with(&pool, &owner, 50, 2, "approved").await;
    let kept = seed_offer(&pool, tier2, &OfferSpec::default()).await;

    assert_eq!(eligible_offer_ids(&pool, &voucher).await, vec![kept]);
}

#[sqlx::test]
async fn stay_longer_than_offer_max_is_excluded(pool: PgPool) {
    let customer = seed_user(&pool, Role::Customer).await;
    let owner = seed_user(&pool, Role::Owner).await;
    let property_id = seed_property(&pool, &owner).await;
    let spec = OfferSpec {
        max_stay_nights: 1,
        ..OfferSpec::default()
    };
    seed_offer(&pool, property_id, &spec).await;
    let voucher = seed_active_voucher(&pool, &customer).await;

    assert!(eligible_offer_ids(&pool, &voucher).await.is_empty());
}

#[sqlx::test]
async fn inactive_offer_is_excluded(pool: PgPool) {
    let customer = seed_user(&pool, Role::Customer).await;
    let owner = seed_user(&pool, Role::Owner).await;
    let property_id = seed_property(&pool, &owner).await;
    let offer_id = seed_offer(&pool, property_id, &OfferSpec::default()).await;
    sqlx::query("UPDATE offers SET is_active = FALSE WHERE id = $1")
        .bind(offer_id)
        .execute(&pool)
        .await
        .unwrap();
    let voucher = seed_active_voucher(&pool, &customer).await;

    assert!(eligible_offer_ids(&pool, &voucher).await.is_empty());
}

#[sqlx::test]
async fn eligibility_endpoint_returns_every_ranked_offer(pool: PgPool) {
    let customer = seed_user(&pool, Role::Customer).await;
    let owner = seed_user(&pool, Role::Owner).await;
    let property_id = seed_property(&pool, &owner).await;
    for i in 0..31i64 {
        let spec = OfferSpec {
            rate_kobo: 30_000 + i * 100,
            ..OfferSpec::default()
        };
        seed_offer(&pool, property_id, &spec).await;
    }
    let voucher = seed_active_voucher(&pool, &customer).await;
    let (check_in, check_out) = stay_range(2);

    let config = Config {
        database_url: String::new(),
        port: 0,
        paystack_secret_key: String::new(),
        whatsapp_provider: "stub".to_string(),
        sms_provider: "stub".to_string(),
    };
    let app = create_routes(AppState::new(pool.clone(), config));

    let body = serde_json::json!({ "check_in": check_in, "check_out": check_out });
    let request = Request::builder()
        .method("POST")
        .uri(format!("/vouchers/{}/eligibility", voucher.id))
        .header("content-type", "application/json")
        .header("x-user-id", customer.id.to_string())
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let envelope: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let offers = envelope["data"].as_array().unwrap();
    assert_eq!(offers.len(), 31);
}

#[sqlx::test]
async fn sold_out_nights_do_not_hide_the_offer(pool: PgPool) {
    // The matcher reports eligibility; availability is enforced at booking
    // time by the ledger, so an exhausted night leaves the offer listed.
    let customer = seed_user(&pool, Role::Customer).await;
    let owner = seed_user(&pool, Role::Owner).await;
    let property_id = seed_property(&pool, &owner).await;
    let spec = OfferSpec {
        units_per_day: 1,
        ..OfferSpec::default()
    };
    let offer_id = seed_offer(&pool, property_id, &spec).await;
    let voucher = seed_active_voucher(&pool, &customer).await;

    let (check_in, check_out) = stay_range(2);
    let mut tx = pool.begin().await.unwrap();
    stayflex_server::services::inventory::reserve_or_book(
        &mut tx,
        offer_id,
        1,
        check_in,
        check_out,
        1,
        stayflex_server::services::inventory::InventoryMode::Book,
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(eligible_offer_ids(&pool, &voucher).await, vec![offer_id]);
}
