mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::TestApp;
use heatparts_api::{
    entities::DiscountType,
    errors::ServiceError,
    services::coupons::CreateCouponInput,
};
use rust_decimal_macros::dec;

fn welcome10() -> CreateCouponInput {
    CreateCouponInput {
        code: "WELCOME10".to_string(),
        name: "Welcome discount".to_string(),
        discount_type: DiscountType::Percentage,
        value: dec!(10),
        minimum_amount: Some(dec!(500)),
        maximum_discount: Some(dec!(200)),
        usage_limit: Some(100),
        is_active: None,
        starts_at: None,
        expires_at: Some(Utc::now() + Duration::days(30)),
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn create_and_find_coupon() {
    let app = TestApp::new().await;
    let coupons = &app.state.services.coupons;

    let created = coupons.create(welcome10()).await.expect("create failed");
    assert_eq!(created.code, "WELCOME10");
    assert_eq!(created.used_count, 0);
    assert!(created.is_active);

    let found = coupons.find_by_code("WELCOME10").await.expect("not found");
    assert_eq!(found.id, created.id);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn duplicate_code_conflicts() {
    let app = TestApp::new().await;
    let coupons = &app.state.services.coupons;

    coupons.create(welcome10()).await.expect("create failed");
    let err = coupons.create(welcome10()).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn unknown_code_is_not_found() {
    let app = TestApp::new().await;
    let err = app
        .state
        .services
        .coupons
        .validate("NO-SUCH-CODE", dec!(100))
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn validate_quotes_the_spec_scenarios() {
    let app = TestApp::new().await;
    let coupons = &app.state.services.coupons;
    coupons.create(welcome10()).await.expect("create failed");

    // £1000 cart: 10% = £100
    let quote = coupons.validate("WELCOME10", dec!(1000)).await.unwrap();
    assert!(quote.valid);
    assert_eq!(quote.discount_amount, dec!(100.00));

    // £3000 cart: clamped to the £200 cap
    let quote = coupons.validate("WELCOME10", dec!(3000)).await.unwrap();
    assert!(quote.valid);
    assert_eq!(quote.discount_amount, dec!(200.00));

    // Below the £500 minimum: invalid, zero discount, still a 200-style result
    let quote = coupons.validate("WELCOME10", dec!(400)).await.unwrap();
    assert!(!quote.valid);
    assert_eq!(quote.discount_amount, dec!(0));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn currently_valid_excludes_expired_inactive_and_exhausted() {
    let app = TestApp::new().await;
    let coupons = &app.state.services.coupons;

    coupons.create(welcome10()).await.unwrap();
    coupons
        .create(CreateCouponInput {
            code: "EXPIRED10".to_string(),
            expires_at: Some(Utc::now() - Duration::days(1)),
            starts_at: Some(Utc::now() - Duration::days(10)),
            ..welcome10()
        })
        .await
        .unwrap();
    coupons
        .create(CreateCouponInput {
            code: "DISABLED".to_string(),
            is_active: Some(false),
            ..welcome10()
        })
        .await
        .unwrap();
    coupons
        .create(CreateCouponInput {
            code: "ONESHOT".to_string(),
            usage_limit: Some(1),
            ..welcome10()
        })
        .await
        .unwrap();

    // Exhaust ONESHOT
    let oneshot = coupons.find_by_code("ONESHOT").await.unwrap();
    coupons.redeem(oneshot.id).await.unwrap();

    let valid = coupons.currently_valid().await.unwrap();
    let codes: Vec<&str> = valid.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["WELCOME10"]);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn redeem_stops_at_the_usage_limit() {
    let app = TestApp::new().await;
    let coupons = &app.state.services.coupons;

    let coupon = coupons
        .create(CreateCouponInput {
            code: "TWICE".to_string(),
            usage_limit: Some(2),
            ..welcome10()
        })
        .await
        .unwrap();

    coupons.redeem(coupon.id).await.unwrap();
    coupons.redeem(coupon.id).await.unwrap();

    // Third redemption loses the conditional update
    let err = coupons.redeem(coupon.id).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));

    let reloaded = coupons.find_by_code("TWICE").await.unwrap();
    assert_eq!(reloaded.used_count, 2);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn redeem_without_limit_keeps_counting() {
    let app = TestApp::new().await;
    let coupons = &app.state.services.coupons;

    let coupon = coupons
        .create(CreateCouponInput {
            code: "UNLIMITED".to_string(),
            usage_limit: None,
            ..welcome10()
        })
        .await
        .unwrap();

    for _ in 0..5 {
        coupons.redeem(coupon.id).await.unwrap();
    }

    let reloaded = coupons.find_by_code("UNLIMITED").await.unwrap();
    assert_eq!(reloaded.used_count, 5);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn validate_endpoint_returns_quote_envelope() {
    use axum::http::Method;
    use serde_json::json;

    let app = TestApp::new().await;
    app.state
        .services
        .coupons
        .create(welcome10())
        .await
        .unwrap();

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/coupons/validate",
            Some(json!({"code": "WELCOME10", "cart_total": "1000"})),
        )
        .await;

    assert_eq!(status, axum::http::StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["valid"], true);
    assert_eq!(body["data"]["discount_amount"], "100.00");
}
