//! Property-based tests for the coupon and slot-computation cores.
//!
//! These run against the pure logic (no database) and verify the invariants
//! across a wide range of inputs rather than hand-picked scenarios.

use chrono::{Duration, NaiveTime, Utc};
use heatparts_api::entities::coupon::{self, DiscountType};
use heatparts_api::entities::service_provider::DayHours;
use heatparts_api::services::scheduling::compute_available_slots;
use proptest::prelude::*;
use rust_decimal::Decimal;

// Strategies for generating test data

/// Money in pennies, expressed as a 2-dp Decimal
fn money_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..50_000_00).prop_map(|pennies| Decimal::new(pennies, 2))
}

fn percentage_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=100_00).prop_map(|hundredths| Decimal::new(hundredths, 2))
}

fn coupon_strategy() -> impl Strategy<Value = coupon::Model> {
    (
        prop_oneof![Just(DiscountType::Percentage), Just(DiscountType::FixedAmount)],
        percentage_strategy(),
        proptest::option::of(money_strategy()),
        proptest::option::of(money_strategy()),
        proptest::option::of(1i32..1000),
        0i32..1000,
        any::<bool>(),
        proptest::option::of(-1000i64..1000),
        proptest::option::of(-1000i64..1000),
    )
        .prop_map(
            |(
                discount_type,
                value,
                minimum_amount,
                maximum_discount,
                usage_limit,
                used_count,
                is_active,
                starts_offset_hours,
                expires_offset_hours,
            )| {
                let now = Utc::now();
                let maximum_discount = match discount_type {
                    DiscountType::Percentage => maximum_discount,
                    DiscountType::FixedAmount => None,
                };
                coupon::Model {
                    id: 1,
                    code: "PROP".to_string(),
                    name: "Property coupon".to_string(),
                    discount_type,
                    value,
                    minimum_amount,
                    maximum_discount,
                    usage_limit,
                    used_count,
                    is_active,
                    starts_at: starts_offset_hours.map(|h| now + Duration::hours(h)),
                    expires_at: expires_offset_hours.map(|h| now + Duration::hours(h)),
                    created_at: now,
                    updated_at: now,
                }
            },
        )
}

fn booked_intervals_strategy() -> impl Strategy<Value = Vec<(NaiveTime, NaiveTime)>> {
    proptest::collection::vec(
        (6u32..20, 0u32..4, 1u32..5).prop_map(|(start_hour, quarter, len_hours)| {
            let start = NaiveTime::from_hms_opt(start_hour, quarter * 15, 0).unwrap();
            let end = NaiveTime::from_hms_opt((start_hour + len_hours).min(23), quarter * 15, 0)
                .unwrap();
            (start, end)
        }),
        0..5,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// Zero discount whenever the coupon is invalid.
    #[test]
    fn invalid_coupons_discount_nothing(
        coupon in coupon_strategy(),
        cart_total in money_strategy(),
    ) {
        let now = Utc::now();
        if !coupon.is_valid_at(now, cart_total) {
            prop_assert_eq!(coupon.discount_at(now, cart_total), Decimal::ZERO);
        }
    }

    /// A percentage coupon with a cap never discounts past the cap.
    #[test]
    fn percentage_discount_respects_the_cap(
        mut coupon in coupon_strategy(),
        cart_total in money_strategy(),
        cap in money_strategy(),
    ) {
        coupon.discount_type = DiscountType::Percentage;
        coupon.maximum_discount = Some(cap);
        // The cap has two decimal places, so rounding the clamped value
        // cannot push the discount past it
        let discount = coupon.discount_at(Utc::now(), cart_total);
        prop_assert!(discount <= cap);
    }

    /// No coupon of either type discounts more than the cart is worth.
    #[test]
    fn discount_never_exceeds_cart_total(
        coupon in coupon_strategy(),
        cart_total in money_strategy(),
    ) {
        let discount = coupon.discount_at(Utc::now(), cart_total);
        prop_assert!(discount >= Decimal::ZERO);
        if coupon.discount_type == DiscountType::FixedAmount {
            prop_assert!(discount <= cart_total);
        }
    }

    /// Validation has no side effects: asking twice answers the same.
    #[test]
    fn validity_is_idempotent(
        coupon in coupon_strategy(),
        cart_total in money_strategy(),
    ) {
        let now = Utc::now();
        prop_assert_eq!(
            coupon.is_valid_at(now, cart_total),
            coupon.is_valid_at(now, cart_total)
        );
    }

    /// Slots never overlap each other, never overlap a booking, stay inside
    /// working hours and respect the lead-time cutoff.
    #[test]
    fn slots_satisfy_all_interval_invariants(
        duration in 15i64..180,
        booked in booked_intervals_strategy(),
        cutoff_hour in proptest::option::of(0u32..24),
    ) {
        let hours = DayHours::open(
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        );
        let earliest = cutoff_hour.map(|h| NaiveTime::from_hms_opt(h, 0, 0).unwrap());
        let slots = compute_available_slots(&hours, duration, earliest, &booked);

        for pair in slots.windows(2) {
            prop_assert!(pair[0].end <= pair[1].start, "slots overlap each other");
        }
        for slot in &slots {
            prop_assert!(slot.start >= hours.start && slot.end <= hours.end);
            if let Some(earliest) = earliest {
                prop_assert!(slot.start >= earliest, "slot starts inside the lead-time window");
            }
            for &(busy_start, busy_end) in &booked {
                prop_assert!(
                    !(slot.start < busy_end && slot.end > busy_start),
                    "slot overlaps a booking"
                );
            }
        }
    }
}
