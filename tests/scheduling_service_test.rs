mod common;

use assert_matches::assert_matches;
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use common::TestApp;
use heatparts_api::{
    entities::{
        product_service, provider_service,
        service_provider::{self, AvailabilityStatus, ProviderCategory, WeeklyHours},
        ServiceType,
    },
    errors::ServiceError,
    services::scheduling::{BookSlotInput, ProviderSearchQuery},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// First Monday strictly after today, so lead-time filtering never applies.
fn next_monday() -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(1);
    while date.weekday() != Weekday::Mon {
        date += Duration::days(1);
    }
    date
}

async fn seed_provider(app: &TestApp, name: &str, rating: Decimal, jobs: i32) -> i64 {
    let now = Utc::now();
    let provider = service_provider::ActiveModel {
        name: Set(name.to_string()),
        email: Set(None),
        phone: Set(None),
        category: Set(ProviderCategory::Installation),
        city: Set("Manchester".to_string()),
        area: Set("Didsbury".to_string()),
        availability_status: Set(AvailabilityStatus::Available),
        is_active: Set(true),
        is_verified: Set(true),
        rating: Set(rating),
        total_jobs_completed: Set(jobs),
        max_daily_orders: Set(8),
        current_daily_orders: Set(0),
        working_hours: Set(WeeklyHours::default()),
        avg_service_duration_minutes: Set(60),
        min_advance_booking_hours: Set(2),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    provider.insert(&*app.state.db).await.expect("seed provider").id
}

async fn seed_service(app: &TestApp, name: &str) -> i64 {
    let now = Utc::now();
    let service = product_service::ActiveModel {
        name: Set(name.to_string()),
        service_type: Set(ServiceType::Installation),
        price: Set(dec!(120)),
        is_optional: Set(true),
        is_free: Set(false),
        free_condition: Set(None),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    service.insert(&*app.state.db).await.expect("seed service").id
}

async fn link_service(app: &TestApp, provider_id: i64, service_id: i64) {
    let link = provider_service::ActiveModel {
        provider_id: Set(provider_id),
        service_id: Set(service_id),
        custom_price: Set(None),
        experience_level: Set(provider_service::ExperienceLevel::Standard),
        is_active: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    link.insert(&*app.state.db).await.expect("seed link");
}

fn search(service_ids: Vec<i64>) -> ProviderSearchQuery {
    ProviderSearchQuery {
        city: "Manchester".to_string(),
        area: "Didsbury".to_string(),
        category: ProviderCategory::Installation,
        service_ids,
        preferred: None,
    }
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn search_requires_every_requested_service() {
    let app = TestApp::new().await;
    let scheduling = &app.state.services.scheduling;

    let fitting = seed_service(&app, "Boiler fitting").await;
    let flush = seed_service(&app, "System powerflush").await;

    let full = seed_provider(&app, "Full Service Ltd", dec!(4.5), 50).await;
    link_service(&app, full, fitting).await;
    link_service(&app, full, flush).await;

    let partial = seed_provider(&app, "Fitting Only Ltd", dec!(4.9), 90).await;
    link_service(&app, partial, fitting).await;

    // Both offer fitting
    let providers = scheduling
        .available_providers(search(vec![fitting]))
        .await
        .unwrap();
    assert_eq!(providers.len(), 2);

    // Only the full-service provider offers both
    let providers = scheduling
        .available_providers(search(vec![fitting, flush]))
        .await
        .unwrap();
    let names: Vec<&str> = providers.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Full Service Ltd"]);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn search_excludes_ineligible_providers() {
    let app = TestApp::new().await;
    let scheduling = &app.state.services.scheduling;
    let fitting = seed_service(&app, "Boiler fitting").await;

    let eligible = seed_provider(&app, "Eligible", dec!(4.0), 10).await;
    link_service(&app, eligible, fitting).await;

    // Unverified
    let unverified = seed_provider(&app, "Unverified", dec!(5.0), 10).await;
    link_service(&app, unverified, fitting).await;
    let mut m: service_provider::ActiveModel =
        heatparts_api::entities::ServiceProvider::find_by_id(unverified)
            .one(&*app.state.db)
            .await
            .unwrap()
            .unwrap()
            .into();
    m.is_verified = Set(false);
    m.update(&*app.state.db).await.unwrap();

    // Offline
    let offline = seed_provider(&app, "Offline", dec!(5.0), 10).await;
    link_service(&app, offline, fitting).await;
    let mut m: service_provider::ActiveModel =
        heatparts_api::entities::ServiceProvider::find_by_id(offline)
            .one(&*app.state.db)
            .await
            .unwrap()
            .unwrap()
            .into();
    m.availability_status = Set(AvailabilityStatus::Offline);
    m.update(&*app.state.db).await.unwrap();

    // At daily capacity
    let saturated = seed_provider(&app, "Saturated", dec!(5.0), 10).await;
    link_service(&app, saturated, fitting).await;
    let mut m: service_provider::ActiveModel =
        heatparts_api::entities::ServiceProvider::find_by_id(saturated)
            .one(&*app.state.db)
            .await
            .unwrap()
            .unwrap()
            .into();
    m.current_daily_orders = Set(8);
    m.update(&*app.state.db).await.unwrap();

    let providers = scheduling
        .available_providers(search(vec![fitting]))
        .await
        .unwrap();
    let names: Vec<&str> = providers.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Eligible"]);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn search_orders_by_rating_then_jobs() {
    let app = TestApp::new().await;
    let scheduling = &app.state.services.scheduling;
    let fitting = seed_service(&app, "Boiler fitting").await;

    // Same rating: the provider with more completed jobs wins the tie
    let y = seed_provider(&app, "Provider Y", dec!(4.8), 80).await;
    link_service(&app, y, fitting).await;
    let x = seed_provider(&app, "Provider X", dec!(4.8), 120).await;
    link_service(&app, x, fitting).await;
    let z = seed_provider(&app, "Provider Z", dec!(4.2), 500).await;
    link_service(&app, z, fitting).await;

    let providers = scheduling
        .available_providers(search(vec![fitting]))
        .await
        .unwrap();
    let names: Vec<&str> = providers.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Provider X", "Provider Y", "Provider Z"]);
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn search_with_preferred_time_checks_hours_and_bookings() {
    let app = TestApp::new().await;
    let scheduling = &app.state.services.scheduling;
    let fitting = seed_service(&app, "Boiler fitting").await;
    let monday = next_monday();

    let free = seed_provider(&app, "Free Provider", dec!(4.0), 10).await;
    link_service(&app, free, fitting).await;

    let busy = seed_provider(&app, "Busy Provider", dec!(5.0), 10).await;
    link_service(&app, busy, fitting).await;
    scheduling
        .book_slot(BookSlotInput {
            provider_id: busy,
            order_id: None,
            service_date: monday,
            start_time: t(11, 0),
        })
        .await
        .unwrap();

    let mut query = search(vec![fitting]);
    query.preferred = Some((monday, t(11, 0)));
    let providers = scheduling.available_providers(query).await.unwrap();
    let names: Vec<&str> = providers.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Free Provider"]);

    // Outside working hours nobody qualifies
    let mut query = search(vec![fitting]);
    query.preferred = Some((monday, t(20, 0)));
    assert!(scheduling.available_providers(query).await.unwrap().is_empty());

    // Sunday is closed in the default weekly hours
    let sunday = monday + Duration::days(6);
    let mut query = search(vec![fitting]);
    query.preferred = Some((sunday, t(11, 0)));
    assert!(scheduling.available_providers(query).await.unwrap().is_empty());
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn slots_walk_the_working_day_and_skip_bookings() {
    let app = TestApp::new().await;
    let scheduling = &app.state.services.scheduling;
    let provider = seed_provider(&app, "Slot Provider", dec!(4.0), 10).await;
    let monday = next_monday();

    scheduling
        .book_slot(BookSlotInput {
            provider_id: provider,
            order_id: None,
            service_date: monday,
            start_time: t(11, 0),
        })
        .await
        .unwrap();

    let slots = scheduling
        .available_time_slots(provider, monday)
        .await
        .unwrap();
    let starts: Vec<NaiveTime> = slots.iter().map(|s| s.start).collect();
    assert_eq!(
        starts,
        vec![
            t(9, 0),
            t(10, 0),
            t(12, 0),
            t(13, 0),
            t(14, 0),
            t(15, 0),
            t(16, 0),
            t(17, 0),
        ]
    );
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn closed_day_yields_no_slots() {
    let app = TestApp::new().await;
    let scheduling = &app.state.services.scheduling;
    let provider = seed_provider(&app, "Weekday Provider", dec!(4.0), 10).await;

    let sunday = next_monday() + Duration::days(6);
    let slots = scheduling
        .available_time_slots(provider, sunday)
        .await
        .unwrap();
    assert!(slots.is_empty());
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn double_booking_the_same_slot_conflicts() {
    let app = TestApp::new().await;
    let scheduling = &app.state.services.scheduling;
    let provider = seed_provider(&app, "Contended Provider", dec!(4.0), 10).await;
    let monday = next_monday();

    let input = BookSlotInput {
        provider_id: provider,
        order_id: None,
        service_date: monday,
        start_time: t(11, 0),
    };

    scheduling.book_slot(input.clone()).await.unwrap();
    let err = scheduling.book_slot(input).await.unwrap_err();
    assert_matches!(err, ServiceError::Conflict(_));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn booking_outside_working_hours_is_rejected() {
    let app = TestApp::new().await;
    let scheduling = &app.state.services.scheduling;
    let provider = seed_provider(&app, "Hours Provider", dec!(4.0), 10).await;
    let monday = next_monday();

    let err = scheduling
        .book_slot(BookSlotInput {
            provider_id: provider,
            order_id: None,
            service_date: monday,
            start_time: t(7, 0),
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));

    // 17:30 + 60 minutes spills past closing
    let err = scheduling
        .book_slot(BookSlotInput {
            provider_id: provider,
            order_id: None,
            service_date: monday,
            start_time: t(17, 30),
        })
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn cancelling_a_booking_frees_the_slot_and_capacity() {
    let app = TestApp::new().await;
    let scheduling = &app.state.services.scheduling;
    let provider = seed_provider(&app, "Cancel Provider", dec!(4.0), 10).await;
    let monday = next_monday();

    let booking = scheduling
        .book_slot(BookSlotInput {
            provider_id: provider,
            order_id: None,
            service_date: monday,
            start_time: t(11, 0),
        })
        .await
        .unwrap();

    let loaded = heatparts_api::entities::ServiceProvider::find_by_id(provider)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.current_daily_orders, 1);

    scheduling.cancel_booking(booking.id).await.unwrap();

    let loaded = heatparts_api::entities::ServiceProvider::find_by_id(provider)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.current_daily_orders, 0);

    let slots = scheduling
        .available_time_slots(provider, monday)
        .await
        .unwrap();
    assert!(slots.iter().any(|s| s.start == t(11, 0)));

    // A cancelled booking cannot be cancelled twice
    let err = scheduling.cancel_booking(booking.id).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidOperation(_));
}

#[tokio::test]
#[cfg_attr(not(feature = "mock-tests"), ignore)]
async fn rebooking_a_cancelled_slot_succeeds() {
    let app = TestApp::new().await;
    let scheduling = &app.state.services.scheduling;
    let provider = seed_provider(&app, "Rebook Provider", dec!(4.0), 10).await;
    let monday = next_monday();

    let input = BookSlotInput {
        provider_id: provider,
        order_id: None,
        service_date: monday,
        start_time: t(14, 0),
    };

    let booking = scheduling.book_slot(input.clone()).await.unwrap();
    scheduling.cancel_booking(booking.id).await.unwrap();

    // A cancelled row at the same start is revived rather than colliding
    // with the unique slot index
    let rebooked = scheduling.book_slot(input).await.unwrap();
    assert_eq!(rebooked.id, booking.id);
    assert_eq!(
        rebooked.status,
        heatparts_api::entities::provider_schedule::ScheduleStatus::Scheduled
    );
}
