mod helpers;

use helpers::*;
use rust_decimal::Decimal;
use salonbook::domain::entities::{BookingFilter, BookingStatus, NewReview, NewStaff, SalonFilter, SalonStatus};
use salonbook::domain::errors::ErrorKind;
use salonbook::domain::ports::data_store::{Filter, Filters, Table};

/// Two owners with one salon each, and a booking per customer at each salon.
struct TwoSalons {
    scenario: Scenario,
    rival_owner: salonbook::domain::entities::Identity,
    rival_salon: salonbook::domain::entities::Salon,
    other_customer: salonbook::domain::entities::Identity,
}

async fn seed_two_salons(core: &TestCore) -> TwoSalons {
    let scenario = seed_scenario(core).await;
    let rival_owner = owner("owner-t");
    let other_customer = customer("customer-2");
    seed_profile(core, &rival_owner).await;
    seed_profile(core, &other_customer).await;

    let rival_salon = seed_salon(core, Some(&rival_owner), "Shear").await;
    let shave = seed_service(core, &rival_salon, "Shave", 25, 20).await;

    let workflow = &core.state.workflow;
    workflow
        .create(
            Some(&scenario.customer),
            booking_request(&scenario.salon, &scenario.haircut, date(2024, 6, 20), "14:00"),
        )
        .await
        .unwrap();
    workflow
        .create(
            Some(&other_customer),
            booking_request(&scenario.salon, &scenario.haircut, date(2024, 6, 20), "15:00"),
        )
        .await
        .unwrap();
    workflow
        .create(
            Some(&scenario.customer),
            booking_request(&rival_salon, &shave, date(2024, 6, 20), "14:00"),
        )
        .await
        .unwrap();

    TwoSalons {
        scenario,
        rival_owner,
        rival_salon,
        other_customer,
    }
}

#[tokio::test]
async fn test_owner_sees_only_own_salon_bookings() {
    let core = setup_core();
    let world = seed_two_salons(&core).await;
    let s = &world.scenario;

    let bookings = core
        .state
        .dashboard
        .bookings(Some(&s.owner), &BookingFilter::default())
        .await
        .unwrap();
    assert_eq!(bookings.len(), 2);
    assert!(bookings.iter().all(|b| b.salon_id == s.salon.id));

    let rival = core
        .state
        .dashboard
        .bookings(Some(&world.rival_owner), &BookingFilter::default())
        .await
        .unwrap();
    assert_eq!(rival.len(), 1);
    assert_eq!(rival[0].salon_id, world.rival_salon.id);
}

#[tokio::test]
async fn test_owner_cannot_widen_scope_with_filters() {
    let core = setup_core();
    let world = seed_two_salons(&core).await;
    let s = &world.scenario;

    // Asking for the rival salon explicitly still yields nothing
    let filter = BookingFilter {
        salon_id: Some(world.rival_salon.id.clone()),
        ..Default::default()
    };
    let bookings = core.state.dashboard.bookings(Some(&s.owner), &filter).await.unwrap();
    assert!(bookings.is_empty());

    let filters = core
        .state
        .dashboard
        .scoped_query(Some(&s.owner), Table::Bookings, Filters::new())
        .await
        .unwrap();
    assert!(filters
        .iter()
        .any(|f| f == &Filter::in_values("salon_id", vec![s.salon.id.clone()])));

    let salons = core.state.dashboard.salons(Some(&s.owner), &SalonFilter::default()).await.unwrap();
    assert_eq!(salons.len(), 1);
    assert_eq!(salons[0].id, s.salon.id);

    let services = core
        .state
        .dashboard
        .services(Some(&s.owner), Some(&world.rival_salon.id))
        .await
        .unwrap();
    assert!(services.is_empty());
}

#[tokio::test]
async fn test_owner_without_salons_sees_nothing() {
    let core = setup_core();
    seed_two_salons(&core).await;
    let newcomer = owner("owner-new");

    let bookings = core
        .state
        .dashboard
        .bookings(Some(&newcomer), &BookingFilter::default())
        .await
        .unwrap();
    assert!(bookings.is_empty());

    let services = core.state.dashboard.services(Some(&newcomer), None).await.unwrap();
    assert!(services.is_empty());
    assert!(core.state.dashboard.salons(Some(&newcomer), &SalonFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_customer_sees_only_own_bookings() {
    let core = setup_core();
    let world = seed_two_salons(&core).await;
    let s = &world.scenario;

    let mine = core
        .state
        .dashboard
        .bookings(Some(&s.customer), &BookingFilter::default())
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|b| b.is_booked_by(&s.customer.id)));

    // A customer filter naming someone else is conjoined, not replaced
    let filter = BookingFilter {
        customer_id: Some(world.other_customer.id.clone()),
        ..Default::default()
    };
    let theirs = core.state.dashboard.bookings(Some(&s.customer), &filter).await.unwrap();
    assert!(theirs.is_empty());

    // Catalog reads are public
    let salons = core.state.dashboard.salons(Some(&s.customer), &SalonFilter::default()).await.unwrap();
    assert_eq!(salons.len(), 2);
}

#[tokio::test]
async fn test_admin_sees_everything() {
    let core = setup_core();
    let world = seed_two_salons(&core).await;

    let bookings = core
        .state
        .dashboard
        .bookings(Some(&admin()), &BookingFilter::default())
        .await
        .unwrap();
    assert_eq!(bookings.len(), 3);

    let filtered = core
        .state
        .dashboard
        .bookings(
            Some(&admin()),
            &BookingFilter {
                salon_id: Some(world.rival_salon.id.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(filtered.len(), 1);

    assert_eq!(core.state.dashboard.users(Some(&admin())).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_non_admins_cannot_list_users() {
    let core = setup_core();
    let world = seed_two_salons(&core).await;

    for identity in [&world.scenario.owner, &world.scenario.customer] {
        let err = core.state.dashboard.users(Some(identity)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }
}

#[tokio::test]
async fn test_unauthenticated_reads_fail() {
    let core = setup_core();
    seed_two_salons(&core).await;

    let err = core
        .state
        .dashboard
        .bookings(None, &BookingFilter::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);

    let err = core.state.dashboard.owner_stats(None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[tokio::test]
async fn test_admin_stats() {
    let core = setup_core();
    let world = seed_two_salons(&core).await;
    let s = &world.scenario;
    seed_salon_with_status(&core, Some(&owner("owner-p")), "Awaiting", SalonStatus::Pending).await;

    let bookings = core
        .state
        .dashboard
        .bookings(Some(&s.customer), &BookingFilter::default())
        .await
        .unwrap();
    let at_glow = bookings.iter().find(|b| b.salon_id == s.salon.id).unwrap();
    core.state.workflow.confirm(Some(&s.owner), &at_glow.id).await.unwrap();
    core.clock.set(at(2024, 6, 20, 14, 45));
    core.state.workflow.complete(Some(&s.owner), &at_glow.id).await.unwrap();

    let stats = core.state.dashboard.admin_stats(Some(&admin())).await.unwrap();
    assert_eq!(stats.total_salons, 3);
    assert_eq!(stats.active_salons, 2);
    assert_eq!(stats.pending_salons, 1);
    assert_eq!(stats.total_users, 4);
    assert_eq!(stats.total_bookings, 3);
    assert_eq!(stats.confirmed_bookings, 0);
    assert_eq!(stats.completed_bookings, 1);
    assert_eq!(stats.total_revenue, Decimal::new(40, 0));

    for identity in [&s.owner, &s.customer] {
        let err = core.state.dashboard.admin_stats(Some(identity)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessDenied);
    }
}

#[tokio::test]
async fn test_owner_stats_cover_only_owned_salons() {
    let core = setup_core();
    let world = seed_two_salons(&core).await;
    let s = &world.scenario;

    let pending = core
        .state
        .dashboard
        .bookings(
            Some(&s.owner),
            &BookingFilter {
                status: Some(BookingStatus::PendingConfirmation),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(pending.len(), 2);
    core.state.workflow.confirm(Some(&s.owner), &pending[0].id).await.unwrap();

    let stats = core.state.dashboard.owner_stats(Some(&s.owner)).await.unwrap();
    assert_eq!(stats.salons, 1);
    assert_eq!(stats.total_bookings, 2);
    assert_eq!(stats.pending_bookings, 1);
    assert_eq!(stats.confirmed_bookings, 1);
    assert_eq!(stats.revenue, Decimal::ZERO);
    assert_eq!(stats.average_rating, None);

    let err = core.state.dashboard.owner_stats(Some(&s.customer)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);
}

#[tokio::test]
async fn test_customer_overview_splits_upcoming_and_past() {
    let core = setup_core();
    let world = seed_two_salons(&core).await;
    let s = &world.scenario;

    let overview = core.state.dashboard.customer_overview(Some(&s.customer)).await.unwrap();
    assert_eq!(overview.upcoming.len(), 2);
    assert!(overview.past.is_empty());

    // Cancel one; after the other starts, nothing is upcoming
    let first = overview.upcoming[0].clone();
    core.state.workflow.cancel(Some(&s.customer), &first.id).await.unwrap();
    core.clock.set(at(2024, 6, 20, 16, 0));

    let overview = core.state.dashboard.customer_overview(Some(&s.customer)).await.unwrap();
    assert!(overview.upcoming.is_empty());
    assert_eq!(overview.past.len(), 2);

    let err = core.state.dashboard.customer_overview(Some(&s.owner)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);
}

#[tokio::test]
async fn test_reviews_are_scoped() {
    let core = setup_core();
    let world = seed_two_salons(&core).await;
    let s = &world.scenario;

    let mine = core
        .state
        .dashboard
        .bookings(Some(&s.customer), &BookingFilter::default())
        .await
        .unwrap();
    for booking in &mine {
        core.state
            .catalog
            .create_review(
                Some(&s.customer),
                NewReview {
                    booking_id: booking.id.clone(),
                    rating: 4,
                    comment: None,
                },
            )
            .await
            .unwrap();
    }

    let owner_reviews = core.state.dashboard.reviews(Some(&s.owner)).await.unwrap();
    assert_eq!(owner_reviews.len(), 1);
    assert_eq!(owner_reviews[0].salon_id, s.salon.id);

    assert_eq!(core.state.dashboard.reviews(Some(&s.customer)).await.unwrap().len(), 2);
    assert!(core
        .state
        .dashboard
        .reviews(Some(&world.other_customer))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_salon_directory_filters() {
    let core = setup_core();
    let world = seed_two_salons(&core).await;
    seed_salon_with_status(&core, None, "Shear Delight", SalonStatus::Pending).await;
    let dashboard = &core.state.dashboard;
    let visitor = &world.scenario.customer;

    let found = dashboard
        .salons(
            Some(visitor),
            &SalonFilter {
                search: Some("SHEAR".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(found.len(), 2);

    let active = dashboard
        .salons(
            Some(visitor),
            &SalonFilter {
                status: Some(SalonStatus::Active),
                search: Some("shear".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, world.rival_salon.id);

    let elsewhere = dashboard
        .salons(
            Some(visitor),
            &SalonFilter {
                city: Some("Shelbyville".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(elsewhere.is_empty());

    // Owners search only inside their own salons
    let owned = dashboard
        .salons(
            Some(&world.scenario.owner),
            &SalonFilter {
                search: Some("shear".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(owned.is_empty());
}

#[tokio::test]
async fn test_staff_listing_is_scoped_to_owned_salons() {
    let core = setup_core();
    let world = seed_two_salons(&core).await;
    let s = &world.scenario;
    let catalog = &core.state.catalog;

    for (owner, salon, user) in [
        (&s.owner, &s.salon, "stylist-1"),
        (&world.rival_owner, &world.rival_salon, "barber-1"),
    ] {
        seed_profile(&core, &customer(user)).await;
        catalog
            .add_staff(
                Some(owner),
                &salon.id,
                NewStaff {
                    user_id: user.to_string(),
                    role: "stylist".to_string(),
                },
            )
            .await
            .unwrap();
    }

    let mine = core.state.dashboard.staff(Some(&s.owner), None).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].user_id, "stylist-1");

    let theirs = core
        .state
        .dashboard
        .staff(Some(&s.owner), Some(&world.rival_salon.id))
        .await
        .unwrap();
    assert!(theirs.is_empty());

    assert_eq!(core.state.dashboard.staff(Some(&admin()), None).await.unwrap().len(), 2);

    let err = core.state.dashboard.staff(Some(&s.customer), None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);
}
