mod common;

use agrimarket_api::{
    dto::rentals::CreateRentalRequest,
    entity::{Equipment, EquipmentRentals, equipment_rentals::ActiveModel as RentalActive},
    error::AppError,
    middleware::auth::AuthUser,
    models::{PaymentStatus, RentalStatus, Role},
    services::rental_service,
    state::AppState,
};
use chrono::{Days, Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};

use common::{create_equipment, create_user, setup_state};

fn rental_request(
    equipment_id: uuid::Uuid,
    start_offset_days: u64,
    length_days: u64,
) -> CreateRentalRequest {
    let start_date = Utc::now()
        .date_naive()
        .checked_add_days(Days::new(start_offset_days))
        .unwrap();
    let end_date = start_date.checked_add_days(Days::new(length_days)).unwrap();
    CreateRentalRequest {
        equipment_id,
        start_date,
        end_date,
        delivery_required: None,
        delivery_address: None,
        special_instructions: None,
    }
}

// Request -> confirm -> overlapping requests rejected; double-confirm and
// double-cancel fail with invalid state.
#[tokio::test]
async fn rental_booking_flow() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let owner = create_user(&state, Role::Farmer, "owner@example.com").await?;
    let renter = create_user(&state, Role::Farmer, "renter@example.com").await?;
    let rival = create_user(&state, Role::Farmer, "rival@example.com").await?;
    let equipment_id = create_equipment(&state, &owner, "Tractor", 1_000).await?;

    // Server computes the money fields: 4 days at 1000/day.
    let created = rental_service::create_rental(&state, &renter, rental_request(equipment_id, 7, 4))
        .await?
        .data
        .unwrap();
    assert_eq!(created.status, RentalStatus::Pending);
    assert_eq!(created.rental_days, 4);
    assert_eq!(created.total_amount, 4_000);

    // A pending request blocks nothing: an overlapping request is accepted.
    let rival_rental =
        rental_service::create_rental(&state, &rival, rental_request(equipment_id, 9, 4))
            .await?
            .data
            .unwrap();
    assert_eq!(rival_rental.status, RentalStatus::Pending);

    // Only the owner may confirm.
    let err = rental_service::confirm_rental(&state, &renter, created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");

    let confirmed = rental_service::confirm_rental(&state, &owner, created.id)
        .await?
        .data
        .unwrap();
    assert_eq!(confirmed.status, RentalStatus::Confirmed);
    assert_eq!(confirmed.payment_status, PaymentStatus::Paid);

    // Confirmed window now blocks new overlapping requests at creation...
    let err = rental_service::create_rental(&state, &rival, rental_request(equipment_id, 9, 4))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "{err:?}");

    // ...and the rival's earlier pending request dies at confirm time.
    let err = rental_service::confirm_rental(&state, &owner, rival_rental.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "{err:?}");

    // Confirm is not idempotent.
    let err = rental_service::confirm_rental(&state, &owner, created.id)
        .await
        .unwrap_err();
    match err {
        AppError::InvalidState { op, current, .. } => {
            assert_eq!(op, "confirm");
            assert_eq!(current, "confirmed");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    // Touching ranges are fine: return day equals next pickup day.
    let adjacent = rental_service::create_rental(&state, &rival, rental_request(equipment_id, 11, 3))
        .await?
        .data
        .unwrap();
    assert_eq!(adjacent.status, RentalStatus::Pending);

    // Cancel refunds a paid rental; a second cancel is rejected.
    let cancelled = rental_service::cancel_rental(&state, &renter, created.id)
        .await?
        .data
        .unwrap();
    assert_eq!(cancelled.status, RentalStatus::Cancelled);
    assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);

    let err = rental_service::cancel_rental(&state, &renter, created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidState { .. }), "{err:?}");

    Ok(())
}

#[tokio::test]
async fn rental_completion_releases_equipment() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let owner = create_user(&state, Role::Farmer, "owner2@example.com").await?;
    let renter = create_user(&state, Role::Farmer, "renter2@example.com").await?;
    let equipment_id = create_equipment(&state, &owner, "Harvester", 5_000).await?;

    // Window starts today, so confirmation marks the equipment rented.
    let rental = rental_service::create_rental(&state, &renter, rental_request(equipment_id, 0, 3))
        .await?
        .data
        .unwrap();
    rental_service::confirm_rental(&state, &owner, rental.id).await?;

    let equipment = Equipment::find_by_id(equipment_id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(equipment.status, "rented");

    // Owner completes; the started rental is promoted past confirmed first.
    let completed = rental_service::complete_rental(&state, &owner, rental.id)
        .await?
        .data
        .unwrap();
    assert_eq!(completed.status, RentalStatus::Completed);

    let equipment = Equipment::find_by_id(equipment_id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(equipment.status, "available");

    Ok(())
}

#[tokio::test]
async fn rental_guards() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let owner = create_user(&state, Role::Farmer, "owner3@example.com").await?;
    let buyer = create_user(&state, Role::Buyer, "buyer3@example.com").await?;
    let equipment_id = create_equipment(&state, &owner, "Sprayer", 800).await?;

    // Only farmers rent equipment.
    let err = rental_service::create_rental(&state, &buyer, rental_request(equipment_id, 5, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");

    // Owners cannot rent their own equipment.
    let err = rental_service::create_rental(&state, &owner, rental_request(equipment_id, 5, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)), "{err:?}");

    // end_date must be after start_date.
    let start = Utc::now().date_naive().checked_add_days(Days::new(5)).unwrap();
    let err = rental_service::create_rental(
        &state,
        &create_user(&state, Role::Farmer, "renter3@example.com").await?,
        CreateRentalRequest {
            equipment_id,
            start_date: start,
            end_date: start,
            delivery_required: None,
            delivery_address: None,
            special_instructions: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "{err:?}");

    Ok(())
}

/// Insert a confirmed rental directly, bypassing creation-time date checks,
/// so windows in the past or far future can be staged.
async fn insert_confirmed_rental(
    state: &AppState,
    equipment_id: uuid::Uuid,
    renter: &AuthUser,
    start_offset_days: i64,
    length_days: i64,
) -> anyhow::Result<uuid::Uuid> {
    let start_date = Utc::now().date_naive() + Duration::days(start_offset_days);
    let end_date = start_date + Duration::days(length_days);
    let rental = RentalActive {
        id: Set(uuid::Uuid::new_v4()),
        equipment_id: Set(equipment_id),
        renter_id: Set(renter.user_id),
        start_date: Set(start_date),
        end_date: Set(end_date),
        rental_days: Set(length_days as i32),
        daily_rate: Set(1_000),
        total_amount: Set(1_000 * length_days),
        security_deposit: Set(None),
        delivery_required: Set(false),
        delivery_address: Set(None),
        special_instructions: Set(None),
        status: Set(RentalStatus::Confirmed.as_str().into()),
        payment_status: Set(PaymentStatus::Paid.as_str().into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(rental.id)
}

// Cancelling a future confirmed rental must not release the rented marker
// set by a rental that is actually running.
#[tokio::test]
async fn cancel_future_rental_keeps_current_marker() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let owner = create_user(&state, Role::Farmer, "owner5@example.com").await?;
    let renter = create_user(&state, Role::Farmer, "renter5@example.com").await?;
    let other = create_user(&state, Role::Farmer, "other5@example.com").await?;
    let equipment_id = create_equipment(&state, &owner, "Baler", 1_000).await?;

    // Running rental holds the equipment.
    let running = rental_service::create_rental(&state, &renter, rental_request(equipment_id, 0, 3))
        .await?
        .data
        .unwrap();
    rental_service::confirm_rental(&state, &owner, running.id).await?;

    // A far-future booking on the same equipment, confirmed then cancelled.
    let future = rental_service::create_rental(&state, &other, rental_request(equipment_id, 30, 3))
        .await?
        .data
        .unwrap();
    rental_service::confirm_rental(&state, &owner, future.id).await?;
    rental_service::cancel_rental(&state, &other, future.id).await?;

    let equipment = Equipment::find_by_id(equipment_id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(equipment.status, "rented");

    // Cancelling the rental that actually holds the equipment releases it.
    rental_service::cancel_rental(&state, &renter, running.id).await?;
    let equipment = Equipment::find_by_id(equipment_id)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(equipment.status, "available");

    Ok(())
}

// The periodic sweep promotes started confirmed rentals and marks their
// equipment rented; a window that has already closed is promoted without
// re-marking the equipment.
#[tokio::test]
async fn sweep_promotes_started_rentals() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let owner = create_user(&state, Role::Farmer, "owner6@example.com").await?;
    let renter = create_user(&state, Role::Farmer, "renter6@example.com").await?;
    let running_equip = create_equipment(&state, &owner, "Plough", 1_000).await?;
    let lapsed_equip = create_equipment(&state, &owner, "Cultivator", 1_000).await?;

    let running = insert_confirmed_rental(&state, running_equip, &renter, 0, 3).await?;
    let lapsed = insert_confirmed_rental(&state, lapsed_equip, &renter, -5, 3).await?;

    let promoted = rental_service::promote_started_rentals(&state.orm).await?;
    assert!(promoted >= 2, "promoted {promoted}");

    let rental = EquipmentRentals::find_by_id(running)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(rental.status, "active");
    let equipment = Equipment::find_by_id(running_equip)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(equipment.status, "rented");

    // The lapsed window still becomes active, but the equipment stays free.
    let rental = EquipmentRentals::find_by_id(lapsed)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(rental.status, "active");
    let equipment = Equipment::find_by_id(lapsed_equip)
        .one(&state.orm)
        .await?
        .unwrap();
    assert_eq!(equipment.status, "available");

    Ok(())
}

#[tokio::test]
async fn booked_dates_lists_confirmed_windows() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let owner = create_user(&state, Role::Farmer, "owner4@example.com").await?;
    let renter = create_user(&state, Role::Farmer, "renter4@example.com").await?;
    let equipment_id = create_equipment(&state, &owner, "Seeder", 600).await?;

    let rental = rental_service::create_rental(&state, &renter, rental_request(equipment_id, 3, 4))
        .await?
        .data
        .unwrap();

    // Pending rentals are invisible to availability.
    let booked = rental_service::booked_dates(&state, equipment_id)
        .await?
        .data
        .unwrap();
    assert!(booked.ranges.is_empty());

    rental_service::confirm_rental(&state, &owner, rental.id).await?;

    let booked = rental_service::booked_dates(&state, equipment_id)
        .await?
        .data
        .unwrap();
    assert_eq!(booked.ranges.len(), 1);
    assert_eq!(booked.ranges[0].start_date, rental.start_date);
    assert_eq!(booked.ranges[0].end_date, rental.end_date);

    Ok(())
}
