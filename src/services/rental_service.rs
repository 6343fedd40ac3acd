//! Rental lifecycle engine.
//!
//! All transitions run inside a transaction that locks the equipment row
//! before touching the rental, so two requests racing on the same equipment
//! serialize. The conflict check reads inside that same transaction; its
//! verdict cannot go stale before the status write commits.

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::rentals::{BookedDates, CreateRentalRequest, RentalList},
    entity::equipment::{Column as EquipCol, Entity as Equipment, Model as EquipmentModel},
    entity::equipment_rentals::{
        ActiveModel as RentalActive, Column as RentalCol, Entity as EquipmentRentals,
        Model as RentalModel,
    },
    error::{AppError, AppResult},
    lifecycle::rental,
    middleware::auth::{AuthUser, ensure_farmer},
    models::{EquipmentRental, EquipmentStatus, PaymentStatus, RentalStatus},
    response::{ApiResponse, Meta},
    routes::params::{RentalListQuery, SortOrder},
    services::booking,
    state::AppState,
};

pub async fn create_rental(
    state: &AppState,
    user: &AuthUser,
    payload: CreateRentalRequest,
) -> AppResult<ApiResponse<EquipmentRental>> {
    ensure_farmer(user, "rent equipment")?;

    if payload.end_date <= payload.start_date {
        return Err(AppError::Validation(
            "end_date must be after start_date".into(),
        ));
    }
    let today = Utc::now().date_naive();
    if payload.start_date < today {
        return Err(AppError::Validation(
            "start_date cannot be in the past".into(),
        ));
    }

    let txn = state.orm.begin().await?;

    let equipment = Equipment::find_by_id(payload.equipment_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    if equipment.owner_id == user.user_id {
        return Err(AppError::Forbidden(
            "cannot rent your own equipment".into(),
        ));
    }

    let equipment_status = parse_equipment_status(&equipment)?;
    if matches!(
        equipment_status,
        EquipmentStatus::Maintenance | EquipmentStatus::Unavailable
    ) {
        return Err(AppError::Conflict(format!(
            "equipment is {equipment_status} and not open for rental"
        )));
    }

    let rental_days = (payload.end_date - payload.start_date).num_days() as i32;
    if rental_days < equipment.min_rental_days {
        return Err(AppError::Validation(format!(
            "minimum rental period is {} days",
            equipment.min_rental_days
        )));
    }
    if let Some(max_days) = equipment.max_rental_days {
        if rental_days > max_days {
            return Err(AppError::Validation(format!(
                "maximum rental period is {max_days} days"
            )));
        }
    }

    if booking::has_conflict(
        &txn,
        equipment.id,
        payload.start_date,
        payload.end_date,
        None,
    )
    .await?
    {
        return Err(AppError::Conflict(
            "equipment is already booked for the requested dates".into(),
        ));
    }

    // Financial fields come from the equipment row, never from the client.
    let total_amount = equipment.daily_rate * rental_days as i64;

    let inserted = RentalActive {
        id: Set(Uuid::new_v4()),
        equipment_id: Set(equipment.id),
        renter_id: Set(user.user_id),
        start_date: Set(payload.start_date),
        end_date: Set(payload.end_date),
        rental_days: Set(rental_days),
        daily_rate: Set(equipment.daily_rate),
        total_amount: Set(total_amount),
        security_deposit: Set(equipment.security_deposit),
        delivery_required: Set(payload.delivery_required.unwrap_or(false)),
        delivery_address: Set(payload.delivery_address),
        special_instructions: Set(payload.special_instructions),
        status: Set(RentalStatus::Pending.as_str().into()),
        payment_status: Set(PaymentStatus::Pending.as_str().into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    audit(
        state,
        user,
        "rental_requested",
        serde_json::json!({ "rental_id": inserted.id, "equipment_id": inserted.equipment_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Rental request submitted",
        rental_from_entity(inserted)?,
        Some(Meta::empty()),
    ))
}

pub async fn confirm_rental(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<EquipmentRental>> {
    let txn = state.orm.begin().await?;
    let (rental, equipment) = load_locked(&txn, id).await?;

    if equipment.owner_id != user.user_id {
        return Err(AppError::Forbidden(
            "only the equipment owner can confirm a rental".into(),
        ));
    }

    let current = parse_rental_status(&rental)?;
    let next = rental::CONFIRM.apply(current)?;

    // A different request may have filled this window while the rental sat
    // pending; re-check before the transition commits.
    if booking::has_conflict(
        &txn,
        rental.equipment_id,
        rental.start_date,
        rental.end_date,
        Some(rental.id),
    )
    .await?
    {
        return Err(AppError::Conflict(
            "equipment is already booked for the requested dates".into(),
        ));
    }

    let today = Utc::now().date_naive();
    let covers_now = rental.start_date <= today && rental.end_date > today;

    let mut active: RentalActive = rental.into();
    active.status = Set(next.as_str().into());
    active.payment_status = Set(PaymentStatus::Paid.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let rental = active.update(&txn).await?;

    if covers_now {
        set_equipment_status(&txn, equipment.id, EquipmentStatus::Rented).await?;
    }

    txn.commit().await?;

    audit(
        state,
        user,
        "rental_confirmed",
        serde_json::json!({ "rental_id": rental.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Rental confirmed",
        rental_from_entity(rental)?,
        Some(Meta::empty()),
    ))
}

pub async fn cancel_rental(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<EquipmentRental>> {
    let txn = state.orm.begin().await?;
    let (rental, equipment) = load_locked(&txn, id).await?;

    if user.user_id != rental.renter_id && user.user_id != equipment.owner_id {
        return Err(AppError::Forbidden(
            "only the renter or the equipment owner can cancel a rental".into(),
        ));
    }

    let current = parse_rental_status(&rental)?;
    let next = rental::CANCEL.apply(current)?;
    let payment = parse_payment_status(&rental)?;

    // Only a rental that actually set the rented marker releases it. A
    // future-dated confirmed rental never did (confirm marks the equipment
    // only when the window covers today), so cancelling it must not clobber
    // the marker a currently running rental holds.
    let today = Utc::now().date_naive();
    let held_equipment = current == RentalStatus::Active
        || (current == RentalStatus::Confirmed
            && rental.start_date <= today
            && rental.end_date > today);

    let mut active: RentalActive = rental.into();
    active.status = Set(next.as_str().into());
    if payment == PaymentStatus::Paid {
        active.payment_status = Set(PaymentStatus::Refunded.as_str().into());
    }
    active.updated_at = Set(Utc::now().into());
    let rental = active.update(&txn).await?;

    if held_equipment && parse_equipment_status(&equipment)? == EquipmentStatus::Rented {
        set_equipment_status(&txn, equipment.id, EquipmentStatus::Available).await?;
    }

    txn.commit().await?;

    audit(
        state,
        user,
        "rental_cancelled",
        serde_json::json!({ "rental_id": rental.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Rental cancelled",
        rental_from_entity(rental)?,
        Some(Meta::empty()),
    ))
}

pub async fn complete_rental(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<EquipmentRental>> {
    let txn = state.orm.begin().await?;
    let (rental, equipment) = load_locked(&txn, id).await?;

    if equipment.owner_id != user.user_id {
        return Err(AppError::Forbidden(
            "only the equipment owner can complete a rental".into(),
        ));
    }

    let mut current = parse_rental_status(&rental)?;
    // A started rental the periodic sweep has not reached yet is promoted
    // here so completion is never stuck behind the sweep interval.
    let today = Utc::now().date_naive();
    if current == RentalStatus::Confirmed && rental.start_date <= today {
        current = rental::ACTIVATE.apply(current)?;
    }
    let next = rental::COMPLETE.apply(current)?;

    let mut active: RentalActive = rental.into();
    active.status = Set(next.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let rental = active.update(&txn).await?;

    set_equipment_status(&txn, equipment.id, EquipmentStatus::Available).await?;

    txn.commit().await?;

    audit(
        state,
        user,
        "rental_completed",
        serde_json::json!({ "rental_id": rental.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Rental completed",
        rental_from_entity(rental)?,
        Some(Meta::empty()),
    ))
}

/// Periodic sweep: confirmed rentals whose start date has arrived become
/// active and mark their equipment rented. Run from a background task.
///
/// Each due rental is promoted in its own transaction through `load_locked`,
/// taking the equipment row before the rental row like every other writer,
/// so the sweep cannot deadlock against a concurrent confirm or cancel.
pub async fn promote_started_rentals(orm: &crate::db::OrmConn) -> AppResult<u64> {
    let today = Utc::now().date_naive();

    let due: Vec<Uuid> = EquipmentRentals::find()
        .filter(RentalCol::Status.eq(RentalStatus::Confirmed.as_str()))
        .filter(RentalCol::StartDate.lte(today))
        .all(orm)
        .await?
        .into_iter()
        .map(|r| r.id)
        .collect();

    let mut promoted = 0;
    for rental_id in due {
        let txn = orm.begin().await?;
        let (rental, equipment) = match load_locked(&txn, rental_id).await {
            Ok(pair) => pair,
            Err(AppError::NotFound) => continue,
            Err(err) => return Err(err),
        };
        // The rental may have moved on between the scan and the lock.
        if parse_rental_status(&rental)? != RentalStatus::Confirmed || rental.start_date > today {
            continue;
        }
        let still_running = rental.end_date > today;

        let mut active: RentalActive = rental.into();
        active.status = Set(RentalStatus::Active.as_str().into());
        active.updated_at = Set(Utc::now().into());
        active.update(&txn).await?;

        if still_running {
            set_equipment_status(&txn, equipment.id, EquipmentStatus::Rented).await?;
        }

        txn.commit().await?;
        promoted += 1;
    }

    Ok(promoted)
}

pub async fn list_my_rentals(
    state: &AppState,
    user: &AuthUser,
    query: RentalListQuery,
) -> AppResult<ApiResponse<RentalList>> {
    let condition = Condition::all().add(RentalCol::RenterId.eq(user.user_id));
    list_rentals(state, condition, query).await
}

/// Rentals against any equipment the caller owns.
pub async fn list_my_equipment_rentals(
    state: &AppState,
    user: &AuthUser,
    query: RentalListQuery,
) -> AppResult<ApiResponse<RentalList>> {
    let owned: Vec<Uuid> = Equipment::find()
        .filter(EquipCol::OwnerId.eq(user.user_id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|e| e.id)
        .collect();

    let condition = Condition::all().add(RentalCol::EquipmentId.is_in(owned));
    list_rentals(state, condition, query).await
}

pub async fn get_rental(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<EquipmentRental>> {
    let rental = EquipmentRentals::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let equipment = Equipment::find_by_id(rental.equipment_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if user.user_id != rental.renter_id && user.user_id != equipment.owner_id {
        return Err(AppError::Forbidden(
            "rental is visible to its renter and the equipment owner only".into(),
        ));
    }

    Ok(ApiResponse::success(
        "Rental",
        rental_from_entity(rental)?,
        Some(Meta::empty()),
    ))
}

pub async fn booked_dates(state: &AppState, equipment_id: Uuid) -> AppResult<ApiResponse<BookedDates>> {
    Equipment::find_by_id(equipment_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let ranges = booking::booked_ranges(&state.orm, equipment_id).await?;
    Ok(ApiResponse::success(
        "Booked dates",
        BookedDates {
            equipment_id,
            ranges,
        },
        Some(Meta::empty()),
    ))
}

async fn list_rentals(
    state: &AppState,
    mut condition: Condition,
    query: RentalListQuery,
) -> AppResult<ApiResponse<RentalList>> {
    let (page, limit, offset) = query.pagination.normalize();
    if let Some(status) = query.status {
        condition = condition.add(RentalCol::Status.eq(status.as_str()));
    }

    let mut finder = EquipmentRentals::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(RentalCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(RentalCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(rental_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Rentals", RentalList { items }, Some(meta)))
}

/// Fetch the rental, then lock equipment before rental. Every writer uses
/// this order, so two transitions on the same equipment cannot deadlock.
async fn load_locked(
    txn: &DatabaseTransaction,
    rental_id: Uuid,
) -> AppResult<(RentalModel, EquipmentModel)> {
    let rental = EquipmentRentals::find_by_id(rental_id)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let equipment = Equipment::find_by_id(rental.equipment_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let rental = EquipmentRentals::find_by_id(rental_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok((rental, equipment))
}

async fn set_equipment_status(
    txn: &DatabaseTransaction,
    equipment_id: Uuid,
    status: EquipmentStatus,
) -> AppResult<()> {
    Equipment::update_many()
        .col_expr(EquipCol::Status, Expr::value(status.as_str()))
        .col_expr(EquipCol::UpdatedAt, Expr::value(Utc::now()))
        .filter(EquipCol::Id.eq(equipment_id))
        .exec(txn)
        .await?;
    Ok(())
}

async fn audit(state: &AppState, user: &AuthUser, action: &str, metadata: serde_json::Value) {
    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        action,
        Some("equipment_rentals"),
        Some(metadata),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }
}

fn parse_rental_status(model: &RentalModel) -> AppResult<RentalStatus> {
    model
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))
}

fn parse_payment_status(model: &RentalModel) -> AppResult<PaymentStatus> {
    model
        .payment_status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))
}

fn parse_equipment_status(model: &EquipmentModel) -> AppResult<EquipmentStatus> {
    model
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))
}

pub fn rental_from_entity(model: RentalModel) -> AppResult<EquipmentRental> {
    let status = model
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    let payment_status = model
        .payment_status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    Ok(EquipmentRental {
        id: model.id,
        equipment_id: model.equipment_id,
        renter_id: model.renter_id,
        start_date: model.start_date,
        end_date: model.end_date,
        rental_days: model.rental_days,
        daily_rate: model.daily_rate,
        total_amount: model.total_amount,
        security_deposit: model.security_deposit,
        delivery_required: model.delivery_required,
        delivery_address: model.delivery_address,
        special_instructions: model.special_instructions,
        status,
        payment_status,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
