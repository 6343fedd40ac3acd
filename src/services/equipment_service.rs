use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::equipment::{CreateEquipmentRequest, EquipmentList, UpdateEquipmentRequest},
    entity::equipment::{ActiveModel, Column, Entity as EquipmentEntity, Model as EquipmentModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_farmer},
    models::{Equipment, EquipmentStatus},
    response::{ApiResponse, Meta},
    routes::params::{EquipmentQuery, SortOrder},
    state::AppState,
};

pub async fn list_equipment(
    state: &AppState,
    query: EquipmentQuery,
) -> AppResult<ApiResponse<EquipmentList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(equipment_type) = query.equipment_type.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(Column::EquipmentType.eq(equipment_type.clone()));
    }
    if let Some(status) = query.status {
        condition = condition.add(Column::Status.eq(status.as_str()));
    }

    let mut finder = EquipmentEntity::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(Column::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(Column::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(equipment_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Equipment",
        EquipmentList { items },
        Some(meta),
    ))
}

pub async fn get_equipment(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Equipment>> {
    let equipment = EquipmentEntity::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success(
        "Equipment",
        equipment_from_entity(equipment)?,
        None,
    ))
}

pub async fn list_my_equipment(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<EquipmentList>> {
    let items = EquipmentEntity::find()
        .filter(Column::OwnerId.eq(user.user_id))
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(equipment_from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "My equipment",
        EquipmentList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_equipment(
    state: &AppState,
    user: &AuthUser,
    payload: CreateEquipmentRequest,
) -> AppResult<ApiResponse<Equipment>> {
    ensure_farmer(user, "list equipment")?;

    if payload.daily_rate < 0 {
        return Err(AppError::Validation("daily_rate cannot be negative".into()));
    }
    let min_rental_days = payload.min_rental_days.unwrap_or(1);
    if min_rental_days < 1 {
        return Err(AppError::Validation(
            "min_rental_days must be at least 1".into(),
        ));
    }
    if payload.max_rental_days.is_some_and(|max| max < min_rental_days) {
        return Err(AppError::Validation(
            "max_rental_days cannot be less than min_rental_days".into(),
        ));
    }

    let equipment = ActiveModel {
        id: Set(Uuid::new_v4()),
        owner_id: Set(user.user_id),
        name: Set(payload.name),
        description: Set(payload.description),
        equipment_type: Set(payload.equipment_type),
        daily_rate: Set(payload.daily_rate),
        security_deposit: Set(payload.security_deposit),
        status: Set(EquipmentStatus::Available.as_str().into()),
        min_rental_days: Set(min_rental_days),
        max_rental_days: Set(payload.max_rental_days),
        delivery_available: Set(payload.delivery_available.unwrap_or(false)),
        location: Set(payload.location),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "equipment_created",
        Some("equipment"),
        Some(serde_json::json!({ "equipment_id": equipment.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Equipment listed",
        equipment_from_entity(equipment)?,
        Some(Meta::empty()),
    ))
}

pub async fn update_equipment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateEquipmentRequest,
) -> AppResult<ApiResponse<Equipment>> {
    let equipment = EquipmentEntity::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if equipment.owner_id != user.user_id {
        return Err(AppError::Forbidden(
            "only the owner can modify equipment".into(),
        ));
    }

    // The rented marker belongs to the rental lifecycle engine.
    if payload.status == Some(EquipmentStatus::Rented) {
        return Err(AppError::Validation(
            "status 'rented' is managed by the rental lifecycle".into(),
        ));
    }

    let mut active: ActiveModel = equipment.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(equipment_type) = payload.equipment_type {
        active.equipment_type = Set(equipment_type);
    }
    if let Some(daily_rate) = payload.daily_rate {
        if daily_rate < 0 {
            return Err(AppError::Validation("daily_rate cannot be negative".into()));
        }
        active.daily_rate = Set(daily_rate);
    }
    if let Some(security_deposit) = payload.security_deposit {
        active.security_deposit = Set(Some(security_deposit));
    }
    if let Some(status) = payload.status {
        active.status = Set(status.as_str().into());
    }
    if let Some(min_rental_days) = payload.min_rental_days {
        active.min_rental_days = Set(min_rental_days);
    }
    if let Some(max_rental_days) = payload.max_rental_days {
        active.max_rental_days = Set(Some(max_rental_days));
    }
    if let Some(delivery_available) = payload.delivery_available {
        active.delivery_available = Set(delivery_available);
    }
    if let Some(location) = payload.location {
        active.location = Set(Some(location));
    }
    active.updated_at = Set(Utc::now().into());
    let equipment = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Equipment updated",
        equipment_from_entity(equipment)?,
        Some(Meta::empty()),
    ))
}

pub fn equipment_from_entity(model: EquipmentModel) -> AppResult<Equipment> {
    let status = model
        .status
        .parse()
        .map_err(|e: String| AppError::Internal(anyhow::anyhow!(e)))?;
    Ok(Equipment {
        id: model.id,
        owner_id: model.owner_id,
        name: model.name,
        description: model.description,
        equipment_type: model.equipment_type,
        daily_rate: model.daily_rate,
        security_deposit: model.security_deposit,
        status,
        min_rental_days: model.min_rental_days,
        max_rental_days: model.max_rental_days,
        delivery_available: model.delivery_available,
        location: model.location,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
