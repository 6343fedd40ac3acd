use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::equipment::{CreateEquipmentRequest, EquipmentList, UpdateEquipmentRequest},
    dto::rentals::BookedDates,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Equipment,
    response::ApiResponse,
    routes::params::EquipmentQuery,
    services::{equipment_service, rental_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_equipment).post(create_equipment))
        .route("/mine", get(my_equipment))
        .route("/{id}", get(get_equipment).put(update_equipment))
        .route("/{id}/booked-dates", get(booked_dates))
}

#[utoipa::path(
    get,
    path = "/api/equipment",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("equipment_type" = Option<String>, Query, description = "Type filter"),
    ),
    responses(
        (status = 200, description = "List equipment", body = ApiResponse<EquipmentList>)
    ),
    tag = "Equipment"
)]
pub async fn list_equipment(
    State(state): State<AppState>,
    Query(query): Query<EquipmentQuery>,
) -> AppResult<Json<ApiResponse<EquipmentList>>> {
    let resp = equipment_service::list_equipment(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/equipment/mine",
    responses(
        (status = 200, description = "Caller's equipment", body = ApiResponse<EquipmentList>)
    ),
    tag = "Equipment"
)]
pub async fn my_equipment(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<EquipmentList>>> {
    let resp = equipment_service::list_my_equipment(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/equipment/{id}",
    params(("id" = Uuid, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Get equipment", body = ApiResponse<Equipment>),
        (status = 404, description = "Equipment not found"),
    ),
    tag = "Equipment"
)]
pub async fn get_equipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Equipment>>> {
    let resp = equipment_service::get_equipment(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/equipment",
    request_body = CreateEquipmentRequest,
    responses(
        (status = 200, description = "List new equipment", body = ApiResponse<Equipment>),
        (status = 403, description = "Caller is not a farmer"),
    ),
    tag = "Equipment"
)]
pub async fn create_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateEquipmentRequest>,
) -> AppResult<Json<ApiResponse<Equipment>>> {
    let resp = equipment_service::create_equipment(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/equipment/{id}",
    params(("id" = Uuid, Path, description = "Equipment ID")),
    request_body = UpdateEquipmentRequest,
    responses(
        (status = 200, description = "Update equipment", body = ApiResponse<Equipment>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Equipment not found"),
    ),
    tag = "Equipment"
)]
pub async fn update_equipment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEquipmentRequest>,
) -> AppResult<Json<ApiResponse<Equipment>>> {
    let resp = equipment_service::update_equipment(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/equipment/{id}/booked-dates",
    params(("id" = Uuid, Path, description = "Equipment ID")),
    responses(
        (status = 200, description = "Confirmed/active rental windows", body = ApiResponse<BookedDates>),
        (status = 404, description = "Equipment not found"),
    ),
    tag = "Equipment"
)]
pub async fn booked_dates(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BookedDates>>> {
    let resp = rental_service::booked_dates(&state, id).await?;
    Ok(Json(resp))
}
