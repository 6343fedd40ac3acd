use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::rentals::{CreateRentalRequest, RentalList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::EquipmentRental,
    response::ApiResponse,
    routes::params::RentalListQuery,
    services::rental_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(my_rentals).post(create_rental))
        .route("/equipment", get(my_equipment_rentals))
        .route("/{id}", get(get_rental))
        .route("/{id}/confirm", post(confirm_rental))
        .route("/{id}/cancel", post(cancel_rental))
        .route("/{id}/complete", post(complete_rental))
}

#[utoipa::path(
    post,
    path = "/api/rentals",
    request_body = CreateRentalRequest,
    responses(
        (status = 200, description = "Rental request created", body = ApiResponse<EquipmentRental>),
        (status = 400, description = "Invalid dates or rental period"),
        (status = 403, description = "Caller is not a farmer, or owns the equipment"),
        (status = 404, description = "Equipment not found"),
        (status = 409, description = "Dates clash with an existing booking"),
    ),
    tag = "Rentals"
)]
pub async fn create_rental(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateRentalRequest>,
) -> AppResult<Json<ApiResponse<EquipmentRental>>> {
    let resp = rental_service::create_rental(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/rentals",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Caller's rentals as renter", body = ApiResponse<RentalList>)
    ),
    tag = "Rentals"
)]
pub async fn my_rentals(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<RentalListQuery>,
) -> AppResult<Json<ApiResponse<RentalList>>> {
    let resp = rental_service::list_my_rentals(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/rentals/equipment",
    responses(
        (status = 200, description = "Rentals against caller's equipment", body = ApiResponse<RentalList>)
    ),
    tag = "Rentals"
)]
pub async fn my_equipment_rentals(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<RentalListQuery>,
) -> AppResult<Json<ApiResponse<RentalList>>> {
    let resp = rental_service::list_my_equipment_rentals(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/rentals/{id}",
    params(("id" = Uuid, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Get rental", body = ApiResponse<EquipmentRental>),
        (status = 404, description = "Rental not found"),
    ),
    tag = "Rentals"
)]
pub async fn get_rental(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<EquipmentRental>>> {
    let resp = rental_service::get_rental(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/rentals/{id}/confirm",
    params(("id" = Uuid, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Rental confirmed", body = ApiResponse<EquipmentRental>),
        (status = 400, description = "Rental is not pending"),
        (status = 403, description = "Caller does not own the equipment"),
        (status = 409, description = "Window was booked while the request was pending"),
    ),
    tag = "Rentals"
)]
pub async fn confirm_rental(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<EquipmentRental>>> {
    let resp = rental_service::confirm_rental(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/rentals/{id}/cancel",
    params(("id" = Uuid, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Rental cancelled", body = ApiResponse<EquipmentRental>),
        (status = 400, description = "Rental already terminal"),
        (status = 403, description = "Caller is neither renter nor owner"),
    ),
    tag = "Rentals"
)]
pub async fn cancel_rental(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<EquipmentRental>>> {
    let resp = rental_service::cancel_rental(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/rentals/{id}/complete",
    params(("id" = Uuid, Path, description = "Rental ID")),
    responses(
        (status = 200, description = "Rental completed", body = ApiResponse<EquipmentRental>),
        (status = 400, description = "Rental is not active"),
        (status = 403, description = "Caller does not own the equipment"),
    ),
    tag = "Rentals"
)]
pub async fn complete_rental(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<EquipmentRental>>> {
    let resp = rental_service::complete_rental(&state, &user, id).await?;
    Ok(Json(resp))
}
