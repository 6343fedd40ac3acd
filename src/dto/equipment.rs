use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Equipment, EquipmentStatus};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateEquipmentRequest {
    pub name: String,
    pub description: Option<String>,
    pub equipment_type: String,
    pub daily_rate: i64,
    pub security_deposit: Option<i64>,
    pub min_rental_days: Option<i32>,
    pub max_rental_days: Option<i32>,
    pub delivery_available: Option<bool>,
    pub location: Option<String>,
}

/// Owner-side updates. `status` accepts available/maintenance/unavailable;
/// `rented` is owned by the rental lifecycle engine and rejected here.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateEquipmentRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub equipment_type: Option<String>,
    pub daily_rate: Option<i64>,
    pub security_deposit: Option<i64>,
    pub status: Option<EquipmentStatus>,
    pub min_rental_days: Option<i32>,
    pub max_rental_days: Option<i32>,
    pub delivery_available: Option<bool>,
    pub location: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EquipmentList {
    pub items: Vec<Equipment>,
}
