use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::EquipmentRental;

/// Rental request. Financial fields (`rental_days`, `total_amount`,
/// `security_deposit`) are computed server-side from the equipment record
/// and are deliberately absent here.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRentalRequest {
    pub equipment_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub delivery_required: Option<bool>,
    pub delivery_address: Option<String>,
    pub special_instructions: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RentalList {
    pub items: Vec<EquipmentRental>,
}

/// A booked window, half-open: the equipment is taken on [start_date, end_date).
#[derive(Debug, Serialize, ToSchema)]
pub struct BookedRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookedDates {
    pub equipment_id: Uuid,
    pub ranges: Vec<BookedRange>,
}
