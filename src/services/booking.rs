//! Booking conflict checker.
//!
//! Only confirmed and active rentals block a date range; a pending request
//! holds nothing until the owner confirms it, and terminal rentals release
//! their window. Callers run these queries inside the same transaction that
//! writes the status change, with the equipment row locked, so the check and
//! the write cannot be split by a racing request.

use chrono::NaiveDate;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::{
    dto::rentals::BookedRange,
    entity::equipment_rentals::{Column as RentalCol, Entity as EquipmentRentals},
    error::AppResult,
    models::RentalStatus,
};

/// Half-open interval intersection: [a_start, a_end) overlaps [b_start, b_end).
pub fn ranges_overlap(
    a_start: NaiveDate,
    a_end: NaiveDate,
    b_start: NaiveDate,
    b_end: NaiveDate,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Statuses that hold a window against other requests.
const BLOCKING: [&str; 2] = [
    RentalStatus::Confirmed.as_str(),
    RentalStatus::Active.as_str(),
];

/// True when any confirmed/active rental on the equipment overlaps
/// [start, end). `exclude_rental` skips the rental currently being
/// confirmed so it does not conflict with itself.
pub async fn has_conflict<C: ConnectionTrait>(
    conn: &C,
    equipment_id: Uuid,
    start: NaiveDate,
    end: NaiveDate,
    exclude_rental: Option<Uuid>,
) -> AppResult<bool> {
    let mut finder = EquipmentRentals::find()
        .filter(RentalCol::EquipmentId.eq(equipment_id))
        .filter(RentalCol::Status.is_in(BLOCKING))
        .filter(RentalCol::StartDate.lt(end))
        .filter(RentalCol::EndDate.gt(start));

    if let Some(id) = exclude_rental {
        finder = finder.filter(RentalCol::Id.ne(id));
    }

    let clash = finder.one(conn).await?;
    Ok(clash.is_some())
}

/// Confirmed/active windows for an equipment, ordered by start date.
pub async fn booked_ranges<C: ConnectionTrait>(
    conn: &C,
    equipment_id: Uuid,
) -> AppResult<Vec<BookedRange>> {
    let rentals = EquipmentRentals::find()
        .filter(RentalCol::EquipmentId.eq(equipment_id))
        .filter(RentalCol::Status.is_in(BLOCKING))
        .order_by_asc(RentalCol::StartDate)
        .all(conn)
        .await?;

    Ok(rentals
        .into_iter()
        .map(|r| BookedRange {
            start_date: r.start_date,
            end_date: r.end_date,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::ranges_overlap;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn overlapping_ranges_conflict() {
        assert!(ranges_overlap(
            d("2024-06-01"),
            d("2024-06-05"),
            d("2024-06-03"),
            d("2024-06-07"),
        ));
    }

    #[test]
    fn contained_range_conflicts() {
        assert!(ranges_overlap(
            d("2024-06-01"),
            d("2024-06-10"),
            d("2024-06-03"),
            d("2024-06-04"),
        ));
    }

    #[test]
    fn touching_ranges_do_not_conflict() {
        // [01, 05) and [05, 09): return day equals next pickup day.
        assert!(!ranges_overlap(
            d("2024-06-01"),
            d("2024-06-05"),
            d("2024-06-05"),
            d("2024-06-09"),
        ));
    }

    #[test]
    fn disjoint_ranges_do_not_conflict() {
        assert!(!ranges_overlap(
            d("2024-06-01"),
            d("2024-06-03"),
            d("2024-06-10"),
            d("2024-06-12"),
        ));
    }
}
