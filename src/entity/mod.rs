pub mod audit_logs;
pub mod equipment;
pub mod equipment_rentals;
pub mod orders;
pub mod products;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use equipment::Entity as Equipment;
pub use equipment_rentals::Entity as EquipmentRentals;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use users::Entity as Users;
