pub mod auth_service;
pub mod booking;
pub mod equipment_service;
pub mod order_service;
pub mod product_service;
pub mod rental_service;
