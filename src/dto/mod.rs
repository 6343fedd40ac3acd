pub mod auth;
pub mod equipment;
pub mod orders;
pub mod products;
pub mod rentals;
