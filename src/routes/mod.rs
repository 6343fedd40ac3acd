use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod doc;
pub mod equipment;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod rentals;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/equipment", equipment::router())
        .nest("/rentals", rentals::router())
        .nest("/orders", orders::router())
}
