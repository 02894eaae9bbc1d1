use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod config;
pub mod doc;
pub mod health;
pub mod notifications;
pub mod pages;
pub mod params;
pub mod products;
pub mod requests;
pub mod users;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/products", products::router())
        .nest("/requests", requests::router())
        .nest("/notifications", notifications::router())
        .nest("/config", config::router())
        .nest("/admin", admin::router())
}
