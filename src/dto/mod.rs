pub mod admin;
pub mod auth;
pub mod config;
pub mod products;
pub mod social;
pub mod users;
