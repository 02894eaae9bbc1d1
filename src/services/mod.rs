pub mod admin_service;
pub mod auth_service;
pub mod config_service;
pub mod deletion_service;
pub mod notification_service;
pub mod premium_service;
pub mod product_service;
pub mod rating_service;
pub mod request_service;
pub mod subscription;
pub mod token_service;
pub mod user_service;
