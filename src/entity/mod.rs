pub mod accounts;
pub mod audit_logs;
pub mod course_requests;
pub mod notifications;
pub mod premium_requests;
pub mod products;
pub mod ratings;
pub mod site_config;
pub mod user_deletions;
pub mod users;

pub use accounts::Entity as Accounts;
pub use audit_logs::Entity as AuditLogs;
pub use course_requests::Entity as CourseRequests;
pub use notifications::Entity as Notifications;
pub use premium_requests::Entity as PremiumRequests;
pub use products::Entity as Products;
pub use ratings::Entity as Ratings;
pub use site_config::Entity as SiteConfig;
pub use user_deletions::Entity as UserDeletions;
pub use users::Entity as Users;
