use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{CourseRequest, PremiumRequest, Product},
    routes::params::Pagination,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AdminUpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<String>,
    pub residence: Option<String>,
    pub phone: Option<String>,
    pub active: Option<bool>,
    pub is_seller_verified: Option<bool>,
    /// Also rewrites the account's role claim.
    pub role: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusToggleResponse {
    pub id: Uuid,
    pub active: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscriptionRequest {
    pub subscription_start: NaiveDate,
    pub months: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Scheduled,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubscriptionEntry {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub subscription_start: NaiveDate,
    pub subscription_end: NaiveDate,
    pub is_premium: bool,
    pub status: SubscriptionStatus,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct SubscriptionList {
    #[schema(value_type = Vec<SubscriptionEntry>)]
    pub items: Vec<SubscriptionEntry>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UserListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub q: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RequestListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeletionReport {
    pub user_id: Uuid,
    pub stage: String,
    pub products_deleted: u64,
    pub objects_failed: usize,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct PremiumRequestList {
    #[schema(value_type = Vec<PremiumRequest>)]
    pub items: Vec<PremiumRequest>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct CourseRequestList {
    #[schema(value_type = Vec<CourseRequest>)]
    pub items: Vec<CourseRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PremiumApproval {
    pub request: PremiumRequest,
    pub product: Product,
}

impl UserListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

impl RequestListQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
