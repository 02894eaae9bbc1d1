use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    models::{Notification, Rating, RatingSummary},
    routes::params::Pagination,
};

pub const MAX_COMMENT_LEN: usize = 500;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRatingRequest {
    pub rating: i16,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RatingList {
    pub summary: RatingSummary,
    pub items: Vec<Rating>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCourseRequest {
    pub subject: String,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct NotificationQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub unread_only: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NotificationList {
    pub unread: u64,
    pub items: Vec<Notification>,
}

impl NotificationQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            per_page: self.per_page,
        }
    }
}
