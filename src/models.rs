use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::{course_requests, notifications, premium_requests, products, ratings, users},
    services::subscription::is_active_on,
};

pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    Available,
    Sold,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Available => "available",
            ProductStatus::Sold => "sold",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "sold" => ProductStatus::Sold,
            _ => ProductStatus::Available,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "approved" => RequestStatus::Approved,
            "rejected" => RequestStatus::Rejected,
            _ => RequestStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Light,
    Dark,
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "light" => Theme::Light,
            "dark" => Theme::Dark,
            _ => Theme::System,
        }
    }
}

/// Full profile, visible to its owner and to admins.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<String>,
    pub residence: Option<String>,
    pub active: bool,
    pub role: String,
    pub is_premium: bool,
    pub subscription_start: Option<NaiveDate>,
    pub subscription_end: Option<NaiveDate>,
    pub is_seller_verified: bool,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    pub selfie_url: Option<String>,
    pub id_card_url: Option<String>,
    pub license_url: Option<String>,
    pub documents_last_updated_at: Option<DateTime<Utc>>,
    pub product_count: i32,
    pub theme: Theme,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            birth_date: model.birth_date,
            sex: model.sex,
            residence: model.residence,
            active: model.active,
            role: model.role,
            is_premium: subscription_effective(
                model.is_premium,
                model.subscription_start,
                model.subscription_end,
                Utc::now().date_naive(),
            ),
            subscription_start: model.subscription_start,
            subscription_end: model.subscription_end,
            is_seller_verified: model.is_seller_verified,
            phone: model.phone,
            photo_url: model.photo_url,
            selfie_url: model.selfie_url,
            id_card_url: model.id_card_url,
            license_url: model.license_url,
            documents_last_updated_at: model
                .documents_last_updated_at
                .map(|dt| dt.with_timezone(&Utc)),
            product_count: model.product_count,
            theme: Theme::parse(&model.theme),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// What buyers see of a seller.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicSeller {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub residence: Option<String>,
    pub photo_url: Option<String>,
    pub is_seller_verified: bool,
    pub product_count: i32,
    pub rating: RatingSummary,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub offer_price: Option<i64>,
    pub main_category: String,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub condition: Option<String>,
    pub gender: Option<String>,
    pub style: Option<String>,
    pub material: Option<String>,
    pub sizes: Vec<String>,
    pub stock: i32,
    pub image_urls: Vec<String>,
    pub status: ProductStatus,
    /// True only while the promotion window is open.
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        let premium_until = model.premium_until.map(|dt| dt.with_timezone(&Utc));
        let is_premium = premium_effective(model.is_premium, premium_until, Utc::now());
        Self {
            id: model.id,
            user_id: model.user_id,
            name: model.name,
            description: model.description,
            price: model.price,
            offer_price: model.offer_price,
            main_category: model.main_category,
            subcategory: model.subcategory,
            brand: model.brand,
            condition: model.condition,
            gender: model.gender,
            style: model.style,
            material: model.material,
            sizes: string_list(&model.sizes),
            stock: model.stock,
            image_urls: string_list(&model.image_urls),
            status: ProductStatus::parse(&model.status),
            is_premium,
            premium_until,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// A promotion with no end date stays on until an admin turns it off.
pub fn premium_effective(flag: bool, until: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    flag && until.is_none_or(|until| until > now)
}

/// A user with a subscription window is premium only inside it.
pub fn subscription_effective(
    flag: bool,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> bool {
    match (start, end) {
        (Some(start), Some(end)) => is_active_on(start, end, today),
        _ => flag,
    }
}

/// Reads a JSON array of strings, skipping anything else.
pub fn string_list(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Rating {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewer_name: String,
    pub rating: i16,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ratings::Model> for Rating {
    fn from(model: ratings::Model) -> Self {
        Self {
            id: model.id,
            seller_id: model.seller_id,
            reviewer_id: model.reviewer_id,
            reviewer_name: model.reviewer_name,
            rating: model.rating,
            comment: model.comment,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RatingSummary {
    pub average: Option<f64>,
    pub count: i64,
}

impl RatingSummary {
    pub fn from_scores(scores: &[i16]) -> Self {
        if scores.is_empty() {
            return Self::default();
        }
        let sum: i64 = scores.iter().map(|s| i64::from(*s)).sum();
        let count = scores.len() as i64;
        let average = (sum as f64 / count as f64 * 10.0).round() / 10.0;
        Self {
            average: Some(average),
            count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub message: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<course_requests::Model> for CourseRequest {
    fn from(model: course_requests::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            subject: model.subject,
            message: model.message,
            status: RequestStatus::parse(&model.status),
            created_at: model.created_at.with_timezone(&Utc),
            resolved_at: model.resolved_at.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PremiumRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub days: i32,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<premium_requests::Model> for PremiumRequest {
    fn from(model: premium_requests::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            product_id: model.product_id,
            days: model.days,
            status: RequestStatus::parse(&model.status),
            created_at: model.created_at.with_timezone(&Utc),
            resolved_at: model.resolved_at.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<notifications::Model> for Notification {
    fn from(model: notifications::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            body: model.body,
            read: model.read,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
