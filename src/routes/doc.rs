use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{
            AdminUpdateUserRequest, CourseRequestList, DeletionReport, PremiumApproval,
            PremiumRequestList, RequestListQuery, StatusToggleResponse, SubscriptionEntry,
            SubscriptionList, SubscriptionRequest, SubscriptionStatus, UserListQuery,
        },
        auth::{
            LoginRequest, LoginResponse, MeResponse, RegisterRequest, TokenRequest, TokenResponse,
        },
        config::{PaymentConfig, QrConfig},
        products::{
            CreateProductRequest, PremiumRequestCreate, ProductList, ProductUploadForm,
            SetPremiumRequest, UpdateProductRequest, UpdateProductStatusRequest,
        },
        social::{CreateCourseRequest, CreateRatingRequest, NotificationList, RatingList},
        users::{PreferencesRequest, UpdateProfileRequest, UserList, VerificationUploadForm},
    },
    models::{
        CourseRequest, Notification, PremiumRequest, Product, ProductStatus, PublicSeller,
        Rating, RatingSummary, RequestStatus, Theme, User,
    },
    response::{ApiResponse, Meta},
    routes::{
        admin, auth, config, health, notifications, pages::PageShell, params,
        products as product_routes, requests, users,
    },
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        auth::register,
        auth::token,
        auth::login,
        auth::logout,
        auth::me,
        users::get_me,
        users::update_me,
        users::update_preferences,
        users::submit_verification,
        users::my_products,
        users::get_seller,
        users::list_ratings,
        users::rate_seller,
        product_routes::list_products,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::update_status,
        product_routes::delete_product,
        product_routes::request_premium,
        requests::create_request,
        requests::my_requests,
        notifications::list_notifications,
        notifications::mark_read,
        notifications::mark_all_read,
        config::get_qr,
        config::get_payment,
        admin::list_users,
        admin::create_user,
        admin::get_user,
        admin::update_user,
        admin::delete_user,
        admin::toggle_status,
        admin::update_subscription,
        admin::list_subscriptions,
        admin::list_course_requests,
        admin::approve_course_request,
        admin::reject_course_request,
        admin::list_premium_requests,
        admin::approve_premium_request,
        admin::reject_premium_request,
        admin::set_product_premium,
        admin::list_premium_products,
        admin::get_qr,
        admin::put_qr,
        admin::get_payment,
        admin::put_payment
    ),
    components(
        schemas(
            User,
            PublicSeller,
            Product,
            ProductStatus,
            Rating,
            RatingSummary,
            CourseRequest,
            PremiumRequest,
            RequestStatus,
            Notification,
            Theme,
            PageShell,
            RegisterRequest,
            TokenRequest,
            TokenResponse,
            LoginRequest,
            LoginResponse,
            MeResponse,
            UpdateProfileRequest,
            PreferencesRequest,
            VerificationUploadForm,
            UserList,
            CreateProductRequest,
            UpdateProductRequest,
            UpdateProductStatusRequest,
            ProductUploadForm,
            PremiumRequestCreate,
            SetPremiumRequest,
            ProductList,
            CreateRatingRequest,
            RatingList,
            CreateCourseRequest,
            NotificationList,
            QrConfig,
            PaymentConfig,
            AdminUpdateUserRequest,
            StatusToggleResponse,
            SubscriptionRequest,
            SubscriptionStatus,
            SubscriptionEntry,
            SubscriptionList,
            UserListQuery,
            RequestListQuery,
            DeletionReport,
            PremiumRequestList,
            CourseRequestList,
            PremiumApproval,
            params::Pagination,
            params::ProductQuery,
            Meta,
            ApiResponse<User>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<DeletionReport>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Auth", description = "Registration, ID tokens and session cookies"),
        (name = "Users", description = "Own profile, verification and public seller profiles"),
        (name = "Products", description = "Marketplace listings"),
        (name = "Ratings", description = "Seller ratings"),
        (name = "Premium", description = "Product promotion workflow"),
        (name = "Requests", description = "Course requests"),
        (name = "Notifications", description = "In-app notifications"),
        (name = "Config", description = "Site settings"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_admin_and_auth_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/auth/login"));
        assert!(doc.paths.paths.contains_key("/api/admin/users/{id}"));
        assert!(doc.paths.paths.contains_key("/api/products/{id}/premium-requests"));
    }
}
