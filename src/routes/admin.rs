use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{
            AdminUpdateUserRequest, CourseRequestList, DeletionReport, PremiumApproval,
            PremiumRequestList, RequestListQuery, StatusToggleResponse, SubscriptionList,
            SubscriptionRequest, UserListQuery,
        },
        auth::RegisterRequest,
        config::{PaymentConfig, QrConfig},
        products::{ProductList, SetPremiumRequest},
        users::UserList,
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::{CourseRequest, PremiumRequest, Product, User},
    response::ApiResponse,
    routes::params::Pagination,
    services::{
        admin_service, config_service, deletion_service, premium_service, request_service,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/{id}/status", patch(toggle_status))
        .route("/users/{id}/subscription", put(update_subscription))
        .route("/subscriptions", get(list_subscriptions))
        .route("/requests", get(list_course_requests))
        .route("/requests/{id}/approve", post(approve_course_request))
        .route("/requests/{id}/reject", post(reject_course_request))
        .route("/premium-requests", get(list_premium_requests))
        .route("/premium-requests/{id}/approve", post(approve_premium_request))
        .route("/premium-requests/{id}/reject", post(reject_premium_request))
        .route("/products/{id}/premium", put(set_product_premium))
        .route("/premium-products", get(list_premium_products))
        .route("/config/qr", get(get_qr).put(put_qr))
        .route("/config/payment", get(get_payment).put(put_payment))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search name or email"),
        ("active" = Option<bool>, Query, description = "Filter by active flag")
    ),
    responses(
        (status = 200, description = "List users (admin only)", body = ApiResponse<UserList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = admin_service::list_users(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created with the given role", body = ApiResponse<User>),
        (status = 400, description = "Invalid fields"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email already registered")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let resp = admin_service::create_user(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Full profile", body = ApiResponse<User>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = admin_service::get_user(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = AdminUpdateUserRequest,
    responses(
        (status = 200, description = "Profile and role updated", body = ApiResponse<User>),
        (status = 400, description = "Invalid fields"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdminUpdateUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = admin_service::update_user(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User, products and files deleted", body = ApiResponse<DeletionReport>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Unknown user"),
        (status = 500, description = "A step failed; retry resumes it")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<DeletionReport>>> {
    let resp = deletion_service::delete_user(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/status",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Active flag flipped", body = ApiResponse<StatusToggleResponse>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn toggle_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<StatusToggleResponse>>> {
    let resp = admin_service::toggle_status(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/subscription",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = SubscriptionRequest,
    responses(
        (status = 200, description = "Subscription window set", body = ApiResponse<User>),
        (status = 400, description = "Invalid month count"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_subscription(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubscriptionRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = admin_service::update_subscription(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/subscriptions",
    responses(
        (status = 200, description = "Users with a subscription window", body = ApiResponse<SubscriptionList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_subscriptions(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SubscriptionList>>> {
    let resp = admin_service::list_subscriptions(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/requests",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "pending, approved or rejected")
    ),
    responses(
        (status = 200, description = "Course requests", body = ApiResponse<CourseRequestList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_course_requests(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<RequestListQuery>,
) -> AppResult<Json<ApiResponse<CourseRequestList>>> {
    let resp = request_service::list_requests(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/requests/{id}/approve",
    params(
        ("id" = Uuid, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request approved", body = ApiResponse<CourseRequest>),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Already resolved")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn approve_course_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CourseRequest>>> {
    let resp = request_service::resolve_request(&state, &user, id, true).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/requests/{id}/reject",
    params(
        ("id" = Uuid, Path, description = "Request ID")
    ),
    responses(
        (status = 200, description = "Request rejected", body = ApiResponse<CourseRequest>),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Already resolved")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn reject_course_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CourseRequest>>> {
    let resp = request_service::resolve_request(&state, &user, id, false).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/premium-requests",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "pending, approved or rejected")
    ),
    responses(
        (status = 200, description = "Premium requests", body = ApiResponse<PremiumRequestList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Premium"
)]
pub async fn list_premium_requests(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<RequestListQuery>,
) -> AppResult<Json<ApiResponse<PremiumRequestList>>> {
    let resp = premium_service::list_requests(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/premium-requests/{id}/approve",
    params(
        ("id" = Uuid, Path, description = "Premium request ID")
    ),
    responses(
        (status = 200, description = "Product promoted", body = ApiResponse<PremiumApproval>),
        (status = 404, description = "Request or product not found"),
        (status = 409, description = "Already resolved")
    ),
    security(("bearer_auth" = [])),
    tag = "Premium"
)]
pub async fn approve_premium_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PremiumApproval>>> {
    let resp = premium_service::approve_request(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/premium-requests/{id}/reject",
    params(
        ("id" = Uuid, Path, description = "Premium request ID")
    ),
    responses(
        (status = 200, description = "Request rejected", body = ApiResponse<PremiumRequest>),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Already resolved")
    ),
    security(("bearer_auth" = [])),
    tag = "Premium"
)]
pub async fn reject_premium_request(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PremiumRequest>>> {
    let resp = premium_service::reject_request(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}/premium",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = SetPremiumRequest,
    responses(
        (status = 200, description = "Promotion set", body = ApiResponse<Product>),
        (status = 400, description = "End date in the past"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Premium"
)]
pub async fn set_product_premium(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetPremiumRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = premium_service::set_premium(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/premium-products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Currently promoted products", body = ApiResponse<ProductList>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Premium"
)]
pub async fn list_premium_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = premium_service::list_premium_products(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/config/qr",
    responses(
        (status = 200, description = "QR block", body = ApiResponse<QrConfig>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Config"
)]
pub async fn get_qr(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<QrConfig>>> {
    ensure_admin(&user)?;
    let resp = config_service::get_qr(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/config/qr",
    request_body = QrConfig,
    responses(
        (status = 200, description = "QR block saved", body = ApiResponse<QrConfig>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Config"
)]
pub async fn put_qr(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<QrConfig>,
) -> AppResult<Json<ApiResponse<QrConfig>>> {
    let resp = config_service::put_qr(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/config/payment",
    responses(
        (status = 200, description = "Payment instructions", body = ApiResponse<PaymentConfig>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Config"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PaymentConfig>>> {
    ensure_admin(&user)?;
    let resp = config_service::get_payment(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/config/payment",
    request_body = PaymentConfig,
    responses(
        (status = 200, description = "Payment instructions saved", body = ApiResponse<PaymentConfig>),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Config"
)]
pub async fn put_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PaymentConfig>,
) -> AppResult<Json<ApiResponse<PaymentConfig>>> {
    let resp = config_service::put_payment(&state, &user, payload).await?;
    Ok(Json(resp))
}
