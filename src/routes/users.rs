use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        products::ProductList,
        social::{CreateRatingRequest, RatingList},
        users::{PreferencesRequest, UpdateProfileRequest, VerificationUploadForm},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{PublicSeller, Rating, User},
    response::ApiResponse,
    routes::params::Pagination,
    services::{
        product_service, rating_service,
        user_service::{self, MAX_DOCUMENT_BYTES},
    },
    state::AppState,
    upload::read_form,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/me/preferences", put(update_preferences))
        .route("/me/verification", post(submit_verification))
        .route("/me/products", get(my_products))
        .route("/{id}", get(get_seller))
        .route("/{id}/ratings", get(list_ratings).post(rate_seller))
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Own profile", body = ApiResponse<User>),
        (status = 404, description = "Profile not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::get_me(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<User>),
        (status = 400, description = "Invalid fields")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::update_me(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/users/me/preferences",
    request_body = PreferencesRequest,
    responses(
        (status = 200, description = "Preferences saved", body = ApiResponse<User>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_preferences(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PreferencesRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = user_service::update_preferences(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/users/me/verification",
    request_body(content = VerificationUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Verification updated", body = ApiResponse<User>),
        (status = 400, description = "Invalid documents"),
        (status = 409, description = "Documents changed too recently")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn submit_verification(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<User>>> {
    let mut form = read_form(multipart, MAX_DOCUMENT_BYTES).await?;
    let phone = form.text("phone").map(str::to_string);
    let files = std::mem::take(&mut form.files);
    let resp = user_service::submit_verification(&state, &user, phone.as_deref(), files).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/users/me/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "Own products in any status", body = ApiResponse<ProductList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn my_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_own_products(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(
        ("id" = Uuid, Path, description = "Seller ID")
    ),
    responses(
        (status = 200, description = "Public seller profile", body = ApiResponse<PublicSeller>),
        (status = 404, description = "Seller not found")
    ),
    tag = "Users"
)]
pub async fn get_seller(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PublicSeller>>> {
    let resp = user_service::get_public_profile(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}/ratings",
    params(
        ("id" = Uuid, Path, description = "Seller ID")
    ),
    responses(
        (status = 200, description = "Ratings with summary", body = ApiResponse<RatingList>),
        (status = 404, description = "Seller not found")
    ),
    tag = "Ratings"
)]
pub async fn list_ratings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RatingList>>> {
    let resp = rating_service::list_ratings(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/ratings",
    params(
        ("id" = Uuid, Path, description = "Seller ID")
    ),
    request_body = CreateRatingRequest,
    responses(
        (status = 201, description = "Rating saved", body = ApiResponse<Rating>),
        (status = 400, description = "Invalid score or self rating"),
        (status = 409, description = "Seller already rated")
    ),
    security(("bearer_auth" = [])),
    tag = "Ratings"
)]
pub async fn rate_seller(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateRatingRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Rating>>)> {
    let resp = rating_service::rate_seller(&state, &user, id, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
