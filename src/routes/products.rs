use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};
use uuid::Uuid;

use crate::{
    dto::products::{
        MAX_IMAGE_BYTES, PremiumRequestCreate, ProductList, ProductUploadForm,
        UpdateProductStatusRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{PremiumRequest, Product},
    response::ApiResponse,
    routes::params::ProductQuery,
    services::{premium_service, product_service},
    state::AppState,
    upload::{UploadForm, UploadedFile, read_form},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/{id}/status", patch(update_status))
        .route("/{id}/premium-requests", post(request_premium))
}

/// Splits a product upload into the `data` JSON and the `images` files.
async fn product_form(multipart: Multipart) -> AppResult<(Option<String>, Vec<UploadedFile>)> {
    let mut form: UploadForm = read_form(multipart, MAX_IMAGE_BYTES).await?;
    let images = form.take_files("images");
    if let Some(extra) = form.files.first() {
        return Err(AppError::BadRequest(format!(
            "unexpected file field {}",
            extra.field
        )));
    }
    Ok((form.text("data").map(str::to_string), images))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search in name and description"),
        ("main_category" = Option<String>, Query, description = "Main category"),
        ("subcategory" = Option<String>, Query, description = "Subcategory"),
        ("brand" = Option<String>, Query, description = "Brand"),
        ("condition" = Option<String>, Query, description = "Condition"),
        ("gender" = Option<String>, Query, description = "Gender"),
        ("seller_id" = Option<Uuid>, Query, description = "Only this seller's products"),
        ("min_price" = Option<i64>, Query, description = "Minimum price"),
        ("max_price" = Option<i64>, Query, description = "Maximum price"),
        ("status" = Option<String>, Query, description = "available (default) or sold"),
        ("sort_by" = Option<String>, Query, description = "created_at, price or name"),
        ("sort_order" = Option<String>, Query, description = "asc or desc")
    ),
    responses(
        (status = 200, description = "List products, premium first", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::get_product(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body(content = ProductUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Create product", body = ApiResponse<Product>),
        (status = 400, description = "Invalid product data or images"),
        (status = 403, description = "Seller is inactive or not verified")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let (data, images) = product_form(multipart).await?;
    let resp = product_service::create_product(&state, &user, data.as_deref(), images).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body(content = ProductUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 400, description = "Invalid product data or images"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<Product>>> {
    let (data, images) = product_form(multipart).await?;
    let resp = product_service::update_product(&state, &user, id, data.as_deref(), images).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/products/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProductStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<Product>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductStatusRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_status(&state, &user, id, payload.status).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Deleted product", body = ApiResponse<serde_json::Value>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products/{id}/premium-requests",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = PremiumRequestCreate,
    responses(
        (status = 201, description = "Premium request sent", body = ApiResponse<PremiumRequest>),
        (status = 400, description = "Invalid days or sold product"),
        (status = 403, description = "Not the owner"),
        (status = 409, description = "A request is already pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Premium"
)]
pub async fn request_premium(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<PremiumRequestCreate>,
) -> AppResult<(StatusCode, Json<ApiResponse<PremiumRequest>>)> {
    let resp = premium_service::request_premium(&state, &user, id, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}
