use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::config::{PaymentConfig, QrConfig},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::config_service,
    state::AppState,
};

/// Read-only site settings for signed-in callers. Admin writes live under `/api/admin/config`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/qr", get(get_qr))
        .route("/payment", get(get_payment))
}

#[utoipa::path(
    get,
    path = "/api/config/qr",
    responses(
        (status = 200, description = "QR block", body = ApiResponse<QrConfig>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Config"
)]
pub async fn get_qr(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<ApiResponse<QrConfig>>> {
    let resp = config_service::get_qr(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/config/payment",
    responses(
        (status = 200, description = "Payment instructions for premium requests", body = ApiResponse<PaymentConfig>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Config"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    _user: AuthUser,
) -> AppResult<Json<ApiResponse<PaymentConfig>>> {
    let resp = config_service::get_payment(&state).await?;
    Ok(Json(resp))
}
