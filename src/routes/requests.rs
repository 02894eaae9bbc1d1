use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::{admin::CourseRequestList, social::CreateCourseRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::CourseRequest,
    response::ApiResponse,
    services::request_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_request))
        .route("/mine", get(my_requests))
}

#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Request sent", body = ApiResponse<CourseRequest>),
        (status = 400, description = "Missing subject"),
        (status = 409, description = "Same subject already pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn create_request(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCourseRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CourseRequest>>)> {
    let resp = request_service::create_request(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/requests/mine",
    responses(
        (status = 200, description = "Own requests, newest first", body = ApiResponse<CourseRequestList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Requests"
)]
pub async fn my_requests(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CourseRequestList>>> {
    let resp = request_service::list_my_requests(&state, &user).await?;
    Ok(Json(resp))
}
