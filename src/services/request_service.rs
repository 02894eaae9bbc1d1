use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use uuid::Uuid;

use crate::{
    audit::record,
    dto::{
        admin::{CourseRequestList, RequestListQuery},
        social::CreateCourseRequest,
    },
    entity::course_requests::{ActiveModel, Column, Entity as CourseRequests},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{CourseRequest, RequestStatus},
    response::{ApiResponse, Meta},
    services::notification_service::notify,
    state::AppState,
};

pub const MAX_SUBJECT_LEN: usize = 120;

pub fn parse_status_filter(status: Option<&str>) -> AppResult<Option<RequestStatus>> {
    match status.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some("pending") => Ok(Some(RequestStatus::Pending)),
        Some("approved") => Ok(Some(RequestStatus::Approved)),
        Some("rejected") => Ok(Some(RequestStatus::Rejected)),
        Some(other) => Err(AppError::BadRequest(format!("unknown status {other}"))),
    }
}

pub async fn create_request(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCourseRequest,
) -> AppResult<ApiResponse<CourseRequest>> {
    let subject = payload.subject.trim().to_string();
    if subject.is_empty() {
        return Err(AppError::BadRequest("subject is required".into()));
    }
    if subject.chars().count() > MAX_SUBJECT_LEN {
        return Err(AppError::BadRequest(format!(
            "subject is longer than {MAX_SUBJECT_LEN} characters"
        )));
    }

    let duplicate = CourseRequests::find()
        .filter(Column::UserId.eq(user.user_id))
        .filter(Column::Subject.eq(subject.as_str()))
        .filter(Column::Status.eq(RequestStatus::Pending.as_str()))
        .one(&state.orm)
        .await?;
    if duplicate.is_some() {
        return Err(AppError::Conflict("A pending request already exists".into()));
    }

    let request = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        subject: Set(subject),
        message: Set(payload.message.filter(|m| !m.trim().is_empty())),
        status: Set(RequestStatus::Pending.as_str().to_string()),
        created_at: NotSet,
        resolved_at: Set(None),
    }
    .insert(&state.orm)
    .await?;

    Ok(ApiResponse::success(
        "Request sent",
        CourseRequest::from(request),
        Some(Meta::empty()),
    ))
}

pub async fn list_my_requests(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CourseRequestList>> {
    let items = CourseRequests::find()
        .filter(Column::UserId.eq(user.user_id))
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(CourseRequest::from)
        .collect();
    Ok(ApiResponse::success(
        "My requests",
        CourseRequestList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_requests(
    state: &AppState,
    user: &AuthUser,
    query: RequestListQuery,
) -> AppResult<ApiResponse<CourseRequestList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(status) = parse_status_filter(query.status.as_deref())? {
        condition = condition.add(Column::Status.eq(status.as_str()));
    }

    let finder = CourseRequests::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(CourseRequest::from)
        .collect();

    Ok(ApiResponse::success(
        "Requests",
        CourseRequestList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Approves or rejects a pending request and tells the requester, in one transaction.
pub async fn resolve_request(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    approve: bool,
) -> AppResult<ApiResponse<CourseRequest>> {
    ensure_admin(user)?;
    let status = if approve {
        RequestStatus::Approved
    } else {
        RequestStatus::Rejected
    };

    let txn = state.orm.begin().await?;
    let request = CourseRequests::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if RequestStatus::parse(&request.status) != RequestStatus::Pending {
        return Err(AppError::Conflict("Request was already resolved".into()));
    }

    let requester = request.user_id;
    let subject = request.subject.clone();
    let mut active: ActiveModel = request.into();
    active.status = Set(status.as_str().to_string());
    active.resolved_at = Set(Some(Utc::now().into()));
    let updated = active.update(&txn).await?;

    let body = format!("Your request \"{subject}\" was {}", status.as_str());
    notify(&txn, requester, "Request resolved", &body).await?;
    txn.commit().await?;

    record(
        state,
        user.user_id,
        "course_request_resolve",
        "course_requests",
        serde_json::json!({ "request_id": id, "status": status.as_str() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Request resolved",
        CourseRequest::from(updated),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_filter_parses_known_values() {
        assert_eq!(parse_status_filter(None).expect("none"), None);
        assert_eq!(parse_status_filter(Some(" ")).expect("blank"), None);
        assert_eq!(
            parse_status_filter(Some("approved")).expect("approved"),
            Some(RequestStatus::Approved)
        );
        assert!(parse_status_filter(Some("done")).is_err());
    }
}
