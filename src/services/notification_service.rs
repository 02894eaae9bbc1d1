use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    dto::social::{NotificationList, NotificationQuery},
    entity::notifications::{ActiveModel, Column, Entity as Notifications},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Notification,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn notify<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    title: &str,
    body: &str,
) -> AppResult<()> {
    ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        title: Set(title.to_string()),
        body: Set(body.to_string()),
        read: Set(false),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// For side notifications whose failure must not undo the main action.
pub async fn notify_best_effort(state: &AppState, user_id: Uuid, title: &str, body: &str) {
    if let Err(err) = notify(&state.orm, user_id, title, body).await {
        tracing::warn!(user_id = %user_id, error = %err, "notification failed");
    }
}

pub async fn list_notifications(
    state: &AppState,
    user: &AuthUser,
    query: NotificationQuery,
) -> AppResult<ApiResponse<NotificationList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(Column::UserId.eq(user.user_id));
    if query.unread_only.unwrap_or(false) {
        condition = condition.add(Column::Read.eq(false));
    }
    let finder = Notifications::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let unread = Notifications::find()
        .filter(Column::UserId.eq(user.user_id))
        .filter(Column::Read.eq(false))
        .count(&state.orm)
        .await?;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Notification::from)
        .collect();

    Ok(ApiResponse::success(
        "Notifications",
        NotificationList { unread, items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn mark_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Notification>> {
    let existing = Notifications::find_by_id(id)
        .filter(Column::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    active.read = Set(true);
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Notification read",
        Notification::from(updated),
        Some(Meta::empty()),
    ))
}

pub async fn mark_all_read(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Notifications::update_many()
        .col_expr(Column::Read, Expr::value(true))
        .filter(Column::UserId.eq(user.user_id))
        .filter(Column::Read.eq(false))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "Notifications read",
        serde_json::json!({ "updated": result.rows_affected }),
        Some(Meta::empty()),
    ))
}
