use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit::record,
    dto::{
        admin::{
            AdminUpdateUserRequest, StatusToggleResponse, SubscriptionEntry, SubscriptionList,
            SubscriptionRequest, SubscriptionStatus, UserListQuery,
        },
        auth::RegisterRequest,
        users::UserList,
    },
    entity::{
        accounts::{ActiveModel as AccountActive, Entity as Accounts},
        users::{ActiveModel, Column, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::User,
    response::{ApiResponse, Meta},
    services::{
        auth_service::{parse_role, register_user},
        notification_service::{notify, notify_best_effort},
        subscription::{is_active_on, status_on, subscription_end},
        user_service::{find_profile, normalize_phone},
    },
    state::AppState,
};

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::FirstName).ilike(pattern.clone()))
                .add(Expr::col(Column::LastName).ilike(pattern.clone()))
                .add(Expr::col(Column::Email).ilike(pattern)),
        );
    }
    if let Some(active) = query.active {
        condition = condition.add(Column::Active.eq(active));
    }

    let finder = Users::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    let profile = find_profile(state, id).await?;
    Ok(ApiResponse::success("User", User::from(profile), Some(Meta::empty())))
}

pub async fn create_user(
    state: &AppState,
    user: &AuthUser,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    let created = register_user(state, payload, true).await?;
    if let Some(profile) = created.data.as_ref() {
        record(
            state,
            user.user_id,
            "admin_user_create",
            "users",
            serde_json::json!({ "user_id": profile.id, "role": profile.role }),
        )
        .await;
    }
    Ok(created)
}

/// Profile fields and the account's role claim change together or not at all.
pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AdminUpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    if payload.first_name.as_deref().is_some_and(|n| n.trim().is_empty())
        || payload.last_name.as_deref().is_some_and(|n| n.trim().is_empty())
    {
        return Err(AppError::BadRequest("names cannot be empty".into()));
    }
    let role = payload
        .role
        .as_deref()
        .map(|r| parse_role(Some(r)))
        .transpose()?;

    let txn = state.orm.begin().await?;
    let existing = Users::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(first_name.trim().to_string());
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(last_name.trim().to_string());
    }
    if let Some(birth_date) = payload.birth_date {
        active.birth_date = Set(Some(birth_date));
    }
    if let Some(sex) = payload.sex {
        active.sex = Set(Some(sex));
    }
    if let Some(residence) = payload.residence {
        active.residence = Set(Some(residence));
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(normalize_phone(&phone));
    }
    if let Some(flag) = payload.active {
        active.active = Set(flag);
    }
    if let Some(verified) = payload.is_seller_verified {
        active.is_seller_verified = Set(verified);
    }
    if let Some(role) = &role {
        active.role = Set(role.clone());
    }
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;

    if let Some(role) = &role {
        let account = Accounts::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(AppError::NotFound)?;
        let mut account: AccountActive = account.into();
        account.role = Set(role.clone());
        account.update(&txn).await?;
    }
    txn.commit().await?;

    record(
        state,
        user.user_id,
        "admin_user_update",
        "users",
        serde_json::json!({ "user_id": id, "role": role }),
    )
    .await;

    Ok(ApiResponse::success("User updated", User::from(updated), Some(Meta::empty())))
}

/// Flips `active`. Deactivated users can no longer sign in.
pub async fn toggle_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<StatusToggleResponse>> {
    ensure_admin(user)?;
    if id == user.user_id {
        return Err(AppError::BadRequest("you cannot deactivate yourself".into()));
    }

    let txn = state.orm.begin().await?;
    let existing = Users::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let next = !existing.active;

    let mut active: ActiveModel = existing.into();
    active.active = Set(next);
    active.updated_at = Set(Utc::now().into());
    active.update(&txn).await?;

    let body = if next {
        "Your account was activated"
    } else {
        "Your account was deactivated"
    };
    notify(&txn, id, "Account status", body).await?;
    txn.commit().await?;

    record(
        state,
        user.user_id,
        "admin_user_toggle_status",
        "users",
        serde_json::json!({ "user_id": id, "active": next }),
    )
    .await;
    tracing::info!(user_id = %id, active = next, "user status toggled");

    Ok(ApiResponse::success(
        "Status updated",
        StatusToggleResponse { id, active: next },
        Some(Meta::empty()),
    ))
}

pub async fn update_subscription(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: SubscriptionRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_admin(user)?;
    let start = payload.subscription_start;
    let end = subscription_end(start, payload.months)?;
    let premium = is_active_on(start, end, Utc::now().date_naive());

    let existing = find_profile(state, id).await?;
    let mut active: ActiveModel = existing.into();
    active.subscription_start = Set(Some(start));
    active.subscription_end = Set(Some(end));
    active.is_premium = Set(premium);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    notify_best_effort(
        state,
        id,
        "Subscription updated",
        &format!("Your subscription runs from {start} to {end}"),
    )
    .await;
    record(
        state,
        user.user_id,
        "admin_subscription_update",
        "users",
        serde_json::json!({ "user_id": id, "start": start, "end": end }),
    )
    .await;

    Ok(ApiResponse::success(
        "Subscription updated",
        User::from(updated),
        Some(Meta::empty()),
    ))
}

/// Every user with a subscription window, soonest expiry first.
pub async fn list_subscriptions(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<SubscriptionList>> {
    ensure_admin(user)?;
    let today = Utc::now().date_naive();
    let rows = Users::find()
        .filter(Column::SubscriptionStart.is_not_null())
        .filter(Column::SubscriptionEnd.is_not_null())
        .order_by_asc(Column::SubscriptionEnd)
        .all(&state.orm)
        .await?;

    let items = rows
        .into_iter()
        .filter_map(|row| {
            let (start, end) = (row.subscription_start?, row.subscription_end?);
            let status = status_on(start, end, today);
            Some(SubscriptionEntry {
                user_id: row.id,
                name: format!("{} {}", row.first_name, row.last_name),
                email: row.email,
                subscription_start: start,
                subscription_end: end,
                is_premium: status == SubscriptionStatus::Active,
                status,
            })
        })
        .collect();

    Ok(ApiResponse::success(
        "Subscriptions",
        SubscriptionList { items },
        Some(Meta::empty()),
    ))
}
