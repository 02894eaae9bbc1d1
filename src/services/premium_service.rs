use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, LockType},
};
use uuid::Uuid;

use crate::{
    audit::record,
    dto::{
        admin::{PremiumApproval, PremiumRequestList, RequestListQuery},
        products::{PremiumRequestCreate, ProductList, SetPremiumRequest},
    },
    entity::{
        premium_requests::{ActiveModel, Column, Entity as PremiumRequests},
        products::{
            ActiveModel as ProductActive, Column as ProductCol, Entity as Products,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{PremiumRequest, Product, ProductStatus, RequestStatus},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{
        notification_service::notify,
        product_service::{ACTIVE_PREMIUM, find_product},
        request_service::parse_status_filter,
    },
    state::AppState,
};

pub const DEFAULT_PREMIUM_DAYS: i32 = 30;
pub const MAX_PREMIUM_DAYS: i32 = 365;

pub fn premium_days(requested: Option<i32>) -> AppResult<i32> {
    let days = requested.unwrap_or(DEFAULT_PREMIUM_DAYS);
    if !(1..=MAX_PREMIUM_DAYS).contains(&days) {
        return Err(AppError::BadRequest(format!(
            "days must be between 1 and {MAX_PREMIUM_DAYS}"
        )));
    }
    Ok(days)
}

/// An approval running while the product is still promoted extends the current window.
pub fn promotion_end(
    current_until: Option<DateTime<Utc>>,
    days: i32,
    now: DateTime<Utc>,
) -> DateTime<Utc> {
    let start = current_until.filter(|until| *until > now).unwrap_or(now);
    start + Duration::days(i64::from(days))
}

pub async fn request_premium(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: PremiumRequestCreate,
) -> AppResult<ApiResponse<PremiumRequest>> {
    let days = premium_days(payload.days)?;
    let product = find_product(state, product_id).await?;
    if product.user_id != user.user_id {
        return Err(AppError::Forbidden);
    }
    if ProductStatus::parse(&product.status) == ProductStatus::Sold {
        return Err(AppError::BadRequest("sold products cannot be promoted".into()));
    }

    let pending = PremiumRequests::find()
        .filter(Column::ProductId.eq(product_id))
        .filter(Column::Status.eq(RequestStatus::Pending.as_str()))
        .one(&state.orm)
        .await?;
    if pending.is_some() {
        return Err(AppError::Conflict(
            "This product already has a pending premium request".into(),
        ));
    }

    let request = ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        product_id: Set(product_id),
        days: Set(days),
        status: Set(RequestStatus::Pending.as_str().to_string()),
        created_at: NotSet,
        resolved_at: Set(None),
    }
    .insert(&state.orm)
    .await?;

    record(
        state,
        user.user_id,
        "premium_request_create",
        "premium_requests",
        serde_json::json!({ "product_id": product_id, "days": days }),
    )
    .await;

    Ok(ApiResponse::success(
        "Premium request sent",
        PremiumRequest::from(request),
        Some(Meta::empty()),
    ))
}

pub async fn list_requests(
    state: &AppState,
    user: &AuthUser,
    query: RequestListQuery,
) -> AppResult<ApiResponse<PremiumRequestList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();
    if let Some(status) = parse_status_filter(query.status.as_deref())? {
        condition = condition.add(Column::Status.eq(status.as_str()));
    }

    let finder = PremiumRequests::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(PremiumRequest::from)
        .collect();

    Ok(ApiResponse::success(
        "Premium requests",
        PremiumRequestList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Marks the request approved and opens the promotion window in one transaction.
pub async fn approve_request(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<PremiumApproval>> {
    ensure_admin(user)?;
    let now = Utc::now();

    let txn = state.orm.begin().await?;
    let request = PremiumRequests::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if RequestStatus::parse(&request.status) != RequestStatus::Pending {
        return Err(AppError::Conflict("Request was already resolved".into()));
    }

    let product = Products::find_by_id(request.product_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let current_until = product
        .premium_until
        .map(|dt| dt.with_timezone(&Utc))
        .filter(|_| product.is_premium);
    let until = promotion_end(current_until, request.days, now);
    let product_name = product.name.clone();

    let mut product_active: ProductActive = product.into();
    product_active.is_premium = Set(true);
    product_active.premium_until = Set(Some(until.into()));
    product_active.updated_at = Set(now.into());
    let product = product_active.update(&txn).await?;

    let requester = request.user_id;
    let days = request.days;
    let mut active: ActiveModel = request.into();
    active.status = Set(RequestStatus::Approved.as_str().to_string());
    active.resolved_at = Set(Some(now.into()));
    let request = active.update(&txn).await?;

    notify(
        &txn,
        requester,
        "Premium approved",
        &format!("\"{product_name}\" is premium for {days} days"),
    )
    .await?;
    txn.commit().await?;

    record(
        state,
        user.user_id,
        "premium_request_approve",
        "premium_requests",
        serde_json::json!({ "request_id": id, "product_id": product.id, "until": until }),
    )
    .await;

    Ok(ApiResponse::success(
        "Premium approved",
        PremiumApproval {
            request: PremiumRequest::from(request),
            product: Product::from(product),
        },
        Some(Meta::empty()),
    ))
}

pub async fn reject_request(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<PremiumRequest>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let request = PremiumRequests::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    if RequestStatus::parse(&request.status) != RequestStatus::Pending {
        return Err(AppError::Conflict("Request was already resolved".into()));
    }

    let requester = request.user_id;
    let mut active: ActiveModel = request.into();
    active.status = Set(RequestStatus::Rejected.as_str().to_string());
    active.resolved_at = Set(Some(Utc::now().into()));
    let request = active.update(&txn).await?;

    notify(
        &txn,
        requester,
        "Premium rejected",
        "Your premium request was rejected",
    )
    .await?;
    txn.commit().await?;

    record(
        state,
        user.user_id,
        "premium_request_reject",
        "premium_requests",
        serde_json::json!({ "request_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Premium rejected",
        PremiumRequest::from(request),
        Some(Meta::empty()),
    ))
}

/// Admin override of a product's promotion, outside the request flow.
pub async fn set_premium(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: SetPremiumRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let now = Utc::now();
    if payload.is_premium && payload.premium_until.is_some_and(|until| until <= now) {
        return Err(AppError::BadRequest("premium_until must be in the future".into()));
    }

    let existing = find_product(state, product_id).await?;
    let mut active: ProductActive = existing.into();
    active.is_premium = Set(payload.is_premium);
    active.premium_until = Set(if payload.is_premium {
        payload.premium_until.map(Into::into)
    } else {
        None
    });
    active.updated_at = Set(now.into());
    let product = active.update(&state.orm).await?;

    record(
        state,
        user.user_id,
        "product_set_premium",
        "products",
        serde_json::json!({ "product_id": product_id, "is_premium": payload.is_premium }),
    )
    .await;

    Ok(ApiResponse::success(
        "Premium updated",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

/// Products whose promotion window is currently open.
pub async fn list_premium_products(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = pagination.normalize();
    let finder = Products::find()
        .filter(Expr::cust(ACTIVE_PREMIUM))
        .order_by(ProductCol::PremiumUntil, Order::Asc);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok(ApiResponse::success(
        "Premium products",
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}
