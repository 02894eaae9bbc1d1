use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, EntityTrait, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, extension::postgres::PgExpr},
};
use uuid::Uuid;

use crate::{
    audit::record,
    dto::products::{
        CreateProductRequest, ProductDraft, ProductList, UpdateProductRequest,
        is_allowed_image_type, validate_image_count,
    },
    entity::{
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_owner_or_admin},
    models::{Product, ProductStatus},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
    storage::{delete_best_effort, keys_from_urls, product_image_key},
    upload::UploadedFile,
};

/// True while a product's promotion window is open.
pub const ACTIVE_PREMIUM: &str =
    "(products.is_premium AND (products.premium_until IS NULL OR products.premium_until > now()))";

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let status = query.status.unwrap_or(ProductStatus::Available);
    let mut condition = Condition::all().add(Column::Status.eq(status.as_str()));

    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    let exact = [
        (Column::MainCategory, &query.main_category),
        (Column::Subcategory, &query.subcategory),
        (Column::Brand, &query.brand),
        (Column::Condition, &query.condition),
        (Column::Gender, &query.gender),
    ];
    for (column, value) in exact {
        if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
            condition = condition.add(column.eq(value.clone()));
        }
    }

    if let Some(seller_id) = query.seller_id {
        condition = condition.add(Column::UserId.eq(seller_id));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let total = Products::find()
        .filter(condition.clone())
        .count(&state.orm)
        .await? as i64;

    let mut finder = Products::find()
        .filter(condition)
        .order_by(Expr::cust(ACTIVE_PREMIUM), Order::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = find_product(state, id).await?;
    Ok(ApiResponse::success("Product", Product::from(product), None))
}

pub async fn list_own_products(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Products::find()
        .filter(Column::UserId.eq(user.user_id))
        .order_by_desc(Column::CreatedAt);
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
        "My products",
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    data: Option<&str>,
    images: Vec<UploadedFile>,
) -> AppResult<ApiResponse<Product>> {
    let payload: CreateProductRequest = parse_data(data)?
        .ok_or_else(|| AppError::BadRequest("missing product data".into()))?;
    let draft = ProductDraft::from(payload);
    draft.validate()?;
    validate_image_count(images.len())?;
    check_image_types(&images)?;

    let seller = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if !seller.active || !seller.is_seller_verified {
        return Err(AppError::Forbidden);
    }

    let uploaded = upload_images(state, user.user_id, &images).await?;
    let image_urls: Vec<String> = uploaded
        .iter()
        .map(|key| state.storage.public_url(key))
        .collect();

    let id = Uuid::new_v4();
    let active = ActiveModel {
        id: Set(id),
        user_id: Set(user.user_id),
        name: Set(draft.name),
        description: Set(draft.description),
        price: Set(draft.price),
        offer_price: Set(draft.offer_price),
        main_category: Set(draft.main_category),
        subcategory: Set(draft.subcategory),
        brand: Set(draft.brand),
        condition: Set(draft.condition),
        gender: Set(draft.gender),
        style: Set(draft.style),
        material: Set(draft.material),
        sizes: Set(serde_json::json!(draft.sizes)),
        stock: Set(draft.stock),
        image_urls: Set(serde_json::json!(image_urls)),
        status: Set(ProductStatus::Available.as_str().to_string()),
        is_premium: Set(false),
        premium_until: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let product = match active.insert(&state.orm).await {
        Ok(product) => product,
        Err(err) => {
            delete_best_effort(state.storage.as_ref(), &uploaded).await;
            return Err(err.into());
        }
    };

    adjust_product_count(state, user.user_id, 1).await?;

    record(
        state,
        user.user_id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    data: Option<&str>,
    images: Vec<UploadedFile>,
) -> AppResult<ApiResponse<Product>> {
    let existing = find_product(state, id).await?;
    ensure_owner_or_admin(user, existing.user_id)?;

    let patch: UpdateProductRequest = parse_data(data)?.unwrap_or_default();
    let current = Product::from(existing.clone());
    let draft = ProductDraft::from_product(&current).apply(&patch);
    draft.validate()?;

    let (kept, removed) = split_kept_images(&current.image_urls, patch.keep_image_urls.as_deref());
    validate_image_count(kept.len() + images.len())?;
    check_image_types(&images)?;

    let uploaded = upload_images(state, existing.user_id, &images).await?;
    let mut image_urls = kept;
    image_urls.extend(uploaded.iter().map(|key| state.storage.public_url(key)));

    let mut active: ActiveModel = existing.into();
    active.name = Set(draft.name);
    active.description = Set(draft.description);
    active.price = Set(draft.price);
    active.offer_price = Set(draft.offer_price);
    active.main_category = Set(draft.main_category);
    active.subcategory = Set(draft.subcategory);
    active.brand = Set(draft.brand);
    active.condition = Set(draft.condition);
    active.gender = Set(draft.gender);
    active.style = Set(draft.style);
    active.material = Set(draft.material);
    active.sizes = Set(serde_json::json!(draft.sizes));
    active.stock = Set(draft.stock);
    active.image_urls = Set(serde_json::json!(image_urls));
    active.updated_at = Set(Utc::now().into());

    let product = match active.update(&state.orm).await {
        Ok(product) => product,
        Err(err) => {
            delete_best_effort(state.storage.as_ref(), &uploaded).await;
            return Err(err.into());
        }
    };

    let removed_keys = keys_from_urls(state.storage.as_ref(), &removed);
    delete_best_effort(state.storage.as_ref(), &removed_keys).await;

    record(
        state,
        user.user_id,
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    status: ProductStatus,
) -> AppResult<ApiResponse<Product>> {
    let existing = find_product(state, id).await?;
    ensure_owner_or_admin(user, existing.user_id)?;

    let mut active: ActiveModel = existing.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Status updated",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

/// Images first (best effort), then the row, then the owner's counter.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = find_product(state, id).await?;
    ensure_owner_or_admin(user, existing.user_id)?;

    let urls = crate::models::string_list(&existing.image_urls);
    let keys = keys_from_urls(state.storage.as_ref(), &urls);
    let failed = delete_best_effort(state.storage.as_ref(), &keys).await;

    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    adjust_product_count(state, existing.user_id, -1).await?;

    record(
        state,
        user.user_id,
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id, "images_failed": failed }),
    )
    .await;

    Ok(ApiResponse::done("Deleted"))
}

pub async fn find_product(state: &AppState, id: Uuid) -> AppResult<ProductModel> {
    Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

/// Atomic in SQL; never drops below zero.
async fn adjust_product_count(state: &AppState, user_id: Uuid, delta: i32) -> AppResult<()> {
    let expr = if delta >= 0 {
        Expr::col(UserCol::ProductCount).add(delta)
    } else {
        Expr::cust(format!("GREATEST(product_count - {}, 0)", -delta))
    };
    Users::update_many()
        .col_expr(UserCol::ProductCount, expr)
        .filter(UserCol::Id.eq(user_id))
        .exec(&state.orm)
        .await?;
    Ok(())
}

fn parse_data<T: serde::de::DeserializeOwned>(data: Option<&str>) -> AppResult<Option<T>> {
    match data.map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| AppError::BadRequest(format!("invalid product data: {e}"))),
        None => Ok(None),
    }
}

fn check_image_types(images: &[UploadedFile]) -> AppResult<()> {
    match images.iter().find(|f| !is_allowed_image_type(&f.content_type)) {
        Some(bad) => Err(AppError::BadRequest(format!(
            "{} is not a jpeg, png or webp image",
            bad.file_name
        ))),
        None => Ok(()),
    }
}

/// Stores every image or none: a failed upload removes the ones already written.
async fn upload_images(
    state: &AppState,
    owner_id: Uuid,
    images: &[UploadedFile],
) -> AppResult<Vec<String>> {
    let base = Utc::now().timestamp_millis();
    let mut keys = Vec::with_capacity(images.len());
    for (i, image) in images.iter().enumerate() {
        let key = product_image_key(owner_id, base + i as i64, &image.file_name);
        if let Err(err) = state.storage.put(&key, &image.bytes).await {
            delete_best_effort(state.storage.as_ref(), &keys).await;
            return Err(err.into());
        }
        keys.push(key);
    }
    Ok(keys)
}

/// `keep = None` keeps everything. URLs not on the product are ignored.
fn split_kept_images(current: &[String], keep: Option<&[String]>) -> (Vec<String>, Vec<String>) {
    match keep {
        None => (current.to_vec(), Vec::new()),
        Some(keep) => current.iter().cloned().partition(|url| keep.contains(url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn keep_list_splits_current_images() {
        let current = urls(&["/files/a", "/files/b", "/files/c"]);
        let keep = urls(&["/files/c", "/files/zzz"]);
        let (kept, removed) = split_kept_images(&current, Some(&keep));
        assert_eq!(kept, urls(&["/files/c"]));
        assert_eq!(removed, urls(&["/files/a", "/files/b"]));

        let (kept, removed) = split_kept_images(&current, None);
        assert_eq!(kept, current);
        assert!(removed.is_empty());
    }

    #[test]
    fn product_data_must_be_json() {
        let parsed: AppResult<Option<UpdateProductRequest>> = parse_data(Some("{not json"));
        assert!(matches!(parsed, Err(AppError::BadRequest(_))));
        let empty: Option<UpdateProductRequest> = parse_data(Some("  ")).expect("empty");
        assert!(empty.is_none());
    }

    #[test]
    fn only_web_images_are_accepted() {
        let pdf = UploadedFile {
            field: "images".into(),
            file_name: "doc.pdf".into(),
            content_type: "application/pdf".into(),
            bytes: axum::body::Bytes::from_static(b"%PDF"),
        };
        assert!(check_image_types(&[pdf]).is_err());
    }
}
