//! User deletion as a resumable sequence of steps.
//!
//! The `user_deletions` row holds the last completed stage and the object keys
//! collected before the product rows disappear. Re-issuing a failed deletion
//! picks up at the recorded stage.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    audit::record,
    dto::admin::DeletionReport,
    entity::{
        Accounts, CourseRequests, Notifications, PremiumRequests, Products, Ratings,
        UserDeletions, Users, course_requests, notifications, premium_requests, products,
        ratings,
        user_deletions::{self, ActiveModel, Model as DeletionModel},
        users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::string_list,
    response::{ApiResponse, Meta},
    state::AppState,
    storage::{delete_best_effort, keys_from_urls, verification_prefix},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DeletionStage {
    Pending,
    ProductsDeleted,
    ImagesDeleted,
    AuthDeleted,
    ProfileDeleted,
}

impl DeletionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeletionStage::Pending => "pending",
            DeletionStage::ProductsDeleted => "products_deleted",
            DeletionStage::ImagesDeleted => "images_deleted",
            DeletionStage::AuthDeleted => "auth_deleted",
            DeletionStage::ProfileDeleted => "profile_deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(DeletionStage::Pending),
            "products_deleted" => Some(DeletionStage::ProductsDeleted),
            "images_deleted" => Some(DeletionStage::ImagesDeleted),
            "auth_deleted" => Some(DeletionStage::AuthDeleted),
            "profile_deleted" => Some(DeletionStage::ProfileDeleted),
            _ => None,
        }
    }

    /// Stage reached once the step that starts at `self` succeeds.
    pub fn next(&self) -> Option<Self> {
        match self {
            DeletionStage::Pending => Some(DeletionStage::ProductsDeleted),
            DeletionStage::ProductsDeleted => Some(DeletionStage::ImagesDeleted),
            DeletionStage::ImagesDeleted => Some(DeletionStage::AuthDeleted),
            DeletionStage::AuthDeleted => Some(DeletionStage::ProfileDeleted),
            DeletionStage::ProfileDeleted => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        *self == DeletionStage::ProfileDeleted
    }
}

#[derive(Debug, Default)]
struct StepOutcome {
    products_deleted: u64,
    objects_failed: usize,
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<DeletionReport>> {
    ensure_admin(user)?;
    if id == user.user_id {
        return Err(AppError::BadRequest("you cannot delete yourself".into()));
    }

    let mut job = load_or_start(state, id).await?;
    let mut stage = DeletionStage::parse(&job.stage).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("unknown deletion stage {}", job.stage))
    })?;
    if stage.is_finished() {
        return Err(AppError::NotFound);
    }

    let mut outcome = StepOutcome::default();
    while let Some(next) = stage.next() {
        let step = run_step(state, &mut job, stage, &mut outcome).await;
        if let Err(err) = step {
            tracing::error!(user_id = %id, stage = stage.as_str(), error = %err, "user deletion step failed");
            save_failure(state, &job, &err).await;
            return Err(err);
        }
        job = save_stage(state, job, next).await?;
        tracing::debug!(user_id = %id, stage = next.as_str(), "user deletion advanced");
        stage = next;
    }

    record(
        state,
        user.user_id,
        "admin_user_delete",
        "users",
        serde_json::json!({
            "user_id": id,
            "products_deleted": outcome.products_deleted,
            "objects_failed": outcome.objects_failed,
        }),
    )
    .await;
    tracing::info!(user_id = %id, "user deleted");

    Ok(ApiResponse::success(
        "User deleted",
        DeletionReport {
            user_id: id,
            stage: stage.as_str().to_string(),
            products_deleted: outcome.products_deleted,
            objects_failed: outcome.objects_failed,
        },
        Some(Meta::empty()),
    ))
}

/// Existing checkpoint, or a fresh `pending` one if the user still exists.
async fn load_or_start(state: &AppState, id: Uuid) -> AppResult<DeletionModel> {
    if let Some(job) = UserDeletions::find()
        .filter(user_deletions::Column::UserId.eq(id))
        .one(&state.orm)
        .await?
    {
        return Ok(job);
    }

    let profile = Users::find_by_id(id).one(&state.orm).await?;
    let account = Accounts::find_by_id(id).one(&state.orm).await?;
    if profile.is_none() && account.is_none() {
        return Err(AppError::NotFound);
    }

    ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(id),
        stage: Set(DeletionStage::Pending.as_str().to_string()),
        object_keys: Set(serde_json::json!([])),
        last_error: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::from_unique(e, "A deletion for this user is already running"))
}

async fn run_step(
    state: &AppState,
    job: &mut DeletionModel,
    stage: DeletionStage,
    outcome: &mut StepOutcome,
) -> AppResult<()> {
    let id = job.user_id;
    match stage {
        DeletionStage::Pending => {
            // An inactive seller cannot list, so no new products appear once keys are collected.
            Users::update_many()
                .col_expr(users::Column::Active, Expr::value(false))
                .filter(users::Column::Id.eq(id))
                .exec(&state.orm)
                .await?;

            // Keys go into the checkpoint before the rows that reference them are gone.
            let mut keys = string_list(&job.object_keys);
            merge_keys(&mut keys, collect_object_keys(state, id).await?);
            let mut active: ActiveModel = job.clone().into();
            active.object_keys = Set(serde_json::json!(keys));
            active.updated_at = Set(Utc::now().into());
            *job = active.update(&state.orm).await?;

            let txn = state.orm.begin().await?;
            PremiumRequests::delete_many()
                .filter(premium_requests::Column::UserId.eq(id))
                .exec(&txn)
                .await?;
            let deleted = Products::delete_many()
                .filter(products::Column::UserId.eq(id))
                .exec(&txn)
                .await?;
            txn.commit().await?;
            outcome.products_deleted = deleted.rows_affected;
        }
        DeletionStage::ProductsDeleted => {
            let keys = string_list(&job.object_keys);
            outcome.objects_failed = delete_best_effort(state.storage.as_ref(), &keys).await;
        }
        DeletionStage::ImagesDeleted => {
            Accounts::delete_by_id(id).exec(&state.orm).await?;
        }
        DeletionStage::AuthDeleted => {
            let txn = state.orm.begin().await?;
            Notifications::delete_many()
                .filter(notifications::Column::UserId.eq(id))
                .exec(&txn)
                .await?;
            CourseRequests::delete_many()
                .filter(course_requests::Column::UserId.eq(id))
                .exec(&txn)
                .await?;
            Ratings::delete_many()
                .filter(ratings::Column::SellerId.eq(id))
                .exec(&txn)
                .await?;
            Users::delete_by_id(id).exec(&txn).await?;
            txn.commit().await?;
        }
        DeletionStage::ProfileDeleted => {}
    }
    Ok(())
}

/// Product images plus everything under the user's verification prefix and the
/// document URLs on the profile.
async fn collect_object_keys(state: &AppState, id: Uuid) -> AppResult<Vec<String>> {
    let store = state.storage.as_ref();
    let mut keys = Vec::new();

    let owned = Products::find()
        .filter(products::Column::UserId.eq(id))
        .all(&state.orm)
        .await?;
    for product in &owned {
        let urls = string_list(&product.image_urls);
        merge_keys(&mut keys, keys_from_urls(store, &urls));
    }

    if let Some(profile) = Users::find_by_id(id).one(&state.orm).await? {
        let urls: Vec<String> = [
            profile.photo_url,
            profile.selfie_url,
            profile.id_card_url,
            profile.license_url,
        ]
        .into_iter()
        .flatten()
        .collect();
        merge_keys(&mut keys, keys_from_urls(store, &urls));
    }

    merge_keys(&mut keys, store.list(&verification_prefix(id)).await?);
    Ok(keys)
}

fn merge_keys(into: &mut Vec<String>, keys: Vec<String>) {
    for key in keys {
        if !into.contains(&key) {
            into.push(key);
        }
    }
}

async fn save_stage(
    state: &AppState,
    job: DeletionModel,
    stage: DeletionStage,
) -> AppResult<DeletionModel> {
    let mut active: ActiveModel = job.into();
    active.stage = Set(stage.as_str().to_string());
    active.last_error = Set(None);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(&state.orm).await?)
}

async fn save_failure(state: &AppState, job: &DeletionModel, err: &AppError) {
    let mut active: ActiveModel = job.clone().into();
    let detail = match err {
        AppError::OrmError(inner) => inner.to_string(),
        AppError::Storage(inner) => inner.to_string(),
        AppError::Internal(inner) => format!("{inner:#}"),
        other => other.to_string(),
    };
    active.last_error = Set(Some(detail));
    active.updated_at = Set(Utc::now().into());
    if let Err(save_err) = active.update(&state.orm).await {
        tracing::warn!(user_id = %job.user_id, error = %save_err, "could not record deletion failure");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_order() {
        let mut stage = DeletionStage::Pending;
        let mut seen = vec![stage.as_str()];
        while let Some(next) = stage.next() {
            assert!(next > stage);
            stage = next;
            seen.push(stage.as_str());
        }
        assert_eq!(
            seen,
            vec![
                "pending",
                "products_deleted",
                "images_deleted",
                "auth_deleted",
                "profile_deleted"
            ]
        );
        assert!(stage.is_finished());
    }

    #[test]
    fn stage_names_parse_back() {
        for stage in [
            DeletionStage::Pending,
            DeletionStage::ProductsDeleted,
            DeletionStage::ImagesDeleted,
            DeletionStage::AuthDeleted,
            DeletionStage::ProfileDeleted,
        ] {
            assert_eq!(DeletionStage::parse(stage.as_str()), Some(stage));
        }
        assert_eq!(DeletionStage::parse("done"), None);
    }

    #[test]
    fn merged_keys_stay_unique() {
        let mut keys = vec!["a".to_string()];
        merge_keys(&mut keys, vec!["b".into(), "a".into(), "b".into()]);
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
