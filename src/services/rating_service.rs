use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    dto::social::{CreateRatingRequest, MAX_COMMENT_LEN, RatingList},
    entity::ratings::{ActiveModel, Column, Entity as Ratings},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Rating, RatingSummary},
    response::{ApiResponse, Meta},
    services::{notification_service::notify_best_effort, user_service::find_profile},
    state::AppState,
};

pub async fn list_ratings(state: &AppState, seller_id: Uuid) -> AppResult<ApiResponse<RatingList>> {
    find_profile(state, seller_id).await?;
    let items: Vec<Rating> = Ratings::find()
        .filter(Column::SellerId.eq(seller_id))
        .order_by_desc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Rating::from)
        .collect();
    let scores: Vec<i16> = items.iter().map(|r| r.rating).collect();
    let summary = RatingSummary::from_scores(&scores);
    Ok(ApiResponse::success(
        "Ratings",
        RatingList { summary, items },
        Some(Meta::empty()),
    ))
}

/// One rating per reviewer and seller; the unique index settles races.
pub async fn rate_seller(
    state: &AppState,
    user: &AuthUser,
    seller_id: Uuid,
    payload: CreateRatingRequest,
) -> AppResult<ApiResponse<Rating>> {
    let comment = validate_rating(user.user_id, seller_id, &payload)?;
    find_profile(state, seller_id).await?;
    let reviewer = find_profile(state, user.user_id).await?;

    let existing = Ratings::find()
        .filter(Column::SellerId.eq(seller_id))
        .filter(Column::ReviewerId.eq(user.user_id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("You already rated this seller".into()));
    }

    let rating = ActiveModel {
        id: Set(Uuid::new_v4()),
        seller_id: Set(seller_id),
        reviewer_id: Set(user.user_id),
        reviewer_name: Set(format!("{} {}", reviewer.first_name, reviewer.last_name)),
        rating: Set(payload.rating),
        comment: Set(comment),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::from_unique(e, "You already rated this seller"))?;

    notify_best_effort(
        state,
        seller_id,
        "New rating",
        &format!("You received {} stars", payload.rating),
    )
    .await;

    Ok(ApiResponse::success(
        "Rating saved",
        Rating::from(rating),
        Some(Meta::empty()),
    ))
}

fn validate_rating(
    reviewer_id: Uuid,
    seller_id: Uuid,
    payload: &CreateRatingRequest,
) -> AppResult<Option<String>> {
    if reviewer_id == seller_id {
        return Err(AppError::BadRequest("You cannot rate yourself".into()));
    }
    if !(1..=5).contains(&payload.rating) {
        return Err(AppError::BadRequest("rating must be between 1 and 5".into()));
    }
    let comment = payload
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    if comment
        .as_ref()
        .is_some_and(|c| c.chars().count() > MAX_COMMENT_LEN)
    {
        return Err(AppError::BadRequest(format!(
            "comment is longer than {MAX_COMMENT_LEN} characters"
        )));
    }
    Ok(comment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(rating: i16, comment: Option<&str>) -> CreateRatingRequest {
        CreateRatingRequest {
            rating,
            comment: comment.map(str::to_string),
        }
    }

    #[test]
    fn self_rating_is_rejected() {
        let id = Uuid::new_v4();
        assert!(validate_rating(id, id, &req(5, None)).is_err());
    }

    #[test]
    fn scores_are_one_to_five() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(validate_rating(a, b, &req(0, None)).is_err());
        assert!(validate_rating(a, b, &req(6, None)).is_err());
        assert!(validate_rating(a, b, &req(1, None)).is_ok());
    }

    #[test]
    fn comments_are_trimmed_and_bounded() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(
            validate_rating(a, b, &req(4, Some("  buena  "))).expect("ok"),
            Some("buena".to_string())
        );
        assert_eq!(validate_rating(a, b, &req(4, Some("   "))).expect("ok"), None);
        let long = "x".repeat(MAX_COMMENT_LEN + 1);
        assert!(validate_rating(a, b, &req(4, Some(&long))).is_err());
    }
}
