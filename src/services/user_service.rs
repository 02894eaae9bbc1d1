use chrono::{DateTime, Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QuerySelect, Set};
use uuid::Uuid;

use crate::{
    dto::users::{PreferencesRequest, UpdateProfileRequest},
    entity::{
        ratings::{Column as RatingCol, Entity as Ratings},
        users::{ActiveModel, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{PublicSeller, RatingSummary, User},
    response::{ApiResponse, Meta},
    state::AppState,
    storage::{DocType, delete_best_effort, keys_from_urls, verification_doc_key},
    upload::UploadedFile,
};

/// Verified sellers wait this long between identity document uploads.
pub const DOCUMENT_COOLDOWN_DAYS: i64 = 5;
pub const MAX_DOCUMENT_BYTES: usize = 5 * 1024 * 1024;

pub async fn find_profile(state: &AppState, id: Uuid) -> AppResult<UserModel> {
    Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn get_me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let profile = find_profile(state, user.user_id).await?;
    Ok(ApiResponse::success("Profile", User::from(profile), Some(Meta::empty())))
}

pub async fn update_me(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let existing = find_profile(state, user.user_id).await?;

    if payload.first_name.as_deref().is_some_and(|n| n.trim().is_empty())
        || payload.last_name.as_deref().is_some_and(|n| n.trim().is_empty())
    {
        return Err(AppError::BadRequest("names cannot be empty".into()));
    }

    // Verification is re-evaluated only when the phone changes.
    let phone_change = payload.phone.map(|phone| {
        let phone = normalize_phone(&phone);
        let verified = has_verification_requirements(
            existing.photo_url.as_deref(),
            existing.selfie_url.as_deref(),
            phone.as_deref(),
        );
        (phone, verified)
    });

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
    if let Some((phone, verified)) = phone_change {
        active.phone = Set(phone);
        active.is_seller_verified = Set(verified);
    }
    active.updated_at = Set(Utc::now().into());

    let updated = active.update(&state.orm).await?;
    Ok(ApiResponse::success("Profile updated", User::from(updated), Some(Meta::empty())))
}

pub async fn update_preferences(
    state: &AppState,
    user: &AuthUser,
    payload: PreferencesRequest,
) -> AppResult<ApiResponse<User>> {
    let existing = find_profile(state, user.user_id).await?;
    let mut active: ActiveModel = existing.into();
    active.theme = Set(payload.theme.as_str().to_string());
    let updated = active.update(&state.orm).await?;
    Ok(ApiResponse::success("Preferences saved", User::from(updated), Some(Meta::empty())))
}

pub async fn rating_summary(state: &AppState, seller_id: Uuid) -> AppResult<RatingSummary> {
    let scores: Vec<i16> = Ratings::find()
        .select_only()
        .column(RatingCol::Rating)
        .filter(RatingCol::SellerId.eq(seller_id))
        .into_tuple()
        .all(&state.orm)
        .await?;
    Ok(RatingSummary::from_scores(&scores))
}

pub async fn get_public_profile(state: &AppState, id: Uuid) -> AppResult<ApiResponse<PublicSeller>> {
    let profile = find_profile(state, id).await?;
    if !profile.active {
        return Err(AppError::NotFound);
    }
    let rating = rating_summary(state, id).await?;
    let seller = PublicSeller {
        id: profile.id,
        first_name: profile.first_name,
        last_name: profile.last_name,
        residence: profile.residence,
        photo_url: profile.photo_url,
        is_seller_verified: profile.is_seller_verified,
        product_count: profile.product_count,
        rating,
        created_at: profile.created_at.with_timezone(&Utc),
    };
    Ok(ApiResponse::success("Seller", seller, None))
}

/// Stores the uploaded documents and re-evaluates seller verification.
pub async fn submit_verification(
    state: &AppState,
    user: &AuthUser,
    phone: Option<&str>,
    files: Vec<UploadedFile>,
) -> AppResult<ApiResponse<User>> {
    let existing = find_profile(state, user.user_id).await?;

    let mut docs: Vec<(DocType, UploadedFile)> = Vec::with_capacity(files.len());
    for file in files {
        let doc_type = DocType::from_field(&file.field).ok_or_else(|| {
            AppError::BadRequest(format!("unexpected document field {}", file.field))
        })?;
        if docs.iter().any(|(t, _)| *t == doc_type) {
            return Err(AppError::BadRequest(format!(
                "{} uploaded more than once",
                doc_type.as_str()
            )));
        }
        if !is_allowed_document_type(doc_type, &file.content_type) {
            return Err(AppError::BadRequest(format!(
                "{} has an unsupported content type {}",
                doc_type.as_str(),
                file.content_type
            )));
        }
        docs.push((doc_type, file));
    }

    let new_phone = phone.map(normalize_phone);
    if docs.is_empty() && new_phone.is_none() {
        return Err(AppError::BadRequest("nothing to update".into()));
    }

    let now = Utc::now();
    let touches_identity = docs.iter().any(|(t, _)| t.is_identity_document());
    if touches_identity {
        let last = existing
            .documents_last_updated_at
            .map(|dt| dt.with_timezone(&Utc));
        if let Some(remaining) = cooldown_remaining(existing.is_seller_verified, last, now) {
            let hours = (remaining.num_minutes() + 59) / 60;
            return Err(AppError::Conflict(format!(
                "documents can be changed again in {hours} hours"
            )));
        }
    }

    let mut stored: Vec<String> = Vec::with_capacity(docs.len());
    let mut replaced: Vec<String> = Vec::new();
    let mut photo_url = existing.photo_url.clone();
    let mut selfie_url = existing.selfie_url.clone();
    let mut id_card_url = existing.id_card_url.clone();
    let mut license_url = existing.license_url.clone();

    for (doc_type, file) in &docs {
        let key = verification_doc_key(user.user_id, *doc_type, now.timestamp_millis());
        if let Err(err) = state.storage.put(&key, &file.bytes).await {
            delete_best_effort(state.storage.as_ref(), &stored).await;
            return Err(err.into());
        }
        let url = state.storage.public_url(&key);
        stored.push(key);

        let slot = match doc_type {
            DocType::Photo => &mut photo_url,
            DocType::Selfie => &mut selfie_url,
            DocType::IdCard => &mut id_card_url,
            DocType::License => &mut license_url,
        };
        if let Some(old) = slot.replace(url) {
            replaced.push(old);
        }
    }

    let phone = match new_phone {
        Some(phone) => phone,
        None => existing.phone.clone(),
    };
    let verified = has_verification_requirements(
        photo_url.as_deref(),
        selfie_url.as_deref(),
        phone.as_deref(),
    );

    let mut active: ActiveModel = existing.into();
    active.photo_url = Set(photo_url);
    active.selfie_url = Set(selfie_url);
    active.id_card_url = Set(id_card_url);
    active.license_url = Set(license_url);
    active.phone = Set(phone);
    active.is_seller_verified = Set(verified);
    if touches_identity {
        active.documents_last_updated_at = Set(Some(now.into()));
    }
    active.updated_at = Set(now.into());

    let updated = match active.update(&state.orm).await {
        Ok(updated) => updated,
        Err(err) => {
            delete_best_effort(state.storage.as_ref(), &stored).await;
            return Err(err.into());
        }
    };

    let old_keys = keys_from_urls(state.storage.as_ref(), &replaced);
    delete_best_effort(state.storage.as_ref(), &old_keys).await;

    tracing::info!(
        user_id = %user.user_id,
        documents = docs.len(),
        verified,
        "verification documents updated"
    );

    Ok(ApiResponse::success(
        "Verification updated",
        User::from(updated),
        Some(Meta::empty()),
    ))
}

/// Remaining cooldown for a verified seller, `None` when uploads are allowed.
pub fn cooldown_remaining(
    verified: bool,
    last_update: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<Duration> {
    if !verified {
        return None;
    }
    let ends = last_update? + Duration::days(DOCUMENT_COOLDOWN_DAYS);
    (ends > now).then(|| ends - now)
}

pub fn has_verification_requirements(
    photo_url: Option<&str>,
    selfie_url: Option<&str>,
    phone: Option<&str>,
) -> bool {
    let present = |v: Option<&str>| v.is_some_and(|s| !s.trim().is_empty());
    present(photo_url) && present(selfie_url) && present(phone)
}

fn is_allowed_document_type(doc_type: DocType, content_type: &str) -> bool {
    match content_type {
        "image/jpeg" | "image/png" | "image/webp" => true,
        "application/pdf" => matches!(doc_type, DocType::IdCard | DocType::License),
        _ => false,
    }
}

/// Keeps digits and a leading `+`; an empty result clears the phone.
pub(crate) fn normalize_phone(phone: &str) -> Option<String> {
    let trimmed = phone.trim();
    let mut out = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.chars().enumerate() {
        if c.is_ascii_digit() || (i == 0 && c == '+') {
            out.push(c);
        }
    }
    (out.chars().filter(char::is_ascii_digit).count() > 0).then_some(out)
}
