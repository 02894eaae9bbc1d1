use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set,
};
use uuid::Uuid;

use crate::{
    audit::record,
    dto::auth::{
        LoginRequest, LoginResponse, MeResponse, RegisterRequest, TokenRequest, TokenResponse,
    },
    entity::{
        accounts::{self, Column as AccountCol, Entity as Accounts},
        users::{self, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::{auth::AuthUser, gate::home_for},
    models::{ROLE_ADMIN, ROLE_USER, Theme, User},
    response::{ApiResponse, Meta},
    services::token_service::TOKEN_TTL_DAYS,
    state::AppState,
};

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub(crate) fn parse_role(role: Option<&str>) -> AppResult<String> {
    match role.unwrap_or(ROLE_USER) {
        ROLE_USER => Ok(ROLE_USER.to_string()),
        ROLE_ADMIN => Ok(ROLE_ADMIN.to_string()),
        other => Err(AppError::BadRequest(format!("unknown role {other}"))),
    }
}

/// Creates the account and its profile. `allow_role` is set for admin-created users;
/// self-registration always gets the `user` role.
pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
    allow_role: bool,
) -> AppResult<ApiResponse<User>> {
    payload.validate()?;
    let role = if allow_role {
        parse_role(payload.role.as_deref())?
    } else {
        ROLE_USER.to_string()
    };
    let email = payload.email.trim().to_lowercase();
    // The configured admin address signs in as admin, so only an admin may create it.
    if !allow_role && state.config.is_admin_email(&email) {
        return Err(AppError::Conflict("Email is already registered".into()));
    }

    let exists = Accounts::find()
        .filter(AccountCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::Conflict("Email is already registered".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let id = Uuid::new_v4();

    let account = accounts::ActiveModel {
        id: Set(id),
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        role: Set(role.clone()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::from_unique(e, "Email is already registered"))?;

    let profile = users::ActiveModel {
        id: Set(id),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        email: Set(email),
        birth_date: Set(payload.birth_date),
        sex: Set(payload.sex),
        residence: Set(payload.residence),
        active: Set(payload.active.unwrap_or(true)),
        role: Set(role),
        is_premium: Set(false),
        subscription_start: Set(None),
        subscription_end: Set(None),
        is_seller_verified: Set(false),
        phone: Set(payload.phone.filter(|p| !p.trim().is_empty())),
        photo_url: Set(None),
        selfie_url: Set(None),
        id_card_url: Set(None),
        license_url: Set(None),
        documents_last_updated_at: Set(None),
        product_count: Set(0),
        theme: Set(Theme::System.as_str().to_string()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await;

    let profile = match profile {
        Ok(profile) => profile,
        Err(err) => {
            // The profile is what makes an account usable, so drop the account too.
            if let Err(cleanup) = account.delete(&state.orm).await {
                tracing::error!(user_id = %id, error = %cleanup, "orphaned account after failed registration");
            }
            return Err(err.into());
        }
    };

    record(
        state,
        id,
        "user_register",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;
    tracing::info!(user_id = %id, "user registered");

    Ok(ApiResponse::success("User created", User::from(profile), None))
}

/// Email/password sign-in; returns a signed ID token.
pub async fn issue_token(
    state: &AppState,
    payload: TokenRequest,
) -> AppResult<ApiResponse<TokenResponse>> {
    let TokenRequest { email, password } = payload;
    let email = email.trim().to_lowercase();
    let account = Accounts::find()
        .filter(AccountCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;

    if !verify_password(&password, &account.password_hash)? {
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    let role = if state.config.is_admin_email(&account.email) {
        ROLE_ADMIN
    } else {
        account.role.as_str()
    };
    let id_token = state.keys.issue(account.id, &account.email, role)?;

    Ok(ApiResponse::success(
        "Token issued",
        TokenResponse {
            id_token,
            expires_in: TOKEN_TTL_DAYS * 24 * 60 * 60,
        },
        Some(Meta::empty()),
    ))
}

/// Verifies an ID token and checks the account may sign in. The caller sets the
/// session cookies only when this succeeds.
pub async fn login(
    state: &AppState,
    payload: &LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let claims = state.keys.verify(payload.id_token.trim())?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

    let role = if state.config.is_admin_email(&claims.email) {
        ROLE_ADMIN.to_string()
    } else {
        let profile = Users::find_by_id(user_id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        if !profile.active {
            tracing::info!(user_id = %user_id, "login refused for inactive account");
            return Err(AppError::Forbidden);
        }
        claims.role.clone()
    };

    record(
        state,
        user_id,
        "user_login",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    let resp = LoginResponse {
        user_id: user_id.to_string(),
        redirect_to: home_for(&role).to_string(),
        role,
    };
    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<MeResponse>> {
    let profile = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .map(User::from);
    Ok(ApiResponse::success(
        "Current user",
        MeResponse {
            user_id: user.user_id.to_string(),
            email: user.email.clone(),
            role: user.role.clone(),
            profile,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hashes_verify() {
        let hash = hash_password("secret1").expect("hash");
        assert!(verify_password("secret1", &hash).expect("verify"));
        assert!(!verify_password("secret2", &hash).expect("verify"));
    }

    #[test]
    fn only_known_roles_are_accepted() {
        assert_eq!(parse_role(None).expect("role"), ROLE_USER);
        assert_eq!(parse_role(Some("admin")).expect("role"), ROLE_ADMIN);
        assert!(parse_role(Some("root")).is_err());
    }
}
