use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::session::{SESSION_COOKIE, read_cookie},
    models::ROLE_ADMIN,
    services::token_service::TokenKeys,
};

/// Caller identity taken from a verified ID token, sent either as
/// `Authorization: Bearer <token>` or in the `__session` cookie.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

pub fn ensure_role(user: &AuthUser, role: &str) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, ROLE_ADMIN)
}

/// Owner of the resource or an admin.
pub fn ensure_owner_or_admin(user: &AuthUser, owner_id: Uuid) -> Result<(), AppError> {
    if user.user_id == owner_id || user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

fn token_from_parts(parts: &Parts) -> Result<Option<String>, AppError> {
    if let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;
        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?
            .trim();
        return Ok(Some(token.to_string()));
    }
    Ok(read_cookie(&parts.headers, SESSION_COOKIE))
}

fn user_from_token(keys: &TokenKeys, token: &str) -> Result<AuthUser, AppError> {
    let claims = keys.verify(token)?;
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;
    Ok(AuthUser {
        user_id,
        email: claims.email,
        role: claims.role,
    })
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts)?
            .ok_or_else(|| AppError::Unauthorized("Missing credentials".into()))?;
        user_from_token(&TokenKeys::from_ref(state), &token)
    }
}

/// Anonymous callers and bad tokens both come through as `None`.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenKeys: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let keys = TokenKeys::from_ref(state);
        Ok(token_from_parts(parts)
            .ok()
            .flatten()
            .and_then(|token| user_from_token(&keys, &token).ok()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            email: "x@tagwear.pe".into(),
            role: role.into(),
        }
    }

    #[test]
    fn admin_guard() {
        assert!(ensure_admin(&user("admin")).is_ok());
        assert!(matches!(ensure_admin(&user("user")), Err(AppError::Forbidden)));
    }

    #[test]
    fn owner_or_admin_guard() {
        let owner = user("user");
        assert!(ensure_owner_or_admin(&owner, owner.user_id).is_ok());
        assert!(ensure_owner_or_admin(&user("admin"), owner.user_id).is_ok());
        assert!(ensure_owner_or_admin(&user("user"), owner.user_id).is_err());
    }

    #[tokio::test]
    async fn bearer_header_wins_over_cookie() {
        let keys = TokenKeys::from_secret("s");
        let id = Uuid::new_v4();
        let token = keys.issue(id, "a@b.pe", "user").expect("token");
        let request = axum::http::Request::builder()
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::COOKIE, "__session=garbage")
            .body(())
            .expect("request");
        let (mut parts, _) = request.into_parts();
        let user = <AuthUser as FromRequestParts<TokenKeys>>::from_request_parts(&mut parts, &keys)
            .await
            .expect("user");
        assert_eq!(user.user_id, id);
    }

    #[tokio::test]
    async fn session_cookie_authenticates() {
        let keys = TokenKeys::from_secret("s");
        let token = keys.issue(Uuid::new_v4(), "a@b.pe", "admin").expect("token");
        let request = axum::http::Request::builder()
            .header(header::COOKIE, format!("role=admin; __session={token}"))
            .body(())
            .expect("request");
        let (mut parts, _) = request.into_parts();
        let user = <AuthUser as FromRequestParts<TokenKeys>>::from_request_parts(&mut parts, &keys)
            .await
            .expect("user");
        assert!(user.is_admin());
    }

    #[tokio::test]
    async fn missing_credentials_are_unauthorized() {
        let keys = TokenKeys::from_secret("s");
        let (mut parts, _) = axum::http::Request::builder()
            .body(())
            .expect("request")
            .into_parts();
        let err = <AuthUser as FromRequestParts<TokenKeys>>::from_request_parts(&mut parts, &keys)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
