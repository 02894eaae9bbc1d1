use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::User,
};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Deserialize, Debug, Clone, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<String>,
    pub residence: Option<String>,
    pub phone: Option<String>,
    /// Defaults to true.
    pub active: Option<bool>,
    /// Only honoured when an admin creates the user.
    pub role: Option<String>,
}

impl RegisterRequest {
    /// Runs before anything is written.
    pub fn validate(&self) -> AppResult<()> {
        let mut missing = Vec::new();
        if self.email.trim().is_empty() {
            missing.push("email");
        }
        if self.password.is_empty() {
            missing.push("password");
        }
        if self.first_name.trim().is_empty() {
            missing.push("first_name");
        }
        if self.last_name.trim().is_empty() {
            missing.push("last_name");
        }
        if !missing.is_empty() {
            return Err(AppError::BadRequest(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }
        if !looks_like_email(&self.email) {
            return Err(AppError::BadRequest("invalid email".into()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

pub fn looks_like_email(email: &str) -> bool {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        None => false,
    }
}

/// Email/password sign-in that yields an ID token.
#[derive(Deserialize, Debug, ToSchema)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub id_token: String,
    pub expires_in: i64,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub id_token: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user_id: String,
    pub role: String,
    /// Home page for the role.
    pub redirect_to: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user_id: String,
    pub email: String,
    pub role: String,
    pub profile: Option<User>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub iat: usize,
    pub exp: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(password: &str) -> RegisterRequest {
        RegisterRequest {
            email: "ana@tagwear.pe".into(),
            password: password.into(),
            first_name: "Ana".into(),
            last_name: "Quispe".into(),
            birth_date: None,
            sex: None,
            residence: None,
            phone: None,
            active: None,
            role: None,
        }
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(matches!(request("12345").validate(), Err(AppError::BadRequest(_))));
        assert!(request("123456").validate().is_ok());
    }

    #[test]
    fn missing_fields_are_listed() {
        let mut req = request("secret1");
        req.first_name = "  ".into();
        req.last_name = String::new();
        match req.validate() {
            Err(AppError::BadRequest(msg)) => {
                assert!(msg.contains("first_name"));
                assert!(msg.contains("last_name"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(looks_like_email("a@b.pe"));
        assert!(!looks_like_email("ab.pe"));
        assert!(!looks_like_email("@b.pe"));
        assert!(!looks_like_email("a@bpe"));
    }
}
