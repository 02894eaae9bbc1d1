use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Theme, User};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub sex: Option<String>,
    pub residence: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PreferencesRequest {
    pub theme: Theme,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct UserList {
    #[schema(value_type = Vec<User>)]
    pub items: Vec<User>,
}

/// Multipart layout of a verification upload; every part is optional.
#[derive(ToSchema)]
pub struct VerificationUploadForm {
    pub phone: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub photo: Option<Vec<u8>>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub selfie: Option<Vec<u8>>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub id_card: Option<Vec<u8>>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub license: Option<Vec<u8>>,
}
