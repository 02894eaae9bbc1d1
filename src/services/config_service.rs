use chrono::Utc;
use sea_orm::{EntityTrait, Set, sea_query::OnConflict};
use serde::{Serialize, de::DeserializeOwned};

use crate::{
    audit::record,
    dto::config::{PaymentConfig, QrConfig},
    entity::site_config::{ActiveModel, Column, Entity as SiteConfig},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const QR_KEY: &str = "qr";
pub const PAYMENT_KEY: &str = "payment";

/// Missing rows read as the default value.
async fn load<T: DeserializeOwned + Default>(state: &AppState, key: &str) -> AppResult<T> {
    let Some(row) = SiteConfig::find_by_id(key.to_string()).one(&state.orm).await? else {
        return Ok(T::default());
    };
    serde_json::from_value(row.value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("site_config {key} is malformed: {e}")))
}

async fn store<T: Serialize>(state: &AppState, key: &str, value: &T) -> AppResult<()> {
    let value = serde_json::to_value(value).map_err(|e| AppError::Internal(e.into()))?;
    let row = ActiveModel {
        key: Set(key.to_string()),
        value: Set(value),
        updated_at: Set(Utc::now().into()),
    };
    SiteConfig::insert(row)
        .on_conflict(
            OnConflict::column(Column::Key)
                .update_columns([Column::Value, Column::UpdatedAt])
                .to_owned(),
        )
        .exec(&state.orm)
        .await?;
    Ok(())
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub async fn get_qr(state: &AppState) -> AppResult<ApiResponse<QrConfig>> {
    let qr: QrConfig = load(state, QR_KEY).await?;
    Ok(ApiResponse::success("QR config", qr, None))
}

pub async fn put_qr(
    state: &AppState,
    user: &AuthUser,
    payload: QrConfig,
) -> AppResult<ApiResponse<QrConfig>> {
    ensure_admin(user)?;
    let qr = QrConfig {
        image_url: clean(payload.image_url),
        description: clean(payload.description),
    };
    store(state, QR_KEY, &qr).await?;
    record(
        state,
        user.user_id,
        "config_update",
        "site_config",
        serde_json::json!({ "key": QR_KEY }),
    )
    .await;
    Ok(ApiResponse::success("QR config saved", qr, Some(Meta::empty())))
}

pub async fn get_payment(state: &AppState) -> AppResult<ApiResponse<PaymentConfig>> {
    let payment: PaymentConfig = load(state, PAYMENT_KEY).await?;
    Ok(ApiResponse::success("Payment config", payment, None))
}

pub async fn put_payment(
    state: &AppState,
    user: &AuthUser,
    payload: PaymentConfig,
) -> AppResult<ApiResponse<PaymentConfig>> {
    ensure_admin(user)?;
    let payment = PaymentConfig {
        qr_image_url: clean(payload.qr_image_url),
        whatsapp_number: clean(payload.whatsapp_number),
        instructions: clean(payload.instructions),
    };
    store(state, PAYMENT_KEY, &payment).await?;
    record(
        state,
        user.user_id,
        "config_update",
        "site_config",
        serde_json::json!({ "key": PAYMENT_KEY }),
    )
    .await;
    Ok(ApiResponse::success(
        "Payment config saved",
        payment,
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_cleared() {
        assert_eq!(clean(Some("  ".into())), None);
        assert_eq!(clean(Some(" +51 999 ".into())).as_deref(), Some("+51 999"));
        assert_eq!(clean(None), None);
    }

    #[test]
    fn stored_json_reads_back_with_missing_fields() {
        let value = serde_json::json!({ "whatsapp_number": "+51999" });
        let payment: PaymentConfig = serde_json::from_value(value).expect("payment");
        assert_eq!(payment.whatsapp_number.as_deref(), Some("+51999"));
        assert_eq!(payment.instructions, None);
    }
}
