use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// QR block shown on the landing page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QrConfig {
    pub image_url: Option<String>,
    pub description: Option<String>,
}

/// Manual payment details shown before a premium request is sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentConfig {
    pub qr_image_url: Option<String>,
    pub whatsapp_number: Option<String>,
    pub instructions: Option<String>,
}
