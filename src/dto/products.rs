use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    models::{Product, ProductStatus},
};

/// Applies to both creation and edits.
pub const MAX_PRODUCT_IMAGES: usize = 5;
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// JSON carried in the `data` part of a product create upload.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    pub offer_price: Option<i64>,
    pub main_category: String,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub condition: Option<String>,
    pub gender: Option<String>,
    pub style: Option<String>,
    pub material: Option<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default = "default_stock")]
    pub stock: i32,
}

fn default_stock() -> i32 {
    1
}

/// JSON carried in the `data` part of a product edit upload.
/// `offer_price: null` clears the offer; leaving it out keeps it.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub offer_price: Option<Option<i64>>,
    pub main_category: Option<String>,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub condition: Option<String>,
    pub gender: Option<String>,
    pub style: Option<String>,
    pub material: Option<String>,
    pub sizes: Option<Vec<String>>,
    pub stock: Option<i32>,
    /// Existing image URLs to keep; omitted means keep all.
    pub keep_image_urls: Option<Vec<String>>,
}

fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

/// A product's editable fields after defaults and patches are applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub offer_price: Option<i64>,
    pub main_category: String,
    pub subcategory: Option<String>,
    pub brand: Option<String>,
    pub condition: Option<String>,
    pub gender: Option<String>,
    pub style: Option<String>,
    pub material: Option<String>,
    pub sizes: Vec<String>,
    pub stock: i32,
}

impl From<CreateProductRequest> for ProductDraft {
    fn from(req: CreateProductRequest) -> Self {
        Self {
            name: req.name.trim().to_string(),
            description: req.description.trim().to_string(),
            price: req.price,
            offer_price: req.offer_price,
            main_category: req.main_category.trim().to_string(),
            subcategory: req.subcategory,
            brand: req.brand,
            condition: req.condition,
            gender: req.gender,
            style: req.style,
            material: req.material,
            sizes: clean_sizes(req.sizes),
            stock: req.stock,
        }
    }
}

impl ProductDraft {
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price,
            offer_price: product.offer_price,
            main_category: product.main_category.clone(),
            subcategory: product.subcategory.clone(),
            brand: product.brand.clone(),
            condition: product.condition.clone(),
            gender: product.gender.clone(),
            style: product.style.clone(),
            material: product.material.clone(),
            sizes: product.sizes.clone(),
            stock: product.stock,
        }
    }

    pub fn apply(mut self, patch: &UpdateProductRequest) -> Self {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(description) = &patch.description {
            self.description = description.trim().to_string();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(offer_price) = patch.offer_price {
            self.offer_price = offer_price;
        }
        if let Some(main_category) = &patch.main_category {
            self.main_category = main_category.trim().to_string();
        }
        if patch.subcategory.is_some() {
            self.subcategory = patch.subcategory.clone();
        }
        if patch.brand.is_some() {
            self.brand = patch.brand.clone();
        }
        if patch.condition.is_some() {
            self.condition = patch.condition.clone();
        }
        if patch.gender.is_some() {
            self.gender = patch.gender.clone();
        }
        if patch.style.is_some() {
            self.style = patch.style.clone();
        }
        if patch.material.is_some() {
            self.material = patch.material.clone();
        }
        if let Some(sizes) = &patch.sizes {
            self.sizes = clean_sizes(sizes.clone());
        }
        if let Some(stock) = patch.stock {
            self.stock = stock;
        }
        self
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.name.is_empty() {
            return Err(AppError::BadRequest("name is required".into()));
        }
        if self.main_category.is_empty() {
            return Err(AppError::BadRequest("main_category is required".into()));
        }
        if self.price <= 0 {
            return Err(AppError::BadRequest("price must be greater than 0".into()));
        }
        if let Some(offer) = self.offer_price {
            if offer <= 0 {
                return Err(AppError::BadRequest("offer_price must be greater than 0".into()));
            }
            if offer >= self.price {
                return Err(AppError::BadRequest(
                    "offer_price must be lower than price".into(),
                ));
            }
        }
        if self.stock < 0 {
            return Err(AppError::BadRequest("stock cannot be negative".into()));
        }
        if self.sizes.is_empty() {
            return Err(AppError::BadRequest("at least one size is required".into()));
        }
        Ok(())
    }
}

fn clean_sizes(sizes: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for size in sizes {
        let size = size.trim().to_uppercase();
        if !size.is_empty() && !out.contains(&size) {
            out.push(size);
        }
    }
    out
}

pub fn validate_image_count(count: usize) -> AppResult<()> {
    if count == 0 {
        return Err(AppError::BadRequest("at least one image is required".into()));
    }
    if count > MAX_PRODUCT_IMAGES {
        return Err(AppError::BadRequest(format!(
            "a product can have at most {MAX_PRODUCT_IMAGES} images"
        )));
    }
    Ok(())
}

pub fn is_allowed_image_type(content_type: &str) -> bool {
    matches!(content_type, "image/jpeg" | "image/png" | "image/webp")
}

/// Multipart layout of product create and edit requests.
#[derive(ToSchema)]
pub struct ProductUploadForm {
    /// `CreateProductRequest` (create) or `UpdateProductRequest` (edit) as JSON.
    pub data: String,
    #[schema(value_type = Vec<String>, format = Binary)]
    pub images: Vec<Vec<u8>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductStatusRequest {
    pub status: ProductStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PremiumRequestCreate {
    /// Promotion length in days, 1..=365. Defaults to 30.
    pub days: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetPremiumRequest {
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ProductDraft {
        ProductDraft::from(CreateProductRequest {
            name: " Casaca denim ".into(),
            description: "Poco uso".into(),
            price: 12000,
            offer_price: None,
            main_category: "ropa".into(),
            subcategory: Some("casacas".into()),
            brand: None,
            condition: Some("usado".into()),
            gender: None,
            style: None,
            material: None,
            sizes: vec!["m".into(), " M ".into(), "l".into()],
            stock: 1,
        })
    }

    #[test]
    fn creation_trims_and_dedupes() {
        let d = draft();
        assert_eq!(d.name, "Casaca denim");
        assert_eq!(d.sizes, vec!["M".to_string(), "L".to_string()]);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn offer_price_must_be_below_price() {
        let mut d = draft();
        d.offer_price = Some(12000);
        assert!(matches!(d.validate(), Err(AppError::BadRequest(_))));
        d.offer_price = Some(15000);
        assert!(d.validate().is_err());
        d.offer_price = Some(9000);
        assert!(d.validate().is_ok());
    }

    #[test]
    fn patches_are_validated_on_the_merged_result() {
        let patch = UpdateProductRequest {
            price: Some(5000),
            ..Default::default()
        };
        let mut d = draft();
        d.offer_price = Some(8000);
        let merged = d.apply(&patch);
        assert_eq!(merged.price, 5000);
        assert!(merged.validate().is_err());
    }

    #[test]
    fn null_offer_price_clears_it() {
        let patch: UpdateProductRequest =
            serde_json::from_str(r#"{"offer_price": null}"#).expect("patch");
        assert_eq!(patch.offer_price, Some(None));
        let absent: UpdateProductRequest = serde_json::from_str("{}").expect("patch");
        assert_eq!(absent.offer_price, None);

        let mut d = draft();
        d.offer_price = Some(100);
        assert_eq!(d.apply(&patch).offer_price, None);
    }

    #[test]
    fn image_limits() {
        assert!(validate_image_count(0).is_err());
        assert!(validate_image_count(MAX_PRODUCT_IMAGES).is_ok());
        assert!(validate_image_count(MAX_PRODUCT_IMAGES + 1).is_err());
        assert!(is_allowed_image_type("image/webp"));
        assert!(!is_allowed_image_type("application/pdf"));
    }
}
