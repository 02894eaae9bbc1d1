use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, Set,
};
use serde_json::json;
use tagwear_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::auth::RegisterRequest,
    entity::{
        accounts::{Column as AccountCol, Entity as Accounts},
        products::{self, Column as ProductCol, Entity as Products},
        users::Entity as Users,
    },
    error::AppError,
    models::{ProductStatus, ROLE_ADMIN, ROLE_USER},
    services::{auth_service::register_user, token_service::TokenKeys},
    state::AppState,
    storage::LocalObjectStore,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let storage = LocalObjectStore::new(&config.storage_root, &config.storage_public_url);
    let keys = TokenKeys::from_secret(&config.jwt_secret);
    let state = AppState {
        orm,
        storage: Arc::new(storage),
        config: Arc::new(config),
        keys,
    };

    let admin_id = ensure_user(&state, "admin@example.com", "admin123", ROLE_ADMIN).await?;
    let seller_id = ensure_user(&state, "seller@example.com", "seller123", ROLE_USER).await?;
    verify_seller(&state, seller_id).await?;
    seed_products(&state, seller_id).await?;

    println!("Seed completed. Admin ID: {admin_id}, Seller ID: {seller_id}");
    Ok(())
}

async fn ensure_user(
    state: &AppState,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let payload = RegisterRequest {
        email: email.to_string(),
        password: password.to_string(),
        first_name: "Seed".to_string(),
        last_name: role.to_string(),
        birth_date: None,
        sex: None,
        residence: None,
        phone: None,
        active: Some(true),
        role: Some(role.to_string()),
    };

    match register_user(state, payload, true).await {
        Ok(_) | Err(AppError::Conflict(_)) => {}
        Err(err) => return Err(anyhow::anyhow!(err.to_string())),
    }

    // If user already exists, fetch id
    let account = Accounts::find()
        .filter(AccountCol::Email.eq(email))
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("account {email} missing after seeding"))?;

    println!("Ensured user {email} (role={role})");
    Ok(account.id)
}

async fn verify_seller(state: &AppState, seller_id: Uuid) -> anyhow::Result<()> {
    let profile = Users::find_by_id(seller_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("seller profile missing"))?;
    if profile.is_seller_verified {
        return Ok(());
    }

    let mut active = profile.into_active_model();
    active.phone = Set(Some("+10000000000".to_string()));
    active.photo_url = Set(Some(format!("/files/verifications/{seller_id}/photo.jpg")));
    active.selfie_url = Set(Some(format!("/files/verifications/{seller_id}/selfie.jpg")));
    active.is_seller_verified = Set(true);
    active.documents_last_updated_at = Set(Some(chrono::Utc::now().into()));
    active.update(&state.orm).await?;

    println!("Verified seller {seller_id}");
    Ok(())
}

async fn seed_products(state: &AppState, seller_id: Uuid) -> anyhow::Result<()> {
    let existing = Products::find()
        .filter(ProductCol::UserId.eq(seller_id))
        .count(&state.orm)
        .await?;
    if existing > 0 {
        println!("Products already seeded");
        return Ok(());
    }

    let products = vec![
        ("Denim Jacket", "Barely worn, classic cut", 45000, "Clothing", "M"),
        ("Leather Boots", "Resoled last winter", 80000, "Footwear", "42"),
        ("Silk Scarf", "Hand rolled edges", 15000, "Accessories", "One size"),
    ];
    let count = products.len() as i32;

    for (name, desc, price, category, size) in products {
        products::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(seller_id),
            name: Set(name.to_string()),
            description: Set(desc.to_string()),
            price: Set(price),
            offer_price: Set(None),
            main_category: Set(category.to_string()),
            subcategory: Set(None),
            brand: Set(None),
            condition: Set(Some("used".to_string())),
            gender: Set(None),
            style: Set(None),
            material: Set(None),
            sizes: Set(json!([size])),
            stock: Set(1),
            image_urls: Set(json!([])),
            status: Set(ProductStatus::Available.as_str().to_string()),
            is_premium: Set(false),
            premium_until: Set(None),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&state.orm)
        .await?;
    }

    if let Some(profile) = Users::find_by_id(seller_id).one(&state.orm).await? {
        let mut active = profile.into_active_model();
        active.product_count = Set(count);
        active.update(&state.orm).await?;
    }

    println!("Seeded products");
    Ok(())
}
