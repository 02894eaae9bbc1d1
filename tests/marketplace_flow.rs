use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{Duration, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter, Set,
};
use tagwear_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::{
        admin::{AdminUpdateUserRequest, SubscriptionRequest},
        auth::{LoginRequest, RegisterRequest, TokenRequest},
        products::PremiumRequestCreate,
        social::CreateRatingRequest,
        users::UpdateProfileRequest,
    },
    entity::{
        accounts::{Column as AccountCol, Entity as Accounts},
        products::{Column as ProductCol, Entity as Products},
        user_deletions::{Column as DeletionCol, Entity as UserDeletions},
        users::Entity as Users,
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::RequestStatus,
    services::{
        admin_service, auth_service, deletion_service, premium_service, product_service,
        rating_service, token_service::TokenKeys, user_service,
    },
    state::AppState,
    storage::{LocalObjectStore, ObjectStore, StorageError},
    upload::UploadedFile,
};
use uuid::Uuid;

// Tests in this file share one database; migrations run one at a time.
static MIGRATIONS: Mutex<()> = Mutex::new(());

// Integration flow against a real database: registration rules, sign-in gating,
// admin subscription and status changes, and the full user deletion cascade.
#[tokio::test]
async fn registration_admin_and_deletion_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let Some(database_url) = database_url() else {
        return Ok(());
    };

    let (state, storage_root) = setup_state(&database_url, None).await?;

    // Short password is rejected before anything is written.
    let weak_email = unique_email("weak");
    let err = auth_service::register_user(&state, register(&weak_email, "123"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    let accounts = Accounts::find()
        .filter(AccountCol::Email.eq(weak_email.as_str()))
        .count(&state.orm)
        .await?;
    assert_eq!(accounts, 0);

    // Self-registration never grants admin.
    let seller_email = unique_email("seller");
    let mut payload = register(&seller_email, "secret1");
    payload.role = Some("admin".into());
    let seller = auth_service::register_user(&state, payload, false)
        .await?
        .data
        .expect("seller");
    assert_eq!(seller.role, "user");

    let admin_email = unique_email("admin");
    let mut payload = register(&admin_email, "secret1");
    payload.role = Some("admin".into());
    let admin = auth_service::register_user(&state, payload, true)
        .await?
        .data
        .expect("admin");
    let auth_admin = AuthUser {
        user_id: admin.id,
        email: admin_email.clone(),
        role: "admin".into(),
    };
    let auth_seller = AuthUser {
        user_id: seller.id,
        email: seller_email.clone(),
        role: "user".into(),
    };

    // Subscription end is start plus whole months.
    let sub = admin_service::update_subscription(
        &state,
        &auth_admin,
        seller.id,
        SubscriptionRequest {
            subscription_start: NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
            months: 2,
        },
    )
    .await?
    .data
    .expect("subscription");
    assert_eq!(
        sub.subscription_end,
        Some(NaiveDate::from_ymd_opt(2024, 3, 1).expect("date"))
    );
    assert!(!sub.is_premium);

    // Toggling twice restores the original flag; inactive users cannot log in.
    let first = admin_service::toggle_status(&state, &auth_admin, seller.id)
        .await?
        .data
        .expect("toggle");
    assert!(!first.active);

    let token = auth_service::issue_token(
        &state,
        TokenRequest {
            email: seller_email.clone(),
            password: "secret1".into(),
        },
    )
    .await?
    .data
    .expect("token")
    .id_token;
    let err = auth_service::login(&state, &LoginRequest { id_token: token.clone() })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let second = admin_service::toggle_status(&state, &auth_admin, seller.id)
        .await?
        .data
        .expect("toggle");
    assert!(second.active);
    auth_service::login(&state, &LoginRequest { id_token: token }).await?;

    // An admin cannot deactivate themselves.
    let err = admin_service::toggle_status(&state, &auth_admin, admin.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Unverified sellers cannot list.
    let data = r#"{"name":"Wool Coat","price":12000,"main_category":"Clothing","sizes":["L"]}"#;
    let err = product_service::create_product(&state, &auth_seller, Some(data), vec![image("a.png")])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    mark_verified(&state, seller.id).await?;
    product_service::create_product(&state, &auth_seller, Some(data), vec![image("a.png")])
        .await?;
    product_service::create_product(
        &state,
        &auth_seller,
        Some(data),
        vec![image("b.png"), image("c.png")],
    )
    .await?;
    state
        .storage
        .put(&format!("verification_docs/{}/selfie_1", seller.id), b"selfie")
        .await?;

    let seller_objects = count_objects(&state, seller.id).await?;
    assert_eq!(seller_objects, 4);

    // Deleting the user removes products, objects, the account and the profile.
    let report = deletion_service::delete_user(&state, &auth_admin, seller.id)
        .await?
        .data
        .expect("report");
    assert_eq!(report.products_deleted, 2);
    assert_eq!(report.objects_failed, 0);

    let products = Products::find()
        .filter(ProductCol::UserId.eq(seller.id))
        .count(&state.orm)
        .await?;
    assert_eq!(products, 0);
    assert_eq!(count_objects(&state, seller.id).await?, 0);
    assert!(Users::find_by_id(seller.id).one(&state.orm).await?.is_none());
    assert!(Accounts::find_by_id(seller.id).one(&state.orm).await?.is_none());

    // A finished deletion cannot be replayed.
    let err = deletion_service::delete_user(&state, &auth_admin, seller.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    tokio::fs::remove_dir_all(&storage_root).await.ok();
    Ok(())
}

// The configured admin address only becomes an account through an admin.
#[tokio::test]
async fn admin_email_cannot_self_register() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let reserved = unique_email("owner");
    let (state, storage_root) = setup_state(&database_url, Some(reserved.clone())).await?;

    let err = auth_service::register_user(&state, register(&reserved, "secret1"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let accounts = Accounts::find()
        .filter(AccountCol::Email.eq(reserved.as_str()))
        .count(&state.orm)
        .await?;
    assert_eq!(accounts, 0);

    // Case and padding do not get around the check.
    let shouted = format!("  {}  ", reserved.to_uppercase());
    let err = auth_service::register_user(&state, register(&shouted, "secret1"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let created = auth_service::register_user(&state, register(&reserved, "secret1"), true)
        .await?
        .data
        .expect("admin-created account");
    assert_eq!(created.email, reserved);

    tokio::fs::remove_dir_all(&storage_root).await.ok();
    Ok(())
}

// Profile edits keep an admin-granted verification unless the phone changes.
#[tokio::test]
async fn profile_edit_keeps_granted_verification() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let (state, storage_root) = setup_state(&database_url, None).await?;
    let admin = signup_admin(&state).await?;
    let seller = signup(&state, "granted").await?;

    let granted = admin_service::update_user(
        &state,
        &admin,
        seller.user_id,
        AdminUpdateUserRequest {
            is_seller_verified: Some(true),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("user");
    assert!(granted.is_seller_verified);

    let edited = user_service::update_me(
        &state,
        &seller,
        UpdateProfileRequest {
            residence: Some("Cusco".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("user");
    assert_eq!(edited.residence.as_deref(), Some("Cusco"));
    assert!(edited.is_seller_verified);

    // No photo or selfie on file, so a new phone re-evaluates to unverified.
    let rephoned = user_service::update_me(
        &state,
        &seller,
        UpdateProfileRequest {
            phone: Some("+51 988 777 666".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("user");
    assert!(!rephoned.is_seller_verified);

    tokio::fs::remove_dir_all(&storage_root).await.ok();
    Ok(())
}

// A deletion that fails mid-way records where it stopped, blocks new listings,
// and finishes from the recorded stage on the next call.
#[tokio::test]
async fn deletion_resumes_after_storage_failure() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let (state, storage_root) = setup_state(&database_url, None).await?;
    let admin = signup_admin(&state).await?;
    let seller = signup(&state, "resume").await?;
    mark_verified(&state, seller.user_id).await?;

    let data = r#"{"name":"Denim Jacket","price":8000,"main_category":"Clothing","sizes":["M"]}"#;
    product_service::create_product(&state, &seller, Some(data), vec![image("a.png")]).await?;

    let offline = AppState {
        storage: Arc::new(ListOfflineStore(LocalObjectStore::new(&storage_root, "/files"))),
        ..state.clone()
    };
    let err = deletion_service::delete_user(&offline, &admin, seller.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));

    let job = UserDeletions::find()
        .filter(DeletionCol::UserId.eq(seller.user_id))
        .one(&state.orm)
        .await?
        .expect("deletion job");
    assert_eq!(job.stage, "pending");
    assert!(
        job.last_error
            .as_deref()
            .is_some_and(|e| e.contains("disk offline"))
    );

    let profile = Users::find_by_id(seller.user_id)
        .one(&state.orm)
        .await?
        .expect("profile");
    assert!(!profile.active);
    let err = product_service::create_product(&state, &seller, Some(data), vec![image("b.png")])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let report = deletion_service::delete_user(&state, &admin, seller.user_id)
        .await?
        .data
        .expect("report");
    assert_eq!(report.stage, "profile_deleted");
    assert_eq!(report.products_deleted, 1);

    let job = UserDeletions::find()
        .filter(DeletionCol::UserId.eq(seller.user_id))
        .one(&state.orm)
        .await?
        .expect("deletion job");
    assert_eq!(job.stage, "profile_deleted");
    assert!(job.last_error.is_none());

    let products = Products::find()
        .filter(ProductCol::UserId.eq(seller.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(products, 0);
    assert_eq!(count_objects(&state, seller.user_id).await?, 0);
    assert!(Users::find_by_id(seller.user_id).one(&state.orm).await?.is_none());
    assert!(Accounts::find_by_id(seller.user_id).one(&state.orm).await?.is_none());

    tokio::fs::remove_dir_all(&storage_root).await.ok();
    Ok(())
}

// Deleting one product removes its images and decrements the seller's count.
#[tokio::test]
async fn product_delete_cleans_images_and_count() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let (state, storage_root) = setup_state(&database_url, None).await?;
    let seller = signup(&state, "lister").await?;
    mark_verified(&state, seller.user_id).await?;

    let data = r#"{"name":"Linen Shirt","price":5000,"main_category":"Clothing","sizes":["S"]}"#;
    let doomed = product_service::create_product(
        &state,
        &seller,
        Some(data),
        vec![image("a.png"), image("b.png")],
    )
    .await?
    .data
    .expect("product");
    let kept = product_service::create_product(&state, &seller, Some(data), vec![image("c.png")])
        .await?
        .data
        .expect("product");

    let profile = Users::find_by_id(seller.user_id)
        .one(&state.orm)
        .await?
        .expect("profile");
    assert_eq!(profile.product_count, 2);

    product_service::delete_product(&state, &seller, doomed.id).await?;

    let profile = Users::find_by_id(seller.user_id)
        .one(&state.orm)
        .await?
        .expect("profile");
    assert_eq!(profile.product_count, 1);
    assert!(Products::find_by_id(doomed.id).one(&state.orm).await?.is_none());

    for url in &doomed.image_urls {
        let key = state.storage.key_from_url(url).expect("key");
        assert!(!state.storage.exists(&key).await?);
    }
    for url in &kept.image_urls {
        let key = state.storage.key_from_url(url).expect("key");
        assert!(state.storage.exists(&key).await?);
    }

    let err = product_service::delete_product(&state, &seller, doomed.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    tokio::fs::remove_dir_all(&storage_root).await.ok();
    Ok(())
}

// One pending request per product, and each request resolves once.
#[tokio::test]
async fn premium_requests_resolve_once() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let (state, storage_root) = setup_state(&database_url, None).await?;
    let admin = signup_admin(&state).await?;
    let seller = signup(&state, "promoter").await?;
    let stranger = signup(&state, "stranger").await?;
    mark_verified(&state, seller.user_id).await?;

    let data = r#"{"name":"Silk Scarf","price":3000,"main_category":"Clothing","sizes":["M"]}"#;
    let product = product_service::create_product(&state, &seller, Some(data), vec![image("a.png")])
        .await?
        .data
        .expect("product");

    let err = premium_service::request_premium(
        &state,
        &stranger,
        product.id,
        PremiumRequestCreate { days: Some(10) },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let request = premium_service::request_premium(
        &state,
        &seller,
        product.id,
        PremiumRequestCreate { days: Some(10) },
    )
    .await?
    .data
    .expect("request");
    let err = premium_service::request_premium(
        &state,
        &seller,
        product.id,
        PremiumRequestCreate { days: Some(10) },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let before = Utc::now();
    let approval = premium_service::approve_request(&state, &admin, request.id)
        .await?
        .data
        .expect("approval");
    assert_eq!(approval.request.status, RequestStatus::Approved);
    assert!(approval.product.is_premium);
    let until = approval.product.premium_until.expect("premium_until");
    assert!(until >= before + Duration::days(10));
    assert!(until <= Utc::now() + Duration::days(10));

    let err = premium_service::approve_request(&state, &admin, request.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // With nothing pending the seller may ask again; a rejection is also final.
    let second = premium_service::request_premium(
        &state,
        &seller,
        product.id,
        PremiumRequestCreate { days: None },
    )
    .await?
    .data
    .expect("request");
    let rejected = premium_service::reject_request(&state, &admin, second.id)
        .await?
        .data
        .expect("rejected");
    assert_eq!(rejected.status, RequestStatus::Rejected);
    let err = premium_service::reject_request(&state, &admin, second.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    let err = premium_service::approve_request(&state, &admin, second.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    tokio::fs::remove_dir_all(&storage_root).await.ok();
    Ok(())
}

#[tokio::test]
async fn seller_is_rated_once_per_reviewer() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let (state, storage_root) = setup_state(&database_url, None).await?;
    let seller = signup(&state, "rated").await?;
    let buyer = signup(&state, "buyer").await?;

    let rating = rating_service::rate_seller(
        &state,
        &buyer,
        seller.user_id,
        CreateRatingRequest {
            rating: 5,
            comment: Some("Fast shipping".into()),
        },
    )
    .await?
    .data
    .expect("rating");
    assert_eq!(rating.rating, 5);

    let err = rating_service::rate_seller(
        &state,
        &buyer,
        seller.user_id,
        CreateRatingRequest {
            rating: 1,
            comment: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let err = rating_service::rate_seller(
        &state,
        &seller,
        seller.user_id,
        CreateRatingRequest {
            rating: 5,
            comment: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    tokio::fs::remove_dir_all(&storage_root).await.ok();
    Ok(())
}

// Verified sellers wait out the cooldown before replacing identity documents.
#[tokio::test]
async fn verification_documents_respect_cooldown() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        return Ok(());
    };
    let (state, storage_root) = setup_state(&database_url, None).await?;
    let seller = signup(&state, "docs").await?;

    let verified = user_service::submit_verification(
        &state,
        &seller,
        Some("+51 912 345 678"),
        vec![document("photo"), document("selfie")],
    )
    .await?
    .data
    .expect("user");
    assert!(verified.is_seller_verified);

    let err = user_service::submit_verification(&state, &seller, None, vec![document("id_card")])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // The profile photo is not an identity document.
    let updated = user_service::submit_verification(&state, &seller, None, vec![document("photo")])
        .await?
        .data
        .expect("user");
    assert!(updated.is_seller_verified);

    tokio::fs::remove_dir_all(&storage_root).await.ok();
    Ok(())
}

fn database_url() -> Option<String> {
    match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
        Ok(url) => Some(url),
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            None
        }
    }
}

async fn setup_state(
    database_url: &str,
    admin_email: Option<String>,
) -> anyhow::Result<(AppState, std::path::PathBuf)> {
    let orm = create_orm_conn(database_url).await?;
    {
        let _guard = MIGRATIONS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        run_migrations(&orm).await?;
    }

    let storage_root = std::env::temp_dir().join(format!("tagwear-flow-{}", Uuid::new_v4()));
    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: "flow-test-secret".into(),
        admin_email,
        storage_root: storage_root.to_string_lossy().to_string(),
        storage_public_url: "/files".into(),
        cookie_secure: false,
    };
    let storage = LocalObjectStore::new(&storage_root, "/files");

    Ok((
        AppState {
            orm,
            storage: Arc::new(storage),
            keys: TokenKeys::from_secret(&config.jwt_secret),
            config: Arc::new(config),
        },
        storage_root,
    ))
}

/// Registers a plain user and returns the identity the services see.
async fn signup(state: &AppState, prefix: &str) -> anyhow::Result<AuthUser> {
    let email = unique_email(prefix);
    let user = auth_service::register_user(state, register(&email, "secret1"), false)
        .await?
        .data
        .expect("user");
    Ok(AuthUser {
        user_id: user.id,
        email,
        role: user.role,
    })
}

async fn signup_admin(state: &AppState) -> anyhow::Result<AuthUser> {
    let email = unique_email("admin");
    let mut payload = register(&email, "secret1");
    payload.role = Some("admin".into());
    let admin = auth_service::register_user(state, payload, true)
        .await?
        .data
        .expect("admin");
    Ok(AuthUser {
        user_id: admin.id,
        email,
        role: "admin".into(),
    })
}

/// Lists always fail; everything else goes to the wrapped store.
struct ListOfflineStore(LocalObjectStore);

#[async_trait]
impl ObjectStore for ListOfflineStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        self.0.put(key, bytes).await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.0.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        self.0.exists(key).await
    }

    async fn list(&self, _prefix: &str) -> Result<Vec<String>, StorageError> {
        Err(StorageError::Io(std::io::Error::other("disk offline")))
    }

    fn public_url(&self, key: &str) -> String {
        self.0.public_url(key)
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        self.0.key_from_url(url)
    }
}

fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@tagwear.test", Uuid::new_v4())
}

fn register(email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: password.to_string(),
        first_name: "Test".into(),
        last_name: "User".into(),
        birth_date: None,
        sex: None,
        residence: Some("Lima".into()),
        phone: None,
        active: None,
        role: None,
    }
}

fn image(name: &str) -> UploadedFile {
    UploadedFile {
        field: "images".into(),
        file_name: name.into(),
        content_type: "image/png".into(),
        bytes: Bytes::from_static(b"\x89PNG"),
    }
}

fn document(field: &str) -> UploadedFile {
    UploadedFile {
        field: field.into(),
        file_name: format!("{field}.png"),
        content_type: "image/png".into(),
        bytes: Bytes::from_static(b"\x89PNG"),
    }
}

async fn mark_verified(state: &AppState, user_id: Uuid) -> anyhow::Result<()> {
    let profile = Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .expect("profile");
    let mut active = profile.into_active_model();
    active.is_seller_verified = Set(true);
    active.phone = Set(Some("+51999999999".into()));
    active.update(&state.orm).await?;
    Ok(())
}

async fn count_objects(state: &AppState, user_id: Uuid) -> anyhow::Result<usize> {
    let products = state.storage.list(&format!("products/{user_id}")).await?;
    let docs = state
        .storage
        .list(&format!("verification_docs/{user_id}"))
        .await?;
    Ok(products.len() + docs.len())
}
