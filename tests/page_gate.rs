use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use tagwear_api::{routes::pages, services::token_service::TokenKeys};
use tower::ServiceExt;
use uuid::Uuid;

fn keys() -> TokenKeys {
    TokenKeys::from_secret("page-gate-test-secret")
}

async fn get(keys: &TokenKeys, path: &str, cookie: Option<String>) -> (StatusCode, Option<String>) {
    let app = pages::router::<TokenKeys>(keys.clone()).with_state(keys.clone());
    let mut request = Request::builder().uri(path);
    if let Some(cookie) = cookie {
        request = request.header(header::COOKIE, cookie);
    }
    let response = app
        .oneshot(request.body(Body::empty()).expect("request"))
        .await
        .expect("response");
    let location = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    (response.status(), location)
}

fn session(keys: &TokenKeys, role: &str) -> String {
    let token = keys
        .issue(Uuid::new_v4(), "gate@tagwear.pe", role)
        .expect("token");
    format!("__session={token}; role={role}")
}

#[tokio::test]
async fn root_redirects_to_login() {
    let keys = keys();
    let (status, location) = get(&keys, "/", None).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn app_without_session_redirects_to_login() {
    let keys = keys();
    let (status, location) = get(&keys, "/app/products", None).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn user_on_admin_is_sent_to_app() {
    let keys = keys();
    let (status, location) = get(&keys, "/admin/users", Some(session(&keys, "user"))).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location.as_deref(), Some("/app"));
}

#[tokio::test]
async fn signed_in_admin_on_login_goes_home() {
    let keys = keys();
    let (status, location) = get(&keys, "/login", Some(session(&keys, "admin"))).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location.as_deref(), Some("/admin"));
}

#[tokio::test]
async fn forged_role_cookie_does_not_open_admin() {
    let keys = keys();
    let (status, location) = get(&keys, "/admin", Some("role=admin".to_string())).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location.as_deref(), Some("/login"));

    let user_session = keys
        .issue(Uuid::new_v4(), "gate@tagwear.pe", "user")
        .expect("token");
    let (status, location) = get(
        &keys,
        "/admin",
        Some(format!("__session={user_session}; role=admin")),
    )
    .await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location.as_deref(), Some("/app"));
}

#[tokio::test]
async fn token_signed_with_another_secret_is_ignored() {
    let keys = keys();
    let other = TokenKeys::from_secret("someone-else");
    let (_, location) = get(&keys, "/app", Some(session(&other, "user"))).await;
    assert_eq!(location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn admin_reaches_admin_pages() {
    let keys = keys();
    let (status, location) = get(&keys, "/admin/products", Some(session(&keys, "admin"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(location, None);

    let (status, _) = get(&keys, "/app", Some(session(&keys, "user"))).await;
    assert_eq!(status, StatusCode::OK);
}
