//! Page paths of the web app. Rendering happens elsewhere; these return the
//! page name and the caller's role once the gate lets a request through.

use axum::{
    Json, Router,
    extract::{FromRef, OriginalUri},
    middleware::from_fn_with_state,
    routing::get,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    middleware::{auth::AuthUser, gate::page_gate},
    services::token_service::TokenKeys,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct PageShell {
    pub page: String,
    pub role: Option<String>,
}

pub fn router<S>(keys: TokenKeys) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    TokenKeys: FromRef<S>,
{
    Router::new()
        .route("/", get(page))
        .route("/login", get(page))
        .route("/register", get(page))
        .route("/app", get(page))
        .route("/app/{*rest}", get(page))
        .route("/admin", get(page))
        .route("/admin/{*rest}", get(page))
        .layer(from_fn_with_state(keys, page_gate))
}

async fn page(OriginalUri(uri): OriginalUri, user: Option<AuthUser>) -> Json<PageShell> {
    Json(PageShell {
        page: uri.path().to_string(),
        role: user.map(|u| u.role),
    })
}
