//! Route-level authorization for page paths.
//!
//! The role comes from the verified `__session` token, so a forged `role`
//! cookie cannot open `/admin`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    middleware::session::{SESSION_COOKIE, read_cookie},
    models::ROLE_ADMIN,
    services::token_service::TokenKeys,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    Redirect(&'static str),
}

const PUBLIC_PAGES: [&str; 2] = ["/login", "/register"];

pub fn home_for(role: &str) -> &'static str {
    if role == ROLE_ADMIN { "/admin" } else { "/app" }
}

fn under(path: &str, root: &str) -> bool {
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Paths the gate runs on.
pub fn is_gated(path: &str) -> bool {
    path == "/" || PUBLIC_PAGES.contains(&path) || under(path, "/app") || under(path, "/admin")
}

/// `role` is `None` when there is no valid session.
pub fn decide(path: &str, role: Option<&str>) -> GateDecision {
    if path == "/" {
        return GateDecision::Redirect("/login");
    }
    if PUBLIC_PAGES.contains(&path) {
        return match role {
            Some(role) => GateDecision::Redirect(home_for(role)),
            None => GateDecision::Pass,
        };
    }
    let Some(role) = role else {
        return GateDecision::Redirect("/login");
    };
    if under(path, "/admin") && role != ROLE_ADMIN {
        return GateDecision::Redirect("/app");
    }
    GateDecision::Pass
}

pub async fn page_gate(State(keys): State<TokenKeys>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if !is_gated(&path) {
        return next.run(request).await;
    }

    let claims = read_cookie(request.headers(), SESSION_COOKIE)
        .and_then(|token| keys.verify(&token).ok());
    match decide(&path, claims.as_ref().map(|c| c.role.as_str())) {
        GateDecision::Pass => next.run(request).await,
        GateDecision::Redirect(to) => {
            tracing::debug!(path = %path, to = %to, "page gate redirect");
            Redirect::temporary(to).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_goes_to_login() {
        assert_eq!(decide("/", None), GateDecision::Redirect("/login"));
        assert_eq!(decide("/", Some("admin")), GateDecision::Redirect("/login"));
    }

    #[test]
    fn public_pages_bounce_signed_in_users_home() {
        assert_eq!(decide("/login", None), GateDecision::Pass);
        assert_eq!(decide("/register", Some("user")), GateDecision::Redirect("/app"));
        assert_eq!(decide("/login", Some("admin")), GateDecision::Redirect("/admin"));
    }

    #[test]
    fn private_pages_need_a_session() {
        assert_eq!(decide("/app/products", None), GateDecision::Redirect("/login"));
        assert_eq!(decide("/app", Some("user")), GateDecision::Pass);
    }

    #[test]
    fn admin_pages_need_admin_role() {
        assert_eq!(decide("/admin/users", Some("user")), GateDecision::Redirect("/app"));
        assert_eq!(decide("/admin", Some("admin")), GateDecision::Pass);
        assert_eq!(decide("/admin/users", None), GateDecision::Redirect("/login"));
    }

    #[test]
    fn gated_paths() {
        assert!(is_gated("/"));
        assert!(is_gated("/app/x"));
        assert!(is_gated("/admin"));
        assert!(!is_gated("/administrator"));
        assert!(!is_gated("/api/products"));
        assert!(!is_gated("/files/products/a.png"));
    }
}
