//! Session cookies set at login and read by the page gate and the auth extractor.

use axum::http::{HeaderMap, header};
use cookie::{Cookie, SameSite, time::Duration};

use crate::services::token_service::TOKEN_TTL_DAYS;

/// HttpOnly, holds the raw ID token.
pub const SESSION_COOKIE: &str = "__session";
/// Readable by the browser; informational only, never trusted for authorization.
pub const ROLE_COOKIE: &str = "role";

pub fn session_cookies(token: &str, role: &str, secure: bool) -> [Cookie<'static>; 2] {
    let max_age = Duration::days(TOKEN_TTL_DAYS);
    [
        Cookie::build((SESSION_COOKIE, token.to_string()))
            .http_only(true)
            .secure(secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(max_age)
            .build(),
        Cookie::build((ROLE_COOKIE, role.to_string()))
            .http_only(false)
            .secure(secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(max_age)
            .build(),
    ]
}

pub fn clear_session_cookies(secure: bool) -> [Cookie<'static>; 2] {
    [SESSION_COOKIE, ROLE_COOKIE].map(|name| {
        Cookie::build((name, ""))
            .http_only(name == SESSION_COOKIE)
            .secure(secure)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(Duration::ZERO)
            .build()
    })
}

/// `Set-Cookie` header pairs for a response.
pub fn set_cookie_headers(cookies: [Cookie<'static>; 2]) -> [(header::HeaderName, String); 2] {
    cookies.map(|c| (header::SET_COOKIE, c.to_string()))
}

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn login_cookies_carry_seven_day_expiry() {
        let [session, role] = session_cookies("tok", "admin", true);
        assert_eq!(session.name(), SESSION_COOKIE);
        assert_eq!(session.http_only(), Some(true));
        assert_eq!(session.max_age(), Some(Duration::days(7)));
        assert_eq!(session.secure(), Some(true));
        assert_eq!(role.value(), "admin");
        assert_eq!(role.http_only(), Some(false));

        let header = session.to_string();
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Max-Age=604800"));
    }

    #[test]
    fn logout_cookies_expire_immediately() {
        for cookie in clear_session_cookies(false) {
            assert_eq!(cookie.max_age(), Some(Duration::ZERO));
            assert_eq!(cookie.value(), "");
        }
    }

    #[test]
    fn reads_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; __session=abc.def; role=user"),
        );
        assert_eq!(read_cookie(&headers, SESSION_COOKIE).as_deref(), Some("abc.def"));
        assert_eq!(read_cookie(&headers, ROLE_COOKIE).as_deref(), Some("user"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }
}
