use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    /// Account that always logs in as admin, regardless of its profile `active` flag.
    pub admin_email: Option<String>,
    pub storage_root: String,
    pub storage_public_url: String,
    pub cookie_secure: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let admin_email = env::var("ADMIN_EMAIL")
            .ok()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty());
        let storage_root = env::var("STORAGE_ROOT").unwrap_or_else(|_| "./storage".to_string());
        let storage_public_url =
            env::var("STORAGE_PUBLIC_URL").unwrap_or_else(|_| "/files".to_string());
        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            admin_email,
            storage_root,
            storage_public_url,
            cookie_secure,
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_email
            .as_deref()
            .is_some_and(|admin| admin.eq_ignore_ascii_case(email.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(admin: Option<&str>) -> AppConfig {
        AppConfig {
            database_url: "postgres://localhost/tagwear".into(),
            host: "127.0.0.1".into(),
            port: 3000,
            jwt_secret: "secret".into(),
            admin_email: admin.map(str::to_string),
            storage_root: "./storage".into(),
            storage_public_url: "/files".into(),
            cookie_secure: false,
        }
    }

    #[test]
    fn admin_email_match_ignores_case() {
        let cfg = config(Some("admin@tagwear.pe"));
        assert!(cfg.is_admin_email("Admin@Tagwear.PE"));
        assert!(!cfg.is_admin_email("seller@tagwear.pe"));
    }

    #[test]
    fn no_admin_email_matches_nobody() {
        assert!(!config(None).is_admin_email("admin@tagwear.pe"));
    }
}
