//! Environment-driven settings.
//!
//! - `MONGODB_URI` or `DATABASE_URL`: MongoDB connection string
//! - `MONGODB_DB`: database name override
//! - `JWT_SECRET`: session token signing secret
//! - `ADMIN_ACCESS_CODE`: shared code gating the admin login
//! - `GA_MEASUREMENT_ID`: analytics measurement id served to the front end
//! - `COOKIE_SECURE`: force the `Secure` cookie flag on or off
//! - `CORS_ORIGINS`: comma-separated list of allowed origins

use std::env;
use std::str::FromStr;

use rocket::figment::Figment;
use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "community-hub-dev-secret-change-me";

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: Option<String>,
    pub mongodb_db: Option<String>,
    pub jwt_secret: String,
    pub admin_access_code: Option<String>,
    pub analytics_id: Option<String>,
    pub secure_cookies: bool,
    pub cors_origins: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let admin_access_code = var("ADMIN_ACCESS_CODE");
        if admin_access_code.is_none() {
            warn!("ADMIN_ACCESS_CODE not set, admin login is unreachable");
        }

        Self {
            mongodb_uri: var("MONGODB_URI").or_else(|| var("DATABASE_URL")),
            mongodb_db: var("MONGODB_DB"),
            jwt_secret,
            admin_access_code,
            analytics_id: var("GA_MEASUREMENT_ID"),
            secure_cookies: parse_or("COOKIE_SECURE", !cfg!(debug_assertions)),
            cors_origins: var("CORS_ORIGINS")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(str::trim)
                        .filter(|origin| !origin.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Settings for tests and local tooling: fixed secret, plain cookies.
    pub fn for_testing() -> Self {
        Self {
            mongodb_uri: Some("mongodb://127.0.0.1:27017/community_test".to_string()),
            mongodb_db: None,
            jwt_secret: "test-secret".to_string(),
            admin_access_code: Some("letmein".to_string()),
            analytics_id: Some("G-TEST".to_string()),
            secure_cookies: false,
            cors_origins: Vec::new(),
        }
    }

    /// Layers the database settings onto Rocket's figment so the pool fairing
    /// finds them under `databases.community`.
    pub fn figment(&self, base: Figment) -> Figment {
        let mut figment = base;
        if let Some(uri) = &self.mongodb_uri {
            figment = figment.merge(("databases.community.url", uri));
        }
        if let Some(name) = &self.mongodb_db {
            figment = figment.merge(("databases.community.database", name));
        }
        figment
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<T: FromStr + std::fmt::Display>(key: &str, default: T) -> T {
    match var(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Invalid {key} value {raw:?}, using default: {default}");
            default
        }),
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}
