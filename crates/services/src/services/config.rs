//! Environment-driven runtime configuration.

use std::{env, path::PathBuf};

use tracing::warn;

const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-this-in-production";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub upload_dir: PathBuf,
    pub jwt_secret: String,
    /// Access-token lifetime in minutes.
    pub token_ttl_minutes: i64,
    /// Required email suffix for campus accounts, e.g. `@reva.edu.in`.
    pub allowed_email_domain: String,
}

impl Config {
    pub fn from_env() -> Self {
        let jwt_secret = env::var("SECRET_KEY").unwrap_or_else(|_| {
            warn!("SECRET_KEY not set, using the development default");
            DEFAULT_JWT_SECRET.to_string()
        });

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(8000),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "maintenance_tickets.db".to_string()),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            jwt_secret,
            token_ttl_minutes: env::var("ACCESS_TOKEN_EXPIRE_MINUTES")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(60 * 24),
            allowed_email_domain: env::var("ALLOWED_EMAIL_DOMAIN")
                .unwrap_or_else(|_| "@reva.edu.in".to_string()),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
