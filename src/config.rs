use std::env;

use anyhow::Context;

use crate::backend::PasswordPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Postgres URL; when unset the service runs on the in-memory backend.
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub min_password_len: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let jwt_ttl_hours = env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .filter(|h| *h > 0)
            .unwrap_or(24);
        let min_password_len = env::var("MIN_PASSWORD_LEN")
            .ok()
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap_or(PasswordPolicy::default().min_len);
        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            jwt_ttl_hours,
            min_password_len,
        })
    }

    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy {
            min_len: self.min_password_len,
        }
    }
}
