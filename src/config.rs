use anyhow::Context;
use serde::Deserialize;

/// Credential and session policy knobs. The reset signing secret and the
/// validity windows are explicit inputs rather than framework defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub reset_secret: String,
    pub reset_token_ttl_minutes: i64,
    pub session_ttl_days: i64,
    /// On password change, revoke every session except the one performing
    /// the change. Reset applies the same switch to all sessions.
    pub revoke_sessions_on_password_change: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
    pub from_name: String,
    pub tls: bool,
    /// When set, every outbound mail is redirected here instead of the real
    /// recipient (non-production environments).
    pub override_recipient: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvatarConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Served when an account has no avatar reference.
    pub default_avatar_url: String,
    pub presign_ttl_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Base URL embedded in password-reset links.
    pub public_base_url: String,
    pub security: SecurityConfig,
    pub smtp: SmtpConfig,
    pub avatars: AvatarConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let public_base_url =
            std::env::var("PUBLIC_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into());

        let security = SecurityConfig {
            reset_secret: std::env::var("RESET_SECRET").context("RESET_SECRET must be set")?,
            reset_token_ttl_minutes: std::env::var("RESET_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            session_ttl_days: std::env::var("SESSION_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
            revoke_sessions_on_password_change: std::env::var(
                "SECURITY_REVOKE_SESSIONS_ON_PASSWORD_CHANGE",
            )
            .map(|v| v != "false")
            .unwrap_or(true),
        };

        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").ok(),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            username: std::env::var("SMTP_USERNAME").ok(),
            password: std::env::var("SMTP_PASSWORD").ok(),
            from_address: std::env::var("SMTP_FROM_ADDRESS")
                .unwrap_or_else(|_| "no-reply@localhost".into()),
            from_name: std::env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Gatehouse".into()),
            tls: std::env::var("SMTP_TLS").map(|v| v != "false").unwrap_or(true),
            override_recipient: std::env::var("SMTP_OVERRIDE_RECIPIENT").ok(),
        };

        let avatars = AvatarConfig {
            endpoint: std::env::var("AVATAR_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:9000".into()),
            bucket: std::env::var("AVATAR_BUCKET").unwrap_or_else(|_| "avatars".into()),
            access_key: std::env::var("AVATAR_ACCESS_KEY").unwrap_or_default(),
            secret_key: std::env::var("AVATAR_SECRET_KEY").unwrap_or_default(),
            region: std::env::var("AVATAR_REGION").unwrap_or_else(|_| "us-east-1".into()),
            default_avatar_url: std::env::var("DEFAULT_AVATAR_URL")
                .unwrap_or_else(|_| format!("{}/static/default.png", public_base_url)),
            presign_ttl_seconds: std::env::var("AVATAR_PRESIGN_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(3600),
        };

        Ok(Self {
            database_url,
            public_base_url,
            security,
            smtp,
            avatars,
        })
    }
}
