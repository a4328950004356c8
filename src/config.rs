use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl MailConfig {
    /// Port 465 speaks TLS from the first byte; everything else upgrades with STARTTLS.
    pub fn implicit_tls(&self) -> bool {
        self.port == 465
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    /// Base URL of the web client; reset links point here.
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub email_domain: String,
    pub reset_ttl_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "lostfound".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "lostfound-users".into()),
            ttl_days: env_parse("JWT_TTL_DAYS").unwrap_or(7),
        };
        let mail = MailConfig {
            host: std::env::var("MAIL_HOST").context("MAIL_HOST is not set")?,
            port: env_parse("MAIL_PORT").unwrap_or(587),
            username: std::env::var("SMTP_USER").context("SMTP_USER is not set")?,
            password: std::env::var("SMTP_PASS").context("SMTP_PASS is not set")?,
        };

        let frontend_url = std::env::var("FRONTEND_URL")
            .unwrap_or_else(|_| "http://localhost:3000".into())
            .trim_end_matches('/')
            .to_string();
        let cors_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .or_else(|_| std::env::var("FRONTEND_URL"))
            .map(|v| parse_origins(&v))
            .unwrap_or_default();

        Ok(Self {
            database_url,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT").or_else(|| env_parse("PORT")).unwrap_or(5000),
            jwt,
            mail,
            frontend_url,
            cors_origins,
            email_domain: std::env::var("ALLOWED_EMAIL_DOMAIN")
                .map(|d| d.trim().to_lowercase())
                .unwrap_or_else(|_| "vitapstudent.ac.in".into()),
            reset_ttl_minutes: env_parse("RESET_TOKEN_TTL_MINUTES").unwrap_or(15),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|o| o.trim().trim_end_matches('/'))
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}
