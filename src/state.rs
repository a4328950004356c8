use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::auth::{jwt::JwtKeys, repo::PgUserStore, repo::UserStore};
use crate::config::AppConfig;
use crate::mail::{Mailer, SmtpMailer};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub mailer: Arc<dyn Mailer>,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    /// Connects to Postgres, applies migrations and builds the single shared SMTP client.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let config = Arc::new(config);

        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .context("run migrations")?;
        info!("database ready");

        let users = Arc::new(PgUserStore::new(db)) as Arc<dyn UserStore>;
        let mailer = Arc::new(SmtpMailer::new(&config.mail)?) as Arc<dyn Mailer>;

        Ok(Self::from_parts(config, users, mailer))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let jwt = Arc::new(JwtKeys::new(&config.jwt));
        Self {
            config,
            users,
            mailer,
            jwt,
        }
    }
}
