use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use sqlx::postgres::PgPoolOptions;

use crate::auth::{
    jwt::JwtKeys,
    memory::MemoryCredentialStore,
    repo::{CredentialStore, PgCredentialStore},
    services::AuthService,
};
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthService,
}

impl AppState {
    /// Connects the configured store and runs pending migrations.
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn CredentialStore> = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(config.database_max_connections)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                Arc::new(PgCredentialStore::new(db))
            }
            None => {
                tracing::warn!("DATABASE_URL not set; using in-memory credential store");
                Arc::new(MemoryCredentialStore::new())
            }
        };
        Ok(Self::from_parts(config, store))
    }

    pub fn from_parts(config: AppConfig, store: Arc<dyn CredentialStore>) -> Self {
        let keys = JwtKeys::new(&config.jwt);
        Self {
            auth: AuthService::new(store, keys),
            config: Arc::new(config),
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        let config = AppConfig::from_lookup(|key| match key {
            "JWT_SECRET" => Some("test-secret".into()),
            "JWT_ISSUER" => Some("test-issuer".into()),
            "JWT_AUDIENCE" => Some("test-aud".into()),
            _ => None,
        })
        .expect("test config");
        Self::from_parts(config, Arc::new(MemoryCredentialStore::new()))
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.auth.keys().clone()
    }
}
