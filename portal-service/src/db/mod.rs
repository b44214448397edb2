//! Persistence client: one PostgreSQL pool per process, built by the entry
//! point and shared through `AppState`.

use crate::config::{DatabaseConfig, Environment};
use crate::services::ServiceError;
use secrecy::ExposeSecret;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Build the process-wide pool.
    ///
    /// Production connects eagerly so a bad `DATABASE_URL` stops startup;
    /// development defers the first connection until a query needs one.
    pub async fn connect(config: &DatabaseConfig, environment: &Environment) -> Result<Self, ServiceError> {
        let options = pool_options(config);
        let url = config.url.expose_secret();

        let pool = match environment {
            Environment::Prod => {
                tracing::info!("Connecting to PostgreSQL...");
                let pool = options.connect(url).await?;
                tracing::info!("Successfully connected to PostgreSQL");
                pool
            }
            Environment::Dev => {
                tracing::info!("PostgreSQL pool configured (lazy connection)");
                options.connect_lazy(url)?
            }
        };

        Ok(Self { pool })
    }

    /// Pool that never connects until used.
    pub fn lazy(config: &DatabaseConfig) -> Result<Self, ServiceError> {
        let pool = pool_options(config).connect_lazy(config.url.expose_secret())?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
}
