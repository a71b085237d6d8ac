pub mod employee;
pub mod user;

#[cfg(test)]
pub mod memory;

use log::info;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use thiserror::Error;

use crate::config::AppConfig;

pub use employee::{EmployeeStore, PgEmployeeStore, UpdatedEmployee};
pub use user::{PgUserStore, UserStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("storage unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
}

impl From<validator::ValidationErrors> for StoreError {
    fn from(err: validator::ValidationErrors) -> Self {
        StoreError::Validation(crate::utils::validation::describe(&err))
    }
}

/// Unique violations become `Conflict` with the given message; anything else
/// the driver reports is treated as the store being unavailable.
pub(crate) fn map_sqlx_error(err: sqlx::Error, conflict: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StoreError::Conflict(conflict.to_string());
        }
    }
    StoreError::Unavailable(err)
}

pub async fn create_pool(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    info!("Connected to the database");
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    info!("Database migrations applied");
    Ok(())
}
