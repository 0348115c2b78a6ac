use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;
use tracing::info;

use crate::config::StoreConfig;

const UNIQUE_VIOLATION: &str = "23505";

/// Errors from the store layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violated; carries the constraint name
    #[error("Duplicate value violates {0}")]
    Duplicate(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl From<crate::filter::FilterError> for DatabaseError {
    fn from(err: crate::filter::FilterError) -> Self {
        DatabaseError::QueryError(err.to_string())
    }
}

/// Map a write failure, surfacing unique violations as `Duplicate`
pub fn map_write_error(err: sqlx::Error) -> DatabaseError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let constraint = db_err.constraint().unwrap_or("unique").to_string();
            return DatabaseError::Duplicate(constraint);
        }
    }
    map_read_error(err)
}

/// Pool exhaustion and I/O failures become `ConnectionError`
pub fn map_read_error(err: sqlx::Error) -> DatabaseError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            DatabaseError::ConnectionError(err.to_string())
        }
        other => DatabaseError::Sqlx(other),
    }
}

/// Owns the two connection pools: the restricted role subject to row-level
/// security and the administrative role that bypasses it
#[derive(Clone)]
pub struct DatabaseManager {
    restricted: PgPool,
    admin: PgPool,
}

impl DatabaseManager {
    pub async fn connect(config: &StoreConfig) -> Result<Self, DatabaseError> {
        let restricted_url = config
            .database_url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;
        let admin_url = config
            .admin_database_url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_ADMIN_URL"))?;

        let restricted = Self::build_pool(restricted_url, config).await?;
        let admin = Self::build_pool(admin_url, config).await?;

        info!(
            "Connected database pools (max {} connections each)",
            config.max_connections
        );
        Ok(Self { restricted, admin })
    }

    async fn build_pool(url: &str, config: &StoreConfig) -> Result<PgPool, DatabaseError> {
        Self::validate_url(url)?;
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))
    }

    fn validate_url(url: &str) -> Result<(), DatabaseError> {
        let parsed = url::Url::parse(url).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        match parsed.scheme() {
            "postgres" | "postgresql" => Ok(()),
            _ => Err(DatabaseError::InvalidDatabaseUrl),
        }
    }

    pub fn restricted_pool(&self) -> &PgPool {
        &self.restricted
    }

    pub fn admin_pool(&self) -> &PgPool {
        &self.admin
    }

    /// Pings the administrative pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1")
            .execute(&self.admin)
            .await
            .map_err(map_read_error)?;
        Ok(())
    }

    /// Apply pending migrations through the administrative pool
    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.admin)
            .await
            .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
        info!("Database migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.restricted.close().await;
        self.admin.close().await;
        info!("Closed database pools");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_postgres_urls() {
        assert!(DatabaseManager::validate_url("postgres://app:pw@localhost:5432/dentcare").is_ok());
        assert!(DatabaseManager::validate_url("postgresql://localhost/dentcare?sslmode=disable").is_ok());
        assert!(DatabaseManager::validate_url("mysql://localhost/dentcare").is_err());
        assert!(DatabaseManager::validate_url("not a url").is_err());
    }

    #[test]
    fn pool_errors_are_connection_errors() {
        assert!(matches!(map_read_error(sqlx::Error::PoolTimedOut), DatabaseError::ConnectionError(_)));
        assert!(matches!(map_write_error(sqlx::Error::RowNotFound), DatabaseError::Sqlx(_)));
    }
}
