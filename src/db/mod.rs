//! Database module providing connection management, migrations, and queries.
//!
//! `DbPool` implements the repository ports in `crate::repository`; each
//! submodule covers one aggregate.

mod attachments;
mod catalog;
mod executions;
mod sessions;

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, SqlErr, Statement};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::DatabaseSettings;
use crate::error::{AppError, AppResult};
use crate::migration::Migrator;

/// Shared PostgreSQL connection pool.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Connect using the configured URL and pool bounds.
    pub async fn new(settings: &DatabaseSettings) -> AppResult<Self> {
        let mut options = ConnectOptions::new(settings.url.clone());
        options
            .max_connections(settings.max_connections)
            .min_connections(settings.min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(options)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to database: {}", e)))?;

        Ok(DbPool { conn })
    }

    /// Get the underlying connection for executing queries.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Apply pending migrations.
    pub async fn run_migrations(&self) -> AppResult<()> {
        Migrator::up(&self.conn, None)
            .await
            .map_err(|e| AppError::Database(format!("Failed to run migrations: {}", e)))?;
        info!("Database migrations applied");
        Ok(())
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> AppResult<()> {
        let backend = self.conn.get_database_backend();
        let stmt = Statement::from_string(backend, "SELECT 1".to_string());
        self.conn
            .query_one_raw(stmt)
            .await
            .map_err(|e| AppError::Database(format!("Database health check failed: {}", e)))?;
        Ok(())
    }
}

/// Map a write error, surfacing unique violations as `Conflict`.
pub(crate) fn write_error(action: &str, err: DbErr) -> AppError {
    if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
        return AppError::Conflict(format!("Failed to {}: duplicate record ({})", action, detail));
    }
    AppError::Database(format!("Failed to {}: {}", action, err))
}

/// Map a read error.
pub(crate) fn read_error(action: &str, err: DbErr) -> AppError {
    AppError::Database(format!("Failed to {}: {}", action, err))
}

/// Decode a JSONB column into a typed value.
pub(crate) fn from_json<T: serde::de::DeserializeOwned>(
    column: &str,
    value: serde_json::Value,
) -> AppResult<T> {
    serde_json::from_value(value)
        .map_err(|e| AppError::Database(format!("Corrupt {} column: {}", column, e)))
}

/// Encode a value for a JSONB column.
pub(crate) fn to_json<T: serde::Serialize>(column: &str, value: &T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value)
        .map_err(|e| AppError::Database(format!("Failed to encode {}: {}", column, e)))
}

/// Parse an enumerated text column.
pub(crate) fn parse_column<T>(column: &str, raw: &str, parse: fn(&str) -> Option<T>) -> AppResult<T> {
    parse(raw).ok_or_else(|| AppError::Database(format!("Unknown {} value '{}'", column, raw)))
}
