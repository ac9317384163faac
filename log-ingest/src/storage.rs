use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::event::LogEvent;

const INSERT_LOG: &str = r#"
INSERT INTO logs
    (tenant_id, level, message, source, timestamp)
VALUES
    ($1, $2, $3, $4, $5)
"#;

/// Enumeration of errors for operations against the log store.
/// Errors can originate from sqlx and are wrapped by us to provide additional context.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("connection failed with: {error}")]
    ConnectionError { error: sqlx::Error },
    #[error("{command} query failed with: {error}")]
    QueryError { command: String, error: sqlx::Error },
    #[error("migration failed with: {error}")]
    MigrationError { error: sqlx::migrate::MigrateError },
}

#[async_trait]
pub trait LogSink {
    async fn insert(
        &self,
        event: &LogEvent,
        received_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;
}

/// The service's reference to its persistence sink.
///
/// `Unavailable` is decided once at startup and means every event is only
/// written to the diagnostic log.
#[derive(Clone)]
pub enum Storage {
    Connected(Arc<dyn LogSink + Send + Sync>),
    Unavailable,
}

impl Storage {
    pub fn connected<S: LogSink + Send + Sync + 'static>(sink: S) -> Self {
        Storage::Connected(Arc::new(sink))
    }

    /// Open the Postgres sink, falling back to `Unavailable` on any failure.
    pub async fn connect(config: &DatabaseConfig) -> Self {
        match PgSink::new(config).await {
            Ok(sink) => {
                info!(
                    host = %config.host,
                    port = config.port,
                    database = %config.name,
                    "connected to postgres"
                );
                Storage::connected(sink)
            }
            Err(err) => {
                warn!(
                    host = %config.host,
                    port = config.port,
                    error = %err,
                    "cannot connect to postgres, running in log-only mode"
                );
                Storage::Unavailable
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, Storage::Connected(_))
    }
}

/// A LogSink writing one row per event into the `logs` table.
#[derive(Clone)]
pub struct PgSink {
    pool: PgPool,
}

impl PgSink {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let options = connect_options(config)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout.0)
            .connect_with(options)
            .await
            .map_err(|error| StorageError::ConnectionError { error })?;

        let sink = Self::new_from_pool(pool);
        if config.run_migrations {
            sink.migrate().await?;
        }

        Ok(sink)
    }

    pub fn new_from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await
            .map_err(|error| StorageError::MigrationError { error })
    }
}

#[async_trait]
impl LogSink for PgSink {
    async fn insert(
        &self,
        event: &LogEvent,
        received_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        sqlx::query(INSERT_LOG)
            .bind(&event.tenant_id)
            .bind(&event.level)
            .bind(&event.message)
            .bind(&event.source)
            .bind(received_at)
            .execute(&self.pool)
            .await
            .map_err(|error| StorageError::QueryError {
                command: "INSERT".to_owned(),
                error,
            })?;

        Ok(())
    }
}

fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions, StorageError> {
    let ssl_mode = config
        .sslmode
        .parse::<PgSslMode>()
        .map_err(|error| StorageError::ConnectionError { error })?;

    Ok(PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.name)
        .username(&config.user)
        .password(&config.password)
        .ssl_mode(ssl_mode))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::TimeZone;
    use envconfig::Envconfig;

    use super::*;

    #[test]
    fn rejects_unknown_sslmode() {
        let env = HashMap::from([("DB_SSLMODE".to_owned(), "sometimes".to_owned())]);
        let config = DatabaseConfig::init_from_hashmap(&env).unwrap();

        assert!(matches!(
            connect_options(&config),
            Err(StorageError::ConnectionError { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_database_yields_unavailable() {
        let env = HashMap::from([
            ("DB_HOST".to_owned(), "127.0.0.1".to_owned()),
            ("DB_PORT".to_owned(), "1".to_owned()),
            ("DB_CONNECT_TIMEOUT_MS".to_owned(), "500".to_owned()),
        ]);
        let config = DatabaseConfig::init_from_hashmap(&env).unwrap();

        let storage = Storage::connect(&config).await;

        assert!(!storage.is_connected());
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires a running postgres reachable through DATABASE_URL"]
    async fn inserts_one_row_with_receipt_time(db: PgPool) {
        let sink = PgSink::new_from_pool(db.clone());
        let received_at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let event = LogEvent {
            tenant_id: "acme".to_owned(),
            level: "ERROR".to_owned(),
            message: "disk full'); DROP TABLE logs; --".to_owned(),
            source: "agent-7".to_owned(),
            timestamp: None,
        };

        sink.insert(&event, received_at).await.unwrap();

        let (tenant_id, message, timestamp): (String, String, DateTime<Utc>) =
            sqlx::query_as("SELECT tenant_id, message, timestamp FROM logs")
                .fetch_one(&db)
                .await
                .unwrap();
        assert_eq!(tenant_id, "acme");
        assert_eq!(message, event.message);
        assert_eq!(timestamp, received_at);
    }
}
