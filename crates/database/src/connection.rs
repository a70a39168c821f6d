//! The process-wide connection pool.
//!
//! A [`ConnectionPool`] is constructed once at startup and cloned into every
//! component that talks to the backend; clones share the same underlying pool.
//! Construction performs no I/O: the first connection is opened on first use.

use crate::diagnostics::ConnectionDiagnostics;
use crate::error::DbError;
use configuration::{DatabaseSettings, Settings};
use serde::Serialize;
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres};
use std::sync::Arc;
use std::time::Instant;

/// A bounded pool of PostgreSQL connections plus the redacted snapshot used in errors.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    pool: PgPool,
    diagnostics: Arc<ConnectionDiagnostics>,
}

/// Point-in-time occupancy of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    pub open: u32,
    pub idle: usize,
    pub max: u32,
}

impl ConnectionPool {
    /// Creates the pool without opening any connection.
    pub fn connect_lazy(settings: &Settings) -> Self {
        let db = &settings.database;
        let diagnostics = ConnectionDiagnostics::collect(settings);
        tracing::info!(
            host = %diagnostics.host,
            port = diagnostics.port,
            user = %diagnostics.user,
            database = %diagnostics.database,
            password_configured = diagnostics.password_configured,
            max_connections = db.pool_size,
            "Initializing database connection pool."
        );

        let pool = PgPoolOptions::new()
            .max_connections(db.pool_size)
            .acquire_timeout(db.acquire_timeout)
            .idle_timeout(Some(db.idle_timeout))
            .connect_lazy_with(connect_options(db));

        Self {
            pool,
            diagnostics: Arc::new(diagnostics),
        }
    }

    /// Creates the pool and proves it works by opening one connection.
    pub async fn connect(settings: &Settings) -> Result<Self, DbError> {
        let pool = Self::connect_lazy(settings);
        let conn = pool.acquire().await?;
        pool.release(conn);
        Ok(pool)
    }

    /// Borrows a connection, waiting at most the configured acquire timeout.
    ///
    /// The connection goes back to the pool when it is dropped, so every exit path
    /// of the caller releases it.
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>, DbError> {
        let started = Instant::now();
        match self.pool.acquire().await {
            Ok(conn) => {
                tracing::debug!(
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Connection acquired."
                );
                Ok(conn)
            }
            Err(source) => {
                tracing::error!(
                    error = %source,
                    waited_ms = started.elapsed().as_millis() as u64,
                    diagnostics = %self.diagnostics,
                    "Failed to acquire a database connection."
                );
                Err(self.connection_error(source))
            }
        }
    }

    /// Returns a connection to the pool.
    pub fn release(&self, conn: PoolConnection<Postgres>) {
        drop(conn);
        tracing::debug!("Connection released.");
    }

    pub fn diagnostics(&self) -> &ConnectionDiagnostics {
        &self.diagnostics
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            open: self.pool.size(),
            idle: self.pool.num_idle(),
            max: self.pool.options().get_max_connections(),
        }
    }

    /// The underlying `sqlx` pool.
    pub fn inner(&self) -> &PgPool {
        &self.pool
    }

    pub(crate) fn connection_error(&self, source: sqlx::Error) -> DbError {
        DbError::Connection {
            source,
            diagnostics: Box::new((*self.diagnostics).clone()),
        }
    }
}

/// Translates settings into driver options.
///
/// The character set and the statement timeout are applied as session parameters on
/// every new connection.
pub fn connect_options(db: &DatabaseSettings) -> PgConnectOptions {
    let statement_timeout_ms = db.statement_timeout.as_millis().to_string();
    PgConnectOptions::new()
        .host(&db.host)
        .port(db.port)
        .username(&db.user)
        .password(db.password.expose())
        .database(&db.database)
        .application_name("playground")
        .options([
            ("client_encoding", db.charset.as_str()),
            ("statement_timeout", statement_timeout_ms.as_str()),
        ])
}
