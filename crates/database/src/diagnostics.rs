//! Redacted connection diagnostics and server introspection.
//!
//! [`ConnectionDiagnostics`] is attached to every connection and query error. It is
//! built once, when the pool is created, and never contains the password value.

use crate::executor::QueryExecutor;
use crate::DbError;
use configuration::{ObservedEnvironment, Settings};
use serde::Serialize;
use sqlx::Row;
use std::collections::BTreeMap;
use std::fmt;

/// A non-secret snapshot of the active connection configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionDiagnostics {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub database: String,
    pub password_configured: bool,
    pub pool_size: u32,
    pub environment: String,
    pub observed_environment: ObservedEnvironment,
}

impl ConnectionDiagnostics {
    /// Builds the snapshot from resolved settings.
    pub fn collect(settings: &Settings) -> Self {
        let db = &settings.database;
        Self {
            host: db.host.clone(),
            port: db.port,
            user: db.user.clone(),
            database: db.database.clone(),
            password_configured: db.password.is_configured(),
            pool_size: db.pool_size,
            environment: settings.server.environment.to_string(),
            observed_environment: settings.observed.clone(),
        }
    }

    /// `host:port` of the configured backend.
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ConnectionDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}/{} (password configured: {})",
            self.user, self.host, self.port, self.database, self.password_configured
        )
    }
}

/// Server-side facts gathered after a successful connection test.
///
/// Each entry is fetched independently; an entry that failed holds its error message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatabaseInfo {
    pub items: BTreeMap<&'static str, String>,
    pub failed: Vec<&'static str>,
}

const INFO_QUERIES: [(&str, &str); 5] = [
    ("current_time", "SELECT NOW()::text AS value"),
    ("server_version", "SELECT version() AS value"),
    ("current_database", "SELECT current_database()::text AS value"),
    ("client_encoding", "SELECT current_setting('client_encoding') AS value"),
    ("current_user", "SELECT current_user::text AS value"),
];

/// Runs the cheapest possible round trip to the backend.
pub async fn ping(executor: &QueryExecutor) -> Result<i32, DbError> {
    let rows = executor.execute("SELECT 1::int4 AS connection_test", &[]).await?;
    let row = rows.first().ok_or(DbError::NotFound)?;
    row.try_get::<i32, _>("connection_test").map_err(DbError::Decode)
}

/// Collects server facts, tolerating individual failures.
pub async fn database_info(executor: &QueryExecutor) -> DatabaseInfo {
    let mut info = DatabaseInfo::default();
    for (name, statement) in INFO_QUERIES {
        let value = match executor.execute(statement, &[]).await {
            Ok(rows) => rows
                .first()
                .map(|row| row.try_get::<String, _>("value"))
                .transpose()
                .map_err(DbError::Decode)
                .and_then(|v| v.ok_or(DbError::NotFound)),
            Err(err) => Err(err),
        };
        match value {
            Ok(value) => {
                info.items.insert(name, value);
            }
            Err(err) => {
                tracing::warn!(item = name, error = %err, "Database info query failed.");
                info.items.insert(name, format!("query failed: {err}"));
                info.failed.push(name);
            }
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;
    use configuration::{DatabaseSettings, Password};

    #[test]
    fn snapshot_reports_presence_not_value() {
        let mut db = DatabaseSettings::local("playground");
        db.password = Password::new("s3cret-value");
        let settings = Settings::with_database(db);

        let diagnostics = ConnectionDiagnostics::collect(&settings);

        assert!(diagnostics.password_configured);
        assert_eq!(diagnostics.target(), "localhost:5432");
        let json = serde_json::to_string(&diagnostics).unwrap();
        assert!(!json.contains("s3cret-value"));
        assert!(json.contains("\"password_configured\":true"));
        assert!(!diagnostics.to_string().contains("s3cret-value"));
    }

    #[test]
    fn empty_password_is_reported_as_missing() {
        let mut db = DatabaseSettings::local("playground");
        db.password = Password::new("");
        let diagnostics = ConnectionDiagnostics::collect(&Settings::with_database(db));
        assert!(!diagnostics.password_configured);
    }
}
