use crate::error::ConfigError;
use crate::ENV_OVERRIDES;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub server: ServerSettings,
    /// Which recognised variables were actually present when settings were resolved.
    #[serde(skip)]
    pub observed: ObservedEnvironment,
}

/// Everything needed to open and size the connection pool.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Password,
    pub database: String,
    /// Upper bound on concurrently open connections.
    pub pool_size: u32,
    /// How long a caller may wait for a free connection before failing.
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Duration,
    /// Server-side limit on a single statement, applied as `statement_timeout`.
    #[serde(with = "humantime_serde")]
    pub statement_timeout: Duration,
    /// Idle connections above the minimum are closed after this long.
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,
    /// Client character set, applied as `client_encoding`.
    pub charset: String,
}

/// Settings for the HTTP surface.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub port: u16,
    pub environment: AppEnvironment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    Development,
    Production,
    Test,
}

impl AppEnvironment {
    /// Raw error strings are only exposed to clients outside production.
    pub fn is_production(&self) -> bool {
        matches!(self, AppEnvironment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Production => "production",
            AppEnvironment::Test => "test",
        }
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A database password. Its value never appears in `Debug` or `Display` output.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_configured(&self) -> bool {
        !self.0.is_empty()
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Snapshot of the recognised environment variables, minus the password value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ObservedEnvironment {
    pub vars: BTreeMap<String, Option<String>>,
    pub password_set: bool,
}

impl ObservedEnvironment {
    pub fn capture<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = ENV_OVERRIDES
            .iter()
            .filter(|(var, _)| *var != "DB_PASSWORD")
            .map(|(var, _)| (var.to_string(), lookup(var)))
            .collect();
        Self {
            vars,
            password_set: lookup("DB_PASSWORD").is_some_and(|p| !p.is_empty()),
        }
    }
}

impl Settings {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let db = &self.database;
        if db.pool_size == 0 {
            return Err(ConfigError::ValidationError(
                "database.pool_size must be at least 1".to_string(),
            ));
        }
        for (field, value) in [
            ("database.host", &db.host),
            ("database.user", &db.user),
            ("database.database", &db.database),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!("{field} must not be empty")));
            }
        }
        if !is_utf8_charset(&db.charset) {
            return Err(ConfigError::ValidationError(format!(
                "database.charset must be UTF8, got '{}'",
                db.charset
            )));
        }
        if db.acquire_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "database.acquire_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl DatabaseSettings {
    /// Settings for a local database, used by tests and examples.
    pub fn local(database: &str) -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "playground".to_string(),
            password: Password::new("playground"),
            database: database.to_string(),
            pool_size: 10,
            acquire_timeout: Duration::from_secs(10),
            statement_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
            charset: "UTF8".to_string(),
        }
    }
}

impl Settings {
    /// Builds settings around the given database section with a development server.
    pub fn with_database(database: DatabaseSettings) -> Self {
        Self {
            database,
            server: ServerSettings {
                port: 3000,
                environment: AppEnvironment::Development,
            },
            observed: ObservedEnvironment::default(),
        }
    }
}

/// The driver only speaks UTF-8, so the session encoding must match.
fn is_utf8_charset(charset: &str) -> bool {
    matches!(
        charset.trim().to_ascii_uppercase().as_str(),
        "UTF8" | "UTF-8" | "UNICODE"
    )
}
