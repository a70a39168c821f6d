use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{
    AppEnvironment, DatabaseSettings, ObservedEnvironment, Password, ServerSettings, Settings,
};

/// Base name of the optional configuration file (`playground.toml`).
pub const DEFAULT_CONFIG_FILE: &str = "playground";

/// Environment variables recognised by the loader and the setting each one overrides.
pub const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("DB_USER", "database.user"),
    ("DB_PASSWORD", "database.password"),
    ("DB_DATABASE", "database.database"),
    ("DB_POOL_SIZE", "database.pool_size"),
    ("DB_ACQUIRE_TIMEOUT", "database.acquire_timeout"),
    ("DB_STATEMENT_TIMEOUT", "database.statement_timeout"),
    ("DB_IDLE_TIMEOUT", "database.idle_timeout"),
    ("DB_CHARSET", "database.charset"),
    ("PORT", "server.port"),
    ("APP_ENV", "server.environment"),
];

/// Loads the application settings from defaults, `playground.toml` and the process environment.
///
/// This is the primary entry point for this crate. A `.env` file is honoured if present.
/// Resolution happens once; the returned struct is meant to be shared for the lifetime
/// of the process.
pub fn load_settings() -> Result<Settings, ConfigError> {
    dotenvy::dotenv().ok();
    load_settings_from(
        |key| std::env::var(key).ok(),
        Some(Path::new(DEFAULT_CONFIG_FILE)),
    )
}

/// Same as [`load_settings`] but with an injected variable lookup and optional file.
pub fn load_settings_from<F>(lookup: F, file: Option<&Path>) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut builder = config::Config::builder()
        .set_default("database.host", "localhost")?
        .set_default("database.port", 5432_i64)?
        .set_default("database.user", "playground")?
        .set_default("database.password", "playground")?
        .set_default("database.database", "playground")?
        .set_default("database.pool_size", 10_i64)?
        .set_default("database.acquire_timeout", "10s")?
        .set_default("database.statement_timeout", "10s")?
        .set_default("database.idle_timeout", "10m")?
        .set_default("database.charset", "UTF8")?
        .set_default("server.port", 3000_i64)?
        .set_default("server.environment", "development")?;

    if let Some(path) = file {
        builder = builder.add_source(config::File::from(path).required(false));
    }

    for (var, key) in ENV_OVERRIDES {
        if let Some(value) = lookup(var) {
            builder = builder.set_override(*key, value)?;
        }
    }

    let mut settings = builder.build()?.try_deserialize::<Settings>()?;
    settings.validate()?;
    settings.observed = ObservedEnvironment::capture(&lookup);

    tracing::debug!(
        host = %settings.database.host,
        port = settings.database.port,
        database = %settings.database.database,
        environment = %settings.server.environment,
        "Settings resolved."
    );

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn load_with(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        load_settings_from(|key| map.get(key).cloned(), None)
    }

    #[test]
    fn defaults_apply_without_overrides() {
        let settings = load_with(&[]).unwrap();
        assert_eq!(settings.database.host, "localhost");
        assert_eq!(settings.database.port, 5432);
        assert_eq!(settings.database.pool_size, 10);
        assert_eq!(settings.database.acquire_timeout, Duration::from_secs(10));
        assert_eq!(settings.database.charset, "UTF8");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.server.environment, AppEnvironment::Development);
        assert!(settings.database.password.is_configured());
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = load_with(&[
            ("DB_HOST", "db.internal"),
            ("DB_PORT", "6543"),
            ("DB_POOL_SIZE", "3"),
            ("DB_ACQUIRE_TIMEOUT", "250ms"),
            ("APP_ENV", "production"),
            ("PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(settings.database.host, "db.internal");
        assert_eq!(settings.database.port, 6543);
        assert_eq!(settings.database.pool_size, 3);
        assert_eq!(settings.database.acquire_timeout, Duration::from_millis(250));
        assert_eq!(settings.server.port, 8080);
        assert!(settings.server.environment.is_production());
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let err = load_with(&[("DB_POOL_SIZE", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn non_utf8_charset_is_rejected() {
        let err = load_with(&[("DB_CHARSET", "utf8mb4")]).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref msg) if msg.contains("charset")));
        assert!(load_with(&[("DB_CHARSET", "utf-8")]).is_ok());
    }

    #[test]
    fn observed_environment_never_holds_the_password() {
        let settings =
            load_with(&[("DB_HOST", "db.internal"), ("DB_PASSWORD", "hunter2")]).unwrap();
        assert_eq!(
            settings.observed.vars.get("DB_HOST").cloned().flatten().as_deref(),
            Some("db.internal")
        );
        assert!(settings.observed.password_set);
        assert!(!format!("{:?}", settings).contains("hunter2"));
        let json = serde_json::to_string(&settings.observed).unwrap();
        assert!(!json.contains("hunter2"));
    }
}
