//! Context configuration.

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::dialect::DialectKind;
use crate::error::OrmResult;
use crate::interceptor::{InterceptorRegistry, TracingInterceptor};

/// Settings of a [`DatabaseContext`](crate::context::DatabaseContext).
///
/// ```ignore
/// let settings = ContextSettings::from_json(r#"{
///     "dialect": "sqlite",
///     "loggers": ["tracing"],
///     "sql_log_level": "info"
/// }"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextSettings {
    pub dialect: DialectKind,
    /// Loggers to attach by name. Known: `"tracing"`.
    pub loggers: Vec<String>,
    /// Level of the statement log events (`trace` .. `error`).
    pub sql_log_level: String,
    /// Truncate logged SQL after this many bytes. `None` logs it whole.
    pub max_logged_sql: Option<usize>,
    /// Switch back to the previous catalog after `CREATE/DROP DATABASE`.
    pub restore_database: bool,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            dialect: DialectKind::default(),
            loggers: Vec::new(),
            sql_log_level: "debug".to_string(),
            max_logged_sql: Some(200),
            restore_database: true,
        }
    }
}

impl ContextSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from JSON; missing keys keep their defaults.
    pub fn from_json(json: &str) -> OrmResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_logger(mut self, name: impl Into<String>) -> Self {
        self.loggers.push(name.into());
        self
    }

    pub fn with_sql_log_level(mut self, level: Level) -> Self {
        self.sql_log_level = level.to_string().to_lowercase();
        self
    }

    pub fn with_max_logged_sql(mut self, max: Option<usize>) -> Self {
        self.max_logged_sql = max;
        self
    }

    pub fn with_restore_database(mut self, restore: bool) -> Self {
        self.restore_database = restore;
        self
    }

    /// Parsed log level; an unknown name falls back to `DEBUG` with a warning.
    pub fn log_level(&self) -> Level {
        self.sql_log_level.parse().unwrap_or_else(|_| {
            tracing::warn!(
                target: "persistmap.config",
                level = %self.sql_log_level,
                "unknown SQL log level, using debug"
            );
            Level::DEBUG
        })
    }

    /// Attach the configured loggers to `registry`.
    ///
    /// A logger that cannot be created is reported and skipped.
    pub fn attach_loggers(&self, registry: &mut InterceptorRegistry) {
        for name in &self.loggers {
            match name.to_ascii_lowercase().as_str() {
                "tracing" => {
                    registry.add_common(TracingInterceptor::new(
                        self.log_level(),
                        self.max_logged_sql,
                    ));
                }
                _ => tracing::warn!(
                    target: "persistmap.config",
                    logger = %name,
                    "unknown logger, skipping"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_keys() {
        let settings = ContextSettings::from_json(r#"{ "dialect": "sqlite" }"#).unwrap();
        assert_eq!(settings.dialect, DialectKind::Sqlite);
        assert!(settings.loggers.is_empty());
        assert!(settings.restore_database);
        assert_eq!(settings.log_level(), Level::DEBUG);
    }

    #[test]
    fn malformed_json_is_configuration_error() {
        let err = ContextSettings::from_json("{ dialect: ").unwrap_err();
        assert!(matches!(err, crate::OrmError::Configuration(_)));
    }

    #[test]
    fn unknown_logger_is_skipped() {
        let settings = ContextSettings::new()
            .with_logger("tracing")
            .with_logger("Log4Net");
        let mut registry = InterceptorRegistry::new();
        settings.attach_loggers(&mut registry);
        assert!(!registry.is_empty());

        let mut registry = InterceptorRegistry::new();
        ContextSettings::new()
            .with_logger("nope")
            .attach_loggers(&mut registry);
        assert!(registry.is_empty());
    }

    #[test]
    fn log_level_round_trips() {
        let settings = ContextSettings::new().with_sql_log_level(Level::INFO);
        assert_eq!(settings.sql_log_level, "info");
        assert_eq!(settings.log_level(), Level::INFO);
        let bad = ContextSettings {
            sql_log_level: "loud".into(),
            ..ContextSettings::default()
        };
        assert_eq!(bad.log_level(), Level::DEBUG);
    }
}
