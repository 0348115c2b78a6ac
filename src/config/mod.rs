use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("JWT_SECRET must be at least {0} bytes in production")]
    WeakSecret(usize),

    #[error("The in-memory store cannot be used in production")]
    MemoryStoreInProduction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub pagination: PaginationConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
}

/// Which store backend serves requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackendKind {
    Postgres,
    /// Demo/test only; never selected unless asked for explicitly
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackendKind,
    /// Connection string for the row-level-security bound role
    #[serde(skip_serializing)]
    pub database_url: Option<String>,
    /// Connection string for the role that bypasses row-level security
    #[serde(skip_serializing)]
    pub admin_database_url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_days: i64,
    pub trial_days: i64,
}

const MIN_PRODUCTION_SECRET_LEN: usize = 32;

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = match lookup("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(jwt_secret),
            Environment::Staging => Self::staging(jwt_secret),
            Environment::Development => Self::development(jwt_secret),
        }
        .with_overrides(&lookup)?;

        config.validate()?;
        Ok(config)
    }

    /// Development configuration backed by the in-memory store, used by tests and demos
    pub fn in_memory(jwt_secret: impl Into<String>) -> Self {
        let mut config = Self::development(jwt_secret.into());
        config.store.backend = StoreBackendKind::Memory;
        config
    }

    fn with_overrides<F>(mut self, lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(v) = lookup("DENTCARE_API_PORT").or_else(|| lookup("PORT")) {
            self.server.port = parse_value("PORT", &v)?;
        }
        if let Some(v) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Store overrides
        if let Some(v) = lookup("STORE_BACKEND") {
            self.store.backend = match v.as_str() {
                "postgres" => StoreBackendKind::Postgres,
                "memory" => StoreBackendKind::Memory,
                _ => return Err(ConfigError::Invalid { key: "STORE_BACKEND", value: v }),
            };
        }
        self.store.database_url = lookup("DATABASE_URL").filter(|s| !s.is_empty());
        self.store.admin_database_url = lookup("DATABASE_ADMIN_URL").filter(|s| !s.is_empty());
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.store.max_connections = parse_value("DATABASE_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.store.connection_timeout = parse_value("DATABASE_CONNECTION_TIMEOUT", &v)?;
        }

        // Pagination overrides
        if let Some(v) = lookup("PAGINATION_DEFAULT_LIMIT") {
            self.pagination.default_limit = parse_value("PAGINATION_DEFAULT_LIMIT", &v)?;
        }
        if let Some(v) = lookup("PAGINATION_MAX_LIMIT") {
            self.pagination.max_limit = parse_value("PAGINATION_MAX_LIMIT", &v)?;
        }

        // Security overrides
        if let Some(v) = lookup("JWT_EXPIRY_DAYS") {
            self.security.jwt_expiry_days = parse_value("JWT_EXPIRY_DAYS", &v)?;
        }
        if let Some(v) = lookup("TRIAL_DAYS") {
            self.security.trial_days = parse_value("TRIAL_DAYS", &v)?;
        }

        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.environment == Environment::Production {
            if self.security.jwt_secret.len() < MIN_PRODUCTION_SECRET_LEN {
                return Err(ConfigError::WeakSecret(MIN_PRODUCTION_SECRET_LEN));
            }
            if self.store.backend == StoreBackendKind::Memory {
                return Err(ConfigError::MemoryStoreInProduction);
            }
        }

        if self.store.backend == StoreBackendKind::Postgres {
            if self.store.database_url.is_none() {
                return Err(ConfigError::Missing("DATABASE_URL"));
            }
            if self.store.admin_database_url.is_none() {
                return Err(ConfigError::Missing("DATABASE_ADMIN_URL"));
            }
        }

        if self.security.jwt_expiry_days <= 0 {
            return Err(ConfigError::Invalid {
                key: "JWT_EXPIRY_DAYS",
                value: self.security.jwt_expiry_days.to_string(),
            });
        }

        if self.pagination.default_limit == 0 || self.pagination.default_limit > self.pagination.max_limit {
            return Err(ConfigError::Invalid {
                key: "PAGINATION_DEFAULT_LIMIT",
                value: self.pagination.default_limit.to_string(),
            });
        }

        Ok(())
    }

    fn development(jwt_secret: String) -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 5000,
                cors_origins: vec![],
            },
            store: StoreConfig {
                backend: StoreBackendKind::Postgres,
                database_url: None,
                admin_database_url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            pagination: PaginationConfig {
                default_limit: 10,
                max_limit: 1000,
            },
            security: SecurityConfig {
                jwt_secret,
                jwt_expiry_days: 14,
                trial_days: 30,
            },
        }
    }

    fn staging(jwt_secret: String) -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                port: 5000,
                cors_origins: vec!["https://staging.dentcare.app".to_string()],
            },
            store: StoreConfig {
                backend: StoreBackendKind::Postgres,
                database_url: None,
                admin_database_url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            pagination: PaginationConfig {
                default_limit: 10,
                max_limit: 500,
            },
            security: SecurityConfig {
                jwt_secret,
                jwt_expiry_days: 14,
                trial_days: 30,
            },
        }
    }

    fn production(jwt_secret: String) -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                port: 5000,
                cors_origins: vec!["https://app.dentcare.app".to_string()],
            },
            store: StoreConfig {
                backend: StoreBackendKind::Postgres,
                database_url: None,
                admin_database_url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            pagination: PaginationConfig {
                default_limit: 10,
                max_limit: 100,
            },
            security: SecurityConfig {
                jwt_secret,
                jwt_expiry_days: 14,
                trial_days: 30,
            },
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_jwt_secret_fails_loudly() {
        let err = AppConfig::from_lookup(lookup_from(&[("STORE_BACKEND", "memory")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));

        let err = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "  "), ("STORE_BACKEND", "memory")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn postgres_backend_requires_both_connection_strings() {
        let err = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "dev-secret")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));

        let err = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "dev-secret"),
            ("DATABASE_URL", "postgres://app@localhost/dentcare"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_ADMIN_URL"));
    }

    #[test]
    fn development_defaults_and_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "dev-secret"),
            ("STORE_BACKEND", "memory"),
            ("PORT", "8080"),
            ("JWT_EXPIRY_DAYS", "7"),
            ("CORS_ORIGINS", "http://localhost:3000, http://localhost:5173"),
        ]))
        .unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.security.jwt_expiry_days, 7);
        assert_eq!(config.server.cors_origins.len(), 2);
        assert_eq!(config.pagination.default_limit, 10);
    }

    #[test]
    fn production_rejects_short_secret_and_memory_store() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "short"),
            ("DATABASE_URL", "postgres://app@db/dentcare"),
            ("DATABASE_ADMIN_URL", "postgres://admin@db/dentcare"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::WeakSecret(32));

        let err = AppConfig::from_lookup(lookup_from(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("STORE_BACKEND", "memory"),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::MemoryStoreInProduction);
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "dev-secret"),
            ("STORE_BACKEND", "memory"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
    }

    #[test]
    fn unknown_store_backend_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "dev-secret"),
            ("STORE_BACKEND", "sqlite"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "STORE_BACKEND", .. }));
    }
}
