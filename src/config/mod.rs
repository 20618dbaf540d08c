use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub pagination: PaginationConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_limit: i64,
    pub max_limit: i64,
    pub debug_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// When unset the server runs against the in-memory record store.
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub enable_query_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
    pub enable_rate_limiting: bool,
    /// Requests each client may burst before it is throttled.
    pub rate_limit_requests: u32,
    /// Time for a drained client bucket to refill completely.
    pub rate_limit_window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub password_hash_cost: u32,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub login_path: String,
    pub public_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub toast_capacity: usize,
    pub toast_duration_ms: u64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set")]
    MissingJwtSecret,
    #[error("password hash cost must be between 4 and 31, got {0}")]
    InvalidHashCost(u32),
    #[error("pagination limits are inconsistent: default {default}, max {max}")]
    InvalidPagination { default: i64, max: i64 },
    #[error("rate limiting needs a positive request budget and window")]
    InvalidRateLimit,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    /// Rejects settings the server cannot run with. Called once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }
        if !(4..=31).contains(&self.security.password_hash_cost) {
            return Err(ConfigError::InvalidHashCost(self.security.password_hash_cost));
        }
        let pagination = &self.pagination;
        if pagination.max_limit < 1 || pagination.default_limit < 1 || pagination.default_limit > pagination.max_limit {
            return Err(ConfigError::InvalidPagination {
                default: pagination.default_limit,
                max: pagination.max_limit,
            });
        }
        if self.api.enable_rate_limiting && (self.api.rate_limit_requests == 0 || self.api.rate_limit_window_secs == 0) {
            return Err(ConfigError::InvalidRateLimit);
        }
        Ok(())
    }

    fn with_env_overrides(mut self) -> Self {
        // Pagination overrides
        if let Ok(v) = env::var("PAGINATION_DEFAULT_LIMIT") {
            self.pagination.default_limit = v.parse().unwrap_or(self.pagination.default_limit);
        }
        if let Ok(v) = env::var("PAGINATION_MAX_LIMIT") {
            self.pagination.max_limit = v.parse().unwrap_or(self.pagination.max_limit);
        }
        if let Ok(v) = env::var("PAGINATION_DEBUG_LOGGING") {
            self.pagination.debug_logging = v.parse().unwrap_or(self.pagination.debug_logging);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_ENABLE_QUERY_LOGGING") {
            self.database.enable_query_logging = v.parse().unwrap_or(self.database.enable_query_logging);
        }

        // API overrides
        if let Ok(v) = env::var("EXPEDIENTES_API_PORT").or_else(|_| env::var("PORT")) {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_ENABLE_RATE_LIMITING") {
            self.api.enable_rate_limiting = v.parse().unwrap_or(self.api.enable_rate_limiting);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_REQUESTS") {
            self.api.rate_limit_requests = v.parse().unwrap_or(self.api.rate_limit_requests);
        }
        if let Ok(v) = env::var("API_RATE_LIMIT_WINDOW_SECS") {
            self.api.rate_limit_window_secs = v.parse().unwrap_or(self.api.rate_limit_window_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("SECURITY_PASSWORD_HASH_COST") {
            self.security.password_hash_cost = v.parse().unwrap_or(self.security.password_hash_cost);
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_LOGIN_PATH") {
            self.security.login_path = v;
        }

        // Notification overrides
        if let Ok(v) = env::var("TOAST_CAPACITY") {
            self.notifications.toast_capacity = v.parse().unwrap_or(self.notifications.toast_capacity);
        }
        if let Ok(v) = env::var("TOAST_DURATION_MS") {
            self.notifications.toast_duration_ms = v.parse().unwrap_or(self.notifications.toast_duration_ms);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            pagination: PaginationConfig {
                default_limit: 10,
                max_limit: 100,
                debug_logging: true,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
                enable_query_logging: true,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                enable_rate_limiting: false,
                rate_limit_requests: 1000,
                rate_limit_window_secs: 60,
            },
            security: SecurityConfig {
                jwt_secret: "dev-secret-change-me".to_string(),
                jwt_expiry_hours: 24,
                password_hash_cost: 4,
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                login_path: "/login".to_string(),
                public_paths: default_public_paths(),
            },
            notifications: NotificationConfig {
                toast_capacity: 5,
                toast_duration_ms: 5000,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            pagination: PaginationConfig {
                default_limit: 10,
                max_limit: 100,
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
                enable_query_logging: true,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: true,
                enable_rate_limiting: true,
                rate_limit_requests: 100,
                rate_limit_window_secs: 60,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                password_hash_cost: bcrypt::DEFAULT_COST,
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
                login_path: "/login".to_string(),
                public_paths: default_public_paths(),
            },
            notifications: NotificationConfig {
                toast_capacity: 5,
                toast_duration_ms: 5000,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            pagination: PaginationConfig {
                default_limit: 10,
                max_limit: 100,
                debug_logging: false,
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
                enable_query_logging: false,
            },
            api: ApiConfig {
                port: 3000,
                enable_request_logging: false,
                enable_rate_limiting: true,
                rate_limit_requests: 60,
                rate_limit_window_secs: 60,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 8,
                password_hash_cost: bcrypt::DEFAULT_COST,
                enable_cors: true,
                cors_origins: vec!["https://app.example.com".to_string()],
                login_path: "/login".to_string(),
                public_paths: default_public_paths(),
            },
            notifications: NotificationConfig {
                toast_capacity: 5,
                toast_duration_ms: 5000,
            },
        }
    }
}

fn default_public_paths() -> Vec<String> {
    vec!["/login".to_string(), "/health".to_string(), "/api/health".to_string()]
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}
