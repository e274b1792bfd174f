use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub bootstrap_admin: BootstrapAdminConfig,
    pub maintenance: MaintenanceConfig,
    pub payments: PaymentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Whether to set the `Secure` flag on the session cookie.
    /// Read from env var `COOKIE_SECURE` (accepted values: "true"/"false", "1"/"0", "yes"/"no").
    pub cookie_secure: bool,
    /// Directory served under `/uploads` (payment slip images).
    pub uploads_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Allowed requests per second (per IP) for /api/auth/login
    pub login_per_second: u32,
    pub login_burst: u32,
}

/// Administrator account created on first start when no admin exists yet.
#[derive(Debug, Clone, Deserialize)]
pub struct BootstrapAdminConfig {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    /// Whether the worker that expires stale reservations and lapsed closures runs.
    pub enabled: bool,
    pub interval_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Confirm a pending reservation when its payment is approved.
    pub auto_confirm_on_payment: bool,
}

fn env_flag(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("PORT".to_string()))?,
                cookie_secure: env_flag("COOKIE_SECURE", false),
                uploads_dir: env::var("UPLOADS_DIR").unwrap_or_else(|_| "uploads".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/facility_admin.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .map_err(|_| ConfigError::MissingEnv("JWT_SECRET".to_string()))?,
                expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                    .unwrap_or_else(|_| "12".to_string())
                    .parse()
                    .unwrap_or(12),
            },
            rate_limit: RateLimitConfig {
                login_per_second: env::var("RATE_LIMIT_LOGIN_PER_SECOND")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .unwrap_or(3),
                login_burst: env::var("RATE_LIMIT_LOGIN_BURST")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
            bootstrap_admin: BootstrapAdminConfig {
                email: env::var("ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty()),
                password: env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
                full_name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Administrator".to_string()),
            },
            maintenance: MaintenanceConfig {
                enabled: env_flag("MAINTENANCE_ENABLED", true),
                interval_seconds: env::var("MAINTENANCE_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .unwrap_or(300u64),
            },
            payments: PaymentConfig {
                auto_confirm_on_payment: env_flag("AUTO_CONFIRM_ON_PAYMENT", false),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
                cookie_secure: false,
                uploads_dir: "uploads".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://data/facility_admin.db".to_string(),
                max_connections: 5,
            },
            jwt: JwtConfig {
                secret: String::new(),
                expiration_hours: 12,
            },
            rate_limit: RateLimitConfig {
                login_per_second: 3,
                login_burst: 10,
            },
            bootstrap_admin: BootstrapAdminConfig {
                email: None,
                password: None,
                full_name: "Administrator".to_string(),
            },
            maintenance: MaintenanceConfig {
                enabled: true,
                interval_seconds: 300,
            },
            payments: PaymentConfig {
                auto_confirm_on_payment: false,
            },
        }
    }
}
