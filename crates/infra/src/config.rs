//! Environment-driven application configuration.

use std::net::SocketAddr;

use thiserror::Error;

use crate::engine::GuestCheckout;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_LOGIN_URL: &str = "/accounts/login";
pub const DEFAULT_GUEST_USERNAME: &str = "guest";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Development-only signing secret used when `JWT_SECRET` is unset.
pub const DEV_JWT_SECRET: &str = "dev-insecure-secret-change-me";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    /// Where access-denied browsers are sent.
    pub login_url: String,
    pub guest_checkout: GuestCheckout,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            database: None,
            login_url: DEFAULT_LOGIN_URL.to_string(),
            guest_checkout: GuestCheckout::Disabled,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `JWT_SECRET` | development secret (logged as a warning by the caller) |
    /// | `BIND_ADDR` | `0.0.0.0:8080` |
    /// | `DATABASE_URL` | unset: in-memory store |
    /// | `DATABASE_MAX_CONNECTIONS` | `5` |
    /// | `LOGIN_URL` | `/accounts/login` |
    /// | `GUEST_CHECKOUT` | `false` |
    /// | `GUEST_USERNAME` | `guest` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = match var("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                key: "BIND_ADDR",
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => default_bind_addr(),
        };

        let max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "DATABASE_MAX_CONNECTIONS",
                        value: raw,
                        reason: "expected a positive integer".to_string(),
                    });
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };
        let database = var("DATABASE_URL").map(|url| DatabaseConfig {
            url,
            max_connections,
        });

        let guest_enabled = match var("GUEST_CHECKOUT") {
            Some(raw) => parse_bool("GUEST_CHECKOUT", raw)?,
            None => false,
        };
        let guest_checkout = if guest_enabled {
            GuestCheckout::Enabled {
                username: var("GUEST_USERNAME").unwrap_or_else(|| DEFAULT_GUEST_USERNAME.to_string()),
            }
        } else {
            GuestCheckout::Disabled
        };

        Ok(Self {
            bind_addr,
            jwt_secret: var("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string()),
            database,
            login_url: var("LOGIN_URL").unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
            guest_checkout,
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

fn parse_bool(key: &'static str, raw: String) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "expected a boolean".to_string(),
        }),
    }
}
