//! Application configuration loaded from environment variables.
//!
//! Loading is fail-fast: a missing or malformed variable stops startup with
//! a message naming the variable.

use std::env;

use b2c_bridge_federation::{FederationSettings, Permissions};
use thiserror::Error;

use crate::logging::LogFormat;

/// Length the token vault and session signer require of `AUTH_KEY`.
const AUTH_KEY_LEN: usize = 32;

/// Longest session lifetime accepted: one year.
const MAX_TOKEN_EXPIRATION_HOURS: i64 = 24 * 366;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub federation: FederationSettings,
    pub rust_log: String,
    pub log_format: LogFormat,
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Required Variables
    ///
    /// - `AUTH_KEY` - 32-byte key encrypting provider tokens and signing sessions
    /// - `B2C_API_BASE_URL` - Discovery API base URL (when `B2C_ENABLED`)
    /// - `B2C_CLIENT_SECRET` - Client secret for the token endpoint (when `B2C_ENABLED`)
    ///
    /// # Optional Variables
    ///
    /// - `B2C_ENABLED` - Enable the login routes (default: false)
    /// - `B2C_CREATE_USER` - Create unknown users on first login (default: true)
    /// - `B2C_ADMIN_CLAIM` / `B2C_ADMIN_CLAIM_VALUE` - Admin mapping (default: unset)
    /// - `B2C_EXCHANGE_TIMEOUT_SECS` - Token endpoint timeout (default: 10)
    /// - `B2C_DEFAULT_PERMISSIONS` - Comma-separated permissions for new users,
    ///   any of `modify`, `share`, `api` (default: none)
    /// - `TOKEN_EXPIRATION_HOURS` - Session lifetime, at most one year (default: 2)
    /// - `BASE_PATH` - Path the application is served under (default: "/")
    /// - `RUST_LOG` - Log level filter (default: "info")
    /// - `LOG_FORMAT` - `json` or `compact` (default: json)
    /// - `HOST` - Bind address (default: "0.0.0.0")
    /// - `PORT` - Listen port (default: 8080)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development only)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its
    /// value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let enabled = parse_bool(&var, "B2C_ENABLED", false)?;

        let auth_key = var("AUTH_KEY").ok_or_else(|| missing("AUTH_KEY"))?;
        if auth_key.len() != AUTH_KEY_LEN {
            return Err(invalid(
                "AUTH_KEY",
                format!("must be exactly {AUTH_KEY_LEN} bytes, got {}", auth_key.len()),
            ));
        }

        let (api_base_url, client_secret) = if enabled {
            let api_base_url = var("B2C_API_BASE_URL").ok_or_else(|| missing("B2C_API_BASE_URL"))?;
            if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
                return Err(invalid("B2C_API_BASE_URL", "must be an http(s) URL".to_string()));
            }
            let client_secret =
                var("B2C_CLIENT_SECRET").ok_or_else(|| missing("B2C_CLIENT_SECRET"))?;
            (api_base_url, client_secret)
        } else {
            (
                var("B2C_API_BASE_URL").unwrap_or_default(),
                var("B2C_CLIENT_SECRET").unwrap_or_default(),
            )
        };

        let token_expiration_hours: i64 = parse_value(&var, "TOKEN_EXPIRATION_HOURS", 2)?;
        if !(1..=MAX_TOKEN_EXPIRATION_HOURS).contains(&token_expiration_hours) {
            return Err(invalid(
                "TOKEN_EXPIRATION_HOURS",
                format!("must be between 1 and {MAX_TOKEN_EXPIRATION_HOURS} hours"),
            ));
        }

        let federation = FederationSettings {
            enabled,
            api_base_url,
            client_secret,
            create_user: parse_bool(&var, "B2C_CREATE_USER", true)?,
            admin_claim: var("B2C_ADMIN_CLAIM").unwrap_or_default(),
            admin_claim_value: var("B2C_ADMIN_CLAIM_VALUE").unwrap_or_default(),
            auth_key,
            token_expiration_hours,
            base_path: var("BASE_PATH").unwrap_or_else(|| "/".to_string()),
            exchange_timeout_secs: parse_value(&var, "B2C_EXCHANGE_TIMEOUT_SECS", 10)?,
            user_defaults: parse_permissions(var("B2C_DEFAULT_PERMISSIONS").as_deref())?,
        };

        let port: u16 = parse_value(&var, "PORT", 8080)?;
        if port == 0 {
            return Err(invalid("PORT", "Port must be between 1 and 65535".to_string()));
        }

        Ok(Self {
            federation,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_format: parse_value(&var, "LOG_FORMAT", LogFormat::default())?,
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
        })
    }

    /// Get the server bind address as a socket address string.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn missing(var: &str) -> ConfigError {
    ConfigError::MissingVar(var.to_string())
}

fn invalid(var: &str, message: String) -> ConfigError {
    ConfigError::InvalidValue {
        var: var.to_string(),
        message,
    }
}

fn parse_bool(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match var(name) {
        None => Ok(default),
        Some(value) => match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            other => Err(invalid(name, format!("expected a boolean, got {other:?}"))),
        },
    }
}

fn parse_value<T>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(name, e.to_string())),
    }
}

fn parse_permissions(value: Option<&str>) -> Result<Permissions, ConfigError> {
    let mut permissions = Permissions::default();
    for item in value.unwrap_or_default().split(',') {
        match item.trim().to_lowercase().as_str() {
            "" => {}
            "modify" => permissions.modify = true,
            "share" => permissions.share = true,
            "api" => permissions.api = true,
            other => {
                return Err(invalid(
                    "B2C_DEFAULT_PERMISSIONS",
                    format!("unknown permission {other:?}"),
                ))
            }
        }
    }
    Ok(permissions)
}
