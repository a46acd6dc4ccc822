use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct DbConfig {
    pub url: String,
    /// Elevated credentials for schema changes; the app pool is used when absent.
    pub migration_url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub db: DbConfig,
    /// username -> password
    pub users: HashMap<String, String>,
    pub request_timeout: Duration,
    pub cors_allowed_origin: String,
}

impl Config {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = get("ENVIRONMENT").unwrap_or_else(|| "dev".to_string());

        let log_format = match get("RUST_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            Some("text") => LogFormat::Text,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "RUST_LOG_FORMAT",
                    value: other.to_string(),
                })
            }
            None if environment == "dev" => LogFormat::Text,
            None => LogFormat::Json,
        };

        let url = match get("DATABASE_URL") {
            Some(url) => url,
            None => compose_database_url(&get)?,
        };

        let db = DbConfig {
            url,
            migration_url: get("MIGRATION_DATABASE_URL"),
            max_connections: parse_or(&get, "DB_MAX_CONNECTIONS", 10)?,
            acquire_timeout: Duration::from_secs(parse_or(&get, "DB_ACQUIRE_TIMEOUT_SECS", 5)?),
        };

        let users = match get("AUTH_USERS") {
            Some(raw) => parse_users(&raw)?,
            None => HashMap::new(),
        };

        Ok(Self {
            environment,
            port: parse_or(&get, "PORT", 8080)?,
            log_format,
            db,
            users,
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 30)?),
            cors_allowed_origin: get("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|| "http://localhost:4200".to_string()),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn compose_database_url<G>(get: &G) -> Result<String, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

    let username = require("DB_USERNAME").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
    let password = require("DB_PASSWORD")?;
    let host = require("DB_HOST")?;
    let database = require("DB_DATABASE")?;
    let port = get("DB_PORT").unwrap_or_else(|| "5432".to_string());
    let ssl_mode = get("DB_SSL_MODE").unwrap_or_else(|| "disable".to_string());

    Ok(format!(
        "postgres://{username}:{password}@{host}:{port}/{database}?sslmode={ssl_mode}"
    ))
}

/// Parses `user:pass,user2:pass2`. Passwords may contain `:`.
fn parse_users(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once(':') {
            Some((user, pass)) if !user.is_empty() && !pass.is_empty() => {
                Ok((user.to_string(), pass.to_string()))
            }
            _ => Err(ConfigError::Invalid {
                key: "AUTH_USERS",
                value: pair.to_string(),
            }),
        })
        .collect()
}
