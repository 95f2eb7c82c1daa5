use crate::config::connection::parse_acs_connection_string;
use crate::config::error::ConfigError;
use crate::config::{AcsConfig, OpenAiConfig, PostgresConfig};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub const POSTGRES_USER: &str = "POSTGRES_USER";
pub const POSTGRES_PASSWORD: &str = "POSTGRES_PASSWORD";
pub const POSTGRES_HOST: &str = "POSTGRES_HOST";
pub const POSTGRES_PORT: &str = "POSTGRES_PORT";
pub const POSTGRES_DB: &str = "POSTGRES_DB";
pub const POSTGRES_POOL_SIZE: &str = "POSTGRES_POOL_SIZE";
pub const POSTGRES_QUERY_TIMEOUT_SECS: &str = "POSTGRES_QUERY_TIMEOUT_SECS";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_MODEL: &str = "OPENAI_MODEL";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const OPENAI_TIMEOUT_SECS: &str = "OPENAI_TIMEOUT_SECS";
pub const ACS_CONNECTION_STRING: &str = "ACS_CONNECTION_STRING";
pub const ACS_PHONE_NUMBER: &str = "ACS_PHONE_NUMBER";
pub const ACS_TIMEOUT_SECS: &str = "ACS_TIMEOUT_SECS";

const REQUIRED: [&str; 5] = [
    POSTGRES_USER,
    POSTGRES_PASSWORD,
    OPENAI_API_KEY,
    ACS_CONNECTION_STRING,
    ACS_PHONE_NUMBER,
];

/// Everything the server needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub postgres: PostgresConfig,
    pub openai: OpenAiConfig,
    pub acs: AcsConfig,
}

impl AppConfig {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the configuration through `lookup`. Blank values count as
    /// missing, and every missing required key is reported in one error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let missing: Vec<String> = REQUIRED
            .iter()
            .filter(|key| get(key).is_none())
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::missing_fields(missing));
        }
        let required = |key: &str| get(key).unwrap_or_default();

        let postgres = PostgresConfig {
            host: get(POSTGRES_HOST).unwrap_or_else(|| "localhost".to_string()),
            port: parse_or(&get, POSTGRES_PORT, 5432)?,
            database: get(POSTGRES_DB).unwrap_or_else(|| "CustomersDB".to_string()),
            user: required(POSTGRES_USER),
            password: required(POSTGRES_PASSWORD),
            pool_size: parse_or(&get, POSTGRES_POOL_SIZE, 16)?,
            query_timeout: secs_or(&get, POSTGRES_QUERY_TIMEOUT_SECS, 30)?,
        };
        if postgres.pool_size == 0 {
            return Err(ConfigError::invalid_value(
                POSTGRES_POOL_SIZE,
                "pool size must be at least 1",
            ));
        }

        let openai = OpenAiConfig {
            api_key: required(OPENAI_API_KEY),
            model: get(OPENAI_MODEL).unwrap_or_else(|| "gpt-4".to_string()),
            base_url: get(OPENAI_BASE_URL)
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout: secs_or(&get, OPENAI_TIMEOUT_SECS, 60)?,
        };

        let acs = AcsConfig {
            connection_string: required(ACS_CONNECTION_STRING),
            phone_number: required(ACS_PHONE_NUMBER),
            timeout: secs_or(&get, ACS_TIMEOUT_SECS, 30)?,
        };
        parse_acs_connection_string(&acs.connection_string)?;

        Ok(Self {
            postgres,
            openai,
            acs,
        })
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::invalid_value(key, format!("'{}': {}", raw, e))),
        None => Ok(default),
    }
}

fn secs_or<G>(get: &G, key: &str, default: u64) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_or(get, key, default)?;
    if secs == 0 {
        return Err(ConfigError::invalid_value(key, "timeout must be at least 1 second"));
    }
    Ok(Duration::from_secs(secs))
}

/// Load `KEY=value` pairs from `path` into the process environment. Variables
/// that are already set win over the file.
pub fn load_env_file(path: Option<&Path>) -> Result<(), ConfigError> {
    match path {
        Some(path) => dotenv::from_path(path)
            .map(|_| tracing::debug!("loaded environment from {}", path.display()))
            .map_err(|e| ConfigError::env_file(path, e)),
        None => {
            // a missing default .env is not an error
            if let Ok(found) = dotenv::dotenv() {
                tracing::debug!("loaded environment from {}", found.display());
            }
            Ok(())
        }
    }
}
