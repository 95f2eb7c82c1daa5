pub mod connection;
pub mod error;
pub mod loader;

use std::fmt;
use std::time::Duration;

pub use connection::{parse_acs_connection_string, AcsConnectionParts};
pub use error::ConfigError;
pub use loader::{load_env_file, AppConfig};

/// Connection settings for the customers database.
#[derive(Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
    pub pool_size: usize,
    pub query_timeout: Duration,
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("pool_size", &self.pool_size)
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

#[derive(Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Azure Communication Services settings. The connection string is kept raw
/// here and parsed by the ACS clients, which own its format.
#[derive(Clone)]
pub struct AcsConfig {
    pub connection_string: String,
    pub phone_number: String,
    pub timeout: Duration,
}

impl fmt::Debug for AcsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcsConfig")
            .field("connection_string", &"<redacted>")
            .field("phone_number", &self.phone_number)
            .field("timeout", &self.timeout)
            .finish()
    }
}
