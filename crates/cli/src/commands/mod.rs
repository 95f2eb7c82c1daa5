pub mod check_config;
pub mod serve;

pub use check_config::handle_check_config;
pub use serve::{handle_serve, ServeArgs};

use common::config::ConfigError;
use database_adapters::DatabaseAdapterError;
use shared_clients::acs::AcsError;
use shared_clients::openai::CompletionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database setup failed: {0}")]
    Database(#[from] DatabaseAdapterError),
    #[error("completion client setup failed: {0}")]
    Completion(#[from] CompletionError),
    #[error("communication services setup failed: {0}")]
    Acs(#[from] AcsError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
