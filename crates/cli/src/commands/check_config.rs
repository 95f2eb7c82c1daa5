use crate::commands::CliError;
use common::config::AppConfig;

/// Validate the environment without opening any connection.
pub fn handle_check_config() -> Result<AppConfig, CliError> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        postgres = ?config.postgres,
        openai = ?config.openai,
        acs = ?config.acs,
        "configuration is valid"
    );
    Ok(config)
}
