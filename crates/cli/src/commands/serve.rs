use crate::commands::CliError;
use clap::Args;
use common::config::AppConfig;
use database_adapters::bootstrap::initialize_database;
use database_adapters::create_db_adapter;
use engine::SqlGenerator;
use shared_clients::acs::{CommunicationIdentityClient, SmsClient};
use shared_clients::openai::OpenAiClient;
use std::path::PathBuf;
use std::sync::Arc;
use web::{run_server, AppState, BackendConfig};

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub addr: String,
    /// Directory with the built web client, served at `/`
    #[arg(long = "static-dir")]
    pub static_dir: Option<PathBuf>,
    /// Do not create tables and `get_customers()` on startup
    #[arg(long = "skip-db-init")]
    pub skip_db_init: bool,
}

/// Wire every dependency from `config` and run until the server stops.
pub async fn handle_serve(config: AppConfig, args: ServeArgs) -> Result<(), CliError> {
    let db = create_db_adapter(&config.postgres)?;
    let completion = Arc::new(OpenAiClient::new(&config.openai)?);
    tracing::info!(model = completion.model(), "completion client ready");
    let identity = Arc::new(CommunicationIdentityClient::new(&config.acs)?);
    let sms = Arc::new(SmsClient::new(&config.acs)?);

    if args.skip_db_init {
        tracing::info!("skipping database bootstrap");
    } else if let Err(err) = initialize_database(db.as_ref()).await {
        tracing::error!(error = %err, "database bootstrap failed, continuing without it");
    }

    let state = AppState::new(
        db.clone(),
        SqlGenerator::new(completion, db),
        identity,
        sms,
    );
    let backend = BackendConfig {
        addr: args.addr,
        static_dir: args.static_dir,
    };

    run_server(state, backend).await?;
    Ok(())
}
