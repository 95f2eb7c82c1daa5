mod commands;

use crate::commands::{handle_check_config, handle_serve, CliError, ServeArgs};
use clap::{Parser, Subcommand};
use common::config::{load_env_file, AppConfig};
use logging::init_logger;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "custdesk",
    about = "Customer desk API: customers, SQL from plain English, ACS tokens and SMS"
)]
pub struct Cli {
    #[arg(
        long = "env-file",
        help = "read environment variables from this file before loading config",
        global = true
    )]
    pub env_file: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Start the HTTP API
    Serve(ServeArgs),
    /// Validate configuration and exit
    CheckConfig,
}

fn run_cmd(result: Result<(), CliError>) {
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config() -> Result<AppConfig, CliError> {
    Ok(AppConfig::from_env()?)
}

fn main() {
    init_logger();
    let cli = Cli::parse();

    run_cmd(load_env_file(cli.env_file.as_deref()).map_err(CliError::from));

    match cli.command {
        Cmd::CheckConfig => run_cmd(handle_check_config().map(|_| ())),
        Cmd::Serve(args) => run_cmd(load_config().and_then(|config| {
            actix_web::rt::System::new().block_on(handle_serve(config, args))
        })),
    }
}
