pub mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use database_adapters::SharedDbAdapter;
use engine::SqlGenerator;
use shared_clients::acs::{IdentityProvider, SmsSender};

/// Everything a handler needs. Built once at startup and shared by `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub db: SharedDbAdapter,
    pub generator: SqlGenerator,
    pub identity: Arc<dyn IdentityProvider>,
    pub sms: Arc<dyn SmsSender>,
}

impl AppState {
    pub fn new(
        db: SharedDbAdapter,
        generator: SqlGenerator,
        identity: Arc<dyn IdentityProvider>,
        sms: Arc<dyn SmsSender>,
    ) -> Self {
        Self {
            db,
            generator,
            identity,
            sms,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub addr: String,
    pub static_dir: Option<PathBuf>,
}

pub async fn run_server(state: AppState, cfg: BackendConfig) -> std::io::Result<()> {
    let state = web::Data::new(state);
    let static_dir = cfg.static_dir.clone();

    tracing::info!(
        addr = %cfg.addr,
        static_dir = ?cfg.static_dir,
        "starting server"
    );

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        let mut app = App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            .configure(routes::configure);

        if let Some(dir) = static_dir.clone() {
            app = app.service(
                Files::new("/", dir)
                    .prefer_utf8(true)
                    .index_file("index.html"),
            );
        }

        app
    })
    .bind(cfg.addr)?
    .run()
    .await
}
