use common::config::PostgresConfig;
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use uuid::Uuid;

pub const PG_DB: &str = "CustomersDB";
pub const PG_USER: &str = "postgres";
pub const PG_PASSWORD: &str = "postgres";
pub const PG_HOST: &str = "127.0.0.1";

/// A throwaway Postgres container. The container stops when this is dropped,
/// so keep it alive for the whole test.
pub struct PgTestContainer {
    pub container: ContainerAsync<GenericImage>,
    pub port: u16,
    pub db_name: &'static str,
    pub user: &'static str,
    pub password: &'static str,
    pub host: &'static str,
}

impl PgTestContainer {
    /// Gateway settings pointing at this container.
    pub fn postgres_config(&self) -> PostgresConfig {
        PostgresConfig {
            host: self.host.to_string(),
            port: self.port,
            database: self.db_name.to_string(),
            user: self.user.to_string(),
            password: self.password.to_string(),
            pool_size: 4,
            query_timeout: Duration::from_secs(10),
        }
    }
}

pub async fn setup_postgres() -> Result<PgTestContainer, Box<dyn std::error::Error>> {
    let name = format!("custdesk-postgres-{}", Uuid::new_v4());
    let postgres = GenericImage::new("postgres", "16")
        .with_wait_for(WaitFor::message_on_stdout(
            "database system is ready to accept connections",
        ))
        .with_mapped_port(0, 5432u16.tcp())
        .with_container_name(&name)
        .with_env_var("POSTGRES_DB", PG_DB)
        .with_env_var("POSTGRES_USER", PG_USER)
        .with_env_var("POSTGRES_PASSWORD", PG_PASSWORD)
        .with_startup_timeout(Duration::from_secs(60))
        .start()
        .await?;

    let port = postgres.get_host_port_ipv4(5432).await?;

    Ok(PgTestContainer {
        container: postgres,
        port,
        db_name: PG_DB,
        user: PG_USER,
        password: PG_PASSWORD,
        host: PG_HOST,
    })
}
