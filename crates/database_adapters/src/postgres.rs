use crate::decode::row_to_json;
use crate::params::JsonParam;
use crate::{AsyncDatabaseAdapter, DatabaseAdapterError};
use async_trait::async_trait;
use common::config::PostgresConfig;
use common::types::RowSet;
use deadpool_postgres::{
    Config, ManagerConfig, Pool, PoolConfig, PoolError, RecyclingMethod, Runtime,
};
use logging::timeit;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Error, NoTls};

impl From<Error> for DatabaseAdapterError {
    #[track_caller]
    fn from(err: Error) -> Self {
        if let Some(e) = err.as_db_error() {
            let code = e.code();
            // class 08 is connection exceptions, 57P operator intervention
            if code.code().starts_with("08") || code.code().starts_with("57P") {
                DatabaseAdapterError::connection(e.to_string())
            } else if code == &SqlState::SYNTAX_ERROR {
                DatabaseAdapterError::syntax(e.to_string())
            } else {
                DatabaseAdapterError::rejected(e.to_string(), Some(code.code().to_string()))
            }
        } else if err.is_closed() {
            DatabaseAdapterError::connection(err.to_string())
        } else {
            DatabaseAdapterError::unexpected(err.to_string())
        }
    }
}

impl From<PoolError> for DatabaseAdapterError {
    #[track_caller]
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Backend(e) => match DatabaseAdapterError::from(e) {
                // a backend error while acquiring is never about the statement
                rejected if rejected.is_rejection() => {
                    DatabaseAdapterError::connection(rejected.to_string())
                }
                other => other,
            },
            PoolError::Timeout(kind) => {
                DatabaseAdapterError::timeout(format!("waiting for a pooled connection ({kind:?})"))
            }
            other => DatabaseAdapterError::connection(other.to_string()),
        }
    }
}

/// Pooled Postgres gateway. Each call checks a connection out for its own
/// duration; dropping the checked-out client returns it to the pool.
pub struct PostgresAdapter {
    pool: Pool,
    query_timeout: Duration,
}

impl PostgresAdapter {
    /// Build the pool. No connection is opened until the first query.
    pub fn new(cfg: &PostgresConfig) -> Result<Self, DatabaseAdapterError> {
        let mut pg = Config::new();
        pg.host = Some(cfg.host.clone());
        pg.port = Some(cfg.port);
        pg.dbname = Some(cfg.database.clone());
        pg.user = Some(cfg.user.clone());
        pg.password = Some(cfg.password.clone());
        pg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        pg.pool = Some(PoolConfig::new(cfg.pool_size));

        let pool = pg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseAdapterError::config(e.to_string()))?;

        tracing::info!(
            host = %cfg.host,
            port = cfg.port,
            database = %cfg.database,
            max_size = cfg.pool_size,
            "postgres pool created"
        );

        Ok(Self {
            pool,
            query_timeout: cfg.query_timeout,
        })
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T, DatabaseAdapterError>
    where
        F: Future<Output = Result<T, DatabaseAdapterError>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DatabaseAdapterError::timeout(format!(
                "{} did not finish within {:?}",
                what, self.query_timeout
            ))),
        }
    }
}

#[async_trait]
impl AsyncDatabaseAdapter for PostgresAdapter {
    async fn execute(&self, sql: &str) -> Result<(), DatabaseAdapterError> {
        self.bounded("batch execution", async {
            let client = self.pool.get().await?;
            client.batch_execute(sql).await?;
            Ok(())
        })
        .await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> Result<RowSet, DatabaseAdapterError> {
        timeit!("postgres query", {
            self.bounded("query", async {
                let client = self.pool.get().await?;
                let stmt = client.prepare(sql).await?;

                if stmt.params().len() != params.len() {
                    return Err(DatabaseAdapterError::invalid_parameters(format!(
                        "statement expects {} parameters but {} were supplied",
                        stmt.params().len(),
                        params.len()
                    )));
                }

                let bound: Vec<JsonParam<'_>> = params.iter().map(JsonParam).collect();
                let refs: Vec<&(dyn ToSql + Sync)> =
                    bound.iter().map(|p| p as &(dyn ToSql + Sync)).collect();

                let rows = client.query(&stmt, &refs).await?;
                if stmt.columns().is_empty() {
                    return Ok(RowSet::Empty);
                }
                let rows = rows
                    .iter()
                    .map(row_to_json)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(RowSet::Many(rows))
            })
            .await
        })
    }
}
