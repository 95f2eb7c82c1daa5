use crate::error::GenerateSqlError;
use crate::guard::StatementGuard;
use common::types::{GeneratedQuery, Row};
use database_adapters::SharedDbAdapter;

/// Runs a [`GeneratedQuery`] against the shared pool and always hands back
/// an array of rows.
#[derive(Clone)]
pub struct QueryExecutor {
    db: SharedDbAdapter,
    guard: StatementGuard,
}

impl QueryExecutor {
    pub fn new(db: SharedDbAdapter) -> Self {
        Self {
            db,
            guard: StatementGuard::new(),
        }
    }

    pub async fn execute(&self, query: &GeneratedQuery) -> Result<Vec<Row>, GenerateSqlError> {
        self.guard.check(&query.sql)?;
        let row_set = self.db.query(&query.sql, &query.param_values).await?;
        Ok(row_set.into_rows())
    }
}
