use crate::{AsyncDatabaseAdapter, DatabaseAdapterError};
use logging::timeit;

/// Idempotent schema for the demo: the four tables the SQL prompt describes,
/// `get_customers()`, and a handful of seed rows when the tables are empty.
pub const BOOTSTRAP_SQL: &str = include_str!("../sql/bootstrap.sql");

pub async fn initialize_database(
    adapter: &dyn AsyncDatabaseAdapter,
) -> Result<(), DatabaseAdapterError> {
    timeit!("database bootstrap", {
        adapter.execute(BOOTSTRAP_SQL).await
    })
}
