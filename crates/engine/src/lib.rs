//! Natural-language question to rows: prompt, complete, parse, guard, execute.

pub mod error;
pub mod executor;
pub mod guard;
pub mod parser;
pub mod prompt;

pub use error::{ErrorKind, GenerateSqlError};
pub use executor::QueryExecutor;
pub use guard::StatementGuard;

use common::types::{GeneratedQuery, Row};
use database_adapters::SharedDbAdapter;
use logging::timeit;
use shared_clients::openai::CompletionClient;
use std::sync::Arc;

/// Owns the completion client and the executor; cheap to clone into
/// request handlers.
#[derive(Clone)]
pub struct SqlGenerator {
    completion: Arc<dyn CompletionClient>,
    executor: QueryExecutor,
}

impl SqlGenerator {
    pub fn new(completion: Arc<dyn CompletionClient>, db: SharedDbAdapter) -> Self {
        Self {
            completion,
            executor: QueryExecutor::new(db),
        }
    }

    /// Ask the model for SQL answering `query`. Nothing is executed.
    pub async fn generate(&self, query: Option<&str>) -> Result<GeneratedQuery, GenerateSqlError> {
        let query = prompt::validate_query(query)?;
        tracing::debug!(query, "building prompt");
        let prompt = prompt::build_prompt(query)?;
        tracing::debug!(%prompt, "built completion prompt");

        let text = timeit!("sql completion", { self.completion.complete(&prompt).await })
            .map_err(|e| {
                tracing::warn!(error = %e, "completion request failed");
                GenerateSqlError::from(e)
            })?;

        let generated = parser::parse_completion(&text).map_err(|e| {
            tracing::warn!(error = %e, raw = %text, "could not parse completion");
            e
        })?;
        tracing::info!(
            sql = %generated.sql,
            params = generated.param_values.len(),
            "generated sql"
        );
        Ok(generated)
    }

    /// Generate SQL for `query` and run it, returning the rows.
    pub async fn run(&self, query: Option<&str>) -> Result<Vec<Row>, GenerateSqlError> {
        let generated = self.generate(query).await?;
        tracing::debug!(sql = %generated.sql, "guarding and executing generated sql");
        let rows = self.executor.execute(&generated).await.map_err(|e| {
            tracing::warn!(
                kind = %e.kind(),
                error = %e,
                sql = %generated.sql,
                "generated sql failed"
            );
            e
        })?;
        tracing::info!(rows = rows.len(), "generated sql executed");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::types::RowSet;
    use database_adapters::{AsyncDatabaseAdapter, DatabaseAdapterError};
    use serde_json::{json, Value};
    use shared_clients::openai::CompletionError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ScriptedModel {
        reply: Result<String, fn() -> CompletionError>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl ScriptedModel {
        fn answering(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }

        fn failing(err: fn() -> CompletionError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedModel {
        async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    struct RecordingDb {
        rows: RowSet,
        calls: Mutex<Vec<(String, Vec<Value>)>>,
    }

    #[async_trait]
    impl AsyncDatabaseAdapter for RecordingDb {
        async fn execute(&self, _sql: &str) -> Result<(), DatabaseAdapterError> {
            Ok(())
        }

        async fn query(&self, sql: &str, params: &[Value]) -> Result<RowSet, DatabaseAdapterError> {
            self.calls
                .lock()
                .unwrap()
                .push((sql.to_string(), params.to_vec()));
            Ok(self.rows.clone())
        }
    }

    fn db_returning(rows: RowSet) -> Arc<RecordingDb> {
        Arc::new(RecordingDb {
            rows,
            calls: Mutex::new(Vec::new()),
        })
    }

    #[tokio::test]
    async fn total_revenue_round_trip() {
        let model =
            ScriptedModel::answering(r#"{"sql":"SELECT SUM(total) FROM orders","paramValues":[]}"#);
        let sum = json!({"sum": "1250.00"}).as_object().cloned().unwrap();
        let db = db_returning(RowSet::Many(vec![sum.clone()]));
        let generator = SqlGenerator::new(model.clone(), db.clone());

        let rows = generator.run(Some("total revenue")).await.unwrap();

        assert_eq!(rows, vec![sum]);
        let prompt = model.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("total revenue"));
        assert!(prompt.contains(prompt::SCHEMA_DESCRIPTION));
        assert_eq!(
            *db.calls.lock().unwrap(),
            vec![("SELECT SUM(total) FROM orders".to_string(), Vec::<Value>::new())]
        );
    }

    #[tokio::test]
    async fn generate_does_not_touch_the_database() {
        let model = ScriptedModel::answering(
            r#"{"sql":"SELECT * FROM customers WHERE city = $1","paramValues":["Seattle"]}"#,
        );
        let db = db_returning(RowSet::Empty);
        let generated = SqlGenerator::new(model, db.clone())
            .generate(Some("customers in Seattle"))
            .await
            .unwrap();

        assert_eq!(generated.param_values, vec![json!("Seattle")]);
        assert!(db.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_request_skips_the_model() {
        let model = ScriptedModel::answering("{}");
        let generator = SqlGenerator::new(model.clone(), db_returning(RowSet::Empty));

        for query in [None, Some(""), Some("   ")] {
            let err = generator.run(query).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidRequest);
        }
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_completion_is_reported() {
        let model = ScriptedModel::answering("Sure! Here is your query: SELECT 1");
        let db = db_returning(RowSet::Empty);
        let err = SqlGenerator::new(model, db.clone())
            .run(Some("anything"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
        assert!(db.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn completion_failures_keep_their_category() {
        let generator = SqlGenerator::new(
            ScriptedModel::failing(|| CompletionError::missing_credential("no key")),
            db_returning(RowSet::Empty),
        );
        assert_eq!(
            generator.run(Some("q")).await.unwrap_err().kind(),
            ErrorKind::Configuration
        );

        let generator = SqlGenerator::new(
            ScriptedModel::failing(|| CompletionError::request("connection reset")),
            db_returning(RowSet::Empty),
        );
        assert_eq!(
            generator.run(Some("q")).await.unwrap_err().kind(),
            ErrorKind::Upstream
        );
    }

    #[tokio::test]
    async fn model_asking_for_a_write_is_stopped() {
        let model = ScriptedModel::answering(r#"{"sql":"DROP TABLE customers","paramValues":[]}"#);
        let db = db_returning(RowSet::Empty);
        let err = SqlGenerator::new(model, db.clone())
            .run(Some("clean up"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RejectedStatement);
        assert!(db.calls.lock().unwrap().is_empty());
    }
}
