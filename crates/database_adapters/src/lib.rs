pub mod bootstrap;
pub mod decode;
pub mod params;
pub mod postgres;

use crate::postgres::PostgresAdapter;
use async_trait::async_trait;
use common::config::PostgresConfig;
use common::error::DiagnosticMessage;
use common::types::RowSet;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseAdapterError {
    #[error("syntax error: {context}")]
    SyntaxError { context: DiagnosticMessage },
    /// The server refused the statement (permissions, constraints, unknown
    /// relations, type mismatches, ...).
    #[error("statement rejected: {context}")]
    Rejected {
        context: DiagnosticMessage,
        code: Option<String>,
    },
    #[error("invalid parameters: {context}")]
    InvalidParameters { context: DiagnosticMessage },
    /// The statement ran but a result column has no JSON representation.
    #[error("unsupported column: {context}")]
    UnsupportedColumn { context: DiagnosticMessage },
    #[error("connection error: {context}")]
    Connection { context: DiagnosticMessage },
    #[error("timed out: {context}")]
    Timeout { context: DiagnosticMessage },
    #[error("configuration error: {context}")]
    Config { context: DiagnosticMessage },
    #[error("unexpected error: {context}")]
    Unexpected { context: DiagnosticMessage },
}

impl DatabaseAdapterError {
    #[track_caller]
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::SyntaxError {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn rejected(message: impl Into<String>, code: Option<String>) -> Self {
        Self::Rejected {
            context: DiagnosticMessage::new(message.into()),
            code,
        }
    }

    #[track_caller]
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn unsupported_column(message: impl Into<String>) -> Self {
        Self::UnsupportedColumn {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    /// True when the database looked at the statement and said no, as
    /// opposed to never being reachable.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::SyntaxError { .. }
                | Self::Rejected { .. }
                | Self::InvalidParameters { .. }
                | Self::UnsupportedColumn { .. }
        )
    }
}

/// The only way SQL reaches the relational store.
#[async_trait]
pub trait AsyncDatabaseAdapter: Send + Sync {
    /// Run one or more statements without parameters or results.
    async fn execute(&self, sql: &str) -> Result<(), DatabaseAdapterError>;

    /// Run a single statement, binding `params` positionally to `$1..$n`.
    async fn query(&self, sql: &str, params: &[Value]) -> Result<RowSet, DatabaseAdapterError>;
}

pub type SharedDbAdapter = Arc<dyn AsyncDatabaseAdapter>;

pub fn create_db_adapter(cfg: &PostgresConfig) -> Result<SharedDbAdapter, DatabaseAdapterError> {
    Ok(Arc::new(PostgresAdapter::new(cfg)?))
}
