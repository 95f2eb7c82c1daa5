use common::error::DiagnosticMessage;
use database_adapters::DatabaseAdapterError;
use shared_clients::openai::CompletionError;
use std::fmt;
use thiserror::Error;

/// Everything that can stop a natural-language question from becoming rows.
#[derive(Debug, Error)]
pub enum GenerateSqlError {
    #[error("invalid request: {context}")]
    InvalidRequest { context: DiagnosticMessage },
    #[error("configuration error: {source}")]
    Configuration {
        #[source]
        source: CompletionError,
    },
    #[error("completion failed: {source}")]
    Upstream {
        #[source]
        source: CompletionError,
    },
    #[error("malformed model response: {context}")]
    MalformedResponse { context: DiagnosticMessage },
    #[error("generated statement rejected: {context}")]
    RejectedStatement { context: DiagnosticMessage },
    #[error("query execution failed: {source}")]
    QueryExecution {
        #[source]
        source: DatabaseAdapterError,
    },
    #[error("database unavailable: {source}")]
    DatabaseUnavailable {
        #[source]
        source: DatabaseAdapterError,
    },
}

/// Coarse category of a [`GenerateSqlError`], used for logging and for
/// choosing an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    Configuration,
    Upstream,
    MalformedResponse,
    RejectedStatement,
    QueryExecution,
    DatabaseUnavailable,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidRequest => "InvalidRequest",
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Upstream => "UpstreamError",
            ErrorKind::MalformedResponse => "MalformedResponse",
            ErrorKind::RejectedStatement => "RejectedStatement",
            ErrorKind::QueryExecution => "QueryExecutionError",
            ErrorKind::DatabaseUnavailable => "DatabaseUnavailable",
        };
        f.write_str(name)
    }
}

impl GenerateSqlError {
    #[track_caller]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn rejected_statement(message: impl Into<String>) -> Self {
        Self::RejectedStatement {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Upstream { .. } => ErrorKind::Upstream,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::RejectedStatement { .. } => ErrorKind::RejectedStatement,
            Self::QueryExecution { .. } => ErrorKind::QueryExecution,
            Self::DatabaseUnavailable { .. } => ErrorKind::DatabaseUnavailable,
        }
    }
}

impl From<CompletionError> for GenerateSqlError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::MissingCredential { .. } => Self::Configuration { source: err },
            _ => Self::Upstream { source: err },
        }
    }
}

impl From<DatabaseAdapterError> for GenerateSqlError {
    fn from(err: DatabaseAdapterError) -> Self {
        if err.is_rejection() {
            Self::QueryExecution { source: err }
        } else {
            Self::DatabaseUnavailable { source: err }
        }
    }
}
