use crate::error::diagnostics::DiagnosticMessage;
use std::error::Error as StdError;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .fields.join(", "))]
    MissingFields { fields: Vec<String> },
    #[error("invalid value for {field}: {context}")]
    InvalidValue {
        field: String,
        context: DiagnosticMessage,
    },
    #[error("malformed connection string: {context}")]
    MalformedConnectionString { context: DiagnosticMessage },
    #[error("could not read env file: {context}")]
    EnvFile {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl ConfigError {
    pub fn missing_fields(fields: Vec<String>) -> Self {
        Self::MissingFields { fields }
    }

    #[track_caller]
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn malformed_connection_string(message: impl Into<String>) -> Self {
        Self::MalformedConnectionString {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn env_file(path: impl AsRef<Path>, err: dotenv::Error) -> Self {
        let message = format!("'{}': {}", path.as_ref().display(), err);
        Self::EnvFile {
            context: DiagnosticMessage::new(message),
            source: Some(Box::new(err)),
        }
    }
}
