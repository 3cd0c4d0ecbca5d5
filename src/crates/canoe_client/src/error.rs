use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::variant::ValueKind;

/// Result alias for session operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by a [`Session`](crate::Session).
///
/// Every public operation fails with exactly one of these kinds. Variants carry
/// the reference, name or path that was being acted on.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("cannot reach the bus tool: {0}")]
    Connection(String),
    #[error("configuration error ({}): {message}", display_path(.path))]
    Configuration {
        path: Option<PathBuf>,
        message: String,
    },
    #[error("measurement {operation} did not complete within {timeout:?}")]
    MeasurementTimeout {
        operation: &'static str,
        timeout: Duration,
    },
    #[error("{operation} requires a running measurement")]
    MeasurementNotRunning { operation: String },
    #[error("variable not found: {reference}")]
    VariableNotFound { reference: String },
    #[error("type mismatch on {reference}: expected {expected}, found {found}")]
    TypeMismatch {
        reference: String,
        expected: String,
        found: String,
    },
    #[error("unsupported value kind {kind} for {reference}")]
    UnsupportedType { reference: String, kind: String },
    #[error("CAPL function {name} is not in the allow-list")]
    UnauthorizedFunction { name: String },
    #[error("CAPL function {name} does not exist or is not compiled")]
    FunctionNotFound { name: String },
    #[error("CAPL function {name} failed: {message}")]
    FunctionFailed { name: String, message: String },
    #[error("database error ({}): {message}", .path.display())]
    Database { path: PathBuf, message: String },
}

/// Flat view of the error taxonomy for callers that only care about the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    Configuration,
    MeasurementTimeout,
    MeasurementNotRunning,
    VariableNotFound,
    TypeMismatch,
    UnsupportedType,
    UnauthorizedFunction,
    FunctionNotFound,
    FunctionFailed,
    Database,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Connection(_) => ErrorKind::Connection,
            ClientError::Configuration { .. } => ErrorKind::Configuration,
            ClientError::MeasurementTimeout { .. } => ErrorKind::MeasurementTimeout,
            ClientError::MeasurementNotRunning { .. } => ErrorKind::MeasurementNotRunning,
            ClientError::VariableNotFound { .. } => ErrorKind::VariableNotFound,
            ClientError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ClientError::UnsupportedType { .. } => ErrorKind::UnsupportedType,
            ClientError::UnauthorizedFunction { .. } => ErrorKind::UnauthorizedFunction,
            ClientError::FunctionNotFound { .. } => ErrorKind::FunctionNotFound,
            ClientError::FunctionFailed { .. } => ErrorKind::FunctionFailed,
            ClientError::Database { .. } => ErrorKind::Database,
        }
    }

    pub(crate) fn connection(message: impl Into<String>) -> Self {
        ClientError::Connection(message.into())
    }

    pub(crate) fn configuration(path: Option<&Path>, message: impl Into<String>) -> Self {
        ClientError::Configuration {
            path: path.map(Path::to_path_buf),
            message: message.into(),
        }
    }

    pub(crate) fn not_running(operation: impl Into<String>) -> Self {
        ClientError::MeasurementNotRunning {
            operation: operation.into(),
        }
    }

    pub(crate) fn variable_not_found(reference: impl Into<String>) -> Self {
        ClientError::VariableNotFound {
            reference: reference.into(),
        }
    }

    pub(crate) fn type_mismatch(
        reference: impl Into<String>,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        ClientError::TypeMismatch {
            reference: reference.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub(crate) fn unsupported(reference: impl Into<String>, kind: ValueKind) -> Self {
        ClientError::UnsupportedType {
            reference: reference.into(),
            kind: kind.to_string(),
        }
    }

    pub(crate) fn function_not_found(name: impl Into<String>) -> Self {
        ClientError::FunctionNotFound { name: name.into() }
    }

    pub(crate) fn function_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        ClientError::FunctionFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    pub(crate) fn database(path: &Path, message: impl Into<String>) -> Self {
        ClientError::Database {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => path.display().to_string(),
        None => "active configuration".to_string(),
    }
}
