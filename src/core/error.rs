use rusqlite;
use std::io;
use thiserror::Error;

/// Faults reported by a Document Store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    RusqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Store lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

impl StoreError {
    /// True when the backend refused the operation because it is momentarily busy.
    pub fn is_busy(&self) -> bool {
        match self {
            StoreError::RusqliteError(rusqlite::Error::SqliteFailure(code, _)) => matches!(
                code.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Request-level failures. Every variant maps to a distinct HTTP status.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("No route matches {method} {path}")]
    NoRouteMatch { method: String, path: String },
    #[error("Invalid resource reference: {0}")]
    InvalidResourceReference(String),
    #[error("Method {0} is not supported")]
    MethodNotAllowed(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },
    #[error("Unsupported attachment type: {0}")]
    UnsupportedAttachmentType(String),
    #[error("Store error during {op} at {location}: {source}")]
    Store {
        op: &'static str,
        location: String,
        #[source]
        source: StoreError,
    },
    #[error("Search backend error for {scope}: {source}")]
    SearchBackend {
        scope: String,
        #[source]
        source: StoreError,
    },
    #[error("Failed to read request body: {0}")]
    BodyRead(#[source] io::Error),
}

impl GatewayError {
    pub fn status(&self) -> u16 {
        match self {
            GatewayError::NoRouteMatch { .. }
            | GatewayError::InvalidResourceReference(_)
            | GatewayError::BodyRead(_) => 400,
            GatewayError::NotFound(_) => 404,
            GatewayError::MethodNotAllowed(_) => 405,
            GatewayError::PayloadTooLarge { .. } => 413,
            GatewayError::UnsupportedAttachmentType(_) => 415,
            GatewayError::Store { source, .. } | GatewayError::SearchBackend { source, .. } => {
                if source.is_busy() {
                    503
                } else {
                    502
                }
            }
        }
    }

    /// Stable machine-readable code, echoed in error response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::NoRouteMatch { .. } => "no_route_match",
            GatewayError::InvalidResourceReference(_) => "invalid_resource_reference",
            GatewayError::MethodNotAllowed(_) => "method_not_allowed",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::PayloadTooLarge { .. } => "payload_too_large",
            GatewayError::UnsupportedAttachmentType(_) => "unsupported_attachment_type",
            GatewayError::Store { .. } => "store_error",
            GatewayError::SearchBackend { .. } => "search_backend_error",
            GatewayError::BodyRead(_) => "body_read_error",
        }
    }
}

/// Process-level failures: startup, configuration, transport.
#[derive(Error, Debug)]
pub enum FormgateError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Server error: {0}")]
    ServerError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}
