use std::fmt;
use thiserror::Error;

/// Well-known transport/store failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ConnectionLost,
    Timeout,
    DnsFailure,
    Unavailable,
    DeadlineExceeded,
    PermissionDenied,
    NotFound,
    Conflict,
    InvalidData,
    Internal,
}

impl ErrorCode {
    /// Transient failures worth another attempt
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorCode::ConnectionLost
                | ErrorCode::Timeout
                | ErrorCode::DnsFailure
                | ErrorCode::Unavailable
                | ErrorCode::DeadlineExceeded
        )
    }

    /// Classify an HTTP status returned by a store or quota service
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 | 403 => ErrorCode::PermissionDenied,
            404 => ErrorCode::NotFound,
            408 => ErrorCode::Timeout,
            409 => ErrorCode::Conflict,
            400 | 422 => ErrorCode::InvalidData,
            502 | 503 => ErrorCode::Unavailable,
            504 => ErrorCode::DeadlineExceeded,
            _ => ErrorCode::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::ConnectionLost => "connection lost",
            ErrorCode::Timeout => "timeout",
            ErrorCode::DnsFailure => "dns failure",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::DeadlineExceeded => "deadline exceeded",
            ErrorCode::PermissionDenied => "permission denied",
            ErrorCode::NotFound => "not found",
            ErrorCode::Conflict => "conflict",
            ErrorCode::InvalidData => "invalid data",
            ErrorCode::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Error raised by a store, quota service or match factory
#[derive(Debug, Clone, Error)]
#[error("{code}: {message}")]
pub struct StoreError {
    pub code: ErrorCode,
    pub message: String,
}

impl StoreError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let code = match &err {
            sqlx::Error::Io(io) => match io.kind() {
                std::io::ErrorKind::TimedOut => ErrorCode::Timeout,
                _ => ErrorCode::ConnectionLost,
            },
            sqlx::Error::PoolTimedOut => ErrorCode::Timeout,
            sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => ErrorCode::Unavailable,
            sqlx::Error::RowNotFound => ErrorCode::NotFound,
            sqlx::Error::Database(db) => match db.code().as_deref() {
                // admin_shutdown, crash_shutdown, cannot_connect_now
                Some("57P01") | Some("57P02") | Some("57P03") => ErrorCode::Unavailable,
                // query_canceled (statement_timeout)
                Some("57014") => ErrorCode::DeadlineExceeded,
                Some(code) if code.starts_with("08") => ErrorCode::ConnectionLost,
                Some("23505") => ErrorCode::Conflict,
                _ => ErrorCode::Internal,
            },
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => ErrorCode::InvalidData,
            _ => ErrorCode::Internal,
        };
        StoreError::new(code, err.to_string())
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        let code = if err.is_timeout() {
            ErrorCode::Timeout
        } else if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
            ErrorCode::ConnectionLost
        } else {
            ErrorCode::Internal
        };
        StoreError::new(code, err.to_string())
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        let code = if err.is_timeout() {
            ErrorCode::Timeout
        } else if err.is_connect() {
            // reqwest folds resolver failures into connect errors
            if format!("{:?}", err).contains("dns error") {
                ErrorCode::DnsFailure
            } else {
                ErrorCode::ConnectionLost
            }
        } else if let Some(status) = err.status() {
            ErrorCode::from_http_status(status.as_u16())
        } else if err.is_decode() {
            ErrorCode::InvalidData
        } else {
            ErrorCode::Internal
        };
        StoreError::new(code, err.to_string())
    }
}
