use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone)]
pub enum Error {
    RecordLockNotSupported,
    Cancelled,
    ColumnNotFound(String),
    TypeMismatch { expected: String, actual: String },
    UnsupportedFeature(String),
    Internal(String),
}

impl Error {
    pub fn record_lock_not_supported() -> Self {
        Error::RecordLockNotSupported
    }

    pub fn cancelled() -> Self {
        Error::Cancelled
    }

    pub fn column_not_found(name: impl Into<String>) -> Self {
        Error::ColumnNotFound(name.into())
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::UnsupportedFeature(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::RecordLockNotSupported => write!(f, "Record lock not supported"),
            Error::Cancelled => write!(f, "Request cancelled"),
            Error::ColumnNotFound(name) => write!(f, "Column not found: {}", name),
            Error::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, actual)
            }
            Error::UnsupportedFeature(msg) => write!(f, "Unsupported feature: {}", msg),
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
