use std::fmt;

/// Result type for PGQ operations
pub type Result<T> = std::result::Result<T, PgqError>;

/// Main error type for the PGQ actor-learner
#[derive(Debug, Clone)]
pub enum PgqError {
    /// Invalid dimensions for operations
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// IO errors (file operations)
    IoError(String),

    /// Serialization/deserialization errors
    SerializationError(String),

    /// Numerical computation errors
    NumericalError(String),

    /// Empty buffer or container
    EmptyBuffer(String),

    /// Environment step failure
    EmulatorError(String),

    /// Training error
    TrainingError(String),
}

impl fmt::Display for PgqError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PgqError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            PgqError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            PgqError::IoError(msg) => write!(f, "IO error: {}", msg),
            PgqError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            PgqError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            PgqError::EmptyBuffer(msg) => write!(f, "Empty buffer: {}", msg),
            PgqError::EmulatorError(msg) => write!(f, "Emulator error: {}", msg),
            PgqError::TrainingError(msg) => write!(f, "Training error: {}", msg),
        }
    }
}

impl std::error::Error for PgqError {}

// Conversion from std::io::Error
impl From<std::io::Error> for PgqError {
    fn from(err: std::io::Error) -> Self {
        PgqError::IoError(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for PgqError {
    fn from(err: serde_json::Error) -> Self {
        PgqError::SerializationError(err.to_string())
    }
}

// Helper functions for common error patterns
impl PgqError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        PgqError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        PgqError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
