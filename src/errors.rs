use thiserror::Error;

/// Errors produced by the zakat ledger.
///
/// The first five variants mirror what a user can act on (bad input, missing
/// record, forbidden state change, storage failure, rejected upload); the
/// rest are ambient failures of the service itself.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid input
    #[error("{message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// A referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record that was looked up
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The operation is not allowed in the record's current state
    #[error("{message}")]
    Conflict {
        /// Human-readable reason
        message: String,
    },

    /// Database failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Proof photo rejected or could not be stored
    #[error("Upload error: {message}")]
    Upload {
        /// Human-readable reason
        message: String,
    },

    /// No valid session
    #[error("Not authenticated")]
    Unauthorized,

    /// Session is valid but the user lacks the admin role
    #[error("Access denied: administrators only")]
    Forbidden,

    /// Bad or unreadable configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable reason
        message: String,
    },

    /// Password hashing or verification failed for a reason other than a mismatch
    #[error("Password hashing error: {message}")]
    PasswordHash {
        /// Human-readable reason
        message: String,
    },

    /// Export could not be written
    #[error("Export error: {message}")]
    Export {
        /// Human-readable reason
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Upload`].
    pub fn upload(message: impl Into<String>) -> Self {
        Self::Upload {
            message: message.into(),
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for Error {
    fn from(value: rust_xlsxwriter::XlsxError) -> Self {
        Self::Export {
            message: value.to_string(),
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
