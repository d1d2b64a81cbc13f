//! Error handling utilities for the rflect application.
//!
//! This module provides the central error type `AppError` which represents all
//! possible error conditions that might occur in the application, as well as the
//! convenience type alias `AppResult` for functions that can return these errors.
//!
//! Storage failures are grouped in [`StoreError`] so that bulk operations
//! (listing, reconciliation) can collect them per record and keep going,
//! while single-record operations return them straight to the caller.

use crate::store::Backend;
use std::io;
use thiserror::Error;

/// Represents specific error cases that can occur when interacting with external editors.
///
/// # Examples
///
/// ```
/// use rflect::errors::EditorError;
/// use std::io::{self, ErrorKind};
///
/// let io_error = io::Error::new(ErrorKind::NotFound, "command not found");
/// let error = EditorError::CommandNotFound {
///     command: "vim".to_string(),
///     source: io_error,
/// };
///
/// assert!(format!("{}", error).contains("not found"));
/// assert!(format!("{}", error).contains("vim"));
/// ```
#[derive(Debug, Error)]
pub enum EditorError {
    /// Error when the specified editor command cannot be found.
    #[error("Editor command '{command}' not found: {source}. Please check that the editor is installed and available in your PATH.")]
    CommandNotFound {
        /// The editor command that was not found
        command: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Error when the editor command fails to execute due to other I/O errors.
    #[error("Failed to execute editor '{command}': {source}. Please check system resources or editor installation.")]
    ExecutionFailed {
        /// The editor command that failed to execute
        command: String,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Error when the editor exits with a non-zero status code.
    #[error("Editor '{command}' exited with non-zero status code: {status_code}. Your response was not saved.")]
    NonZeroExit {
        /// The editor command that exited with a non-zero status
        command: String,
        /// The exit status code
        status_code: i32,
    },
}

/// Failures of the entry stores.
///
/// # Examples
///
/// ```
/// use rflect::errors::StoreError;
///
/// let error = StoreError::DuplicateKey { key: "01-15-2024-0930".to_string() };
/// assert!(format!("{}", error).contains("01-15-2024-0930"));
/// ```
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend location is missing or cannot be reached.
    #[error("{backend} storage is unavailable: {reason}")]
    StorageUnavailable {
        /// Which backend failed
        backend: Backend,
        /// What went wrong
        reason: String,
    },

    /// A record with the same key already exists in the target backend.
    #[error("An entry with key '{key}' already exists")]
    DuplicateKey {
        /// The colliding key
        key: String,
    },

    /// A stored record could not be read back as an entry.
    #[error("Unreadable entry record '{record}': {reason}")]
    MalformedRecord {
        /// File name or document id of the record
        record: String,
        /// Parse failure
        reason: String,
    },

    /// A record points at something the destination does not have.
    #[error("Entry record '{record}' refers to missing {reference}")]
    ReferenceNotFound {
        /// File name or document id of the record
        record: String,
        /// Description of the missing reference
        reference: String,
    },
}

/// Represents specific error cases that can occur during remote store operations.
///
/// # Examples
///
/// ```
/// use rflect::errors::DatabaseError;
///
/// let error = DatabaseError::NotFound("User abc not found".to_string());
/// assert!(format!("{}", error).contains("not found"));
/// ```
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// SQLite database error.
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("Failed to get connection from pool: {0}\n\nThe remote store may be busy or unreachable.")]
    Pool(#[from] r2d2::Error),

    /// Requested record not found in the database.
    #[error("Record not found: {0}")]
    NotFound(String),
}

/// Represents all possible errors that can occur in the rflect application.
///
/// # Examples
///
/// ```
/// use rflect::errors::AppError;
///
/// let error = AppError::Validation("Provide a response.".to_string());
/// assert_eq!(format!("{}", error), "Invalid input: Provide a response.");
/// ```
#[derive(Debug, Error)]
pub enum AppError {
    /// Errors related to configuration loading or validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input/output errors from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// User input rejected before any state was touched.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Entry store failures.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Remote store failures not covered by [`StoreError`].
    #[error("Remote store error: {0}")]
    Database(#[from] DatabaseError),

    /// Errors when interacting with the text editor.
    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),

    /// Settings or catalog documents that could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A type alias for `Result<T, AppError>` to simplify function signatures.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;
    use std::io;

    #[test]
    fn test_app_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_error: AppError = io_error.into();

        match app_error {
            AppError::Io(inner) => {
                assert_eq!(inner.kind(), io::ErrorKind::NotFound);
            }
            _ => panic!("Expected AppError::Io variant"),
        }
    }

    #[test]
    fn test_app_error_display() {
        let config_error = AppError::Config("Invalid configuration".to_string());
        assert_eq!(
            format!("{}", config_error),
            "Configuration error: Invalid configuration"
        );

        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "permission denied");
        let app_io_error = AppError::Io(io_error);
        assert_eq!(format!("{}", app_io_error), "I/O error: permission denied");

        let validation = AppError::Validation("Goal target must be a number".to_string());
        assert_eq!(
            format!("{}", validation),
            "Invalid input: Goal target must be a number"
        );
    }

    #[test]
    fn test_store_error_variants() {
        let error = StoreError::StorageUnavailable {
            backend: Backend::Local,
            reason: "entries directory missing".to_string(),
        };
        assert!(format!("{}", error).contains("local storage is unavailable"));
        assert!(format!("{}", error).contains("entries directory missing"));

        let error = StoreError::DuplicateKey {
            key: "03-05-2024-0812".to_string(),
        };
        assert!(format!("{}", error).contains("already exists"));

        let error = StoreError::MalformedRecord {
            record: "broken.json".to_string(),
            reason: "expected value at line 1 column 1".to_string(),
        };
        assert!(format!("{}", error).contains("broken.json"));
        assert!(format!("{}", error).contains("line 1"));

        let error = StoreError::ReferenceNotFound {
            record: "01-01-2024-0900.json".to_string(),
            reference: "prompt 'What made you smile?'".to_string(),
        };
        assert!(format!("{}", error).contains("01-01-2024-0900.json"));
        assert!(format!("{}", error).contains("What made you smile?"));
    }

    #[test]
    fn test_store_error_conversion_to_app_error() {
        let app_error: AppError = StoreError::DuplicateKey {
            key: "k".to_string(),
        }
        .into();

        match app_error {
            AppError::Store(StoreError::DuplicateKey { key }) => assert_eq!(key, "k"),
            _ => panic!("Expected AppError::Store(DuplicateKey)"),
        }
    }

    #[test]
    fn test_editor_error_source_chaining() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "command not found");
        let editor_error = EditorError::CommandNotFound {
            command: "vim".to_string(),
            source: io_error,
        };

        let source = editor_error
            .source()
            .expect("EditorError::CommandNotFound should have a source");
        let source_io_error = source
            .downcast_ref::<io::Error>()
            .expect("Source should be an io::Error");
        assert_eq!(source_io_error.kind(), io::ErrorKind::NotFound);

        let error = EditorError::NonZeroExit {
            command: "vim".to_string(),
            status_code: 1,
        };
        assert!(error.source().is_none());
        assert!(format!("{}", error).contains("non-zero status code: 1"));
    }

    #[test]
    fn test_database_error_wrapping() {
        let app_error: AppError = DatabaseError::NotFound("user 42".to_string()).into();
        let message = format!("{}", app_error);
        assert!(message.contains("Remote store error"));
        assert!(message.contains("user 42"));
    }

    #[test]
    fn test_result_combinators() {
        let io_result: Result<(), io::Error> = Err(io::Error::other("test error"));
        let app_result: AppResult<()> = io_result.map_err(AppError::Io);

        match app_result {
            Err(AppError::Io(inner)) => {
                assert_eq!(inner.kind(), io::ErrorKind::Other);
            }
            _ => panic!("Expected AppError::Io variant"),
        }
    }
}
