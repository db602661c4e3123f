//! Common error types for the membership services

use thiserror::Error;

/// Common result type for membership operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the membership crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or malformed field in a submission
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Insert attempted on a value that already carries a store-assigned id
    #[error("cannot insert a {0} row because ID already has a value")]
    IdAlreadySet(&'static str),

    /// Note or issue association is inconsistent
    #[error(transparent)]
    Association(#[from] AssociationError),

    /// Document store communication failure
    #[error("Document store error: {0}")]
    DocumentStore(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Partial or unknown association between a note/issue and another entity
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssociationError {
    #[error("association entity not specified")]
    NotSpecified,

    #[error("association entity ID not specified")]
    IdNotSpecified,

    #[error("association entity unknown/invalid: {0:?}")]
    Unknown(String),

    #[error("cannot associate issue with another entity unless a member id is specified")]
    NoMember,
}

impl Error {
    /// True when the error signals an absent primary record
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
