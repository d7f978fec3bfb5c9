//! Error types for record decoding and mapping.
//!
//! This module provides [`MarcError`] for failures while decoding source
//! records, [`MappingError`] for failures of the mapping core, and the
//! [`Result`] / [`MappingResult`] convenience types.

use thiserror::Error;

/// Error type for source record decoding.
///
/// Represents the ways a binary or XML source record can be malformed.
#[derive(Error, Debug)]
pub enum MarcError {
    /// Error indicating an invalid or malformed MARC record.
    #[error("Invalid MARC record: {0}")]
    InvalidRecord(String),

    /// Error indicating an invalid leader (24-byte header).
    #[error("Invalid leader: {0}")]
    InvalidLeader(String),

    /// Error indicating an invalid field structure.
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// Error during parsing of MARC data.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Error indicating a truncated or incomplete record.
    #[error("Truncated record: {0}")]
    TruncatedRecord(String),

    /// IO error from the underlying source.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Error type for the mapping core.
///
/// Every variant except [`MappingError::ReferenceData`] rejects a single
/// record; the run continues with the next one.
#[derive(Error, Debug)]
pub enum MappingError {
    /// None of the fields the configured flavour reads is present.
    #[error("No legacy identifier found for ILS flavour {flavour}")]
    MissingIdentifier {
        /// The flavour whose strategy came up empty.
        flavour: String,
    },

    /// The configured ILS flavour is not one of the known strategies.
    #[error("ILS flavour {0} is not configured")]
    UnknownFlavour(String),

    /// The finished instance violates a required-attribute invariant.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The reference data snapshot is unusable. Fatal for the whole run.
    #[error("Reference data error: {0}")]
    ReferenceData(String),

    /// A condition function rejected its input.
    #[error("Condition {function} failed: {message}")]
    Condition {
        /// Name of the failing function.
        function: String,
        /// What went wrong.
        message: String,
    },

    /// The source record itself could not be decoded.
    #[error(transparent)]
    Source(#[from] MarcError),
}

impl MappingError {
    /// Short, stable label used when counting failures in the migration report.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            MappingError::MissingIdentifier { .. } => "Missing legacy identifier",
            MappingError::UnknownFlavour(_) => "Unknown ILS flavour",
            MappingError::Validation(_) => "Validation error",
            MappingError::ReferenceData(_) => "Reference data error",
            MappingError::Condition { .. } => "Condition failure",
            MappingError::Source(_) => "Unreadable source record",
        }
    }
}

/// Convenience type alias for [`std::result::Result`] with [`MarcError`].
pub type Result<T> = std::result::Result<T, MarcError>;

/// Convenience type alias for [`std::result::Result`] with [`MappingError`].
pub type MappingResult<T> = std::result::Result<T, MappingError>;
