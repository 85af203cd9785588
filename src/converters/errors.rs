//! Error types for MusicXML → MNX conversion
//!
//! Import failures are either syntax errors (the text is not usable XML, or
//! not a score) or data errors (well-formed XML that breaks a musical
//! invariant). Export fails only on durations the target schema cannot name.

use thiserror::Error;

/// Top-level conversion error type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("MusicXML import failed: {0}")]
    Import(#[from] ImportError),

    #[error("MNX export failed: {0}")]
    Export(#[from] ExportError),

    #[error("JSON serialization failed: {0}")]
    Serialization(String),
}

/// Fatal importer errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImportError {
    /// Malformed XML, or a document that is not a score
    #[error("XML syntax error: {0}")]
    Syntax(String),

    /// Well-formed input violating a required invariant
    #[error("Invalid notation data: {0}")]
    Data(String),
}

impl ImportError {
    pub fn data(message: impl Into<String>) -> Self {
        ImportError::Data(message.into())
    }
}

/// Fatal exporter errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExportError {
    /// A rhythmic fraction with no MNX note value
    #[error("Invalid duration fraction {0}")]
    UnmappedDuration(String),
}
