//! Error types for document loading and reference resolution.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = DocsError> = std::result::Result<T, E>;

/// Broad category of a [`DocsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed JSON text.
    Decode,
    /// A resource, pointer target or identifier that does not exist.
    NotFound,
    /// A structurally illegal document or a reference cycle.
    Reference,
    /// Bad input from the caller, such as an unparsable URI.
    Usage,
}

/// Errors raised while loading, dereferencing or querying documents.
#[derive(Debug, Error)]
pub enum DocsError {
    // Decode errors
    #[error("invalid JSON in {uri}: {source}")]
    Decode {
        uri: String,
        #[source]
        source: serde_json::Error,
    },

    // Not found errors
    #[error("loading external resources not permitted: {uri}")]
    LoaderRefused { uri: String },

    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("resource {uri} not loaded")]
    NotLoaded { uri: String },

    #[error("could not find id={id} in document")]
    IdNotFound { id: String },

    #[error("could not find {pointer} in document: failed at {at}")]
    PointerNotFound { pointer: String, at: String },

    #[error("could not find {pointer} in document: encountered a reference at {at}")]
    ThroughReference { pointer: String, at: String },

    // Reference errors
    #[error("illegal document: an object may not have both of '{id_prop}' and '{ref_prop}'")]
    IdWithRef { id_prop: String, ref_prop: String },

    #[error("duplicate id '{id}' found in document")]
    DuplicateId { id: String },

    #[error("illegal id '{id}': ids must match {pattern}")]
    IllegalId { id: String, pattern: &'static str },

    #[error("JSON Reference loop detected at {uri}")]
    ReferenceLoop { uri: String },

    #[error("value at {pointer} is cyclic and cannot be materialized")]
    Cycle { pointer: String },

    // Usage errors
    #[error("invalid URI '{uri}': {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("invalid fragment '{fragment}': not UTF-8 after percent-decoding")]
    InvalidFragment { fragment: String },
}

impl DocsError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DocsError::Decode { .. } => ErrorKind::Decode,
            DocsError::LoaderRefused { .. }
            | DocsError::FileNotFound { .. }
            | DocsError::ReadError { .. }
            | DocsError::NotLoaded { .. }
            | DocsError::IdNotFound { .. }
            | DocsError::PointerNotFound { .. }
            | DocsError::ThroughReference { .. } => ErrorKind::NotFound,
            #[cfg(feature = "remote")]
            DocsError::NetworkError { .. } => ErrorKind::NotFound,
            DocsError::IdWithRef { .. }
            | DocsError::DuplicateId { .. }
            | DocsError::IllegalId { .. }
            | DocsError::ReferenceLoop { .. }
            | DocsError::Cycle { .. } => ErrorKind::Reference,
            DocsError::InvalidUri { .. } | DocsError::InvalidFragment { .. } => ErrorKind::Usage,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::NotFound => 3,
            _ => 2,
        }
    }
}
