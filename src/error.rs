//! Error taxonomy shared by every module of the crate.
//!
//! Each failure the matrix can report is its own variant so callers can match
//! on the kind of failure rather than on a message.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CharMatrixError>;

#[derive(Debug, Error)]
pub enum CharMatrixError {
    /// Integer key outside `0..len` of the bound taxon namespace.
    #[error("taxon index {index} is out of range for a namespace of {len} taxa")]
    IndexOutOfRange { index: i64, len: usize },

    /// String key with no matching label in the bound taxon namespace.
    #[error("no taxon labelled '{0}' in namespace")]
    LabelNotFound(String),

    /// Resolved taxon is not registered in the matrix's taxon namespace.
    #[error("taxon '{0}' is not in the matrix taxon namespace")]
    NotInNamespace(String),

    /// Key resolved to a taxon that has no stored sequence.
    #[error("no character sequence stored for taxon '{0}'")]
    MissingEntry(String),

    #[error("a different taxon labelled '{0}' is already in the namespace")]
    DuplicateLabel(String),

    #[error("sequences for '{left}' ({left_len} states) and '{right}' ({right_len} states) differ in length")]
    LengthMismatch {
        left: String,
        right: String,
        left_len: usize,
        right_len: usize,
    },

    #[error("sequence for taxon '{0}' holds codes or tokens and cannot be written as FASTA")]
    NonSymbolicSequence(String),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("tree error: {0}")]
    Tree(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CharMatrixError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        CharMatrixError::Parse { line, message: message.into() }
    }
}
