//! Error types for mxfcheck-tree.

use thiserror::Error;

use mxfcheck_klv::KlvError;

/// Errors raised while building the structural tree or running the harness.
///
/// Test failures are never errors: they are recorded in the report.
#[derive(Debug, Error)]
#[must_use]
pub enum TreeError {
    #[error("no mxf data found in byte stream")]
    NoDataFound,

    #[error("invalid mxf file structure, {0}")]
    InvalidStructure(String),

    #[error("klv stream ended unexpectedly while {0}")]
    Interrupted(&'static str),

    #[error(transparent)]
    Klv(#[from] KlvError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("packet reader task failed: {0}")]
    ReaderTask(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error writing report: {0}")]
    Report(String),
}

/// Result type alias for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;

/// Errors from the whole-group decoding entry points.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unable to decode group, unknown local encoding byte {0:#04x}")]
    UnknownEncoding(u8),

    #[error("no group for the key {0} was found")]
    UnknownGroup(String),
}

/// Errors from the declarative search surfaces.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("malformed command of {0}, expected \"{1}\" as a minimum command")]
    Malformed(String, &'static str),

    #[error("first word not select")]
    FirstWordNotSelect,

    #[error("first word is not select, please use the correct formatting")]
    FirstWordNotSelectPartitions,

    #[error("invalid field of \"{0}\"")]
    UnknownTable(String),

    #[error("unknown field \"{0}\"")]
    UnknownField(String),

    #[error("unknown comparison operator \"{0}\"")]
    UnknownOperator(String),

    #[error("unknown comparison {0}")]
    UnknownConjunction(String),
}
