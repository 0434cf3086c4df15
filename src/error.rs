//! Error types for framing, parsing, configuration and stage execution.
//!
//! Each stage of the system fails with its own error type so callers can
//! decide how much to recover: a [`FormatError`] only concerns one record,
//! while a [`ConfigurationError`] means no record can be processed at all.

use std::path::PathBuf;

use thiserror::Error;

/// A record could not be parsed into a [`crate::LogRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("cannot parse an empty record")]
    Empty,

    #[error("not enough fields: expected at least 5, found {found}")]
    NotEnoughFields { found: usize },

    #[error("could not parse date '{0}'")]
    InvalidDate(String),

    #[error("could not parse time '{0}'")]
    InvalidTime(String),

    #[error("could not parse source indicator '{0}'")]
    InvalidSourceIndicator(String),

    #[error("source line '{0}' is out of range")]
    InvalidLineNumber(String),

    #[error("could not parse log record")]
    Malformed,
}

/// The structured-data parser met a shape its grammar does not cover.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct SyntaxError {
    pub message: String,
    /// Byte offset into the parsed input.
    pub offset: usize,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// Dependency resolution walked deeper than the hop cap.
///
/// Raised for dependency cycles and for legitimately deep chains alike.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("maximum recursion limit exceeded ({limit} levels) while resolving dependencies")]
pub struct RecursionError {
    pub limit: usize,
}

/// The pipeline configuration cannot be turned into a runnable pipeline.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("failed to read pipeline configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed pipeline configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("a pipeline must have at least one stage")]
    Empty,

    #[error("invalid pipeline configuration:\n  {}", .0.join("\n  "))]
    Invalid(Vec<String>),

    #[error("{}", describe_dependency_failure(.cycle, .source))]
    Dependencies {
        #[source]
        source: RecursionError,
        /// Stage names forming a cycle, first name repeated at the end.
        /// Empty when the chain is merely too deep.
        cycle: Vec<String>,
    },
}

fn describe_dependency_failure(cycle: &[String], source: &RecursionError) -> String {
    if cycle.is_empty() {
        format!("unresolvable stage dependencies: {source}")
    } else {
        format!(
            "unresolvable stage dependencies: cycle {} ({source})",
            cycle.join(" -> ")
        )
    }
}

/// A stage failed while processing a record.
#[derive(Debug, Error)]
#[error("stage {stage}: {source}")]
pub struct StageExecutionError {
    pub stage: String,
    #[source]
    pub source: anyhow::Error,
}

/// Any failure surfaced while streaming records through a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Stage(#[from] StageExecutionError),

    #[error(transparent)]
    Recursion(#[from] RecursionError),
}
