use std::io;

use thiserror::Error;

/// Boxed underlying cause of a storage failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
/// Batch error
///
/// Every variant is fatal for the chunk it happens in and for the whole run:
/// nothing is skipped or retried.
pub enum BatchError {
    /// The source could not be opened or read.
    #[error("Resource {resource} unavailable: {source}")]
    Resource {
        resource: String,
        #[source]
        source: io::Error,
    },

    /// A line could not be tokenized or mapped onto an item.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: u64, message: String },

    /// The processor rejected an item.
    ///
    /// `chunk` is the 1-based chunk number, `position` the 1-based position of
    /// the item among all items read by the step.
    #[error("Invalid item {position} in chunk {chunk}: {source}")]
    Validation {
        chunk: usize,
        position: usize,
        #[source]
        source: ValidationError,
    },

    /// The writer failed to persist a chunk. Nothing of that chunk is stored.
    #[error("Chunk {chunk} not persisted: {source}")]
    Storage {
        chunk: usize,
        #[source]
        source: StorageError,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Precondition violated by an item handed to a processor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("field `{field}` {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn missing(field: &'static str) -> Self {
        Self {
            field,
            reason: "is missing".to_owned(),
        }
    }
}

/// Failure of a writer to persist a batch of items.
#[derive(Error, Debug)]
#[error("writing {rows} row(s) to {target} failed: {source}")]
pub struct StorageError {
    /// Table, file or collection the items were written to
    pub target: String,
    /// Number of items in the failed batch
    pub rows: usize,
    #[source]
    pub source: BoxError,
}

impl StorageError {
    pub fn new(target: impl Into<String>, rows: usize, source: impl Into<BoxError>) -> Self {
        Self {
            target: target.into(),
            rows,
            source: source.into(),
        }
    }
}
