use std::{error::Error, io};

use thiserror::Error;

use crate::fs::RunId;

pub(crate) type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Failure of a group-by invocation.
///
/// Every variant is fatal: once a [`GroupByError`] is returned, the scratch
/// directory of the invocation has been (or is being) removed and the output
/// stream yields nothing more.
#[derive(Debug, Error)]
pub enum GroupByError {
    #[error("input error: {0}")]
    Input(#[source] BoxError),
    #[error("storage error: {0}")]
    Storage(#[from] io::Error),
    #[error("encode error: {0}")]
    Encode(#[source] BoxError),
    #[error("decode error: {0}")]
    Decode(#[source] BoxError),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("consistency violation in run {run}: {reason}")]
    Consistency { run: RunId, reason: String },
}

impl GroupByError {
    pub(crate) fn input<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        GroupByError::Input(Box::new(err))
    }

    pub(crate) fn encode<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        GroupByError::Encode(Box::new(err))
    }

    pub(crate) fn decode<E>(err: E) -> Self
    where
        E: Error + Send + Sync + 'static,
    {
        GroupByError::Decode(Box::new(err))
    }

    pub(crate) fn consistency(run: RunId, reason: impl Into<String>) -> Self {
        GroupByError::Consistency {
            run,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_hashmap_entries must be at least 1, got {0}")]
    MaxHashmapEntries(usize),
    #[error("max_number_of_files must be at least 2, got {0}")]
    MaxNumberOfFiles(usize),
    #[error("max_memory must be at least 1 byte")]
    MaxMemory,
    #[error("{name} buffer size must be at least 1 byte")]
    BufferSize { name: &'static str },
}
