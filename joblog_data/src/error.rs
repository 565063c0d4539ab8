use std::{io, path::PathBuf};

use thiserror::Error;

use crate::misc::parsing::{DurationParseError, ReqMemParseError};

/// Problems with a single record. Never fatal for the batch or the file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("column `{0}` is not present in this file's header")]
    MissingColumn(String),
    #[error("row has {len} fields, but column `{column}` is at index {index}")]
    ShortRow { column: String, index: usize, len: usize },
    #[error("malformed {column} value `{value}`")]
    MalformedField { column: String, value: String },
    #[error(transparent)]
    Duration(#[from] DurationParseError),
    #[error(transparent)]
    ReqMem(#[from] ReqMemParseError),
    #[error("partition `{0}` has no memory limit configured")]
    UnknownPartition(String),
    #[error("core-wall-time is zero, cpu efficiency is undefined")]
    ZeroCoreWallTime,
}

/// Problems with a whole input file. Abort that file only.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to read header row from {path:?}")]
    HeaderUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("reading {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The output is shared by all files, so this one ends the run.
    #[error("appending to output")]
    Write(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("building worker thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
