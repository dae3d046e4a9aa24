use std::path::PathBuf;

use thiserror::Error;

use super::time_bins::DemandGroupKey;


#[derive(Debug, Error)]
pub enum PrepError {
    #[error("I/O failure on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("could not parse config as yaml: {0}")]
    Yaml(#[from] yaml_rust::ScanError),
    #[error("bad config: {0}")]
    Config(String),
    #[error("malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },
    #[error("malformed timestamp {0:?}")]
    MalformedTimestamp(String),
    #[error("spatial index was built from zero stations")]
    EmptyIndex,
    #[error("spatial index rejected a point: {0}")]
    SpatialIndex(String),
    #[error("demand group {0:?} appears again after it was flushed")]
    NonContiguousGroup(DemandGroupKey),
}

impl PrepError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> PrepError {
        PrepError::Io { path: path.into(), source }
    }

    /// Whether this error only concerns the contents of a single input row.
    pub fn is_row_error(&self) -> bool {
        match self {
            PrepError::MalformedRow { .. } | PrepError::MalformedTimestamp(_) => true,
            _ => false,
        }
    }
}
