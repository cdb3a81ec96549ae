//! Error types for graph-ide-indexer

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(String),

    #[error("no grammar for {0}")]
    UnsupportedFile(String),

    #[error("failed to load grammar: {0}")]
    Grammar(String),

    #[error("parser gave up before producing a tree")]
    ParseAborted,
}
