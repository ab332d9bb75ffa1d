//! Error types for the analysis and scoring pipeline.
//!
//! Each stage recovers locally where a row, variable or construct can be
//! skipped without corrupting the rest (those paths log a warning instead of
//! erroring), and fails the stage otherwise.

use faultline_parser::ParseError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("graph error: {0}")]
    Graph(String),

    #[error("{analysis} did not converge within {cap} sweeps")]
    Convergence { analysis: &'static str, cap: usize },

    #[error("transform error: {0}")]
    Transform(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model error: {0}")]
    Model(String),

    #[error("data error: {0}")]
    Data(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
