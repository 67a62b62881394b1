use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Input root not found: {}", .0.display())]
    InputRootMissing(PathBuf),

    #[error("Source file not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Missing column(s) [{columns}] in {}", .path.display())]
    MissingColumn { path: PathBuf, columns: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    /// True for the one failure that degrades an artifact instead of failing it.
    pub fn is_source_missing(&self) -> bool {
        matches!(self, PipelineError::SourceMissing(_))
    }
}
