pub mod aggregate;
pub mod bilateral;
pub mod breakdown;
pub mod config;
pub mod countries;
pub mod error;
pub mod factors;
pub mod flow;
pub mod metadata;
pub mod pipeline;
pub mod reader;
pub mod rollup;
pub mod sanitize;
pub mod schema;
pub mod series;
mod tables;
pub mod topn;
pub mod writer;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use pipeline::{Artifact, Pipeline, RunSummary};
