use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::error::PipelineError;

pub const DEFAULT_FACTORS_DIR: &str = "Bilateral_emission_factors_modified";
pub const DEFAULT_CHUNK_SIZE: usize = 500_000;
pub const DEFAULT_TOP_N_PER_MODE: usize = 100;
pub const DEFAULT_TOP_N_PER_COMMODITY: usize = 50;
pub const DEFAULT_EXCLUDED_YEARS: [i32; 1] = [2024];
pub const DEFAULT_PRELIMINARY_YEARS: [i32; 1] = [2024];

/// Everything one run needs to know.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Root holding the time-series CSVs. Its absence is the only fatal input error.
    pub timeseries_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Directory of `transport_statistics_*.csv` files. Optional input: when
    /// absent the factors artifact is written empty.
    pub factors_dir: PathBuf,
    /// Rows per batch when streaming the bilateral flow series.
    pub chunk_size: usize,
    pub top_n_per_mode: usize,
    pub top_n_per_commodity: usize,
    /// Dropped from every artifact.
    pub excluded_years: BTreeSet<i32>,
    /// Listed for the client to flag as provisional.
    pub preliminary_years: Vec<i32>,
}

impl PipelineConfig {
    pub fn new(timeseries_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            timeseries_dir: timeseries_dir.into(),
            output_dir: output_dir.into(),
            factors_dir: PathBuf::from(DEFAULT_FACTORS_DIR),
            chunk_size: DEFAULT_CHUNK_SIZE,
            top_n_per_mode: DEFAULT_TOP_N_PER_MODE,
            top_n_per_commodity: DEFAULT_TOP_N_PER_COMMODITY,
            excluded_years: DEFAULT_EXCLUDED_YEARS.into_iter().collect(),
            preliminary_years: DEFAULT_PRELIMINARY_YEARS.to_vec(),
        }
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.chunk_size == 0 {
            return Err(PipelineError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.top_n_per_mode == 0 || self.top_n_per_commodity == 0 {
            return Err(PipelineError::Config(format!(
                "top-N bounds must be greater than zero (mode: {}, commodity: {})",
                self.top_n_per_mode, self.top_n_per_commodity
            )));
        }
        Ok(())
    }

    pub fn source(&self, file_name: &str) -> PathBuf {
        self.timeseries_dir.join(file_name)
    }
}
