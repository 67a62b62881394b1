use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use emissions_prep::config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_FACTORS_DIR, DEFAULT_TOP_N_PER_COMMODITY, DEFAULT_TOP_N_PER_MODE,
};
use emissions_prep::{Pipeline, PipelineConfig};

/// Turn the transport-emissions time series into dashboard JSON.
#[derive(Parser)]
#[command(name = "emissions-prep", version, about)]
struct Cli {
    /// Directory holding the time-series CSVs.
    #[arg(long, env = "EMISSIONS_TIMESERIES_DIR")]
    timeseries_dir: PathBuf,

    /// Where the JSON artifacts are written.
    #[arg(long, env = "EMISSIONS_OUTPUT_DIR", default_value = "public/data")]
    output_dir: PathBuf,

    /// Directory of transport_statistics_*.csv files.
    #[arg(long, env = "EMISSIONS_FACTORS_DIR", default_value = DEFAULT_FACTORS_DIR)]
    factors_dir: PathBuf,

    /// Rows per batch when streaming the bilateral flow file.
    #[arg(long, env = "EMISSIONS_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    #[arg(long, env = "EMISSIONS_TOP_N_MODE", default_value_t = DEFAULT_TOP_N_PER_MODE)]
    top_n_mode: usize,

    #[arg(long, env = "EMISSIONS_TOP_N_COMMODITY", default_value_t = DEFAULT_TOP_N_PER_COMMODITY)]
    top_n_commodity: usize,

    /// Years dropped from every artifact (comma separated).
    #[arg(long, env = "EMISSIONS_EXCLUDED_YEARS", value_delimiter = ',', default_value = "2024")]
    excluded_years: Vec<i32>,

    /// Years the client should flag as provisional (comma separated).
    #[arg(long, env = "EMISSIONS_PRELIMINARY_YEARS", value_delimiter = ',', default_value = "2024")]
    preliminary_years: Vec<i32>,
}

impl Cli {
    fn into_config(self) -> PipelineConfig {
        let mut config = PipelineConfig::new(self.timeseries_dir, self.output_dir);
        config.factors_dir = self.factors_dir;
        config.chunk_size = self.chunk_size;
        config.top_n_per_mode = self.top_n_mode;
        config.top_n_per_commodity = self.top_n_commodity;
        config.excluded_years = self.excluded_years.into_iter().collect();
        config.preliminary_years = self.preliminary_years;
        config
    }
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = Cli::parse().into_config();

    log::info!("Transport emissions preprocessing");
    log::info!("TimeSeries dir : {}", config.timeseries_dir.display());
    log::info!("Output dir     : {}", config.output_dir.display());
    log::info!("Factors dir    : {}", config.factors_dir.display());

    match Pipeline::new(config).run() {
        Ok(summary) => {
            for (artifact, reason) in &summary.failed {
                log::error!("{} was not written: {}", artifact, reason);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
