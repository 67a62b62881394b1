//! Runs every artifact builder in a fixed order.
//!
//! Artifacts are independent: a missing optional source degrades its artifact
//! to an empty object, and any other failure is logged and recorded without
//! stopping the run. Only a missing input root aborts.

use std::fmt;
use std::time::Instant;

use serde_json::json;

use crate::bilateral::{bilateral_by_commodity, bilateral_top_flows};
use crate::config::PipelineConfig;
use crate::countries::{commodities, consumer_countries, producer_countries};
use crate::error::PipelineError;
use crate::factors::transport_factors;
use crate::metadata::{country_metadata, dropdown_lists};
use crate::series::{global_by_mode, global_timeseries};
use crate::writer::write_json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    GlobalTimeseries,
    GlobalByMode,
    ConsumerCountries,
    ProducerCountries,
    Commodities,
    BilateralTopFlows,
    BilateralByCommodity,
    TransportFactors,
    CountryMetadata,
    DropdownLists,
}

impl Artifact {
    /// Every artifact, in run order.
    pub const ALL: [Artifact; 10] = [
        Artifact::GlobalTimeseries,
        Artifact::GlobalByMode,
        Artifact::ConsumerCountries,
        Artifact::ProducerCountries,
        Artifact::Commodities,
        Artifact::BilateralTopFlows,
        Artifact::BilateralByCommodity,
        Artifact::TransportFactors,
        Artifact::CountryMetadata,
        Artifact::DropdownLists,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::GlobalTimeseries => "global_timeseries.json",
            Artifact::GlobalByMode => "global_by_mode.json",
            Artifact::ConsumerCountries => "consumer_countries.json",
            Artifact::ProducerCountries => "producer_countries.json",
            Artifact::Commodities => "commodities.json",
            Artifact::BilateralTopFlows => "bilateral_top_flows.json",
            Artifact::BilateralByCommodity => "bilateral_by_commodity.json",
            Artifact::TransportFactors => "transport_factors.json",
            Artifact::CountryMetadata => "country_metadata.json",
            Artifact::DropdownLists => "dropdown_lists.json",
        }
    }

    /// Build the artifact and write it. Returns bytes written.
    fn produce(self, config: &PipelineConfig) -> Result<u64, PipelineError> {
        let dir = config.output_dir.as_path();
        let name = self.file_name();
        match self {
            Artifact::GlobalTimeseries => write_json(dir, name, &global_timeseries(config)?),
            Artifact::GlobalByMode => write_json(dir, name, &global_by_mode(config)?),
            Artifact::ConsumerCountries => write_json(dir, name, &consumer_countries(config)?),
            Artifact::ProducerCountries => write_json(dir, name, &producer_countries(config)?),
            Artifact::Commodities => write_json(dir, name, &commodities(config)?),
            Artifact::BilateralTopFlows => write_json(dir, name, &bilateral_top_flows(config)?),
            Artifact::BilateralByCommodity => {
                write_json(dir, name, &bilateral_by_commodity(config)?)
            }
            Artifact::TransportFactors => write_json(dir, name, &transport_factors(config)?),
            Artifact::CountryMetadata => write_json(dir, name, &country_metadata(config)?),
            Artifact::DropdownLists => write_json(dir, name, &dropdown_lists(config)?),
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name().trim_end_matches(".json"))
    }
}

/// What one run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Artifacts written, with their size in bytes. Degraded ones included.
    pub written: Vec<(Artifact, u64)>,
    /// Written as `{}` because their source was absent.
    pub degraded: Vec<Artifact>,
    /// Not written at all.
    pub failed: Vec<(Artifact, String)>,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.degraded.is_empty() && self.failed.is_empty()
    }
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        self.run_only(&Artifact::ALL)
    }

    /// Build a subset of artifacts, in the order given.
    pub fn run_only(&self, artifacts: &[Artifact]) -> Result<RunSummary, PipelineError> {
        let config = &self.config;
        if !config.timeseries_dir.is_dir() {
            return Err(PipelineError::InputRootMissing(
                config.timeseries_dir.clone(),
            ));
        }
        config.validate()?;
        std::fs::create_dir_all(&config.output_dir)?;

        let started = Instant::now();
        let mut summary = RunSummary::default();
        for (i, &artifact) in artifacts.iter().enumerate() {
            log::info!("[{}/{}] Processing {} ...", i + 1, artifacts.len(), artifact);
            let step = Instant::now();
            match artifact.produce(config) {
                Ok(size) => summary.written.push((artifact, size)),
                Err(e) if e.is_source_missing() => {
                    log::warn!("{}; writing empty {}", e, artifact.file_name());
                    match write_json(&config.output_dir, artifact.file_name(), &json!({})) {
                        Ok(size) => {
                            summary.written.push((artifact, size));
                            summary.degraded.push(artifact);
                        }
                        Err(e) => {
                            log::error!("{} failed: {}", artifact, e);
                            summary.failed.push((artifact, e.to_string()));
                        }
                    }
                }
                Err(e) => {
                    log::error!("{} failed: {}", artifact, e);
                    summary.failed.push((artifact, e.to_string()));
                }
            }
            log::debug!("{} took {:.1}s", artifact, step.elapsed().as_secs_f64());
        }

        log::info!(
            "All done in {:.1}s: {} written, {} empty, {} failed",
            started.elapsed().as_secs_f64(),
            summary.written.len(),
            summary.degraded.len(),
            summary.failed.len()
        );
        log::info!("Output files in: {}", config.output_dir.display());
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn file_names_are_distinct() {
        let names: HashSet<&str> = Artifact::ALL.iter().map(|a| a.file_name()).collect();
        assert_eq!(names.len(), Artifact::ALL.len());
        assert_eq!(Artifact::TransportFactors.to_string(), "transport_factors");
    }

    #[test]
    fn missing_root_aborts() {
        let out = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(PipelineConfig::new("/definitely/not/here", out.path()));
        assert!(matches!(
            pipeline.run(),
            Err(PipelineError::InputRootMissing(_))
        ));
    }

    #[test]
    fn unwritable_empty_artifact_does_not_stop_the_run() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        // A directory where the file should go makes the write fail.
        std::fs::create_dir(out.path().join(Artifact::GlobalByMode.file_name())).unwrap();

        let summary = Pipeline::new(PipelineConfig::new(root.path(), out.path()))
            .run_only(&[Artifact::GlobalByMode, Artifact::GlobalTimeseries])
            .unwrap();
        let failed: Vec<Artifact> = summary.failed.iter().map(|(a, _)| *a).collect();
        assert_eq!(failed, vec![Artifact::GlobalByMode]);
        assert_eq!(summary.degraded, vec![Artifact::GlobalTimeseries]);
        assert!(out.path().join(Artifact::GlobalTimeseries.file_name()).is_file());
    }

    #[test]
    fn empty_root_degrades_every_artifact() {
        let root = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let mut config = PipelineConfig::new(root.path(), out.path());
        config.factors_dir = root.path().join("factors");

        let summary = Pipeline::new(config).run().unwrap();
        assert_eq!(summary.degraded.len(), Artifact::ALL.len());
        assert!(summary.failed.is_empty());
        assert!(!summary.is_complete());
        for artifact in Artifact::ALL {
            let text = std::fs::read_to_string(out.path().join(artifact.file_name())).unwrap();
            assert_eq!(text, "{}");
        }
    }
}
