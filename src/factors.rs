use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::aggregate::{Aggregator, FactorKey, FactorSums};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::sanitize::{sanitize, Number};
use crate::schema::{factors, files, labels};
use crate::tables::{float_column, parse_float, read_csv_as_strings, string_column};

const PROGRESS_EVERY: usize = 50;

/// Mean intensities for one (commodity, mode) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorSummary {
    pub wtw: Number,
    pub ttw: Number,
    pub distance: Number,
    /// Route rows averaged.
    pub routes: u64,
}

/// commodity → mode → summary
pub type FactorTable = BTreeMap<String, BTreeMap<String, FactorSummary>>;

/// `transport_statistics_<mode>_<commodity>.csv` → `(mode, commodity)`.
/// The commodity part may itself contain underscores.
pub fn split_factor_file_name(file_name: &str) -> Option<(String, String)> {
    let stem = file_name.strip_suffix(files::FACTOR_SUFFIX).unwrap_or(file_name);
    let rest = stem.strip_prefix(files::FACTOR_PREFIX)?;
    let (mode, commodity) = rest.split_once('_')?;
    Some((mode.to_string(), commodity.to_string()))
}

/// Factor files in `dir`, sorted by name.
fn factor_files(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(files::FACTOR_PREFIX)
            && name.ends_with(files::FACTOR_SUFFIX)
            && path.is_file()
        {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

pub fn transport_factors(config: &PipelineConfig) -> Result<FactorTable, PipelineError> {
    let dir = &config.factors_dir;
    if !dir.is_dir() {
        return Err(PipelineError::SourceMissing(dir.clone()));
    }

    let paths = factor_files(dir)?;
    log::info!("Found {} factor files", paths.len());

    let mut agg: Aggregator<FactorKey, FactorSums> = Aggregator::new();
    for (i, path) in paths.iter().enumerate() {
        if (i + 1) % PROGRESS_EVERY == 0 {
            log::info!("... {}/{} files", i + 1, paths.len());
        }
        if let Err(e) = fold_factor_file(path, &mut agg) {
            log::warn!("Could not read {}: {}", path.display(), e);
        }
    }

    Ok(summarize(&agg))
}

/// Add every row of one factor file. Columns the file lacks are taken from
/// its name; a file lacking them whose name does not parse is skipped.
fn fold_factor_file(
    path: &Path,
    agg: &mut Aggregator<FactorKey, FactorSums>,
) -> Result<(), PipelineError> {
    let raw = read_csv_as_strings(path)?;

    let has = |name: &str| raw.column(name).is_ok();
    let complete = [factors::COMMODITY, factors::MODE]
        .into_iter()
        .chain(factors::NUMERIC)
        .all(has);

    let from_name = if complete {
        None
    } else {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        match split_factor_file_name(name) {
            Some(parts) => Some(parts),
            None => {
                log::debug!("Skipping {}: no mode/commodity in name", name);
                return Ok(());
            }
        }
    };

    let df = parse_float(raw, &factors::NUMERIC)?;
    let modes = match df.column(factors::MODE) {
        Ok(_) => Some(string_column(&df, factors::MODE)?),
        Err(_) => None,
    };
    let commodities = match df.column(factors::COMMODITY) {
        Ok(_) => Some(string_column(&df, factors::COMMODITY)?),
        Err(_) => None,
    };
    let wtw = float_column(&df, Some(factors::WTW_KG_PER_T))?;
    let ttw = float_column(&df, Some(factors::TTW_KG_PER_T))?;
    let distance = float_column(&df, Some(factors::DISTANCE_KM))?;

    let name_mode = from_name.as_ref().map(|(m, _)| m.as_str());
    let name_commodity = from_name.as_ref().map(|(_, c)| c.as_str());

    for i in 0..df.height() {
        let mode = modes
            .and_then(|m| m.get(i))
            .or(name_mode)
            .unwrap_or(labels::UNKNOWN_MODE);
        let commodity = commodities
            .and_then(|c| c.get(i))
            .or(name_commodity)
            .unwrap_or(labels::UNKNOWN_COMMODITY);

        let key = FactorKey {
            commodity: commodity.to_string(),
            mode: mode.trim().to_lowercase(),
        };
        let sums = FactorSums {
            wtw: wtw.get(i),
            ttw: ttw.get(i),
            distance: distance.get(i),
        };
        agg.accumulate(key, &sums);
    }
    Ok(())
}

fn summarize(agg: &Aggregator<FactorKey, FactorSums>) -> FactorTable {
    let mut out = FactorTable::new();
    for (key, acc) in agg.sorted() {
        if acc.count == 0 {
            continue;
        }
        let summary = FactorSummary {
            wtw: sanitize(acc.mean(|s| s.wtw), Some(1)),
            ttw: sanitize(acc.mean(|s| s.ttw), Some(1)),
            distance: sanitize(acc.mean(|s| s.distance), Some(0)),
            routes: acc.count,
        };
        out.entry(key.commodity.clone())
            .or_default()
            .insert(key.mode.clone(), summary);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn file_names_split_on_first_underscore() {
        assert_eq!(
            split_factor_file_name("transport_statistics_sea_wheat_durum.csv"),
            Some(("sea".to_string(), "wheat_durum".to_string()))
        );
        assert_eq!(split_factor_file_name("transport_statistics_sea.csv"), None);
        assert_eq!(split_factor_file_name("other_sea_wheat.csv"), None);
    }

    #[test]
    fn means_per_commodity_and_mode() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("transport_statistics_sea_Wheat.csv"),
            "WTW_kgCO2_t,TTW_kgCO2_t,distance_km\n10,8,1000\n20,12,3000\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("transport_statistics_all.csv"),
            "commodity,mode,WTW_kgCO2_t,TTW_kgCO2_t,distance_km\nRice, Air ,100,90,500\n",
        )
        .unwrap();
        // Incomplete columns and an unparseable name: skipped.
        fs::write(
            dir.path().join("transport_statistics_broken.csv"),
            "mode\nsea\n",
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut config = crate::config::PipelineConfig::new("in", "out");
        config.factors_dir = dir.path().to_path_buf();
        let table = transport_factors(&config).unwrap();

        assert_eq!(table.len(), 2);
        let wheat = &table["Wheat"]["sea"];
        assert_eq!(wheat.wtw, Number::Float(15.0));
        assert_eq!(wheat.ttw, Number::Float(10.0));
        assert_eq!(wheat.distance, Number::Int(2000));
        assert_eq!(wheat.routes, 2);
        assert_eq!(table["Rice"]["air"].routes, 1);
    }

    #[test]
    fn missing_directory_is_a_missing_source() {
        let mut config = crate::config::PipelineConfig::new("in", "out");
        config.factors_dir = PathBuf::from("/definitely/not/here");
        assert!(transport_factors(&config).unwrap_err().is_source_missing());
    }
}
