//! Top bilateral corridors from the full flow series.
//!
//! Both artifacts stream the flow file batch by batch into an [`Aggregator`],
//! then finalize, partition and cut each partition to its top-N by TTW.
//! Each artifact makes its own pass over the file.

use std::collections::BTreeMap;
use std::io::Read;
use std::time::Instant;

use crate::aggregate::{Aggregator, CommodityFlowKey, FlowSums, ModeFlowKey};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::flow::Flow;
use crate::reader::{ChunkedReader, FlowRecord, ReadStats, RowFilter};
use crate::rollup::across_modes;
use crate::schema::{self, commodity, files, labels, measures, route};
use crate::topn::Partitions;

/// year → mode (or `"all"`) → flows, largest TTW first
pub type ModeFlows = BTreeMap<i32, BTreeMap<String, Vec<Flow>>>;

/// commodity → year → flows, largest TTW first
pub type CommodityFlows = BTreeMap<String, BTreeMap<i32, Vec<Flow>>>;

const MODE_COLUMNS: [&str; 6] = [
    schema::MODE,
    measures::WTW_TCO2,
    measures::TTW_TCO2,
    measures::WTT_TCO2,
    measures::FOOD_MILES_TKM,
    measures::COST_USD,
];

const COMMODITY_COLUMNS: [&str; 7] = [
    schema::MODE,
    commodity::FLOW_COMMODITY,
    measures::WTW_TCO2,
    measures::TTW_TCO2,
    measures::WTT_TCO2,
    measures::FOOD_MILES_TKM,
    measures::COST_USD,
];

fn open_flows(
    config: &PipelineConfig,
    required: &[&str],
) -> Result<ChunkedReader<std::fs::File>, PipelineError> {
    let filter = RowFilter::new(&[route::BILATERAL], &config.excluded_years);
    ChunkedReader::open(
        &config.source(files::BILATERAL_FLOWS),
        required,
        config.chunk_size,
        filter,
    )
}

pub fn bilateral_top_flows(config: &PipelineConfig) -> Result<ModeFlows, PipelineError> {
    let reader = open_flows(config, &MODE_COLUMNS)?;
    let per_mode = fold_by_mode(reader)?;
    log::info!(
        "Building per-mode top flows from {} corridors ...",
        per_mode.len()
    );
    Ok(top_flows_by_mode(&per_mode, config.top_n_per_mode))
}

pub fn bilateral_by_commodity(config: &PipelineConfig) -> Result<CommodityFlows, PipelineError> {
    let reader = open_flows(config, &COMMODITY_COLUMNS)?;
    let per_commodity = fold_by_commodity(reader)?;
    log::info!(
        "Selecting top flows per commodity from {} corridors ...",
        per_commodity.len()
    );
    Ok(top_flows_by_commodity(
        &per_commodity,
        config.top_n_per_commodity,
    ))
}

/// Pull every batch through `fold`, logging progress per batch.
fn drain<R: Read>(
    mut reader: ChunkedReader<R>,
    mut fold: impl FnMut(FlowRecord),
) -> Result<ReadStats, PipelineError> {
    let started = Instant::now();
    let mut rows = 0usize;
    for batch in reader.by_ref() {
        let batch = batch?;
        rows += batch.rows_read;
        log::info!(
            "chunk {}: {} rows processed ({:.1}s elapsed)",
            batch.index,
            rows,
            started.elapsed().as_secs_f64()
        );
        batch.records.into_iter().for_each(&mut fold);
    }

    let stats = reader.stats();
    log::info!(
        "Done reading {} rows ({} kept) in {:.1}s",
        stats.rows_read,
        stats.rows_kept,
        started.elapsed().as_secs_f64()
    );
    if stats.coerced_values > 0 {
        log::warn!(
            "{} unparseable numeric values read as 0",
            stats.coerced_values
        );
    }
    if stats.bad_years > 0 {
        log::warn!("{} rows dropped for an unreadable Year", stats.bad_years);
    }
    Ok(stats)
}

fn fold_by_mode<R: Read>(
    reader: ChunkedReader<R>,
) -> Result<Aggregator<ModeFlowKey, FlowSums>, PipelineError> {
    let mut agg = Aggregator::new();
    drain(reader, |rec| {
        let key = ModeFlowKey {
            year: rec.year,
            mode: rec.mode,
            origin: rec.origin,
            destination: rec.destination,
        };
        agg.accumulate(key, &rec.sums);
    })?;
    Ok(agg)
}

fn fold_by_commodity<R: Read>(
    reader: ChunkedReader<R>,
) -> Result<Aggregator<CommodityFlowKey, FlowSums>, PipelineError> {
    let mut agg = Aggregator::new();
    drain(reader, |rec| {
        let key = CommodityFlowKey {
            commodity: rec
                .commodity
                .unwrap_or_else(|| labels::UNKNOWN_COMMODITY.to_string()),
            year: rec.year,
            origin: rec.origin,
            destination: rec.destination,
        };
        agg.accumulate_with_category(key, &rec.sums, &rec.mode, rec.sums.ttw);
    })?;
    Ok(agg)
}

/// One partition per (year, mode) plus a synthetic `"all"` partition per year
/// built from the cross-mode rollup.
fn top_flows_by_mode(per_mode: &Aggregator<ModeFlowKey, FlowSums>, n: usize) -> ModeFlows {
    let mut partitions: Partitions<(i32, String), Flow> = Partitions::new();

    for (key, acc) in per_mode.sorted() {
        partitions.push(
            (key.year, key.mode.clone()),
            Flow::finalize(&key.origin, &key.destination, acc, &key.mode),
        );
    }

    let corridors = across_modes(per_mode);
    for (key, acc) in corridors.sorted() {
        partitions.push(
            (key.year, labels::ALL_MODES.to_string()),
            Flow::finalize(&key.origin, &key.destination, acc, acc.dominant()),
        );
    }

    let mut out = ModeFlows::new();
    for ((year, mode), flows) in partitions.select(n, Flow::rank) {
        out.entry(year).or_default().insert(mode, flows);
    }
    out
}

fn top_flows_by_commodity(
    per_commodity: &Aggregator<CommodityFlowKey, FlowSums>,
    n: usize,
) -> CommodityFlows {
    let mut partitions: Partitions<(String, i32), Flow> = Partitions::new();
    for (key, acc) in per_commodity.sorted() {
        partitions.push(
            (key.commodity.clone(), key.year),
            Flow::finalize(&key.origin, &key.destination, acc, acc.dominant()),
        );
    }

    let mut out = CommodityFlows::new();
    for ((commodity, year), flows) in partitions.select(n, Flow::rank) {
        out.entry(commodity).or_default().insert(year, flows);
    }
    out
}
