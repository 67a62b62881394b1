use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::sanitize::{sanitize, Number};
use crate::schema::{self, by_mode, files, global, labels};
use crate::tables::{
    first_present, float_column, parse_float, parse_years, read_csv_as_strings, require_columns,
    string_column, year_column,
};

/// Column-oriented yearly totals, in source row order.
#[derive(Debug, Serialize)]
pub struct GlobalTimeseries {
    pub years: Vec<i32>,
    pub trade_volume_mt: Vec<Number>,
    pub wtw_emissions_mtco2: Vec<Number>,
    pub ttw_emissions_mtco2: Vec<Number>,
    pub wtt_emissions_mtco2: Vec<Number>,
    pub food_miles_billion_tkm: Vec<Number>,
    pub preliminary_years: Vec<i32>,
}

pub fn global_timeseries(config: &PipelineConfig) -> Result<GlobalTimeseries, PipelineError> {
    let path = config.source(files::GLOBAL_BY_YEAR);
    let raw = read_csv_as_strings(&path)?;

    let mut required = vec![schema::YEAR];
    required.extend(global::ALL);
    require_columns(&raw, &required, &path)?;

    let df = parse_years(raw, &config.excluded_years)?;
    let df = parse_float(df, &global::ALL)?;

    let years = year_column(&df)?;
    let trade = float_column(&df, Some(global::TRADE_VOLUME_MT))?;
    let wtw = float_column(&df, Some(global::WTW_MTCO2))?;
    let ttw = float_column(&df, Some(global::TTW_MTCO2))?;
    let wtt = float_column(&df, Some(global::WTT_MTCO2))?;
    let food_miles = float_column(&df, Some(global::FOOD_MILES_BTKM))?;

    let mut out = GlobalTimeseries {
        years: Vec::with_capacity(df.height()),
        trade_volume_mt: Vec::with_capacity(df.height()),
        wtw_emissions_mtco2: Vec::with_capacity(df.height()),
        ttw_emissions_mtco2: Vec::with_capacity(df.height()),
        wtt_emissions_mtco2: Vec::with_capacity(df.height()),
        food_miles_billion_tkm: Vec::with_capacity(df.height()),
        preliminary_years: config.preliminary_years.clone(),
    };
    for i in 0..df.height() {
        let Some(year) = years.get(i) else { continue };
        out.years.push(year as i32);
        out.trade_volume_mt.push(sanitize(trade.get(i), Some(2)));
        out.wtw_emissions_mtco2.push(sanitize(wtw.get(i), Some(2)));
        out.ttw_emissions_mtco2.push(sanitize(ttw.get(i), Some(2)));
        out.wtt_emissions_mtco2.push(sanitize(wtt.get(i), Some(2)));
        out.food_miles_billion_tkm
            .push(sanitize(food_miles.get(i), Some(2)));
    }
    Ok(out)
}

/// One mode's totals for one year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModeTotals {
    pub mode: String,
    pub wtw: Number,
    pub ttw: Number,
    pub wtt: Number,
    pub food_miles: Number,
    pub value: Number,
}

/// Per-year, per-mode totals. Each measure is read from the first of its two
/// accepted column names present in the file; absent from both reads as 0.
pub fn global_by_mode(
    config: &PipelineConfig,
) -> Result<BTreeMap<i32, Vec<ModeTotals>>, PipelineError> {
    let path = config.source(files::BY_YEAR_MODE);
    let raw = read_csv_as_strings(&path)?;
    require_columns(&raw, &[schema::YEAR, schema::MODE], &path)?;

    let wtw_col = first_present(&raw, &by_mode::WTW);
    let ttw_col = first_present(&raw, &by_mode::TTW);
    let wtt_col = first_present(&raw, &by_mode::WTT);
    let food_col = first_present(&raw, &by_mode::FOOD_MILES);
    let value_col = first_present(&raw, &by_mode::VALUE);
    let numeric: Vec<&str> = [wtw_col, ttw_col, wtt_col, food_col, value_col]
        .into_iter()
        .flatten()
        .collect();

    let df = parse_years(raw, &config.excluded_years)?;
    let df = parse_float(df, &numeric)?;

    let years = year_column(&df)?;
    let modes = string_column(&df, schema::MODE)?;
    let wtw = float_column(&df, wtw_col)?;
    let ttw = float_column(&df, ttw_col)?;
    let wtt = float_column(&df, wtt_col)?;
    let food_miles = float_column(&df, food_col)?;
    let value = float_column(&df, value_col)?;

    let mut out: BTreeMap<i32, Vec<ModeTotals>> = BTreeMap::new();
    for i in 0..df.height() {
        let Some(year) = years.get(i) else { continue };
        let mode = match modes.get(i).map(str::trim) {
            Some(m) if !m.is_empty() => m.to_lowercase(),
            _ => labels::UNKNOWN_MODE.to_string(),
        };
        out.entry(year as i32).or_default().push(ModeTotals {
            mode,
            wtw: sanitize(wtw.get(i), Some(2)),
            ttw: sanitize(ttw.get(i), Some(2)),
            wtt: sanitize(wtt.get(i), Some(2)),
            food_miles: sanitize(food_miles.get(i), Some(2)),
            value: sanitize(value.get(i), Some(2)),
        });
    }
    Ok(out)
}
