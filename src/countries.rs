use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::reader::RowFilter;
use crate::sanitize::{sanitize, Number};
use crate::schema::{self, commodity, files, measures, route};
use crate::tables::{
    first_present, float_column, parse_float, parse_years, read_csv_as_strings, require_columns,
    string_column, year_column,
};

/// Totals for one (entity, year, route type) cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteTotals {
    pub wtw: Number,
    pub ttw: Number,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wtt: Option<Number>,
    pub food_miles: Number,
    pub value: Number,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Number>,
}

/// entity → year → route type → totals
pub type RouteSplit = BTreeMap<String, BTreeMap<i32, BTreeMap<String, RouteTotals>>>;

/// Shape of one route-split source table.
struct RouteTable<'a> {
    file: &'a str,
    /// Entity column; the first present name wins.
    key: &'a [&'a str],
    with_wtt: bool,
    with_cost: bool,
}

const CONSUMER: RouteTable<'static> = RouteTable {
    file: files::CONSUMER_COUNTRY,
    key: &[schema::TO_ISO3],
    with_wtt: true,
    with_cost: true,
};

const PRODUCER: RouteTable<'static> = RouteTable {
    file: files::PRODUCER_COUNTRY,
    key: &[schema::FROM_ISO3],
    with_wtt: true,
    with_cost: false,
};

const COMMODITY: RouteTable<'static> = RouteTable {
    file: files::COMMODITY,
    key: &commodity::NAME,
    with_wtt: false,
    with_cost: false,
};

pub fn consumer_countries(config: &PipelineConfig) -> Result<RouteSplit, PipelineError> {
    route_split(config, &CONSUMER)
}

pub fn producer_countries(config: &PipelineConfig) -> Result<RouteSplit, PipelineError> {
    route_split(config, &PRODUCER)
}

pub fn commodities(config: &PipelineConfig) -> Result<RouteSplit, PipelineError> {
    route_split(config, &COMMODITY)
}

fn route_split(config: &PipelineConfig, table: &RouteTable<'_>) -> Result<RouteSplit, PipelineError> {
    let path = config.source(table.file);
    let raw = read_csv_as_strings(&path)?;

    let key_col = resolve_key(&raw, table, &path)?;
    log::debug!("{}: keyed by column {}", table.file, key_col);

    let mut required = vec![
        schema::YEAR,
        key_col,
        schema::ROUTE_TYPE,
        measures::WTW_TCO2,
        measures::TTW_TCO2,
        measures::FOOD_MILES_TKM,
        measures::VALUE,
    ];
    if table.with_wtt {
        required.push(measures::WTT_TCO2);
    }
    require_columns(&raw, &required, &path)?;

    let numeric = [
        measures::WTW_TCO2,
        measures::TTW_TCO2,
        measures::WTT_TCO2,
        measures::FOOD_MILES_TKM,
        measures::VALUE,
        measures::COST_USD,
    ];
    let df = parse_years(raw, &config.excluded_years)?;
    let df = parse_float(df, &numeric)?;

    let filter = RowFilter::new(&[route::BILATERAL, route::DOMESTIC], &config.excluded_years);

    let years = year_column(&df)?;
    let keys = string_column(&df, key_col)?;
    let routes = string_column(&df, schema::ROUTE_TYPE)?;
    let wtw = float_column(&df, Some(measures::WTW_TCO2))?;
    let ttw = float_column(&df, Some(measures::TTW_TCO2))?;
    let wtt = float_column(&df, Some(measures::WTT_TCO2))?;
    let food_miles = float_column(&df, Some(measures::FOOD_MILES_TKM))?;
    let value = float_column(&df, Some(measures::VALUE))?;
    // Optional: older consumer tables carry no cost column.
    let cost = float_column(&df, Some(measures::COST_USD))?;

    let mut out = RouteSplit::new();
    for i in 0..df.height() {
        let (Some(year), Some(key)) = (years.get(i), keys.get(i)) else {
            continue;
        };
        let route_type = routes.get(i).unwrap_or("");
        if !filter.accepts(year as i32, route_type) {
            continue;
        }

        let totals = RouteTotals {
            wtw: sanitize(wtw.get(i), Some(1)),
            ttw: sanitize(ttw.get(i), Some(1)),
            wtt: table.with_wtt.then(|| sanitize(wtt.get(i), Some(1))),
            food_miles: sanitize(food_miles.get(i), Some(0)),
            value: sanitize(value.get(i), Some(1)),
            cost: table.with_cost.then(|| sanitize(cost.get(i), Some(1))),
        };
        out.entry(key.trim().to_string())
            .or_default()
            .entry(year as i32)
            .or_default()
            .insert(route_type.trim().to_lowercase(), totals);
    }
    Ok(out)
}

fn resolve_key<'a>(
    df: &polars::prelude::DataFrame,
    table: &RouteTable<'a>,
    path: &Path,
) -> Result<&'a str, PipelineError> {
    first_present(df, table.key).ok_or_else(|| PipelineError::MissingColumn {
        path: path.to_path_buf(),
        columns: table.key.join(" | "),
    })
}
