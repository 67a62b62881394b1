//! Streaming reader for the bilateral flow series.
//!
//! The flow file runs to tens of millions of rows, so it is pulled in
//! fixed-size batches and never held whole. Each batch carries only the
//! projected columns, numeric fields coerced (unparseable → `0.0`, row kept),
//! and only rows that pass the [`RowFilter`].

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::aggregate::FlowSums;
use crate::error::PipelineError;
use crate::sanitize::coerce_field;
use crate::schema::{self, commodity, labels, measures};

/// Columns every flow read needs regardless of projection.
pub const KEY_COLUMNS: [&str; 4] = [
    schema::YEAR,
    schema::FROM_ISO3,
    schema::TO_ISO3,
    schema::ROUTE_TYPE,
];

/// Row-level predicate: route classification must be one of `routes`
/// (case-insensitive, trimmed) and the year must not be excluded.
#[derive(Debug, Clone)]
pub struct RowFilter {
    routes: Vec<String>,
    excluded_years: BTreeSet<i32>,
}

impl RowFilter {
    pub fn new(routes: &[&str], excluded_years: &BTreeSet<i32>) -> Self {
        Self {
            routes: routes.iter().map(|r| r.to_lowercase()).collect(),
            excluded_years: excluded_years.clone(),
        }
    }

    pub fn accepts_route(&self, route: &str) -> bool {
        let route = route.trim().to_lowercase();
        self.routes.iter().any(|r| *r == route)
    }

    pub fn accepts_year(&self, year: i32) -> bool {
        !self.excluded_years.contains(&year)
    }

    pub fn accepts(&self, year: i32, route: &str) -> bool {
        self.accepts_year(year) && self.accepts_route(route)
    }
}

/// One parsed, filtered row of the flow series.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRecord {
    pub year: i32,
    pub origin: String,
    pub destination: String,
    /// Lower-cased, trimmed; `"unknown"` when blank or not projected.
    pub mode: String,
    /// `None` when the commodity column was not projected.
    pub commodity: Option<String>,
    pub sums: FlowSums,
}

#[derive(Debug)]
pub struct Batch {
    /// 1-based position of this batch in the stream.
    pub index: usize,
    /// Raw rows consumed for this batch, before filtering.
    pub rows_read: usize,
    pub records: Vec<FlowRecord>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub batches: usize,
    pub rows_read: usize,
    pub rows_kept: usize,
    /// Non-empty numeric fields that could not be parsed and became `0.0`.
    pub coerced_values: usize,
    /// Rows dropped because their year did not parse.
    pub bad_years: usize,
}

#[derive(Debug)]
struct FlowColumns {
    year: usize,
    origin: usize,
    destination: usize,
    route_type: usize,
    mode: Option<usize>,
    commodity: Option<usize>,
    wtw: Option<usize>,
    ttw: Option<usize>,
    wtt: Option<usize>,
    food_miles: Option<usize>,
    cost: Option<usize>,
}

impl FlowColumns {
    /// Resolve projected column positions, failing on any missing required name.
    fn resolve(
        headers: &StringRecord,
        required: &[&str],
        source: &Path,
    ) -> Result<Self, PipelineError> {
        let mut wanted: Vec<&str> = KEY_COLUMNS.to_vec();
        for &name in required {
            if !wanted.contains(&name) {
                wanted.push(name);
            }
        }

        let missing: Vec<&str> = wanted
            .iter()
            .copied()
            .filter(|name| !headers.iter().any(|h| h == *name))
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::MissingColumn {
                path: source.to_path_buf(),
                columns: missing.join(", "),
            });
        }

        let find = |name: &str| -> Option<usize> {
            if wanted.contains(&name) {
                headers.iter().position(|h| h == name)
            } else {
                None
            }
        };
        let key = |name: &str| -> usize { find(name).unwrap_or_default() };

        Ok(Self {
            year: key(schema::YEAR),
            origin: key(schema::FROM_ISO3),
            destination: key(schema::TO_ISO3),
            route_type: key(schema::ROUTE_TYPE),
            mode: find(schema::MODE),
            commodity: find(commodity::FLOW_COMMODITY),
            wtw: find(measures::WTW_TCO2),
            ttw: find(measures::TTW_TCO2),
            wtt: find(measures::WTT_TCO2),
            food_miles: find(measures::FOOD_MILES_TKM),
            cost: find(measures::COST_USD),
        })
    }
}

/// A lazy sequence of [`Batch`]es. Each `open` starts again from the top of
/// the file.
pub struct ChunkedReader<R> {
    reader: csv::Reader<R>,
    record: StringRecord,
    columns: FlowColumns,
    filter: RowFilter,
    chunk_size: usize,
    stats: ReadStats,
    finished: bool,
}

impl ChunkedReader<File> {
    pub fn open(
        path: &Path,
        required: &[&str],
        chunk_size: usize,
        filter: RowFilter,
    ) -> Result<Self, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::SourceMissing(path.to_path_buf()));
        }
        let file = File::open(path)?;
        Self::from_reader(file, path, required, chunk_size, filter)
    }
}

impl<R: Read> ChunkedReader<R> {
    /// `source` is only used to label errors.
    pub fn from_reader(
        rdr: R,
        source: &Path,
        required: &[&str],
        chunk_size: usize,
        filter: RowFilter,
    ) -> Result<Self, PipelineError> {
        if chunk_size == 0 {
            return Err(PipelineError::Config(
                "chunk_size must be greater than zero".to_string(),
            ));
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(rdr);
        let headers = reader.headers()?.clone();
        let columns = FlowColumns::resolve(&headers, required, source)?;

        Ok(Self {
            reader,
            record: StringRecord::new(),
            columns,
            filter,
            chunk_size,
            stats: ReadStats::default(),
            finished: false,
        })
    }

    pub fn stats(&self) -> ReadStats {
        self.stats
    }
}

impl<R: Read> Iterator for ChunkedReader<R> {
    type Item = Result<Batch, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut records = Vec::new();
        let mut rows_read = 0usize;
        while rows_read < self.chunk_size {
            match self.reader.read_record(&mut self.record) {
                Ok(true) => {
                    rows_read += 1;
                    if let Some(rec) =
                        parse_row(&self.record, &self.columns, &self.filter, &mut self.stats)
                    {
                        records.push(rec);
                    }
                }
                Ok(false) => {
                    self.finished = true;
                    break;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }
        }

        if rows_read == 0 {
            return None;
        }

        self.stats.batches += 1;
        self.stats.rows_read += rows_read;
        self.stats.rows_kept += records.len();
        Some(Ok(Batch {
            index: self.stats.batches,
            rows_read,
            records,
        }))
    }
}

fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    if let Ok(y) = raw.parse::<i32>() {
        return Some(y);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Some(f as i32),
        _ => None,
    }
}

fn parse_row(
    record: &StringRecord,
    cols: &FlowColumns,
    filter: &RowFilter,
    stats: &mut ReadStats,
) -> Option<FlowRecord> {
    let field = |idx: usize| record.get(idx).unwrap_or("");

    let route_type = field(cols.route_type);
    if !filter.accepts_route(route_type) {
        return None;
    }
    let Some(year) = parse_year(field(cols.year)) else {
        stats.bad_years += 1;
        return None;
    };
    if !filter.accepts_year(year) {
        return None;
    }

    let mut measure = |idx: Option<usize>| -> f64 {
        let Some(idx) = idx else {
            return 0.0;
        };
        let (value, substituted) = coerce_field(field(idx));
        if substituted {
            stats.coerced_values += 1;
        }
        value
    };
    let sums = FlowSums {
        wtw: measure(cols.wtw),
        ttw: measure(cols.ttw),
        wtt: measure(cols.wtt),
        food_miles: measure(cols.food_miles),
        cost: measure(cols.cost),
    };

    let mode = match cols.mode.map(field).map(str::trim) {
        Some(m) if !m.is_empty() => m.to_lowercase(),
        _ => labels::UNKNOWN_MODE.to_string(),
    };
    let commodity = cols.commodity.map(field).map(|c| {
        let c = c.trim();
        if c.is_empty() {
            labels::UNKNOWN_COMMODITY.to_string()
        } else {
            c.to_string()
        }
    });

    Some(FlowRecord {
        year,
        origin: field(cols.origin).to_string(),
        destination: field(cols.destination).to_string(),
        mode,
        commodity,
        sums,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::route;

    const HEADER: &str = "Year,from_iso3,to_iso3,route_type,mode,commodity,WTW_emissions_tCO2,TTW_emissions_tCO2,WTT_emissions_tCO2,food_miles_tkm,total_transport_cost_USD\n";

    fn filter() -> RowFilter {
        RowFilter::new(&[route::BILATERAL], &[2024].into_iter().collect())
    }

    fn reader(
        body: &str,
        chunk: usize,
        required: &[&str],
    ) -> ChunkedReader<std::io::Cursor<Vec<u8>>> {
        let data = format!("{HEADER}{body}").into_bytes();
        ChunkedReader::from_reader(
            std::io::Cursor::new(data),
            Path::new("flows.csv"),
            required,
            chunk,
            filter(),
        )
        .unwrap()
    }

    const FLOW_MEASURES: [&str; 6] = [
        schema::MODE,
        measures::WTW_TCO2,
        measures::TTW_TCO2,
        measures::WTT_TCO2,
        measures::FOOD_MILES_TKM,
        measures::COST_USD,
    ];

    #[test]
    fn filters_routes_and_excluded_years() {
        let body = "\
2022,USA,DEU,bilateral,Air,Wheat,1,2,3,4,5
2022,USA,DEU,transshipment,air,Wheat,1,2,3,4,5
2024,USA,DEU,bilateral,air,Wheat,1,2,3,4,5
2022,USA,USA,domestic,land,Wheat,1,2,3,4,5
2023,FRA,EGY, BILATERAL ,sea,Rice,1,2,3,4,5
";
        let batches: Vec<Batch> = reader(body, 10, &FLOW_MEASURES)
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(batches.len(), 1);
        let recs = &batches[0].records;
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].mode, "air");
        assert_eq!(recs[0].sums.ttw, 2.0);
        assert_eq!(recs[1].year, 2023);
        assert_eq!(recs[1].origin, "FRA");
        assert_eq!(batches[0].rows_read, 5);
    }

    #[test]
    fn batches_respect_chunk_size() {
        let body: String = (0..7)
            .map(|i| format!("2022,USA,DEU,bilateral,air,Wheat,{i},{i},0,0,0\n"))
            .collect();
        let mut r = reader(&body, 3, &FLOW_MEASURES);
        let sizes: Vec<usize> = r
            .by_ref()
            .map(|b| b.unwrap().records.len())
            .collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        let stats = r.stats();
        assert_eq!(stats.batches, 3);
        assert_eq!(stats.rows_read, 7);
        assert_eq!(stats.rows_kept, 7);
    }

    #[test]
    fn malformed_numbers_become_zero_and_row_survives() {
        let body = "2022,USA,DEU,bilateral,air,Wheat,abc,2.5,,NaN,7\n";
        let mut r = reader(body, 10, &FLOW_MEASURES);
        let batch = r.next().unwrap().unwrap();
        let rec = &batch.records[0];
        assert_eq!(rec.sums.wtw, 0.0);
        assert_eq!(rec.sums.ttw, 2.5);
        assert_eq!(rec.sums.wtt, 0.0);
        assert_eq!(rec.sums.food_miles, 0.0);
        assert_eq!(rec.sums.cost, 7.0);
        assert_eq!(r.stats().coerced_values, 2);
    }

    #[test]
    fn blank_mode_and_commodity_get_placeholders() {
        let body = "2022,USA,DEU,bilateral,,,1,1,1,1,1\n";
        let mut required = FLOW_MEASURES.to_vec();
        required.push(commodity::FLOW_COMMODITY);
        let batch = reader(body, 10, &required).next().unwrap().unwrap();
        assert_eq!(batch.records[0].mode, "unknown");
        assert_eq!(batch.records[0].commodity.as_deref(), Some("Unknown"));
    }

    #[test]
    fn unprojected_columns_are_absent() {
        let body = "2022,USA,DEU,bilateral,sea,Wheat,1,2,3,4,5\n";
        let batch = reader(body, 10, &[schema::MODE, measures::TTW_TCO2])
            .next()
            .unwrap()
            .unwrap();
        let rec = &batch.records[0];
        assert_eq!(rec.commodity, None);
        assert_eq!(rec.sums.ttw, 2.0);
        assert_eq!(rec.sums.wtw, 0.0);
    }

    #[test]
    fn missing_required_column_fails_fast() {
        let data = "Year,from_iso3,to_iso3,route_type,mode\n2022,USA,DEU,bilateral,air\n";
        let err = ChunkedReader::from_reader(
            data.as_bytes(),
            Path::new("flows.csv"),
            &[schema::MODE, commodity::FLOW_COMMODITY],
            10,
            filter(),
        )
        .err()
        .unwrap();
        match err {
            PipelineError::MissingColumn { columns, .. } => assert_eq!(columns, "commodity"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn open_reports_missing_file() {
        let err = ChunkedReader::open(
            Path::new("/definitely/not/here.csv"),
            &[],
            10,
            filter(),
        )
        .err()
        .unwrap();
        assert!(err.is_source_missing());
    }

    #[test]
    fn float_years_parse() {
        assert_eq!(parse_year("2022"), Some(2022));
        assert_eq!(parse_year("2022.0"), Some(2022));
        assert_eq!(parse_year("20x2"), None);
        assert_eq!(parse_year("2022.5"), None);
    }
}
