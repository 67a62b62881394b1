//! Whole-file loading for the small source tables.
//!
//! These tables are a few thousand rows at most, so they are read with polars
//! in one go: every column as a string, then cast where numbers are expected.

use std::collections::BTreeSet;
use std::path::Path;

use polars::prelude::*;

use crate::error::PipelineError;
use crate::sanitize::finite_or_zero;
use crate::schema;

/// Read a CSV file with all columns as String dtype, header names trimmed.
pub fn read_csv_as_strings(path: &Path) -> Result<DataFrame, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::SourceMissing(path.to_path_buf()));
    }

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;

    Ok(df)
}

pub fn require_columns(df: &DataFrame, required: &[&str], path: &Path) -> Result<(), PipelineError> {
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|name| df.column(name).is_err())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::MissingColumn {
            path: path.to_path_buf(),
            columns: missing.join(", "),
        })
    }
}

/// First of `candidates` present in `df`, for tables whose columns were
/// renamed between schema versions.
pub fn first_present<'a>(df: &DataFrame, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .copied()
        .find(|name| df.column(name).is_ok())
}

/// Parse string columns to Float64. Unparseable cells become null; missing
/// columns are skipped.
pub fn parse_float(df: DataFrame, columns: &[&str]) -> Result<DataFrame, PipelineError> {
    let exprs: Vec<Expr> = columns
        .iter()
        .filter(|name| df.column(name).is_ok())
        .map(|name| {
            col(*name)
                .str()
                .strip_chars(lit(" \t\r\n"))
                .cast(DataType::Float64)
        })
        .collect();
    if exprs.is_empty() {
        return Ok(df);
    }
    Ok(df.lazy().with_columns(exprs).collect()?)
}

/// Parse `Year` to Int64 and drop rows whose year is missing, unparseable,
/// fractional, or in `excluded`. `2022.0` reads as 2022, as in the flow reader.
pub fn parse_years(df: DataFrame, excluded: &BTreeSet<i32>) -> Result<DataFrame, PipelineError> {
    let excluded: Vec<i64> = excluded.iter().map(|&y| y as i64).collect();
    let excluded = Series::new("excluded_years".into(), excluded);

    let df = df
        .lazy()
        .with_columns([col(schema::YEAR)
            .str()
            .strip_chars(lit(" \t\r\n"))
            .cast(DataType::Float64)])
        .filter(
            col(schema::YEAR)
                .cast(DataType::Int64)
                .cast(DataType::Float64)
                .eq(col(schema::YEAR)),
        )
        .with_columns([col(schema::YEAR).cast(DataType::Int64)])
        .filter(
            col(schema::YEAR)
                .is_not_null()
                .and(col(schema::YEAR).is_in(lit(excluded), false).not()),
        )
        .collect()?;
    Ok(df)
}

/// Float view of a column: missing column or non-finite cell reads as `0.0`.
pub struct FloatColumn<'a> {
    values: Option<&'a Float64Chunked>,
}

impl<'a> FloatColumn<'a> {
    pub fn get(&self, i: usize) -> f64 {
        finite_or_zero(self.values.and_then(|v| v.get(i)))
    }
}

pub fn float_column<'a>(df: &'a DataFrame, name: Option<&str>) -> Result<FloatColumn<'a>, PipelineError> {
    let values = match name {
        Some(name) if df.column(name).is_ok() => Some(df.column(name)?.f64()?),
        _ => None,
    };
    Ok(FloatColumn { values })
}

pub fn string_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a StringChunked, PipelineError> {
    Ok(df.column(name)?.str()?)
}

pub fn year_column(df: &DataFrame) -> Result<&Int64Chunked, PipelineError> {
    Ok(df.column(schema::YEAR)?.i64()?)
}

/// Distinct non-blank values of a string column.
pub fn distinct_strings(df: &DataFrame, name: &str) -> Result<BTreeSet<String>, PipelineError> {
    let values = string_column(df, name)?;
    Ok(values
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect())
}
