use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::schema::{self, commodity, files};
use crate::tables::{distinct_strings, first_present, parse_years, read_csv_as_strings, year_column};

/// Static reference table: ISO3 code, display name, centroid, UN sub-region.
const COUNTRY_TABLE: &str = include_str!("country_metadata.csv");

const PLACEHOLDER_REGION: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryMeta {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub region: String,
}

impl CountryMeta {
    /// Stand-in for a code the reference table does not know.
    pub fn placeholder(code: &str) -> Self {
        Self {
            name: code.to_string(),
            lat: 0.0,
            lng: 0.0,
            region: PLACEHOLDER_REGION.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CountryRow {
    iso3: String,
    name: String,
    lat: f64,
    lng: f64,
    region: String,
}

pub fn reference_countries() -> Result<BTreeMap<String, CountryMeta>, PipelineError> {
    let mut rdr = csv::Reader::from_reader(COUNTRY_TABLE.as_bytes());
    let mut out = BTreeMap::new();
    for row in rdr.deserialize::<CountryRow>() {
        let row = row?;
        out.insert(
            row.iso3,
            CountryMeta {
                name: row.name,
                lat: row.lat,
                lng: row.lng,
                region: row.region,
            },
        );
    }
    Ok(out)
}

/// Add a placeholder for every code in `codes` missing from `countries`.
/// Returns the codes that needed one.
pub fn fill_placeholders(
    countries: &mut BTreeMap<String, CountryMeta>,
    codes: &BTreeSet<String>,
) -> Vec<String> {
    let missing: Vec<String> = codes
        .iter()
        .filter(|code| !countries.contains_key(*code))
        .cloned()
        .collect();
    for code in &missing {
        countries.insert(code.clone(), CountryMeta::placeholder(code));
    }
    missing
}

/// Every country code appearing as a consumer or a producer in a year that
/// is not excluded.
pub fn data_country_codes(config: &PipelineConfig) -> Result<BTreeSet<String>, PipelineError> {
    let consumer = read_csv_as_strings(&config.source(files::CONSUMER_COUNTRY))?;
    let consumer = parse_years(consumer, &config.excluded_years)?;
    let producer = read_csv_as_strings(&config.source(files::PRODUCER_COUNTRY))?;
    let producer = parse_years(producer, &config.excluded_years)?;

    let mut codes = distinct_strings(&consumer, schema::TO_ISO3)?;
    codes.extend(distinct_strings(&producer, schema::FROM_ISO3)?);
    Ok(codes)
}

pub fn country_metadata(
    config: &PipelineConfig,
) -> Result<BTreeMap<String, CountryMeta>, PipelineError> {
    let mut countries = reference_countries()?;
    let codes = data_country_codes(config)?;

    let missing = fill_placeholders(&mut countries, &codes);
    if !missing.is_empty() {
        log::warn!(
            "{} ISO3 codes in data but not in metadata: {:?}",
            missing.len(),
            missing
        );
    }
    Ok(countries)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryOption {
    pub iso3: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DropdownLists {
    pub commodities: Vec<String>,
    pub countries: Vec<CountryOption>,
    pub years: Vec<i32>,
    pub preliminary_years: Vec<i32>,
}

pub fn dropdown_lists(config: &PipelineConfig) -> Result<DropdownLists, PipelineError> {
    let commodity_path = config.source(files::COMMODITY);
    let commodity_df = read_csv_as_strings(&commodity_path)?;
    let commodity_col =
        first_present(&commodity_df, &commodity::NAME).ok_or_else(|| {
            PipelineError::MissingColumn {
                path: commodity_path.clone(),
                columns: commodity::NAME.join(" | "),
            }
        })?;
    let commodity_df = parse_years(commodity_df, &config.excluded_years)?;
    let commodities: Vec<String> = distinct_strings(&commodity_df, commodity_col)?
        .into_iter()
        .collect();

    let reference = reference_countries()?;
    let mut countries: Vec<CountryOption> = data_country_codes(config)?
        .into_iter()
        .map(|iso3| {
            let name = reference
                .get(&iso3)
                .map(|meta| meta.name.clone())
                .unwrap_or_else(|| iso3.clone());
            CountryOption { iso3, name }
        })
        .collect();
    countries.sort_by(|a, b| a.name.cmp(&b.name));

    let global = read_csv_as_strings(&config.source(files::GLOBAL_BY_YEAR))?;
    let global = parse_years(global, &config.excluded_years)?;
    let years: BTreeSet<i32> = year_column(&global)?
        .into_iter()
        .flatten()
        .map(|y| y as i32)
        .collect();

    Ok(DropdownLists {
        commodities,
        countries,
        years: years.into_iter().collect(),
        preliminary_years: config.preliminary_years.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_table_loads() {
        let countries = reference_countries().unwrap();
        assert_eq!(countries.len(), 197);
        let deu = &countries["DEU"];
        assert_eq!(deu.name, "Germany");
        assert_eq!(deu.region, "Western Europe");
        assert!((deu.lat - 51.17).abs() < 1e-9);
    }

    #[test]
    fn unknown_codes_get_placeholders() {
        let mut countries = reference_countries().unwrap();
        let codes: BTreeSet<String> = ["DEU", "XKX", "ZZZ"].iter().map(|s| s.to_string()).collect();
        let missing = fill_placeholders(&mut countries, &codes);
        assert_eq!(missing, vec!["XKX".to_string(), "ZZZ".to_string()]);
        assert_eq!(countries["XKX"], CountryMeta::placeholder("XKX"));
        assert_eq!(countries["XKX"].region, "Unknown");
        assert_eq!(countries["DEU"].name, "Germany");
    }
}
