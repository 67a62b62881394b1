/// Column-name and file-name constants for the emissions source tables.
/// Single source of truth for every reader in the crate.

// ── Shared columns ──────────────────────────────────────────────────────────
pub const YEAR: &str = "Year";
pub const ROUTE_TYPE: &str = "route_type";
pub const FROM_ISO3: &str = "from_iso3";
pub const TO_ISO3: &str = "to_iso3";
pub const MODE: &str = "mode";

// ── Route classification values ─────────────────────────────────────────────
pub mod route {
    pub const BILATERAL: &str = "bilateral";
    pub const DOMESTIC: &str = "domestic";
}

// ── Source files under the time-series root ─────────────────────────────────
pub mod files {
    pub const GLOBAL_BY_YEAR: &str = "global_emissions_by_year.csv";
    pub const BY_YEAR_MODE: &str = "emissions_by_year_mode.csv";
    pub const CONSUMER_COUNTRY: &str = "emissions_by_consumer_country_year.csv";
    pub const PRODUCER_COUNTRY: &str = "emissions_by_producer_country_year.csv";
    pub const COMMODITY: &str = "emissions_by_commodity_year.csv";
    pub const BILATERAL_FLOWS: &str = "bilateral_emissions_timeseries_all_flows.csv";

    pub const FACTOR_PREFIX: &str = "transport_statistics_";
    pub const FACTOR_SUFFIX: &str = ".csv";
}

// ── Global series (Mt / billion tkm) ────────────────────────────────────────
pub mod global {
    pub const TRADE_VOLUME_MT: &str = "Trade_Volume_Mt";
    pub const WTW_MTCO2: &str = "WTW_emissions_MtCO2";
    pub const TTW_MTCO2: &str = "TTW_emissions_MtCO2";
    pub const WTT_MTCO2: &str = "WTT_emissions_MtCO2";
    pub const FOOD_MILES_BTKM: &str = "Food_Miles_Billion_tkm";

    pub const ALL: [&str; 5] = [
        TRADE_VOLUME_MT,
        WTW_MTCO2,
        TTW_MTCO2,
        WTT_MTCO2,
        FOOD_MILES_BTKM,
    ];
}

// ── Per-mode series: two naming schemes, first present wins ─────────────────
pub mod by_mode {
    use super::{global, measures};

    pub const WTW: [&str; 2] = [global::WTW_MTCO2, measures::WTW_TCO2];
    pub const TTW: [&str; 2] = [global::TTW_MTCO2, measures::TTW_TCO2];
    pub const WTT: [&str; 2] = [global::WTT_MTCO2, measures::WTT_TCO2];
    pub const FOOD_MILES: [&str; 2] = [global::FOOD_MILES_BTKM, measures::FOOD_MILES_TKM];
    pub const VALUE: [&str; 2] = [global::TRADE_VOLUME_MT, measures::VALUE];
}

// ── Per-record measures (tonnes / tkm / USD) ────────────────────────────────
pub mod measures {
    pub const WTW_TCO2: &str = "WTW_emissions_tCO2";
    pub const TTW_TCO2: &str = "TTW_emissions_tCO2";
    pub const WTT_TCO2: &str = "WTT_emissions_tCO2";
    pub const FOOD_MILES_TKM: &str = "food_miles_tkm";
    pub const VALUE: &str = "Value";
    pub const COST_USD: &str = "total_transport_cost_USD";
}

// ── Commodity series: renamed column across schema versions ─────────────────
pub mod commodity {
    pub const NAME: [&str; 2] = ["commodity_name", "commodity_name_x"];
    /// Commodity column of the bilateral flow series.
    pub const FLOW_COMMODITY: &str = "commodity";
}

// ── Transport-factor files ──────────────────────────────────────────────────
pub mod factors {
    pub const COMMODITY: &str = "commodity";
    pub const MODE: &str = "mode";
    pub const WTW_KG_PER_T: &str = "WTW_kgCO2_t";
    pub const TTW_KG_PER_T: &str = "TTW_kgCO2_t";
    pub const DISTANCE_KM: &str = "distance_km";

    pub const NUMERIC: [&str; 3] = [WTW_KG_PER_T, TTW_KG_PER_T, DISTANCE_KM];
}

// ── Placeholder labels ──────────────────────────────────────────────────────
pub mod labels {
    pub const UNKNOWN_MODE: &str = "unknown";
    pub const UNKNOWN_COMMODITY: &str = "Unknown";
    pub const ALL_MODES: &str = "all";
}
