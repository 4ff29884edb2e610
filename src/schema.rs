/// Column-name constants for the inventory CSV and result frames.
/// Single source of truth - exported to Python via PyO3.

// ── Facility columns ────────────────────────────────────────────────────────
pub mod facility {
    pub const FACILITY_ID: &str = "facility_id";
    pub const NAME: &str = "name";
    pub const GROUP: &str = "group";
    pub const EQUITY_SHARE: &str = "equity_share";
    pub const IS_CORPORATE: &str = "is_corporate";
}

// ── Emission source columns ─────────────────────────────────────────────────
pub mod source {
    pub const SOURCE_ID: &str = "source_id";
    pub const FACILITY_ID: &str = "facility_id";
    pub const CATEGORY: &str = "category";
    pub const METHOD: &str = "method";
    pub const FUEL_TYPE: &str = "fuel_type";
    pub const UNIT: &str = "unit";
    pub const MARKET_FACTOR: &str = "market_factor";
    pub const DESCRIPTION: &str = "description";

    pub const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
}

// ── Data quality indicator columns ──────────────────────────────────────────
pub mod dqi {
    pub const TECHNOLOGICAL: &str = "dqi_technological";
    pub const TEMPORAL: &str = "dqi_temporal";
    pub const GEOGRAPHICAL: &str = "dqi_geographical";
    pub const COMPLETENESS: &str = "dqi_completeness";
    pub const RELIABILITY: &str = "dqi_reliability";

    pub const ALL: [&str; 5] = [
        TECHNOLOGICAL,
        TEMPORAL,
        GEOGRAPHICAL,
        COMPLETENESS,
        RELIABILITY,
    ];
}

// ── Custom factor columns ───────────────────────────────────────────────────
pub mod factor {
    pub const CATEGORY: &str = "category";
    pub const NAME: &str = "name";
    pub const UNIT: &str = "unit";
    pub const FACTOR: &str = "factor";
    pub const GWP: &str = "gwp";
    pub const SOURCE: &str = "source";
    pub const YEAR: &str = "year";
    pub const REGION: &str = "region";
    pub const SUB_TABLE: &str = "sub_table";
}

// ── Sub-table values ────────────────────────────────────────────────────────
pub mod sub_table {
    pub const ACTIVITY: &str = "activity";
    pub const SPEND: &str = "spend";
}

// ── Scope columns shared by every result frame ──────────────────────────────
pub mod scope {
    pub const SCOPE1: &str = "scope1_kg";
    pub const SCOPE2_LOCATION: &str = "scope2_location_kg";
    pub const SCOPE2_MARKET: &str = "scope2_market_kg";
    pub const SCOPE3: &str = "scope3_kg";
    pub const TOTAL_LOCATION: &str = "total_location_kg";
    pub const TOTAL_MARKET: &str = "total_market_kg";
}

// ── Per-source result columns ───────────────────────────────────────────────
pub mod result {
    pub const SOURCE_ID: &str = "source_id";
    pub const FACILITY_ID: &str = "facility_id";
    pub const CATEGORY: &str = "category";
    pub const METHOD: &str = "method";
    pub const FORMULA: &str = "formula";
    pub const DQI_SCORE: &str = "dqi_score";
    pub const DQI_RATING: &str = "dqi_rating";
    pub const WARNINGS: &str = "warnings";
}

// ── Facility breakdown columns ──────────────────────────────────────────────
pub mod breakdown {
    pub const FACILITY_ID: &str = "facility_id";
    pub const FACILITY_NAME: &str = "facility_name";
    pub const GROUP: &str = "group";
    pub const OWNERSHIP_FACTOR: &str = "ownership_factor";
    pub const RAW_SUFFIX: &str = "_raw";
}

// ── Scope 3 category breakdown columns ──────────────────────────────────────
pub mod category_breakdown {
    pub const CATEGORY: &str = "category";
    pub const LABEL: &str = "label";
    pub const EMISSIONS: &str = "emissions_kg";
    pub const SHARE_PCT: &str = "share_pct";
}

// ── Scope totals columns ────────────────────────────────────────────────────
pub mod totals {
    pub const BASIS: &str = "basis";
    pub const ADJUSTED: &str = "adjusted";
    pub const RAW: &str = "raw";
}
