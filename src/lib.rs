pub mod aggregation;
pub mod calculation;
pub mod category;
pub mod config;
mod defaults;
pub mod dqi;
pub mod error;
pub mod factors;
pub mod logging;
pub mod model;
pub mod project;
pub mod report;
pub mod schema;
pub mod source;

#[cfg(feature = "python")]
mod python;

pub use aggregation::{aggregate, aggregate_sources, InventoryResults, ScopeTotals};
pub use calculation::{calculate, CalculationResult, CalculationWarning};
pub use category::{CalculationMethod, EmissionCategory, Scope};
pub use dqi::{DataQualityIndicator, Grade, QualityRating};
pub use error::GhgError;
pub use factors::{merge_with_custom, EmissionFactor, FactorLibrary, FactorTable, SubTable};
pub use model::InventoryModel;
pub use project::{BoundaryApproach, BoundarySettings, Facility, Project, Scope3Settings};
pub use source::{EmissionSource, HybridInputs, HybridLine, InstrumentKind, PowerMix, PowerMixEntry};

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyModule;

/// Export schema constants as Python submodules
#[cfg(feature = "python")]
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Facility
    let facility = PyModule::new(m.py(), "facility")?;
    facility.add("FACILITY_ID", schema::facility::FACILITY_ID)?;
    facility.add("NAME", schema::facility::NAME)?;
    facility.add("GROUP", schema::facility::GROUP)?;
    facility.add("EQUITY_SHARE", schema::facility::EQUITY_SHARE)?;
    facility.add("IS_CORPORATE", schema::facility::IS_CORPORATE)?;
    m.add_submodule(&facility)?;

    // Source
    let source = PyModule::new(m.py(), "source")?;
    source.add("SOURCE_ID", schema::source::SOURCE_ID)?;
    source.add("FACILITY_ID", schema::source::FACILITY_ID)?;
    source.add("CATEGORY", schema::source::CATEGORY)?;
    source.add("METHOD", schema::source::METHOD)?;
    source.add("FUEL_TYPE", schema::source::FUEL_TYPE)?;
    source.add("UNIT", schema::source::UNIT)?;
    source.add("MARKET_FACTOR", schema::source::MARKET_FACTOR)?;
    source.add("DESCRIPTION", schema::source::DESCRIPTION)?;
    source.add("MONTHS", schema::source::MONTHS.to_vec())?;
    m.add_submodule(&source)?;

    // DQI
    let dqi = PyModule::new(m.py(), "dqi")?;
    dqi.add("TECHNOLOGICAL", schema::dqi::TECHNOLOGICAL)?;
    dqi.add("TEMPORAL", schema::dqi::TEMPORAL)?;
    dqi.add("GEOGRAPHICAL", schema::dqi::GEOGRAPHICAL)?;
    dqi.add("COMPLETENESS", schema::dqi::COMPLETENESS)?;
    dqi.add("RELIABILITY", schema::dqi::RELIABILITY)?;
    m.add_submodule(&dqi)?;

    // Custom factors
    let factor = PyModule::new(m.py(), "factor")?;
    factor.add("CATEGORY", schema::factor::CATEGORY)?;
    factor.add("NAME", schema::factor::NAME)?;
    factor.add("UNIT", schema::factor::UNIT)?;
    factor.add("FACTOR", schema::factor::FACTOR)?;
    factor.add("GWP", schema::factor::GWP)?;
    factor.add("SOURCE", schema::factor::SOURCE)?;
    factor.add("YEAR", schema::factor::YEAR)?;
    factor.add("REGION", schema::factor::REGION)?;
    factor.add("SUB_TABLE", schema::factor::SUB_TABLE)?;
    m.add_submodule(&factor)?;

    // Sub-table values
    let sub_table = PyModule::new(m.py(), "sub_table")?;
    sub_table.add("ACTIVITY", schema::sub_table::ACTIVITY)?;
    sub_table.add("SPEND", schema::sub_table::SPEND)?;
    m.add_submodule(&sub_table)?;

    // Scope columns
    let scope = PyModule::new(m.py(), "scope")?;
    scope.add("SCOPE1", schema::scope::SCOPE1)?;
    scope.add("SCOPE2_LOCATION", schema::scope::SCOPE2_LOCATION)?;
    scope.add("SCOPE2_MARKET", schema::scope::SCOPE2_MARKET)?;
    scope.add("SCOPE3", schema::scope::SCOPE3)?;
    scope.add("TOTAL_LOCATION", schema::scope::TOTAL_LOCATION)?;
    scope.add("TOTAL_MARKET", schema::scope::TOTAL_MARKET)?;
    m.add_submodule(&scope)?;

    // Result
    let result = PyModule::new(m.py(), "result")?;
    result.add("SOURCE_ID", schema::result::SOURCE_ID)?;
    result.add("FACILITY_ID", schema::result::FACILITY_ID)?;
    result.add("CATEGORY", schema::result::CATEGORY)?;
    result.add("METHOD", schema::result::METHOD)?;
    result.add("FORMULA", schema::result::FORMULA)?;
    result.add("DQI_SCORE", schema::result::DQI_SCORE)?;
    result.add("DQI_RATING", schema::result::DQI_RATING)?;
    result.add("WARNINGS", schema::result::WARNINGS)?;
    m.add_submodule(&result)?;

    // Facility breakdown
    let breakdown = PyModule::new(m.py(), "breakdown")?;
    breakdown.add("FACILITY_ID", schema::breakdown::FACILITY_ID)?;
    breakdown.add("FACILITY_NAME", schema::breakdown::FACILITY_NAME)?;
    breakdown.add("GROUP", schema::breakdown::GROUP)?;
    breakdown.add("OWNERSHIP_FACTOR", schema::breakdown::OWNERSHIP_FACTOR)?;
    breakdown.add("RAW_SUFFIX", schema::breakdown::RAW_SUFFIX)?;
    m.add_submodule(&breakdown)?;

    // Category breakdown
    let category_breakdown = PyModule::new(m.py(), "category_breakdown")?;
    category_breakdown.add("CATEGORY", schema::category_breakdown::CATEGORY)?;
    category_breakdown.add("LABEL", schema::category_breakdown::LABEL)?;
    category_breakdown.add("EMISSIONS", schema::category_breakdown::EMISSIONS)?;
    category_breakdown.add("SHARE_PCT", schema::category_breakdown::SHARE_PCT)?;
    m.add_submodule(&category_breakdown)?;

    // Totals
    let totals = PyModule::new(m.py(), "totals")?;
    totals.add("BASIS", schema::totals::BASIS)?;
    totals.add("ADJUSTED", schema::totals::ADJUSTED)?;
    totals.add("RAW", schema::totals::RAW)?;
    m.add_submodule(&totals)?;

    Ok(())
}

#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::PyInventoryModel>()?;
    m.add_function(wrap_pyfunction!(python::init_logging, m)?)?;
    m.add_function(wrap_pyfunction!(python::init_logging_from_settings, m)?)?;
    m.add_function(wrap_pyfunction!(python::categories, m)?)?;
    add_schema_exports(m)?;
    Ok(())
}
