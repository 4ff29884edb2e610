use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::aggregation::{aggregate, InventoryResults};
use crate::category::{CalculationMethod, EmissionCategory};
use crate::dqi::DataQualityIndicator;
use crate::error::GhgError;
use crate::factors::{EmissionFactor, FactorLibrary, SubTable};
use crate::project::{Facility, Project};
use crate::report::{self, ReportConfig};
use crate::schema::{dqi, facility, factor, source};
use crate::source::{sanitize, EmissionSource, MONTHS_PER_YEAR};

/// A project, its factor library and the latest calculation, with CSV
/// import and export rooted at `base_path`.
pub struct InventoryModel {
    base_path: PathBuf,
    project: Project,
    library: FactorLibrary,
    results: Option<InventoryResults>,
}

impl InventoryModel {
    pub fn new(base_path: impl Into<PathBuf>, project: Project, library: FactorLibrary) -> Self {
        Self {
            base_path: base_path.into(),
            project,
            library,
            results: None,
        }
    }

    /// Empty project on the built-in factor library.
    pub fn with_defaults(base_path: impl Into<PathBuf>, company_name: &str, reporting_year: i32) -> Self {
        Self::new(
            base_path,
            Project::new(company_name, reporting_year),
            FactorLibrary::defaults(),
        )
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Mutable access drops the cached results.
    pub fn project_mut(&mut self) -> &mut Project {
        self.results = None;
        &mut self.project
    }

    pub fn library(&self) -> &FactorLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut FactorLibrary {
        self.results = None;
        &mut self.library
    }

    pub fn results(&self) -> Option<&InventoryResults> {
        self.results.as_ref()
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Load any CSV with all columns as strings, optionally renaming columns.
    pub fn load_csv(
        &self,
        filename: &str,
        rename: Option<HashMap<String, String>>,
    ) -> Result<DataFrame, GhgError> {
        self.read_csv_as_strings(filename, rename)
    }

    /// Load facilities and replace the project's facility list.
    ///
    /// Required columns: facility_id, name.
    /// Optional: group, equity_share (default 100), is_corporate.
    /// Without a corporate row the existing corporate facility is kept.
    pub fn load_facilities(&mut self, filename: Option<&str>) -> Result<DataFrame, GhgError> {
        let fname = filename.unwrap_or("facilities.csv");
        let raw = self.read_csv_as_strings(fname, None)?;
        Self::require_columns(&raw, &[facility::FACILITY_ID, facility::NAME])?;

        let ids = raw.column(facility::FACILITY_ID)?.str()?;
        let names = raw.column(facility::NAME)?.str()?;
        let groups = Self::optional_column(&raw, facility::GROUP)?;
        let shares = Self::optional_column(&raw, facility::EQUITY_SHARE)?;
        let corporate = Self::optional_column(&raw, facility::IS_CORPORATE)?;

        let mut facilities = Vec::with_capacity(raw.height());
        for row in 0..raw.height() {
            let name = cell(Some(names), row).ok_or_else(|| {
                GhgError::InvalidData(format!("{} row {}: facility name is empty", fname, row + 1))
            })?;
            let equity_share = match cell(shares, row) {
                Some(v) => v.parse::<f64>().map_err(|_| {
                    GhgError::InvalidData(format!(
                        "{} row {}: invalid equity share '{}'",
                        fname,
                        row + 1,
                        v
                    ))
                })?,
                None => 100.0,
            };
            let mut f = if cell(corporate, row).map(parse_bool).unwrap_or(false) {
                let mut c = Facility::corporate();
                c.name = name.to_string();
                c.equity_share = equity_share;
                c
            } else {
                Facility::new(name, equity_share)
            };
            if let Some(id) = cell(Some(ids), row) {
                f.id = id.to_string();
            }
            f.group = cell(groups, row).map(str::to_string);
            facilities.push(f);
        }

        let count = facilities.len();
        self.project_mut().replace_facilities(facilities)?;
        info!(file = fname, facilities = count, "facilities loaded");
        Ok(raw)
    }

    /// Load emission sources and replace the project's source list.
    ///
    /// Required columns: facility_id, category, method, fuel_type, unit, jan..dec.
    /// Optional: source_id (UUID when empty), market_factor, description and
    /// the five dqi_* grade columns.
    /// Unparseable quantities count as zero. Unknown facilities, categories
    /// and methods are errors naming the offending row.
    pub fn load_sources(&mut self, filename: Option<&str>) -> Result<DataFrame, GhgError> {
        let fname = filename.unwrap_or("sources.csv");
        let raw = self.read_csv_as_strings(fname, None)?;
        let mut required = vec![
            source::FACILITY_ID,
            source::CATEGORY,
            source::METHOD,
            source::FUEL_TYPE,
            source::UNIT,
        ];
        required.extend(source::MONTHS);
        Self::require_columns(&raw, &required)?;

        let facility_ids = raw.column(source::FACILITY_ID)?.str()?;
        let categories = raw.column(source::CATEGORY)?.str()?;
        let methods = raw.column(source::METHOD)?.str()?;
        let fuel_types = raw.column(source::FUEL_TYPE)?.str()?;
        let units = raw.column(source::UNIT)?.str()?;
        let months = source::MONTHS
            .iter()
            .map(|m| raw.column(m).and_then(|c| c.str()))
            .collect::<Result<Vec<_>, _>>()?;
        // Non-strict cast: cells polars cannot read become null and are
        // parsed leniently per row below.
        let numeric = raw
            .clone()
            .lazy()
            .select(
                source::MONTHS
                    .iter()
                    .map(|m| col(*m).cast(DataType::Float64))
                    .collect::<Vec<_>>(),
            )
            .collect()?;
        let month_values = source::MONTHS
            .iter()
            .map(|m| numeric.column(m).and_then(|c| c.f64()))
            .collect::<Result<Vec<_>, _>>()?;
        let source_ids = Self::optional_column(&raw, source::SOURCE_ID)?;
        let market_factors = Self::optional_column(&raw, source::MARKET_FACTOR)?;
        let descriptions = Self::optional_column(&raw, source::DESCRIPTION)?;
        let grades = dqi::ALL
            .iter()
            .map(|c| Self::optional_column(&raw, c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut sources = Vec::with_capacity(raw.height());
        for row in 0..raw.height() {
            let at = |what: String| format!("{} row {}: {}", fname, row + 1, what);

            let facility_id = cell(Some(facility_ids), row).unwrap_or_default();
            if self.project.facility(facility_id).is_none() {
                return Err(GhgError::UnknownFacility(at(format!("'{}'", facility_id))));
            }
            let category_raw = cell(Some(categories), row).unwrap_or_default();
            let category: EmissionCategory = category_raw
                .parse()
                .map_err(|_| GhgError::UnknownCategory(at(format!("'{}'", category_raw))))?;
            let method_raw = cell(Some(methods), row).unwrap_or_default();
            let method: CalculationMethod = method_raw
                .parse()
                .map_err(|_| GhgError::InvalidData(at(format!("unknown method '{}'", method_raw))))?;

            let mut quantities = [0.0; MONTHS_PER_YEAR];
            for ((q, text), values) in quantities.iter_mut().zip(&months).zip(&month_values) {
                *q = match values.get(row) {
                    Some(v) => sanitize(v),
                    None => parse_quantity(cell(Some(*text), row)),
                };
            }

            let mut s = EmissionSource::new(
                facility_id,
                category,
                method,
                cell(Some(fuel_types), row).unwrap_or_default(),
                cell(Some(units), row).unwrap_or_default(),
            )
            .with_months(quantities);
            if let Some(id) = cell(source_ids, row) {
                s.id = id.to_string();
            }
            s.description = cell(descriptions, row).map(str::to_string);
            s.market_based_factor = match cell(market_factors, row) {
                Some(v) => Some(v.parse::<f64>().map_err(|_| {
                    GhgError::InvalidData(at(format!("invalid market factor '{}'", v)))
                })?),
                None => None,
            };
            s.dqi = parse_dqi(&grades, row).map_err(|e| GhgError::InvalidData(at(e.to_string())))?;
            sources.push(s);
        }

        let count = sources.len();
        self.project_mut().replace_sources(sources)?;
        info!(file = fname, sources = count, "emission sources loaded");
        Ok(raw)
    }

    /// Add user-defined factors to the library.
    ///
    /// Required columns: category, name, unit, factor.
    /// Optional: gwp, source, year, region, sub_table.
    /// Rows sharing category and name become one factor with several units.
    /// Returns the number of factors added.
    pub fn load_custom_factors(&mut self, filename: Option<&str>) -> Result<usize, GhgError> {
        let fname = filename.unwrap_or("custom_factors.csv");
        let raw = self.read_csv_as_strings(fname, None)?;
        Self::require_columns(
            &raw,
            &[factor::CATEGORY, factor::NAME, factor::UNIT, factor::FACTOR],
        )?;

        let categories = raw.column(factor::CATEGORY)?.str()?;
        let names = raw.column(factor::NAME)?.str()?;
        let units = raw.column(factor::UNIT)?.str()?;
        let values = raw.column(factor::FACTOR)?.str()?;
        let gwps = Self::optional_column(&raw, factor::GWP)?;
        let sources = Self::optional_column(&raw, factor::SOURCE)?;
        let years = Self::optional_column(&raw, factor::YEAR)?;
        let regions = Self::optional_column(&raw, factor::REGION)?;
        let sub_tables = Self::optional_column(&raw, factor::SUB_TABLE)?;

        let mut pending: Vec<(EmissionCategory, SubTable, EmissionFactor)> = Vec::new();
        for row in 0..raw.height() {
            let at = |what: String| format!("{} row {}: {}", fname, row + 1, what);

            let category_raw = cell(Some(categories), row).unwrap_or_default();
            let category: EmissionCategory = category_raw
                .parse()
                .map_err(|_| GhgError::UnknownCategory(at(format!("'{}'", category_raw))))?;
            let sub_table: SubTable = cell(sub_tables, row).unwrap_or_default().parse()?;
            let name = cell(Some(names), row)
                .ok_or_else(|| GhgError::InvalidData(at("factor name is empty".into())))?;
            let unit = cell(Some(units), row)
                .ok_or_else(|| GhgError::InvalidData(at("unit is empty".into())))?;
            let value_raw = cell(Some(values), row).unwrap_or_default();
            let value: f64 = value_raw
                .parse()
                .map_err(|_| GhgError::InvalidData(at(format!("invalid factor '{}'", value_raw))))?;

            let idx = match pending
                .iter()
                .position(|(c, _, f)| *c == category && f.matches_name(name))
            {
                Some(i) => i,
                None => {
                    pending.push((category, sub_table, EmissionFactor::new(name, unit, value)));
                    pending.len() - 1
                }
            };
            let entry = &mut pending[idx].2;
            entry.factors.insert(unit.to_string(), value);
            if let Some(g) = cell(gwps, row) {
                entry.gwp = Some(
                    g.parse()
                        .map_err(|_| GhgError::InvalidData(at(format!("invalid gwp '{}'", g))))?,
                );
            }
            if let Some(s) = cell(sources, row) {
                entry.source = Some(s.to_string());
            }
            if let Some(y) = cell(years, row) {
                entry.year = Some(
                    y.parse()
                        .map_err(|_| GhgError::InvalidData(at(format!("invalid year '{}'", y))))?,
                );
            }
            if let Some(r) = cell(regions, row) {
                entry.region = Some(r.to_string());
            }
        }

        // All rows or none: stage on a copy of the library.
        let count = pending.len();
        let mut staged = self.library.clone();
        for (category, sub_table, f) in pending {
            staged.add_custom(category, sub_table, f)?;
        }
        *self.library_mut() = staged;
        info!(file = fname, factors = count, "custom factors loaded");
        Ok(count)
    }

    // ── Project persistence ─────────────────────────────────────────────────

    pub fn save_project(&mut self, filename: &str) -> Result<PathBuf, GhgError> {
        let path = self.base_path.join(filename);
        self.project.save(&path)?;
        Ok(path)
    }

    pub fn load_project(&mut self, filename: &str) -> Result<(), GhgError> {
        let path = self.base_path.join(filename);
        self.project = Project::load(&path)?;
        self.results = None;
        Ok(())
    }

    // ── Calculation ─────────────────────────────────────────────────────────

    /// Calculate every source and return the per-source results frame.
    pub fn calculate(&mut self) -> Result<DataFrame, GhgError> {
        let results = aggregate(&self.project, &self.library);
        let warnings = results.warnings().count();
        if warnings > 0 {
            warn!(warnings, "calculation finished with warnings");
        }
        debug!(
            total_location = results.grand_total_location(),
            total_market = results.grand_total_market(),
            "inventory calculated"
        );
        let frame = results.sources_frame()?;
        self.results = Some(results);
        Ok(frame)
    }

    pub fn scope_totals(&self) -> Result<DataFrame, GhgError> {
        self.require_results()?.totals_frame()
    }

    pub fn facility_breakdown(&self) -> Result<DataFrame, GhgError> {
        self.require_results()?.facilities_frame()
    }

    pub fn category_breakdown(&self) -> Result<DataFrame, GhgError> {
        self.require_results()?.categories_frame()
    }

    /// Write the per-source results as CSV under `base_path`.
    pub fn export_results(&self, filename: Option<&str>) -> Result<PathBuf, GhgError> {
        let mut df = self.require_results()?.sources_frame()?;
        let path = self.base_path.join(filename.unwrap_or("results.csv"));
        let mut file = File::create(&path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)?;
        info!(path = %path.display(), rows = df.height(), "results exported");
        Ok(path)
    }

    // ── Report ──────────────────────────────────────────────────────────────

    pub fn report_html(&self, config: &ReportConfig) -> Result<String, GhgError> {
        let results = self.require_results()?;
        Ok(report::generate_report_html(&self.project, results, config))
    }
}

// ── Private helpers ─────────────────────────────────────────────────────────

impl InventoryModel {
    /// Read a CSV file with all columns as String dtype.
    /// Trims whitespace from column names and applies optional rename.
    fn read_csv_as_strings(
        &self,
        filename: &str,
        rename: Option<HashMap<String, String>>,
    ) -> Result<DataFrame, GhgError> {
        let path = self.base_path.join(filename);
        let mut df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path))?
            .finish()?;

        let trimmed: Vec<String> = df
            .get_column_names_str()
            .iter()
            .map(|c| c.trim().to_string())
            .collect();
        df.set_column_names(trimmed.as_slice())?;

        if let Some(map) = rename {
            let old: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
            let new: Vec<&str> = map.values().map(|s| s.as_str()).collect();
            df = df.lazy().rename(old, new, true).collect()?;
        }

        Ok(df)
    }

    fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), GhgError> {
        for &col_name in required {
            if df.column(col_name).is_err() {
                return Err(GhgError::MissingColumn(col_name.to_string()));
            }
        }
        Ok(())
    }

    fn optional_column<'a>(
        df: &'a DataFrame,
        name: &str,
    ) -> Result<Option<&'a StringChunked>, GhgError> {
        if df.schema().contains(name) {
            Ok(Some(df.column(name)?.str()?))
        } else {
            Ok(None)
        }
    }

    fn require_results(&self) -> Result<&InventoryResults, GhgError> {
        self.results
            .as_ref()
            .ok_or_else(|| GhgError::NotLoaded("results (call calculate first)".into()))
    }
}

/// Trimmed, non-empty cell value.
fn cell(column: Option<&StringChunked>, row: usize) -> Option<&str> {
    column
        .and_then(|c| c.get(row))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y"
    )
}

/// Quantities never fail an import: anything unparseable counts as zero.
/// Commas are accepted only as thousands separators.
fn parse_quantity(value: Option<&str>) -> f64 {
    let Some(v) = value else {
        return 0.0;
    };
    let parsed = if v.contains(',') {
        strip_thousands(v).and_then(|plain| plain.parse::<f64>().ok())
    } else {
        v.parse::<f64>().ok()
    };
    match parsed {
        Some(q) => sanitize(q),
        None => {
            warn!(value = v, "unparseable quantity treated as zero");
            0.0
        }
    }
}

/// "1,234,567.5" → "1234567.5"; `None` unless every group after the first
/// has exactly three digits.
fn strip_thousands(value: &str) -> Option<String> {
    let (int_part, frac) = match value.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (value, None),
    };
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };
    let mut groups = digits.split(',');
    let first = groups.next()?;
    if first.is_empty() || first.len() > 3 || !first.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut plain = format!("{}{}", sign, first);
    for group in groups {
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        plain.push_str(group);
    }
    if let Some(f) = frac {
        plain.push('.');
        plain.push_str(f);
    }
    Some(plain)
}

/// All five grades or none.
fn parse_dqi(
    columns: &[Option<&StringChunked>],
    row: usize,
) -> Result<Option<DataQualityIndicator>, GhgError> {
    let cells: Vec<Option<&str>> = columns.iter().map(|c| cell(*c, row)).collect();
    if cells.iter().all(Option::is_none) {
        return Ok(None);
    }
    let mut grades = [0u8; 5];
    for ((grade, value), name) in grades.iter_mut().zip(&cells).zip(dqi::ALL) {
        let value = value.ok_or_else(|| GhgError::InvalidData(format!("{} is empty", name)))?;
        *grade = value
            .parse()
            .map_err(|_| GhgError::InvalidData(format!("{} '{}' is not a grade", name, value)))?;
    }
    DataQualityIndicator::from_grades(grades).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::BoundaryApproach;
    use crate::schema::{result, scope};
    use std::fs;
    use tempfile::TempDir;

    const FACILITIES: &str = "\
facility_id,name,group,equity_share,is_corporate
hq,Head Office,,100,true
plant, Plant A ,Europe,60,
";

    const SOURCES: &str = "\
source_id,facility_id,category,method,fuel_type,unit,jan,feb,mar,apr,may,jun,jul,aug,sep,oct,nov,dec,dqi_technological,dqi_temporal,dqi_geographical,dqi_completeness,dqi_reliability
gas,plant,stationary_combustion,fuel,Natural Gas,cubic meters,100,100,100,100,100,100,100,100,100,100,100,100,1,1,1,1,1
power,plant,purchased_energy,activity,United Kingdom,kWh,1000,1000,1000,1000,1000,1000,1000,1000,1000,1000,1000,1000,,,,,
,hq,business_travel,spend,Air Travel,USD,n/a,200,,0,0,0,0,0,0,0,0,0,,,,,
";

    fn model_with(files: &[(&str, &str)]) -> (TempDir, InventoryModel) {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        let model = InventoryModel::with_defaults(dir.path(), "Acme", 2024);
        (dir, model)
    }

    #[test]
    fn loads_facilities_and_sources() {
        let (_dir, mut model) =
            model_with(&[("facilities.csv", FACILITIES), ("sources.csv", SOURCES)]);
        model.load_facilities(None).unwrap();
        let raw = model.load_sources(None).unwrap();
        assert_eq!(raw.height(), 3);

        let project = model.project();
        assert_eq!(project.facilities().len(), 2);
        assert_eq!(project.corporate_facility().unwrap().id, "hq");
        assert_eq!(project.facility("plant").unwrap().name, "Plant A");
        assert_eq!(project.facility("plant").unwrap().group.as_deref(), Some("Europe"));

        let gas = project.source("gas").unwrap();
        assert_eq!(gas.total_quantity(), 1200.0);
        assert!(gas.dqi.is_some());
        assert!(project.source("power").unwrap().dqi.is_none());

        let travel = project
            .sources()
            .iter()
            .find(|s| s.category == EmissionCategory::BusinessTravel)
            .unwrap();
        assert!(!travel.id.is_empty());
        assert_eq!(travel.total_quantity(), 200.0);
    }

    #[test]
    fn facilities_without_corporate_keep_default() {
        let (_dir, mut model) = model_with(&[(
            "facilities.csv",
            "facility_id,name\nplant,Plant A\n",
        )]);
        model.load_facilities(None).unwrap();
        assert_eq!(model.project().facilities().len(), 2);
        assert!(model.project().corporate_facility().is_some());
    }

    #[test]
    fn unknown_facility_names_the_row() {
        let (_dir, mut model) = model_with(&[("sources.csv", SOURCES)]);
        let err = model.load_sources(None).unwrap_err();
        assert!(matches!(err, GhgError::UnknownFacility(ref m) if m.contains("row 1")));
    }

    #[test]
    fn unknown_category_is_an_error() {
        let (_dir, mut model) = model_with(&[
            ("facilities.csv", FACILITIES),
            (
                "sources.csv",
                "facility_id,category,method,fuel_type,unit,jan,feb,mar,apr,may,jun,jul,aug,sep,oct,nov,dec\n\
                 hq,teleportation,activity,Beam,km,1,1,1,1,1,1,1,1,1,1,1,1\n",
            ),
        ]);
        model.load_facilities(None).unwrap();
        let err = model.load_sources(None).unwrap_err();
        assert!(matches!(err, GhgError::UnknownCategory(ref m) if m.contains("teleportation")));
    }

    #[test]
    fn missing_month_column_is_reported() {
        let (_dir, mut model) = model_with(&[(
            "sources.csv",
            "facility_id,category,method,fuel_type,unit,jan\n",
        )]);
        let err = model.load_sources(None).unwrap_err();
        assert!(matches!(err, GhgError::MissingColumn(ref c) if c == "feb"));
    }

    #[test]
    fn calculate_and_breakdowns() {
        let (dir, mut model) =
            model_with(&[("facilities.csv", FACILITIES), ("sources.csv", SOURCES)]);
        model.load_facilities(None).unwrap();
        model.load_sources(None).unwrap();
        assert!(model.scope_totals().is_err());

        let frame = model.calculate().unwrap();
        assert_eq!(frame.height(), 3);
        let ids = frame.column(result::SOURCE_ID).unwrap().str().unwrap();
        assert_eq!(ids.get(0), Some("gas"));
        let scope1 = frame.column(scope::SCOPE1).unwrap().f64().unwrap();
        assert!((scope1.get(0).unwrap() - 1200.0 * 2.02).abs() < 1e-6);

        assert_eq!(model.scope_totals().unwrap().height(), 2);
        assert_eq!(model.facility_breakdown().unwrap().height(), 2);
        assert_eq!(model.category_breakdown().unwrap().height(), 1);

        let path = model.export_results(None).unwrap();
        assert_eq!(path, dir.path().join("results.csv"));
        let written = fs::read_to_string(path).unwrap();
        assert!(written.starts_with("source_id,facility_id,category,method"));
    }

    #[test]
    fn equity_boundary_changes_totals() {
        let (_dir, mut model) =
            model_with(&[("facilities.csv", FACILITIES), ("sources.csv", SOURCES)]);
        model.load_facilities(None).unwrap();
        model.load_sources(None).unwrap();
        model
            .project_mut()
            .set_boundary_approach(BoundaryApproach::Equity)
            .unwrap();
        model.calculate().unwrap();
        let results = model.results().unwrap();
        assert!((results.totals.scope1 - 0.6 * 1200.0 * 2.02).abs() < 1e-6);
        assert!((results.raw_totals.scope1 - 1200.0 * 2.02).abs() < 1e-6);
    }

    #[test]
    fn custom_factors_merge_units() {
        let (_dir, mut model) = model_with(&[(
            "custom_factors.csv",
            "category,name,unit,factor,source,year,sub_table\n\
             stationary_combustion,Biogas,cubic meters,0.2,Supplier,2024,\n\
             stationary_combustion,Biogas,kWh,0.02,Supplier,2024,\n\
             purchased_goods_services,Recycled Steel,kg,0.6,,,activity\n",
        )]);
        let added = model.load_custom_factors(None).unwrap();
        assert_eq!(added, 2);
        let biogas = model
            .library()
            .custom_factors()
            .find(|(_, _, f)| f.name == "Biogas")
            .map(|(_, _, f)| f.clone())
            .unwrap();
        assert_eq!(biogas.factor_for("kWh"), Some(0.02));
        assert_eq!(biogas.factor_for("cubic meters"), Some(0.2));
        assert_eq!(biogas.year, Some(2024));
    }

    #[test]
    fn custom_factor_colliding_with_system_is_rejected() {
        let (_dir, mut model) = model_with(&[(
            "custom_factors.csv",
            "category,name,unit,factor\nstationary_combustion,Natural Gas,kWh,0.1\n",
        )]);
        let err = model.load_custom_factors(None).unwrap_err();
        assert!(matches!(err, GhgError::FactorConflict(_)));
    }

    #[test]
    fn load_csv_renames_columns() {
        let (_dir, model) = model_with(&[("any.csv", " site ,value\na,1\n")]);
        let rename = HashMap::from([("site".to_string(), "facility_id".to_string())]);
        let df = model.load_csv("any.csv", Some(rename)).unwrap();
        assert!(df.column("facility_id").is_ok());
    }

    #[test]
    fn project_round_trip_through_model() {
        let (_dir, mut model) =
            model_with(&[("facilities.csv", FACILITIES), ("sources.csv", SOURCES)]);
        model.load_facilities(None).unwrap();
        model.load_sources(None).unwrap();
        model.save_project("project.json").unwrap();

        let mut other = InventoryModel::with_defaults(model.base_path(), "Other", 2020);
        other.load_project("project.json").unwrap();
        assert_eq!(other.project().company_name, "Acme");
        assert_eq!(other.project().sources().len(), 3);
    }

    #[test]
    fn quantity_parsing_is_lenient() {
        assert_eq!(parse_quantity(Some("1,200.5")), 1200.5);
        assert_eq!(parse_quantity(Some("12,345,678")), 12345678.0);
        assert_eq!(parse_quantity(Some("abc")), 0.0);
        assert_eq!(parse_quantity(Some("-3")), 0.0);
        assert_eq!(parse_quantity(None), 0.0);
    }

    #[test]
    fn decimal_comma_is_not_a_thousands_separator() {
        assert_eq!(parse_quantity(Some("1,5")), 0.0);
        assert_eq!(parse_quantity(Some("12,34")), 0.0);
        assert_eq!(parse_quantity(Some("1234,567")), 0.0);
        assert_eq!(parse_quantity(Some(",100")), 0.0);
    }

    #[test]
    fn month_cells_mix_numeric_and_text() {
        let (_dir, mut model) = model_with(&[
            ("facilities.csv", FACILITIES),
            (
                "sources.csv",
                "source_id,facility_id,category,method,fuel_type,unit,jan,feb,mar,apr,may,jun,jul,aug,sep,oct,nov,dec\n\
                 s1,hq,stationary_combustion,fuel,Diesel,litres,\"1,000\",2.5,\"1,5\",n/a,,0,0,0,0,0,0,0\n",
            ),
        ]);
        model.load_facilities(None).unwrap();
        model.load_sources(None).unwrap();
        let months = model.project().source("s1").unwrap().monthly_quantities;
        assert_eq!(months[0], 1000.0);
        assert_eq!(months[1], 2.5);
        assert_eq!(months[2], 0.0);
        assert_eq!(months[3], 0.0);
        assert_eq!(model.project().source("s1").unwrap().total_quantity(), 1002.5);
    }

    #[test]
    fn reloading_facilities_keeps_sources_counted() {
        let (dir, mut model) =
            model_with(&[("facilities.csv", FACILITIES), ("sources.csv", SOURCES)]);
        model.load_facilities(None).unwrap();
        model.load_sources(None).unwrap();
        model.calculate().unwrap();
        let before = model.results().unwrap().totals;

        fs::write(
            dir.path().join("hq_only.csv"),
            "facility_id,name,is_corporate\nhq,Head Office,true\n",
        )
        .unwrap();
        model.load_facilities(Some("hq_only.csv")).unwrap();

        assert!(model.project().validate().is_ok());
        assert_eq!(model.project().source("gas").unwrap().facility_id, "hq");
        model.calculate().unwrap();
        let after = model.results().unwrap().totals;
        assert!((after.scope1 - before.scope1).abs() < 1e-9);
        assert!(model.save_project("project.json").is_ok());
    }

    #[test]
    fn failed_factor_import_leaves_library_unchanged() {
        let (_dir, mut model) = model_with(&[(
            "custom_factors.csv",
            "category,name,unit,factor\n\
             stationary_combustion,Biogas,cubic meters,0.2\n\
             stationary_combustion,Natural Gas,kWh,0.1\n",
        )]);
        let before = model.library().custom_factors().count();
        let err = model.load_custom_factors(None).unwrap_err();
        assert!(matches!(err, GhgError::FactorConflict(_)));
        assert_eq!(model.library().custom_factors().count(), before);
    }
}
