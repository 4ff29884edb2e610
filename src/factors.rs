use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::category::{CalculationMethod, EmissionCategory};
use crate::error::GhgError;
use crate::schema;

/// One emission factor: kg CO2e per unit, for each unit it supports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionFactor {
    pub name: String,
    pub translation_key: String,
    /// unit → kg CO2e per unit
    pub factors: BTreeMap<String, f64>,
    /// Global warming potential (kg CO2e per kg released), fugitive gases only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gwp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub is_custom: bool,
}

impl EmissionFactor {
    pub fn new(name: &str, unit: &str, factor: f64) -> Self {
        let mut factors = BTreeMap::new();
        factors.insert(unit.to_string(), factor);
        Self {
            name: name.to_string(),
            translation_key: translation_key(name),
            factors,
            gwp: None,
            source: None,
            year: None,
            region: None,
            is_custom: false,
        }
    }

    /// A fugitive gas entry, priced per kilogram released.
    pub fn gas(name: &str, gwp: f64) -> Self {
        let mut factor = Self::new(name, "kg", gwp);
        factor.gwp = Some(gwp);
        factor
    }

    pub fn with_unit(mut self, unit: &str, factor: f64) -> Self {
        self.factors.insert(unit.to_string(), factor);
        self
    }

    pub fn with_source(mut self, source: &str, year: i32) -> Self {
        self.source = Some(source.to_string());
        self.year = Some(year);
        self
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.factors.keys().map(|u| u.as_str())
    }

    /// Factor for a unit: exact match first, then case-insensitive.
    pub fn factor_for(&self, unit: &str) -> Option<f64> {
        let unit = unit.trim();
        self.factors.get(unit).copied().or_else(|| {
            self.factors
                .iter()
                .find(|(u, _)| u.eq_ignore_ascii_case(unit))
                .map(|(_, v)| *v)
        })
    }

    pub fn matches_name(&self, name: &str) -> bool {
        normalize_name(&self.name) == normalize_name(name)
    }

    fn validate(&self) -> Result<(), GhgError> {
        if self.name.trim().is_empty() {
            return Err(GhgError::Validation("Factor name must not be empty".into()));
        }
        if self.factors.is_empty() {
            return Err(GhgError::Validation(format!(
                "Factor '{}' must define at least one unit",
                self.name
            )));
        }
        let bad = self
            .factors
            .iter()
            .chain(self.gwp.iter().map(|g| (&self.name, g)))
            .find(|(_, v)| !v.is_finite() || **v < 0.0);
        if let Some((unit, value)) = bad {
            return Err(GhgError::Validation(format!(
                "Factor '{}' has invalid value {} for '{}'",
                self.name, value, unit
            )));
        }
        Ok(())
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

fn translation_key(name: &str) -> String {
    let mut key = String::from("factor.");
    let mut last_sep = true;
    for ch in name.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            key.push(ch.to_ascii_lowercase());
            last_sep = false;
        } else if !last_sep {
            key.push('_');
            last_sep = true;
        }
    }
    while key.ends_with('_') {
        key.pop();
    }
    key
}

/// Which half of a structured table an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubTable {
    Activity,
    Spend,
}

impl SubTable {
    pub fn for_method(method: CalculationMethod) -> Self {
        match method {
            CalculationMethod::Spend => SubTable::Spend,
            _ => SubTable::Activity,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubTable::Activity => schema::sub_table::ACTIVITY,
            SubTable::Spend => schema::sub_table::SPEND,
        }
    }
}

impl fmt::Display for SubTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubTable {
    type Err = GhgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "activity" => Ok(SubTable::Activity),
            "spend" => Ok(SubTable::Spend),
            other => Err(GhgError::InvalidData(format!(
                "Invalid sub_table: '{}'. Must be 'activity' or 'spend'",
                other
            ))),
        }
    }
}

/// Factors of one category: a flat list, or activity and spend halves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FactorTable {
    List {
        factors: Vec<EmissionFactor>,
    },
    Structured {
        activity: Vec<EmissionFactor>,
        spend: Vec<EmissionFactor>,
    },
}

impl FactorTable {
    pub fn list(factors: Vec<EmissionFactor>) -> Self {
        FactorTable::List { factors }
    }

    pub fn structured(activity: Vec<EmissionFactor>, spend: Vec<EmissionFactor>) -> Self {
        FactorTable::Structured { activity, spend }
    }

    /// Find a factor by name. Structured tables search the half matching
    /// the method first and fall back to the other half.
    pub fn find(&self, method: CalculationMethod, name: &str) -> Option<&EmissionFactor> {
        match self {
            FactorTable::List { factors } => factors.iter().find(|f| f.matches_name(name)),
            FactorTable::Structured { activity, spend } => {
                let (preferred, fallback) = match SubTable::for_method(method) {
                    SubTable::Activity => (activity, spend),
                    SubTable::Spend => (spend, activity),
                };
                preferred
                    .iter()
                    .chain(fallback.iter())
                    .find(|f| f.matches_name(name))
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries().any(|(_, f)| f.matches_name(name))
    }

    /// All entries with the half they belong to. List entries report
    /// `Activity`.
    pub fn entries(&self) -> Box<dyn Iterator<Item = (SubTable, &EmissionFactor)> + '_> {
        match self {
            FactorTable::List { factors } => {
                Box::new(factors.iter().map(|f| (SubTable::Activity, f)))
            }
            FactorTable::Structured { activity, spend } => Box::new(
                activity
                    .iter()
                    .map(|f| (SubTable::Activity, f))
                    .chain(spend.iter().map(|f| (SubTable::Spend, f))),
            ),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FactorTable::List { factors } => factors.len(),
            FactorTable::Structured { activity, spend } => activity.len() + spend.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bucket_mut(&mut self, sub_table: SubTable) -> &mut Vec<EmissionFactor> {
        match self {
            FactorTable::List { factors } => factors,
            FactorTable::Structured { activity, spend } => match sub_table {
                SubTable::Activity => activity,
                SubTable::Spend => spend,
            },
        }
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut EmissionFactor> {
        match self {
            FactorTable::List { factors } => factors.iter_mut().find(|f| f.matches_name(name)),
            FactorTable::Structured { activity, spend } => activity
                .iter_mut()
                .chain(spend.iter_mut())
                .find(|f| f.matches_name(name)),
        }
    }

    fn remove(&mut self, name: &str) -> Option<EmissionFactor> {
        let buckets: Vec<&mut Vec<EmissionFactor>> = match self {
            FactorTable::List { factors } => vec![factors],
            FactorTable::Structured { activity, spend } => vec![activity, spend],
        };
        for bucket in buckets {
            if let Some(pos) = bucket.iter().position(|f| f.matches_name(name)) {
                return Some(bucket.remove(pos));
            }
        }
        None
    }
}

/// Outcome of resolving a factor for one source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FactorLookup<'a> {
    Found {
        factor: &'a EmissionFactor,
        value: f64,
    },
    /// The entry exists but has no factor for the requested unit.
    MissingUnit(&'a EmissionFactor),
    Missing,
}

/// Factor tables for every category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactorLibrary {
    tables: BTreeMap<EmissionCategory, FactorTable>,
}

/// Result of merging saved custom factors into a base library.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeReport {
    pub added: Vec<(EmissionCategory, String)>,
    /// Custom entries dropped because a base entry has the same name.
    pub shadowed: Vec<(EmissionCategory, String)>,
}

impl FactorLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in system factors.
    pub fn defaults() -> Self {
        crate::defaults::default_library()
    }

    pub fn with_table(mut self, category: EmissionCategory, table: FactorTable) -> Self {
        self.tables.insert(category, table);
        self
    }

    pub fn set_table(&mut self, category: EmissionCategory, table: FactorTable) {
        self.tables.insert(category, table);
    }

    pub fn table(&self, category: EmissionCategory) -> Option<&FactorTable> {
        self.tables.get(&category)
    }

    pub fn tables(&self) -> impl Iterator<Item = (EmissionCategory, &FactorTable)> {
        self.tables.iter().map(|(c, t)| (*c, t))
    }

    pub fn resolve(
        &self,
        category: EmissionCategory,
        method: CalculationMethod,
        name: &str,
        unit: &str,
    ) -> FactorLookup<'_> {
        let Some(factor) = self
            .tables
            .get(&category)
            .and_then(|t| t.find(method, name))
        else {
            return FactorLookup::Missing;
        };
        match factor.factor_for(unit) {
            Some(value) => FactorLookup::Found { factor, value },
            None => FactorLookup::MissingUnit(factor),
        }
    }

    pub fn custom_factors(&self) -> impl Iterator<Item = (EmissionCategory, SubTable, &EmissionFactor)> {
        self.tables.iter().flat_map(|(c, t)| {
            t.entries()
                .filter(|(_, f)| f.is_custom)
                .map(move |(s, f)| (*c, s, f))
        })
    }

    // ── Factor manager ──────────────────────────────────────────────────────

    /// Add a user-defined factor. Names are unique within a category.
    pub fn add_custom(
        &mut self,
        category: EmissionCategory,
        sub_table: SubTable,
        mut factor: EmissionFactor,
    ) -> Result<(), GhgError> {
        factor.validate()?;
        factor.is_custom = true;
        if factor.translation_key.is_empty() {
            factor.translation_key = translation_key(&factor.name);
        }
        let table = self
            .tables
            .entry(category)
            .or_insert_with(|| FactorTable::list(Vec::new()));
        if table.contains(&factor.name) {
            return Err(GhgError::FactorConflict(format!(
                "'{}' already exists in {}",
                factor.name, category
            )));
        }
        debug!(category = %category, name = %factor.name, "custom factor added");
        table.bucket_mut(sub_table).push(factor);
        Ok(())
    }

    /// Replace a custom factor. System factors cannot be edited.
    pub fn update_custom(
        &mut self,
        category: EmissionCategory,
        name: &str,
        mut replacement: EmissionFactor,
    ) -> Result<(), GhgError> {
        replacement.validate()?;
        let table = self
            .tables
            .get_mut(&category)
            .ok_or_else(|| GhgError::UnknownFactor(format!("{} in {}", name, category)))?;
        if !replacement.matches_name(name) && table.contains(&replacement.name) {
            return Err(GhgError::FactorConflict(format!(
                "'{}' already exists in {}",
                replacement.name, category
            )));
        }
        let existing = table
            .find_mut(name)
            .ok_or_else(|| GhgError::UnknownFactor(format!("{} in {}", name, category)))?;
        if !existing.is_custom {
            return Err(GhgError::FactorConflict(format!(
                "'{}' is a system factor and cannot be edited",
                existing.name
            )));
        }
        replacement.is_custom = true;
        if replacement.translation_key.is_empty() {
            replacement.translation_key = translation_key(&replacement.name);
        }
        *existing = replacement;
        Ok(())
    }

    /// Delete a custom factor. System factors cannot be deleted.
    pub fn remove_custom(
        &mut self,
        category: EmissionCategory,
        name: &str,
    ) -> Result<EmissionFactor, GhgError> {
        let table = self
            .tables
            .get_mut(&category)
            .ok_or_else(|| GhgError::UnknownFactor(format!("{} in {}", name, category)))?;
        let is_custom = table
            .entries()
            .find(|(_, f)| f.matches_name(name))
            .map(|(_, f)| f.is_custom);
        match is_custom {
            None => Err(GhgError::UnknownFactor(format!("{} in {}", name, category))),
            Some(false) => Err(GhgError::FactorConflict(format!(
                "'{}' is a system factor and cannot be deleted",
                name
            ))),
            Some(true) => table
                .remove(name)
                .ok_or_else(|| GhgError::UnknownFactor(format!("{} in {}", name, category))),
        }
    }
}

/// Merge saved factors into a fresh base library.
///
/// The result is the base library plus every saved entry flagged custom
/// whose name does not collide with a base entry of the same category.
/// Base entries always win. Non-custom saved entries are dropped so that
/// system factors come from `base` only.
pub fn merge_with_custom(base: &FactorLibrary, saved: &FactorLibrary) -> (FactorLibrary, MergeReport) {
    let mut merged = base.clone();
    let mut report = MergeReport::default();

    for (category, sub_table, factor) in saved.custom_factors() {
        let collides = base
            .table(category)
            .map(|t| t.contains(&factor.name))
            .unwrap_or(false);
        if collides {
            warn!(category = %category, name = %factor.name, "custom factor shadowed by system factor");
            report.shadowed.push((category, factor.name.clone()));
            continue;
        }
        let table = merged
            .tables
            .entry(category)
            .or_insert_with(|| FactorTable::list(Vec::new()));
        // Two saved customs with the same name: first one wins.
        if table.contains(&factor.name) {
            report.shadowed.push((category, factor.name.clone()));
            continue;
        }
        table.bucket_mut(sub_table).push(factor.clone());
        report.added.push((category, factor.name.clone()));
    }

    debug!(
        added = report.added.len(),
        shadowed = report.shadowed.len(),
        "factor library merged"
    );
    (merged, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn library() -> FactorLibrary {
        FactorLibrary::new()
            .with_table(
                EmissionCategory::StationaryCombustion,
                FactorTable::list(vec![EmissionFactor::new("Natural Gas", "cubic meters", 2.0)
                    .with_unit("kWh", 0.18)]),
            )
            .with_table(
                EmissionCategory::PurchasedGoodsServices,
                FactorTable::structured(
                    vec![EmissionFactor::new("Steel", "kg", 1.85)],
                    vec![EmissionFactor::new("Steel", "USD", 0.9)],
                ),
            )
    }

    #[test]
    fn resolve_matches_name_case_insensitively() {
        let lib = library();
        match lib.resolve(
            EmissionCategory::StationaryCombustion,
            CalculationMethod::Fuel,
            "  natural gas ",
            "KWH",
        ) {
            FactorLookup::Found { value, .. } => assert_eq!(value, 0.18),
            other => panic!("unexpected lookup {other:?}"),
        }
    }

    #[test]
    fn resolve_reports_missing_unit_and_missing_entry() {
        let lib = library();
        assert!(matches!(
            lib.resolve(
                EmissionCategory::StationaryCombustion,
                CalculationMethod::Fuel,
                "Natural Gas",
                "litres"
            ),
            FactorLookup::MissingUnit(_)
        ));
        assert_eq!(
            lib.resolve(
                EmissionCategory::MobileCombustion,
                CalculationMethod::Fuel,
                "Diesel",
                "litres"
            ),
            FactorLookup::Missing
        );
    }

    #[test]
    fn structured_tables_prefer_the_method_half() {
        let lib = library();
        let spend = lib.resolve(
            EmissionCategory::PurchasedGoodsServices,
            CalculationMethod::Spend,
            "Steel",
            "USD",
        );
        assert!(matches!(spend, FactorLookup::Found { value, .. } if value == 0.9));
        let activity = lib.resolve(
            EmissionCategory::PurchasedGoodsServices,
            CalculationMethod::Activity,
            "Steel",
            "kg",
        );
        assert!(matches!(activity, FactorLookup::Found { value, .. } if value == 1.85));
    }

    #[test]
    fn translation_keys_are_slugged() {
        assert_eq!(translation_key("Natural Gas (CNG)"), "factor.natural_gas_cng");
        assert_eq!(EmissionFactor::new("R-410A", "kg", 1.0).translation_key, "factor.r_410a");
    }

    #[test]
    fn custom_factor_crud() {
        let mut lib = library();
        lib.add_custom(
            EmissionCategory::StationaryCombustion,
            SubTable::Activity,
            EmissionFactor::new("Biogas", "cubic meters", 0.2),
        )
        .unwrap();
        assert_eq!(lib.custom_factors().count(), 1);

        let dup = lib.add_custom(
            EmissionCategory::StationaryCombustion,
            SubTable::Activity,
            EmissionFactor::new("biogas", "kWh", 0.1),
        );
        assert!(matches!(dup, Err(GhgError::FactorConflict(_))));

        lib.update_custom(
            EmissionCategory::StationaryCombustion,
            "Biogas",
            EmissionFactor::new("Biogas", "cubic meters", 0.25),
        )
        .unwrap();
        let updated = lib.resolve(
            EmissionCategory::StationaryCombustion,
            CalculationMethod::Fuel,
            "Biogas",
            "cubic meters",
        );
        assert!(matches!(updated, FactorLookup::Found { value, factor } if value == 0.25 && factor.is_custom));

        let removed = lib
            .remove_custom(EmissionCategory::StationaryCombustion, "Biogas")
            .unwrap();
        assert_eq!(removed.name, "Biogas");
        assert_eq!(lib.custom_factors().count(), 0);
    }

    #[test]
    fn system_factors_are_read_only() {
        let mut lib = library();
        let edit = lib.update_custom(
            EmissionCategory::StationaryCombustion,
            "Natural Gas",
            EmissionFactor::new("Natural Gas", "cubic meters", 9.0),
        );
        assert!(matches!(edit, Err(GhgError::FactorConflict(_))));
        let delete = lib.remove_custom(EmissionCategory::StationaryCombustion, "Natural Gas");
        assert!(matches!(delete, Err(GhgError::FactorConflict(_))));
        let unknown = lib.remove_custom(EmissionCategory::StationaryCombustion, "Peat");
        assert!(matches!(unknown, Err(GhgError::UnknownFactor(_))));
    }

    #[test]
    fn invalid_custom_factor_is_rejected() {
        let mut lib = FactorLibrary::new();
        let result = lib.add_custom(
            EmissionCategory::OnSiteWaste,
            SubTable::Activity,
            EmissionFactor::new("Sludge", "tonnes", f64::NAN),
        );
        assert!(matches!(result, Err(GhgError::Validation(_))));
    }

    #[test]
    fn merge_keeps_base_and_non_colliding_customs() {
        let base = library();

        let mut saved = FactorLibrary::new().with_table(
            EmissionCategory::StationaryCombustion,
            // Stale system value that must not survive the merge.
            FactorTable::list(vec![EmissionFactor::new("Natural Gas", "cubic meters", 1.0)]),
        );
        saved
            .add_custom(
                EmissionCategory::StationaryCombustion,
                SubTable::Activity,
                EmissionFactor::new("Wood Pellets", "kg", 0.07),
            )
            .unwrap();
        saved
            .add_custom(
                EmissionCategory::PurchasedGoodsServices,
                SubTable::Spend,
                EmissionFactor::new("Consulting", "USD", 0.12),
            )
            .unwrap();
        let mut colliding = EmissionFactor::new("Steel", "kg", 3.0);
        colliding.is_custom = true;
        saved.set_table(
            EmissionCategory::CapitalGoods,
            FactorTable::list(vec![EmissionFactor::new("Server", "unit", 500.0)]),
        );
        let mut saved_goods = saved
            .table(EmissionCategory::PurchasedGoodsServices)
            .cloned()
            .unwrap();
        if let FactorTable::List { factors } = &mut saved_goods {
            factors.push(colliding);
        }
        saved.set_table(EmissionCategory::PurchasedGoodsServices, saved_goods);

        let (merged, report) = merge_with_custom(&base, &saved);

        let gas = merged.resolve(
            EmissionCategory::StationaryCombustion,
            CalculationMethod::Fuel,
            "Natural Gas",
            "cubic meters",
        );
        assert!(matches!(gas, FactorLookup::Found { value, .. } if value == 2.0));
        assert_eq!(
            report.added,
            vec![
                (EmissionCategory::StationaryCombustion, "Wood Pellets".to_string()),
                (EmissionCategory::PurchasedGoodsServices, "Consulting".to_string()),
            ]
        );
        assert_eq!(
            report.shadowed,
            vec![(EmissionCategory::PurchasedGoodsServices, "Steel".to_string())]
        );
        // Non-custom saved entries are not carried over.
        assert!(merged.table(EmissionCategory::CapitalGoods).is_none());
        // Reachable through the spend lookup of the base structured table.
        let consulting = merged.resolve(
            EmissionCategory::PurchasedGoodsServices,
            CalculationMethod::Spend,
            "Consulting",
            "USD",
        );
        assert!(matches!(consulting, FactorLookup::Found { value, .. } if value == 0.12));
    }

    #[test]
    fn merge_is_deterministic() {
        let base = library();
        let mut saved = FactorLibrary::new();
        saved
            .add_custom(
                EmissionCategory::OnSiteWaste,
                SubTable::Activity,
                EmissionFactor::new("Sludge", "tonnes", 12.0),
            )
            .unwrap();
        let first = merge_with_custom(&base, &saved);
        let second = merge_with_custom(&base, &saved);
        assert_eq!(first, second);
    }
}
