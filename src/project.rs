use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::category::{EmissionCategory, Scope};
use crate::error::GhgError;
use crate::source::EmissionSource;

pub const CORPORATE_FACILITY_NAME: &str = "Corporate";

/// Organisational consolidation approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryApproach {
    Operational,
    Financial,
    Equity,
}

impl BoundaryApproach {
    pub fn as_str(self) -> &'static str {
        match self {
            BoundaryApproach::Operational => "operational",
            BoundaryApproach::Financial => "financial",
            BoundaryApproach::Equity => "equity",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BoundaryApproach::Operational => "Operational control",
            BoundaryApproach::Financial => "Financial control",
            BoundaryApproach::Equity => "Equity share",
        }
    }
}

impl fmt::Display for BoundaryApproach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoundaryApproach {
    type Err = GhgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "operational" | "operational_control" => Ok(BoundaryApproach::Operational),
            "financial" | "financial_control" => Ok(BoundaryApproach::Financial),
            "equity" | "equity_share" => Ok(BoundaryApproach::Equity),
            other => Err(GhgError::InvalidData(format!(
                "Invalid boundary approach: '{}'. Must be 'operational', 'financial' or 'equity'",
                other
            ))),
        }
    }
}

/// Which Scope 3 categories are part of the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope3Settings {
    pub enabled: bool,
    pub categories: BTreeSet<EmissionCategory>,
}

impl Default for Scope3Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            categories: EmissionCategory::scope3_categories().collect(),
        }
    }
}

impl Scope3Settings {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            categories: BTreeSet::new(),
        }
    }

    /// Scope 1 and 2 categories are always included.
    pub fn includes(&self, category: EmissionCategory) -> bool {
        match category.scope() {
            Scope::Scope3 => self.enabled && self.categories.contains(&category),
            _ => true,
        }
    }
}

/// The project-level settings the calculation depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundarySettings {
    pub approach: BoundaryApproach,
    pub scope3: Scope3Settings,
}

impl BoundarySettings {
    pub fn new(approach: BoundaryApproach) -> Self {
        Self {
            approach,
            scope3: Scope3Settings::default(),
        }
    }

    pub fn with_scope3(mut self, scope3: Scope3Settings) -> Self {
        self.scope3 = scope3;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Percentage 0..=100.
    pub equity_share: f64,
    #[serde(default)]
    pub is_corporate: bool,
}

impl Facility {
    pub fn new(name: &str, equity_share: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            group: None,
            equity_share,
            is_corporate: false,
        }
    }

    pub fn corporate() -> Self {
        let mut facility = Self::new(CORPORATE_FACILITY_NAME, 100.0);
        facility.is_corporate = true;
        facility
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    /// Share of this facility's emissions counted under `approach`.
    pub fn ownership_factor(&self, approach: BoundaryApproach) -> f64 {
        match approach {
            BoundaryApproach::Equity => self.equity_share / 100.0,
            BoundaryApproach::Operational | BoundaryApproach::Financial => 1.0,
        }
    }

    fn validate(&self) -> Result<(), GhgError> {
        if self.id.trim().is_empty() {
            return Err(GhgError::Validation("Facility id must not be empty".into()));
        }
        if !(0.0..=100.0).contains(&self.equity_share) {
            return Err(GhgError::Validation(format!(
                "Facility '{}' equity share {} is outside 0..=100",
                self.name, self.equity_share
            )));
        }
        Ok(())
    }
}

/// In-memory project state. Mutations stay in memory until `save`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub company_name: String,
    pub reporting_year: i32,
    boundary_approach: Option<BoundaryApproach>,
    pub scope3_settings: Scope3Settings,
    facilities: Vec<Facility>,
    sources: Vec<EmissionSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_saved: Option<DateTime<Utc>>,
}

impl Project {
    /// Onboarding: creates the project with its corporate catch-all facility.
    pub fn new(company_name: &str, reporting_year: i32) -> Self {
        Self {
            company_name: company_name.to_string(),
            reporting_year,
            boundary_approach: None,
            scope3_settings: Scope3Settings::default(),
            facilities: vec![Facility::corporate()],
            sources: Vec::new(),
            last_saved: None,
        }
    }

    pub fn with_boundary(company_name: &str, reporting_year: i32, approach: BoundaryApproach) -> Self {
        let mut project = Self::new(company_name, reporting_year);
        project.boundary_approach = Some(approach);
        project
    }

    // ── Boundary ────────────────────────────────────────────────────────────

    /// Operational control until the boundary wizard has run.
    pub fn boundary_approach(&self) -> BoundaryApproach {
        self.boundary_approach
            .unwrap_or(BoundaryApproach::Operational)
    }

    pub fn boundary_chosen(&self) -> bool {
        self.boundary_approach.is_some()
    }

    /// The approach is chosen once. Choosing the same approach again is a
    /// no-op; a different one is rejected.
    pub fn set_boundary_approach(&mut self, approach: BoundaryApproach) -> Result<(), GhgError> {
        match self.boundary_approach {
            Some(current) if current != approach => Err(GhgError::Validation(format!(
                "Boundary approach already set to '{}'",
                current
            ))),
            _ => {
                self.boundary_approach = Some(approach);
                Ok(())
            }
        }
    }

    pub fn boundary_settings(&self) -> BoundarySettings {
        BoundarySettings::new(self.boundary_approach()).with_scope3(self.scope3_settings.clone())
    }

    pub fn set_scope3_enabled(&mut self, enabled: bool) {
        self.scope3_settings.enabled = enabled;
    }

    pub fn set_scope3_category(
        &mut self,
        category: EmissionCategory,
        enabled: bool,
    ) -> Result<(), GhgError> {
        if category.scope() != Scope::Scope3 {
            return Err(GhgError::Validation(format!(
                "'{}' is not a Scope 3 category",
                category
            )));
        }
        if enabled {
            self.scope3_settings.categories.insert(category);
        } else {
            self.scope3_settings.categories.remove(&category);
        }
        Ok(())
    }

    // ── Facilities ──────────────────────────────────────────────────────────

    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    pub fn facility(&self, id: &str) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.id == id)
    }

    pub fn corporate_facility(&self) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.is_corporate)
    }

    pub fn add_facility(&mut self, facility: Facility) -> Result<String, GhgError> {
        facility.validate()?;
        if self.facility(&facility.id).is_some() {
            return Err(GhgError::Validation(format!(
                "Facility id '{}' already exists",
                facility.id
            )));
        }
        if facility.is_corporate && self.corporate_facility().is_some() {
            return Err(GhgError::Validation(
                "Project already has a corporate facility".into(),
            ));
        }
        let id = facility.id.clone();
        debug!(facility_id = %id, name = %facility.name, "facility added");
        self.facilities.push(facility);
        Ok(id)
    }

    /// Replace a facility's details. The corporate flag cannot change.
    pub fn update_facility(&mut self, facility: Facility) -> Result<(), GhgError> {
        facility.validate()?;
        let existing = self
            .facilities
            .iter_mut()
            .find(|f| f.id == facility.id)
            .ok_or_else(|| GhgError::UnknownFacility(facility.id.clone()))?;
        if existing.is_corporate != facility.is_corporate {
            return Err(GhgError::Validation(
                "The corporate flag of a facility cannot be changed".into(),
            ));
        }
        *existing = facility;
        Ok(())
    }

    /// Remove a facility. Its sources move to the corporate facility.
    pub fn remove_facility(&mut self, id: &str) -> Result<Facility, GhgError> {
        let pos = self
            .facilities
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| GhgError::UnknownFacility(id.to_string()))?;
        if self.facilities[pos].is_corporate {
            return Err(GhgError::Validation(
                "The corporate facility cannot be removed".into(),
            ));
        }
        let removed = self.facilities.remove(pos);
        let corporate_id = self
            .corporate_facility()
            .map(|f| f.id.clone())
            .ok_or_else(|| GhgError::Validation("Project has no corporate facility".into()))?;
        let mut moved = 0usize;
        for source in self.sources.iter_mut().filter(|s| s.facility_id == id) {
            source.facility_id = corporate_id.clone();
            moved += 1;
        }
        info!(facility_id = %id, moved, "facility removed; sources reassigned to corporate");
        Ok(removed)
    }

    /// Replace every facility. Keeps the existing corporate facility when
    /// the replacement set has none. Sources of facilities that are gone
    /// move to the corporate facility, as with `remove_facility`.
    pub fn replace_facilities(&mut self, facilities: Vec<Facility>) -> Result<(), GhgError> {
        let mut next = facilities;
        if !next.iter().any(|f| f.is_corporate) {
            let corporate = self
                .corporate_facility()
                .cloned()
                .unwrap_or_else(Facility::corporate);
            next.insert(0, corporate);
        }
        let previous = std::mem::replace(&mut self.facilities, next);
        if let Err(e) = self.validate_facilities() {
            self.facilities = previous;
            return Err(e);
        }

        let known: BTreeSet<String> = self.facilities.iter().map(|f| f.id.clone()).collect();
        let corporate_id = self
            .corporate_facility()
            .map(|f| f.id.clone())
            .ok_or_else(|| GhgError::Validation("Project has no corporate facility".into()))?;
        let mut moved = 0usize;
        for source in self
            .sources
            .iter_mut()
            .filter(|s| !known.contains(&s.facility_id))
        {
            source.facility_id = corporate_id.clone();
            moved += 1;
        }
        if moved > 0 {
            warn!(moved, "facilities replaced; orphaned sources reassigned to corporate");
        }
        Ok(())
    }

    // ── Sources ─────────────────────────────────────────────────────────────

    pub fn sources(&self) -> &[EmissionSource] {
        &self.sources
    }

    pub fn source(&self, id: &str) -> Option<&EmissionSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn add_source(&mut self, source: EmissionSource) -> Result<String, GhgError> {
        self.check_source(&source)?;
        if self.source(&source.id).is_some() {
            return Err(GhgError::Validation(format!(
                "Source id '{}' already exists",
                source.id
            )));
        }
        let id = source.id.clone();
        self.sources.push(source);
        Ok(id)
    }

    pub fn update_source(&mut self, source: EmissionSource) -> Result<(), GhgError> {
        self.check_source(&source)?;
        let existing = self
            .sources
            .iter_mut()
            .find(|s| s.id == source.id)
            .ok_or_else(|| GhgError::UnknownSource(source.id.clone()))?;
        *existing = source;
        Ok(())
    }

    pub fn remove_source(&mut self, id: &str) -> Result<EmissionSource, GhgError> {
        let pos = self
            .sources
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| GhgError::UnknownSource(id.to_string()))?;
        Ok(self.sources.remove(pos))
    }

    /// Replace every source; all of them must reference known facilities.
    pub fn replace_sources(&mut self, sources: Vec<EmissionSource>) -> Result<(), GhgError> {
        for source in &sources {
            self.check_source(source)?;
        }
        self.sources = sources;
        Ok(())
    }

    fn check_source(&self, source: &EmissionSource) -> Result<(), GhgError> {
        if source.id.trim().is_empty() {
            return Err(GhgError::Validation("Source id must not be empty".into()));
        }
        if self.facility(&source.facility_id).is_none() {
            return Err(GhgError::UnknownFacility(source.facility_id.clone()));
        }
        if source.market_based_factor.is_some() && source.category.scope() != Scope::Scope2 {
            return Err(GhgError::Validation(format!(
                "Source '{}': market-based factor only applies to Scope 2",
                source.id
            )));
        }
        Ok(())
    }

    // ── Invariants ──────────────────────────────────────────────────────────

    fn validate_facilities(&self) -> Result<(), GhgError> {
        let corporate = self.facilities.iter().filter(|f| f.is_corporate).count();
        if corporate != 1 {
            return Err(GhgError::Validation(format!(
                "Expected exactly one corporate facility, found {}",
                corporate
            )));
        }
        let mut seen = BTreeSet::new();
        for facility in &self.facilities {
            facility.validate()?;
            if !seen.insert(facility.id.as_str()) {
                return Err(GhgError::Validation(format!(
                    "Duplicate facility id '{}'",
                    facility.id
                )));
            }
        }
        Ok(())
    }

    /// Check every project invariant; returns the first violation.
    pub fn validate(&self) -> Result<(), GhgError> {
        self.validate_facilities()?;
        let mut seen = BTreeSet::new();
        for source in &self.sources {
            self.check_source(source)?;
            if !seen.insert(source.id.as_str()) {
                return Err(GhgError::Validation(format!(
                    "Duplicate source id '{}'",
                    source.id
                )));
            }
        }
        Ok(())
    }

    // ── Persistence ─────────────────────────────────────────────────────────

    pub fn to_json(&self) -> Result<String, GhgError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, GhgError> {
        let project: Project = serde_json::from_str(json)?;
        project.validate()?;
        Ok(project)
    }

    /// Persist the project and stamp `last_saved`.
    pub fn save(&mut self, path: &Path) -> Result<(), GhgError> {
        self.validate()?;
        let previous = self.last_saved.replace(Utc::now());
        let written = self
            .to_json()
            .and_then(|json| fs::write(path, json).map_err(GhgError::from));
        if let Err(e) = written {
            self.last_saved = previous;
            return Err(e);
        }
        info!(path = %path.display(), sources = self.sources.len(), "project saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, GhgError> {
        let json = fs::read_to_string(path)?;
        let project = Self::from_json(&json)?;
        info!(path = %path.display(), sources = project.sources.len(), "project loaded");
        Ok(project)
    }
}
