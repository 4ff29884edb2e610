use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;

use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use crate::calculation::{calculate, CalculationResult, CalculationWarning};
use crate::category::{CalculationMethod, EmissionCategory, Scope};
use crate::dqi::{round2, QualityRating};
use crate::error::GhgError;
use crate::factors::FactorLibrary;
use crate::project::{BoundaryApproach, BoundarySettings, Facility, Project};
use crate::schema::{breakdown, category_breakdown, result, scope, totals};
use crate::source::EmissionSource;

const HIGH_PRIMARY_SHARE: f64 = 0.8;
const MEDIUM_PRIMARY_SHARE: f64 = 0.4;

/// kg CO2e per reporting bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScopeTotals {
    pub scope1: f64,
    pub scope2_location: f64,
    pub scope2_market: f64,
    pub scope3: f64,
}

impl ScopeTotals {
    pub fn from_result(result: &CalculationResult) -> Self {
        Self {
            scope1: result.scope1,
            scope2_location: result.scope2_location,
            scope2_market: result.scope2_market,
            scope3: result.scope3,
        }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            scope1: self.scope1 * factor,
            scope2_location: self.scope2_location * factor,
            scope2_market: self.scope2_market * factor,
            scope3: self.scope3 * factor,
        }
    }

    /// Scope 1 + Scope 2 (location-based) + Scope 3.
    pub fn total_location(&self) -> f64 {
        self.scope1 + self.scope2_location + self.scope3
    }

    /// Scope 1 + Scope 2 (market-based) + Scope 3.
    pub fn total_market(&self) -> f64 {
        self.scope1 + self.scope2_market + self.scope3
    }
}

impl AddAssign for ScopeTotals {
    fn add_assign(&mut self, rhs: Self) {
        self.scope1 += rhs.scope1;
        self.scope2_location += rhs.scope2_location;
        self.scope2_market += rhs.scope2_market;
        self.scope3 += rhs.scope3;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceResult {
    pub source_id: String,
    pub facility_id: String,
    pub category: EmissionCategory,
    pub method: CalculationMethod,
    pub result: CalculationResult,
    pub dqi_score: Option<f64>,
    pub dqi_rating: Option<QualityRating>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacilityBreakdown {
    pub facility_id: String,
    pub name: String,
    pub group: Option<String>,
    pub ownership_factor: f64,
    pub raw: ScopeTotals,
    /// `raw` scaled by the ownership factor.
    pub weighted: ScopeTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupBreakdown {
    pub group: String,
    pub facility_ids: Vec<String>,
    pub weighted: ScopeTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub category: EmissionCategory,
    pub emissions: f64,
    /// Share of total Scope 3, in percent.
    pub share_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataQualityLabel {
    High,
    Medium,
    Low,
}

impl fmt::Display for DataQualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataQualityLabel::High => "High",
            DataQualityLabel::Medium => "Medium",
            DataQualityLabel::Low => "Low",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQualitySummary {
    pub primary_sources: usize,
    pub estimated_sources: usize,
    /// Fraction 0..=1 of sources with primary data.
    pub primary_share: f64,
    pub label: DataQualityLabel,
    /// Mean DQI score over the sources that carry an indicator.
    pub average_dqi_score: Option<f64>,
}

impl DataQualitySummary {
    fn from_sources<'a>(sources: impl Iterator<Item = &'a SourceResult>) -> Self {
        let mut primary = 0usize;
        let mut estimated = 0usize;
        let mut dqi_sum = 0.0;
        let mut dqi_count = 0usize;
        for s in sources {
            if s.method.is_primary() {
                primary += 1;
            } else {
                estimated += 1;
            }
            if let Some(score) = s.dqi_score {
                dqi_sum += score;
                dqi_count += 1;
            }
        }
        let counted = primary + estimated;
        let primary_share = if counted > 0 {
            primary as f64 / counted as f64
        } else {
            0.0
        };
        let label = if primary_share > HIGH_PRIMARY_SHARE {
            DataQualityLabel::High
        } else if primary_share > MEDIUM_PRIMARY_SHARE {
            DataQualityLabel::Medium
        } else {
            DataQualityLabel::Low
        };
        Self {
            primary_sources: primary,
            estimated_sources: estimated,
            primary_share,
            label,
            average_dqi_score: (dqi_count > 0).then(|| round2(dqi_sum / dqi_count as f64)),
        }
    }
}

/// Rolled-up inventory for one project snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InventoryResults {
    pub approach: BoundaryApproach,
    /// Boundary-adjusted totals: the sum of the weighted facility subtotals.
    pub totals: ScopeTotals,
    /// Totals before ownership weighting.
    pub raw_totals: ScopeTotals,
    pub facilities: Vec<FacilityBreakdown>,
    pub groups: Vec<GroupBreakdown>,
    /// Sorted by emissions, largest first.
    pub scope3_categories: Vec<CategoryBreakdown>,
    pub data_quality: DataQualitySummary,
    pub sources: Vec<SourceResult>,
}

impl InventoryResults {
    pub fn grand_total_location(&self) -> f64 {
        self.totals.total_location()
    }

    pub fn grand_total_market(&self) -> f64 {
        self.totals.total_market()
    }

    pub fn facility(&self, id: &str) -> Option<&FacilityBreakdown> {
        self.facilities.iter().find(|f| f.facility_id == id)
    }

    pub fn warnings(&self) -> impl Iterator<Item = (&str, &CalculationWarning)> {
        self.sources
            .iter()
            .flat_map(|s| s.result.warnings.iter().map(move |w| (s.source_id.as_str(), w)))
    }

    pub fn to_json(&self) -> Result<String, GhgError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Calculate and roll up every source of a project.
pub fn aggregate(project: &Project, library: &FactorLibrary) -> InventoryResults {
    aggregate_sources(
        project.sources(),
        project.facilities(),
        library,
        &project.boundary_settings(),
    )
}

pub fn aggregate_sources(
    sources: &[EmissionSource],
    facilities: &[Facility],
    library: &FactorLibrary,
    settings: &BoundarySettings,
) -> InventoryResults {
    let approach = settings.approach;
    let mut raw_by_facility: BTreeMap<&str, ScopeTotals> = BTreeMap::new();
    let mut by_category: BTreeMap<EmissionCategory, f64> = BTreeMap::new();
    let mut source_results = Vec::with_capacity(sources.len());

    for source in sources {
        let Some(facility) = facilities.iter().find(|f| f.id == source.facility_id) else {
            warn!(source_id = %source.id, facility_id = %source.facility_id, "source skipped: unknown facility");
            continue;
        };
        let calc = calculate(source, library, settings);
        let excluded = calc.warnings.contains(&CalculationWarning::CategoryDisabled);
        let contribution = ScopeTotals::from_result(&calc);

        *raw_by_facility.entry(facility.id.as_str()).or_default() += contribution;
        if source.category.scope() == Scope::Scope3 && !excluded {
            *by_category.entry(source.category).or_default() +=
                contribution.scope3 * facility.ownership_factor(approach);
        }

        source_results.push(SourceResult {
            source_id: source.id.clone(),
            facility_id: facility.id.clone(),
            category: source.category,
            method: source.method,
            dqi_score: source.dqi.map(|d| d.score()),
            dqi_rating: source.dqi.map(|d| d.rating()),
            result: calc,
        });
    }

    let mut totals = ScopeTotals::default();
    let mut raw_totals = ScopeTotals::default();
    let mut facility_rows = Vec::with_capacity(facilities.len());
    for facility in facilities {
        let raw = raw_by_facility
            .get(facility.id.as_str())
            .copied()
            .unwrap_or_default();
        let ownership_factor = facility.ownership_factor(approach);
        let weighted = raw.scaled(ownership_factor);
        totals += weighted;
        raw_totals += raw;
        facility_rows.push(FacilityBreakdown {
            facility_id: facility.id.clone(),
            name: facility.name.clone(),
            group: facility.group.clone(),
            ownership_factor,
            raw,
            weighted,
        });
    }

    let groups = group_breakdown(&facility_rows);
    let scope3_categories = rank_categories(by_category, totals.scope3);
    let data_quality = DataQualitySummary::from_sources(source_results.iter().filter(|s| {
        !s.result
            .warnings
            .contains(&CalculationWarning::CategoryDisabled)
    }));

    debug!(
        sources = source_results.len(),
        approach = %approach,
        total_location = totals.total_location(),
        total_market = totals.total_market(),
        "inventory aggregated"
    );

    InventoryResults {
        approach,
        totals,
        raw_totals,
        facilities: facility_rows,
        groups,
        scope3_categories,
        data_quality,
        sources: source_results,
    }
}

/// Facilities without a group label form a group of their own.
fn group_breakdown(facilities: &[FacilityBreakdown]) -> Vec<GroupBreakdown> {
    let mut groups: Vec<GroupBreakdown> = Vec::new();
    for f in facilities {
        let name = f.group.clone().unwrap_or_else(|| f.name.clone());
        match groups.iter_mut().find(|g| g.group == name) {
            Some(g) => {
                g.facility_ids.push(f.facility_id.clone());
                g.weighted += f.weighted;
            }
            None => groups.push(GroupBreakdown {
                group: name,
                facility_ids: vec![f.facility_id.clone()],
                weighted: f.weighted,
            }),
        }
    }
    groups
}

/// Display ranking only: descending emissions, ties in category order.
fn rank_categories(
    by_category: BTreeMap<EmissionCategory, f64>,
    scope3_total: f64,
) -> Vec<CategoryBreakdown> {
    let mut rows: Vec<CategoryBreakdown> = by_category
        .into_iter()
        .map(|(category, emissions)| CategoryBreakdown {
            category,
            emissions,
            share_pct: if scope3_total > 0.0 {
                emissions / scope3_total * 100.0
            } else {
                0.0
            },
        })
        .collect();
    rows.sort_by(|a, b| {
        b.emissions
            .total_cmp(&a.emissions)
            .then_with(|| a.category.cmp(&b.category))
    });
    rows
}

// ── Frames ──────────────────────────────────────────────────────────────────

impl InventoryResults {
    /// One row per calculated source.
    pub fn sources_frame(&self) -> Result<DataFrame, GhgError> {
        let n = self.sources.len();
        let mut ids = Vec::with_capacity(n);
        let mut facility_ids = Vec::with_capacity(n);
        let mut categories = Vec::with_capacity(n);
        let mut methods = Vec::with_capacity(n);
        let mut scope1 = Vec::with_capacity(n);
        let mut scope2_location = Vec::with_capacity(n);
        let mut scope2_market = Vec::with_capacity(n);
        let mut scope3 = Vec::with_capacity(n);
        let mut formulas = Vec::with_capacity(n);
        let mut dqi_scores: Vec<Option<f64>> = Vec::with_capacity(n);
        let mut dqi_ratings: Vec<Option<&str>> = Vec::with_capacity(n);
        let mut warnings = Vec::with_capacity(n);

        for s in &self.sources {
            ids.push(s.source_id.as_str());
            facility_ids.push(s.facility_id.as_str());
            categories.push(s.category.as_str());
            methods.push(s.method.as_str());
            scope1.push(s.result.scope1);
            scope2_location.push(s.result.scope2_location);
            scope2_market.push(s.result.scope2_market);
            scope3.push(s.result.scope3);
            formulas.push(s.result.formula.as_str());
            dqi_scores.push(s.dqi_score);
            dqi_ratings.push(s.dqi_rating.map(|r| r.as_str()));
            warnings.push(
                s.result
                    .warnings
                    .iter()
                    .map(|w| w.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            );
        }

        let columns: Vec<Column> = vec![
            Series::new(result::SOURCE_ID.into(), ids).into(),
            Series::new(result::FACILITY_ID.into(), facility_ids).into(),
            Series::new(result::CATEGORY.into(), categories).into(),
            Series::new(result::METHOD.into(), methods).into(),
            Series::new(scope::SCOPE1.into(), scope1).into(),
            Series::new(scope::SCOPE2_LOCATION.into(), scope2_location).into(),
            Series::new(scope::SCOPE2_MARKET.into(), scope2_market).into(),
            Series::new(scope::SCOPE3.into(), scope3).into(),
            Series::new(result::FORMULA.into(), formulas).into(),
            Series::new(result::DQI_SCORE.into(), dqi_scores).into(),
            Series::new(result::DQI_RATING.into(), dqi_ratings).into(),
            Series::new(result::WARNINGS.into(), warnings).into(),
        ];
        Ok(DataFrame::new(columns)?)
    }

    /// Raw and weighted scope values per facility.
    pub fn facilities_frame(&self) -> Result<DataFrame, GhgError> {
        let n = self.facilities.len();
        let mut ids = Vec::with_capacity(n);
        let mut names = Vec::with_capacity(n);
        let mut groups: Vec<Option<&str>> = Vec::with_capacity(n);
        let mut ownership = Vec::with_capacity(n);
        let mut weighted: [Vec<f64>; 4] = Default::default();
        let mut raw: [Vec<f64>; 4] = Default::default();

        for f in &self.facilities {
            ids.push(f.facility_id.as_str());
            names.push(f.name.as_str());
            groups.push(f.group.as_deref());
            ownership.push(f.ownership_factor);
            for (i, v) in scope_values(&f.weighted).into_iter().enumerate() {
                weighted[i].push(v);
            }
            for (i, v) in scope_values(&f.raw).into_iter().enumerate() {
                raw[i].push(v);
            }
        }

        let mut columns: Vec<Column> = vec![
            Series::new(breakdown::FACILITY_ID.into(), ids).into(),
            Series::new(breakdown::FACILITY_NAME.into(), names).into(),
            Series::new(breakdown::GROUP.into(), groups).into(),
            Series::new(breakdown::OWNERSHIP_FACTOR.into(), ownership).into(),
        ];
        for (name, values) in SCOPE_COLUMNS.iter().zip(weighted) {
            columns.push(Series::new((*name).into(), values).into());
        }
        for (name, values) in SCOPE_COLUMNS.iter().zip(raw) {
            let raw_name = format!("{}{}", name, breakdown::RAW_SUFFIX);
            columns.push(Series::new(raw_name.as_str().into(), values).into());
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Scope 3 categories, largest first.
    pub fn categories_frame(&self) -> Result<DataFrame, GhgError> {
        let categories: Vec<&str> = self
            .scope3_categories
            .iter()
            .map(|c| c.category.as_str())
            .collect();
        let labels: Vec<&str> = self
            .scope3_categories
            .iter()
            .map(|c| c.category.label())
            .collect();
        let emissions: Vec<f64> = self.scope3_categories.iter().map(|c| c.emissions).collect();
        let shares: Vec<f64> = self.scope3_categories.iter().map(|c| c.share_pct).collect();

        let columns: Vec<Column> = vec![
            Series::new(category_breakdown::CATEGORY.into(), categories).into(),
            Series::new(category_breakdown::LABEL.into(), labels).into(),
            Series::new(category_breakdown::EMISSIONS.into(), emissions).into(),
            Series::new(category_breakdown::SHARE_PCT.into(), shares).into(),
        ];
        Ok(DataFrame::new(columns)?)
    }

    /// Two rows, boundary-adjusted and raw, with scope and grand totals.
    pub fn totals_frame(&self) -> Result<DataFrame, GhgError> {
        let rows = [(totals::ADJUSTED, &self.totals), (totals::RAW, &self.raw_totals)];
        let basis: Vec<&str> = rows.iter().map(|(b, _)| *b).collect();
        let mut columns: Vec<Column> = vec![Series::new(totals::BASIS.into(), basis).into()];
        for (i, name) in SCOPE_COLUMNS.iter().enumerate() {
            let values: Vec<f64> = rows.iter().map(|(_, t)| scope_values(t)[i]).collect();
            columns.push(Series::new((*name).into(), values).into());
        }
        let location: Vec<f64> = rows.iter().map(|(_, t)| t.total_location()).collect();
        let market: Vec<f64> = rows.iter().map(|(_, t)| t.total_market()).collect();
        columns.push(Series::new(scope::TOTAL_LOCATION.into(), location).into());
        columns.push(Series::new(scope::TOTAL_MARKET.into(), market).into());
        Ok(DataFrame::new(columns)?)
    }
}

const SCOPE_COLUMNS: [&str; 4] = [
    scope::SCOPE1,
    scope::SCOPE2_LOCATION,
    scope::SCOPE2_MARKET,
    scope::SCOPE3,
];

fn scope_values(t: &ScopeTotals) -> [f64; 4] {
    [t.scope1, t.scope2_location, t.scope2_market, t.scope3]
}
