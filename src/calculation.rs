//! Emission calculation for a single source.
//!
//! `calculate` is total: missing factors, unknown units and invalid numbers
//! contribute zero and are reported as warnings on the result.

use std::fmt;

use serde::Serialize;

use crate::category::{CalculationMethod, EmissionCategory, Scope};
use crate::factors::{FactorLibrary, FactorLookup};
use crate::project::BoundarySettings;
use crate::source::{
    sanitize, total, EmissionSource, HybridLine, InstrumentKind, PowerMix, MONTHS_PER_YEAR,
};

const LB_TO_KG: f64 = 0.453_592_37;
const TONNE_TO_KG: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalculationWarning {
    MissingFactor { name: String },
    MissingUnit { name: String, unit: String },
    /// Instruments cover more than the metered consumption in a month.
    OverAllocatedPowerMix { month: usize, excess: f64 },
    CategoryDisabled,
}

impl fmt::Display for CalculationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalculationWarning::MissingFactor { name } => {
                write!(f, "no emission factor for '{}'", name)
            }
            CalculationWarning::MissingUnit { name, unit } => {
                write!(f, "'{}' has no factor for unit '{}'", name, unit)
            }
            CalculationWarning::OverAllocatedPowerMix { month, excess } => write!(
                f,
                "power mix exceeds consumption by {} in month {}",
                fmt_num(*excess),
                month + 1
            ),
            CalculationWarning::CategoryDisabled => f.write_str("category excluded from inventory"),
        }
    }
}

/// Per-scope kg CO2e of one source, with the formula trace.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CalculationResult {
    pub scope1: f64,
    pub scope2_location: f64,
    pub scope2_market: f64,
    pub scope3: f64,
    pub formula: String,
    pub warnings: Vec<CalculationWarning>,
}

impl CalculationResult {
    fn zero(formula: String) -> Self {
        Self {
            formula,
            ..Self::default()
        }
    }

    pub fn total_location(&self) -> f64 {
        self.scope1 + self.scope2_location + self.scope3
    }

    pub fn total_market(&self) -> f64 {
        self.scope1 + self.scope2_market + self.scope3
    }

    pub fn is_zero(&self) -> bool {
        self.scope1 == 0.0
            && self.scope2_location == 0.0
            && self.scope2_market == 0.0
            && self.scope3 == 0.0
    }
}

/// Calculate the emissions of one source.
pub fn calculate(
    source: &EmissionSource,
    library: &FactorLibrary,
    settings: &BoundarySettings,
) -> CalculationResult {
    if !settings.scope3.includes(source.category) {
        let mut result = CalculationResult::zero(format!(
            "{} excluded from inventory = 0 kg CO2e",
            source.category.label()
        ));
        result.warnings.push(CalculationWarning::CategoryDisabled);
        return result;
    }

    match source.category.scope() {
        Scope::Scope1 => calculate_scope1(source, library),
        Scope::Scope2 => calculate_scope2(source, library),
        Scope::Scope3 => calculate_scope3(source, library),
    }
}

// ── Scope 1 ─────────────────────────────────────────────────────────────────

fn calculate_scope1(source: &EmissionSource, library: &FactorLibrary) -> CalculationResult {
    if source.category == EmissionCategory::FugitiveEmissions {
        return calculate_fugitive(source, library);
    }
    let (kg, formula, warnings) = factor_product(source, library);
    CalculationResult {
        scope1: kg,
        formula,
        warnings,
        ..CalculationResult::default()
    }
}

/// Fugitive releases: mass (kg) × GWP.
fn calculate_fugitive(source: &EmissionSource, library: &FactorLibrary) -> CalculationResult {
    let quantity = source.total_quantity();
    let mut warnings = Vec::new();

    let gas = match library.resolve(
        source.category,
        source.method,
        &source.fuel_type,
        &source.unit,
    ) {
        FactorLookup::Found { factor, .. } | FactorLookup::MissingUnit(factor) => Some(factor),
        FactorLookup::Missing => None,
    };

    let (kg, formula) = match (gas, gas.and_then(|g| g.gwp), mass_to_kg(&source.unit)) {
        (Some(_), Some(gwp), Some(to_kg)) => {
            let gwp = sanitize(gwp);
            let mass_kg = quantity * to_kg;
            (
                mass_kg * gwp,
                format!(
                    "{} kg {} × GWP {} = {} kg CO2e",
                    fmt_num(mass_kg),
                    source.fuel_type,
                    fmt_num(gwp),
                    fmt_num(mass_kg * gwp)
                ),
            )
        }
        // No GWP or non-mass unit: price the release like any other factor.
        (Some(_), _, _) => {
            let (kg, formula, mut w) = factor_product(source, library);
            warnings.append(&mut w);
            (kg, formula)
        }
        (None, _, _) => {
            warnings.push(CalculationWarning::MissingFactor {
                name: source.fuel_type.clone(),
            });
            (0.0, missing_formula(quantity, &source.unit, &source.fuel_type))
        }
    };

    CalculationResult {
        scope1: kg,
        formula,
        warnings,
        ..CalculationResult::default()
    }
}

fn mass_to_kg(unit: &str) -> Option<f64> {
    match unit.trim().to_ascii_lowercase().as_str() {
        "kg" | "kgs" | "kilograms" => Some(1.0),
        "lb" | "lbs" | "pounds" => Some(LB_TO_KG),
        "t" | "tonne" | "tonnes" | "metric tons" => Some(TONNE_TO_KG),
        _ => None,
    }
}

// ── Scope 2 ─────────────────────────────────────────────────────────────────

fn calculate_scope2(source: &EmissionSource, library: &FactorLibrary) -> CalculationResult {
    let quantity = source.total_quantity();
    let mut warnings = Vec::new();

    let location_factor = match library.resolve(
        source.category,
        source.method,
        &source.fuel_type,
        &source.unit,
    ) {
        FactorLookup::Found { value, .. } => sanitize(value),
        FactorLookup::MissingUnit(_) => {
            warnings.push(CalculationWarning::MissingUnit {
                name: source.fuel_type.clone(),
                unit: source.unit.clone(),
            });
            0.0
        }
        FactorLookup::Missing => {
            warnings.push(CalculationWarning::MissingFactor {
                name: source.fuel_type.clone(),
            });
            0.0
        }
    };

    let scope2_location = quantity * location_factor;
    let location_formula = format!(
        "location: {} {} × {} kg CO2e/{} = {} kg CO2e",
        fmt_num(quantity),
        source.unit,
        fmt_num(location_factor),
        source.unit,
        fmt_num(scope2_location)
    );

    let (scope2_market, market_formula) = match (&source.power_mix, source.market_based_factor) {
        (Some(mix), _) if !mix.entries.is_empty() => {
            market_from_power_mix(source, mix, location_factor, &mut warnings)
        }
        (_, Some(market_factor)) => {
            let market_factor = sanitize(market_factor);
            let kg = quantity * market_factor;
            (
                kg,
                format!(
                    "market: {} {} × {} kg CO2e/{} = {} kg CO2e",
                    fmt_num(quantity),
                    source.unit,
                    fmt_num(market_factor),
                    source.unit,
                    fmt_num(kg)
                ),
            )
        }
        _ => (
            scope2_location,
            format!(
                "market: no contractual data, location-based value used = {} kg CO2e",
                fmt_num(scope2_location)
            ),
        ),
    };

    CalculationResult {
        scope2_location,
        scope2_market,
        formula: format!("{}; {}", location_formula, market_formula),
        warnings,
        ..CalculationResult::default()
    }
}

/// Market-based emissions, attributed month by month: instruments first,
/// then the unattributed residual at the location factor.
fn market_from_power_mix(
    source: &EmissionSource,
    mix: &PowerMix,
    location_factor: f64,
    warnings: &mut Vec<CalculationWarning>,
) -> (f64, String) {
    let market_fallback = source.market_based_factor.map(sanitize);
    let mut parts = Vec::with_capacity(mix.entries.len() + 1);
    let mut total_kg = 0.0;

    for entry in &mix.entries {
        let qty = total(&entry.monthly_quantities);
        let supplier = entry.supplier_factor.map(sanitize);
        let factor = match entry.kind {
            InstrumentKind::Ppa | InstrumentKind::Rec => {
                if entry.treat_as_renewable {
                    0.0
                } else {
                    supplier.unwrap_or(0.0)
                }
            }
            InstrumentKind::GreenPremium => {
                if entry.treat_as_renewable {
                    0.0
                } else {
                    supplier.unwrap_or(location_factor)
                }
            }
            InstrumentKind::Conventional => supplier
                .or(market_fallback)
                .unwrap_or(location_factor),
        };
        let kg = qty * factor;
        total_kg += kg;
        parts.push(format!(
            "{} {} {} × {}",
            entry.kind.label(),
            fmt_num(qty),
            source.unit,
            fmt_num(factor)
        ));
    }

    let mut residual = 0.0;
    for month in 0..MONTHS_PER_YEAR {
        let metered = sanitize(source.monthly_quantities[month]);
        let attributed = mix.attributed_in_month(month);
        if attributed > metered {
            warnings.push(CalculationWarning::OverAllocatedPowerMix {
                month,
                excess: attributed - metered,
            });
        }
        residual += (metered - attributed).max(0.0);
    }
    let residual_kg = residual * location_factor;
    total_kg += residual_kg;
    parts.push(format!(
        "residual {} {} × {}",
        fmt_num(residual),
        source.unit,
        fmt_num(location_factor)
    ));

    (
        total_kg,
        format!("market: {} = {} kg CO2e", parts.join(" + "), fmt_num(total_kg)),
    )
}

// ── Scope 3 ─────────────────────────────────────────────────────────────────

fn calculate_scope3(source: &EmissionSource, library: &FactorLibrary) -> CalculationResult {
    let (kg, formula, warnings) = match source.method {
        CalculationMethod::Supplier => {
            let kg = source.total_quantity();
            (
                kg,
                format!("supplier-reported {} kg CO2e", fmt_num(kg)),
                Vec::new(),
            )
        }
        CalculationMethod::Hybrid => hybrid(source, library),
        _ => factor_product(source, library),
    };
    CalculationResult {
        scope3: kg,
        formula,
        warnings,
        ..CalculationResult::default()
    }
}

fn hybrid(
    source: &EmissionSource,
    library: &FactorLibrary,
) -> (f64, String, Vec<CalculationWarning>) {
    let Some(inputs) = &source.hybrid else {
        // No breakdown entered: fall back to the plain activity product.
        return factor_product(source, library);
    };

    let mut warnings = Vec::new();
    let mut parts = Vec::new();
    let mut total_kg = 0.0;

    let groups: [(&str, &[HybridLine]); 3] = [
        ("materials", inputs.materials.as_slice()),
        ("transport", inputs.transport.as_slice()),
        ("waste", inputs.waste.as_slice()),
    ];
    for (label, lines) in groups {
        let mut group_kg = 0.0;
        for line in lines {
            let qty = sanitize(line.quantity);
            let factor = match library.resolve(
                source.category,
                CalculationMethod::Activity,
                &line.name,
                &line.unit,
            ) {
                FactorLookup::Found { value, .. } => sanitize(value),
                FactorLookup::MissingUnit(_) => {
                    warnings.push(CalculationWarning::MissingUnit {
                        name: line.name.clone(),
                        unit: line.unit.clone(),
                    });
                    0.0
                }
                FactorLookup::Missing => {
                    warnings.push(CalculationWarning::MissingFactor {
                        name: line.name.clone(),
                    });
                    0.0
                }
            };
            group_kg += qty * factor;
        }
        if !lines.is_empty() {
            parts.push(format!("{} {}", label, fmt_num(group_kg)));
        }
        total_kg += group_kg;
    }

    let upstream = sanitize(inputs.allocated_scope1_kg) + sanitize(inputs.allocated_scope2_kg);
    if upstream > 0.0 {
        parts.push(format!("allocated scope 1+2 {}", fmt_num(upstream)));
    }
    total_kg += upstream;

    let formula = if parts.is_empty() {
        "hybrid: no inputs = 0 kg CO2e".to_string()
    } else {
        format!("hybrid: {} = {} kg CO2e", parts.join(" + "), fmt_num(total_kg))
    };
    (total_kg, formula, warnings)
}

// ── Shared ──────────────────────────────────────────────────────────────────

/// quantity × factor[unit] for the source's own fuel/material entry.
fn factor_product(
    source: &EmissionSource,
    library: &FactorLibrary,
) -> (f64, String, Vec<CalculationWarning>) {
    let quantity = source.total_quantity();
    match library.resolve(
        source.category,
        source.method,
        &source.fuel_type,
        &source.unit,
    ) {
        FactorLookup::Found { value, .. } => {
            let factor = sanitize(value);
            let kg = quantity * factor;
            (
                kg,
                format!(
                    "{} {} × {} kg CO2e/{} = {} kg CO2e",
                    fmt_num(quantity),
                    source.unit,
                    fmt_num(factor),
                    source.unit,
                    fmt_num(kg)
                ),
                Vec::new(),
            )
        }
        FactorLookup::MissingUnit(_) => (
            0.0,
            missing_formula(quantity, &source.unit, &source.fuel_type),
            vec![CalculationWarning::MissingUnit {
                name: source.fuel_type.clone(),
                unit: source.unit.clone(),
            }],
        ),
        FactorLookup::Missing => (
            0.0,
            missing_formula(quantity, &source.unit, &source.fuel_type),
            vec![CalculationWarning::MissingFactor {
                name: source.fuel_type.clone(),
            }],
        ),
    }
}

fn missing_formula(quantity: f64, unit: &str, name: &str) -> String {
    format!(
        "{} {} × 0 (no factor for '{}') = 0 kg CO2e",
        fmt_num(quantity),
        unit,
        name
    )
}

/// Compact number formatting for formula traces.
pub(crate) fn fmt_num(value: f64) -> String {
    if value == value.trunc() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{:.4}", value);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::{EmissionFactor, FactorTable};
    use crate::project::{BoundaryApproach, Scope3Settings};
    use crate::source::{HybridInputs, PowerMixEntry};
    use pretty_assertions::assert_eq;

    fn settings() -> BoundarySettings {
        BoundarySettings::new(BoundaryApproach::Operational)
    }

    fn library() -> FactorLibrary {
        FactorLibrary::new()
            .with_table(
                EmissionCategory::StationaryCombustion,
                FactorTable::list(vec![EmissionFactor::new("Natural Gas", "cubic meters", 2.0)]),
            )
            .with_table(
                EmissionCategory::FugitiveEmissions,
                FactorTable::list(vec![EmissionFactor::gas("R-410A", 2000.0)]),
            )
            .with_table(
                EmissionCategory::PurchasedEnergy,
                FactorTable::list(vec![EmissionFactor::new("Grid", "kWh", 0.4)]),
            )
            .with_table(
                EmissionCategory::PurchasedGoodsServices,
                FactorTable::structured(
                    vec![
                        EmissionFactor::new("Steel", "kg", 2.0),
                        EmissionFactor::new("Road Freight", "tonne-km", 0.1),
                        EmissionFactor::new("Landfill", "tonnes", 500.0),
                    ],
                    vec![EmissionFactor::new("Manufactured Goods", "USD", 0.5)],
                ),
            )
    }

    fn source(category: EmissionCategory, method: CalculationMethod, name: &str, unit: &str) -> EmissionSource {
        EmissionSource::new("f1", category, method, name, unit).with_id("s1")
    }

    fn electricity(total_kwh: f64) -> EmissionSource {
        source(
            EmissionCategory::PurchasedEnergy,
            CalculationMethod::Activity,
            "Grid",
            "kWh",
        )
        .with_annual(total_kwh)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn natural_gas_example() {
        let mut months = [0.0; 12];
        months[0] = 400.0;
        months[6] = 600.0;
        let s = source(
            EmissionCategory::StationaryCombustion,
            CalculationMethod::Fuel,
            "Natural Gas",
            "cubic meters",
        )
        .with_months(months);

        let r = calculate(&s, &library(), &settings());

        assert_eq!(r.scope1, 2000.0);
        assert_eq!(r.scope2_location, 0.0);
        assert_eq!(r.scope2_market, 0.0);
        assert_eq!(r.scope3, 0.0);
        assert_eq!(
            r.formula,
            "1000 cubic meters × 2 kg CO2e/cubic meters = 2000 kg CO2e"
        );
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn scope2_without_market_data_mirrors_location() {
        let r = calculate(&electricity(1000.0), &library(), &settings());
        assert!(approx(r.scope2_location, 400.0));
        assert!(approx(r.scope2_market, 400.0));
        assert_eq!(r.scope1, 0.0);
        assert_eq!(r.scope3, 0.0);
    }

    #[test]
    fn scope2_market_factor_without_power_mix() {
        let s = electricity(1000.0).with_market_factor(0.25);
        let r = calculate(&s, &library(), &settings());
        assert!(approx(r.scope2_location, 400.0));
        assert!(approx(r.scope2_market, 250.0));
    }

    #[test]
    fn renewable_instruments_zero_out_their_share() {
        // 1000 kWh total; 300 via PPA, 200 via RECs, rest from the grid.
        let mix = PowerMix::new(vec![
            PowerMixEntry::new(InstrumentKind::Ppa, [25.0; 12]).renewable(),
            PowerMixEntry::new(InstrumentKind::Rec, [200.0 / 12.0; 12]),
        ]);
        let s = electricity(1000.0).with_power_mix(mix);
        let r = calculate(&s, &library(), &settings());
        assert!(approx(r.scope2_location, 400.0));
        assert!(approx(r.scope2_market, 500.0 * 0.4));
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn supplier_factor_applies_to_ppa() {
        let mix = PowerMix::new(vec![
            PowerMixEntry::new(InstrumentKind::Ppa, [50.0; 12]).with_supplier_factor(0.1)
        ]);
        let s = electricity(1200.0).with_power_mix(mix);
        let r = calculate(&s, &library(), &settings());
        // 600 kWh at 0.1 + 600 kWh residual at 0.4
        assert!(approx(r.scope2_market, 60.0 + 240.0));
    }

    #[test]
    fn green_premium_follows_the_renewable_flag() {
        let renewable = PowerMix::new(vec![
            PowerMixEntry::new(InstrumentKind::GreenPremium, [100.0; 12]).renewable()
        ]);
        let not_renewable = PowerMix::new(vec![
            PowerMixEntry::new(InstrumentKind::GreenPremium, [100.0; 12])
                .with_supplier_factor(0.2),
        ]);
        let unqualified =
            PowerMix::new(vec![PowerMixEntry::new(InstrumentKind::GreenPremium, [100.0; 12])]);

        let lib = library();
        let a = calculate(&electricity(1200.0).with_power_mix(renewable), &lib, &settings());
        let b = calculate(&electricity(1200.0).with_power_mix(not_renewable), &lib, &settings());
        let c = calculate(&electricity(1200.0).with_power_mix(unqualified), &lib, &settings());
        assert!(approx(a.scope2_market, 0.0));
        assert!(approx(b.scope2_market, 1200.0 * 0.2));
        assert!(approx(c.scope2_market, 1200.0 * 0.4));
    }

    #[test]
    fn conventional_uses_market_factor_before_grid() {
        let mix = PowerMix::new(vec![PowerMixEntry::new(
            InstrumentKind::Conventional,
            [100.0; 12],
        )]);
        let s = electricity(1200.0)
            .with_market_factor(0.3)
            .with_power_mix(mix);
        let r = calculate(&s, &library(), &settings());
        assert!(approx(r.scope2_market, 1200.0 * 0.3));
    }

    #[test]
    fn over_allocated_months_are_flagged() {
        let mut months = [0.0; 12];
        months[0] = 150.0;
        let mix = PowerMix::new(vec![PowerMixEntry::new(InstrumentKind::Rec, months).renewable()]);
        let s = electricity(1200.0).with_power_mix(mix);
        let r = calculate(&s, &library(), &settings());
        assert_eq!(
            r.warnings,
            vec![CalculationWarning::OverAllocatedPowerMix {
                month: 0,
                excess: 50.0
            }]
        );
        // Residual is never negative: 11 months of 100 kWh at 0.4.
        assert!(approx(r.scope2_market, 1100.0 * 0.4));
    }

    #[test]
    fn fugitive_uses_gwp_times_mass() {
        let mut months = [0.0; 12];
        months[3] = 2.5;
        let kg = source(
            EmissionCategory::FugitiveEmissions,
            CalculationMethod::Activity,
            "R-410A",
            "kg",
        )
        .with_months(months);
        let r = calculate(&kg, &library(), &settings());
        assert!(approx(r.scope1, 5000.0));

        let tonnes = source(
            EmissionCategory::FugitiveEmissions,
            CalculationMethod::Activity,
            "r-410a",
            "tonnes",
        )
        .with_months(months);
        let r = calculate(&tonnes, &library(), &settings());
        assert!(approx(r.scope1, 5_000_000.0));
    }

    #[test]
    fn missing_factor_degrades_to_zero_with_warning() {
        let s = source(
            EmissionCategory::StationaryCombustion,
            CalculationMethod::Fuel,
            "Unobtainium",
            "kg",
        )
        .with_annual(100.0);
        let r = calculate(&s, &library(), &settings());
        assert!(r.is_zero());
        assert_eq!(
            r.warnings,
            vec![CalculationWarning::MissingFactor {
                name: "Unobtainium".into()
            }]
        );
    }

    #[test]
    fn missing_unit_degrades_to_zero_with_warning() {
        let s = source(
            EmissionCategory::StationaryCombustion,
            CalculationMethod::Fuel,
            "Natural Gas",
            "barrels",
        )
        .with_annual(100.0);
        let r = calculate(&s, &library(), &settings());
        assert!(r.is_zero());
        assert!(matches!(
            r.warnings.as_slice(),
            [CalculationWarning::MissingUnit { .. }]
        ));
    }

    #[test]
    fn nan_quantities_count_as_zero() {
        let mut months = [f64::NAN; 12];
        months[0] = 10.0;
        let s = source(
            EmissionCategory::StationaryCombustion,
            CalculationMethod::Fuel,
            "Natural Gas",
            "cubic meters",
        )
        .with_months(months);
        let r = calculate(&s, &library(), &settings());
        assert_eq!(r.scope1, 20.0);
    }

    #[test]
    fn spend_based_uses_spend_table() {
        let s = source(
            EmissionCategory::PurchasedGoodsServices,
            CalculationMethod::Spend,
            "Manufactured Goods",
            "USD",
        )
        .with_annual(10_000.0);
        let r = calculate(&s, &library(), &settings());
        assert!(approx(r.scope3, 5000.0));
        assert_eq!(r.scope1, 0.0);
    }

    #[test]
    fn supplier_values_pass_through() {
        let s = source(
            EmissionCategory::PurchasedGoodsServices,
            CalculationMethod::Supplier,
            "Acme Metals",
            "kg CO2e",
        )
        .with_annual(1234.0);
        let r = calculate(&s, &library(), &settings());
        assert!(approx(r.scope3, 1234.0));
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn hybrid_sums_lines_and_upstream_allocation() {
        let inputs = HybridInputs {
            materials: vec![HybridLine::new("Steel", "kg", 100.0)],
            transport: vec![HybridLine::new("Road Freight", "tonne-km", 1000.0)],
            waste: vec![
                HybridLine::new("Landfill", "tonnes", 0.5),
                HybridLine::new("Mystery", "kg", 10.0),
            ],
            allocated_scope1_kg: 30.0,
            allocated_scope2_kg: 20.0,
        };
        let s = source(
            EmissionCategory::PurchasedGoodsServices,
            CalculationMethod::Hybrid,
            "Widget",
            "unit",
        )
        .with_hybrid(inputs);
        let r = calculate(&s, &library(), &settings());
        // 200 + 100 + 250 + 50
        assert!(approx(r.scope3, 600.0));
        assert_eq!(
            r.warnings,
            vec![CalculationWarning::MissingFactor {
                name: "Mystery".into()
            }]
        );
    }

    #[test]
    fn disabled_scope3_category_contributes_nothing() {
        let mut scope3 = Scope3Settings::default();
        scope3
            .categories
            .remove(&EmissionCategory::PurchasedGoodsServices);
        let settings = settings().with_scope3(scope3);
        let s = source(
            EmissionCategory::PurchasedGoodsServices,
            CalculationMethod::Supplier,
            "Acme Metals",
            "kg CO2e",
        )
        .with_annual(1234.0);
        let r = calculate(&s, &library(), &settings);
        assert!(r.is_zero());
        assert_eq!(r.warnings, vec![CalculationWarning::CategoryDisabled]);
    }

    #[test]
    fn calculate_is_idempotent() {
        let lib = library();
        let s = electricity(777.0).with_power_mix(PowerMix::new(vec![PowerMixEntry::new(
            InstrumentKind::Ppa,
            [10.0; 12],
        )]));
        assert_eq!(
            calculate(&s, &lib, &settings()),
            calculate(&s, &lib, &settings())
        );
    }

    #[test]
    fn number_formatting() {
        assert_eq!(fmt_num(2000.0), "2000");
        assert_eq!(fmt_num(0.183), "0.183");
        assert_eq!(fmt_num(1.0 / 3.0), "0.3333");
        assert_eq!(fmt_num(0.0), "0");
    }
}
