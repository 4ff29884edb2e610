use serde::{Deserialize, Serialize};

use crate::category::{CalculationMethod, EmissionCategory};
use crate::dqi::DataQualityIndicator;

pub const MONTHS_PER_YEAR: usize = 12;

/// Twelve monthly quantities, January first.
pub type MonthlyQuantities = [f64; MONTHS_PER_YEAR];

/// Replace non-finite and negative values by zero.
pub fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

pub fn total(months: &MonthlyQuantities) -> f64 {
    months.iter().copied().map(sanitize).sum()
}

/// Per-row user input: one emission source at one facility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmissionSource {
    pub id: String,
    pub facility_id: String,
    pub category: EmissionCategory,
    pub method: CalculationMethod,
    /// Fuel, material, mode or grid region; key into the category's factor table.
    pub fuel_type: String,
    pub unit: String,
    pub monthly_quantities: MonthlyQuantities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Residual-mix or supplier factor for Scope 2 market-based reporting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_based_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_mix: Option<PowerMix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybrid: Option<HybridInputs>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dqi: Option<DataQualityIndicator>,
}

impl EmissionSource {
    pub fn new(
        facility_id: &str,
        category: EmissionCategory,
        method: CalculationMethod,
        fuel_type: &str,
        unit: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            facility_id: facility_id.to_string(),
            category,
            method,
            fuel_type: fuel_type.to_string(),
            unit: unit.to_string(),
            monthly_quantities: [0.0; MONTHS_PER_YEAR],
            description: None,
            market_based_factor: None,
            power_mix: None,
            hybrid: None,
            dqi: None,
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn with_months(mut self, months: MonthlyQuantities) -> Self {
        self.monthly_quantities = months;
        self
    }

    /// Spread an annual quantity evenly over the twelve months.
    pub fn with_annual(mut self, annual: f64) -> Self {
        self.monthly_quantities = [annual / MONTHS_PER_YEAR as f64; MONTHS_PER_YEAR];
        self
    }

    pub fn with_market_factor(mut self, factor: f64) -> Self {
        self.market_based_factor = Some(factor);
        self
    }

    pub fn with_power_mix(mut self, mix: PowerMix) -> Self {
        self.power_mix = Some(mix);
        self
    }

    pub fn with_hybrid(mut self, hybrid: HybridInputs) -> Self {
        self.hybrid = Some(hybrid);
        self
    }

    pub fn with_dqi(mut self, dqi: DataQualityIndicator) -> Self {
        self.dqi = Some(dqi);
        self
    }

    pub fn total_quantity(&self) -> f64 {
        total(&self.monthly_quantities)
    }
}

/// Contractual instrument used for Scope 2 market-based attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Ppa,
    Rec,
    GreenPremium,
    Conventional,
}

impl InstrumentKind {
    pub fn label(self) -> &'static str {
        match self {
            InstrumentKind::Ppa => "PPA",
            InstrumentKind::Rec => "REC",
            InstrumentKind::GreenPremium => "green premium",
            InstrumentKind::Conventional => "conventional",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerMixEntry {
    pub kind: InstrumentKind,
    pub monthly_quantities: MonthlyQuantities,
    /// Supplier-specific kg CO2e per unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_factor: Option<f64>,
    #[serde(default)]
    pub treat_as_renewable: bool,
}

impl PowerMixEntry {
    pub fn new(kind: InstrumentKind, monthly_quantities: MonthlyQuantities) -> Self {
        Self {
            kind,
            monthly_quantities,
            supplier_factor: None,
            treat_as_renewable: false,
        }
    }

    pub fn renewable(mut self) -> Self {
        self.treat_as_renewable = true;
        self
    }

    pub fn with_supplier_factor(mut self, factor: f64) -> Self {
        self.supplier_factor = Some(factor);
        self
    }
}

/// Attribution of purchased electricity to contractual instruments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerMix {
    pub entries: Vec<PowerMixEntry>,
}

impl PowerMix {
    pub fn new(entries: Vec<PowerMixEntry>) -> Self {
        Self { entries }
    }

    pub fn attributed_in_month(&self, month: usize) -> f64 {
        self.entries
            .iter()
            .map(|e| sanitize(e.monthly_quantities[month]))
            .sum()
    }
}

/// One line of a hybrid Scope 3 calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridLine {
    /// Key into the source category's factor table.
    pub name: String,
    pub unit: String,
    pub quantity: f64,
}

impl HybridLine {
    pub fn new(name: &str, unit: &str, quantity: f64) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            quantity,
        }
    }
}

/// Supplier data combined with secondary factors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HybridInputs {
    #[serde(default)]
    pub materials: Vec<HybridLine>,
    #[serde(default)]
    pub transport: Vec<HybridLine>,
    #[serde(default)]
    pub waste: Vec<HybridLine>,
    /// Supplier's Scope 1 emissions allocated to this purchase, kg CO2e.
    #[serde(default)]
    pub allocated_scope1_kg: f64,
    /// Supplier's Scope 2 emissions allocated to this purchase, kg CO2e.
    #[serde(default)]
    pub allocated_scope2_kg: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_ignores_invalid_months() {
        let mut months = [10.0; MONTHS_PER_YEAR];
        months[0] = f64::NAN;
        months[1] = -5.0;
        months[2] = f64::INFINITY;
        assert_eq!(total(&months), 90.0);
    }

    #[test]
    fn annual_quantity_is_spread_over_months() {
        let source = EmissionSource::new(
            "f1",
            EmissionCategory::StationaryCombustion,
            CalculationMethod::Fuel,
            "Diesel",
            "litres",
        )
        .with_annual(1200.0);
        assert_eq!(source.monthly_quantities[5], 100.0);
        assert!((source.total_quantity() - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn new_sources_get_unique_ids() {
        let make = || {
            EmissionSource::new(
                "f1",
                EmissionCategory::BusinessTravel,
                CalculationMethod::Distance,
                "Rail",
                "passenger-km",
            )
        };
        assert_ne!(make().id, make().id);
    }

    #[test]
    fn source_json_requires_twelve_months() {
        let source = EmissionSource::new(
            "f1",
            EmissionCategory::PurchasedEnergy,
            CalculationMethod::Activity,
            "United Kingdom",
            "kWh",
        )
        .with_id("s1");
        let mut value = serde_json::to_value(&source).unwrap();
        value["monthly_quantities"] = serde_json::json!([1.0, 2.0, 3.0]);
        let parsed: Result<EmissionSource, _> = serde_json::from_value(value);
        assert!(parsed.is_err());
    }
}
