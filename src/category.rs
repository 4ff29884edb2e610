use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GhgError;

/// GHG Protocol scope of an emission category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    Scope1,
    Scope2,
    Scope3,
}

/// Every category an emission source can be filed under.
///
/// Declaration order is the display order and the tie-break order for
/// rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionCategory {
    StationaryCombustion,
    MobileCombustion,
    ProcessEmissions,
    FugitiveEmissions,
    OnSiteWaste,
    PurchasedEnergy,
    PurchasedGoodsServices,
    CapitalGoods,
    FuelEnergyRelated,
    UpstreamTransportation,
    WasteGenerated,
    BusinessTravel,
    EmployeeCommuting,
    UpstreamLeasedAssets,
    DownstreamTransportation,
    ProcessingSoldProducts,
    UseOfSoldProducts,
    EndOfLifeTreatment,
    DownstreamLeasedAssets,
    Franchises,
    Investments,
}

impl EmissionCategory {
    pub const ALL: [EmissionCategory; 21] = [
        EmissionCategory::StationaryCombustion,
        EmissionCategory::MobileCombustion,
        EmissionCategory::ProcessEmissions,
        EmissionCategory::FugitiveEmissions,
        EmissionCategory::OnSiteWaste,
        EmissionCategory::PurchasedEnergy,
        EmissionCategory::PurchasedGoodsServices,
        EmissionCategory::CapitalGoods,
        EmissionCategory::FuelEnergyRelated,
        EmissionCategory::UpstreamTransportation,
        EmissionCategory::WasteGenerated,
        EmissionCategory::BusinessTravel,
        EmissionCategory::EmployeeCommuting,
        EmissionCategory::UpstreamLeasedAssets,
        EmissionCategory::DownstreamTransportation,
        EmissionCategory::ProcessingSoldProducts,
        EmissionCategory::UseOfSoldProducts,
        EmissionCategory::EndOfLifeTreatment,
        EmissionCategory::DownstreamLeasedAssets,
        EmissionCategory::Franchises,
        EmissionCategory::Investments,
    ];

    pub fn scope(self) -> Scope {
        match self {
            EmissionCategory::StationaryCombustion
            | EmissionCategory::MobileCombustion
            | EmissionCategory::ProcessEmissions
            | EmissionCategory::FugitiveEmissions
            | EmissionCategory::OnSiteWaste => Scope::Scope1,
            EmissionCategory::PurchasedEnergy => Scope::Scope2,
            _ => Scope::Scope3,
        }
    }

    /// GHG Protocol Scope 3 category number (1..=15), `None` for Scope 1/2.
    pub fn scope3_number(self) -> Option<u8> {
        match self {
            EmissionCategory::PurchasedGoodsServices => Some(1),
            EmissionCategory::CapitalGoods => Some(2),
            EmissionCategory::FuelEnergyRelated => Some(3),
            EmissionCategory::UpstreamTransportation => Some(4),
            EmissionCategory::WasteGenerated => Some(5),
            EmissionCategory::BusinessTravel => Some(6),
            EmissionCategory::EmployeeCommuting => Some(7),
            EmissionCategory::UpstreamLeasedAssets => Some(8),
            EmissionCategory::DownstreamTransportation => Some(9),
            EmissionCategory::ProcessingSoldProducts => Some(10),
            EmissionCategory::UseOfSoldProducts => Some(11),
            EmissionCategory::EndOfLifeTreatment => Some(12),
            EmissionCategory::DownstreamLeasedAssets => Some(13),
            EmissionCategory::Franchises => Some(14),
            EmissionCategory::Investments => Some(15),
            _ => None,
        }
    }

    pub fn scope3_categories() -> impl Iterator<Item = EmissionCategory> {
        Self::ALL.into_iter().filter(|c| c.scope() == Scope::Scope3)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EmissionCategory::StationaryCombustion => "stationary_combustion",
            EmissionCategory::MobileCombustion => "mobile_combustion",
            EmissionCategory::ProcessEmissions => "process_emissions",
            EmissionCategory::FugitiveEmissions => "fugitive_emissions",
            EmissionCategory::OnSiteWaste => "on_site_waste",
            EmissionCategory::PurchasedEnergy => "purchased_energy",
            EmissionCategory::PurchasedGoodsServices => "purchased_goods_services",
            EmissionCategory::CapitalGoods => "capital_goods",
            EmissionCategory::FuelEnergyRelated => "fuel_energy_related",
            EmissionCategory::UpstreamTransportation => "upstream_transportation",
            EmissionCategory::WasteGenerated => "waste_generated",
            EmissionCategory::BusinessTravel => "business_travel",
            EmissionCategory::EmployeeCommuting => "employee_commuting",
            EmissionCategory::UpstreamLeasedAssets => "upstream_leased_assets",
            EmissionCategory::DownstreamTransportation => "downstream_transportation",
            EmissionCategory::ProcessingSoldProducts => "processing_sold_products",
            EmissionCategory::UseOfSoldProducts => "use_of_sold_products",
            EmissionCategory::EndOfLifeTreatment => "end_of_life_treatment",
            EmissionCategory::DownstreamLeasedAssets => "downstream_leased_assets",
            EmissionCategory::Franchises => "franchises",
            EmissionCategory::Investments => "investments",
        }
    }

    /// Human-readable label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            EmissionCategory::StationaryCombustion => "Stationary combustion",
            EmissionCategory::MobileCombustion => "Mobile combustion",
            EmissionCategory::ProcessEmissions => "Process emissions",
            EmissionCategory::FugitiveEmissions => "Fugitive emissions",
            EmissionCategory::OnSiteWaste => "On-site waste",
            EmissionCategory::PurchasedEnergy => "Purchased energy",
            EmissionCategory::PurchasedGoodsServices => "1. Purchased goods & services",
            EmissionCategory::CapitalGoods => "2. Capital goods",
            EmissionCategory::FuelEnergyRelated => "3. Fuel- and energy-related activities",
            EmissionCategory::UpstreamTransportation => "4. Upstream transportation & distribution",
            EmissionCategory::WasteGenerated => "5. Waste generated in operations",
            EmissionCategory::BusinessTravel => "6. Business travel",
            EmissionCategory::EmployeeCommuting => "7. Employee commuting",
            EmissionCategory::UpstreamLeasedAssets => "8. Upstream leased assets",
            EmissionCategory::DownstreamTransportation => {
                "9. Downstream transportation & distribution"
            }
            EmissionCategory::ProcessingSoldProducts => "10. Processing of sold products",
            EmissionCategory::UseOfSoldProducts => "11. Use of sold products",
            EmissionCategory::EndOfLifeTreatment => "12. End-of-life treatment of sold products",
            EmissionCategory::DownstreamLeasedAssets => "13. Downstream leased assets",
            EmissionCategory::Franchises => "14. Franchises",
            EmissionCategory::Investments => "15. Investments",
        }
    }
}

impl fmt::Display for EmissionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmissionCategory {
    type Err = GhgError;

    /// Accepts the snake_case key, or `scope3_<n>` / `s3_<n>` for Scope 3.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        if let Some(found) = Self::ALL.iter().find(|c| c.as_str() == key) {
            return Ok(*found);
        }
        let number = key
            .strip_prefix("scope3_")
            .or_else(|| key.strip_prefix("s3_"))
            .and_then(|n| n.parse::<u8>().ok());
        if let Some(n) = number {
            if let Some(found) = Self::ALL.iter().find(|c| c.scope3_number() == Some(n)) {
                return Ok(*found);
            }
        }
        Err(GhgError::UnknownCategory(s.to_string()))
    }
}

/// How the activity data of a source is turned into emissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationMethod {
    Activity,
    Spend,
    Supplier,
    Fuel,
    Distance,
    Asset,
    Average,
    Hybrid,
}

impl CalculationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            CalculationMethod::Activity => "activity",
            CalculationMethod::Spend => "spend",
            CalculationMethod::Supplier => "supplier",
            CalculationMethod::Fuel => "fuel",
            CalculationMethod::Distance => "distance",
            CalculationMethod::Asset => "asset",
            CalculationMethod::Average => "average",
            CalculationMethod::Hybrid => "hybrid",
        }
    }

    /// Primary data comes from the organisation's own activity records or
    /// suppliers; spend and industry averages count as estimates.
    pub fn is_primary(self) -> bool {
        !matches!(self, CalculationMethod::Spend | CalculationMethod::Average)
    }
}

impl fmt::Display for CalculationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalculationMethod {
    type Err = GhgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "activity" | "activity_based" | "activity-based" => Ok(CalculationMethod::Activity),
            "spend" | "spend_based" | "spend-based" => Ok(CalculationMethod::Spend),
            "supplier" | "supplier_specific" | "supplier-specific" => {
                Ok(CalculationMethod::Supplier)
            }
            "fuel" | "fuel_based" | "fuel-based" => Ok(CalculationMethod::Fuel),
            "distance" | "distance_based" | "distance-based" => Ok(CalculationMethod::Distance),
            "asset" | "asset_specific" | "asset-specific" => Ok(CalculationMethod::Asset),
            "average" | "average_data" | "average-data" => Ok(CalculationMethod::Average),
            "hybrid" => Ok(CalculationMethod::Hybrid),
            other => Err(GhgError::InvalidData(format!(
                "Invalid calculation method: '{}'",
                other
            ))),
        }
    }
}
